use actix_multipart::Multipart;
use actix_web::{get, post, put, web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::clients::storage::{object_name, StoredImage};
use crate::clients::telegram::SubmissionAlert;
use crate::directory::{self, DirectoryQuery};
use crate::error::ApiError;
use crate::i18n::Language;
use crate::lucky::{self, render_card, CardStyle, LuckyCard};
use crate::models::{
    AdminActionResult, AdminActionType, AdminOverview, AdminPasswordRequest, AdminRecordRequest,
    ApiResponse, BusinessSubmission, DirectoryListing, EditBusinessRequest, LiXiReceipt,
    LiXiRequest, NewAdminActionLog, NewLiXiEntry, SubmissionWebhookPayload,
    SubmitBusinessRequest,
};
use crate::pages;
use crate::seed::{SeedError, SeedListing};
use crate::state::AppState;

const RECENT_ACTION_LIMIT: i64 = 50;
/// Matches the image cap on a submission.
const MAX_UPLOAD_FILES: usize = 10;

type ApiResult = Result<HttpResponse, ApiError>;

fn require_id(id: Option<i64>, what: &str) -> Result<i64, ApiError> {
    id.ok_or_else(|| ApiError::BadRequest(format!("Missing {what} ID")))
}

/// Checks the admin credential before the body is bound to its typed request,
/// so a bad password is a 401 whatever else the body contains.
fn authorized_body<T: DeserializeOwned>(
    req: &HttpRequest,
    state: &AppState,
    payload: web::Json<Value>,
) -> Result<T, ApiError> {
    let body = payload.into_inner();
    let password = body.get("password").and_then(Value::as_str);
    state.auth.authorize(req, password)?;
    serde_json::from_value(body)
        .map_err(|err| ApiError::BadRequest(format!("Invalid request body: {err}")))
}

async fn record_action(state: &AppState, action: NewAdminActionLog) {
    if let Err(err) = state.store.record_admin_action(action).await {
        log::error!("Failed to write admin action log: {err}");
    }
}

fn spawn_submission_alert(state: &AppState, submission: &BusinessSubmission) {
    let Some(telegram) = state.telegram.clone() else {
        return;
    };
    if !telegram.notify_on_submit() {
        return;
    }

    let alert = SubmissionAlert::from(submission);
    actix_rt::spawn(async move {
        if let Err(err) = telegram.notify_submission(&alert).await {
            log::warn!("Telegram alert for \"{}\" failed: {err}", alert.name);
        }
    });
}

fn spawn_lucky_deliveries(state: &AppState, receipt: &LiXiReceipt) {
    match state.mailer.clone() {
        Some(mailer) => {
            let receipt = receipt.clone();
            actix_rt::spawn(async move {
                if let Err(err) = mailer.send_lucky_number(&receipt).await {
                    log::error!("Lucky-number email to {} failed: {err}", receipt.email);
                }
            });
        }
        None => log::warn!("SMTP not configured, lucky number not emailed"),
    }

    match state.webhook.clone() {
        Some(webhook) => {
            let email = receipt.email.clone();
            let lucky_number = receipt.lucky_number;
            let business_name = receipt.business_name.clone();
            actix_rt::spawn(async move {
                if let Err(err) = webhook
                    .record_lucky_number(&email, lucky_number, business_name.as_deref())
                    .await
                {
                    log::error!("Lucky-number webhook failed: {err}");
                }
            });
        }
        None => log::warn!("GOOGLE_SCRIPT_WEBHOOK_URL not set"),
    }
}

// ============================================================================
// HEALTH CHECK
// ============================================================================

#[get("/health")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "dfw-viet-biz",
        "timestamp": chrono::Utc::now()
    }))
}

// ============================================================================
// PUBLIC DIRECTORY
// ============================================================================

#[get("/api/businesses")]
pub async fn list_businesses(
    state: web::Data<AppState>,
    query: web::Query<DirectoryQuery>,
) -> ApiResult {
    let businesses = state
        .store
        .list_businesses()
        .await
        .map_err(ApiError::store("Failed to load businesses"))?;

    let total = businesses.len();
    let categories = directory::categories(&businesses);
    let businesses = directory::apply(businesses, &query);

    Ok(HttpResponse::Ok().json(ApiResponse::success(DirectoryListing {
        total,
        count: businesses.len(),
        categories,
        businesses,
    })))
}

#[get("/api/businesses/random")]
pub async fn random_business(state: web::Data<AppState>) -> ApiResult {
    let businesses = state
        .store
        .list_businesses()
        .await
        .map_err(ApiError::store("Failed to load businesses"))?;

    match directory::pick_random(&businesses) {
        Some(business) => Ok(HttpResponse::Ok().json(ApiResponse::success(business))),
        None => Err(ApiError::NotFound("No businesses available".into())),
    }
}

#[get("/api/businesses/{slug}")]
pub async fn get_business(state: web::Data<AppState>, slug: web::Path<String>) -> ApiResult {
    let slug = slug.into_inner();
    match state
        .store
        .find_business_by_slug(&slug)
        .await
        .map_err(ApiError::store("Failed to fetch business"))?
    {
        Some(business) => Ok(HttpResponse::Ok().json(ApiResponse::success(business))),
        None => Err(ApiError::NotFound(format!("Business not found: {slug}"))),
    }
}

// ============================================================================
// SUBMISSIONS
// ============================================================================

#[post("/api/submit")]
pub async fn submit_business(
    state: web::Data<AppState>,
    payload: web::Json<SubmitBusinessRequest>,
) -> ApiResult {
    let body = payload.into_inner();
    body.validate()?;
    body.validate_business_rules().map_err(ApiError::BadRequest)?;

    let submission = state
        .store
        .create_submission(body.into_new_submission())
        .await
        .map_err(ApiError::store("Failed to save submission"))?;

    log::info!("New submission {} ({})", submission.id, submission.name);
    spawn_submission_alert(&state, &submission);

    Ok(HttpResponse::Created().json(ApiResponse::success(submission)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TelegramRelayResult {
    pub telegram_result: Value,
}

async fn relay_submission(state: &AppState, body: &[u8]) -> Result<Value, String> {
    let payload: SubmissionWebhookPayload =
        serde_json::from_slice(body).map_err(|e| format!("Invalid webhook payload: {e}"))?;
    let telegram = state
        .telegram
        .as_ref()
        .ok_or_else(|| "Telegram is not configured".to_string())?;

    telegram
        .notify_submission(&SubmissionAlert::from(payload.record))
        .await
        .map_err(|e| e.to_string())
}

/// Database webhook relay. Always answers 200 so the caller does not retry.
#[post("/api/telegram-notify")]
pub async fn telegram_notify(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    match relay_submission(&state, &body).await {
        Ok(telegram_result) => {
            HttpResponse::Ok().json(ApiResponse::success(TelegramRelayResult { telegram_result }))
        }
        Err(message) => {
            log::error!("Telegram notification failed: {message}");
            HttpResponse::Ok().json(ApiResponse::<()>::error(message))
        }
    }
}

// ============================================================================
// IMAGE UPLOAD
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResult {
    pub url: String,
    pub path: String,
    pub images: Vec<StoredImage>,
    pub failed: usize,
}

struct UploadedFile {
    content_type: String,
    bytes: Vec<u8>,
}

#[post("/api/upload-image")]
pub async fn upload_image(state: web::Data<AppState>, mut payload: Multipart) -> ApiResult {
    let storage = state
        .images
        .clone()
        .ok_or_else(|| ApiError::ServiceUnavailable("Image storage is not configured".into()))?;

    let mut requested_name: Option<String> = None;
    let mut files: Vec<UploadedFile> = Vec::new();

    while let Some(field) = payload.next().await {
        let mut field =
            field.map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {e}")))?;

        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                if files.len() == MAX_UPLOAD_FILES {
                    return Err(ApiError::BadRequest(format!(
                        "At most {MAX_UPLOAD_FILES} images can be uploaded at once"
                    )));
                }
                let content_type = field
                    .content_type()
                    .map(|mime| mime.essence_str().to_string())
                    .unwrap_or_default();
                if !content_type.starts_with("image/") {
                    return Err(ApiError::BadRequest(format!(
                        "Only image uploads are allowed (got {content_type:?})"
                    )));
                }

                let mut bytes = Vec::new();
                while let Some(chunk) = field.next().await {
                    let chunk = chunk
                        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {e}")))?;
                    if bytes.len() + chunk.len() > state.max_upload_bytes {
                        return Err(ApiError::BadRequest(format!(
                            "Image exceeds the {} byte limit",
                            state.max_upload_bytes
                        )));
                    }
                    bytes.extend_from_slice(&chunk);
                }
                files.push(UploadedFile {
                    content_type,
                    bytes,
                });
            }
            Some("fileName") => {
                let mut raw = Vec::new();
                while let Some(chunk) = field.next().await {
                    let chunk = chunk
                        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {e}")))?;
                    if raw.len() + chunk.len() > 1024 {
                        return Err(ApiError::BadRequest("fileName is too long".into()));
                    }
                    raw.extend_from_slice(&chunk);
                }
                requested_name = Some(String::from_utf8_lossy(&raw).trim().to_string());
            }
            _ => {
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {e}")))?;
                }
            }
        }
    }

    if files.is_empty() {
        return Err(ApiError::BadRequest("No file provided".into()));
    }

    // A requested name only makes sense for a single file.
    let single = files.len() == 1;
    let mut images = Vec::with_capacity(files.len());
    let mut failed = 0;

    for file in files {
        let requested = if single { requested_name.as_deref() } else { None };
        let name = object_name(requested, &file.content_type);
        match storage.upload(&name, file.bytes, &file.content_type).await {
            Ok(stored) => images.push(stored),
            Err(err) => {
                log::error!("Upload of {name} failed: {err}");
                failed += 1;
            }
        }
    }

    let Some(first) = images.first().cloned() else {
        return Err(ApiError::Upstream("Failed to upload image".into()));
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(UploadResult {
        url: first.url,
        path: first.path,
        images,
        failed,
    })))
}

// ============================================================================
// LÌ XÌ
// ============================================================================

#[post("/api/li-xi")]
pub async fn claim_li_xi(state: web::Data<AppState>, payload: web::Json<LiXiRequest>) -> ApiResult {
    let body = payload.into_inner();
    body.validate()?;

    let business_name = body
        .business_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    let entry = state
        .store
        .create_li_xi_entry(NewLiXiEntry {
            email: body.email.trim().to_string(),
            lucky_number: lucky::generate_lucky_number(),
            business_name,
        })
        .await
        .map_err(ApiError::store("Failed to save lucky number"))?;

    let receipt = LiXiReceipt {
        lucky_number: entry.lucky_number,
        email: entry.email,
        business_name: entry.business_name,
    };
    spawn_lucky_deliveries(&state, &receipt);

    Ok(HttpResponse::Ok().json(ApiResponse::success(receipt)))
}

#[get("/api/li-xi/card/{number}")]
pub async fn li_xi_card(state: web::Data<AppState>, number: web::Path<String>) -> ApiResult {
    let lucky_number = number
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|n| lucky::is_lucky_number(*n))
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Lucky numbers run from {} to {}",
                lucky::LUCKY_MIN,
                lucky::LUCKY_MAX
            ))
        })?;

    let card = LuckyCard::new(lucky_number, &state.site_url);
    let svg = render_card(&state.templates, CardStyle::Svg, &card)
        .map_err(|e| ApiError::Internal(format!("Failed to render card: {e}")))?;

    Ok(HttpResponse::Ok()
        .content_type(CardStyle::Svg.content_type())
        .body(svg))
}

// ============================================================================
// ADMIN
// ============================================================================

#[post("/api/admin/login")]
pub async fn admin_login(
    state: web::Data<AppState>,
    payload: web::Json<AdminPasswordRequest>,
) -> ApiResult {
    let password = payload
        .into_inner()
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Password is required".into()))?;

    if !state.auth.verify_password(&password) {
        log::warn!("Failed admin login attempt");
        return Err(ApiError::Unauthorized);
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(state.auth.issue_session())))
}

#[post("/api/admin/overview")]
pub async fn admin_overview(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: Option<web::Json<AdminPasswordRequest>>,
) -> ApiResult {
    let password = payload.and_then(|p| p.into_inner().password);
    state.auth.authorize(&req, password.as_deref())?;

    let pending = state
        .store
        .list_pending_submissions()
        .await
        .map_err(ApiError::store("Failed to load submissions"))?;
    let logs = state
        .store
        .list_admin_actions(RECENT_ACTION_LIMIT)
        .await
        .map_err(ApiError::store("Failed to load admin logs"))?;
    let li_xi_entries = state
        .store
        .list_li_xi_entries()
        .await
        .map_err(ApiError::store("Failed to load lucky numbers"))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(AdminOverview {
        pending,
        logs,
        li_xi_entries,
    })))
}

#[post("/api/admin/approve")]
pub async fn approve_submission(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Json<Value>,
) -> ApiResult {
    let body: AdminRecordRequest = authorized_body(&req, &state, payload)?;
    let id = require_id(body.id, "submission")?;

    let (submission, business) = state
        .store
        .approve_submission(id)
        .await
        .map_err(ApiError::store("Failed to approve submission"))?
        .ok_or_else(|| ApiError::NotFound(format!("Submission not found: {id}")))?;

    log::info!("Approved submission {id} as business {}", business.id);
    record_action(
        &state,
        NewAdminActionLog::for_submission(AdminActionType::Approved, &submission, None),
    )
    .await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(AdminActionResult {
        message: format!("Approved \"{}\"", business.name),
        record: Some(business),
    })))
}

#[post("/api/admin/reject")]
pub async fn reject_submission(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Json<Value>,
) -> ApiResult {
    let body: AdminRecordRequest = authorized_body(&req, &state, payload)?;
    let id = require_id(body.id, "submission")?;

    let submission = state
        .store
        .delete_submission(id)
        .await
        .map_err(ApiError::store("Failed to reject submission"))?
        .ok_or_else(|| ApiError::NotFound(format!("Submission not found: {id}")))?;

    log::info!("Rejected submission {id}");
    record_action(
        &state,
        NewAdminActionLog::for_submission(AdminActionType::Rejected, &submission, None),
    )
    .await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(AdminActionResult {
        message: format!("Rejected \"{}\"", submission.name),
        record: Some(submission),
    })))
}

#[put("/api/admin/edit")]
pub async fn edit_business(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Json<Value>,
) -> ApiResult {
    let body: EditBusinessRequest = authorized_body(&req, &state, payload)?;
    let id = require_id(body.id, "business")?;

    let updates = body
        .updates
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No valid fields to update".into()))?;
    updates.validate()?;
    updates
        .validate_business_rules()
        .map_err(ApiError::BadRequest)?;

    let mut business = state
        .store
        .get_business(id)
        .await
        .map_err(ApiError::store("Failed to fetch business"))?
        .ok_or_else(|| ApiError::NotFound(format!("Business not found: {id}")))?;

    updates.apply_to_existing(&mut business);

    let updated = state
        .store
        .update_business(business)
        .await
        .map_err(ApiError::store("Failed to update business"))?
        .ok_or_else(|| ApiError::NotFound(format!("Business not found: {id}")))?;

    log::info!("Edited business {id}");
    Ok(HttpResponse::Ok().json(ApiResponse::success(updated)))
}

#[post("/api/admin/delete")]
pub async fn delete_business(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Json<Value>,
) -> ApiResult {
    let body: AdminRecordRequest = authorized_body(&req, &state, payload)?;
    let id = require_id(body.id, "business")?;

    let business = state
        .store
        .delete_business(id)
        .await
        .map_err(ApiError::store("Failed to delete business"))?
        .ok_or_else(|| ApiError::NotFound(format!("Business not found: {id}")))?;

    let display_name = body
        .business_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    let message = format!(
        "Deleted \"{}\"",
        display_name.as_deref().unwrap_or(&business.name)
    );

    log::info!("Deleted business {id}");
    record_action(
        &state,
        NewAdminActionLog::for_business(
            AdminActionType::Deleted,
            &business,
            display_name,
            Some("Deleted from approved businesses".into()),
        ),
    )
    .await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(AdminActionResult {
        message,
        record: Some(business),
    })))
}

#[post("/api/admin/delete-lixi")]
pub async fn delete_li_xi(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Json<Value>,
) -> ApiResult {
    let body: AdminRecordRequest = authorized_body(&req, &state, payload)?;
    let id = require_id(body.id, "entry")?;

    let entry = state
        .store
        .delete_li_xi_entry(id)
        .await
        .map_err(ApiError::store("Failed to delete lucky number"))?
        .ok_or_else(|| ApiError::NotFound(format!("Lucky-number entry not found: {id}")))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(AdminActionResult {
        message: format!("Deleted lucky number {}", entry.lucky_number),
        record: Some(entry),
    })))
}

#[get("/api/admin/seed")]
pub async fn list_seed(state: web::Data<AppState>) -> ApiResult {
    let businesses = state
        .seed
        .load()
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to read seed file: {e}")))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(SeedListing {
        count: businesses.len(),
        businesses,
    })))
}

#[post("/api/admin/seed")]
pub async fn delete_seed(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Json<Value>,
) -> ApiResult {
    let body: AdminRecordRequest = authorized_body(&req, &state, payload)?;
    let id = require_id(body.id, "business")?;

    match state.seed.remove(id).await {
        Ok(deletion) => Ok(HttpResponse::Ok().json(ApiResponse::success(deletion))),
        Err(err @ SeedError::NotFound(_)) => Err(ApiError::NotFound(err.to_string())),
        Err(err) => Err(ApiError::Internal(format!("Failed to update seed file: {err}"))),
    }
}

// ============================================================================
// PAGES
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LangQuery {
    pub lang: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DirectoryPageQuery {
    pub lang: Option<String>,
    #[serde(flatten)]
    pub directory: DirectoryQuery,
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

fn render_failed(err: handlebars::RenderError) -> ApiError {
    ApiError::Internal(format!("Failed to render page: {err}"))
}

#[get("/")]
pub async fn directory_page(
    state: web::Data<AppState>,
    query: web::Query<DirectoryPageQuery>,
) -> ApiResult {
    let query = query.into_inner();
    let lang = Language::from_param(query.lang.as_deref());
    let businesses = state
        .store
        .list_businesses()
        .await
        .map_err(ApiError::store("Failed to load businesses"))?;

    let body = pages::render_directory(&state.templates, lang, &query.directory, businesses)
        .map_err(render_failed)?;
    Ok(html(body))
}

#[get("/business/{slug}")]
pub async fn business_page(
    state: web::Data<AppState>,
    slug: web::Path<String>,
    query: web::Query<LangQuery>,
) -> ApiResult {
    let lang = Language::from_param(query.lang.as_deref());
    let business = state
        .store
        .find_business_by_slug(&slug)
        .await
        .map_err(ApiError::store("Failed to fetch business"))?;

    match business {
        Some(business) => {
            let body =
                pages::render_business(&state.templates, lang, &business).map_err(render_failed)?;
            Ok(html(body))
        }
        None => {
            let body = pages::render_not_found(&state.templates, lang).map_err(render_failed)?;
            Ok(HttpResponse::NotFound()
                .content_type("text/html; charset=utf-8")
                .body(body))
        }
    }
}

#[get("/admin")]
pub async fn admin_page(state: web::Data<AppState>, query: web::Query<LangQuery>) -> ApiResult {
    let lang = Language::from_param(query.lang.as_deref());
    let body = pages::render_admin(&state.templates, lang).map_err(render_failed)?;
    Ok(html(body))
}

/// Malformed JSON bodies get the same envelope as every other error.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = format!("Invalid JSON body: {err}");
        actix_web::error::InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(ApiResponse::<()>::error(message)),
        )
        .into()
    })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        // Health
        .service(health_check)
        // Directory (random before {slug})
        .service(list_businesses)
        .service(random_business)
        .service(get_business)
        // Submissions
        .service(submit_business)
        .service(telegram_notify)
        .service(upload_image)
        // Lì xì
        .service(claim_li_xi)
        .service(li_xi_card)
        // Admin
        .service(admin_login)
        .service(admin_overview)
        .service(approve_submission)
        .service(reject_submission)
        .service(edit_business)
        .service(delete_business)
        .service(delete_li_xi)
        .service(list_seed)
        .service(delete_seed)
        // Pages
        .service(directory_page)
        .service(business_page)
        .service(admin_page);
}
