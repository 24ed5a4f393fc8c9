use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail};

use crate::directory::{google_maps_link, vietnamese_subcategory, DEFAULT_STATE};
use crate::slug::slugify;

// ============================================================================
// ENUMS
// ============================================================================

/// Moderation state of a submission (also a Postgres enum)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "submission_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

/// Kind of admin action recorded in the audit trail (also a Postgres enum)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "admin_action_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdminActionType {
    Approved,
    Rejected,
    Deleted,
}

// ============================================================================
// APPROVED BUSINESSES
// ============================================================================

/// Listing shown in the public directory
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Business {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub category: String,
    pub original_category: Option<String>,
    pub subcategory: Option<String>,
    pub address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    pub google_maps_link: Option<String>,
    pub link_type: Option<String>,
    pub images: Vec<String>,
    pub rating: Option<f64>,
    pub review_count: Option<i32>,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Helper used when inserting a listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBusiness {
    pub name: String,
    pub slug: String,
    pub category: String,
    pub original_category: Option<String>,
    pub subcategory: Option<String>,
    pub address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    pub google_maps_link: Option<String>,
    pub link_type: Option<String>,
    pub images: Vec<String>,
    pub rating: Option<f64>,
    pub review_count: Option<i32>,
    pub source: Option<String>,
}

impl NewBusiness {
    /// Builds the listing an approved submission turns into.
    pub fn from_submission(submission: &BusinessSubmission) -> Self {
        let google_maps_link = submission.google_maps_link.clone().or_else(|| {
            Some(google_maps_link(
                &submission.address,
                submission.city.as_deref(),
                submission.state.as_deref(),
            ))
        });

        NewBusiness {
            name: submission.name.clone(),
            slug: slugify(&submission.name),
            category: submission.category.clone(),
            original_category: Some(submission.category.clone()),
            subcategory: submission
                .subcategory
                .clone()
                .or_else(|| Some(vietnamese_subcategory(&submission.category).to_string())),
            address: submission.address.clone(),
            city: submission.city.clone(),
            state: submission.state.clone(),
            phone: submission.phone.clone(),
            website: submission.website.clone(),
            email: submission.email.clone(),
            description: submission.description.clone().or_else(|| {
                Some(format!("{} - Doanh nghiệp Việt Nam tại DFW", submission.name))
            }),
            google_maps_link,
            link_type: None,
            images: submission.images.clone(),
            rating: None,
            review_count: None,
            source: Some("submission".to_string()),
        }
    }
}

// ============================================================================
// SUBMISSIONS (Moderation Queue)
// ============================================================================

/// Business proposed by a visitor, waiting for an admin decision
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BusinessSubmission {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    pub submitter_email: Option<String>,
    pub google_maps_link: Option<String>,
    pub images: Vec<String>,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Helper struct used when inserting a submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubmission {
    pub name: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    pub submitter_email: Option<String>,
    pub google_maps_link: Option<String>,
    pub images: Vec<String>,
}

// ============================================================================
// AUDIT TRAIL & LÌ XÌ
// ============================================================================

/// Append-only record of an admin decision
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdminActionLog {
    pub id: i64,
    pub action_type: AdminActionType,
    pub business_name: String,
    pub business_category: Option<String>,
    pub business_address: Option<String>,
    pub business_phone: Option<String>,
    pub business_email: Option<String>,
    pub business_website: Option<String>,
    pub notes: Option<String>,
    pub action_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAdminActionLog {
    pub action_type: AdminActionType,
    pub business_name: String,
    pub business_category: Option<String>,
    pub business_address: Option<String>,
    pub business_phone: Option<String>,
    pub business_email: Option<String>,
    pub business_website: Option<String>,
    pub notes: Option<String>,
}

impl NewAdminActionLog {
    pub fn for_submission(
        action_type: AdminActionType,
        submission: &BusinessSubmission,
        notes: Option<String>,
    ) -> Self {
        NewAdminActionLog {
            action_type,
            business_name: submission.name.clone(),
            business_category: Some(submission.category.clone()),
            business_address: Some(submission.address.clone()),
            business_phone: submission.phone.clone(),
            business_email: submission.email.clone(),
            business_website: submission.website.clone(),
            notes,
        }
    }

    pub fn for_business(
        action_type: AdminActionType,
        business: &Business,
        display_name: Option<String>,
        notes: Option<String>,
    ) -> Self {
        NewAdminActionLog {
            action_type,
            business_name: display_name.unwrap_or_else(|| business.name.clone()),
            business_category: Some(business.category.clone()),
            business_address: Some(business.address.clone()),
            business_phone: business.phone.clone(),
            business_email: business.email.clone(),
            business_website: business.website.clone(),
            notes,
        }
    }
}

/// Lucky-number giveaway entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LiXiEntry {
    pub id: i64,
    pub email: String,
    pub lucky_number: i32,
    pub business_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLiXiEntry {
    pub email: String,
    pub lucky_number: i32,
    pub business_name: Option<String>,
}

// ============================================================================
// REQUEST/RESPONSE DTOs
// ============================================================================

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

/// Payload sent by the public "add your business" form
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBusinessRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 120))]
    pub category: String,
    #[validate(length(max = 120))]
    pub subcategory: Option<String>,
    #[validate(length(min = 1, max = 300))]
    pub address: String,
    #[validate(length(max = 120))]
    pub city: Option<String>,
    #[validate(length(max = 40))]
    pub state: Option<String>,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[validate(length(max = 300))]
    pub website: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(email)]
    pub submitter_email: Option<String>,
    #[validate(length(max = 1024))]
    pub google_maps_link: Option<String>,
    #[serde(default)]
    #[validate(length(max = 10))]
    pub images: Vec<String>,
}

impl SubmitBusinessRequest {
    pub fn validate_business_rules(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Business name is required".into());
        }
        if self.category.trim().is_empty() {
            return Err("Category is required".into());
        }
        if self.address.trim().is_empty() {
            return Err("Address is required".into());
        }
        if let Some(phone) = non_blank(&self.phone) {
            if !is_valid_phone(phone) {
                return Err("Invalid phone format".into());
            }
        }
        if let Some(website) = non_blank(&self.website) {
            if !is_valid_website(website) {
                return Err("Invalid website format".into());
            }
        }
        Ok(())
    }

    pub fn into_new_submission(self) -> NewSubmission {
        NewSubmission {
            name: self.name.trim().to_string(),
            category: self.category.trim().to_string(),
            subcategory: blank_to_none(self.subcategory),
            address: self.address.trim().to_string(),
            city: blank_to_none(self.city),
            state: blank_to_none(self.state).or_else(|| Some(DEFAULT_STATE.to_string())),
            phone: blank_to_none(self.phone),
            website: blank_to_none(self.website),
            email: blank_to_none(self.email),
            description: blank_to_none(self.description),
            submitter_email: blank_to_none(self.submitter_email),
            google_maps_link: blank_to_none(self.google_maps_link),
            images: self
                .images
                .into_iter()
                .filter(|url| !url.trim().is_empty())
                .collect(),
        }
    }
}

/// Body shared by the admin routes that act on a single record
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRecordRequest {
    pub id: Option<i64>,
    pub password: Option<String>,
    pub business_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminPasswordRequest {
    pub password: Option<String>,
}

/// Admin edit of an approved listing
#[derive(Debug, Deserialize)]
pub struct EditBusinessRequest {
    pub id: Option<i64>,
    pub password: Option<String>,
    pub updates: Option<BusinessUpdate>,
}

/// Fields an admin may change on a listing; any other key in the payload is ignored.
/// An empty string clears an optional field.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct BusinessUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub original_category: Option<String>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub google_maps_link: Option<String>,
    #[validate(length(max = 10))]
    pub images: Option<Vec<String>>,
}

impl BusinessUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.subcategory.is_none()
            && self.original_category.is_none()
            && self.address.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.phone.is_none()
            && self.website.is_none()
            && self.email.is_none()
            && self.description.is_none()
            && self.google_maps_link.is_none()
            && self.images.is_none()
    }

    pub fn validate_business_rules(&self) -> Result<(), String> {
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err("Business name cannot be empty".into());
        }
        if matches!(&self.category, Some(category) if category.trim().is_empty()) {
            return Err("Category cannot be empty".into());
        }
        if let Some(phone) = non_blank(&self.phone) {
            if !is_valid_phone(phone) {
                return Err("Invalid phone format".into());
            }
        }
        if let Some(website) = non_blank(&self.website) {
            if !is_valid_website(website) {
                return Err("Invalid website format".into());
            }
        }
        if let Some(email) = non_blank(&self.email) {
            if !email.validate_email() {
                return Err("Invalid email format".into());
            }
        }
        Ok(())
    }

    /// Applies the update and refreshes the derived columns (original category,
    /// map link and slug).
    pub fn apply_to_existing(&self, existing: &mut Business) {
        if let Some(name) = &self.name {
            existing.name = name.trim().to_string();
            existing.slug = slugify(&existing.name);
        }
        if let Some(category) = &self.category {
            existing.category = category.trim().to_string();
            if self.original_category.is_none() {
                existing.original_category = Some(existing.category.clone());
            }
        }
        if let Some(original_category) = &self.original_category {
            existing.original_category = clear_or_set(original_category);
        }
        if let Some(subcategory) = &self.subcategory {
            existing.subcategory = clear_or_set(subcategory);
        }

        let location_changed =
            self.address.is_some() || self.city.is_some() || self.state.is_some();
        if let Some(address) = &self.address {
            existing.address = address.trim().to_string();
        }
        if let Some(city) = &self.city {
            existing.city = clear_or_set(city);
        }
        if let Some(state) = &self.state {
            existing.state = clear_or_set(state);
        }

        if let Some(phone) = &self.phone {
            existing.phone = clear_or_set(phone);
        }
        if let Some(website) = &self.website {
            existing.website = clear_or_set(website);
        }
        if let Some(email) = &self.email {
            existing.email = clear_or_set(email);
        }
        if let Some(description) = &self.description {
            existing.description = clear_or_set(description);
        }
        if let Some(link) = &self.google_maps_link {
            existing.google_maps_link = clear_or_set(link);
        }
        if location_changed {
            existing.google_maps_link = Some(google_maps_link(
                &existing.address,
                existing.city.as_deref(),
                existing.state.as_deref(),
            ));
        }
        if let Some(images) = &self.images {
            existing.images = images
                .iter()
                .filter(|url| !url.trim().is_empty())
                .cloned()
                .collect();
        }
    }
}

/// Lucky-number opt-in sent after a submission
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LiXiRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 200))]
    pub business_name: Option<String>,
}

/// What the visitor gets back after opting in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiXiReceipt {
    pub lucky_number: i32,
    pub email: String,
    pub business_name: Option<String>,
}

/// Row a database webhook sends when a submission is inserted
#[derive(Debug, Deserialize)]
pub struct SubmissionWebhookPayload {
    pub record: SubmissionWebhookRecord,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionWebhookRecord {
    pub name: String,
    pub category: String,
    pub submitter_email: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub created_at: Option<String>,
}

// ============================================================================
// COMPOSITE RESPONSE TYPES
// ============================================================================

/// Directory listing after search, filter and sort
#[derive(Debug, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub total: usize,
    pub count: usize,
    pub categories: Vec<String>,
    pub businesses: Vec<Business>,
}

/// Everything the moderation dashboard shows
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminOverview {
    pub pending: Vec<BusinessSubmission>,
    pub logs: Vec<AdminActionLog>,
    pub li_xi_entries: Vec<LiXiEntry>,
}

/// Result of an admin action with a human-readable message
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminActionResult<T> {
    pub message: String,
    pub record: Option<T>,
}

// ============================================================================
// FIELD HELPERS
// ============================================================================

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clear_or_set(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Digits plus the usual separators, with at least one digit.
pub fn is_valid_phone(phone: &str) -> bool {
    phone.chars().any(|c| c.is_ascii_digit())
        && phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')' | '+' | '.'))
}

/// Accepts `example.com`, `www.example.com/menu` or a full http(s) URL.
pub fn is_valid_website(website: &str) -> bool {
    let rest = website
        .strip_prefix("https://")
        .or_else(|| website.strip_prefix("http://"))
        .unwrap_or(website);
    let host = rest
        .split(|c| matches!(c, '/' | '?' | '#'))
        .next()
        .unwrap_or_default();

    !host.is_empty()
        && host.contains('.')
        && !host.starts_with('.')
        && !host.ends_with('.')
        && !host.contains("..")
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> BusinessSubmission {
        let now = Utc::now();
        BusinessSubmission {
            id: 5,
            name: "Phở Sài Gòn".into(),
            category: "Restaurant".into(),
            subcategory: None,
            address: "3310 W Walnut St".into(),
            city: Some("Garland".into()),
            state: Some("TX".into()),
            phone: Some("972-555-0101".into()),
            website: None,
            email: None,
            description: None,
            submitter_email: Some("owner@example.com".into()),
            google_maps_link: None,
            images: vec!["https://cdn.example.com/a.jpg".into()],
            status: SubmissionStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn approved_listing_derives_slug_subcategory_and_defaults() {
        let business = NewBusiness::from_submission(&submission());

        assert_eq!(business.slug, "pho-sai-gon-dfw");
        assert_eq!(business.original_category.as_deref(), Some("Restaurant"));
        assert_eq!(business.subcategory.as_deref(), Some("Ẩm Thực Việt"));
        assert_eq!(
            business.description.as_deref(),
            Some("Phở Sài Gòn - Doanh nghiệp Việt Nam tại DFW")
        );
        assert_eq!(business.source.as_deref(), Some("submission"));
        let link = business.google_maps_link.unwrap();
        assert!(link.starts_with("https://www.google.com/maps/search/?api=1&query="));
        assert!(link.contains("Garland"));
    }

    #[test]
    fn submit_rules_reject_blank_name_and_bad_phone() {
        let mut request: SubmitBusinessRequest = serde_json::from_value(serde_json::json!({
            "name": "   ",
            "category": "Restaurant",
            "address": "123 Main St"
        }))
        .unwrap();
        assert_eq!(
            request.validate_business_rules().unwrap_err(),
            "Business name is required"
        );

        request.name = "Bánh Mì Thịt".into();
        request.phone = Some("call me".into());
        assert_eq!(
            request.validate_business_rules().unwrap_err(),
            "Invalid phone format"
        );

        request.phone = Some("(972) 555-0101".into());
        assert!(request.validate_business_rules().is_ok());
    }

    #[test]
    fn submission_defaults_state_and_drops_blank_fields() {
        let request: SubmitBusinessRequest = serde_json::from_value(serde_json::json!({
            "name": " Tiệm Nail Hoa ",
            "category": "Beauty & Personal Care",
            "address": "1 Jupiter Rd",
            "website": "",
            "submitterEmail": "me@example.com",
            "images": ["https://x/a.png", " "]
        }))
        .unwrap();

        let new = request.into_new_submission();
        assert_eq!(new.name, "Tiệm Nail Hoa");
        assert_eq!(new.state.as_deref(), Some("TX"));
        assert_eq!(new.website, None);
        assert_eq!(new.submitter_email.as_deref(), Some("me@example.com"));
        assert_eq!(new.images, vec!["https://x/a.png".to_string()]);
    }

    #[test]
    fn website_check_accepts_domains_and_urls() {
        assert!(is_valid_website("phosaigon.com"));
        assert!(is_valid_website("https://www.phosaigon.com/menu?x=1"));
        assert!(!is_valid_website("not a site"));
        assert!(!is_valid_website("localhost"));
        assert!(!is_valid_website("https://.com"));
    }

    #[test]
    fn update_refreshes_slug_maps_link_and_original_category() {
        let now = Utc::now();
        let mut business = Business {
            id: 1,
            name: "Old Name".into(),
            slug: "old-name-dfw".into(),
            category: "Food".into(),
            original_category: Some("Food".into()),
            subcategory: None,
            address: "1 Main St".into(),
            city: Some("Garland".into()),
            state: None,
            phone: Some("123".into()),
            website: None,
            email: None,
            description: None,
            google_maps_link: None,
            link_type: None,
            images: vec![],
            rating: None,
            review_count: None,
            source: None,
            created_at: now,
        };

        let update: BusinessUpdate = serde_json::from_value(serde_json::json!({
            "name": "Chè Đậu Đỏ",
            "category": "Restaurant",
            "city": "Richardson",
            "phone": "",
            "rating": 5
        }))
        .unwrap();
        assert!(!update.is_empty());
        update.apply_to_existing(&mut business);

        assert_eq!(business.slug, "che-dau-do-dfw");
        assert_eq!(business.original_category.as_deref(), Some("Restaurant"));
        assert_eq!(business.phone, None);
        assert_eq!(
            business.google_maps_link.as_deref(),
            Some("https://www.google.com/maps/search/?api=1&query=1%20Main%20St%2C%20Richardson%2C%20TX")
        );
    }

    #[test]
    fn update_with_only_unknown_keys_is_empty() {
        let update: BusinessUpdate =
            serde_json::from_value(serde_json::json!({ "slug": "hack", "id": 9 })).unwrap();
        assert!(update.is_empty());
    }
}
