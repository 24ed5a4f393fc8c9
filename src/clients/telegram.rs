use serde::Serialize;
use serde_json::Value;

use super::{ensure_success, normalize_base_url, NotifyError};
use crate::config::TelegramConfig;
use crate::models::{BusinessSubmission, SubmissionWebhookRecord};

const MARKDOWN_V2_SPECIAL: &str = "_*[]()~`>#+-=|{}.!";

/// Escapes every MarkdownV2 special character with a backslash.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_V2_SPECIAL.contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Fields shown in a "new business" alert.
#[derive(Debug, Clone, Default)]
pub struct SubmissionAlert {
    pub name: String,
    pub category: String,
    pub city: Option<String>,
    pub submitter_email: Option<String>,
    pub phone: Option<String>,
}

impl From<&BusinessSubmission> for SubmissionAlert {
    fn from(submission: &BusinessSubmission) -> Self {
        Self {
            name: submission.name.clone(),
            category: submission.category.clone(),
            city: submission.city.clone(),
            submitter_email: submission.submitter_email.clone(),
            phone: submission.phone.clone(),
        }
    }
}

impl From<SubmissionWebhookRecord> for SubmissionAlert {
    fn from(record: SubmissionWebhookRecord) -> Self {
        Self {
            name: record.name,
            category: record.category,
            city: record.city,
            submitter_email: record.submitter_email,
            phone: record.phone,
        }
    }
}

fn or_na(value: &Option<String>) -> String {
    let value = value.as_deref().map(str::trim).filter(|v| !v.is_empty());
    escape_markdown(value.unwrap_or("N/A"))
}

/// MarkdownV2 body for a new submission alert.
pub fn submission_message(alert: &SubmissionAlert, site_url: &str) -> String {
    format!(
        "🆕 *Doanh Nghiệp Mới\\!*\n\n\
         📋 *Tên:* {}\n\
         🏷️ *Danh mục:* {}\n\
         📍 *Thành phố:* {}\n\
         📧 *Email:* {}\n\
         📱 *Phone:* {}\n\n\
         👉 [Xem chi tiết trên Admin]({}/admin)",
        escape_markdown(&alert.name),
        escape_markdown(&alert.category),
        or_na(&alert.city),
        or_na(&alert.submitter_email),
        or_na(&alert.phone),
        site_url.replace('\\', "\\\\").replace(')', "\\)"),
    )
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
    site_url: String,
    notify_on_submit: bool,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig, site_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: normalize_base_url(&config.api_url),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            site_url: normalize_base_url(site_url),
            notify_on_submit: config.notify_on_submit,
        }
    }

    pub fn notify_on_submit(&self) -> bool {
        self.notify_on_submit
    }

    /// Sends a MarkdownV2 message and returns Telegram's JSON reply.
    pub async fn send_message(&self, text: &str) -> Result<Value, NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.bot_token);
        let response = self
            .client
            .post(&url)
            .json(&SendMessageRequest {
                chat_id: &self.chat_id,
                text,
                parse_mode: "MarkdownV2",
                disable_web_page_preview: false,
            })
            .send()
            .await?;

        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    pub async fn notify_submission(&self, alert: &SubmissionAlert) -> Result<Value, NotifyError> {
        self.send_message(&submission_message(alert, &self.site_url))
            .await
    }
}
