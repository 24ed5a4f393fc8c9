pub mod mailer;
pub mod storage;
pub mod telegram;
pub mod webhook;

use thiserror::Error;

/// Outbound notification failures. Callers log these and carry on.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("invalid email: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build email: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("template error: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// Trims trailing slashes so paths can be appended with `format!`.
pub(crate) fn normalize_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

/// Reads a non-success response into `NotifyError::Upstream`.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, NotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(NotifyError::Upstream {
        status: status.as_u16(),
        body,
    })
}
