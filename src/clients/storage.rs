use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::normalize_base_url;
use crate::config::StorageConfig;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage rejected upload ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredImage {
    pub url: String,
    pub path: String,
}

/// Bucket that holds listing photos.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Uploads without overwriting an existing object.
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredImage, StorageError>;
}

/// REST client for a Supabase-compatible object storage API.
#[derive(Clone)]
pub struct ObjectStorageClient {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl ObjectStorageClient {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: normalize_base_url(&config.url),
            service_key: config.service_key.clone(),
            bucket: config.bucket.clone(),
        }
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }
}

#[async_trait]
impl ImageStore for ObjectStorageClient {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredImage, StorageError> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, path
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("x-upsert", "false")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(StoredImage {
            url: self.public_url(path),
            path: path.to_string(),
        })
    }
}

/// Reduces a client-supplied name to `[A-Za-z0-9._-]`, without leading dots.
/// Returns `None` when nothing usable is left.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => c,
            c if c.is_whitespace() => '-',
            _ => '_',
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();

    if cleaned.chars().any(|c| c.is_ascii_alphanumeric()) {
        Some(cleaned)
    } else {
        None
    }
}

pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/avif" => "avif",
        "image/svg+xml" => "svg",
        "image/heic" => "heic",
        _ => "bin",
    }
}

/// Object name for an upload: the sanitized client name when there is one,
/// `{uuid}.{ext}` otherwise.
pub fn object_name(requested: Option<&str>, content_type: &str) -> String {
    requested
        .and_then(sanitize_file_name)
        .unwrap_or_else(|| format!("{}.{}", Uuid::new_v4(), extension_for(content_type)))
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_bytes, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(url: &str) -> ObjectStorageClient {
        ObjectStorageClient::new(&StorageConfig {
            url: format!("{url}/"),
            service_key: "service-key".into(),
            bucket: "business-images".into(),
        })
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_file_name("Phở Hòa menu.jpg").as_deref(), Some("Ph_-H_a-menu.jpg"));
        assert_eq!(sanitize_file_name("C:\\Users\\me\\photo.png").as_deref(), Some("photo.png"));
        assert_eq!(sanitize_file_name(".hidden.png").as_deref(), Some("hidden.png"));
        assert_eq!(sanitize_file_name("..."), None);
        assert_eq!(sanitize_file_name(""), None);
    }

    #[test]
    fn generated_names_use_the_content_type() {
        let name = object_name(None, "image/webp");
        assert!(name.ends_with(".webp"));
        assert_eq!(name.len(), 36 + ".webp".len());
        assert_eq!(object_name(Some("shop.png"), "image/png"), "shop.png");
        assert!(object_name(Some("%%%"), "image/png").ends_with(".png"));
    }

    #[tokio::test]
    async fn uploads_without_upsert_and_returns_the_public_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/business-images/shop.png"))
            .and(header("authorization", "Bearer service-key"))
            .and(header("x-upsert", "false"))
            .and(header("content-type", "image/png"))
            .and(body_bytes(vec![1u8, 2, 3]))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "Key": "business-images/shop.png" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let stored = client(&server.uri())
            .upload("shop.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();
        assert_eq!(stored.path, "shop.png");
        assert_eq!(
            stored.url,
            format!("{}/storage/v1/object/public/business-images/shop.png", server.uri())
        );
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409).set_body_string("The resource already exists"))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .upload("shop.png", vec![1], "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Rejected { status: 409, .. }));
    }
}
