//! The bundled seed file: the JSON list of listings the directory started from.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::directory::{google_maps_link, vietnamese_subcategory};
use crate::models::NewBusiness;
use crate::slug::slugify;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("failed to access seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("seed file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No seed business with ID: {0}")]
    NotFound(i64),
}

/// One listing in the seed file. Keys the directory does not know about are kept
/// as they are when the file is rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedBusiness {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_maps_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_count: Option<i32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SeedBusiness {
    pub fn slug_or_generated(&self) -> String {
        self.slug
            .as_deref()
            .map(str::trim)
            .filter(|slug| !slug.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| slugify(&self.name))
    }

    pub fn into_new_business(self) -> NewBusiness {
        let slug = self.slug_or_generated();
        let google_maps_link = self.google_maps_link.or_else(|| {
            (!self.address.trim().is_empty()).then(|| {
                google_maps_link(&self.address, self.city.as_deref(), self.state.as_deref())
            })
        });
        let subcategory = self
            .subcategory
            .or_else(|| Some(vietnamese_subcategory(&self.category).to_string()));

        NewBusiness {
            name: self.name,
            slug,
            original_category: self.original_category.or_else(|| Some(self.category.clone())),
            category: self.category,
            subcategory,
            address: self.address,
            city: self.city,
            state: self.state,
            phone: self.phone,
            website: self.website,
            email: self.email,
            description: self.description,
            google_maps_link,
            link_type: self.link_type,
            images: self.images,
            rating: self.rating,
            review_count: self.review_count,
            source: Some("seed".to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeedListing {
    pub count: usize,
    pub businesses: Vec<SeedBusiness>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeedDeletion {
    pub message: String,
    pub deleted_business: SeedBusiness,
    pub remaining_count: usize,
}

/// Seed file on disk. Rewrites are serialized and atomic.
pub struct SeedFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SeedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Vec<SeedBusiness>, SeedError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub async fn remove(&self, id: i64) -> Result<SeedDeletion, SeedError> {
        let _guard = self.write_lock.lock().await;

        let mut businesses = self.load().await?;
        let position = businesses
            .iter()
            .position(|b| b.id == id)
            .ok_or(SeedError::NotFound(id))?;
        let deleted = businesses.remove(position);

        self.write_atomic(&businesses).await?;
        log::info!("Removed seed business {} ({})", deleted.id, deleted.name);

        Ok(SeedDeletion {
            message: format!("Đã xóa \"{}\" khỏi seed.json", deleted.name),
            deleted_business: deleted,
            remaining_count: businesses.len(),
        })
    }

    async fn write_atomic(&self, businesses: &[SeedBusiness]) -> Result<(), SeedError> {
        let json = serde_json::to_string_pretty(businesses)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
