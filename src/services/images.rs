//! Image storage.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::errors::AppError;

/// Largest accepted upload.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// What an uploaded image is used for. Each kind gets its own directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Profile,
    Cover,
    Recipe,
}

impl ImageKind {
    pub fn dir_name(&self) -> &'static str {
        match self {
            ImageKind::Profile => "profiles",
            ImageKind::Cover => "covers",
            ImageKind::Recipe => "recipes",
        }
    }
}

/// File extension for an accepted content type.
fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Persists uploaded images and returns the URL they are served from.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(
        &self,
        kind: ImageKind,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, AppError>;
}

/// Stores images on the local disk under the upload directory.
///
/// Files are served by the router under `/uploads`.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(
        &self,
        kind: ImageKind,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, AppError> {
        let extension = extension_for(content_type).ok_or_else(|| {
            AppError::validation("Only JPEG, PNG, WebP and GIF images are allowed")
        })?;
        if bytes.is_empty() {
            return Err(AppError::validation("Image is empty"));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(AppError::validation("Image exceeds the 5 MB limit"));
        }

        let dir = self.root.join(kind.dir_name());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create upload directory: {}", e)))?;

        let file_name = format!("{}.{}", uuid::Uuid::new_v4(), extension);
        tokio::fs::write(dir.join(&file_name), bytes)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write image: {}", e)))?;

        tracing::info!(kind = kind.dir_name(), file = %file_name, size = bytes.len(), "Image stored");
        Ok(format!("/uploads/{}/{}", kind.dir_name(), file_name))
    }
}
