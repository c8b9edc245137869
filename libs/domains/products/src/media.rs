//! Uploaded files and where product photos end up.
//!
//! A photo upload is sniffed for a known image signature during validation,
//! then written through a [`MediaStorage`] before the product row is saved.
//! The row keeps the returned reference, e.g. `products/photos/<uuid>.png`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ProductError, ProductResult};

/// Directory, relative to the media root, holding product photos
pub const PHOTO_DIR: &str = "products/photos";

/// Media root used when none is configured
pub const DEFAULT_MEDIA_ROOT: &str = "media";

/// A file part of a `multipart/form-data` body.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// File extension for bytes carrying a PNG, JPEG, GIF or WebP signature.
pub fn image_extension(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("jpg"),
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some("gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("webp"),
        _ => None,
    }
}

/// `products/photos/<uuid>.<ext>`
pub fn photo_reference(upload: &Upload) -> String {
    let extension = image_extension(&upload.bytes).unwrap_or("bin");
    format!("{}/{}.{}", PHOTO_DIR, Uuid::new_v4(), extension)
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Stores a validated photo and returns the reference kept on the product
    async fn save_photo(&self, upload: &Upload) -> ProductResult<String>;
}

/// Writes photos below a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalMediaStorage {
    root: PathBuf,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for LocalMediaStorage {
    fn default() -> Self {
        Self::new(DEFAULT_MEDIA_ROOT)
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn save_photo(&self, upload: &Upload) -> ProductResult<String> {
        let reference = photo_reference(upload);
        let path = self.root.join(&reference);

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| ProductError::Storage(e.to_string()))?;
        }
        tokio::fs::write(&path, &upload.bytes)
            .await
            .map_err(|e| ProductError::Storage(e.to_string()))?;

        tracing::info!(
            photo = %reference,
            bytes = upload.bytes.len(),
            original = upload.file_name.as_deref().unwrap_or_default(),
            "Stored product photo"
        );
        Ok(reference)
    }
}

/// In-memory photo store (for development/testing).
#[derive(Debug, Default, Clone)]
pub struct InMemoryMediaStorage {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryMediaStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, reference: &str) -> Option<Vec<u8>> {
        self.files.read().await.get(reference).cloned()
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[async_trait]
impl MediaStorage for InMemoryMediaStorage {
    async fn save_photo(&self, upload: &Upload) -> ProductResult<String> {
        let reference = photo_reference(upload);
        self.files
            .write()
            .await
            .insert(reference.clone(), upload.bytes.clone());
        Ok(reference)
    }
}
