//! Durable storage for uploaded files.
//!
//! Stored paths are relative (`record-images/<uuid>.png`) so the storage
//! root can move without rewriting rows.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use doctrack_core::error::{DocTrackError, DocTrackResult, FieldErrors};
use tracing::debug;
use uuid::Uuid;

/// Directory for receiving record images.
pub const RECORD_IMAGES_DIR: &str = "record-images";
/// Directory for outgoing record attachments.
pub const OUTGOING_DOCS_DIR: &str = "outgoing-docs";

/// Per-image upload limit.
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;
/// Outgoing attachment upload limit.
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpeg", "png", "jpg", "gif", "svg"];
const IMAGE_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/svg+xml"];

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("storage/public"),
        }
    }
}

/// One uploaded file, fully buffered.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Lowercased extension of the client-supplied file name.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
    }

    fn kilobytes(limit: usize) -> usize {
        limit / 1024
    }

    /// Images must be jpeg, png, jpg, gif or svg and at most 2 MB.
    pub fn check_image(&self, errors: &mut FieldErrors, field: &str) {
        let ext_ok = self
            .extension()
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()));
        let mime_ok = self
            .content_type
            .as_deref()
            .is_none_or(|m| IMAGE_MIME_TYPES.contains(&m.to_ascii_lowercase().as_str()));
        if !ext_ok || !mime_ok {
            errors.add(
                field,
                format!(
                    "The {field} must be a file of type: {}.",
                    IMAGE_EXTENSIONS.join(", ")
                ),
            );
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            errors.add(
                field,
                format!(
                    "The {field} may not be greater than {} kilobytes.",
                    Self::kilobytes(MAX_IMAGE_BYTES)
                ),
            );
        }
    }

    /// Attachments may be any type up to 10 MB.
    pub fn check_document(&self, errors: &mut FieldErrors, field: &str) {
        if self.bytes.len() > MAX_DOCUMENT_BYTES {
            errors.add(
                field,
                format!(
                    "The {field} may not be greater than {} kilobytes.",
                    Self::kilobytes(MAX_DOCUMENT_BYTES)
                ),
            );
        }
    }
}

/// Where uploaded files live.
pub trait FileStorage: Send + Sync {
    /// Persist `upload` under `dir` and return its relative path.
    fn put(&self, dir: &str, upload: &Upload)
    -> impl Future<Output = DocTrackResult<String>> + Send;

    /// Remove a stored file. Missing files are not an error.
    fn delete(&self, path: &str) -> impl Future<Output = DocTrackResult<()>> + Send;
}

/// Files on the local disk under a single root directory.
#[derive(Debug, Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
}

impl LocalDiskStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self { root: config.root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a relative stored path. Rejects anything that
    /// could escape the root.
    fn resolve(&self, relative: &str) -> DocTrackResult<PathBuf> {
        let path = Path::new(relative);
        if path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(DocTrackError::Storage(format!(
                "refusing path outside storage root: {relative}"
            )));
        }
        Ok(self.root.join(path))
    }
}

fn storage_error(err: std::io::Error) -> DocTrackError {
    DocTrackError::Storage(err.to_string())
}

impl FileStorage for LocalDiskStorage {
    async fn put(&self, dir: &str, upload: &Upload) -> DocTrackResult<String> {
        let name = match upload.extension() {
            Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
            None => Uuid::new_v4().to_string(),
        };
        let relative = format!("{dir}/{name}");
        let target = self.resolve(&relative)?;

        tokio::fs::create_dir_all(self.root.join(dir))
            .await
            .map_err(storage_error)?;
        tokio::fs::write(&target, &upload.bytes)
            .await
            .map_err(storage_error)?;

        debug!(path = %relative, bytes = upload.bytes.len(), "Stored upload");
        Ok(relative)
    }

    async fn delete(&self, path: &str) -> DocTrackResult<()> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(e)),
        }
    }
}
