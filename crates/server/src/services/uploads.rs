//! Product image storage on local disk.
//!
//! Uploaded images are written under the configured directory with a
//! random filename and served back at `/uploads/<name>`. Replacing or
//! deleting a product removes its prior asset; removal failures are
//! logged, not propagated, since the database record is already gone.

use std::path::{Path, PathBuf};

use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use thiserror::Error;

/// Public URL prefix for stored images.
pub const PUBLIC_PREFIX: &str = "/uploads/";

const FILENAME_LENGTH: usize = 16;
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// Upload errors.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Extension missing or not an image type we accept.
    #[error("unsupported image type (expected one of: jpg, jpeg, png, webp, gif)")]
    UnsupportedType,

    /// Filesystem failure.
    #[error("image write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Stores image assets under a root directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    /// Create a store rooted at `root`. The directory is created on
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory the assets live in (for `ServeDir`).
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` under a random name keeping the original
    /// extension, returning the public URL path.
    ///
    /// # Errors
    ///
    /// [`UploadError::UnsupportedType`] for a non-image extension,
    /// [`UploadError::Io`] on write failure.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, UploadError> {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|e| ALLOWED_EXTENSIONS.contains(&e.as_str()))
            .ok_or(UploadError::UnsupportedType)?;

        let stem: String = rng()
            .sample_iter(&Alphanumeric)
            .take(FILENAME_LENGTH)
            .map(char::from)
            .collect();
        let filename = format!("{stem}.{extension}");

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&filename), bytes).await?;

        Ok(format!("{PUBLIC_PREFIX}{filename}"))
    }

    /// Best-effort removal of a previously stored asset by its public
    /// URL. URLs outside the store (or path-traversal attempts) are
    /// ignored.
    pub async fn delete(&self, public_url: &str) {
        let Some(filename) = public_url.strip_prefix(PUBLIC_PREFIX) else {
            return;
        };
        // A stored name is a single path component.
        if filename.contains('/') || filename.contains("..") || filename.is_empty() {
            return;
        }

        match tokio::fs::remove_file(self.root.join(filename)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(url = public_url, error = %e, "failed to remove image asset"),
        }
    }
}
