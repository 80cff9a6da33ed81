pub mod cloudinary;
pub mod local;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::warn;

pub use cloudinary::{CloudinaryConfig, CloudinaryStore};
pub use local::LocalStore;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("media io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("media host request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("media host rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid media handle: {0}")]
    InvalidHandle(String),
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedMedia {
    pub url: String,
    /// Serialized [`MediaHandle`], stored next to the URL for later deletion.
    pub handle: String,
    /// Seconds, when the host reports one (videos only).
    pub duration: Option<f64>,
}

/// Deletion handle, written as `<resource_type>:<public_id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle {
    pub resource_type: String,
    pub public_id: String,
}

impl fmt::Display for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.public_id)
    }
}

impl FromStr for MediaHandle {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((kind, id)) if !kind.is_empty() && !id.is_empty() => Ok(Self {
                resource_type: kind.to_string(),
                public_id: id.to_string(),
            }),
            _ => Err(MediaError::InvalidHandle(s.to_string())),
        }
    }
}

/// The configured media backend.
pub enum MediaStore {
    Cloudinary(CloudinaryStore),
    Local(LocalStore),
}

impl MediaStore {
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Cloudinary(_) => "cloudinary",
            Self::Local(_) => "local",
        }
    }

    /// Upload a temporary file. The file is removed afterwards whether or not
    /// the upload succeeded.
    pub async fn upload(&self, path: &Path) -> Result<UploadedMedia, MediaError> {
        let result = match self {
            Self::Cloudinary(store) => store.upload(path).await,
            Self::Local(store) => store.upload(path).await,
        };
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove temp upload {}: {}", path.display(), e);
            }
        }
        result
    }

    pub async fn delete(&self, handle: &str) -> Result<(), MediaError> {
        let handle: MediaHandle = handle.parse()?;
        match self {
            Self::Cloudinary(store) => store.destroy(&handle).await,
            Self::Local(store) => store.delete(&handle).await,
        }
    }

    /// Best-effort delete for rollback and replacement. Failures are logged.
    pub async fn discard(&self, handle: Option<&str>) {
        let Some(handle) = handle.filter(|h| !h.is_empty()) else {
            return;
        };
        if let Err(e) = self.delete(handle).await {
            warn!("Failed to delete media asset {}: {}", handle, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_parses_and_prints() {
        let handle: MediaHandle = "video:abc/def".parse().unwrap();
        assert_eq!(handle.resource_type, "video");
        assert_eq!(handle.public_id, "abc/def");
        assert_eq!(handle.to_string(), "video:abc/def");

        assert!("no-separator".parse::<MediaHandle>().is_err());
        assert!(":missing-kind".parse::<MediaHandle>().is_err());
    }

    #[tokio::test]
    async fn upload_removes_the_temp_file() {
        let media_dir = tempfile::tempdir().unwrap();
        let tmp_dir = tempfile::tempdir().unwrap();
        let store = MediaStore::Local(
            LocalStore::new(media_dir.path().to_path_buf(), "http://cdn.test/media".into())
                .await
                .unwrap(),
        );

        let tmp = tmp_dir.path().join("upload.png");
        tokio::fs::write(&tmp, b"png bytes").await.unwrap();

        let uploaded = store.upload(&tmp).await.unwrap();
        assert!(!tmp.exists());
        assert!(uploaded.url.starts_with("http://cdn.test/media/"));

        store.delete(&uploaded.handle).await.unwrap();
        store.discard(Some("garbage")).await;
        store.discard(None).await;
    }
}
