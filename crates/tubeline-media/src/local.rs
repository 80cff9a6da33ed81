use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{MediaError, MediaHandle, UploadedMedia};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm", "avi", "m4v"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "svg"];

/// Stores media in a local directory served over HTTP.
///
/// Each asset is a flat file at `{dir}/{uuid}.{ext}`, reachable at
/// `{public_url}/{uuid}.{ext}`.
pub struct LocalStore {
    dir: PathBuf,
    public_url: String,
}

impl LocalStore {
    pub async fn new(dir: PathBuf, public_url: String) -> Result<Self, MediaError> {
        fs::create_dir_all(&dir).await?;
        info!("Local media directory: {}", dir.display());
        Ok(Self {
            dir,
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn upload(&self, path: &Path) -> Result<UploadedMedia, MediaError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let name = match &ext {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };

        fs::copy(path, self.dir.join(&name)).await?;

        let handle = MediaHandle {
            resource_type: resource_type(ext.as_deref()).to_string(),
            public_id: name.clone(),
        };
        Ok(UploadedMedia {
            url: format!("{}/{}", self.public_url, name),
            handle: handle.to_string(),
            duration: None,
        })
    }

    /// Delete a stored asset. Missing files are not an error.
    pub async fn delete(&self, handle: &MediaHandle) -> Result<(), MediaError> {
        let name = &handle.public_id;
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(MediaError::InvalidHandle(handle.to_string()));
        }

        match fs::remove_file(self.dir.join(name)).await {
            Ok(()) => {
                info!("Deleted local media {}", name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Local media {} already gone", name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn resource_type(ext: Option<&str>) -> &'static str {
    match ext {
        Some(ext) if VIDEO_EXTENSIONS.contains(&ext) => "video",
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => "image",
        _ => "raw",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("media"), "http://localhost:8000/media/".into())
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn upload_copies_under_fresh_name_keeping_extension() {
        let (dir, store) = store().await;
        let src = dir.path().join("clip.MP4");
        fs::write(&src, b"video bytes").await.unwrap();

        let uploaded = store.upload(&src).await.unwrap();
        let handle: MediaHandle = uploaded.handle.parse().unwrap();

        assert_eq!(handle.resource_type, "video");
        assert!(handle.public_id.ends_with(".mp4"));
        assert_eq!(uploaded.url, format!("http://localhost:8000/media/{}", handle.public_id));
        assert_eq!(fs::read(store.dir().join(&handle.public_id)).await.unwrap(), b"video bytes");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (dir, store) = store().await;
        let src = dir.path().join("avatar.png");
        fs::write(&src, b"img").await.unwrap();

        let uploaded = store.upload(&src).await.unwrap();
        let handle: MediaHandle = uploaded.handle.parse().unwrap();
        store.delete(&handle).await.unwrap();
        assert!(!store.dir().join(&handle.public_id).exists());
        store.delete(&handle).await.unwrap();
    }

    #[tokio::test]
    async fn delete_refuses_paths_outside_the_directory() {
        let (_dir, store) = store().await;
        let handle = MediaHandle { resource_type: "raw".into(), public_id: "../secret".into() };
        assert!(matches!(store.delete(&handle).await, Err(MediaError::InvalidHandle(_))));
    }

    #[test]
    fn resource_type_follows_extension() {
        assert_eq!(resource_type(Some("webm")), "video");
        assert_eq!(resource_type(Some("jpeg")), "image");
        assert_eq!(resource_type(Some("pdf")), "raw");
        assert_eq!(resource_type(None), "raw");
    }
}
