use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::extract::{FromRequest, Multipart, Request};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use tubeline_media::UploadedMedia;

use crate::error::ApiError;
use crate::extract::non_blank;
use crate::state::AppState;

/// A multipart file field spooled to disk. The file is removed on drop.
pub struct TempUpload {
    path: PathBuf,
    pub file_name: String,
    pub size: u64,
}

impl TempUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove temp file {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Multipart body split into text fields and temp files.
#[derive(Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, TempUpload>,
}

impl UploadForm {
    /// Trimmed text field, `None` when missing or blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        non_blank(self.fields.get(name).map(String::as_str))
    }

    pub fn take_file(&mut self, name: &str) -> Option<TempUpload> {
        self.files.remove(name)
    }
}

impl FromRequest<AppState> for UploadForm {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state).await?;
        tokio::fs::create_dir_all(&state.upload_dir).await?;

        let mut form = UploadForm::default();
        while let Some(mut field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            let Some(file_name) = field.file_name().map(str::to_string) else {
                let value = field.text().await?;
                form.fields.insert(name, value);
                continue;
            };

            // Browsers send an empty part for a file input left blank.
            if file_name.is_empty() {
                continue;
            }

            let ext = Path::new(&file_name)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{}", e))
                .unwrap_or_default();
            let mut upload = TempUpload {
                path: state.upload_dir.join(format!("{}{}", Uuid::new_v4(), ext)),
                file_name,
                size: 0,
            };

            let mut file = tokio::fs::File::create(&upload.path).await?;
            while let Some(chunk) = field.chunk().await? {
                file.write_all(&chunk).await?;
                upload.size += chunk.len() as u64;
            }
            file.flush().await?;

            if upload.size == 0 {
                continue;
            }
            debug!("Spooled {} ({} bytes) for field {}", upload.file_name, upload.size, name);
            form.files.insert(name, upload);
        }

        Ok(form)
    }
}

/// Push a spooled file to the media store.
pub async fn upload_media(state: &AppState, file: TempUpload) -> Result<UploadedMedia, ApiError> {
    let uploaded = state.media.upload(file.path()).await?;
    Ok(uploaded)
}
