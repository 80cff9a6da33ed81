use std::path::PathBuf;
use std::sync::Arc;

use tracing::error;

use tubeline_db::Database;
use tubeline_media::MediaStore;

use crate::auth::TokenConfig;
use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub media: MediaStore,
    pub tokens: TokenConfig,
    /// Where multipart file fields are spooled before upload.
    pub upload_dir: PathBuf,
    pub cookie_secure: bool,
    pub max_upload_bytes: usize,
}

/// Run a database call on the blocking pool.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    blocking(move || f(&state.db)).await
}

/// Run CPU-heavy or blocking work (hashing, SQLite) off the async workers.
pub async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal()
        })?
        .map_err(ApiError::from)
}
