pub mod auth;
pub mod comments;
pub mod cookies;
pub mod dashboard;
pub mod error;
pub mod extract;
pub mod healthcheck;
pub mod likes;
pub mod middleware;
pub mod playlists;
pub mod response;
pub mod state;
pub mod subscriptions;
pub mod tweets;
pub mod upload;
pub mod users;
pub mod videos;

use axum::{Router, extract::DefaultBodyLimit};

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// Body limit for everything but the multipart upload routes.
pub const JSON_BODY_LIMIT: usize = 64 * 1024;

/// All routes under `/api/v1`. Unknown paths answer with the failure envelope.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(healthcheck::routes())
        .merge(users::routes(state.max_upload_bytes))
        .merge(videos::routes(state.max_upload_bytes))
        .merge(comments::routes())
        .merge(likes::routes())
        .merge(playlists::routes())
        .merge(subscriptions::routes())
        .merge(tweets::routes())
        .merge(dashboard::routes());

    Router::new()
        .nest("/api/v1", api)
        .fallback(|| async { ApiError::not_found("Route not found") })
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .with_state(state)
}
