use axum::{Router, extract::State, routing::get};

use tubeline_types::models::{ChannelStats, Video};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::response::ApiResponse;
use crate::state::{AppState, with_db};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/stats", get(channel_stats))
        .route("/dashboard/videos", get(channel_videos))
}

/// GET /dashboard/stats
pub async fn channel_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ApiResponse<ChannelStats>, ApiError> {
    let id = user.id();
    let stats = with_db(&state, move |db| db.channel_stats(id)).await?;
    Ok(ApiResponse::ok(stats, "Channel stats fetched successfully"))
}

/// GET /dashboard/videos, including unpublished ones.
pub async fn channel_videos(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ApiResponse<Vec<Video>>, ApiError> {
    let id = user.id();
    let videos = with_db(&state, move |db| db.get_channel_videos(id)).await?;
    Ok(ApiResponse::ok(videos, "Channel videos fetched successfully"))
}
