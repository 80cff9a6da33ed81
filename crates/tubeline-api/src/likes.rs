use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use uuid::Uuid;

use tubeline_db::LikeTarget;
use tubeline_types::api::LikeStatus;
use tubeline_types::models::Video;

use crate::error::ApiError;
use crate::extract::{ApiPath, parse_id};
use crate::middleware::AuthUser;
use crate::response::ApiResponse;
use crate::state::{AppState, with_db};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/likes/toggle/v/{video_id}", post(toggle_video_like))
        .route("/likes/toggle/c/{comment_id}", post(toggle_comment_like))
        .route("/likes/toggle/t/{tweet_id}", post(toggle_tweet_like))
        .route("/likes/videos", get(liked_videos))
}

/// POST /likes/toggle/v/{video_id}
pub async fn toggle_video_like(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(video_id): ApiPath<String>,
) -> Result<ApiResponse<LikeStatus>, ApiError> {
    let target = LikeTarget::Video(parse_id(&video_id, "videoId")?);
    toggle(state, user, target).await
}

/// POST /likes/toggle/c/{comment_id}
pub async fn toggle_comment_like(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(comment_id): ApiPath<String>,
) -> Result<ApiResponse<LikeStatus>, ApiError> {
    let target = LikeTarget::Comment(parse_id(&comment_id, "commentId")?);
    toggle(state, user, target).await
}

/// POST /likes/toggle/t/{tweet_id}
pub async fn toggle_tweet_like(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(tweet_id): ApiPath<String>,
) -> Result<ApiResponse<LikeStatus>, ApiError> {
    let target = LikeTarget::Tweet(parse_id(&tweet_id, "tweetId")?);
    toggle(state, user, target).await
}

async fn toggle(state: AppState, user: AuthUser, target: LikeTarget) -> Result<ApiResponse<LikeStatus>, ApiError> {
    let user_id = user.id();
    let liked = with_db(&state, move |db| {
        let exists = match target {
            LikeTarget::Video(id) => db.get_video_row(id)?.is_some_and(|v| v.visible_to(Some(user_id))),
            LikeTarget::Comment(id) => db.get_comment_owner(id)?.is_some(),
            LikeTarget::Tweet(id) => db.get_tweet_owner(id)?.is_some(),
        };
        if !exists {
            return Ok(None);
        }
        db.toggle_like(Uuid::new_v4(), target, user_id).map(Some)
    })
    .await?
    .ok_or_else(|| {
        let what = match target {
            LikeTarget::Video(_) => "Video",
            LikeTarget::Comment(_) => "Comment",
            LikeTarget::Tweet(_) => "Tweet",
        };
        ApiError::not_found(format!("{} not found", what))
    })?;

    let message = if liked { "Liked successfully" } else { "Unliked successfully" };
    Ok(ApiResponse::ok(LikeStatus { is_liked: liked }, message))
}

/// GET /likes/videos
pub async fn liked_videos(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ApiResponse<Vec<Video>>, ApiError> {
    let user_id = user.id();
    let videos = with_db(&state, move |db| db.get_liked_videos(user_id)).await?;
    Ok(ApiResponse::ok(videos, "Liked videos fetched successfully"))
}
