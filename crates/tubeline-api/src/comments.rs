use axum::{
    Router,
    extract::State,
    routing::{get, patch},
};
use uuid::Uuid;

use tubeline_types::api::{ContentRequest, PageQuery};
use tubeline_types::models::{Comment, Page};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery, non_blank, pagination, parse_id};
use crate::middleware::AuthUser;
use crate::response::{ApiResponse, Empty};
use crate::state::{AppState, with_db};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/comments/{video_id}", get(list_comments).post(add_comment))
        .route(
            "/comments/c/{comment_id}",
            patch(update_comment).delete(delete_comment),
        )
}

fn content(req: &ContentRequest) -> Result<String, ApiError> {
    non_blank(Some(req.content.as_str()))
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request("Content is required"))
}

/// GET /comments/{video_id}
pub async fn list_comments(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(video_id): ApiPath<String>,
    ApiQuery(q): ApiQuery<PageQuery>,
) -> Result<ApiResponse<Page<Comment>>, ApiError> {
    let video_id = parse_id(&video_id, "videoId")?;
    let (page, limit) = pagination(q.page, q.limit);

    let viewer = user.id();
    let comments = with_db(&state, move |db| {
        if !db.get_video_row(video_id)?.is_some_and(|v| v.visible_to(Some(viewer))) {
            return Ok(None);
        }
        db.get_video_comments(video_id, page, limit).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Video not found"))?;

    Ok(ApiResponse::ok(comments, "Comments fetched successfully"))
}

/// POST /comments/{video_id}
pub async fn add_comment(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(video_id): ApiPath<String>,
    ApiJson(req): ApiJson<ContentRequest>,
) -> Result<ApiResponse<Comment>, ApiError> {
    let video_id = parse_id(&video_id, "videoId")?;
    let content = content(&req)?;
    let owner_id = user.id();

    let comment = with_db(&state, move |db| {
        if !db.get_video_row(video_id)?.is_some_and(|v| v.visible_to(Some(owner_id))) {
            return Ok(None);
        }
        db.insert_comment(Uuid::new_v4(), video_id, owner_id, &content).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Video not found"))?;

    Ok(ApiResponse::created(comment, "Comment added successfully"))
}

/// PATCH /comments/c/{comment_id}
pub async fn update_comment(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(comment_id): ApiPath<String>,
    ApiJson(req): ApiJson<ContentRequest>,
) -> Result<ApiResponse<Comment>, ApiError> {
    let id = parse_id(&comment_id, "commentId")?;
    let content = content(&req)?;

    let owned = with_db(&state, move |db| db.get_comment_owner(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;
    user.ensure_owner(owned.owner_id, "comment")?;

    let comment = with_db(&state, move |db| db.update_comment(id, &content))
        .await?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;

    Ok(ApiResponse::ok(comment, "Comment updated successfully"))
}

/// DELETE /comments/c/{comment_id}
pub async fn delete_comment(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(comment_id): ApiPath<String>,
) -> Result<ApiResponse<Empty>, ApiError> {
    let id = parse_id(&comment_id, "commentId")?;

    let owned = with_db(&state, move |db| db.get_comment_owner(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;
    user.ensure_owner(owned.owner_id, "comment")?;

    with_db(&state, move |db| db.delete_comment(id)).await?;
    Ok(ApiResponse::ok(Empty {}, "Comment deleted successfully"))
}
