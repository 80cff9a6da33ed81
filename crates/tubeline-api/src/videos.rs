use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    handler::Handler,
    routing::{get, patch},
};
use tracing::{info, warn};
use uuid::Uuid;

use tubeline_db::VideoFilter;
use tubeline_db::models::NewVideo;
use tubeline_db::queries::videos::VideoUpdate;
use tubeline_types::api::{PublishStatus, VideoListQuery, VideoSort};
use tubeline_types::models::{Page, Video};

use crate::error::ApiError;
use crate::extract::{ApiPath, ApiQuery, pagination, parse_id};
use crate::middleware::{AuthUser, MaybeAuthUser};
use crate::response::{ApiResponse, Empty};
use crate::state::{AppState, with_db};
use crate::upload::{UploadForm, upload_media};

/// `upload_limit` caps publish and update, which carry files.
pub fn routes(upload_limit: usize) -> Router<AppState> {
    let uploads = DefaultBodyLimit::max(upload_limit);
    Router::new()
        .route("/videos", get(list_videos).post(publish_video.layer(uploads)))
        .route(
            "/videos/{video_id}",
            get(get_video)
                .patch(update_video.layer(uploads))
                .delete(delete_video),
        )
        .route("/videos/toggle/publish/{video_id}", patch(toggle_publish))
}

/// GET /videos
pub async fn list_videos(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<VideoListQuery>,
) -> Result<ApiResponse<Page<Video>>, ApiError> {
    let owner = match q.user_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(parse_id(raw, "userId")?),
        None => None,
    };
    let (page, limit) = pagination(q.page, q.limit);
    let filter = VideoFilter {
        query: q.query,
        owner,
        sort: VideoSort::from_params(q.sort_by.as_deref(), q.sort_type.as_deref()),
        page,
        limit,
    };

    let videos = with_db(&state, move |db| db.search_videos(&filter)).await?;
    Ok(ApiResponse::ok(videos, "Videos fetched successfully"))
}

/// POST /videos (multipart: title, description, videoFile, thumbnail)
pub async fn publish_video(
    State(state): State<AppState>,
    user: AuthUser,
    mut form: UploadForm,
) -> Result<ApiResponse<Video>, ApiError> {
    let (Some(title), Some(description)) = (
        form.text("title").map(str::to_string),
        form.text("description").map(str::to_string),
    ) else {
        return Err(ApiError::bad_request("Title and description are required"));
    };
    let video_file = form
        .take_file("videoFile")
        .ok_or_else(|| ApiError::bad_request("Video file is required"))?;
    let thumbnail_file = form
        .take_file("thumbnail")
        .ok_or_else(|| ApiError::bad_request("Thumbnail is required"))?;

    let video = upload_media(&state, video_file).await?;
    let thumbnail = match upload_media(&state, thumbnail_file).await {
        Ok(uploaded) => uploaded,
        Err(e) => {
            state.media.discard(Some(video.handle.as_str())).await;
            return Err(e);
        }
    };

    let id = Uuid::new_v4();
    let owner_id = user.id();
    let (video_row, thumb_row) = (video.clone(), thumbnail.clone());
    let created = with_db(&state, move |db| {
        db.insert_video(&NewVideo {
            id,
            owner_id,
            title: &title,
            description: &description,
            video_file: &video_row.url,
            video_handle: Some(&video_row.handle),
            thumbnail: &thumb_row.url,
            thumbnail_handle: Some(&thumb_row.handle),
            duration: video_row.duration.unwrap_or(0.0),
        })?;
        db.get_video(id)
    })
    .await;

    match created {
        Ok(Some(created)) => {
            info!("Video {} published by {}", id, owner_id);
            Ok(ApiResponse::created(created, "Video published successfully"))
        }
        failed => {
            warn!("Publishing video {} failed after upload, removing assets", id);
            state.media.discard(Some(video.handle.as_str())).await;
            state.media.discard(Some(thumbnail.handle.as_str())).await;
            Err(failed.err().unwrap_or_else(ApiError::internal))
        }
    }
}

/// GET /videos/{video_id}. Counts a view and records watch history for
/// signed-in viewers. Unpublished videos are visible to their owner only.
pub async fn get_video(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    ApiPath(video_id): ApiPath<String>,
) -> Result<ApiResponse<Video>, ApiError> {
    let id = parse_id(&video_id, "videoId")?;
    let viewer = viewer.id();

    let video = with_db(&state, move |db| {
        let Some(row) = db.get_video_row(id)? else {
            return Ok(None);
        };
        if !row.visible_to(viewer) {
            return Ok(None);
        }
        db.increment_views(id)?;
        if let Some(viewer) = viewer {
            db.record_watch(viewer, id)?;
        }
        db.get_video(id)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Video not found"))?;

    Ok(ApiResponse::ok(video, "Video fetched successfully"))
}

/// PATCH /videos/{video_id} (multipart: title?, description?, thumbnail?)
pub async fn update_video(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(video_id): ApiPath<String>,
    mut form: UploadForm,
) -> Result<ApiResponse<Video>, ApiError> {
    let id = parse_id(&video_id, "videoId")?;
    let title = form.text("title").map(str::to_string);
    let description = form.text("description").map(str::to_string);
    let thumbnail_file = form.take_file("thumbnail");
    if title.is_none() && description.is_none() && thumbnail_file.is_none() {
        return Err(ApiError::bad_request("Nothing to update"));
    }

    let existing = with_db(&state, move |db| db.get_video_row(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    user.ensure_owner(existing.owner_id, "video")?;

    let thumbnail = match thumbnail_file {
        Some(file) => Some(upload_media(&state, file).await?),
        None => None,
    };

    let new_thumb = thumbnail.clone();
    let updated = with_db(&state, move |db| {
        db.update_video(
            id,
            &VideoUpdate {
                title: title.as_deref(),
                description: description.as_deref(),
                thumbnail: new_thumb.as_ref().map(|t| t.url.as_str()),
                thumbnail_handle: new_thumb.as_ref().map(|t| t.handle.as_str()),
            },
        )
    })
    .await;

    match updated {
        Ok(Some(video)) => {
            if thumbnail.is_some() {
                state.media.discard(existing.thumbnail_handle.as_deref()).await;
            }
            Ok(ApiResponse::ok(video, "Video updated successfully"))
        }
        failed => {
            state.media.discard(thumbnail.as_ref().map(|t| t.handle.as_str())).await;
            Err(failed
                .err()
                .unwrap_or_else(|| ApiError::not_found("Video not found")))
        }
    }
}

/// DELETE /videos/{video_id}
pub async fn delete_video(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(video_id): ApiPath<String>,
) -> Result<ApiResponse<Empty>, ApiError> {
    let id = parse_id(&video_id, "videoId")?;
    let existing = with_db(&state, move |db| db.get_video_row(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    user.ensure_owner(existing.owner_id, "video")?;

    with_db(&state, move |db| db.delete_video(id)).await?;
    state.media.discard(existing.video_handle.as_deref()).await;
    state.media.discard(existing.thumbnail_handle.as_deref()).await;

    info!("Video {} deleted by {}", id, user.id());
    Ok(ApiResponse::ok(Empty {}, "Video deleted successfully"))
}

/// PATCH /videos/toggle/publish/{video_id}. A malformed id is reported as 401,
/// matching what existing clients expect from this route.
pub async fn toggle_publish(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(video_id): ApiPath<String>,
) -> Result<ApiResponse<PublishStatus>, ApiError> {
    let id: Uuid = video_id
        .parse()
        .map_err(|_| ApiError::unauthorized("Invalid videoId"))?;

    let existing = with_db(&state, move |db| db.get_video_row(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    user.ensure_owner(existing.owner_id, "video")?;

    let is_published = with_db(&state, move |db| db.toggle_published(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    Ok(ApiResponse::ok(
        PublishStatus { id, is_published },
        "Publish status toggled successfully",
    ))
}
