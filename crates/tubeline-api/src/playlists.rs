use axum::{
    Router,
    extract::State,
    routing::{get, patch, post},
};
use tracing::info;
use uuid::Uuid;

use tubeline_types::api::{CreatePlaylistRequest, UpdatePlaylistRequest};
use tubeline_types::models::{Playlist, PlaylistDetail};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, non_blank, parse_id};
use crate::middleware::{AuthUser, MaybeAuthUser};
use crate::response::{ApiResponse, Empty};
use crate::state::{AppState, with_db};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/playlist", post(create_playlist))
        .route("/playlist/user/{user_id}", get(user_playlists))
        .route(
            "/playlist/{playlist_id}",
            get(get_playlist).patch(update_playlist).delete(delete_playlist),
        )
        .route("/playlist/add/{video_id}/{playlist_id}", patch(add_video))
        .route("/playlist/remove/{video_id}/{playlist_id}", patch(remove_video))
}

/// POST /playlist
pub async fn create_playlist(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreatePlaylistRequest>,
) -> Result<ApiResponse<Playlist>, ApiError> {
    let (Some(name), Some(description)) = (
        non_blank(Some(req.name.as_str())).map(str::to_string),
        non_blank(Some(req.description.as_str())).map(str::to_string),
    ) else {
        return Err(ApiError::bad_request("Name and description are required"));
    };

    let owner_id = user.id();
    let created = with_db(&state, move |db| {
        if db.playlist_name_taken(&name, None)? {
            return Ok(None);
        }
        db.insert_playlist(Uuid::new_v4(), owner_id, &name, &description).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::conflict("A playlist with this name already exists"))?;

    info!("Playlist {} created by {}", created.id, owner_id);
    Ok(ApiResponse::created(created, "Playlist created successfully"))
}

/// GET /playlist/user/{user_id}
pub async fn user_playlists(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<String>,
) -> Result<ApiResponse<Vec<Playlist>>, ApiError> {
    let owner_id = parse_id(&user_id, "userId")?;
    let playlists = with_db(&state, move |db| db.get_user_playlists(owner_id)).await?;
    Ok(ApiResponse::ok(playlists, "User playlists fetched successfully"))
}

/// GET /playlist/{playlist_id}
pub async fn get_playlist(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    ApiPath(playlist_id): ApiPath<String>,
) -> Result<ApiResponse<PlaylistDetail>, ApiError> {
    let id = parse_id(&playlist_id, "playlistId")?;
    let viewer = viewer.id();
    let playlist = with_db(&state, move |db| db.get_playlist_detail(id, viewer))
        .await?
        .ok_or_else(|| ApiError::not_found("Playlist not found"))?;
    Ok(ApiResponse::ok(playlist, "Playlist fetched successfully"))
}

/// PATCH /playlist/{playlist_id}
pub async fn update_playlist(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(playlist_id): ApiPath<String>,
    ApiJson(req): ApiJson<UpdatePlaylistRequest>,
) -> Result<ApiResponse<Playlist>, ApiError> {
    let id = parse_id(&playlist_id, "playlistId")?;
    let name = non_blank(req.name.as_deref()).map(str::to_string);
    let description = non_blank(req.description.as_deref()).map(str::to_string);
    if name.is_none() && description.is_none() {
        return Err(ApiError::bad_request("Name or description is required"));
    }

    ensure_playlist_owner(&state, &user, id).await?;

    let updated = with_db(&state, move |db| {
        if let Some(name) = &name {
            if db.playlist_name_taken(name, Some(id))? {
                return Ok(Err(ApiError::conflict("A playlist with this name already exists")));
            }
        }
        Ok(Ok(db.update_playlist(id, name.as_deref(), description.as_deref())?))
    })
    .await??
    .ok_or_else(|| ApiError::not_found("Playlist not found"))?;

    Ok(ApiResponse::ok(updated, "Playlist updated successfully"))
}

/// DELETE /playlist/{playlist_id}
pub async fn delete_playlist(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(playlist_id): ApiPath<String>,
) -> Result<ApiResponse<Empty>, ApiError> {
    let id = parse_id(&playlist_id, "playlistId")?;
    ensure_playlist_owner(&state, &user, id).await?;

    with_db(&state, move |db| db.delete_playlist(id)).await?;
    Ok(ApiResponse::ok(Empty {}, "Playlist deleted successfully"))
}

/// PATCH /playlist/add/{video_id}/{playlist_id}. Adding a video that is
/// already present leaves the playlist unchanged.
pub async fn add_video(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath((video_id, playlist_id)): ApiPath<(String, String)>,
) -> Result<ApiResponse<PlaylistDetail>, ApiError> {
    let video_id = parse_id(&video_id, "videoId")?;
    let playlist_id = parse_id(&playlist_id, "playlistId")?;
    ensure_playlist_owner(&state, &user, playlist_id).await?;

    let caller = user.id();
    let playlist = with_db(&state, move |db| {
        if !db.get_video_row(video_id)?.is_some_and(|v| v.visible_to(Some(caller))) {
            return Ok(None);
        }
        db.add_video_to_playlist(playlist_id, video_id)?;
        db.get_playlist_detail(playlist_id, Some(caller))
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Video not found"))?;

    Ok(ApiResponse::ok(playlist, "Video added to playlist successfully"))
}

/// PATCH /playlist/remove/{video_id}/{playlist_id}
pub async fn remove_video(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath((video_id, playlist_id)): ApiPath<(String, String)>,
) -> Result<ApiResponse<PlaylistDetail>, ApiError> {
    let video_id = parse_id(&video_id, "videoId")?;
    let playlist_id = parse_id(&playlist_id, "playlistId")?;
    ensure_playlist_owner(&state, &user, playlist_id).await?;

    let caller = user.id();
    let playlist = with_db(&state, move |db| {
        if !db.remove_video_from_playlist(playlist_id, video_id)? {
            return Ok(None);
        }
        db.get_playlist_detail(playlist_id, Some(caller))
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Video is not in this playlist"))?;

    Ok(ApiResponse::ok(playlist, "Video removed from playlist successfully"))
}

async fn ensure_playlist_owner(state: &AppState, user: &AuthUser, id: Uuid) -> Result<(), ApiError> {
    let owned = with_db(state, move |db| db.get_playlist_owner(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Playlist not found"))?;
    user.ensure_owner(owned.owner_id, "playlist")
}
