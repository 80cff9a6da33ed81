use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    handler::Handler,
    http::{HeaderValue, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
    routing::{get, patch, post},
};
use axum_extra::extract::CookieJar;
use tracing::{info, warn};
use uuid::Uuid;

use tubeline_db::models::NewUser;
use tubeline_types::api::{
    ChangePasswordRequest, LoginRequest, LoginResponse, RefreshRequest, TokenPair, UpdateAccountRequest,
};
use tubeline_types::models::{ChannelProfile, User, Video};

use crate::auth::{hash_password, verify_password};
use crate::cookies::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, build_clear_cookie, build_token_cookie};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, non_blank};
use crate::middleware::{AuthUser, MaybeAuthUser};
use crate::response::{ApiResponse, Empty};
use crate::state::{AppState, blocking, with_db};
use crate::upload::{UploadForm, upload_media};

/// `upload_limit` caps the multipart routes; the rest keep the router default.
pub fn routes(upload_limit: usize) -> Router<AppState> {
    let uploads = DefaultBodyLimit::max(upload_limit);
    Router::new()
        .route("/users/register", post(register.layer(uploads)))
        .route("/users/login", post(login))
        .route("/users/logout", post(logout))
        .route("/users/refresh-token", post(refresh_token))
        .route("/users/change-password", post(change_password))
        .route("/users/current-user", get(current_user))
        .route("/users/update-account", patch(update_account))
        .route("/users/avatar", patch(update_avatar.layer(uploads)))
        .route("/users/cover-image", patch(update_cover_image.layer(uploads)))
        .route("/users/c/{username}", get(channel_profile))
        .route("/users/history", get(watch_history))
}

type SessionCookies = AppendHeaders<[(axum::http::HeaderName, HeaderValue); 2]>;

fn session_cookies(state: &AppState, pair: &TokenPair) -> Result<SessionCookies, ApiError> {
    Ok(AppendHeaders([
        (
            SET_COOKIE,
            build_token_cookie(ACCESS_TOKEN_COOKIE, &pair.access_token, state.tokens.access_ttl, state.cookie_secure)?,
        ),
        (
            SET_COOKIE,
            build_token_cookie(REFRESH_TOKEN_COOKIE, &pair.refresh_token, state.tokens.refresh_ttl, state.cookie_secure)?,
        ),
    ]))
}

fn cleared_cookies(state: &AppState) -> Result<SessionCookies, ApiError> {
    Ok(AppendHeaders([
        (SET_COOKIE, build_clear_cookie(ACCESS_TOKEN_COOKIE, state.cookie_secure)?),
        (SET_COOKIE, build_clear_cookie(REFRESH_TOKEN_COOKIE, state.cookie_secure)?),
    ]))
}

/// POST /users/register (multipart)
pub async fn register(
    State(state): State<AppState>,
    mut form: UploadForm,
) -> Result<ApiResponse<User>, ApiError> {
    let (Some(fullname), Some(email), Some(username), Some(password)) = (
        form.text("fullname").map(str::to_string),
        form.text("email").map(str::to_string),
        form.text("username").map(|u| u.to_lowercase()),
        form.text("password").map(str::to_string),
    ) else {
        return Err(ApiError::bad_request("All fields are required"));
    };
    if !email.contains('@') {
        return Err(ApiError::bad_request("Invalid email address"));
    }

    let (u, e) = (username.clone(), email.clone());
    if with_db(&state, move |db| db.find_user_by_username_or_email(&u, &e))
        .await?
        .is_some()
    {
        return Err(ApiError::conflict("User with email or username already exists"));
    }

    let avatar_file = form
        .take_file("avatar")
        .ok_or_else(|| ApiError::bad_request("Avatar file is required"))?;
    let cover_file = form.take_file("coverImage");

    let password_hash = blocking(move || hash_password(&password)).await?;

    let avatar = upload_media(&state, avatar_file).await?;
    let cover = match cover_file {
        Some(file) => match upload_media(&state, file).await {
            Ok(uploaded) => Some(uploaded),
            Err(e) => {
                state.media.discard(Some(avatar.handle.as_str())).await;
                return Err(e);
            }
        },
        None => None,
    };

    let user_id = Uuid::new_v4();
    let (avatar_row, cover_row) = (avatar.clone(), cover.clone());
    let created = with_db(&state, move |db| {
        db.create_user(&NewUser {
            id: user_id,
            username: &username,
            email: &email,
            fullname: &fullname,
            password_hash: &password_hash,
            avatar: &avatar_row.url,
            avatar_handle: Some(&avatar_row.handle),
            cover_image: cover_row.as_ref().map(|c| c.url.as_str()).unwrap_or(""),
            cover_image_handle: cover_row.as_ref().map(|c| c.handle.as_str()),
        })?;
        db.get_user_by_id(user_id)
    })
    .await;

    let row = match created {
        Ok(Some(row)) => row,
        failed => {
            warn!("Registration failed after upload, removing assets for {}", user_id);
            state.media.discard(Some(avatar.handle.as_str())).await;
            state.media.discard(cover.as_ref().map(|c| c.handle.as_str())).await;
            return Err(failed.err().unwrap_or_else(ApiError::internal));
        }
    };

    info!("User registered: {} ({})", row.username, row.id);
    Ok(ApiResponse::created(row.into(), "User registered successfully"))
}

/// POST /users/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = non_blank(req.username.as_deref()).map(str::to_lowercase);
    let email = non_blank(req.email.as_deref()).map(str::to_string);
    if username.is_none() && email.is_none() {
        return Err(ApiError::bad_request("username or email is required"));
    }

    let user = with_db(&state, move |db| {
        db.find_user_by_username_or_email(
            username.as_deref().unwrap_or(""),
            email.as_deref().unwrap_or(""),
        )
    })
    .await?
    .ok_or_else(|| ApiError::not_found("User does not exist"))?;

    let (password, hash) = (req.password, user.password.clone());
    if !blocking(move || verify_password(&password, &hash)).await? {
        return Err(ApiError::unauthorized("Invalid user credentials"));
    }

    let pair = state.tokens.issue_pair(&user)?;
    let (id, refresh) = (user.id, pair.refresh_token.clone());
    with_db(&state, move |db| db.set_refresh_token(id, Some(&refresh))).await?;

    info!("User logged in: {}", user.username);
    let cookies = session_cookies(&state, &pair)?;
    Ok((
        cookies,
        ApiResponse::ok(
            LoginResponse {
                user: user.into(),
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

/// POST /users/logout
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> Result<impl IntoResponse, ApiError> {
    let id = user.id();
    with_db(&state, move |db| db.set_refresh_token(id, None)).await?;
    Ok((cleared_cookies(&state)?, ApiResponse::ok(Empty {}, "User logged out")))
}

/// POST /users/refresh-token. The token comes from the cookie or a JSON body.
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let from_body = if body.is_empty() {
        RefreshRequest::default()
    } else {
        serde_json::from_slice::<RefreshRequest>(&body).unwrap_or_default()
    };
    let incoming = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
        .or(from_body.refresh_token)
        .ok_or_else(|| ApiError::unauthorized("Unauthorized request"))?;

    let claims = state
        .tokens
        .verify_refresh(&incoming)
        .map_err(|_| ApiError::unauthorized("Invalid refresh token"))?;

    let user = with_db(&state, move |db| db.get_user_by_id(claims.sub))
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid refresh token"))?;
    if user.refresh_token.as_deref() != Some(incoming.as_str()) {
        return Err(ApiError::unauthorized("Refresh token is expired or used"));
    }

    let pair = state.tokens.issue_pair(&user)?;
    let (id, refresh) = (user.id, pair.refresh_token.clone());
    with_db(&state, move |db| db.set_refresh_token(id, Some(&refresh))).await?;

    let cookies = session_cookies(&state, &pair)?;
    Ok((cookies, ApiResponse::ok(pair, "Access token refreshed")))
}

/// POST /users/change-password
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<ApiResponse<Empty>, ApiError> {
    if req.new_password.trim().is_empty() {
        return Err(ApiError::bad_request("New password is required"));
    }

    let (old, hash) = (req.old_password, user.0.password.clone());
    if !blocking(move || verify_password(&old, &hash)).await? {
        return Err(ApiError::bad_request("Invalid old password"));
    }

    let new = req.new_password;
    let new_hash = blocking(move || hash_password(&new)).await?;
    let id = user.id();
    with_db(&state, move |db| db.set_password(id, &new_hash)).await?;

    Ok(ApiResponse::ok(Empty {}, "Password changed successfully"))
}

/// GET /users/current-user
pub async fn current_user(user: AuthUser) -> ApiResponse<User> {
    ApiResponse::ok(user.0.into(), "User fetched successfully")
}

/// PATCH /users/update-account
pub async fn update_account(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<UpdateAccountRequest>,
) -> Result<ApiResponse<User>, ApiError> {
    let fullname = non_blank(req.fullname.as_deref()).map(str::to_string);
    let email = non_blank(req.email.as_deref()).map(str::to_string);
    if fullname.is_none() && email.is_none() {
        return Err(ApiError::bad_request("At least one field is required"));
    }
    if email.as_deref().is_some_and(|e| !e.contains('@')) {
        return Err(ApiError::bad_request("Invalid email address"));
    }

    let id = user.id();
    let updated = with_db(&state, move |db| {
        if let Some(email) = &email {
            if db.email_taken_by_other(email, id)? {
                return Ok(Err(ApiError::conflict("Email is already in use")));
            }
        }
        Ok(Ok(db.update_account(id, fullname.as_deref(), email.as_deref())?))
    })
    .await??
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(ApiResponse::ok(updated.into(), "Account details updated successfully"))
}

/// PATCH /users/avatar (multipart `avatar`)
pub async fn update_avatar(
    State(state): State<AppState>,
    user: AuthUser,
    form: UploadForm,
) -> Result<ApiResponse<User>, ApiError> {
    replace_image(state, user, form, ImageSlot::Avatar).await
}

/// PATCH /users/cover-image (multipart `coverImage`)
pub async fn update_cover_image(
    State(state): State<AppState>,
    user: AuthUser,
    form: UploadForm,
) -> Result<ApiResponse<User>, ApiError> {
    replace_image(state, user, form, ImageSlot::Cover).await
}

#[derive(Clone, Copy)]
enum ImageSlot {
    Avatar,
    Cover,
}

async fn replace_image(
    state: AppState,
    user: AuthUser,
    mut form: UploadForm,
    slot: ImageSlot,
) -> Result<ApiResponse<User>, ApiError> {
    let (field, label) = match slot {
        ImageSlot::Avatar => ("avatar", "Avatar"),
        ImageSlot::Cover => ("coverImage", "Cover image"),
    };
    let file = form
        .take_file(field)
        .ok_or_else(|| ApiError::bad_request(format!("{} file is missing", label)))?;

    let uploaded = upload_media(&state, file).await?;

    let id = user.id();
    let (url, handle) = (uploaded.url.clone(), uploaded.handle.clone());
    let result = with_db(&state, move |db| {
        let previous = match slot {
            ImageSlot::Avatar => db.set_avatar(id, &url, Some(&handle))?,
            ImageSlot::Cover => db.set_cover_image(id, &url, Some(&handle))?,
        };
        Ok((previous, db.get_user_by_id(id)?))
    })
    .await;

    match result {
        Ok((previous, Some(row))) => {
            state.media.discard(previous.as_deref()).await;
            Ok(ApiResponse::ok(row.into(), format!("{} updated successfully", label)))
        }
        Ok((_, None)) => {
            state.media.discard(Some(uploaded.handle.as_str())).await;
            Err(ApiError::not_found("User not found"))
        }
        Err(e) => {
            state.media.discard(Some(uploaded.handle.as_str())).await;
            Err(e)
        }
    }
}

/// GET /users/c/{username}
pub async fn channel_profile(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    ApiPath(username): ApiPath<String>,
) -> Result<ApiResponse<ChannelProfile>, ApiError> {
    let username = username.trim().to_lowercase();
    if username.is_empty() {
        return Err(ApiError::bad_request("username is missing"));
    }

    let viewer = viewer.id();
    let profile = with_db(&state, move |db| db.get_channel_profile(&username, viewer))
        .await?
        .ok_or_else(|| ApiError::not_found("Channel does not exist"))?;

    Ok(ApiResponse::ok(profile, "User channel fetched successfully"))
}

/// GET /users/history
pub async fn watch_history(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ApiResponse<Vec<Video>>, ApiError> {
    let id = user.id();
    let history = with_db(&state, move |db| db.get_watch_history(id)).await?;
    Ok(ApiResponse::ok(history, "Watch history fetched successfully"))
}
