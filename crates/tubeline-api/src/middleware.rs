use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
};
use axum_extra::extract::CookieJar;
use tracing::debug;
use uuid::Uuid;

use tubeline_db::models::UserRow;

use crate::cookies::ACCESS_TOKEN_COOKIE;
use crate::error::ApiError;
use crate::state::{AppState, with_db};

/// Authenticated caller. Rejects with 401 when the access token is missing,
/// invalid, expired, or names a user that no longer exists.
pub struct AuthUser(pub UserRow);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    /// Ownership check shared by every mutating handler.
    pub fn ensure_owner(&self, owner_id: Uuid, what: &str) -> Result<(), ApiError> {
        if self.0.id == owner_id {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!("You are not the owner of this {}", what)))
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(AuthUser)
    }
}

/// Caller if a valid token was presented, otherwise anonymous.
pub struct MaybeAuthUser(pub Option<UserRow>);

impl MaybeAuthUser {
    pub fn id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|u| u.id)
    }
}

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match authenticate(parts, state).await {
            Ok(user) => Ok(MaybeAuthUser(Some(user))),
            Err(e) if e.status == StatusCode::UNAUTHORIZED => Ok(MaybeAuthUser(None)),
            Err(e) => Err(e),
        }
    }
}

/// Access token from the `accessToken` cookie, falling back to the bearer header.
fn access_token(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE).filter(|c| !c.value().is_empty()) {
        return Some(cookie.value().to_string());
    }

    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<UserRow, ApiError> {
    let token = access_token(parts).ok_or_else(|| ApiError::unauthorized("Unauthorized request"))?;

    let claims = state.tokens.verify_access(&token).map_err(|e| {
        debug!("Access token rejected: {}", e);
        ApiError::unauthorized("Invalid access token")
    })?;

    with_db(state, move |db| db.get_user_by_id(claims.sub))
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid access token"))
}
