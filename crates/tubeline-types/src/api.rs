use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::User;

// -- JWT Claims --

/// Claims of the short-lived access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    pub exp: usize,
}

/// Claims of the refresh token. The token itself is also stored on the user
/// row; `jti` keeps two tokens issued in the same second distinct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub jti: Uuid,
    pub exp: usize,
}

// -- Users --

/// Either `email` or `username` identifies the account.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAccountRequest {
    pub fullname: Option<String>,
    pub email: Option<String>,
}

// -- Comments / Tweets --

#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    #[serde(alias = "newContent")]
    pub content: String,
}

// -- Playlists --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePlaylistRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

// -- Listing --

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub query: Option<String>,
    pub sort_by: Option<String>,
    pub sort_type: Option<String>,
    pub user_id: Option<String>,
}

/// Columns a video listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Title,
    Views,
    Likes,
    Duration,
    #[default]
    CreatedAt,
}

impl SortField {
    /// Unknown names fall back to `CreatedAt`.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("title") => Self::Title,
            Some("views") => Self::Views,
            Some("likes") => Self::Likes,
            Some("duration") => Self::Duration,
            _ => Self::CreatedAt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoSort {
    pub field: SortField,
    pub ascending: bool,
}

impl VideoSort {
    pub fn from_params(sort_by: Option<&str>, sort_type: Option<&str>) -> Self {
        Self {
            field: SortField::from_param(sort_by),
            ascending: sort_type == Some("asc"),
        }
    }
}

// -- Toggles --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatus {
    pub is_liked: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub subscribed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishStatus {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub is_published: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_whitelist_falls_back_to_created_at() {
        assert_eq!(SortField::from_param(Some("views")), SortField::Views);
        assert_eq!(SortField::from_param(Some("password")), SortField::CreatedAt);
        assert_eq!(SortField::from_param(None), SortField::CreatedAt);

        let sort = VideoSort::from_params(Some("title"), Some("asc"));
        assert_eq!(sort.field, SortField::Title);
        assert!(sort.ascending);
        assert!(!VideoSort::from_params(None, Some("ascending")).ascending);
    }

    #[test]
    fn tweet_update_accepts_new_content_alias() {
        let req: ContentRequest = serde_json::from_str(r#"{"newContent":"hi"}"#).unwrap();
        assert_eq!(req.content, "hi");
    }
}
