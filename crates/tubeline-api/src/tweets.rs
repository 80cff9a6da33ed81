use axum::{
    Router,
    extract::State,
    routing::{get, patch, post},
};
use uuid::Uuid;

use tubeline_types::api::ContentRequest;
use tubeline_types::models::Tweet;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, non_blank, parse_id};
use crate::middleware::AuthUser;
use crate::response::{ApiResponse, Empty};
use crate::state::{AppState, with_db};

pub const MAX_TWEET_CHARS: usize = 280;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tweets", post(create_tweet))
        .route("/tweets/user/{user_id}", get(user_tweets))
        .route("/tweets/{tweet_id}", patch(update_tweet).delete(delete_tweet))
}

/// Trimmed tweet text, 1..=280 characters.
fn tweet_content(req: &ContentRequest) -> Result<String, ApiError> {
    let content = non_blank(Some(req.content.as_str()))
        .ok_or_else(|| ApiError::bad_request("Content is required"))?;
    if content.chars().count() > MAX_TWEET_CHARS {
        return Err(ApiError::bad_request(format!(
            "Tweet cannot exceed {} characters",
            MAX_TWEET_CHARS
        )));
    }
    Ok(content.to_string())
}

/// POST /tweets
pub async fn create_tweet(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<ContentRequest>,
) -> Result<ApiResponse<Tweet>, ApiError> {
    let content = tweet_content(&req)?;
    let owner_id = user.id();
    let tweet = with_db(&state, move |db| db.insert_tweet(Uuid::new_v4(), owner_id, &content)).await?;
    Ok(ApiResponse::created(tweet, "Tweet created successfully"))
}

/// GET /tweets/user/{user_id}. A user without tweets is a 404.
pub async fn user_tweets(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<String>,
) -> Result<ApiResponse<Vec<Tweet>>, ApiError> {
    let owner_id = parse_id(&user_id, "userId")?;
    let tweets = with_db(&state, move |db| db.get_user_tweets(owner_id)).await?;
    if tweets.is_empty() {
        return Err(ApiError::not_found("No tweets found"));
    }
    Ok(ApiResponse::ok(tweets, "Tweets fetched successfully"))
}

/// PATCH /tweets/{tweet_id}
pub async fn update_tweet(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(tweet_id): ApiPath<String>,
    ApiJson(req): ApiJson<ContentRequest>,
) -> Result<ApiResponse<Tweet>, ApiError> {
    let id = parse_id(&tweet_id, "tweetId")?;
    let content = tweet_content(&req)?;

    let owned = with_db(&state, move |db| db.get_tweet_owner(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Tweet not found"))?;
    user.ensure_owner(owned.owner_id, "tweet")?;

    let tweet = with_db(&state, move |db| db.update_tweet(id, &content))
        .await?
        .ok_or_else(|| ApiError::not_found("Tweet not found"))?;
    Ok(ApiResponse::ok(tweet, "Tweet updated successfully"))
}

/// DELETE /tweets/{tweet_id}
pub async fn delete_tweet(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(tweet_id): ApiPath<String>,
) -> Result<ApiResponse<Empty>, ApiError> {
    let id = parse_id(&tweet_id, "tweetId")?;

    let owned = with_db(&state, move |db| db.get_tweet_owner(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Tweet not found"))?;
    user.ensure_owner(owned.owner_id, "tweet")?;

    with_db(&state, move |db| db.delete_tweet(id)).await?;
    Ok(ApiResponse::ok(Empty {}, "Tweet deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(content: &str) -> ContentRequest {
        ContentRequest { content: content.to_string() }
    }

    #[test]
    fn tweet_length_is_bounded_after_trimming() {
        assert_eq!(tweet_content(&req("  hello  ")).unwrap(), "hello");
        assert!(tweet_content(&req("   ")).is_err());
        assert!(tweet_content(&req(&"é".repeat(280))).is_ok());
        assert!(tweet_content(&req(&"é".repeat(281))).is_err());
    }
}
