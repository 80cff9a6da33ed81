use axum::{Router, extract::State, routing::get};
use uuid::Uuid;

use tubeline_types::api::SubscriptionStatus;
use tubeline_types::models::SubscriptionEntry;

use crate::error::ApiError;
use crate::extract::{ApiPath, parse_id};
use crate::middleware::AuthUser;
use crate::response::ApiResponse;
use crate::state::{AppState, with_db};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/subscriptions/c/{channel_id}",
            get(channel_subscribers).post(toggle_subscription),
        )
        .route("/subscriptions/u/{subscriber_id}", get(subscribed_channels))
}

/// POST /subscriptions/c/{channel_id}
pub async fn toggle_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(channel_id): ApiPath<String>,
) -> Result<ApiResponse<SubscriptionStatus>, ApiError> {
    let channel_id = parse_id(&channel_id, "channelId")?;
    let subscriber_id = user.id();
    if channel_id == subscriber_id {
        return Err(ApiError::bad_request("You cannot subscribe to your own channel"));
    }

    let subscribed = with_db(&state, move |db| {
        if db.get_user_by_id(channel_id)?.is_none() {
            return Ok(None);
        }
        db.toggle_subscription(Uuid::new_v4(), subscriber_id, channel_id).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Channel not found"))?;

    let message = if subscribed { "Subscribed successfully" } else { "Unsubscribed successfully" };
    Ok(ApiResponse::ok(SubscriptionStatus { subscribed }, message))
}

/// GET /subscriptions/c/{channel_id}
pub async fn channel_subscribers(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(channel_id): ApiPath<String>,
) -> Result<ApiResponse<Vec<SubscriptionEntry>>, ApiError> {
    let channel_id = parse_id(&channel_id, "channelId")?;
    let subscribers = with_db(&state, move |db| db.get_channel_subscribers(channel_id)).await?;
    Ok(ApiResponse::ok(subscribers, "Subscribers fetched successfully"))
}

/// GET /subscriptions/u/{subscriber_id}
pub async fn subscribed_channels(
    State(state): State<AppState>,
    ApiPath(subscriber_id): ApiPath<String>,
) -> Result<ApiResponse<Vec<SubscriptionEntry>>, ApiError> {
    let subscriber_id = parse_id(&subscriber_id, "subscriberId")?;
    let channels = with_db(&state, move |db| db.get_subscribed_channels(subscriber_id)).await?;
    Ok(ApiResponse::ok(channels, "Subscribed channels fetched successfully"))
}
