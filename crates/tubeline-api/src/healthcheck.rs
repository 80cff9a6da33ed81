use axum::{Router, routing::get};
use serde::Serialize;

use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/healthcheck", get(healthcheck))
}

/// GET /healthcheck
pub async fn healthcheck() -> ApiResponse<Health> {
    ApiResponse::ok(Health { status: "OK" }, "Health check passed")
}
