use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Success envelope `{statusCode, data, message, success: true}`.
pub struct ApiResponse<T> {
    status: StatusCode,
    data: T,
    message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            data,
            message: message.into(),
        }
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
            message: message.into(),
        }
    }
}

/// Empty `data` object for endpoints with nothing to return.
#[derive(Serialize)]
pub struct Empty {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a, T> {
    status_code: u16,
    data: &'a T,
    message: &'a str,
    success: bool,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            status_code: self.status.as_u16(),
            data: &self.data,
            message: &self.message,
            success: self.status.is_success(),
        };
        (self.status, Json(body)).into_response()
    }
}
