use axum::extract::FromRequest;
use axum::extract::FromRequestParts;
use uuid::Uuid;

use crate::error::ApiError;

/// `Json` whose rejection renders as the failure envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query` whose rejection renders as the failure envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `Path` whose rejection renders as the failure envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Parse a path identifier; malformed ids are a 400.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid {}", what)))
}

/// Trimmed value, or `None` when missing or blank.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

/// `(page, limit)` with defaults applied: page 1, limit 10, at most 100.
pub fn pagination(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_ids_are_bad_requests() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "videoId").unwrap(), id);

        let err = parse_id("not-a-uuid", "videoId").unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid videoId");
    }

    #[test]
    fn blank_values_are_missing() {
        assert_eq!(non_blank(Some("  hi ")), Some("hi"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn pagination_defaults_and_bounds() {
        assert_eq!(pagination(None, None), (1, 10));
        assert_eq!(pagination(Some(0), Some(0)), (1, 1));
        assert_eq!(pagination(Some(3), Some(500)), (3, 100));
    }
}
