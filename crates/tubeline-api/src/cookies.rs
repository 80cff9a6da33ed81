//! Set-Cookie values for the session tokens.

use std::time::Duration;

use axum::http::HeaderValue;

use crate::error::ApiError;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

pub fn build_token_cookie(
    name: &str,
    token: &str,
    max_age: Duration,
    secure: bool,
) -> Result<HeaderValue, ApiError> {
    let secure = if secure { " Secure;" } else { "" };
    let cookie = format!(
        "{}={}; HttpOnly;{} SameSite=Lax; Path=/; Max-Age={}",
        name,
        token,
        secure,
        max_age.as_secs()
    );
    cookie
        .parse()
        .map_err(|_| ApiError::internal().with_error("failed to build cookie header"))
}

pub fn build_clear_cookie(name: &str, secure: bool) -> Result<HeaderValue, ApiError> {
    build_token_cookie(name, "", Duration::ZERO, secure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_cookie_is_http_only() {
        let value = build_token_cookie(ACCESS_TOKEN_COOKIE, "abc", Duration::from_secs(60), true).unwrap();
        assert_eq!(
            value.to_str().unwrap(),
            "accessToken=abc; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=60"
        );
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let value = build_clear_cookie(REFRESH_TOKEN_COOKIE, false).unwrap();
        assert_eq!(value.to_str().unwrap(), "refreshToken=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0");
    }
}
