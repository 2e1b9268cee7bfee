//! Auth cookie formatting and extraction.
//!
//! Both tokens are httpOnly, SameSite=Lax cookies. The access cookie's
//! lifetime matches the token's own; the refresh cookie is fixed at 30
//! days regardless of the access-token lifetime.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

pub const ACCESS_COOKIE: &str = "parley_access";
pub const REFRESH_COOKIE: &str = "parley_refresh";

/// Refresh cookie lifetime: 30 days.
const REFRESH_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;

/// `Set-Cookie` value for the access token.
pub fn access_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{ACCESS_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}")
}

/// `Set-Cookie` value for the refresh token.
pub fn refresh_cookie(token: &str) -> String {
    format!("{REFRESH_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={REFRESH_MAX_AGE_SECS}")
}

/// Read a cookie value from the request headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?.to_str().ok()?;
    for pair in header.split(';') {
        let Some((key, value)) = pair.trim().split_once('=') else {
            continue;
        };
        if key == name {
            return Some(value.to_string());
        }
    }
    None
}
