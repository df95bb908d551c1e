//! Admin session transport: the `admin_session` cookie or a bearer token.

use axum::http::{header, HeaderMap, HeaderValue};
use souk_market::{AdminSession, SESSION_TTL_SECS};

pub const SESSION_COOKIE: &str = "admin_session";

/// Session token presented with a request, cookie first.
pub fn presented_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            pair.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
                .map(str::to_string)
        });
    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
    })
}

/// `Set-Cookie` value carrying a freshly issued session.
pub fn session_cookie(session: &AdminSession) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={SESSION_TTL_SECS}",
        session.token
    ))
    .ok()
}
