//! Visitor identity carried in the session cookie.

use axum::http::header::{ACCEPT, COOKIE, HeaderName, REFERER, USER_AGENT};
use axum::http::{HeaderMap, HeaderValue};
use uuid::Uuid;

use crate::wizard::VisitorContext;

pub const SESSION_COOKIE: &str = "kuusi_session";

/// Build the visitor context from request headers.
pub fn visitor_from_headers(headers: &HeaderMap) -> VisitorContext {
    VisitorContext {
        result_id: session_from_cookies(headers),
        user_agent: header_text(headers, USER_AGENT),
        referrer: header_text(headers, REFERER),
    }
}

/// `Set-Cookie` value pointing the visitor at `result_id`.
pub fn session_cookie(result_id: Uuid) -> HeaderValue {
    // A hyphenated UUID is always a valid header value.
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={result_id}; Path=/; HttpOnly; SameSite=Lax"
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("kuusi_session=; Path=/"))
}

/// Whether the client accepts turbo-stream responses.
pub fn accepts_turbo(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains("turbo"))
}

fn header_text(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn session_from_cookies(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}
