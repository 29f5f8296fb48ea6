use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use cookie::Cookie;
use tracing::warn;

use core_guard::{CSRF_FORM_FIELD, CSRF_HEADER};

use super::cookies::{CSRF_COOKIE_NAME, build_cookie, find_cookie};
use crate::state::AppState;

/// Largest form body buffered while looking for the `_csrf` field.
const MAX_FORM_BYTES: usize = 64 * 1024;

/// Rejects state-changing requests that do not echo the CSRF cookie.
/// Safe methods, exempt paths, and everything when CSRF protection is disabled pass through.
pub async fn verify_csrf(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, Response> {
    if !state.config.csrf_enabled
        || is_safe_method(request.method())
        || state.policy.is_exempt(request.uri().path())
    {
        return Ok(next.run(request).await);
    }

    let cookie_token = find_cookie(request.headers(), CSRF_COOKIE_NAME);
    let (submitted, request) = submitted_token(request).await?;

    match state.csrf.verify(cookie_token.as_deref(), submitted.as_deref()) {
        Ok(()) => Ok(next.run(request).await),
        Err(e) => {
            warn!(path = %request.uri().path(), "CSRF check failed: {}", e);
            Err((StatusCode::FORBIDDEN, "Invalid CSRF token").into_response())
        }
    }
}

/// Token from the `X-CSRF-Token` header, else from the `_csrf` field of a urlencoded form.
/// A buffered form body is put back so the handler can still read it.
async fn submitted_token(request: Request) -> Result<(Option<String>, Request), Response> {
    let header_token = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);
    if header_token.is_some() {
        return Ok((header_token, request));
    }

    if !is_form(request.headers()) {
        return Ok((None, request));
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_FORM_BYTES)
        .await
        .map_err(|_| (StatusCode::PAYLOAD_TOO_LARGE, "Form body too large").into_response())?;

    let token = url::form_urlencoded::parse(&bytes)
        .find(|(key, _)| key == CSRF_FORM_FIELD)
        .map(|(_, value)| value.into_owned());

    Ok((token, Request::from_parts(parts, Body::from(bytes))))
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

/// The token to embed in a page, plus a cookie to set when the caller has no valid one yet.
pub fn page_token(state: &AppState, headers: &HeaderMap) -> (String, Option<Cookie<'static>>) {
    match find_cookie(headers, CSRF_COOKIE_NAME).filter(|t| state.csrf.is_valid(t)) {
        Some(existing) => (existing, None),
        None => {
            let token = state.csrf.issue();
            let cookie = build_cookie(
                CSRF_COOKIE_NAME,
                token.clone(),
                state.config.session_duration,
                state.config.session_cookie_secure,
            );
            (token, Some(cookie))
        }
    }
}
