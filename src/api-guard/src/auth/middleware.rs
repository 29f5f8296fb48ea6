use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, warn};

use core_guard::{AccessError, SecurityConfig, check_path};

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameter carrying the originally requested path through the login form.
pub const NEXT_PARAM: &str = "next";

/// Runs the access policy for every request:
/// firewall, then exemptions (no session lookup), then session resolution and authorization.
/// Authorized requests carry their [`core_guard::Authentication`] as a request extension.
/// The logout path skips authorization so an expired session can still log out.
pub async fn enforce_access(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, Response> {
    let path = request.uri().path().to_string();

    if let Err(e) = check_path(&path) {
        warn!(path = %path, "Rejected request path: {}", e);
        return Err((StatusCode::BAD_REQUEST, "Rejected request path").into_response());
    }

    if state.policy.is_exempt(&path) {
        return Ok(next.run(request).await);
    }

    let session_id = state.session_cookies.read(request.headers());
    let authentication = state
        .authenticator
        .resolve(session_id.as_ref())
        .await
        .map_err(|e| ApiError::from(e).into_response())?;

    if path == state.config.logout_path {
        request.extensions_mut().insert(authentication);
        return Ok(next.run(request).await);
    }

    match state.policy.authorize(&path, &authentication) {
        Ok(()) => {
            request.extensions_mut().insert(authentication);
            Ok(next.run(request).await)
        }
        Err(AccessError::AuthenticationRequired) => {
            debug!(path = %path, "Request not authenticated, sending to login");
            Err(authentication_required(&state.config, &request))
        }
    }
}

/// 401 JSON for API clients, otherwise a redirect to the login page.
/// Only GET requests are remembered as the post-login destination.
fn authentication_required(config: &SecurityConfig, request: &Request) -> Response {
    if prefers_json(request.headers()) {
        let body = Json(serde_json::json!({
            "error": "Authentication required"
        }));
        return (StatusCode::UNAUTHORIZED, body).into_response();
    }

    let saved = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .filter(|_| *request.method() == Method::GET)
        .and_then(|original| safe_next(Some(original), config));

    match saved {
        Some(original) => Redirect::to(&login_redirect(&config.login_path, original)).into_response(),
        None => Redirect::to(&config.login_path).into_response(),
    }
}

pub fn login_redirect(login_path: &str, original: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(original.as_bytes()).collect();
    format!("{}?{}={}", login_path, NEXT_PARAM, encoded)
}

fn prefers_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json") && !accept.contains("text/html"))
}

/// Only same-site absolute paths are acceptable post-login destinations,
/// and never the login or logout endpoints themselves.
pub fn safe_next<'a>(next: Option<&'a str>, config: &SecurityConfig) -> Option<&'a str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
        .filter(|n| {
            let path = n.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
            path != config.login_path && path != config.logout_path
        })
}
