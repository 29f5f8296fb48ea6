use std::time::Duration;

use axum::{
    Extension, Form,
    extract::{Query, State},
    http::{HeaderMap, HeaderName, header},
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
};
use cookie::Cookie;
use serde::Deserialize;
use tracing::{debug, info, warn};

use core_guard::{AuthError, Authentication, RegistrationError};

use super::cookies::{CSRF_COOKIE_NAME, build_cookie};
use super::csrf::page_token;
use super::middleware::{NEXT_PARAM, safe_next};
use crate::error::ApiError;
use crate::state::AppState;
use crate::views;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    error: Option<String>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignupQuery {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    username: String,
    password: String,
}

/// GET /login
pub async fn get_login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let (token, new_cookie) = page_token(&state, &headers);
    let next = safe_next(query.next.as_deref(), &state.config);
    let page = views::login_page(&state.config.login_path, query.error.is_some(), next, &token);

    (set_cookies(new_cookie), Html(page))
}

/// POST /login
/// A successful login always gets a brand-new session and destroys the one the caller already had.
/// A failed login leaves any existing session alone.
pub async fn post_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let next = safe_next(form.next.as_deref(), &state.config);

    match state.authenticator.login(form.username.trim(), &form.password).await {
        Ok(session) => {
            if let Some(previous) = state.session_cookies.read(&headers) {
                state.authenticator.logout(&previous).await?;
            }

            let target = next.unwrap_or(&state.config.login_success_path).to_string();
            debug!(target = %target, "Login succeeded, redirecting");

            let csrf_cookie = build_cookie(
                CSRF_COOKIE_NAME,
                state.csrf.issue(),
                state.config.session_duration,
                state.config.session_cookie_secure,
            );
            let cookies = [state.session_cookies.issue(&session.id), csrf_cookie];

            Ok((set_cookies(cookies), Redirect::to(&target)).into_response())
        }
        Err(AuthError::InvalidCredentials) => {
            let mut target = format!("{}?error", state.config.login_path);
            if let Some(next) = next {
                let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
                target.push_str(&format!("&{}={}", NEXT_PARAM, encoded));
            }
            Ok(Redirect::to(&target).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /logout (and GET /logout when CSRF protection is off)
/// Also answered for anonymous callers: the cookies are cleared either way.
pub async fn logout(
    State(state): State<AppState>,
    authentication: Option<Extension<Authentication>>,
) -> Result<Response, ApiError> {
    let session = authentication.as_ref().and_then(|ext| ext.0.session());

    match session {
        Some(session) if state.config.invalidate_session_on_logout => {
            state.authenticator.logout(&session.id).await?;
            info!("User logged out");
        }
        Some(_) => info!("User logged out, session left to expire"),
        None => debug!("Logout without a session"),
    }

    let csrf_removal = build_cookie(CSRF_COOKIE_NAME, String::new(), Duration::ZERO, state.config.session_cookie_secure);
    let cookies = [state.session_cookies.removal(), csrf_removal];
    Ok((set_cookies(cookies), Redirect::to(&state.config.logout_success_path)).into_response())
}

/// GET /signup
pub async fn get_signup(
    State(state): State<AppState>,
    Query(query): Query<SignupQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let (token, new_cookie) = page_token(&state, &headers);
    (set_cookies(new_cookie), Html(views::signup_page(query.error.is_some(), &token)))
}

/// POST /user
/// Registers an account. Rejections go back to the signup form without saying which rule failed.
pub async fn post_user(State(state): State<AppState>, Form(form): Form<SignupForm>) -> Result<Redirect, ApiError> {
    match state.registrar.register(&form.username, &form.password).await {
        Ok(_) => Ok(Redirect::to(&state.config.login_path)),
        Err(e @ (RegistrationError::InvalidUsername
        | RegistrationError::InvalidPassword
        | RegistrationError::DuplicateUsername)) => {
            warn!("Registration rejected: {}", e);
            Ok(Redirect::to("/signup?error"))
        }
        Err(e) => Err(e.into()),
    }
}

fn set_cookies(cookies: impl IntoIterator<Item = Cookie<'static>>) -> AppendHeaders<Vec<(HeaderName, String)>> {
    AppendHeaders(
        cookies
            .into_iter()
            .map(|cookie| (header::SET_COOKIE, cookie.to_string()))
            .collect(),
    )
}
