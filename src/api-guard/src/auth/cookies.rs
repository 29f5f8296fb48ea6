use std::time::Duration;

use axum::http::{HeaderMap, header};
use cookie::{Cookie, SameSite};

use core_guard::Signer;
use data_model_guard::SessionId;

pub const SESSION_COOKIE_NAME: &str = "article_guard_session";
pub const CSRF_COOKIE_NAME: &str = "article_guard_csrf";

/// Encodes session ids into signed cookies and back.
#[derive(Debug, Clone)]
pub struct SessionCookies {
    signer: Signer,
    max_age: Duration,
    secure: bool,
}

impl SessionCookies {
    pub fn new(signer: Signer, max_age: Duration, secure: bool) -> Self {
        Self { signer, max_age, secure }
    }

    /// Cookie carrying `<session id>.<signature>`.
    pub fn issue(&self, id: &SessionId) -> Cookie<'static> {
        build_cookie(SESSION_COOKIE_NAME, self.signer.sign(id.as_str()), self.max_age, self.secure)
    }

    /// Expired, empty cookie that makes the browser drop the session.
    pub fn removal(&self) -> Cookie<'static> {
        build_cookie(SESSION_COOKIE_NAME, String::new(), Duration::ZERO, self.secure)
    }

    /// Session id from the request's cookies. Missing, unsigned or tampered values yield `None`.
    pub fn read(&self, headers: &HeaderMap) -> Option<SessionId> {
        let value = find_cookie(headers, SESSION_COOKIE_NAME)?;
        let payload = self.signer.verify(&value)?;
        SessionId::parse(payload)
    }
}

/// HttpOnly, SameSite=Lax, whole-site cookie.
pub fn build_cookie(name: &'static str, value: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    let max_age_secs = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
    Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(cookie::time::Duration::seconds(max_age_secs))
        .path("/")
        .build()
}

/// Value of cookie `name` across every Cookie header of the request.
pub fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| Cookie::parse(pair.trim()).ok())
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}
