//! Integration tests for the access policy as seen over HTTP
//!
//! Covers:
//! - exempt static resources
//! - public login/signup/user endpoints
//! - protected pages (redirect or 401 when anonymous)
//! - login, logout and session invalidation
//! - saved requests after login
//! - CSRF enforcement on state-changing requests
//! - path firewall

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use async_trait::async_trait;
use http_body_util::BodyExt;
use tower::ServiceExt;

use api_guard::AppState;
use api_guard::auth::cookies::{CSRF_COOKIE_NAME, SESSION_COOKIE_NAME};
use api_guard::routes::router;
use core_guard::SecurityConfig;
use data_model_guard::{MemorySessionStore, MemoryUserStore, Session, SessionId, SessionStore, StoreError, UserStore};

const TEST_SECRET: &str = "integration_test_secret_key_32_bytes_long";
const USERNAME: &str = "alice@example.com";
const PASSWORD: &str = "correct horse battery staple";

struct TestApp {
    app: Router,
    users: Arc<MemoryUserStore>,
}

fn test_config(csrf_enabled: bool) -> SecurityConfig {
    let mut config = SecurityConfig::new(TEST_SECRET);
    config.csrf_enabled = csrf_enabled;
    config.bcrypt_cost = 4;
    config.login_min_duration = Duration::ZERO;
    config
}

/// Session store that counts lookups and delegates to memory.
struct CountingSessionStore {
    inner: MemorySessionStore,
    gets: AtomicUsize,
}

impl CountingSessionStore {
    fn new(ttl: Duration) -> Self {
        Self {
            inner: MemorySessionStore::new(ttl),
            gets: AtomicUsize::new(0),
        }
    }

    fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStore for CountingSessionStore {
    async fn create(&self, username: &str) -> Result<Session, StoreError> {
        self.inner.create(username).await
    }

    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(id).await
    }

    async fn invalidate(&self, id: &SessionId) -> Result<bool, StoreError> {
        self.inner.invalidate(id).await
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        self.inner.purge_expired().await
    }
}

/// Router over in-memory stores with one registered user.
async fn test_app_with(config: SecurityConfig) -> TestApp {
    let sessions = Arc::new(MemorySessionStore::new(config.session_duration));
    test_app_with_sessions(config, sessions).await
}

async fn test_app_with_sessions(config: SecurityConfig, sessions: Arc<dyn SessionStore>) -> TestApp {
    let users = Arc::new(MemoryUserStore::new());

    let state = AppState::new(config, users.clone(), sessions).unwrap();
    state.registrar.register(USERNAME, PASSWORD).await.unwrap();

    let static_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../static");
    TestApp {
        app: router(state, static_dir),
        users,
    }
}

async fn test_app(csrf_enabled: bool) -> TestApp {
    test_app_with(test_config(csrf_enabled)).await
}

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str, cookies: &[String]) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if !cookies.is_empty() {
        builder = builder.header(header::COOKIE, cookies.join("; "));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, fields: &[(&str, &str)], cookies: &[String]) -> Request<Body> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish();

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if !cookies.is_empty() {
        builder = builder.header(header::COOKIE, cookies.join("; "));
    }
    builder.body(Body::from(body)).unwrap()
}

fn location(response: &Response<Body>) -> &str {
    response.headers().get(header::LOCATION).unwrap().to_str().unwrap()
}

/// `name=value` of the Set-Cookie header for `name`, if the response sets it.
fn set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .filter_map(|h| h.split(';').next())
        .find(|pair| pair.starts_with(&format!("{}=", name)))
        .map(str::to_string)
}

fn cookie_value(pair: &str) -> &str {
    pair.split_once('=').map(|(_, v)| v).unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Logs in with CSRF disabled and returns the session cookie.
async fn login(app: &Router) -> String {
    let response = send(app, post_form("/login", &[("username", USERNAME), ("password", PASSWORD)], &[])).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    set_cookie(&response, SESSION_COOKIE_NAME).unwrap()
}

//
// Exempt and public paths
//

#[tokio::test]
async fn test_static_resources_are_exempt() {
    let t = test_app(true).await;

    let response = send(&t.app, get("/static/css/site.css", &[])).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response, SESSION_COOKIE_NAME).is_none());
}

#[tokio::test]
async fn test_static_resources_never_look_up_sessions() {
    let config = test_config(false);
    let sessions = Arc::new(CountingSessionStore::new(config.session_duration));
    let t = test_app_with_sessions(config, sessions.clone()).await;
    let session = login(&t.app).await;
    let tampered = format!("{}x", session);

    let response = send(&t.app, get("/static/css/site.css", &[session.clone()])).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(&t.app, get("/static/css/site.css", &[tampered])).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(&t.app, get("/static/css/missing.css", &[session.clone()])).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(sessions.gets(), 0);

    let response = send(&t.app, get("/articles", &[session])).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(sessions.gets(), 1);
}

#[tokio::test]
async fn test_missing_static_resource_is_not_found_not_redirected() {
    let t = test_app(true).await;

    let response = send(&t.app, get("/static/css/missing.css", &[])).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login_page_is_public_and_issues_csrf_cookie() {
    let t = test_app(true).await;

    let response = send(&t.app, get("/login", &[])).await;
    assert_eq!(response.status(), StatusCode::OK);

    let csrf = set_cookie(&response, CSRF_COOKIE_NAME).unwrap();
    let html = body_text(response).await;
    assert!(html.contains(r#"action="/login""#));
    assert!(html.contains(&format!(r#"name="_csrf" value="{}""#, cookie_value(&csrf))));
}

#[tokio::test]
async fn test_login_page_error_banner() {
    let t = test_app(false).await;

    let html = body_text(send(&t.app, get("/login?error", &[])).await).await;
    assert!(html.contains("Invalid username or password."));

    let html = body_text(send(&t.app, get("/login", &[])).await).await;
    assert!(!html.contains("Invalid username or password."));
}

#[tokio::test]
async fn test_signup_page_is_public() {
    let t = test_app(true).await;

    let response = send(&t.app, get("/signup", &[])).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(r#"action="/user""#));
}

//
// Protected paths
//

#[tokio::test]
async fn test_anonymous_request_redirects_to_login() {
    let t = test_app(true).await;

    let response = send(&t.app, get("/articles", &[])).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=%2Farticles");
}

#[tokio::test]
async fn test_anonymous_post_is_not_saved_for_after_login() {
    let t = test_app(false).await;

    let response = send(&t.app, post_form("/articles", &[("title", "x")], &[])).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_anonymous_json_request_gets_401() {
    let t = test_app(true).await;

    let request = Request::builder()
        .uri("/articles")
        .header(header::ACCEPT, "application/json")
        .body(Body::empty())
        .unwrap();
    let response = send(&t.app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["error"], "Authentication required");
}

#[tokio::test]
async fn test_unknown_paths_require_authentication() {
    let t = test_app(true).await;

    let response = send(&t.app, get("/admin/settings", &[])).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/login?next="));
}

#[tokio::test]
async fn test_health_follows_policy_unless_exempted() {
    let t = test_app(true).await;
    let response = send(&t.app, get("/health", &[])).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let mut config = test_config(true);
    config.exempt_paths.push("/health".to_string());
    let t = test_app_with(config).await;
    let response = send(&t.app, get("/health", &[])).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_tampered_session_cookie_is_anonymous() {
    let t = test_app(false).await;
    let session = login(&t.app).await;

    let tampered = format!("{}x", session);
    let response = send(&t.app, get("/articles", &[tampered])).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

//
// Login and logout
//

#[tokio::test]
async fn test_login_then_access_protected_page() {
    let t = test_app(false).await;

    let response = send(&t.app, post_form("/login", &[("username", USERNAME), ("password", PASSWORD)], &[])).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/articles");
    let session = set_cookie(&response, SESSION_COOKIE_NAME).unwrap();

    let response = send(&t.app, get("/articles", &[session.clone()])).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(USERNAME));

    let response = send(&t.app, get("/", &[session])).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/articles");
}

#[tokio::test]
async fn test_login_failure_redirects_with_error() {
    let t = test_app(false).await;

    let response = send(&t.app, post_form("/login", &[("username", USERNAME), ("password", "wrong")], &[])).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?error");
    assert!(set_cookie(&response, SESSION_COOKIE_NAME).is_none());

    let response = send(
        &t.app,
        post_form("/login", &[("username", "nobody@example.com"), ("password", PASSWORD)], &[]),
    )
    .await;
    assert_eq!(location(&response), "/login?error");
}

#[tokio::test]
async fn test_login_returns_to_saved_request() {
    let t = test_app(false).await;

    let fields = [("username", USERNAME), ("password", PASSWORD), ("next", "/articles?page=2")];
    let response = send(&t.app, post_form("/login", &fields, &[])).await;
    assert_eq!(location(&response), "/articles?page=2");

    let fields = [("username", USERNAME), ("password", PASSWORD), ("next", "//evil.example.com")];
    let response = send(&t.app, post_form("/login", &fields, &[])).await;
    assert_eq!(location(&response), "/articles");

    let fields = [("username", USERNAME), ("password", "wrong"), ("next", "/articles?page=2")];
    let response = send(&t.app, post_form("/login", &fields, &[])).await;
    assert_eq!(location(&response), "/login?error&next=%2Farticles%3Fpage%3D2");
}

#[tokio::test]
async fn test_login_ignores_login_and_logout_as_next() {
    let t = test_app(false).await;

    for next in ["/logout", "/logout?x=1", "/login", "/login?error"] {
        let fields = [("username", USERNAME), ("password", PASSWORD), ("next", next)];
        let response = send(&t.app, post_form("/login", &fields, &[])).await;
        assert_eq!(location(&response), "/articles", "next: {}", next);

        let session = set_cookie(&response, SESSION_COOKIE_NAME).unwrap();
        let response = send(&t.app, get("/articles", &[session])).await;
        assert_eq!(response.status(), StatusCode::OK, "next: {}", next);
    }

    let html = body_text(send(&t.app, get("/login?next=%2Flogout", &[])).await).await;
    assert!(!html.contains(r#"name="next""#));
}

#[tokio::test]
async fn test_login_replaces_existing_session() {
    let t = test_app(false).await;
    let first = login(&t.app).await;

    let response = send(
        &t.app,
        post_form("/login", &[("username", USERNAME), ("password", PASSWORD)], &[first.clone()]),
    )
    .await;
    let second = set_cookie(&response, SESSION_COOKIE_NAME).unwrap();
    assert_ne!(first, second);

    let response = send(&t.app, get("/articles", &[first])).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let response = send(&t.app, get("/articles", &[second])).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_failed_login_keeps_existing_session() {
    let t = test_app(false).await;
    let session = login(&t.app).await;

    let response = send(
        &t.app,
        post_form("/login", &[("username", USERNAME), ("password", "wrong")], &[session.clone()]),
    )
    .await;
    assert_eq!(location(&response), "/login?error");
    assert!(set_cookie(&response, SESSION_COOKIE_NAME).is_none());

    let response = send(&t.app, get("/articles", &[session])).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_invalidates_session() {
    let t = test_app(false).await;
    let session = login(&t.app).await;

    let response = send(&t.app, get("/logout", &[session.clone()])).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    let cleared = set_cookie(&response, SESSION_COOKIE_NAME).unwrap();
    assert_eq!(cookie_value(&cleared), "");

    // replaying the old cookie does not bring the session back
    let response = send(&t.app, get("/articles", &[session])).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/login"));
}

#[tokio::test]
async fn test_logout_without_invalidation_leaves_session_until_expiry() {
    let mut config = test_config(false);
    config.invalidate_session_on_logout = false;
    let t = test_app_with(config).await;
    let session = login(&t.app).await;

    let response = send(&t.app, get("/logout", &[session.clone()])).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = send(&t.app, get("/articles", &[session])).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_anonymous_logout_clears_cookies() {
    let t = test_app(false).await;

    let response = send(&t.app, get("/logout", &[])).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    assert_eq!(cookie_value(&set_cookie(&response, SESSION_COOKIE_NAME).unwrap()), "");
    assert_eq!(cookie_value(&set_cookie(&response, CSRF_COOKIE_NAME).unwrap()), "");

    // an already-invalidated session logs out the same way
    let session = login(&t.app).await;
    send(&t.app, get("/logout", &[session.clone()])).await;
    let response = send(&t.app, get("/logout", &[session.clone()])).await;
    assert_eq!(location(&response), "/login");

    // and the next login lands on the default page
    let response = send(&t.app, post_form("/login", &[("username", USERNAME), ("password", PASSWORD)], &[session])).await;
    assert_eq!(location(&response), "/articles");
}

//
// Signup
//

#[tokio::test]
async fn test_signup_creates_user_with_hashed_password() {
    let t = test_app(false).await;

    let fields = [("username", "bob@example.com"), ("password", "hunter2 hunter2")];
    let response = send(&t.app, post_form("/user", &fields, &[])).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let stored = t.users.find_by_username("bob@example.com").await.unwrap().unwrap();
    assert_ne!(stored.password_hash, "hunter2 hunter2");
    assert!(stored.password_hash.starts_with("$2"));

    let response = send(&t.app, post_form("/login", &fields, &[])).await;
    assert_eq!(location(&response), "/articles");
}

#[tokio::test]
async fn test_signup_duplicate_username_is_rejected() {
    let t = test_app(false).await;

    let fields = [("username", USERNAME), ("password", "something else")];
    let response = send(&t.app, post_form("/user", &fields, &[])).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/signup?error");
    assert_eq!(t.users.len().await, 1);
}

//
// CSRF
//

#[tokio::test]
async fn test_csrf_rejects_post_without_token() {
    let t = test_app(true).await;

    let response = send(&t.app, post_form("/login", &[("username", USERNAME), ("password", PASSWORD)], &[])).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_csrf_rejects_mismatched_token() {
    let t = test_app(true).await;

    let response = send(&t.app, get("/login", &[])).await;
    let csrf = set_cookie(&response, CSRF_COOKIE_NAME).unwrap();

    let response = send(&t.app, get("/signup", &[])).await;
    let other = set_cookie(&response, CSRF_COOKIE_NAME).unwrap();

    let fields = [("username", USERNAME), ("password", PASSWORD), ("_csrf", cookie_value(&other))];
    let response = send(&t.app, post_form("/login", &fields, &[csrf])).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_csrf_login_and_logout_flow() {
    let t = test_app(true).await;

    let response = send(&t.app, get("/login", &[])).await;
    let csrf = set_cookie(&response, CSRF_COOKIE_NAME).unwrap();

    let fields = [("username", USERNAME), ("password", PASSWORD), ("_csrf", cookie_value(&csrf))];
    let response = send(&t.app, post_form("/login", &fields, &[csrf.clone()])).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/articles");

    let session = set_cookie(&response, SESSION_COOKIE_NAME).unwrap();
    let csrf = set_cookie(&response, CSRF_COOKIE_NAME).unwrap();

    // GET /logout is not routed while CSRF protection is on
    let response = send(&t.app, get("/logout", &[session.clone(), csrf.clone()])).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let request = Request::builder()
        .method("POST")
        .uri("/logout")
        .header(header::COOKIE, format!("{}; {}", session, csrf))
        .header("X-CSRF-Token", cookie_value(&csrf))
        .body(Body::empty())
        .unwrap();
    let response = send(&t.app, request).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let response = send(&t.app, get("/articles", &[session])).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

//
// Firewall
//

#[tokio::test]
async fn test_traversal_out_of_exempt_paths_is_rejected() {
    let t = test_app(true).await;

    for uri in ["/static/../articles", "/static/%2e%2e/articles", "/static/..%2Farticles"] {
        let response = send(&t.app, get(uri, &[])).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri: {}", uri);
    }
}
