use axum::http::StatusCode;

/// Liveness check. Reachable anonymously only when `/health` is listed in SECURITY_EXEMPT_PATHS.
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "healthy")
}
