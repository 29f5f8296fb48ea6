use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

/// Logs every request once it has been answered, at a level matching the status class.
/// Denied and redirected requests show up here too, since the access policy runs inside this layer.
pub async fn log_route_access(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis() as u64;

    match status {
        500..=599 => tracing::error!(method = %method, path = %path, status, duration_ms),
        400..=499 => tracing::warn!(method = %method, path = %path, status, duration_ms),
        _ => tracing::info!(method = %method, path = %path, status, duration_ms),
    }

    response
}
