use std::path::Path;

use axum::{
    Router,
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use core_guard::health_check;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::state::AppState;

pub mod articles;
pub mod logging_middleware;

//
// Router
//

pub fn router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    let logout_path = state.config.logout_path.clone();
    let mut logout_route = post(auth::logout);
    // a state change over GET is only acceptable when no CSRF token is expected
    if !state.config.csrf_enabled {
        logout_route = logout_route.get(auth::logout);
    }

    Router::new()
        .route("/", get(articles::get_root))
        .route("/articles", get(articles::get_articles))
        .route("/login", get(auth::get_login).post(auth::post_login))
        .route("/signup", get(auth::get_signup))
        .route("/user", post(auth::post_user))
        .route(&logout_path, logout_route)
        .route("/health", get(health_check))
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        // registered before the layers so unknown paths go through the access policy too
        .fallback(not_found)
        // CSRF runs inside the access policy so the firewall has already vetted the path
        .layer(middleware::from_fn_with_state(state.clone(), auth::verify_csrf))
        .layer(middleware::from_fn_with_state(state.clone(), auth::enforce_access))
        // Custom route access logging
        .layer(middleware::from_fn(logging_middleware::log_route_access))
        // Tracing middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}
