use axum::{
    Extension,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};

use core_guard::Authentication;

use crate::auth::csrf::page_token;
use crate::state::AppState;
use crate::views;

/// GET /articles
pub async fn get_articles(
    State(state): State<AppState>,
    Extension(authentication): Extension<Authentication>,
    headers: HeaderMap,
) -> Response {
    // only reachable anonymously if the path was made public
    let Some(username) = authentication.username() else {
        return Redirect::to(&state.config.login_path).into_response();
    };

    let (token, new_cookie) = page_token(&state, &headers);
    let page = Html(views::articles_page(username, &state.config.logout_path, &token));

    match new_cookie {
        Some(cookie) => (StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())], page).into_response(),
        None => page.into_response(),
    }
}

/// GET /
pub async fn get_root(State(state): State<AppState>) -> Redirect {
    Redirect::to(&state.config.login_success_path)
}
