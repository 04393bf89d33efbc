use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;

use crate::extractors::MaybeUser;
use crate::state::AppState;

/// Page routes. Bodies are plain placeholders; what matters here is the
/// routing behavior these pages anchor: the authenticated-user redirect
/// on the entry page and the paths the site-mode gate targets.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/dashboard.html", get(dashboard))
        .route("/maintenance.html", get(maintenance))
}

/// Entry page: an authenticated, active user is sent to the dashboard
/// instead of seeing the anonymous landing content.
async fn index(MaybeUser(user): MaybeUser) -> Response {
    if user.is_some() {
        return Redirect::to("/dashboard.html").into_response();
    }
    (StatusCode::OK, "hallpass").into_response()
}

async fn dashboard(MaybeUser(user): MaybeUser) -> Response {
    // Authentication failures on pages redirect to the entry page
    // rather than returning a bare 401.
    if user.is_none() {
        return Redirect::to("/").into_response();
    }
    (StatusCode::OK, "dashboard").into_response()
}

async fn maintenance() -> Response {
    (StatusCode::OK, "Down for maintenance").into_response()
}
