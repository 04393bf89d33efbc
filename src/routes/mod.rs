pub mod admin;
pub mod auth;
pub mod friends;
pub mod messages;
pub mod pages;
pub mod reports;

use axum::middleware;
use axum::Router;

use crate::site_mode;
use crate::state::AppState;

/// Assemble the full application router, including the site-mode gate.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(pages::router())
        .merge(auth::router())
        .merge(friends::router())
        .merge(messages::router())
        .merge(reports::router())
        .merge(admin::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            site_mode::site_mode_gate,
        ))
        .with_state(state)
}
