//! Global site-mode switches: shutdown and maintenance.
//!
//! Consulted on every non-API page request, before any content is produced.
//! The settings row is read fresh per request; if it cannot be read the
//! gate fails open and logs, so a store outage never blocks all traffic.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use rusqlite::params;

use crate::db::models::SiteSettings;
use crate::error::AppResult;
use crate::extractors::extract_session_token;
use crate::state::{AppState, DbPool};

pub const MAINTENANCE_PATH: &str = "/maintenance.html";

/// Middleware applied to page routes. API routes are mounted under /api/
/// and skip the gate; admins bypass both modes by capability.
pub async fn site_mode_gate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if path.starts_with("/api/") {
        return next.run(request).await;
    }

    if requester_is_admin(&state, request.headers()) {
        return next.run(request).await;
    }

    match load_settings(&state.db) {
        Ok(settings) => {
            if settings.shutdown_mode {
                return Redirect::to(&state.config.site.shutdown_redirect).into_response();
            }
            if settings.maintenance_mode && path != MAINTENANCE_PATH {
                return Redirect::to(MAINTENANCE_PATH).into_response();
            }
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!("Site mode check failed, allowing request: {}", e);
            next.run(request).await
        }
    }
}

fn requester_is_admin(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(token) = extract_session_token(headers, &state.config.auth.cookie_name) else {
        return false;
    };
    let Ok(conn) = state.db.get() else {
        return false;
    };
    conn.query_row(
        "SELECT u.account_type FROM sessions s \
         JOIN users u ON u.id = s.user_id \
         WHERE s.token = ?1 AND s.expires_at > datetime('now') AND u.is_active = 1",
        params![token],
        |row| row.get::<_, String>(0),
    )
    .map(|ty| ty == "admin")
    .unwrap_or(false)
}

/// Read the singleton settings row, lazily creating it on first access.
pub fn load_settings(pool: &DbPool) -> AppResult<SiteSettings> {
    let conn = pool.get()?;
    load_or_init(&conn)
}

pub fn load_or_init(conn: &rusqlite::Connection) -> AppResult<SiteSettings> {
    conn.execute("INSERT OR IGNORE INTO site_settings (id) VALUES (1)", [])?;
    let settings = conn.query_row(
        "SELECT shutdown_mode, maintenance_mode, last_updated, updated_by \
         FROM site_settings WHERE id = 1",
        [],
        |row| {
            Ok(SiteSettings {
                shutdown_mode: row.get(0)?,
                maintenance_mode: row.get(1)?,
                last_updated: row.get(2)?,
                updated_by: row.get(3)?,
            })
        },
    )?;
    Ok(settings)
}

pub fn set_shutdown_mode(
    conn: &rusqlite::Connection,
    enabled: bool,
    updated_by: &str,
) -> AppResult<()> {
    conn.execute("INSERT OR IGNORE INTO site_settings (id) VALUES (1)", [])?;
    conn.execute(
        "UPDATE site_settings SET shutdown_mode = ?1, last_updated = datetime('now'), updated_by = ?2 WHERE id = 1",
        params![enabled, updated_by],
    )?;
    Ok(())
}

pub fn set_maintenance_mode(
    conn: &rusqlite::Connection,
    enabled: bool,
    updated_by: &str,
) -> AppResult<()> {
    conn.execute("INSERT OR IGNORE INTO site_settings (id) VALUES (1)", [])?;
    conn.execute(
        "UPDATE site_settings SET maintenance_mode = ?1, last_updated = datetime('now'), updated_by = ?2 WHERE id = 1",
        params![enabled, updated_by],
    )?;
    Ok(())
}
