use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::auth::session;
use crate::db::models::AccountType;
use crate::error::AppError;
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub account_type: AccountType,
    pub expires_at: Option<String>,
}

/// Extractor that requires authentication.
/// Returns 401 if no valid session is found. A stale session pointing at a
/// deactivated, missing, or expired account is deleted as a side effect.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_session_token(&parts.headers, &state.config.auth.cookie_name)
            .ok_or(AppError::Unauthenticated)?
            .to_string();

        let row = {
            let conn = state.db.get()?;
            conn.query_row(
                "SELECT u.id, u.username, u.account_type, u.is_active, u.expires_at \
                 FROM sessions s \
                 JOIN users u ON u.id = s.user_id \
                 WHERE s.token = ?1 AND s.expires_at > datetime('now')",
                params![token],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()?
        };

        let Some((id, username, account_type, is_active, expires_at)) = row else {
            // Token resolves to no live session/user; drop it if present.
            session::delete_session(&state.db, &token)?;
            return Err(AppError::Unauthenticated);
        };

        if !is_active {
            session::delete_session(&state.db, &token)?;
            return Err(AppError::Unauthenticated);
        }

        let account_type = AccountType::parse(&account_type)
            .ok_or_else(|| AppError::Internal(format!("Unknown account type: {}", account_type)))?;

        // Server-side enforcement of temporary-account expiry: the
        // client-side logout timer is not a security boundary.
        if let Some(ref expiry) = expires_at {
            if account_expired(expiry) {
                session::delete_sessions_for_user(&state.db, &id)?;
                return Err(AppError::Unauthenticated);
            }
        }

        Ok(CurrentUser {
            id,
            username,
            account_type,
            expires_at,
        })
    }
}

/// Extractor for capability-restricted routes: permanent or admin only.
pub struct PermanentUser(pub CurrentUser);

impl FromRequestParts<AppState> for PermanentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.account_type.is_permanent() {
            return Err(AppError::Forbidden("Permanent account required".into()));
        }
        Ok(PermanentUser(user))
    }
}

/// Extractor for admin-only routes.
pub struct AdminUser(pub CurrentUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.account_type.is_admin() {
            return Err(AppError::Forbidden("Admin access required".into()));
        }
        Ok(AdminUser(user))
    }
}

/// Optional user extractor — returns None instead of 401 when not
/// authenticated. Used by routes that redirect authenticated users away.
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(_) => Ok(MaybeUser(None)),
        }
    }
}

/// Whether a temporary account's stored expiry has passed.
pub fn account_expired(expires_at: &str) -> bool {
    NaiveDateTime::parse_from_str(expires_at, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt <= Utc::now().naive_utc())
        .unwrap_or(false)
}

pub fn extract_session_token<'a>(
    headers: &'a axum::http::HeaderMap,
    cookie_name: &str,
) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name {
                Some(val)
            } else {
                None
            }
        })
}
