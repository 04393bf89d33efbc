use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rusqlite::{params, OptionalExtension};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{password, session};
use crate::db::models::AccountType;
use crate::error::{AppError, AppResult};
use crate::extractors::{account_expired, extract_session_token, CurrentUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/check-auth", get(check_auth))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub account_type: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Response> {
    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::Validation("Username is required".into()));
    }
    password::validate(&req.password)?;

    // Admin accounts are seeded from config, never self-registered.
    let account_type = match req.account_type.as_deref() {
        None => AccountType::Temporary,
        Some(s) => match AccountType::parse(s) {
            Some(ty) if !ty.is_admin() => ty,
            _ => {
                return Err(AppError::Validation(
                    "accountType must be temporary or permanent".into(),
                ))
            }
        },
    };

    let hash = password::hash(&req.password)?;
    let user_id = uuid::Uuid::now_v7().to_string();

    // Temporary accounts carry an expiry; permanent ones never do.
    let expiry_offset = match account_type {
        AccountType::Temporary => Some(format!("+{} hours", state.config.auth.temp_account_hours)),
        _ => None,
    };

    {
        let conn = state.db.get()?;
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )?;
        if exists {
            return Err(AppError::Conflict("Username already exists".into()));
        }

        conn.execute(
            "INSERT INTO users (id, username, password_hash, account_type, expires_at) \
             VALUES (?1, ?2, ?3, ?4, CASE WHEN ?5 IS NULL THEN NULL ELSE datetime('now', ?5) END)",
            params![user_id, username, hash, account_type.as_str(), expiry_offset],
        )
        .map_err(|e| match e {
            // Lost a race with a concurrent registration of the same name
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                AppError::Conflict("Username already exists".into())
            }
            e => AppError::Database(e),
        })?;
    }

    let token = session::create_session(&state.db, &user_id, state.config.auth.session_hours)?;
    let cookie = session::session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "message": "Account created successfully",
            "user": { "username": username, "accountType": account_type }
        })),
    )
        .into_response())
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Response> {
    let row = {
        let conn = state.db.get()?;
        conn.query_row(
            "SELECT id, username, password_hash, account_type, expires_at \
             FROM users WHERE username = ?1 AND is_active = 1",
            params![req.username.trim()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            },
        )
        .optional()?
    };

    let Some((user_id, username, hash, account_type, expires_at)) = row else {
        return Err(AppError::Unauthenticated);
    };

    if !password::verify(&req.password, &hash) {
        return Err(AppError::Unauthenticated);
    }

    // An expired temporary account cannot log back in.
    if expires_at.as_deref().is_some_and(account_expired) {
        return Err(AppError::Unauthenticated);
    }

    let token = session::create_session(&state.db, &user_id, state.config.auth.session_hours)?;
    let cookie = session::session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "message": "Login successful",
            "user": { "username": username, "accountType": account_type }
        })),
    )
        .into_response())
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    if let Some(token) = extract_session_token(&headers, &state.config.auth.cookie_name) {
        session::delete_session(&state.db, token)?;
    }

    Ok((
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            session::clear_session_cookie(&state.config.auth.cookie_name),
        )],
        Json(json!({ "message": "Logged out successfully" })),
    )
        .into_response())
}

async fn check_auth(user: CurrentUser) -> Json<serde_json::Value> {
    Json(json!({
        "user": {
            "username": user.username,
            "accountType": user.account_type,
            "expiresAt": user.expires_at,
        }
    }))
}
