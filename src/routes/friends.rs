use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::models::{AccountType, RequestStatus};
use crate::error::{AppError, AppResult};
use crate::extractors::PermanentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/send-friend-request", post(send_friend_request))
        .route("/api/respond-friend-request", post(respond_friend_request))
        .route("/api/friends", get(list_friends))
        .route("/api/friend-requests", get(list_friend_requests))
        .route("/api/search-users", get(search_users))
}

#[derive(Deserialize)]
pub struct SendRequestBody {
    pub username: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondRequestBody {
    pub request_id: String,
    pub action: String,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

#[derive(Serialize)]
struct PublicUser {
    id: String,
    username: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PendingRequest {
    id: String,
    from: PublicUser,
    created_at: String,
}

async fn send_friend_request(
    State(state): State<AppState>,
    PermanentUser(user): PermanentUser,
    Json(body): Json<SendRequestBody>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;

    let target = conn
        .query_row(
            "SELECT id, account_type FROM users WHERE username = ?1 AND is_active = 1",
            params![body.username.trim()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;

    let Some((target_id, target_type)) = target else {
        return Err(AppError::NotFound("User not found".into()));
    };

    if target_id == user.id {
        return Err(AppError::Conflict(
            "Cannot send a friend request to yourself".into(),
        ));
    }

    // Temporary accounts may not hold friends, on either side
    let target_tier = AccountType::parse(&target_type)
        .ok_or_else(|| AppError::Internal(format!("Unknown account type: {}", target_type)))?;
    if !target_tier.is_permanent() {
        return Err(AppError::Validation(
            "User cannot receive friend requests".into(),
        ));
    }

    let pending_exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM friend_requests \
         WHERE owner_id = ?1 AND from_id = ?2 AND status = 'pending'",
        params![target_id, user.id],
        |row| row.get(0),
    )?;
    if pending_exists {
        return Err(AppError::Conflict("Friend request already sent".into()));
    }

    let already_friends: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM friendships WHERE user_id = ?1 AND friend_id = ?2",
        params![user.id, target_id],
        |row| row.get(0),
    )?;
    if already_friends {
        return Err(AppError::Conflict("Already friends".into()));
    }

    let request_id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO friend_requests (id, owner_id, from_id) VALUES (?1, ?2, ?3)",
        params![request_id, target_id, user.id],
    )?;

    Ok(Json(json!({ "message": "Friend request sent" })))
}

async fn respond_friend_request(
    State(state): State<AppState>,
    PermanentUser(user): PermanentUser,
    Json(body): Json<RespondRequestBody>,
) -> AppResult<Json<serde_json::Value>> {
    let action = match RequestStatus::parse(&body.action) {
        Some(st @ (RequestStatus::Accepted | RequestStatus::Rejected)) => st,
        _ => {
            return Err(AppError::Validation(
                "action must be accepted or rejected".into(),
            ))
        }
    };

    let mut conn = state.db.get()?;
    // Acceptance must update the request and both friend sets as one
    // logical operation; a transaction keeps a concurrent reader from
    // ever seeing a one-sided friendship.
    let tx = conn.transaction()?;

    let from_id: Option<String> = tx
        .query_row(
            "SELECT from_id FROM friend_requests \
             WHERE id = ?1 AND owner_id = ?2 AND status = 'pending'",
            params![body.request_id, user.id],
            |row| row.get(0),
        )
        .optional()?;

    let Some(from_id) = from_id else {
        return Err(AppError::NotFound("Friend request not found".into()));
    };

    tx.execute(
        "UPDATE friend_requests SET status = ?1 WHERE id = ?2",
        params![action.as_str(), body.request_id],
    )?;

    if action == RequestStatus::Accepted {
        tx.execute(
            "INSERT OR IGNORE INTO friendships (user_id, friend_id) VALUES (?1, ?2)",
            params![user.id, from_id],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO friendships (user_id, friend_id) VALUES (?1, ?2)",
            params![from_id, user.id],
        )?;
    }

    tx.commit()?;

    Ok(Json(json!({
        "message": format!("Friend request {}", action.as_str())
    })))
}

async fn list_friends(
    State(state): State<AppState>,
    PermanentUser(user): PermanentUser,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    let mut stmt = conn.prepare(
        "SELECT u.id, u.username FROM friendships f \
         JOIN users u ON u.id = f.friend_id \
         WHERE f.user_id = ?1 \
         ORDER BY u.username",
    )?;

    let friends: Vec<PublicUser> = stmt
        .query_map(params![user.id], |row| {
            Ok(PublicUser {
                id: row.get(0)?,
                username: row.get(1)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(Json(json!({ "friends": friends })))
}

async fn list_friend_requests(
    State(state): State<AppState>,
    PermanentUser(user): PermanentUser,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    let mut stmt = conn.prepare(
        "SELECT r.id, r.created_at, u.id, u.username FROM friend_requests r \
         JOIN users u ON u.id = r.from_id \
         WHERE r.owner_id = ?1 AND r.status = 'pending' \
         ORDER BY r.created_at",
    )?;

    let requests: Vec<PendingRequest> = stmt
        .query_map(params![user.id], |row| {
            Ok(PendingRequest {
                id: row.get(0)?,
                created_at: row.get(1)?,
                from: PublicUser {
                    id: row.get(2)?,
                    username: row.get(3)?,
                },
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(Json(json!({ "requests": requests })))
}

async fn search_users(
    State(state): State<AppState>,
    PermanentUser(user): PermanentUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let needle = query.query.trim().to_string();
    if needle.is_empty() {
        return Err(AppError::Validation("Search query is required".into()));
    }

    let conn = state.db.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, username FROM users \
         WHERE username LIKE '%' || ?1 || '%' COLLATE NOCASE ESCAPE '\\' \
           AND is_active = 1 AND id != ?2 \
         ORDER BY username \
         LIMIT 10",
    )?;

    let users: Vec<PublicUser> = stmt
        .query_map(params![crate::db::escape_like(&needle), user.id], |row| {
            Ok(PublicUser {
                id: row.get(0)?,
                username: row.get(1)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(Json(json!({ "users": users })))
}
