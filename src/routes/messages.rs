use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use futures::Stream;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_stream::StreamExt as _;

use crate::db::models::AccountType;
use crate::error::{AppError, AppResult};
use crate::extractors::PermanentUser;
use crate::relay::MessagePush;
use crate::state::AppState;

pub const MAX_MESSAGE_LEN: usize = 2000;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/send-message", post(send_message))
        .route("/api/messages/{user_id}", get(list_messages))
        .route("/api/events", get(message_events))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody {
    pub recipient_id: String,
    pub content: String,
}

#[derive(Serialize)]
struct MessageSender {
    id: String,
    username: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversationMessage {
    id: String,
    sender: MessageSender,
    content: String,
    is_read: bool,
    timestamp: String,
}

async fn send_message(
    State(state): State<AppState>,
    PermanentUser(user): PermanentUser,
    Json(body): Json<SendMessageBody>,
) -> AppResult<Json<serde_json::Value>> {
    let content = body.content.trim().to_string();
    if content.is_empty() {
        return Err(AppError::Validation("Message cannot be empty".into()));
    }
    // Bound is in characters, not bytes; multibyte content counts fairly
    if content.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::Validation(format!(
            "Message must be {} characters or less",
            MAX_MESSAGE_LEN
        )));
    }

    let message_id = uuid::Uuid::now_v7().to_string();
    let timestamp = Utc::now().naive_utc().format("%Y-%m-%d %H:%M:%S").to_string();

    {
        let conn = state.db.get()?;

        let recipient = conn
            .query_row(
                "SELECT account_type FROM users WHERE id = ?1 AND is_active = 1",
                params![body.recipient_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        let Some(recipient_type) = recipient else {
            return Err(AppError::NotFound("Recipient not found".into()));
        };

        let recipient_tier = AccountType::parse(&recipient_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown account type: {}", recipient_type))
        })?;
        if !recipient_tier.is_permanent() {
            return Err(AppError::Validation(
                "Recipient cannot receive messages".into(),
            ));
        }

        conn.execute(
            "INSERT INTO messages (id, sender_id, recipient_id, content, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![message_id, user.id, body.recipient_id, content, timestamp],
        )?;
    }

    // Persist-then-publish is not atomic: a crash here leaves a stored
    // message that was never pushed, reconciled on the recipient's next
    // conversation fetch.
    let delivered = state.relay.publish(
        &body.recipient_id,
        MessagePush {
            id: message_id.clone(),
            sender: user.username,
            content,
            timestamp,
        },
    );
    tracing::debug!(
        "Message {} pushed to {} live subscriber(s)",
        message_id,
        delivered
    );

    Ok(Json(json!({ "message": "Message sent", "id": message_id })))
}

async fn list_messages(
    State(state): State<AppState>,
    PermanentUser(user): PermanentUser,
    Path(peer_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;

    let messages: Vec<ConversationMessage> = {
        let mut stmt = conn.prepare(
            "SELECT m.id, m.sender_id, u.username, m.content, m.is_read, m.created_at \
             FROM messages m \
             JOIN users u ON u.id = m.sender_id \
             WHERE (m.sender_id = ?1 AND m.recipient_id = ?2) \
                OR (m.sender_id = ?2 AND m.recipient_id = ?1) \
             ORDER BY m.created_at ASC, m.id ASC",
        )?;

        let rows = stmt
            .query_map(params![user.id, peer_id], |row| {
                Ok(ConversationMessage {
                    id: row.get(0)?,
                    sender: MessageSender {
                        id: row.get(1)?,
                        username: row.get(2)?,
                    },
                    content: row.get(3)?,
                    is_read: row.get(4)?,
                    timestamp: row.get(5)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        rows
    };

    // Opening the conversation marks everything the peer sent as read
    conn.execute(
        "UPDATE messages SET is_read = 1 \
         WHERE sender_id = ?1 AND recipient_id = ?2 AND is_read = 0",
        params![peer_id, user.id],
    )?;

    Ok(Json(json!({ "messages": messages })))
}

/// SSE subscription to the caller's own notification channel. Events are
/// pushed while connected; nothing is queued or replayed for offline spans.
async fn message_events(
    State(state): State<AppState>,
    PermanentUser(user): PermanentUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!("User {} subscribed to message events", user.id);
    let subscription = state.relay.subscribe(&user.id);

    let stream = subscription.filter_map(|push| {
        serde_json::to_string(&push)
            .ok()
            .map(|data| Ok(Event::default().event("new-message").data(data)))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
