use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::session;
use crate::db::models::ReportStatus;
use crate::error::{AppError, AppResult};
use crate::extractors::AdminUser;
use crate::site_mode;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/disable-user", post(disable_user))
        .route("/api/admin/enable-user", post(enable_user))
        .route("/api/admin/site-settings", get(get_site_settings))
        .route("/api/admin/toggle-shutdown", post(toggle_shutdown))
        .route("/api/admin/toggle-maintenance", post(toggle_maintenance))
        .route("/api/admin/reports", get(list_reports))
        .route("/api/admin/update-report", post(update_report))
}

#[derive(Deserialize)]
pub struct UserSearchQuery {
    pub search: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdBody {
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct ToggleBody {
    pub enabled: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReportBody {
    pub report_id: String,
    pub status: String,
    pub admin_notes: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminUserRow {
    id: String,
    username: String,
    account_type: String,
    is_active: bool,
    expires_at: Option<String>,
    created_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminReportRow {
    id: String,
    report_id: String,
    reported_by: ReportedBy,
    report_type: String,
    urgency_level: String,
    description: String,
    location: Option<String>,
    time_of_incident: String,
    witness_present: bool,
    action_taken: String,
    additional_info: Option<String>,
    teacher_name: Option<String>,
    device_type: Option<String>,
    content_url: Option<String>,
    content_name: Option<String>,
    status: String,
    admin_notes: Option<String>,
    created_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportedBy {
    id: String,
    username: String,
    account_type: String,
}

/// List users, optionally filtered by a case-insensitive username
/// substring. Password hashes never leave the store.
async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<UserSearchQuery>,
) -> AppResult<Json<Vec<AdminUserRow>>> {
    let needle = crate::db::escape_like(&query.search.unwrap_or_default());

    let conn = state.db.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, username, account_type, is_active, expires_at, created_at \
         FROM users \
         WHERE ?1 = '' OR username LIKE '%' || ?1 || '%' COLLATE NOCASE ESCAPE '\\' \
         ORDER BY created_at DESC",
    )?;

    let users: Vec<AdminUserRow> = stmt
        .query_map(params![needle], |row| {
            Ok(AdminUserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                account_type: row.get(2)?,
                is_active: row.get(3)?,
                expires_at: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(Json(users))
}

async fn disable_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<UserIdBody>,
) -> AppResult<Json<serde_json::Value>> {
    {
        let conn = state.db.get()?;
        let changed = conn.execute(
            "UPDATE users SET is_active = 0 WHERE id = ?1",
            params![body.user_id],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound("User not found".into()));
        }
    }

    // Disabling takes effect immediately, not on the next request
    session::delete_sessions_for_user(&state.db, &body.user_id)?;

    Ok(Json(json!({ "message": "User disabled successfully" })))
}

async fn enable_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<UserIdBody>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    let changed = conn.execute(
        "UPDATE users SET is_active = 1 WHERE id = ?1",
        params![body.user_id],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound("User not found".into()));
    }

    Ok(Json(json!({ "message": "User enabled successfully" })))
}

async fn get_site_settings(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<serde_json::Value>> {
    let settings = site_mode::load_settings(&state.db)?;
    Ok(Json(json!({
        "shutdownMode": settings.shutdown_mode,
        "maintenanceMode": settings.maintenance_mode,
        "lastUpdated": settings.last_updated,
        "updatedBy": settings.updated_by,
    })))
}

async fn toggle_shutdown(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<ToggleBody>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    site_mode::set_shutdown_mode(&conn, body.enabled, &admin.id)?;
    tracing::info!("Shutdown mode set to {} by {}", body.enabled, admin.username);
    Ok(Json(json!({ "message": "Shutdown mode updated" })))
}

async fn toggle_maintenance(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<ToggleBody>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    site_mode::set_maintenance_mode(&conn, body.enabled, &admin.id)?;
    tracing::info!(
        "Maintenance mode set to {} by {}",
        body.enabled,
        admin.username
    );
    Ok(Json(json!({ "message": "Maintenance mode updated" })))
}

async fn list_reports(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<AdminReportRow>>> {
    let conn = state.db.get()?;
    let mut stmt = conn.prepare(
        "SELECT r.id, r.report_id, r.reported_by, u.username, u.account_type, \
                r.report_type, r.urgency_level, r.description, r.location, \
                r.time_of_incident, r.witness_present, r.action_taken, \
                r.additional_info, r.teacher_name, r.device_type, r.content_url, \
                r.content_name, r.status, r.admin_notes, r.created_at \
         FROM reports r \
         JOIN users u ON u.id = r.reported_by \
         ORDER BY r.created_at DESC",
    )?;

    let reports: Vec<AdminReportRow> = stmt
        .query_map([], |row| {
            Ok(AdminReportRow {
                id: row.get(0)?,
                report_id: row.get(1)?,
                reported_by: ReportedBy {
                    id: row.get(2)?,
                    username: row.get(3)?,
                    account_type: row.get(4)?,
                },
                report_type: row.get(5)?,
                urgency_level: row.get(6)?,
                description: row.get(7)?,
                location: row.get(8)?,
                time_of_incident: row.get(9)?,
                witness_present: row.get(10)?,
                action_taken: row.get(11)?,
                additional_info: row.get(12)?,
                teacher_name: row.get(13)?,
                device_type: row.get(14)?,
                content_url: row.get(15)?,
                content_name: row.get(16)?,
                status: row.get(17)?,
                admin_notes: row.get(18)?,
                created_at: row.get(19)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(Json(reports))
}

/// Update a report's status (and optionally the admin notes). Accepts
/// either the row id or the human-readable report token.
async fn update_report(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<UpdateReportBody>,
) -> AppResult<Json<serde_json::Value>> {
    let status = ReportStatus::parse(&body.status)
        .ok_or_else(|| AppError::Validation("Invalid report status".into()))?;

    let conn = state.db.get()?;
    let changed = conn.execute(
        "UPDATE reports SET status = ?1, \
                admin_notes = COALESCE(?2, admin_notes) \
         WHERE id = ?3 OR report_id = ?3",
        params![status.as_str(), body.admin_notes, body.report_id],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound("Report not found".into()));
    }

    Ok(Json(json!({ "message": "Report status updated" })))
}
