use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{NaiveDateTime, Utc};
use rand::Rng;
use rusqlite::params;
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{ReportType, UrgencyLevel};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

pub const MAX_DESCRIPTION_LEN: usize = 2000;
pub const MAX_ADDITIONAL_INFO_LEN: usize = 1000;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/submit-report", post(submit_report))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportBody {
    pub report_type: String,
    pub urgency_level: String,
    pub description: String,
    pub location: Option<String>,
    pub time_of_incident: String,
    pub witness_present: bool,
    pub action_taken: String,
    pub additional_info: Option<String>,
    // Type-conditional fields; all optional at the server boundary
    pub teacher_name: Option<String>,
    pub device_type: Option<String>,
    pub content_url: Option<String>,
    pub content_name: Option<String>,
}

async fn submit_report(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<SubmitReportBody>,
) -> AppResult<Json<serde_json::Value>> {
    let report_type = ReportType::parse(&body.report_type)
        .ok_or_else(|| AppError::Validation("Invalid reportType".into()))?;
    let urgency = UrgencyLevel::parse(&body.urgency_level)
        .ok_or_else(|| AppError::Validation("Invalid urgencyLevel".into()))?;

    let description = body.description.trim().to_string();
    if description.is_empty() {
        return Err(AppError::Validation("Description is required".into()));
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(AppError::Validation(format!(
            "Description must be {} characters or less",
            MAX_DESCRIPTION_LEN
        )));
    }

    let action_taken = body.action_taken.trim().to_string();
    if action_taken.is_empty() {
        return Err(AppError::Validation("actionTaken is required".into()));
    }

    if body
        .additional_info
        .as_deref()
        .is_some_and(|info| info.chars().count() > MAX_ADDITIONAL_INFO_LEN)
    {
        return Err(AppError::Validation(format!(
            "additionalInfo must be {} characters or less",
            MAX_ADDITIONAL_INFO_LEN
        )));
    }

    let time_of_incident = parse_incident_time(&body.time_of_incident)
        .ok_or_else(|| AppError::Validation("Invalid timeOfIncident".into()))?;

    let report_id = generate_report_id();
    let row_id = uuid::Uuid::now_v7().to_string();

    let conn = state.db.get()?;
    conn.execute(
        "INSERT INTO reports (id, report_id, reported_by, report_type, urgency_level, \
         description, location, time_of_incident, witness_present, action_taken, \
         additional_info, teacher_name, device_type, content_url, content_name) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            row_id,
            report_id,
            user.id,
            report_type.as_str(),
            urgency.as_str(),
            description,
            body.location,
            time_of_incident,
            body.witness_present,
            action_taken,
            body.additional_info,
            body.teacher_name,
            body.device_type,
            body.content_url,
            body.content_name,
        ],
    )?;

    Ok(Json(json!({
        "message": "Report submitted successfully",
        "reportId": report_id
    })))
}

/// Unique human-readable report token: RPT-<unix millis>-<5 upper alnum>.
fn generate_report_id() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..5)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect();
    format!("RPT-{}-{}", Utc::now().timestamp_millis(), suffix)
}

/// Accept the datetime-local wire format and a few close relatives,
/// normalized to the store's datetime text.
fn parse_incident_time(raw: &str) -> Option<String> {
    let raw = raw.trim();
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.format("%Y-%m-%d %H:%M:%S").to_string());
        }
    }
    None
}
