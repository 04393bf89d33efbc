use serde::{Deserialize, Serialize};

/// Capability tier of an account. Temporary accounts expire and cannot
/// hold friends or exchange messages; admins additionally bypass the
/// site-mode gate and reach the moderation endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Temporary,
    Permanent,
    Admin,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Temporary => "temporary",
            AccountType::Permanent => "permanent",
            AccountType::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "temporary" => Some(AccountType::Temporary),
            "permanent" => Some(AccountType::Permanent),
            "admin" => Some(AccountType::Admin),
            _ => None,
        }
    }

    /// Whether this tier may hold friends and exchange messages.
    pub fn is_permanent(&self) -> bool {
        matches!(self, AccountType::Permanent | AccountType::Admin)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, AccountType::Admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "accepted" => Some(RequestStatus::Accepted),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    TeacherSpotted,
    TechnicalIssue,
    ContentIssue,
    Other,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::TeacherSpotted => "teacher_spotted",
            ReportType::TechnicalIssue => "technical_issue",
            ReportType::ContentIssue => "content_issue",
            ReportType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "teacher_spotted" => Some(ReportType::TeacherSpotted),
            "technical_issue" => Some(ReportType::TechnicalIssue),
            "content_issue" => Some(ReportType::ContentIssue),
            "other" => Some(ReportType::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyLevel::Low => "low",
            UrgencyLevel::Medium => "medium",
            UrgencyLevel::High => "high",
            UrgencyLevel::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(UrgencyLevel::Low),
            "medium" => Some(UrgencyLevel::Medium),
            "high" => Some(UrgencyLevel::High),
            "critical" => Some(UrgencyLevel::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Resolved,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Reviewed => "reviewed",
            ReportStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReportStatus::Pending),
            "reviewed" => Some(ReportStatus::Reviewed),
            "resolved" => Some(ReportStatus::Resolved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub account_type: AccountType,
    pub is_active: bool,
    pub expires_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub expires_at: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub report_id: String,
    pub reported_by: String,
    pub report_type: ReportType,
    pub urgency_level: UrgencyLevel,
    pub description: String,
    pub location: Option<String>,
    pub time_of_incident: String,
    pub witness_present: bool,
    pub action_taken: String,
    pub additional_info: Option<String>,
    pub teacher_name: Option<String>,
    pub device_type: Option<String>,
    pub content_url: Option<String>,
    pub content_name: Option<String>,
    pub status: ReportStatus,
    pub admin_notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSettings {
    pub shutdown_mode: bool,
    pub maintenance_mode: bool,
    pub last_updated: String,
    pub updated_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_type_round_trips() {
        for ty in [
            AccountType::Temporary,
            AccountType::Permanent,
            AccountType::Admin,
        ] {
            assert_eq!(AccountType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(AccountType::parse("root"), None);
    }

    #[test]
    fn permanent_tier_includes_admin() {
        assert!(AccountType::Permanent.is_permanent());
        assert!(AccountType::Admin.is_permanent());
        assert!(!AccountType::Temporary.is_permanent());
    }

    #[test]
    fn only_admin_is_admin() {
        assert!(AccountType::Admin.is_admin());
        assert!(!AccountType::Permanent.is_admin());
        assert!(!AccountType::Temporary.is_admin());
    }

    #[test]
    fn report_type_parses_snake_case() {
        assert_eq!(
            ReportType::parse("teacher_spotted"),
            Some(ReportType::TeacherSpotted)
        );
        assert_eq!(ReportType::parse("teacherSpotted"), None);
    }

    #[test]
    fn urgency_rejects_unknown() {
        assert_eq!(UrgencyLevel::parse("urgent"), None);
        assert_eq!(
            UrgencyLevel::parse("critical"),
            Some(UrgencyLevel::Critical)
        );
    }

    #[test]
    fn request_status_round_trips() {
        for st in [
            RequestStatus::Pending,
            RequestStatus::Accepted,
            RequestStatus::Rejected,
        ] {
            assert_eq!(RequestStatus::parse(st.as_str()), Some(st));
        }
    }

    #[test]
    fn report_status_round_trips() {
        for st in [
            ReportStatus::Pending,
            ReportStatus::Reviewed,
            ReportStatus::Resolved,
        ] {
            assert_eq!(ReportStatus::parse(st.as_str()), Some(st));
        }
    }
}
