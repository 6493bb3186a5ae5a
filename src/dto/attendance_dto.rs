use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::report::{DateRange, ReportPeriod, UserTotals};
use crate::models::user::UserStatus;
use crate::models::work_session::WorkSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationAction {
    CheckIn,
    CheckOut,
}

/// Position report sent by the web app.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LocationPayload {
    #[validate(range(min = 1))]
    pub user_id: i64,
    #[serde(rename = "type")]
    pub action: LocationAction,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(range(min = 0.0))]
    pub accuracy: Option<f64>,
    /// Client clock, logged only.
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
}

impl LocationResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            duration: None,
            distance_meters: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::ok(message)
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StatsQuery {
    pub user_id: i64,
    #[validate(range(min = 1, max = 365))]
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub success: bool,
    pub user_id: i64,
    pub range: DateRange,
    pub totals: UserTotals,
    pub total_hours: String,
    pub sessions: Vec<WorkSession>,
}

/// Employee report download; `period` defaults to the last 30 days.
#[derive(Debug, Clone, Deserialize)]
pub struct OwnReportQuery {
    pub user_id: i64,
    pub period: Option<ReportPeriod>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterPayload {
    #[validate(range(min = 1))]
    pub user_id: i64,
    #[validate(length(max = 64))]
    pub username: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub full_name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub display_name: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub user_id: i64,
    pub status: UserStatus,
    pub today: NaiveDate,
    pub today_session: Option<WorkSession>,
    /// Minutes worked so far when today's session is still open.
    pub elapsed_minutes: Option<i64>,
}
