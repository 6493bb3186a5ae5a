use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::report::{DateRange, ReportPeriod, UserTotals};
use crate::models::user::{Category, UserFilter, UserStatus};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListQuery {
    /// Id or part of a name; narrows the listing to matches.
    pub q: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub include_archived: Option<bool>,
}

impl UserListQuery {
    pub fn into_filter(self) -> Result<UserFilter> {
        let category = self.category.as_deref().map(str::parse).transpose()?;
        let status = self
            .status
            .as_deref()
            .map(|s| {
                s.parse::<UserStatus>()
                    .map_err(|_| Error::BadRequest(format!("Unknown status: {}", s)))
            })
            .transpose()?;
        Ok(UserFilter {
            category,
            status,
            include_archived: self.include_archived.unwrap_or(false)
                || status == Some(UserStatus::Archived),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminTokenResponse {
    pub token: String,
    pub admin_id: i64,
    pub expires_in_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryPayload {
    pub category: String,
}

/// Check-in or check-out entered by an admin. `at` defaults to now.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ManualEntryPayload {
    #[validate(range(min = 1))]
    pub user_id: i64,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub period: Option<ReportPeriod>,
    pub category: Option<String>,
}

impl ReportQuery {
    /// Explicit `start`/`end` win over `period`; with neither, the last 30 days.
    pub fn range(&self, today: NaiveDate) -> Result<DateRange> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => DateRange::new(start, end),
            (None, None) => Ok(self.period.unwrap_or(ReportPeriod::Month).range(today)),
            _ => Err(Error::BadRequest(
                "start and end must be given together".to_string(),
            )),
        }
    }

    pub fn category(&self) -> Result<Option<Category>> {
        self.category.as_deref().map(str::parse).transpose()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserReportResponse {
    pub user_id: i64,
    pub name: String,
    pub range: DateRange,
    pub totals: UserTotals,
    pub total_hours: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn report_query_prefers_explicit_dates() {
        let query = ReportQuery {
            start: Some(day(1)),
            end: Some(day(5)),
            period: Some(ReportPeriod::Today),
            category: None,
        };
        assert_eq!(query.range(day(10)).unwrap(), DateRange::new(day(1), day(5)).unwrap());

        let half = ReportQuery {
            start: Some(day(1)),
            ..ReportQuery::default()
        };
        assert!(matches!(half.range(day(10)), Err(Error::BadRequest(_))));

        let default = ReportQuery::default().range(day(30)).unwrap();
        assert_eq!(default.start, day(1));
    }

    #[test]
    fn user_list_query_parses_labels() {
        let filter = UserListQuery {
            category: Some("Кухня".into()),
            status: Some("archived".into()),
            ..UserListQuery::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.category, Some(Category::Kitchen));
        assert!(filter.include_archived);

        let bad = UserListQuery {
            category: Some("garden".into()),
            ..UserListQuery::default()
        };
        assert!(matches!(bad.into_filter(), Err(Error::InvalidCategory(_))));
    }
}
