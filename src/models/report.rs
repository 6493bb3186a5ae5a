use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::user::Category;

/// Closed interval of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// Preset periods offered to employees and admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    Today,
    Week,
    TwoWeeks,
    Month,
    PreviousMonth,
    All,
}

impl ReportPeriod {
    /// Resolves the preset relative to `today`. Rolling periods include `today`.
    pub fn range(&self, today: NaiveDate) -> DateRange {
        let back = |days: i64| DateRange {
            start: today - Duration::days(days - 1),
            end: today,
        };
        match self {
            ReportPeriod::Today => DateRange::single(today),
            ReportPeriod::Week => back(7),
            ReportPeriod::TwoWeeks => back(14),
            ReportPeriod::Month => back(30),
            ReportPeriod::All => back(365),
            ReportPeriod::PreviousMonth => {
                let first_this_month = today.with_day(1).unwrap_or(today);
                let end = first_this_month - Duration::days(1);
                let start = end.with_day(1).unwrap_or(end);
                DateRange { start, end }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserTotals {
    pub total_minutes: i64,
    pub days_worked: i64,
    pub avg_minutes_per_day: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBreakdown {
    pub user_id: i64,
    pub name: String,
    pub total_minutes: i64,
    pub days_worked: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: Category,
    pub per_user: Vec<UserBreakdown>,
    pub category_total_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyReport {
    pub range: DateRange,
    pub categories: Vec<CategoryBreakdown>,
    pub grand_total_minutes: i64,
    /// Employees with at least one session in the range, zero-minute ones included.
    pub users_with_sessions: i64,
    /// Employees with a positive total in the range.
    pub users_worked: i64,
    /// `grand_total_minutes / users_with_sessions`.
    pub avg_minutes_per_user: i64,
}

/// One exported line: a single session with its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub date: NaiveDate,
    pub user_id: i64,
    pub name: String,
    pub username: Option<String>,
    pub category: Category,
    pub check_in: DateTime<Utc>,
    pub check_out: Option<DateTime<Utc>>,
    pub duration_minutes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(DateRange::new(day(2025, 3, 1), day(2025, 3, 1)).is_ok());
        assert!(matches!(
            DateRange::new(day(2025, 3, 2), day(2025, 3, 1)),
            Err(Error::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn rolling_periods_include_today() {
        let today = day(2025, 3, 10);
        assert_eq!(ReportPeriod::Week.range(today).start, day(2025, 3, 4));
        assert_eq!(ReportPeriod::TwoWeeks.range(today).start, day(2025, 2, 25));
        assert_eq!(ReportPeriod::Month.range(today).start, day(2025, 2, 9));
        assert_eq!(ReportPeriod::Today.range(today), DateRange::single(today));
    }

    #[test]
    fn previous_month_crosses_year_boundary() {
        let range = ReportPeriod::PreviousMonth.range(day(2025, 1, 15));
        assert_eq!(range.start, day(2024, 12, 1));
        assert_eq!(range.end, day(2024, 12, 31));

        let range = ReportPeriod::PreviousMonth.range(day(2024, 3, 1));
        assert_eq!(range.start, day(2024, 2, 1));
        assert_eq!(range.end, day(2024, 2, 29));
    }
}
