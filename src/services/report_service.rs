use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::database::repository::SessionRepository;
use crate::error::Result;
use crate::models::report::{
    CategoryBreakdown, CompanyReport, DateRange, ReportRow, UserBreakdown, UserTotals,
};
use crate::models::user::{Category, User};
use crate::models::work_session::{SessionWithUser, WorkSession};

pub use crate::utils::time::format_hours;

/// Read-only aggregation over persisted sessions. Minutes are the canonical
/// unit; open sessions count as zero.
#[derive(Clone)]
pub struct ReportService {
    sessions: Arc<dyn SessionRepository>,
}

impl ReportService {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }

    pub async fn user_totals(&self, user_id: i64, range: DateRange) -> Result<UserTotals> {
        let sessions = self.sessions.for_user_in_range(user_id, range).await?;
        Ok(totals(&sessions))
    }

    pub async fn company_totals(
        &self,
        range: DateRange,
        category: Option<Category>,
    ) -> Result<CompanyReport> {
        let rows = self.sessions.in_range(range, category).await?;
        let report = company_report(range, &rows);
        tracing::debug!(
            start = %range.start,
            end = %range.end,
            grand_total_minutes = report.grand_total_minutes,
            users_with_sessions = report.users_with_sessions,
            users_worked = report.users_worked,
            "company report built"
        );
        Ok(report)
    }

    /// One employee's sessions as export rows, newest first.
    pub async fn user_session_rows(&self, user: &User, range: DateRange) -> Result<Vec<ReportRow>> {
        let name = user.name();
        let rows = self
            .sessions
            .for_user_in_range(user.user_id, range)
            .await?
            .into_iter()
            .map(|session| ReportRow {
                date: session.date,
                user_id: session.user_id,
                name: name.clone(),
                username: user.username.clone(),
                category: user.category,
                duration_minutes: session.worked_minutes(),
                check_in: session.check_in_time,
                check_out: session.check_out_time,
            })
            .collect();
        Ok(rows)
    }

    /// Flat per-session rows, newest day first and by name within a day.
    pub async fn session_rows(
        &self,
        range: DateRange,
        category: Option<Category>,
    ) -> Result<Vec<ReportRow>> {
        let mut rows: Vec<ReportRow> = self
            .sessions
            .in_range(range, category)
            .await?
            .into_iter()
            .map(|row| ReportRow {
                date: row.session.date,
                user_id: row.session.user_id,
                duration_minutes: row.session.worked_minutes(),
                check_in: row.session.check_in_time,
                check_out: row.session.check_out_time,
                name: row.name,
                username: row.username,
                category: row.category,
            })
            .collect();
        rows.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| a.name.cmp(&b.name))
                .then(a.user_id.cmp(&b.user_id))
                .then(a.check_in.cmp(&b.check_in))
        });
        Ok(rows)
    }
}

pub fn totals(sessions: &[WorkSession]) -> UserTotals {
    let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for session in sessions {
        *per_day.entry(session.date).or_default() += session.worked_minutes();
    }
    let total_minutes: i64 = per_day.values().sum();
    let days_worked = per_day.values().filter(|m| **m > 0).count() as i64;
    UserTotals {
        total_minutes,
        days_worked,
        avg_minutes_per_day: if days_worked > 0 {
            total_minutes / days_worked
        } else {
            0
        },
    }
}

struct Accumulator {
    name: String,
    category: Category,
    total_minutes: i64,
    days: BTreeSet<NaiveDate>,
}

fn company_report(range: DateRange, rows: &[SessionWithUser]) -> CompanyReport {
    let mut per_user: HashMap<i64, Accumulator> = HashMap::new();
    for row in rows {
        let entry = per_user
            .entry(row.session.user_id)
            .or_insert_with(|| Accumulator {
                name: row.name.clone(),
                category: row.category,
                total_minutes: 0,
                days: BTreeSet::new(),
            });
        let minutes = row.session.worked_minutes();
        entry.total_minutes += minutes;
        if minutes > 0 {
            entry.days.insert(row.session.date);
        }
    }

    let mut categories = Vec::new();
    for category in Category::ALL {
        let mut users: Vec<UserBreakdown> = per_user
            .iter()
            .filter(|(_, acc)| acc.category == category)
            .map(|(user_id, acc)| UserBreakdown {
                user_id: *user_id,
                name: acc.name.clone(),
                total_minutes: acc.total_minutes,
                days_worked: acc.days.len() as i64,
            })
            .collect();
        if users.is_empty() {
            continue;
        }
        users.sort_by(|a, b| {
            b.total_minutes
                .cmp(&a.total_minutes)
                .then_with(|| a.name.cmp(&b.name))
                .then(a.user_id.cmp(&b.user_id))
        });
        categories.push(CategoryBreakdown {
            category,
            category_total_minutes: users.iter().map(|u| u.total_minutes).sum(),
            per_user: users,
        });
    }

    let grand_total_minutes = categories.iter().map(|c| c.category_total_minutes).sum();
    let users_with_sessions = per_user.len() as i64;
    let users_worked = per_user.values().filter(|a| a.total_minutes > 0).count() as i64;
    CompanyReport {
        range,
        categories,
        grand_total_minutes,
        users_with_sessions,
        users_worked,
        avg_minutes_per_user: if users_with_sessions > 0 {
            grand_total_minutes / users_with_sessions
        } else {
            0
        },
    }
}
