use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::models::report::DateRange;
use crate::models::user::{Category, Registration, StatusChange, User, UserFilter, UserStatus};
use crate::models::work_session::{
    CheckOutOutcome, NewSession, SessionClose, SessionWithUser, WorkSession,
};

/// Persistence of employee profiles. Every mutating call is a single
/// conditional write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts or resets the user to `pending`. Returns `None` when the user
    /// is archived and was left untouched.
    async fn upsert_registration(
        &self,
        registration: &Registration,
        at: DateTime<Utc>,
    ) -> Result<Option<User>>;

    async fn find(&self, user_id: i64) -> Result<Option<User>>;

    /// Applies `change` only if the current status is in `from`.
    /// Returns `None` when the user is missing or in another state.
    async fn transition(
        &self,
        user_id: i64,
        from: &[UserStatus],
        change: StatusChange,
    ) -> Result<Option<User>>;

    async fn set_category(&self, user_id: i64, category: Category) -> Result<Option<User>>;

    async fn touch(&self, user_id: i64, at: DateTime<Utc>) -> Result<()>;

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>>;
}

/// Persistence of work sessions. Enforces at most one open session per
/// `(user_id, date)` at the storage level.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Inserts an open session unless one is already open for the same day.
    /// Returns `None` on conflict.
    async fn insert_open(&self, session: &NewSession) -> Result<Option<WorkSession>>;

    async fn find_open(&self, user_id: i64, date: NaiveDate) -> Result<Option<WorkSession>>;

    /// Closes the open session of `close.date` atomically.
    async fn close_open(&self, close: &SessionClose) -> Result<CheckOutOutcome>;

    /// The open session of the day if any, otherwise the latest one.
    async fn latest_for_day(&self, user_id: i64, date: NaiveDate) -> Result<Option<WorkSession>>;

    /// Sessions on or after `since`, newest first.
    async fn history(&self, user_id: i64, since: NaiveDate) -> Result<Vec<WorkSession>>;

    async fn in_range(
        &self,
        range: DateRange,
        category: Option<Category>,
    ) -> Result<Vec<SessionWithUser>>;

    async fn for_user_in_range(&self, user_id: i64, range: DateRange) -> Result<Vec<WorkSession>>;
}
