use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::database::repository::{SessionRepository, UserRepository};
use crate::error::Result;
use crate::models::report::DateRange;
use crate::models::user::{
    Category, Registration, StatusChange, User, UserFilter, UserStatus,
};
use crate::models::work_session::{
    duration_minutes, CheckOutOutcome, NewSession, SessionClose, SessionWithUser, WorkSession,
};

/// Process-local store used when no database is configured and in tests.
/// Each operation runs under a single lock, which gives the same
/// insert-if-absent guarantee as the partial unique index.
#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<i64, User>,
    sessions: Vec<WorkSession>,
    next_session_id: i64,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn newest_first(a: &WorkSession, b: &WorkSession) -> std::cmp::Ordering {
    b.date
        .cmp(&a.date)
        .then(b.check_in_time.cmp(&a.check_in_time))
        .then(b.id.cmp(&a.id))
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn upsert_registration(
        &self,
        registration: &Registration,
        at: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let mut state = self.lock();
        match state.users.get_mut(&registration.user_id) {
            Some(user) if user.status == UserStatus::Archived => Ok(None),
            Some(user) => {
                user.username = registration.username.clone();
                user.full_name = registration.full_name.clone();
                user.display_name = registration.display_name.clone();
                user.phone = registration.phone.clone();
                user.category = registration.category;
                user.status = UserStatus::Pending;
                user.last_active = Some(at);
                Ok(Some(user.clone()))
            }
            None => {
                let user = User {
                    user_id: registration.user_id,
                    username: registration.username.clone(),
                    full_name: registration.full_name.clone(),
                    display_name: registration.display_name.clone(),
                    phone: registration.phone.clone(),
                    category: registration.category,
                    status: UserStatus::Pending,
                    is_archived: false,
                    archived_at: None,
                    archived_by: None,
                    approved_by: None,
                    approved_at: None,
                    first_seen: at,
                    last_active: Some(at),
                };
                state.users.insert(user.user_id, user.clone());
                Ok(Some(user))
            }
        }
    }

    async fn find(&self, user_id: i64) -> Result<Option<User>> {
        Ok(self.lock().users.get(&user_id).cloned())
    }

    async fn transition(
        &self,
        user_id: i64,
        from: &[UserStatus],
        change: StatusChange,
    ) -> Result<Option<User>> {
        let mut state = self.lock();
        let Some(user) = state.users.get_mut(&user_id) else {
            return Ok(None);
        };
        if !from.contains(&user.status) {
            return Ok(None);
        }
        user.status = change.to;
        match change.to {
            UserStatus::Approved => {
                user.approved_by = Some(change.admin_id);
                user.approved_at = Some(change.at);
            }
            UserStatus::Archived => {
                user.is_archived = true;
                user.archived_by = Some(change.admin_id);
                user.archived_at = Some(change.at);
            }
            UserStatus::New | UserStatus::Pending | UserStatus::Blocked => {}
        }
        Ok(Some(user.clone()))
    }

    async fn set_category(&self, user_id: i64, category: Category) -> Result<Option<User>> {
        let mut state = self.lock();
        Ok(state.users.get_mut(&user_id).map(|user| {
            user.category = category;
            user.clone()
        }))
    }

    async fn touch(&self, user_id: i64, at: DateTime<Utc>) -> Result<()> {
        if let Some(user) = self.lock().users.get_mut(&user_id) {
            user.last_active = Some(at);
        }
        Ok(())
    }

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let mut users: Vec<User> = self
            .lock()
            .users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name().cmp(&b.name()).then(a.user_id.cmp(&b.user_id)));
        Ok(users)
    }
}

#[async_trait]
impl SessionRepository for MemoryRepository {
    async fn insert_open(&self, session: &NewSession) -> Result<Option<WorkSession>> {
        let mut state = self.lock();
        let conflict = state
            .sessions
            .iter()
            .any(|s| s.user_id == session.user_id && s.date == session.date && s.is_open());
        if conflict {
            return Ok(None);
        }
        state.next_session_id += 1;
        let row = WorkSession {
            id: state.next_session_id,
            user_id: session.user_id,
            date: session.date,
            check_in_time: session.check_in_time,
            check_out_time: None,
            duration_minutes: None,
            checkin_lat: session.location.map(|c| c.latitude),
            checkin_lon: session.location.map(|c| c.longitude),
            checkout_lat: None,
            checkout_lon: None,
        };
        state.sessions.push(row.clone());
        Ok(Some(row))
    }

    async fn find_open(&self, user_id: i64, date: NaiveDate) -> Result<Option<WorkSession>> {
        Ok(self
            .lock()
            .sessions
            .iter()
            .find(|s| s.user_id == user_id && s.date == date && s.is_open())
            .cloned())
    }

    async fn close_open(&self, close: &SessionClose) -> Result<CheckOutOutcome> {
        let mut state = self.lock();
        let Some(open) = state
            .sessions
            .iter_mut()
            .find(|s| s.user_id == close.user_id && s.date == close.date && s.is_open())
        else {
            return Ok(CheckOutOutcome::NoOpenSession);
        };
        let Some(minutes) = duration_minutes(open.check_in_time, close.check_out_time) else {
            return Ok(CheckOutOutcome::CheckoutBeforeCheckin {
                check_in: open.check_in_time,
            });
        };
        open.check_out_time = Some(close.check_out_time);
        open.duration_minutes = Some(minutes);
        open.checkout_lat = close.location.map(|c| c.latitude);
        open.checkout_lon = close.location.map(|c| c.longitude);
        Ok(CheckOutOutcome::Closed {
            session: open.clone(),
            duration_minutes: minutes,
        })
    }

    async fn latest_for_day(&self, user_id: i64, date: NaiveDate) -> Result<Option<WorkSession>> {
        let state = self.lock();
        let mut day: Vec<&WorkSession> = state
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.date == date)
            .collect();
        day.sort_by(|a, b| b.is_open().cmp(&a.is_open()).then(newest_first(a, b)));
        Ok(day.first().map(|s| (*s).clone()))
    }

    async fn history(&self, user_id: i64, since: NaiveDate) -> Result<Vec<WorkSession>> {
        let mut rows: Vec<WorkSession> = self
            .lock()
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.date >= since)
            .cloned()
            .collect();
        rows.sort_by(newest_first);
        Ok(rows)
    }

    async fn in_range(
        &self,
        range: DateRange,
        category: Option<Category>,
    ) -> Result<Vec<SessionWithUser>> {
        let state = self.lock();
        let mut rows: Vec<SessionWithUser> = state
            .sessions
            .iter()
            .filter(|s| range.contains(s.date))
            .map(|s| {
                let user = state.users.get(&s.user_id);
                SessionWithUser {
                    session: s.clone(),
                    name: user.map(User::name).unwrap_or_else(|| "Unknown".to_string()),
                    username: user.and_then(|u| u.username.clone()),
                    category: user.map(|u| u.category).unwrap_or(Category::Hall),
                }
            })
            .filter(|row| category.map_or(true, |c| row.category == c))
            .collect();
        rows.sort_by(|a, b| {
            b.session
                .date
                .cmp(&a.session.date)
                .then(a.session.user_id.cmp(&b.session.user_id))
                .then(a.session.check_in_time.cmp(&b.session.check_in_time))
        });
        Ok(rows)
    }

    async fn for_user_in_range(&self, user_id: i64, range: DateRange) -> Result<Vec<WorkSession>> {
        let mut rows: Vec<WorkSession> = self
            .lock()
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && range.contains(s.date))
            .cloned()
            .collect();
        rows.sort_by(newest_first);
        Ok(rows)
    }
}
