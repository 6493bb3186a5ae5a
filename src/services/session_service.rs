use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::database::repository::SessionRepository;
use crate::error::{Error, Result};
use crate::models::work_session::{
    CheckInOutcome, CheckOutOutcome, Coordinates, NewSession, SessionClose, WorkSession,
};
use crate::services::user_service::UserService;
use crate::utils::geo::GeoFence;
use crate::utils::time::local_date;

/// Records check-ins and check-outs. A session's day key is the local date
/// of its check-in under the configured UTC offset.
#[derive(Clone)]
pub struct SessionService {
    sessions: Arc<dyn SessionRepository>,
    users: UserService,
    fence: GeoFence,
    utc_offset: FixedOffset,
}

impl SessionService {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        users: UserService,
        fence: GeoFence,
        utc_offset: FixedOffset,
    ) -> Self {
        Self {
            sessions,
            users,
            fence,
            utc_offset,
        }
    }

    pub fn today(&self, at: DateTime<Utc>) -> NaiveDate {
        local_date(at, self.utc_offset)
    }

    pub async fn check_in(
        &self,
        user_id: i64,
        at: DateTime<Utc>,
        location: Option<Coordinates>,
    ) -> Result<CheckInOutcome> {
        self.users.require_approved(user_id).await?;
        self.start(user_id, at, location).await
    }

    /// In-person check-in. Points outside the fence are turned away before
    /// anything is read or written.
    pub async fn check_in_at_location(
        &self,
        user_id: i64,
        at: DateTime<Utc>,
        location: Coordinates,
    ) -> Result<CheckInOutcome> {
        let check = self.fence.check(location);
        if !check.inside {
            tracing::info!(
                user_id,
                distance_meters = check.distance_meters,
                radius_meters = self.fence.radius_meters,
                "check-in outside geofence"
            );
            return Ok(CheckInOutcome::OutsideGeofence {
                distance_meters: check.distance_meters,
                radius_meters: self.fence.radius_meters,
            });
        }
        self.check_in(user_id, at, Some(location)).await
    }

    pub async fn check_out(
        &self,
        user_id: i64,
        at: DateTime<Utc>,
        location: Option<Coordinates>,
    ) -> Result<CheckOutOutcome> {
        self.users.require_approved(user_id).await?;
        self.finish(user_id, at, location).await
    }

    /// Admin entry on behalf of an employee. Only existence is checked.
    pub async fn manual_check_in(&self, user_id: i64, at: DateTime<Utc>) -> Result<CheckInOutcome> {
        self.users.require(user_id).await?;
        self.start(user_id, at, None).await
    }

    pub async fn manual_check_out(
        &self,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<CheckOutOutcome> {
        self.users.require(user_id).await?;
        self.finish(user_id, at, None).await
    }

    pub async fn today_session(
        &self,
        user_id: i64,
        today: NaiveDate,
    ) -> Result<Option<WorkSession>> {
        self.sessions.latest_for_day(user_id, today).await
    }

    pub async fn history(&self, user_id: i64, since: NaiveDate) -> Result<Vec<WorkSession>> {
        self.sessions.history(user_id, since).await
    }

    async fn start(
        &self,
        user_id: i64,
        at: DateTime<Utc>,
        location: Option<Coordinates>,
    ) -> Result<CheckInOutcome> {
        let date = self.today(at);
        let new = NewSession {
            user_id,
            date,
            check_in_time: at,
            location,
        };

        // A conflicting session can be closed between the insert and the
        // lookup, so the insert gets one more try.
        for _ in 0..2 {
            if let Some(session) = self.sessions.insert_open(&new).await? {
                tracing::info!(user_id, %date, session_id = session.id, "check-in recorded");
                self.touch(user_id, at).await;
                return Ok(CheckInOutcome::Started(session));
            }
            if let Some(open) = self.sessions.find_open(user_id, date).await? {
                tracing::info!(user_id, %date, session_id = open.id, "session already open");
                return Ok(CheckInOutcome::AlreadyOpen(open));
            }
        }
        Err(Error::Internal(format!(
            "check-in for user {} on {} kept conflicting",
            user_id, date
        )))
    }

    async fn finish(
        &self,
        user_id: i64,
        at: DateTime<Utc>,
        location: Option<Coordinates>,
    ) -> Result<CheckOutOutcome> {
        let date = self.today(at);
        let close = SessionClose {
            user_id,
            date,
            check_out_time: at,
            location,
        };
        let outcome = self.sessions.close_open(&close).await?;
        match &outcome {
            CheckOutOutcome::Closed {
                session,
                duration_minutes,
            } => {
                tracing::info!(
                    user_id,
                    %date,
                    session_id = session.id,
                    duration_minutes,
                    "check-out recorded"
                );
                self.touch(user_id, at).await;
            }
            CheckOutOutcome::NoOpenSession => {
                tracing::info!(user_id, %date, "check-out without open session");
            }
            CheckOutOutcome::CheckoutBeforeCheckin { check_in } => {
                tracing::warn!(user_id, %date, %check_in, checkout = %at, "check-out precedes check-in");
            }
        }
        Ok(outcome)
    }

    async fn touch(&self, user_id: i64, at: DateTime<Utc>) {
        if let Err(err) = self.users.record_activity(user_id, at).await {
            tracing::warn!(user_id, error = %err, "failed to update last activity");
        }
    }
}
