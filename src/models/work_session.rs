use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::InvalidCoordinate(format!(
                "latitude {} is outside [-90, 90]",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::InvalidCoordinate(format!(
                "longitude {} is outside [-180, 180]",
                longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WorkSession {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub check_in_time: DateTime<Utc>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub checkin_lat: Option<f64>,
    pub checkin_lon: Option<f64>,
    pub checkout_lat: Option<f64>,
    pub checkout_lon: Option<f64>,
}

impl WorkSession {
    pub fn is_open(&self) -> bool {
        self.check_out_time.is_none()
    }

    /// Recorded duration, zero while the session is still open.
    pub fn worked_minutes(&self) -> i64 {
        self.duration_minutes.map(i64::from).unwrap_or(0)
    }

    /// Minutes on the clock so far for an open session, `None` once closed.
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> Option<i64> {
        if !self.is_open() {
            return None;
        }
        Some((now - self.check_in_time).num_minutes().max(0))
    }

    pub fn check_in_location(&self) -> Option<Coordinates> {
        match (self.checkin_lat, self.checkin_lon) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }

    pub fn check_out_location(&self) -> Option<Coordinates> {
        match (self.checkout_lat, self.checkout_lon) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

/// Whole minutes between check-in and check-out, rounded down.
/// `None` when check-out precedes check-in.
pub fn duration_minutes(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> Option<i32> {
    let seconds = (check_out - check_in).num_seconds();
    if seconds < 0 {
        return None;
    }
    i32::try_from(seconds / 60).ok()
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: i64,
    pub date: NaiveDate,
    pub check_in_time: DateTime<Utc>,
    pub location: Option<Coordinates>,
}

#[derive(Debug, Clone)]
pub struct SessionClose {
    pub user_id: i64,
    pub date: NaiveDate,
    pub check_out_time: DateTime<Utc>,
    pub location: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CheckInOutcome {
    Started(WorkSession),
    AlreadyOpen(WorkSession),
    OutsideGeofence {
        distance_meters: f64,
        radius_meters: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CheckOutOutcome {
    Closed {
        session: WorkSession,
        duration_minutes: i32,
    },
    NoOpenSession,
    CheckoutBeforeCheckin {
        check_in: DateTime<Utc>,
    },
}

/// A session joined with the owner's profile, as read by reports.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionWithUser {
    pub session: WorkSession,
    pub name: String,
    pub username: Option<String>,
    pub category: crate::models::user::Category,
}
