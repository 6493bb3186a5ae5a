use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};

use crate::database::repository::{SessionRepository, UserRepository};
use crate::error::{Error, Result};
use crate::models::report::DateRange;
use crate::models::user::{
    report_name, Category, Registration, StatusChange, User, UserFilter, UserRecord, UserStatus,
};
use crate::models::work_session::{
    duration_minutes, CheckOutOutcome, NewSession, SessionClose, SessionWithUser, WorkSession,
};

const USER_COLUMNS: &str = "user_id, username, full_name, display_name, phone, category, status, \
     is_archived, archived_at, archived_by, approved_by, approved_at, first_seen, last_active";

const SESSION_COLUMNS: &str = "id, user_id, date, check_in_time, check_out_time, duration_minutes, \
     checkin_lat, checkin_lon, checkout_lat, checkout_lon";

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SessionUserRow {
    id: i64,
    user_id: i64,
    date: NaiveDate,
    check_in_time: DateTime<Utc>,
    check_out_time: Option<DateTime<Utc>>,
    duration_minutes: Option<i32>,
    checkin_lat: Option<f64>,
    checkin_lon: Option<f64>,
    checkout_lat: Option<f64>,
    checkout_lon: Option<f64>,
    username: Option<String>,
    full_name: Option<String>,
    display_name: Option<String>,
    category: Option<String>,
}

impl TryFrom<SessionUserRow> for SessionWithUser {
    type Error = Error;

    fn try_from(r: SessionUserRow) -> Result<Self> {
        let category = match r.category.as_deref() {
            Some(raw) => raw.parse()?,
            None => Category::Hall,
        };
        Ok(SessionWithUser {
            name: report_name(
                r.full_name.as_deref(),
                r.username.as_deref(),
                r.display_name.as_deref(),
            ),
            username: r.username,
            category,
            session: WorkSession {
                id: r.id,
                user_id: r.user_id,
                date: r.date,
                check_in_time: r.check_in_time,
                check_out_time: r.check_out_time,
                duration_minutes: r.duration_minutes,
                checkin_lat: r.checkin_lat,
                checkin_lon: r.checkin_lon,
                checkout_lat: r.checkout_lat,
                checkout_lon: r.checkout_lon,
            },
        })
    }
}

fn into_user(record: Option<UserRecord>) -> Result<Option<User>> {
    record.map(User::try_from).transpose()
}

#[async_trait]
impl UserRepository for PgRepository {
    async fn upsert_registration(
        &self,
        registration: &Registration,
        at: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let sql = format!(
            r#"
            INSERT INTO users (user_id, username, full_name, display_name, phone, category, status, first_seen, last_active)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                username = EXCLUDED.username,
                full_name = EXCLUDED.full_name,
                display_name = EXCLUDED.display_name,
                phone = EXCLUDED.phone,
                category = EXCLUDED.category,
                status = 'pending',
                last_active = EXCLUDED.last_active,
                updated_at = NOW()
            WHERE users.status <> 'archived'
            RETURNING {USER_COLUMNS}
            "#
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(registration.user_id)
            .bind(&registration.username)
            .bind(&registration.full_name)
            .bind(&registration.display_name)
            .bind(&registration.phone)
            .bind(registration.category.as_str())
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;
        into_user(record)
    }

    async fn find(&self, user_id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        into_user(record)
    }

    async fn transition(
        &self,
        user_id: i64,
        from: &[UserStatus],
        change: StatusChange,
    ) -> Result<Option<User>> {
        let from: Vec<String> = from.iter().map(|s| s.as_str().to_string()).collect();
        let sql = format!(
            r#"
            UPDATE users SET
                status = $2,
                approved_by = CASE WHEN $2 = 'approved' THEN $3 ELSE approved_by END,
                approved_at = CASE WHEN $2 = 'approved' THEN $4 ELSE approved_at END,
                is_archived = CASE WHEN $2 = 'archived' THEN TRUE ELSE is_archived END,
                archived_by = CASE WHEN $2 = 'archived' THEN $3 ELSE archived_by END,
                archived_at = CASE WHEN $2 = 'archived' THEN $4 ELSE archived_at END,
                updated_at = NOW()
            WHERE user_id = $1 AND status = ANY($5)
            RETURNING {USER_COLUMNS}
            "#
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .bind(change.to.as_str())
            .bind(change.admin_id)
            .bind(change.at)
            .bind(from)
            .fetch_optional(&self.pool)
            .await?;
        into_user(record)
    }

    async fn set_category(&self, user_id: i64, category: Category) -> Result<Option<User>> {
        let sql = format!(
            "UPDATE users SET category = $2, updated_at = NOW() WHERE user_id = $1 RETURNING {USER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .bind(category.as_str())
            .fetch_optional(&self.pool)
            .await?;
        into_user(record)
    }

    async fn touch(&self, user_id: i64, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE users SET last_active = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE ($1::text IS NULL OR category = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3 OR NOT is_archived)
            ORDER BY COALESCE(NULLIF(TRIM(full_name), ''), NULLIF(TRIM(username), ''), NULLIF(TRIM(display_name), ''), 'Unknown'),
                     user_id
            "#
        );
        let records = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(filter.category.map(|c| c.as_str()))
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.include_archived)
            .fetch_all(&self.pool)
            .await?;
        records.into_iter().map(User::try_from).collect()
    }
}

#[async_trait]
impl SessionRepository for PgRepository {
    async fn insert_open(&self, session: &NewSession) -> Result<Option<WorkSession>> {
        let sql = format!(
            r#"
            INSERT INTO work_sessions (user_id, date, check_in_time, checkin_lat, checkin_lon)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, date) WHERE check_out_time IS NULL DO NOTHING
            RETURNING {SESSION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, WorkSession>(&sql)
            .bind(session.user_id)
            .bind(session.date)
            .bind(session.check_in_time)
            .bind(session.location.map(|c| c.latitude))
            .bind(session.location.map(|c| c.longitude))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_open(&self, user_id: i64, date: NaiveDate) -> Result<Option<WorkSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM work_sessions \
             WHERE user_id = $1 AND date = $2 AND check_out_time IS NULL"
        );
        let row = sqlx::query_as::<_, WorkSession>(&sql)
            .bind(user_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn close_open(&self, close: &SessionClose) -> Result<CheckOutOutcome> {
        let mut tx = self.pool.begin().await?;

        let select = format!(
            "SELECT {SESSION_COLUMNS} FROM work_sessions \
             WHERE user_id = $1 AND date = $2 AND check_out_time IS NULL \
             FOR UPDATE"
        );
        let open = sqlx::query_as::<_, WorkSession>(&select)
            .bind(close.user_id)
            .bind(close.date)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(open) = open else {
            return Ok(CheckOutOutcome::NoOpenSession);
        };
        let Some(minutes) = duration_minutes(open.check_in_time, close.check_out_time) else {
            return Ok(CheckOutOutcome::CheckoutBeforeCheckin {
                check_in: open.check_in_time,
            });
        };

        let update = format!(
            r#"
            UPDATE work_sessions
            SET check_out_time = $2, duration_minutes = $3, checkout_lat = $4, checkout_lon = $5
            WHERE id = $1
            RETURNING {SESSION_COLUMNS}
            "#
        );
        let session = sqlx::query_as::<_, WorkSession>(&update)
            .bind(open.id)
            .bind(close.check_out_time)
            .bind(minutes)
            .bind(close.location.map(|c| c.latitude))
            .bind(close.location.map(|c| c.longitude))
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(CheckOutOutcome::Closed {
            session,
            duration_minutes: minutes,
        })
    }

    async fn latest_for_day(&self, user_id: i64, date: NaiveDate) -> Result<Option<WorkSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM work_sessions \
             WHERE user_id = $1 AND date = $2 \
             ORDER BY (check_out_time IS NULL) DESC, check_in_time DESC, id DESC \
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, WorkSession>(&sql)
            .bind(user_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn history(&self, user_id: i64, since: NaiveDate) -> Result<Vec<WorkSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM work_sessions \
             WHERE user_id = $1 AND date >= $2 \
             ORDER BY date DESC, check_in_time DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, WorkSession>(&sql)
            .bind(user_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn in_range(
        &self,
        range: DateRange,
        category: Option<Category>,
    ) -> Result<Vec<SessionWithUser>> {
        let rows = sqlx::query_as::<_, SessionUserRow>(
            r#"
            SELECT ws.id, ws.user_id, ws.date, ws.check_in_time, ws.check_out_time, ws.duration_minutes,
                   ws.checkin_lat, ws.checkin_lon, ws.checkout_lat, ws.checkout_lon,
                   u.username, u.full_name, u.display_name, u.category
            FROM work_sessions ws
            LEFT JOIN users u ON u.user_id = ws.user_id
            WHERE ws.date BETWEEN $1 AND $2
              AND ($3::text IS NULL OR COALESCE(u.category, 'hall') = $3)
            ORDER BY ws.date DESC, ws.user_id, ws.check_in_time
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .bind(category.map(|c| c.as_str()))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(SessionWithUser::try_from).collect()
    }

    async fn for_user_in_range(&self, user_id: i64, range: DateRange) -> Result<Vec<WorkSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM work_sessions \
             WHERE user_id = $1 AND date BETWEEN $2 AND $3 \
             ORDER BY date DESC, check_in_time DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, WorkSession>(&sql)
            .bind(user_id)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
