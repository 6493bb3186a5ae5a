use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Duration;
use validator::Validate;

use crate::dto::attendance_dto::{
    LocationAction, LocationPayload, LocationResponse, OwnReportQuery, StatsQuery, StatsResponse,
};
use crate::error::{Error, Result};
use crate::middleware::web_app::verify_web_app;
use crate::models::report::{DateRange, ReportPeriod};
use crate::models::work_session::{CheckInOutcome, CheckOutOutcome, Coordinates};
use crate::services::export_service::{ExportService, XLSX_CONTENT_TYPE};
use crate::utils::time;
use crate::AppState;

const DEFAULT_STATS_DAYS: i64 = 30;

/// Check-in or check-out from the web app. Business rejections come back as
/// `200 {success: false}`; the server clock decides the event time.
#[axum::debug_handler]
pub async fn post_location(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LocationPayload>,
) -> Result<Json<LocationResponse>> {
    payload.validate()?;
    verify_web_app(&state.config, &headers, payload.user_id)?;

    let at = time::now();
    let skew_seconds = payload
        .timestamp
        .as_deref()
        .and_then(|ts| time::from_rfc3339(ts).ok())
        .map(|client| (at - client).num_seconds());
    tracing::debug!(
        user_id = payload.user_id,
        action = ?payload.action,
        accuracy = ?payload.accuracy,
        client_timestamp = payload.timestamp.as_deref().unwrap_or("-"),
        skew_seconds = ?skew_seconds,
        "location received"
    );
    let location = Coordinates::new(payload.latitude, payload.longitude)?;
    let accuracy = payload.accuracy.unwrap_or(0.0).round() as i64;

    let response = match payload.action {
        LocationAction::CheckIn => {
            match state
                .session_service
                .check_in_at_location(payload.user_id, at, location)
                .await?
            {
                CheckInOutcome::Started(_) => LocationResponse::ok(format!(
                    "Приход на работу отмечен! (Точность: ±{}м)",
                    accuracy
                )),
                CheckInOutcome::AlreadyOpen(_) => {
                    LocationResponse::rejected("У вас уже есть активная рабочая сессия")
                }
                CheckInOutcome::OutsideGeofence {
                    distance_meters,
                    radius_meters,
                } => LocationResponse {
                    distance_meters: Some(distance_meters),
                    ..LocationResponse::rejected(format!(
                        "Вы находитесь вне зоны работы: {:.0} м (допустимо {:.0} м)",
                        distance_meters, radius_meters
                    ))
                },
            }
        }
        LocationAction::CheckOut => {
            match state
                .session_service
                .check_out(payload.user_id, at, Some(location))
                .await?
            {
                CheckOutOutcome::Closed {
                    duration_minutes, ..
                } => LocationResponse {
                    duration: Some(duration_minutes),
                    ..LocationResponse::ok(format!(
                        "Уход с работы отмечен! Отработано: {} (Точность: ±{}м)",
                        time::format_hm(duration_minutes.into()),
                        accuracy
                    ))
                },
                CheckOutOutcome::NoOpenSession => {
                    LocationResponse::rejected("Не найдено активной рабочей сессии")
                }
                CheckOutOutcome::CheckoutBeforeCheckin { .. } => {
                    LocationResponse::rejected("Время ухода раньше времени прихода")
                }
            }
        }
    };
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn get_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>> {
    query.validate()?;
    verify_web_app(&state.config, &headers, query.user_id)?;
    state.user_service.require(query.user_id).await?;

    let today = state.session_service.today(time::now());
    let days = query.days.unwrap_or(DEFAULT_STATS_DAYS);
    let range = DateRange::new(today - Duration::days(days - 1), today)?;

    let sessions = state
        .session_service
        .history(query.user_id, range.start)
        .await?;
    let totals = state
        .report_service
        .user_totals(query.user_id, range)
        .await?;

    Ok(Json(StatsResponse {
        success: true,
        user_id: query.user_id,
        range,
        total_hours: time::format_hours(totals.total_minutes),
        totals,
        sessions,
    }))
}

/// An approved employee's own sessions as an `.xlsx` attachment.
pub async fn export_own_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<OwnReportQuery>,
) -> Result<impl IntoResponse> {
    verify_web_app(&state.config, &headers, query.user_id)?;
    let user = state.user_service.require_approved(query.user_id).await?;

    let today = state.session_service.today(time::now());
    let range = query.period.unwrap_or(ReportPeriod::Month).range(today);
    let rows = state.report_service.user_session_rows(&user, range).await?;
    if rows.is_empty() {
        return Err(Error::NoSessions(user.user_id));
    }

    let buffer = ExportService::generate_sessions_xlsx(&rows, range, state.config.utc_offset)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        ExportService::user_filename(user.user_id, range)
    );
    tracing::info!(user_id = user.user_id, rows = rows.len(), "own report exported");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buffer,
    ))
}
