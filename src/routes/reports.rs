use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::dto::admin_dto::{ReportQuery, UserReportResponse};
use crate::error::Result;
use crate::models::report::CompanyReport;
use crate::services::export_service::{ExportService, XLSX_CONTENT_TYPE};
use crate::utils::time;
use crate::AppState;

pub async fn company_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<CompanyReport>> {
    let range = query.range(state.session_service.today(time::now()))?;
    let report = state
        .report_service
        .company_totals(range, query.category()?)
        .await?;
    Ok(Json(report))
}

pub async fn user_report(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<UserReportResponse>> {
    let range = query.range(state.session_service.today(time::now()))?;
    let user = state.user_service.require(user_id).await?;
    let totals = state.report_service.user_totals(user_id, range).await?;
    Ok(Json(UserReportResponse {
        user_id,
        name: user.name(),
        range,
        total_hours: time::format_hours(totals.total_minutes),
        totals,
    }))
}

/// Session rows of the range as an `.xlsx` attachment.
pub async fn export_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse> {
    let range = query.range(state.session_service.today(time::now()))?;
    let rows = state
        .report_service
        .session_rows(range, query.category()?)
        .await?;
    let buffer =
        ExportService::generate_sessions_xlsx(&rows, range, state.config.utc_offset)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        ExportService::filename(range)
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buffer,
    ))
}
