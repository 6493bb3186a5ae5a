use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use validator::Validate;

use crate::dto::attendance_dto::{RegisterPayload, StatusResponse};
use crate::error::Result;
use crate::middleware::web_app::verify_web_app;
use crate::models::user::{Registration, User};
use crate::utils::time;
use crate::AppState;

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterPayload>,
) -> Result<Json<User>> {
    payload.validate()?;
    verify_web_app(&state.config, &headers, payload.user_id)?;
    let registration = Registration {
        user_id: payload.user_id,
        category: payload.category.parse()?,
        username: payload.username,
        full_name: payload.full_name,
        display_name: payload.display_name,
        phone: payload.phone,
    };
    let user = state
        .user_service
        .register(registration, time::now())
        .await?;
    Ok(Json(user))
}

#[axum::debug_handler]
pub async fn status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
) -> Result<Json<StatusResponse>> {
    verify_web_app(&state.config, &headers, user_id)?;
    let now = time::now();
    let today = state.session_service.today(now);
    let status = state.user_service.status_of(user_id).await?;
    let today_session = state.session_service.today_session(user_id, today).await?;
    Ok(Json(StatusResponse {
        user_id,
        status,
        today,
        elapsed_minutes: today_session.as_ref().and_then(|s| s.elapsed_minutes(now)),
        today_session,
    }))
}
