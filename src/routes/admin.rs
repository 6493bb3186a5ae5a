use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use validator::Validate;

use crate::dto::admin_dto::{CategoryPayload, ManualEntryPayload, UserListQuery};
use crate::error::Result;
use crate::middleware::auth::AdminClaims;
use crate::models::user::User;
use crate::models::work_session::{CheckInOutcome, CheckOutOutcome};
use crate::utils::time;
use crate::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<User>>> {
    let search = query.q.clone();
    let mut filter = query.into_filter()?;
    let users = match search.as_deref() {
        Some(text) => {
            filter.include_archived = true;
            let mut users = state.user_service.search(text).await?;
            users.retain(|u| filter.matches(u));
            users
        }
        None => state.user_service.list(filter).await?,
    };
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<User>> {
    Ok(Json(state.user_service.require(user_id).await?))
}

pub async fn approve_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminClaims>,
    Path(user_id): Path<i64>,
) -> Result<Json<User>> {
    let user = state
        .user_service
        .approve(user_id, admin.admin_id, time::now())
        .await?;
    Ok(Json(user))
}

pub async fn reject_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminClaims>,
    Path(user_id): Path<i64>,
) -> Result<Json<User>> {
    let user = state
        .user_service
        .reject(user_id, admin.admin_id, time::now())
        .await?;
    Ok(Json(user))
}

pub async fn archive_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminClaims>,
    Path(user_id): Path<i64>,
) -> Result<Json<User>> {
    let user = state
        .user_service
        .archive(user_id, admin.admin_id, time::now())
        .await?;
    Ok(Json(user))
}

pub async fn set_category(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminClaims>,
    Path(user_id): Path<i64>,
    Json(payload): Json<CategoryPayload>,
) -> Result<Json<User>> {
    let category = payload.category.parse()?;
    tracing::debug!(admin_id = admin.admin_id, user_id, "category change requested");
    Ok(Json(state.user_service.set_category(user_id, category).await?))
}

pub async fn manual_check_in(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminClaims>,
    Json(payload): Json<ManualEntryPayload>,
) -> Result<Json<CheckInOutcome>> {
    payload.validate()?;
    let at = payload.at.unwrap_or_else(time::now);
    tracing::info!(admin_id = admin.admin_id, user_id = payload.user_id, %at, "manual check-in");
    let outcome = state
        .session_service
        .manual_check_in(payload.user_id, at)
        .await?;
    Ok(Json(outcome))
}

pub async fn manual_check_out(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminClaims>,
    Json(payload): Json<ManualEntryPayload>,
) -> Result<Json<CheckOutOutcome>> {
    payload.validate()?;
    let at = payload.at.unwrap_or_else(time::now);
    tracing::info!(admin_id = admin.admin_id, user_id = payload.user_id, %at, "manual check-out");
    let outcome = state
        .session_service
        .manual_check_out(payload.user_id, at)
        .await?;
    Ok(Json(outcome))
}
