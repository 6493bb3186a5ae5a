use axum::{extract::State, http::HeaderMap, Json};
use chrono::Duration;

use crate::dto::admin_dto::AdminTokenResponse;
use crate::error::{Error, Result};
use crate::middleware::{auth::issue_admin_token, web_app::signed_user};
use crate::AppState;

/// Exchanges an admin's signed web-app `initData` for a bearer token
/// accepted under `/api/admin`.
#[axum::debug_handler]
pub async fn admin_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AdminTokenResponse>> {
    let bot_token = state
        .config
        .telegram_bot_token
        .as_deref()
        .ok_or_else(|| Error::Forbidden("web_app_auth_disabled".into()))?;
    let admin_id = signed_user(bot_token, &headers)?;
    if !state.config.is_admin(admin_id) {
        tracing::warn!(user_id = admin_id, "admin token requested by a non-admin");
        return Err(Error::Forbidden("forbidden".into()));
    }

    let valid_for = Duration::hours(state.config.admin_token_ttl_hours);
    let token = issue_admin_token(&state.config.jwt_secret, admin_id, valid_for)?;
    tracing::info!(admin_id, "admin token issued");
    Ok(Json(AdminTokenResponse {
        token,
        admin_id,
        expires_in_seconds: valid_for.num_seconds(),
    }))
}
