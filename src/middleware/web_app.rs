use axum::http::HeaderMap;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::utils::telegram_auth;

pub const INIT_DATA_HEADER: &str = "x-telegram-init-data";

/// User id carried by the request's signed Telegram `initData`.
pub fn signed_user(bot_token: &str, headers: &HeaderMap) -> Result<i64> {
    let init_data = headers
        .get(INIT_DATA_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Unauthorized("missing_init_data".into()))?;
    telegram_auth::verify_init_data(init_data, bot_token)
        .ok_or_else(|| Error::Unauthorized("invalid_init_data".into()))
}

/// With a bot token configured, the request must carry signed `initData`
/// for the same user it acts on. Without one the check is skipped.
pub fn verify_web_app(config: &Config, headers: &HeaderMap, user_id: i64) -> Result<()> {
    let Some(token) = config.telegram_bot_token.as_deref() else {
        return Ok(());
    };
    let signed = signed_user(token, headers)?;
    if signed != user_id {
        tracing::warn!(user_id, signed_user_id = signed, "init data user mismatch");
        return Err(Error::Forbidden("user_mismatch".into()));
    }
    Ok(())
}
