#![allow(dead_code)]

use std::sync::Arc;

use attendance_backend::{
    config::Config,
    database::memory::MemoryRepository,
    models::{
        user::{Category, Registration},
        work_session::Coordinates,
    },
    AppState,
};
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub const JWT_SECRET: &str = "test_secret_key";
pub const ADMIN_ID: i64 = 1;
pub const OFFICE_LAT: f64 = 55.7539;
pub const OFFICE_LON: f64 = 37.6208;

pub fn config() -> Config {
    Config {
        server_address: "127.0.0.1:0".to_string(),
        database_url: None,
        db_max_connections: 5,
        jwt_secret: JWT_SECRET.to_string(),
        admin_ids: vec![ADMIN_ID],
        office: Coordinates::new(OFFICE_LAT, OFFICE_LON).unwrap(),
        office_radius_meters: 100.0,
        utc_offset: FixedOffset::east_opt(3 * 3600).unwrap(),
        telegram_bot_token: None,
        admin_token_ttl_hours: 1,
    }
}

pub fn state_with(config: Config) -> AppState {
    let repo = Arc::new(MemoryRepository::new());
    AppState::new(config, repo.clone(), repo).unwrap()
}

pub fn state() -> AppState {
    state_with(config())
}

/// Instant on 2025-03-10 at the given UTC hour and minute.
pub fn utc(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap()
}

pub fn registration(user_id: i64, name: &str, category: Category) -> Registration {
    Registration {
        user_id,
        username: Some(name.to_lowercase()),
        full_name: Some(name.to_string()),
        display_name: None,
        phone: None,
        category,
    }
}

pub async fn approved_user(state: &AppState, user_id: i64, name: &str, category: Category) {
    let at = utc(0, 0);
    state
        .user_service
        .register(registration(user_id, name, category), at)
        .await
        .unwrap();
    state
        .user_service
        .approve(user_id, ADMIN_ID, at)
        .await
        .unwrap();
}

/// Telegram WebApp `initData` for `user_id`, signed with `bot_token`.
pub fn signed_init_data(user_id: i64, bot_token: &str) -> String {
    let user = serde_json::json!({ "id": user_id, "first_name": "Test" }).to_string();
    let auth_date = "1700000000";
    let data_check_string = format!("auth_date={}\nuser={}", auth_date, user);

    let mut secret = Hmac::<Sha256>::new_from_slice(b"WebAppData").unwrap();
    secret.update(bot_token.as_bytes());
    let key = secret.finalize().into_bytes();
    let mut mac = Hmac::<Sha256>::new_from_slice(&key).unwrap();
    mac.update(data_check_string.as_bytes());
    let hash = hex::encode(mac.finalize().into_bytes());

    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("user", &user)
        .append_pair("auth_date", auth_date)
        .append_pair("hash", &hash)
        .finish()
}
