use crate::error::{Error, Result};
use crate::models::work_session::Coordinates;
use chrono::FixedOffset;
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub admin_ids: Vec<i64>,
    pub office: Coordinates,
    pub office_radius_meters: f64,
    pub utc_offset: FixedOffset,
    pub telegram_bot_token: Option<String>,
    pub admin_token_ttl_hours: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let office = Coordinates::new(
            get_env_parse_or("OFFICE_LATITUDE", 55.7539)?,
            get_env_parse_or("OFFICE_LONGITUDE", 37.6208)?,
        )
        .map_err(|e| Error::Config(format!("Invalid office location: {}", e)))?;

        let radius: f64 = get_env_parse_or("OFFICE_RADIUS", 100.0)?;
        if !radius.is_finite() || radius < 0.0 {
            return Err(Error::Config(format!(
                "Invalid value for OFFICE_RADIUS: {}",
                radius
            )));
        }

        let offset_minutes: i32 = get_env_parse_or("UTC_OFFSET_MINUTES", 180)?;
        let utc_offset = FixedOffset::east_opt(offset_minutes * 60).ok_or_else(|| {
            Error::Config(format!(
                "Invalid value for UTC_OFFSET_MINUTES: {}",
                offset_minutes
            ))
        })?;

        Ok(Self {
            server_address: env::var("SERVER_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            database_url: get_env_opt("DATABASE_URL"),
            db_max_connections: get_env_parse_or("DB_MAX_CONNECTIONS", 20)?,
            jwt_secret: get_env("JWT_SECRET")?,
            admin_ids: parse_admin_ids(&get_env("ADMIN_IDS")?)?,
            office,
            office_radius_meters: radius,
            utc_offset,
            telegram_bot_token: get_env_opt("TELEGRAM_BOT_TOKEN"),
            admin_token_ttl_hours: get_env_parse_or("ADMIN_TOKEN_TTL_HOURS", 12)?,
        })
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(default),
    }
}

fn parse_admin_ids(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|e| Error::Config(format!("Invalid admin id '{}': {}", s, e)))
        })
        .collect()
}
