use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

/// Identity of the admin behind a request, available as an extension on
/// every route under `/api/admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminClaims {
    pub admin_id: i64,
}

pub async fn require_admin(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    match authorize(&state, &req) {
        Ok(admin) => {
            req.extensions_mut().insert(admin);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}

fn authorize(state: &AppState, req: &Request) -> Result<AdminClaims> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| Error::Unauthorized("missing_authorization".into()))?;
    let auth_str = auth_header
        .to_str()
        .map_err(|_| Error::Unauthorized("bad_authorization".into()))?;
    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| Error::Unauthorized("unsupported_scheme".into()))?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|_| Error::Unauthorized("invalid_token".into()))?;

    let role = data.claims.role.unwrap_or_default();
    if !role.eq_ignore_ascii_case("admin") {
        return Err(Error::Forbidden("forbidden".into()));
    }
    let admin_id: i64 = data
        .claims
        .sub
        .parse()
        .map_err(|_| Error::Unauthorized("invalid_subject".into()))?;
    if !state.config.is_admin(admin_id) {
        tracing::warn!(admin_id, "token subject is not a configured admin");
        return Err(Error::Forbidden("forbidden".into()));
    }
    Ok(AdminClaims { admin_id })
}

/// Issues an admin bearer token valid for `valid_for`.
pub fn issue_admin_token(secret: &str, admin_id: i64, valid_for: Duration) -> Result<String> {
    let exp = (Utc::now() + valid_for).timestamp();
    let claims = Claims {
        sub: admin_id.to_string(),
        exp: usize::try_from(exp).map_err(|_| Error::Internal("token expiry overflow".into()))?,
        role: Some("admin".to_string()),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("failed to sign token: {}", e)))
}
