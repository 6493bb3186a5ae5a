pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::database::repository::{SessionRepository, UserRepository};
use crate::services::{
    report_service::ReportService, session_service::SessionService, user_service::UserService,
};
use crate::utils::geo::GeoFence;

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub user_service: UserService,
    pub session_service: SessionService,
    pub report_service: ReportService,
}

impl AppState {
    pub fn new(
        config: Config,
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
    ) -> error::Result<Self> {
        let fence = GeoFence::new(config.office, config.office_radius_meters)?;
        let user_service = UserService::new(users);
        let session_service = SessionService::new(
            sessions.clone(),
            user_service.clone(),
            fence,
            config.utc_offset,
        );
        let report_service = ReportService::new(sessions);

        Ok(Self {
            config: Arc::new(config),
            user_service,
            session_service,
            report_service,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let public_api = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/location", post(routes::attendance::post_location))
        .route("/api/stats", get(routes::attendance::get_stats))
        .route(
            "/api/reports/export",
            get(routes::attendance::export_own_report),
        )
        .route("/api/auth/admin-token", post(routes::auth::admin_token))
        .route("/api/users/register", post(routes::users::register))
        .route("/api/users/:id/status", get(routes::users::status));

    let admin_api = Router::new()
        .route("/api/admin/users", get(routes::admin::list_users))
        .route("/api/admin/users/:id", get(routes::admin::get_user))
        .route("/api/admin/users/:id/approve", post(routes::admin::approve_user))
        .route("/api/admin/users/:id/reject", post(routes::admin::reject_user))
        .route("/api/admin/users/:id/archive", post(routes::admin::archive_user))
        .route("/api/admin/users/:id/category", post(routes::admin::set_category))
        .route(
            "/api/admin/sessions/check-in",
            post(routes::admin::manual_check_in),
        )
        .route(
            "/api/admin/sessions/check-out",
            post(routes::admin::manual_check_out),
        )
        .route(
            "/api/admin/reports/company",
            get(routes::reports::company_report),
        )
        .route(
            "/api/admin/reports/users/:id",
            get(routes::reports::user_report),
        )
        .route(
            "/api/admin/reports/export",
            get(routes::reports::export_report),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_admin,
        ));

    public_api
        .merge(admin_api)
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
