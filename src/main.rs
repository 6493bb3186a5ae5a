use std::net::SocketAddr;
use std::sync::Arc;

use attendance_backend::{
    build_router,
    config::Config,
    database::{
        memory::MemoryRepository,
        pool::{create_pool, run_migrations},
        postgres::PgRepository,
        repository::{SessionRepository, UserRepository},
    },
    AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    let (users, sessions): (Arc<dyn UserRepository>, Arc<dyn SessionRepository>) =
        match config.database_url.clone() {
            Some(url) => {
                let pool = create_pool(&config, &url).await?;
                run_migrations(&pool).await?;
                info!("Connected to PostgreSQL, migrations applied");
                let repo = Arc::new(PgRepository::new(pool));
                (repo.clone() as Arc<dyn UserRepository>, repo as Arc<dyn SessionRepository>)
            }
            None => {
                tracing::warn!("DATABASE_URL is not set, using in-memory storage; data is lost on restart");
                let repo = Arc::new(MemoryRepository::new());
                (repo.clone() as Arc<dyn UserRepository>, repo as Arc<dyn SessionRepository>)
            }
        };

    info!(
        latitude = config.office.latitude,
        longitude = config.office.longitude,
        radius_meters = config.office_radius_meters,
        utc_offset = %config.utc_offset,
        admins = config.admin_ids.len(),
        "Office geofence configured"
    );

    let addr: SocketAddr = config.server_address.parse()?;
    let app = build_router(AppState::new(config, users, sessions)?);

    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
