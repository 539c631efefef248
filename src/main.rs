use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use timelock_vault::api;
use timelock_vault::database::VaultDatabase;
use timelock_vault::log::init_logging;
use timelock_vault::monitoring::init_monitoring;
use timelock_vault::sweep::UnlockPoller;
use timelock_vault::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging()?;
    init_monitoring()?;

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let server_addr: SocketAddr = env::var("SERVER_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()
        .expect("Invalid SERVER_ADDR format");

    let poll_interval_ms = env::var("UNLOCK_POLL_INTERVAL_MS")
        .unwrap_or_else(|_| "30000".to_string())
        .parse::<u64>()
        .unwrap_or(30_000);

    let poll_enabled = env::var("UNLOCK_POLL_ENABLED")
        .map(|v| v != "false" && v != "0")
        .unwrap_or(true);

    let run_migrations = env::var("RUN_MIGRATIONS")
        .map(|v| v != "false" && v != "0")
        .unwrap_or(true);

    info!("Starting TimeLock Vault server");
    info!("Server address: {}", server_addr);
    info!(
        "Unlock poll interval: {}ms (enabled: {})",
        poll_interval_ms, poll_enabled
    );

    let db = VaultDatabase::new(&database_url)
        .await
        .expect("Failed to connect to database");
    info!("Connected to database");

    if run_migrations {
        Migrator::up(db.connection(), None)
            .await
            .expect("Failed to run database migrations");
        info!("Database migrations applied");
    }

    let state = Arc::new(AppState::new(db));

    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let app = api::router(Arc::clone(&state)).layer(cors);

    if poll_enabled {
        UnlockPoller::new(server_addr, Duration::from_millis(poll_interval_ms)).spawn();
    }

    let listener = tokio::net::TcpListener::bind(server_addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
