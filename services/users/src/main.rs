use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use users::{
    config::{Settings, StorageBackend},
    jwt::JwtService,
    rate_limiter::RateLimiter,
    repositories::{InMemoryUserStore, PgUserStore, UserStore},
    routes,
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting users service");

    let settings = Settings::load()?;

    let store = init_store(&settings).await?;
    let jwt_service = JwtService::new(&settings.jwt)?;
    let rate_limiter = RateLimiter::new(settings.login_throttle.clone());

    let app_state = AppState::new(store, jwt_service, rate_limiter);

    if let Some(admin) = &settings.bootstrap_admin {
        if app_state.users.ensure_admin(admin).await? {
            info!("Created bootstrap administrator {}", admin.username);
        }
    }

    info!("Users service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let address = settings.server.address();
    let listener = TcpListener::bind(&address).await?;
    info!("Users service listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Users service stopped");
    Ok(())
}

async fn init_store(settings: &Settings) -> Result<Arc<dyn UserStore>> {
    match settings.storage {
        StorageBackend::Postgres => {
            let pool = common::init_pool(&settings.database).await?;

            // Check database connectivity
            if common::health_check(&pool).await? {
                info!("Database connection successful");
            } else {
                anyhow::bail!("Failed to connect to database");
            }

            let store = PgUserStore::new(pool);
            store.migrate().await?;
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory user store; data is lost on shutdown");
            Ok(Arc::new(InMemoryUserStore::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
