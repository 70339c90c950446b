use anyhow::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use common::database::{DatabaseConfig, health_check, init_pool};
use stokvel_api::{
    AppState,
    config::ServerConfig,
    middleware::{JwtConfig, JwtVerifier},
    migrate, routes,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting stokvel API service");

    let server_config = ServerConfig::load()?;
    let jwt_config = JwtConfig::from_env().map_err(anyhow::Error::msg)?;
    let jwt = JwtVerifier::new(&jwt_config)?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    migrate(&pool).await?;
    info!("Database migrations applied");

    let address = server_config.bind_address();
    let app = routes::create_router(AppState::new(pool, server_config, jwt));

    let listener = TcpListener::bind(&address).await?;
    info!("Stokvel API listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
