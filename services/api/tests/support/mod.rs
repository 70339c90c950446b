//! Shared setup for database-backed tests

use common::database::{DatabaseConfig, init_pool};
use sqlx::PgPool;

/// Migrated pool, or `None` when `DATABASE_URL` is not set
pub async fn pool() -> Result<Option<PgPool>, Box<dyn std::error::Error>> {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set, skipping");
        return Ok(None);
    }

    let pool = init_pool(&DatabaseConfig::from_env()?).await?;
    stokvel_api::migrate(&pool).await?;
    Ok(Some(pool))
}
