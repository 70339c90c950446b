//! Integration tests for the infrastructure components
//!
//! These tests verify that the PostgreSQL database is properly configured
//! and accessible. They are skipped when `DATABASE_URL` is not set.

use common::database::{DatabaseConfig, health_check, init_pool};
use common::error::DatabaseError;
use sqlx::Row;

/// Test that verifies PostgreSQL is accessible and can run basic queries
#[tokio::test]
async fn test_infrastructure_integration() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set, skipping");
        return Ok(());
    }

    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    assert!(health_check(&pool).await?, "Database health check failed");

    let row = sqlx::query("SELECT 1 as result").fetch_one(&pool).await?;
    let result: i32 = row.get("result");
    assert_eq!(result, 1, "PostgreSQL simple query test failed");

    Ok(())
}

/// Unique violations raised by PostgreSQL are classified as such
#[tokio::test]
async fn test_unique_violation_is_classified() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set, skipping");
        return Ok(());
    }

    let pool = init_pool(&DatabaseConfig::from_env()?).await?;
    let mut conn = pool.acquire().await?;

    sqlx::query("CREATE TEMPORARY TABLE uniq_probe (id INT PRIMARY KEY)")
        .execute(&mut *conn)
        .await?;
    sqlx::query("INSERT INTO uniq_probe (id) VALUES (1)")
        .execute(&mut *conn)
        .await?;

    let err: DatabaseError = sqlx::query("INSERT INTO uniq_probe (id) VALUES (1)")
        .execute(&mut *conn)
        .await
        .expect_err("duplicate key must fail")
        .into();

    assert!(err.is_unique_violation());
    assert!(!err.is_foreign_key_violation());

    Ok(())
}
