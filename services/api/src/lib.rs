//! Stokvel API service
//!
//! REST service for savings groups: membership and roles, a contribution
//! ledger with verification and an audit trail, monthly aggregates, and
//! service jobs whose payments move through escrow.

use common::error::{DatabaseError, DatabaseResult};
use sqlx::PgPool;

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod notifications;
pub mod payments;
pub mod repositories;
pub mod routes;
pub mod state;
pub mod validation;

pub use state::AppState;

/// Apply pending schema migrations
pub async fn migrate(pool: &PgPool) -> DatabaseResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))
}
