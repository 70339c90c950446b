//! Custom error types for the common library
//!
//! This module defines storage error types shared by every service in the
//! workspace, plus helpers that classify constraint violations reported by
//! PostgreSQL.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

impl DatabaseError {
    /// True when the failed statement hit a unique constraint
    pub fn is_unique_violation(&self) -> bool {
        self.database_error()
            .is_some_and(|db| db.is_unique_violation())
    }

    /// True when the failed statement referenced a missing parent row
    pub fn is_foreign_key_violation(&self) -> bool {
        self.database_error()
            .is_some_and(|db| db.is_foreign_key_violation())
    }

    fn database_error(&self) -> Option<&dyn sqlx::error::DatabaseError> {
        match self {
            DatabaseError::Connection(SqlxError::Database(db))
            | DatabaseError::Query(SqlxError::Database(db)) => Some(db.as_ref()),
            _ => None,
        }
    }
}

impl From<SqlxError> for DatabaseError {
    fn from(err: SqlxError) -> Self {
        DatabaseError::Query(err)
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_are_not_constraint_violations() {
        let err = DatabaseError::Query(SqlxError::RowNotFound);
        assert!(!err.is_unique_violation());
        assert!(!err.is_foreign_key_violation());

        let err = DatabaseError::Migration("checksum mismatch".to_string());
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn sqlx_errors_convert_to_query_errors() {
        let err: DatabaseError = SqlxError::PoolTimedOut.into();
        assert!(matches!(err, DatabaseError::Query(SqlxError::PoolTimedOut)));
        assert!(err.to_string().starts_with("Database query error"));
    }
}
