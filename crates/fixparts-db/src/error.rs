//! # Database Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← classifies constraint failures                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StorageError (fixparts-core) ← what the store traits return            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CoreError (managers) ← DuplicateConflict / NotFound / ...              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use fixparts_core::error::{Entity, StorageError};
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// No row matched an update or delete.
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: i64 },

    /// UNIQUE constraint violation.
    ///
    /// `constraint` is the column list SQLite reports, e.g. `items.barcode`
    /// or `compatibility.item_id, compatibility.submodel_id`.
    #[error("Unique constraint failed: {constraint}")]
    UniqueViolation { constraint: String },

    /// FOREIGN KEY constraint violation, on insert/update of a dangling
    /// reference or on delete of a still-referenced row.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database file could not be opened or the pool is closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Runtime SQL error, including CHECK constraint failures.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: Entity, id: i64) -> Self {
        DbError::NotFound { entity, id }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::PoolClosed     → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite reports:
                //   "UNIQUE constraint failed: <table>.<column>[, ...]"
                //   "FOREIGN KEY constraint failed"
                if let Some(constraint) = msg.split("UNIQUE constraint failed: ").nth(1) {
                    DbError::UniqueViolation {
                        constraint: constraint.trim().to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<DbError> for StorageError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => StorageError::NotFound { entity, id },
            DbError::UniqueViolation { constraint } => StorageError::UniqueViolation { constraint },
            DbError::ForeignKeyViolation { message } => {
                StorageError::ForeignKeyViolation { message }
            }
            other => StorageError::Backend(other.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_mapping() {
        let err: StorageError = DbError::UniqueViolation {
            constraint: "items.barcode".into(),
        }
        .into();
        assert!(err.violates("barcode"));
        assert!(!err.violates("part_number"));

        let err: StorageError = DbError::not_found(Entity::Sale, 4).into();
        assert!(matches!(
            err,
            StorageError::NotFound {
                entity: Entity::Sale,
                id: 4
            }
        ));

        let err: StorageError = DbError::PoolExhausted.into();
        assert!(matches!(err, StorageError::Backend(_)));
    }

    #[test]
    fn test_sqlx_pool_errors() {
        assert!(matches!(
            DbError::from(sqlx::Error::PoolTimedOut),
            DbError::PoolExhausted
        ));
        assert!(matches!(
            DbError::from(sqlx::Error::PoolClosed),
            DbError::ConnectionFailed(_)
        ));
    }
}
