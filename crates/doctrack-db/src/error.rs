//! Database-specific error types and conversions.

use doctrack_core::error::DocTrackError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Malformed row: {0}")]
    InvalidRow(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique constraint violated on {entity}")]
    Conflict { entity: String },

    #[error("Balance would go negative")]
    InsufficientBalance,

    #[error("Password hashing failed: {0}")]
    Hash(String),
}

impl DbError {
    /// Classify a statement error returned by `Response::check`.
    ///
    /// Unique index violations surface as "already contains" errors.
    pub(crate) fn from_statement(entity: &str, err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if message.contains("already contains") {
            DbError::Conflict {
                entity: entity.to_owned(),
            }
        } else {
            DbError::Query(message)
        }
    }

    pub(crate) fn not_found(entity: &str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.to_owned(),
            id: id.to_string(),
        }
    }
}

impl From<DbError> for DocTrackError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => DocTrackError::NotFound { entity, id },
            DbError::Conflict { entity } => DocTrackError::AlreadyExists { entity },
            DbError::InsufficientBalance => DocTrackError::InsufficientCredits,
            DbError::Hash(msg) => DocTrackError::Crypto(msg),
            other => DocTrackError::Database(other.to_string()),
        }
    }
}
