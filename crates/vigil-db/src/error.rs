//! Database-specific error types and conversions.

use vigil_core::error::VigilError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record is immutable: {entity} with id {id}")]
    Immutable { entity: String, id: String },
}

impl From<DbError> for VigilError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => VigilError::NotFound { entity, id },
            DbError::Immutable { entity, id } => VigilError::Forbidden {
                reason: format!("{entity} {id} is immutable"),
            },
            other => VigilError::Database(other.to_string()),
        }
    }
}
