//! Database-specific error types and conversions.

use orgsync_core::error::OrgSyncError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Duplicate active job for signature {signature}")]
    DuplicateJob { signature: String },

    #[error("Invalid stored value: {0}")]
    Corrupt(String),
}

/// Whether a SurrealDB failure is worth retrying: connection-level
/// timeouts and transaction conflicts clear on their own, anything else
/// is treated as permanent.
fn is_transient_surreal(e: &surrealdb::Error) -> bool {
    let message = e.to_string().to_ascii_lowercase();
    message.contains("timed out")
        || message.contains("timeout")
        || message.contains("retry")
        || message.contains("conflict")
}

impl From<DbError> for OrgSyncError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => OrgSyncError::NotFound { entity, id },
            DbError::DuplicateJob { signature } => OrgSyncError::DuplicateJob { signature },
            DbError::Surreal(e) if is_transient_surreal(&e) => {
                OrgSyncError::StorageUnavailable(e.to_string())
            }
            other => OrgSyncError::Database(other.to_string()),
        }
    }
}
