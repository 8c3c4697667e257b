//! Error types for the OrgSync system.

use thiserror::Error;

use crate::models::tier::SubscriptionTier;

#[derive(Debug, Error)]
pub enum OrgSyncError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Subscription tier upgrade required: {required}")]
    TierUpgradeRequired { required: SubscriptionTier },

    #[error("Propagation requires at least two eligible locations")]
    InsufficientLocations,

    #[error("Platform administrator privileges required")]
    AdminRequired,

    #[error("Owner or admin role on the source location required")]
    RoleInsufficient,

    #[error("No eligible target locations for this request")]
    NoEligibleTargets,

    #[error("Target location {tenant_id} is not an eligible sibling of the source")]
    TargetNotEligible { tenant_id: uuid::Uuid },

    #[error("An identical propagation job is already pending or running")]
    DuplicateJob { signature: String },

    #[error("Job {id} is already in terminal status {status}")]
    JobAlreadyTerminal { id: uuid::Uuid, status: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Transient storage failure (timeout, lock contention). Safe to retry.
    #[error("Storage temporarily unavailable: {0}")]
    StorageUnavailable(String),

    /// Permanent storage failure. Not retried.
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrgSyncError {
    /// Whether a failed operation may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, OrgSyncError::StorageUnavailable(_))
    }
}

pub type OrgSyncResult<T> = Result<T, OrgSyncError>;
