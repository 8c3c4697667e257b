//! Audit trail domain model.
//!
//! One record per (job, target, type) terminal outcome — never for
//! intermediate retry attempts — so a completed job's audit row count
//! always equals the plan's types × targets cardinality.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::{ErrorKind, TargetOutcome};
use crate::models::propagation::PropagationType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagationAuditRecord {
    pub id: Uuid,
    pub job_id: Uuid,
    pub target_tenant_id: Uuid,
    pub propagation_type: PropagationType,
    pub outcome: TargetOutcome,
    pub error_kind: Option<ErrorKind>,
    pub recorded_at: DateTime<Utc>,
}

/// Fields for appending a new audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditRecord {
    pub job_id: Uuid,
    pub target_tenant_id: Uuid,
    pub propagation_type: PropagationType,
    pub outcome: TargetOutcome,
    pub error_kind: Option<ErrorKind>,
}
