//! Propagation jobs and per-target results.
//!
//! A job is the durable, trackable execution of a plan. Its status is
//! always derived from the full set of per-(type, target) results; it is
//! never maintained as a shared mutable counter, so concurrent workers
//! appending results cannot race the aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::plan::PropagationPlan;
use crate::models::propagation::PropagationType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    CompletedWithErrors,
    Failed,
}

impl JobStatus {
    /// Terminal statuses never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::CompletedWithErrors | JobStatus::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::CompletedWithErrors => "completed_with_errors",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "completed_with_errors" => Some(JobStatus::CompletedWithErrors),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// Terminal outcome of one (type, target) pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetOutcome {
    Success,
    Failed,
    Skipped,
}

impl TargetOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetOutcome::Success => "success",
            TargetOutcome::Failed => "failed",
            TargetOutcome::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(TargetOutcome::Success),
            "failed" => Some(TargetOutcome::Failed),
            "skipped" => Some(TargetOutcome::Skipped),
            _ => None,
        }
    }
}

/// Why a (type, target) pair did not succeed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transient storage failures exhausted the retry budget.
    TransientExhausted,
    /// Target tenant missing or deleted at execution time.
    TargetNotFound,
    /// The source snapshot for this type could not be read, so no apply
    /// was attempted against the target.
    SourceReadFailed,
    /// Snapshot failed structural validation against the target.
    ValidationFailed,
    /// Permanent storage failure on the first attempt.
    Storage,
    /// Pair was never dispatched because the job was cancelled or timed out.
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TransientExhausted => "transient_exhausted",
            ErrorKind::TargetNotFound => "target_not_found",
            ErrorKind::SourceReadFailed => "source_read_failed",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::Storage => "storage",
            ErrorKind::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "transient_exhausted" => Some(ErrorKind::TransientExhausted),
            "target_not_found" => Some(ErrorKind::TargetNotFound),
            "source_read_failed" => Some(ErrorKind::SourceReadFailed),
            "validation_failed" => Some(ErrorKind::ValidationFailed),
            "storage" => Some(ErrorKind::Storage),
            "cancelled" => Some(ErrorKind::Cancelled),
            _ => None,
        }
    }
}

/// One (job, type, target) outcome row. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropagationTargetResult {
    pub job_id: Uuid,
    pub target_tenant_id: Uuid,
    pub propagation_type: PropagationType,
    pub outcome: TargetOutcome,
    pub error_kind: Option<ErrorKind>,
    pub applied_at: DateTime<Utc>,
    pub attempt_count: u32,
}

/// The durable record of a submitted propagation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagationJob {
    pub id: Uuid,
    pub source_tenant_id: Uuid,
    pub types: Vec<PropagationType>,
    pub target_tenant_ids: Vec<Uuid>,
    pub requested_by: Uuid,
    /// Plan signature used for in-flight dedup.
    pub signature: String,
    pub status: JobStatus,
    /// Best-effort cancellation flag; dispatched work runs to completion.
    pub cancel_requested: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PropagationJob {
    /// Snapshot a plan into a fresh pending job.
    pub fn from_plan(plan: &PropagationPlan) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_tenant_id: plan.source_tenant_id,
            types: plan.types.clone(),
            target_tenant_ids: plan.target_tenant_ids.clone(),
            requested_by: plan.requested_by,
            signature: plan.signature.clone(),
            status: JobStatus::Pending,
            cancel_requested: false,
            created_at: plan.created_at,
            completed_at: None,
        }
    }
}

/// Derive the terminal status of a job from its full result set.
///
/// `completed` iff every result is a success, `failed` iff none is,
/// `completed_with_errors` otherwise.
pub fn derive_status(results: &[PropagationTargetResult]) -> JobStatus {
    let successes = results
        .iter()
        .filter(|r| r.outcome == TargetOutcome::Success)
        .count();
    if successes == results.len() && !results.is_empty() {
        JobStatus::Completed
    } else if successes == 0 {
        JobStatus::Failed
    } else {
        JobStatus::CompletedWithErrors
    }
}
