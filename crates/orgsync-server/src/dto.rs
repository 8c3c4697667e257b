//! Request and response payloads.

use chrono::{DateTime, Utc};
use orgsync_core::error::{OrgSyncError, OrgSyncResult};
use orgsync_core::models::job::{PropagationJob, PropagationTargetResult};
use orgsync_core::models::plan::TargetSelector;
use orgsync_core::models::propagation::PropagationType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /propagation/jobs`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobRequest {
    pub source_tenant_id: Uuid,
    pub types: Vec<String>,
    pub targets: TargetsDto,
}

/// Either the keyword `"all"` or an explicit list of tenant ids.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TargetsDto {
    Keyword(String),
    Explicit(Vec<Uuid>),
}

impl SubmitJobRequest {
    pub fn propagation_types(&self) -> OrgSyncResult<Vec<PropagationType>> {
        self.types
            .iter()
            .map(|s| {
                PropagationType::parse(s).ok_or_else(|| OrgSyncError::Validation {
                    message: format!("unknown propagation type: {s}"),
                })
            })
            .collect()
    }

    pub fn selector(&self) -> OrgSyncResult<TargetSelector> {
        match &self.targets {
            TargetsDto::Keyword(k) if k == "all" => Ok(TargetSelector::All),
            TargetsDto::Keyword(k) => Err(OrgSyncError::Validation {
                message: format!("targets must be \"all\" or a list of tenant ids, got \"{k}\""),
            }),
            TargetsDto::Explicit(ids) => Ok(TargetSelector::Explicit(ids.clone())),
        }
    }
}

/// A propagation job as returned by every route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDto {
    pub job_id: Uuid,
    pub status: String,
    pub source_tenant_id: Uuid,
    pub types: Vec<String>,
    pub target_tenant_ids: Vec<Uuid>,
    pub requested_by: Uuid,
    pub cancel_requested: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<PropagationJob> for JobDto {
    fn from(job: PropagationJob) -> Self {
        Self {
            job_id: job.id,
            status: job.status.as_str().into(),
            source_tenant_id: job.source_tenant_id,
            types: job.types.iter().map(|t| t.as_str().into()).collect(),
            target_tenant_ids: job.target_tenant_ids,
            requested_by: job.requested_by,
            cancel_requested: job.cancel_requested,
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

/// One (type, target) outcome row.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetResultDto {
    pub target_tenant_id: Uuid,
    pub propagation_type: String,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub attempt_count: u32,
}

impl From<PropagationTargetResult> for TargetResultDto {
    fn from(result: PropagationTargetResult) -> Self {
        Self {
            target_tenant_id: result.target_tenant_id,
            propagation_type: result.propagation_type.as_str().into(),
            outcome: result.outcome.as_str().into(),
            error_kind: result.error_kind.map(|k| k.as_str().into()),
            applied_at: result.applied_at,
            attempt_count: result.attempt_count,
        }
    }
}

/// Body of `GET /propagation/jobs/{id}`.
#[derive(Debug, Serialize)]
pub struct JobDetailDto {
    #[serde(flatten)]
    pub job: JobDto,
    pub results: Vec<TargetResultDto>,
}
