//! SurrealDB implementation of [`JobRepository`].
//!
//! Jobs are one row each; per-target results are append-only rows in
//! their own table keyed by the (job, type, target) triple, so many
//! workers can report concurrently without a shared mutable aggregate.

use chrono::{DateTime, Utc};
use orgsync_core::error::{OrgSyncError, OrgSyncResult};
use orgsync_core::models::job::{
    ErrorKind, JobStatus, PropagationJob, PropagationTargetResult, TargetOutcome,
};
use orgsync_core::models::plan::PropagationPlan;
use orgsync_core::models::propagation::PropagationType;
use orgsync_core::repository::JobRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Sentinel thrown inside the create transaction when an identical plan
/// is still in flight.
const DUPLICATE_SENTINEL: &str = "duplicate_active_job";

#[derive(Debug, SurrealValue)]
struct JobRow {
    source_tenant_id: String,
    types: Vec<String>,
    target_tenant_ids: Vec<String>,
    requested_by: String,
    signature: String,
    status: String,
    cancel_requested: bool,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl JobRow {
    fn into_job(self, id: Uuid) -> Result<PropagationJob, DbError> {
        let source_tenant_id = Uuid::parse_str(&self.source_tenant_id)
            .map_err(|e| DbError::Corrupt(format!("invalid source UUID: {e}")))?;
        let requested_by = Uuid::parse_str(&self.requested_by)
            .map_err(|e| DbError::Corrupt(format!("invalid actor UUID: {e}")))?;
        let types = self
            .types
            .iter()
            .map(|s| {
                PropagationType::parse(s)
                    .ok_or_else(|| DbError::Corrupt(format!("unknown propagation type: {s}")))
            })
            .collect::<Result<Vec<_>, DbError>>()?;
        let target_tenant_ids = self
            .target_tenant_ids
            .iter()
            .map(|s| {
                Uuid::parse_str(s)
                    .map_err(|e| DbError::Corrupt(format!("invalid target UUID: {e}")))
            })
            .collect::<Result<Vec<_>, DbError>>()?;
        let status = JobStatus::parse(&self.status)
            .ok_or_else(|| DbError::Corrupt(format!("unknown job status: {}", self.status)))?;

        Ok(PropagationJob {
            id,
            source_tenant_id,
            types,
            target_tenant_ids,
            requested_by,
            signature: self.signature,
            status,
            cancel_requested: self.cancel_requested,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct ResultRow {
    job_id: String,
    target_tenant_id: String,
    propagation_type: String,
    outcome: String,
    error_kind: Option<String>,
    applied_at: DateTime<Utc>,
    attempt_count: u32,
}

impl ResultRow {
    fn try_into_result(self) -> Result<PropagationTargetResult, DbError> {
        let job_id = Uuid::parse_str(&self.job_id)
            .map_err(|e| DbError::Corrupt(format!("invalid job UUID: {e}")))?;
        let target_tenant_id = Uuid::parse_str(&self.target_tenant_id)
            .map_err(|e| DbError::Corrupt(format!("invalid target UUID: {e}")))?;
        let propagation_type = PropagationType::parse(&self.propagation_type).ok_or_else(|| {
            DbError::Corrupt(format!(
                "unknown propagation type: {}",
                self.propagation_type
            ))
        })?;
        let outcome = TargetOutcome::parse(&self.outcome)
            .ok_or_else(|| DbError::Corrupt(format!("unknown outcome: {}", self.outcome)))?;
        let error_kind = self
            .error_kind
            .map(|s| {
                ErrorKind::parse(&s)
                    .ok_or_else(|| DbError::Corrupt(format!("unknown error kind: {s}")))
            })
            .transpose()?;

        Ok(PropagationTargetResult {
            job_id,
            target_tenant_id,
            propagation_type,
            outcome,
            error_kind,
            applied_at: self.applied_at,
            attempt_count: self.attempt_count,
        })
    }
}

/// SurrealDB implementation of the job store.
#[derive(Clone)]
pub struct SurrealJobRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealJobRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, id: Uuid) -> OrgSyncResult<PropagationJob> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('propagation_job', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<JobRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "propagation_job".into(),
            id: id_str,
        })?;

        Ok(row.into_job(id)?)
    }
}

impl<C: Connection> JobRepository for SurrealJobRepository<C> {
    async fn create(&self, plan: &PropagationPlan) -> OrgSyncResult<PropagationJob> {
        let id = Uuid::new_v4();
        let types: Vec<String> = plan.types.iter().map(|t| t.as_str().to_string()).collect();
        let targets: Vec<String> = plan
            .target_tenant_ids
            .iter()
            .map(|t| t.to_string())
            .collect();

        // Dedup check and insert in one transaction: a THROW aborts the
        // CREATE, so two concurrent identical submissions cannot both
        // land while one is active.
        let outcome = self
            .db
            .query(format!(
                "BEGIN TRANSACTION; \
                 LET $dup = (SELECT signature FROM propagation_job \
                 WHERE signature = $signature \
                 AND status IN ['pending', 'running']); \
                 IF array::len($dup) > 0 {{ THROW '{DUPLICATE_SENTINEL}' }}; \
                 CREATE type::record('propagation_job', $id) SET \
                 source_tenant_id = $source, types = $types, \
                 target_tenant_ids = $targets, requested_by = $requested_by, \
                 signature = $signature, status = 'pending', \
                 cancel_requested = false, created_at = $created_at; \
                 COMMIT TRANSACTION;"
            ))
            .bind(("id", id.to_string()))
            .bind(("source", plan.source_tenant_id.to_string()))
            .bind(("types", types))
            .bind(("targets", targets))
            .bind(("requested_by", plan.requested_by.to_string()))
            .bind(("signature", plan.signature.clone()))
            .bind(("created_at", plan.created_at))
            .await;

        let duplicate = |e: &surrealdb::Error| {
            e.to_string().contains(DUPLICATE_SENTINEL).then(|| DbError::DuplicateJob {
                signature: plan.signature.clone(),
            })
        };

        let mut result = match outcome {
            Ok(result) => result,
            Err(e) => return Err(duplicate(&e).unwrap_or_else(|| DbError::from(e)).into()),
        };

        // A THROW aborts the whole transaction and every other statement
        // then reports a generic failed-transaction error, so the
        // sentinel must be looked for across all per-statement errors,
        // not just the first one `check()` would surface.
        let mut first: Option<(usize, surrealdb::Error)> = None;
        for (index, e) in result.take_errors() {
            if let Some(dup) = duplicate(&e) {
                return Err(dup.into());
            }
            if first.as_ref().is_none_or(|(i, _)| index < *i) {
                first = Some((index, e));
            }
        }
        if let Some((_, e)) = first {
            return Err(DbError::from(e).into());
        }

        self.fetch(id).await
    }

    async fn get(&self, id: Uuid) -> OrgSyncResult<PropagationJob> {
        self.fetch(id).await
    }

    async fn mark_running(&self, id: Uuid) -> OrgSyncResult<()> {
        self.db
            .query(
                "UPDATE type::record('propagation_job', $id) \
                 SET status = 'running' WHERE status = 'pending'",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn append_result(&self, result: &PropagationTargetResult) -> OrgSyncResult<()> {
        self.db
            .query(
                "CREATE propagation_result SET \
                 job_id = $job_id, \
                 target_tenant_id = $target_tenant_id, \
                 propagation_type = $propagation_type, \
                 outcome = $outcome, \
                 error_kind = $error_kind, \
                 applied_at = $applied_at, \
                 attempt_count = $attempt_count",
            )
            .bind(("job_id", result.job_id.to_string()))
            .bind(("target_tenant_id", result.target_tenant_id.to_string()))
            .bind((
                "propagation_type",
                result.propagation_type.as_str().to_string(),
            ))
            .bind(("outcome", result.outcome.as_str().to_string()))
            .bind((
                "error_kind",
                result.error_kind.map(|k| k.as_str().to_string()),
            ))
            .bind(("applied_at", result.applied_at))
            .bind(("attempt_count", result.attempt_count))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn list_results(&self, job_id: Uuid) -> OrgSyncResult<Vec<PropagationTargetResult>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM propagation_result WHERE job_id = $job_id \
                 ORDER BY applied_at ASC",
            )
            .bind(("job_id", job_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResultRow> = result.take(0).map_err(DbError::from)?;
        let results = rows
            .into_iter()
            .map(|r| r.try_into_result())
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(results)
    }

    async fn request_cancel(&self, id: Uuid) -> OrgSyncResult<PropagationJob> {
        self.db
            .query(
                "UPDATE type::record('propagation_job', $id) \
                 SET cancel_requested = true \
                 WHERE status IN ['pending', 'running']",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;
        self.fetch(id).await
    }

    async fn finalize(&self, id: Uuid, status: JobStatus) -> OrgSyncResult<PropagationJob> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('propagation_job', $id) SET \
                 status = $status, completed_at = time::now() \
                 WHERE status IN ['pending', 'running']",
            )
            .bind(("id", id.to_string()))
            .bind(("status", status.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<JobRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(row.into_job(id)?),
            None => {
                // Nothing matched: either the job is unknown or it is
                // already terminal. Terminal statuses are never
                // overwritten.
                let existing = self.fetch(id).await?;
                Err(OrgSyncError::JobAlreadyTerminal {
                    id,
                    status: existing.status.as_str().to_string(),
                })
            }
        }
    }
}
