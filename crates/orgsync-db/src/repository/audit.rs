//! SurrealDB implementation of [`AuditLogRepository`].
//!
//! Strictly append-only: no update or delete statements exist here, and
//! the schema's unique (job, type, target) index rejects a second record
//! for the same pair.

use chrono::{DateTime, Utc};
use orgsync_core::error::OrgSyncResult;
use orgsync_core::models::audit::{CreateAuditRecord, PropagationAuditRecord};
use orgsync_core::models::job::{ErrorKind, TargetOutcome};
use orgsync_core::models::propagation::PropagationType;
use orgsync_core::repository::AuditLogRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AuditRow {
    record_id: String,
    job_id: String,
    target_tenant_id: String,
    propagation_type: String,
    outcome: String,
    error_kind: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl AuditRow {
    fn try_into_record(self) -> Result<PropagationAuditRecord, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid audit UUID: {e}")))?;
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

        Ok(PropagationAuditRecord {
            id,
            job_id,
            target_tenant_id,
            propagation_type,
            outcome,
            error_kind,
            recorded_at: self.recorded_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the append-only audit log.
#[derive(Clone)]
pub struct SurrealAuditLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AuditLogRepository for SurrealAuditLogRepository<C> {
    async fn append(&self, input: CreateAuditRecord) -> OrgSyncResult<PropagationAuditRecord> {
        let id = Uuid::new_v4();

        let result = self
            .db
            .query(
                "CREATE type::record('propagation_audit', $id) SET \
                 job_id = $job_id, \
                 target_tenant_id = $target_tenant_id, \
                 propagation_type = $propagation_type, \
                 outcome = $outcome, \
                 error_kind = $error_kind; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('propagation_audit', $id)",
            )
            .bind(("id", id.to_string()))
            .bind(("job_id", input.job_id.to_string()))
            .bind(("target_tenant_id", input.target_tenant_id.to_string()))
            .bind((
                "propagation_type",
                input.propagation_type.as_str().to_string(),
            ))
            .bind(("outcome", input.outcome.as_str().to_string()))
            .bind((
                "error_kind",
                input.error_kind.map(|k| k.as_str().to_string()),
            ))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(DbError::from)?;
        let rows: Vec<AuditRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "propagation_audit".into(),
            id: id.to_string(),
        })?;

        Ok(row.try_into_record()?)
    }

    async fn list_by_job(&self, job_id: Uuid) -> OrgSyncResult<Vec<PropagationAuditRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM propagation_audit \
                 WHERE job_id = $job_id ORDER BY recorded_at ASC",
            )
            .bind(("job_id", job_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AuditRow> = result.take(0).map_err(DbError::from)?;
        let records = rows
            .into_iter()
            .map(|r| r.try_into_record())
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(records)
    }

    async fn count_by_job(&self, job_id: Uuid) -> OrgSyncResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM propagation_audit \
                 WHERE job_id = $job_id GROUP ALL",
            )
            .bind(("job_id", job_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().next().map(|r| r.total).unwrap_or(0))
    }
}
