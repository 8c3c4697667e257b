//! Job execution — snapshot capture, bounded fan-out, per-target retry,
//! and terminal status derivation.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use orgsync_core::error::{OrgSyncError, OrgSyncResult};
use orgsync_core::models::audit::CreateAuditRecord;
use orgsync_core::models::job::{
    ErrorKind, PropagationJob, PropagationTargetResult, TargetOutcome, derive_status,
};
use orgsync_core::models::propagation::PropagationType;
use orgsync_core::models::snapshot::ConfigSnapshot;
use orgsync_core::models::tenant::TenantStatus;
use orgsync_core::repository::{
    AuditLogRepository, ConfigGateway, DirectoryRepository, JobRepository,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cancel::CancelRegistry;
use crate::config::EngineConfig;

/// Outcome of one (type, target) apply, before persistence.
struct PairOutcome {
    outcome: TargetOutcome,
    error_kind: Option<ErrorKind>,
    attempt_count: u32,
}

impl PairOutcome {
    fn success(attempts: u32) -> Self {
        Self {
            outcome: TargetOutcome::Success,
            error_kind: None,
            attempt_count: attempts,
        }
    }

    fn failed(kind: ErrorKind, attempts: u32) -> Self {
        Self {
            outcome: TargetOutcome::Failed,
            error_kind: Some(kind),
            attempt_count: attempts,
        }
    }

    fn skipped() -> Self {
        Self {
            outcome: TargetOutcome::Skipped,
            error_kind: Some(ErrorKind::Cancelled),
            attempt_count: 0,
        }
    }
}

/// Runs propagation jobs against the configuration gateway.
pub struct PropagationExecutor<G, D, J, A> {
    gateway: Arc<G>,
    directory: Arc<D>,
    jobs: Arc<J>,
    audit: Arc<A>,
    cancels: Arc<CancelRegistry>,
    config: EngineConfig,
}

impl<G, D, J, A> PropagationExecutor<G, D, J, A>
where
    G: ConfigGateway,
    D: DirectoryRepository,
    J: JobRepository,
    A: AuditLogRepository,
{
    pub fn new(
        gateway: Arc<G>,
        directory: Arc<D>,
        jobs: Arc<J>,
        audit: Arc<A>,
        cancels: Arc<CancelRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            gateway,
            directory,
            jobs,
            audit,
            cancels,
            config,
        }
    }

    /// Run a pending job to its terminal status.
    ///
    /// Every (type, target) pair of the plan produces exactly one result
    /// row and one audit record. Pairs whose dispatch is pre-empted by
    /// cancellation or the job timeout are recorded as skipped; pairs
    /// already in flight run to completion.
    pub async fn run(&self, job: &PropagationJob) -> OrgSyncResult<PropagationJob> {
        info!(
            job_id = %job.id,
            source = %job.source_tenant_id,
            types = job.types.len(),
            targets = job.target_tenant_ids.len(),
            "Starting propagation job"
        );
        self.jobs.mark_running(job.id).await?;

        let token = self.cancels.register(job.id);
        // A cancel landing between submission and token registration is
        // only visible in the store; re-read the row rather than trusting
        // the snapshot captured at submit time. Any cancel persisted
        // after this read finds the registered token instead.
        let current = self.jobs.get(job.id).await?;
        if current.cancel_requested {
            token.cancel();
        }

        // Job timeout shares the cancellation path: the watchdog fires
        // the token and un-dispatched pairs land as skipped.
        let watchdog = tokio::spawn({
            let token = token.clone();
            let budget = self.config.job_timeout;
            async move {
                tokio::time::sleep(budget).await;
                token.cancel();
            }
        });

        // One snapshot per type, captured before fan-out begins. This is
        // the only serialization point: all targets in one job receive a
        // consistent view even if the source changes mid-run.
        let snapshots = self.read_snapshots(job).await;

        let pairs: Vec<(PropagationType, Uuid)> = job
            .types
            .iter()
            .flat_map(|ty| job.target_tenant_ids.iter().map(|t| (*ty, *t)))
            .collect();

        let mut results = stream::iter(pairs)
            .map(|(ty, target)| {
                let token = token.clone();
                let snapshot = snapshots.get(&ty);
                async move {
                    // Observed cancellation stops dispatch; in-flight
                    // applies are never aborted mid-transaction.
                    let pair = if token.is_cancelled() {
                        PairOutcome::skipped()
                    } else {
                        self.apply_one(ty, target, snapshot).await
                    };
                    self.record(job.id, ty, target, pair).await
                }
            })
            .buffer_unordered(self.config.max_concurrency);

        while let Some(recorded) = results.next().await {
            if let Err(e) = recorded {
                // A result row that cannot be persisted is lost to the
                // aggregate; surface it loudly rather than silently.
                warn!(job_id = %job.id, error = %e, "Failed to persist target result");
            }
        }
        drop(results);
        watchdog.abort();

        let all_results = self.jobs.list_results(job.id).await?;
        let status = derive_status(&all_results);
        let finalized = self.jobs.finalize(job.id, status).await?;
        self.cancels.remove(job.id);

        info!(
            job_id = %job.id,
            status = status.as_str(),
            results = all_results.len(),
            "Propagation job finished"
        );
        Ok(finalized)
    }

    /// Read the source snapshot for every requested type.
    ///
    /// A type whose read or validation fails is carried as an error; its
    /// pairs are recorded failed without dispatching any apply.
    async fn read_snapshots(
        &self,
        job: &PropagationJob,
    ) -> HashMap<PropagationType, Result<ConfigSnapshot, ErrorKind>> {
        let mut snapshots = HashMap::new();
        for ty in &job.types {
            let read = self
                .gateway
                .read_snapshot(job.source_tenant_id, *ty)
                .await
                .map_err(|e| {
                    warn!(job_id = %job.id, ty = %ty, error = %e, "Snapshot read failed");
                    ErrorKind::SourceReadFailed
                })
                .and_then(|snapshot| match snapshot.validate() {
                    Ok(()) => Ok(snapshot),
                    Err(e) => {
                        warn!(job_id = %job.id, ty = %ty, error = %e, "Snapshot invalid");
                        Err(ErrorKind::ValidationFailed)
                    }
                });
            snapshots.insert(*ty, read);
        }
        snapshots
    }

    /// Apply one type's snapshot to one target, with transient retry.
    async fn apply_one(
        &self,
        ty: PropagationType,
        target: Uuid,
        snapshot: Option<&Result<ConfigSnapshot, ErrorKind>>,
    ) -> PairOutcome {
        let snapshot = match snapshot {
            Some(Ok(snapshot)) => snapshot,
            Some(Err(kind)) => return PairOutcome::failed(*kind, 0),
            // Unreachable by construction: every job type has a snapshot
            // entry.
            None => return PairOutcome::failed(ErrorKind::Storage, 0),
        };

        // A target deleted between plan and execution is a permanent
        // failure; nothing to retry.
        match self.directory.get_tenant(target).await {
            Ok(tenant) if tenant.status == TenantStatus::Active => {}
            Ok(_) | Err(OrgSyncError::NotFound { .. }) => {
                return PairOutcome::failed(ErrorKind::TargetNotFound, 1);
            }
            Err(e) if e.is_transient() => {
                // Fall through to the apply loop; the target check will
                // fail there again if the store stays unavailable.
            }
            Err(_) => return PairOutcome::failed(ErrorKind::Storage, 1),
        }

        let mut backoff = self.config.initial_backoff;
        for attempt in 1..=self.config.max_apply_attempts {
            match self.gateway.apply_snapshot(target, snapshot).await {
                Ok(()) => {
                    debug!(target = %target, ty = %ty, attempt, "Applied snapshot");
                    return PairOutcome::success(attempt);
                }
                Err(e) if e.is_transient() => {
                    if attempt == self.config.max_apply_attempts {
                        warn!(target = %target, ty = %ty, error = %e, "Retry budget exhausted");
                        return PairOutcome::failed(ErrorKind::TransientExhausted, attempt);
                    }
                    debug!(target = %target, ty = %ty, attempt, error = %e, "Transient apply failure");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => {
                    warn!(target = %target, ty = %ty, error = %e, "Permanent apply failure");
                    let kind = match e {
                        OrgSyncError::NotFound { .. } => ErrorKind::TargetNotFound,
                        OrgSyncError::Validation { .. } => ErrorKind::ValidationFailed,
                        _ => ErrorKind::Storage,
                    };
                    return PairOutcome::failed(kind, attempt);
                }
            }
        }
        PairOutcome::failed(ErrorKind::TransientExhausted, self.config.max_apply_attempts)
    }

    /// Persist one terminal pair outcome: one append-only result row and
    /// one audit record. Audit is written only here — never on a
    /// transient retry attempt — keeping the audit cardinality equal to
    /// types × targets.
    async fn record(
        &self,
        job_id: Uuid,
        ty: PropagationType,
        target: Uuid,
        pair: PairOutcome,
    ) -> OrgSyncResult<()> {
        let result = PropagationTargetResult {
            job_id,
            target_tenant_id: target,
            propagation_type: ty,
            outcome: pair.outcome,
            error_kind: pair.error_kind,
            applied_at: chrono::Utc::now(),
            attempt_count: pair.attempt_count,
        };
        self.jobs.append_result(&result).await?;
        self.audit
            .append(CreateAuditRecord {
                job_id,
                target_tenant_id: target,
                propagation_type: ty,
                outcome: pair.outcome,
                error_kind: pair.error_kind,
            })
            .await?;
        Ok(())
    }
}
