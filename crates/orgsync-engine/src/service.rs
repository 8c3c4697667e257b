//! Propagation service — submission, polling, and cancellation.
//!
//! Ties the planner, job store, and executor together behind the three
//! operations the HTTP surface exposes. Execution happens on a spawned
//! task; submission returns the pending job immediately.

use std::sync::Arc;

use orgsync_core::error::OrgSyncResult;
use orgsync_core::models::job::{PropagationJob, PropagationTargetResult};
use orgsync_core::models::plan::TargetSelector;
use orgsync_core::models::propagation::PropagationType;
use orgsync_core::repository::{
    AuditLogRepository, ConfigGateway, DirectoryRepository, IdentityRepository, JobRepository,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::cancel::CancelRegistry;
use crate::config::EngineConfig;
use crate::executor::PropagationExecutor;
use crate::planner::PropagationPlanner;

pub struct PropagationService<G, D, I, J, A> {
    planner: PropagationPlanner<D, I>,
    executor: Arc<PropagationExecutor<G, D, J, A>>,
    jobs: Arc<J>,
    cancels: Arc<CancelRegistry>,
}

impl<G, D, I, J, A> PropagationService<G, D, I, J, A>
where
    G: ConfigGateway + Send + Sync + 'static,
    D: DirectoryRepository + Send + Sync + 'static,
    I: IdentityRepository + Send + Sync + 'static,
    J: JobRepository + Send + Sync + 'static,
    A: AuditLogRepository + Send + Sync + 'static,
{
    pub fn new(
        gateway: Arc<G>,
        directory: Arc<D>,
        identity: Arc<I>,
        jobs: Arc<J>,
        audit: Arc<A>,
        config: EngineConfig,
    ) -> Self {
        let cancels = Arc::new(CancelRegistry::new());
        let executor = Arc::new(PropagationExecutor::new(
            gateway,
            Arc::clone(&directory),
            Arc::clone(&jobs),
            audit,
            Arc::clone(&cancels),
            config,
        ));
        Self {
            planner: PropagationPlanner::new(directory, identity),
            executor,
            jobs,
            cancels,
        }
    }

    /// Authorize, plan, persist, and start a propagation job.
    ///
    /// Returns the pending job record; execution proceeds on a spawned
    /// task and is observed through [`Self::get_job`].
    pub async fn submit(
        &self,
        actor_id: Uuid,
        source_tenant_id: Uuid,
        types: Vec<PropagationType>,
        selector: TargetSelector,
    ) -> OrgSyncResult<PropagationJob> {
        let plan = self
            .planner
            .plan(actor_id, source_tenant_id, types, selector)
            .await?;
        let job = self.jobs.create(&plan).await?;
        info!(job_id = %job.id, signature = %job.signature, "Propagation job accepted");

        let executor = Arc::clone(&self.executor);
        let spawned = job.clone();
        tokio::spawn(async move {
            if let Err(e) = executor.run(&spawned).await {
                error!(job_id = %spawned.id, error = %e, "Propagation job run failed");
            }
        });

        Ok(job)
    }

    /// Fetch a job and its full per-(type, target) result breakdown.
    pub async fn get_job(
        &self,
        job_id: Uuid,
    ) -> OrgSyncResult<(PropagationJob, Vec<PropagationTargetResult>)> {
        let job = self.jobs.get(job_id).await?;
        let results = self.jobs.list_results(job_id).await?;
        Ok((job, results))
    }

    /// Best-effort cancellation.
    ///
    /// Already-terminal jobs are returned unchanged. For active jobs the
    /// persisted flag and the in-process token are both raised; dispatched
    /// applies run to completion, undispatched pairs land as skipped.
    pub async fn cancel_job(&self, job_id: Uuid) -> OrgSyncResult<PropagationJob> {
        let job = self.jobs.get(job_id).await?;
        if job.status.is_terminal() {
            return Ok(job);
        }
        let job = self.jobs.request_cancel(job_id).await?;
        self.cancels.cancel(job_id);
        info!(job_id = %job_id, "Cancellation requested");
        Ok(job)
    }
}
