//! Repository and collaborator trait definitions.
//!
//! All operations are async. The engine is generic over these traits so
//! that it carries no dependency on the storage crate; `orgsync-db`
//! provides the SurrealDB implementations.

use uuid::Uuid;

use crate::error::OrgSyncResult;
use crate::models::{
    actor::{Actor, TenantRole},
    audit::{CreateAuditRecord, PropagationAuditRecord},
    job::{JobStatus, PropagationJob, PropagationTargetResult},
    organization::Organization,
    plan::PropagationPlan,
    propagation::PropagationType,
    snapshot::ConfigSnapshot,
    tenant::Tenant,
};

// ---------------------------------------------------------------------------
// Organization directory
// ---------------------------------------------------------------------------

/// Resolves organization membership and sibling locations.
pub trait DirectoryRepository: Send + Sync {
    fn get_tenant(&self, id: Uuid) -> impl Future<Output = OrgSyncResult<Tenant>> + Send;

    fn get_organization(
        &self,
        id: Uuid,
    ) -> impl Future<Output = OrgSyncResult<Organization>> + Send;

    /// Active locations eligible as propagation targets for `source`:
    /// members of the same organization, or locations sharing the same
    /// direct owner when the source has no organization. Never includes
    /// the source itself.
    fn eligible_siblings(
        &self,
        source: &Tenant,
    ) -> impl Future<Output = OrgSyncResult<Vec<Tenant>>> + Send;
}

// ---------------------------------------------------------------------------
// Identity / authorization service
// ---------------------------------------------------------------------------

/// Resolves actors and their per-tenant roles.
pub trait IdentityRepository: Send + Sync {
    fn get_actor(&self, id: Uuid) -> impl Future<Output = OrgSyncResult<Actor>> + Send;

    /// The actor's role on a tenant, or `None` when the actor holds none.
    fn role_on(
        &self,
        actor_id: Uuid,
        tenant_id: Uuid,
    ) -> impl Future<Output = OrgSyncResult<Option<TenantRole>>> + Send;
}

// ---------------------------------------------------------------------------
// Domain configuration gateway
// ---------------------------------------------------------------------------

/// Read/write access to the seven configuration domains.
///
/// `apply_snapshot` must be idempotent — applying the same snapshot twice
/// leaves the target in the same state as applying it once — and must run
/// inside a storage transaction scoped to the single target, so one
/// target's failure never affects another's.
pub trait ConfigGateway: Send + Sync {
    fn read_snapshot(
        &self,
        tenant_id: Uuid,
        propagation_type: PropagationType,
    ) -> impl Future<Output = OrgSyncResult<ConfigSnapshot>> + Send;

    fn apply_snapshot(
        &self,
        tenant_id: Uuid,
        snapshot: &ConfigSnapshot,
    ) -> impl Future<Output = OrgSyncResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Job store
// ---------------------------------------------------------------------------

/// Durable record of submitted jobs and their per-target results.
pub trait JobRepository: Send + Sync {
    /// Persist a fresh pending job for a plan.
    ///
    /// Rejects with [`crate::OrgSyncError::DuplicateJob`] when a job with
    /// the same plan signature is still pending or running. The check and
    /// the insert happen in one storage transaction.
    fn create(
        &self,
        plan: &PropagationPlan,
    ) -> impl Future<Output = OrgSyncResult<PropagationJob>> + Send;

    fn get(&self, id: Uuid) -> impl Future<Output = OrgSyncResult<PropagationJob>> + Send;

    fn mark_running(&self, id: Uuid) -> impl Future<Output = OrgSyncResult<()>> + Send;

    /// Append one (type, target) outcome row. Each row is keyed by the
    /// (job, type, target) triple; workers never mutate shared state.
    fn append_result(
        &self,
        result: &PropagationTargetResult,
    ) -> impl Future<Output = OrgSyncResult<()>> + Send;

    fn list_results(
        &self,
        job_id: Uuid,
    ) -> impl Future<Output = OrgSyncResult<Vec<PropagationTargetResult>>> + Send;

    /// Flag the job for best-effort cancellation.
    fn request_cancel(
        &self,
        id: Uuid,
    ) -> impl Future<Output = OrgSyncResult<PropagationJob>> + Send;

    /// Record the derived terminal status. Refuses to overwrite a job
    /// already in a terminal status.
    fn finalize(
        &self,
        id: Uuid,
        status: JobStatus,
    ) -> impl Future<Output = OrgSyncResult<PropagationJob>> + Send;
}

// ---------------------------------------------------------------------------
// Audit (append-only)
// ---------------------------------------------------------------------------

pub trait AuditLogRepository: Send + Sync {
    /// Append a new audit record. No update or delete operations exist.
    fn append(
        &self,
        input: CreateAuditRecord,
    ) -> impl Future<Output = OrgSyncResult<PropagationAuditRecord>> + Send;

    fn list_by_job(
        &self,
        job_id: Uuid,
    ) -> impl Future<Output = OrgSyncResult<Vec<PropagationAuditRecord>>> + Send;

    fn count_by_job(&self, job_id: Uuid) -> impl Future<Output = OrgSyncResult<u64>> + Send;
}
