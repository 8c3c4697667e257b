//! Integration tests for job execution against in-memory SurrealDB:
//! fan-out, per-target isolation, retry, cancellation, and audit
//! cardinality.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use orgsync_core::error::{OrgSyncError, OrgSyncResult};
use orgsync_core::models::job::{ErrorKind, JobStatus, TargetOutcome};
use orgsync_core::models::organization::CreateOrganization;
use orgsync_core::models::plan::PropagationPlan;
use orgsync_core::models::propagation::PropagationType;
use orgsync_core::models::snapshot::{CategoryRecord, ConfigSnapshot, ProductRecord};
use orgsync_core::models::tenant::{CreateTenant, Tenant, TenantStatus};
use orgsync_core::models::tier::SubscriptionTier;
use orgsync_core::repository::{AuditLogRepository, ConfigGateway, JobRepository};
use orgsync_db::repository::{
    SurrealAuditLogRepository, SurrealConfigGateway, SurrealDirectoryRepository,
    SurrealJobRepository,
};
use orgsync_engine::{CancelRegistry, EngineConfig, PropagationExecutor};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

type Db = surrealdb::engine::local::Db;

struct Fixture {
    gateway: Arc<SurrealConfigGateway<Db>>,
    directory: Arc<SurrealDirectoryRepository<Db>>,
    jobs: Arc<SurrealJobRepository<Db>>,
    audit: Arc<SurrealAuditLogRepository<Db>>,
    source: Tenant,
    targets: Vec<Tenant>,
}

/// Spin up in-memory DB, run migrations, and provision one organization
/// with a source location and `target_count` siblings.
async fn setup(target_count: usize) -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    orgsync_db::run_migrations(&db).await.unwrap();

    let directory = Arc::new(SurrealDirectoryRepository::new(db.clone()));
    let org = directory
        .create_organization(CreateOrganization {
            name: "Chain".into(),
            slug: "chain".into(),
            tier: SubscriptionTier::Professional,
        })
        .await
        .unwrap();
    let owner = Uuid::new_v4();

    let source = directory
        .create_tenant(CreateTenant {
            organization_id: Some(org.id),
            owner_id: owner,
            name: "Source".into(),
            slug: "source".into(),
            tier: SubscriptionTier::Professional,
        })
        .await
        .unwrap();

    let mut targets = Vec::new();
    for n in 0..target_count {
        let tenant = directory
            .create_tenant(CreateTenant {
                organization_id: Some(org.id),
                owner_id: owner,
                name: format!("Target {n}"),
                slug: format!("target-{n}"),
                tier: SubscriptionTier::Professional,
            })
            .await
            .unwrap();
        targets.push(tenant);
    }

    Fixture {
        gateway: Arc::new(SurrealConfigGateway::new(db.clone())),
        directory,
        jobs: Arc::new(SurrealJobRepository::new(db.clone())),
        audit: Arc::new(SurrealAuditLogRepository::new(db)),
        source,
        targets,
    }
}

fn executor<G: ConfigGateway>(
    fixture: &Fixture,
    gateway: Arc<G>,
    config: EngineConfig,
) -> PropagationExecutor<G, SurrealDirectoryRepository<Db>, SurrealJobRepository<Db>, SurrealAuditLogRepository<Db>>
{
    PropagationExecutor::new(
        gateway,
        Arc::clone(&fixture.directory),
        Arc::clone(&fixture.jobs),
        Arc::clone(&fixture.audit),
        Arc::new(CancelRegistry::new()),
        config,
    )
}

fn product(sku: &str, price_cents: i64) -> ProductRecord {
    ProductRecord {
        sku: sku.into(),
        name: format!("Product {sku}"),
        description: None,
        price_cents,
        tax_rate_bps: 2200,
        active: true,
    }
}

async fn seed_menu(fixture: &Fixture) {
    fixture
        .gateway
        .apply_snapshot(
            fixture.source.id,
            &ConfigSnapshot::Products(vec![product("SKU-1", 250), product("SKU-2", 1800)]),
        )
        .await
        .unwrap();
    fixture
        .gateway
        .apply_snapshot(
            fixture.source.id,
            &ConfigSnapshot::Categories(vec![CategoryRecord {
                slug: "drinks".into(),
                name: "Drinks".into(),
                position: 1,
            }]),
        )
        .await
        .unwrap();
}

/// Test gateway that fails the first `failures` applies transiently,
/// then delegates.
struct FlakyGateway {
    inner: Arc<SurrealConfigGateway<Db>>,
    failures: AtomicU32,
    attempts: AtomicU32,
}

impl FlakyGateway {
    fn new(inner: Arc<SurrealConfigGateway<Db>>, failures: u32) -> Self {
        Self {
            inner,
            failures: AtomicU32::new(failures),
            attempts: AtomicU32::new(0),
        }
    }
}

impl ConfigGateway for FlakyGateway {
    async fn read_snapshot(
        &self,
        tenant_id: Uuid,
        propagation_type: PropagationType,
    ) -> OrgSyncResult<ConfigSnapshot> {
        self.inner.read_snapshot(tenant_id, propagation_type).await
    }

    async fn apply_snapshot(
        &self,
        tenant_id: Uuid,
        snapshot: &ConfigSnapshot,
    ) -> OrgSyncResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if remaining {
            return Err(OrgSyncError::StorageUnavailable("store timed out".into()));
        }
        self.inner.apply_snapshot(tenant_id, snapshot).await
    }
}

fn fast_retry() -> EngineConfig {
    EngineConfig {
        initial_backoff: Duration::from_millis(1),
        ..EngineConfig::default()
    }
}

#[tokio::test]
async fn menu_propagates_to_every_sibling() {
    let fixture = setup(2).await;
    seed_menu(&fixture).await;

    let plan = PropagationPlan::new(
        fixture.source.id,
        vec![PropagationType::Products, PropagationType::Categories],
        fixture.targets.iter().map(|t| t.id).collect(),
        Uuid::new_v4(),
    );
    let job = fixture.jobs.create(&plan).await.unwrap();

    let exec = executor(&fixture, Arc::clone(&fixture.gateway), EngineConfig::default());
    let finished = exec.run(&job).await.unwrap();

    assert_eq!(finished.status, JobStatus::Completed);
    assert!(finished.completed_at.is_some());

    let results = fixture.jobs.list_results(job.id).await.unwrap();
    assert_eq!(results.len(), plan.pair_count());
    assert!(results.iter().all(|r| r.outcome == TargetOutcome::Success));

    // One audit record per pair, exactly.
    assert_eq!(
        fixture.audit.count_by_job(job.id).await.unwrap(),
        plan.pair_count() as u64
    );

    // Every target now carries the source menu.
    let source_menu = fixture
        .gateway
        .read_snapshot(fixture.source.id, PropagationType::Products)
        .await
        .unwrap();
    for target in &fixture.targets {
        let menu = fixture
            .gateway
            .read_snapshot(target.id, PropagationType::Products)
            .await
            .unwrap();
        assert_eq!(menu, source_menu);
    }
}

#[tokio::test]
async fn deleted_target_fails_alone() {
    let fixture = setup(3).await;
    seed_menu(&fixture).await;

    let plan = PropagationPlan::new(
        fixture.source.id,
        vec![PropagationType::Products],
        fixture.targets.iter().map(|t| t.id).collect(),
        Uuid::new_v4(),
    );
    let job = fixture.jobs.create(&plan).await.unwrap();

    // The target disappears between planning and execution.
    let gone = fixture.targets[1].id;
    fixture
        .directory
        .set_tenant_status(gone, TenantStatus::Deleted)
        .await
        .unwrap();

    let exec = executor(&fixture, Arc::clone(&fixture.gateway), EngineConfig::default());
    let finished = exec.run(&job).await.unwrap();

    assert_eq!(finished.status, JobStatus::CompletedWithErrors);

    let results = fixture.jobs.list_results(job.id).await.unwrap();
    assert_eq!(results.len(), 3);

    let failed: Vec<_> = results
        .iter()
        .filter(|r| r.outcome == TargetOutcome::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].target_tenant_id, gone);
    assert_eq!(failed[0].error_kind, Some(ErrorKind::TargetNotFound));

    // The deleted target's catalog was never touched.
    let untouched = fixture
        .gateway
        .read_snapshot(gone, PropagationType::Products)
        .await
        .unwrap();
    assert_eq!(untouched, ConfigSnapshot::Products(vec![]));
}

#[tokio::test]
async fn all_targets_failing_fails_the_job() {
    let fixture = setup(2).await;
    seed_menu(&fixture).await;

    let plan = PropagationPlan::new(
        fixture.source.id,
        vec![PropagationType::Products],
        fixture.targets.iter().map(|t| t.id).collect(),
        Uuid::new_v4(),
    );
    let job = fixture.jobs.create(&plan).await.unwrap();

    for target in &fixture.targets {
        fixture
            .directory
            .set_tenant_status(target.id, TenantStatus::Deleted)
            .await
            .unwrap();
    }

    let exec = executor(&fixture, Arc::clone(&fixture.gateway), EngineConfig::default());
    let finished = exec.run(&job).await.unwrap();
    assert_eq!(finished.status, JobStatus::Failed);
}

#[tokio::test]
async fn transient_failures_are_retried_to_success() {
    let fixture = setup(1).await;
    seed_menu(&fixture).await;

    let plan = PropagationPlan::new(
        fixture.source.id,
        vec![PropagationType::Products],
        vec![fixture.targets[0].id],
        Uuid::new_v4(),
    );
    let job = fixture.jobs.create(&plan).await.unwrap();

    // Two transient failures, then success on the third attempt.
    let flaky = Arc::new(FlakyGateway::new(Arc::clone(&fixture.gateway), 2));
    let exec = executor(&fixture, Arc::clone(&flaky), fast_retry());
    let finished = exec.run(&job).await.unwrap();

    assert_eq!(finished.status, JobStatus::Completed);
    let results = fixture.jobs.list_results(job.id).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].outcome, TargetOutcome::Success);
    assert_eq!(results[0].attempt_count, 3);
    assert_eq!(flaky.attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausted_retry_budget_fails_the_pair() {
    let fixture = setup(1).await;
    seed_menu(&fixture).await;

    let plan = PropagationPlan::new(
        fixture.source.id,
        vec![PropagationType::Products],
        vec![fixture.targets[0].id],
        Uuid::new_v4(),
    );
    let job = fixture.jobs.create(&plan).await.unwrap();

    let flaky = Arc::new(FlakyGateway::new(Arc::clone(&fixture.gateway), u32::MAX));
    let exec = executor(&fixture, Arc::clone(&flaky), fast_retry());
    let finished = exec.run(&job).await.unwrap();

    assert_eq!(finished.status, JobStatus::Failed);
    let results = fixture.jobs.list_results(job.id).await.unwrap();
    assert_eq!(results[0].outcome, TargetOutcome::Failed);
    assert_eq!(results[0].error_kind, Some(ErrorKind::TransientExhausted));
    assert_eq!(results[0].attempt_count, 3);
    assert_eq!(flaky.attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn cancellation_before_dispatch_skips_every_pair() {
    let fixture = setup(3).await;
    seed_menu(&fixture).await;

    let plan = PropagationPlan::new(
        fixture.source.id,
        vec![PropagationType::Products, PropagationType::Categories],
        fixture.targets.iter().map(|t| t.id).collect(),
        Uuid::new_v4(),
    );
    let job = fixture.jobs.create(&plan).await.unwrap();
    // Cancellation lands before the executor picks the job up.
    let job = fixture.jobs.request_cancel(job.id).await.unwrap();
    assert!(job.cancel_requested);

    let exec = executor(&fixture, Arc::clone(&fixture.gateway), EngineConfig::default());
    let finished = exec.run(&job).await.unwrap();

    // Zero successes derives a failed job; every pair is still
    // accounted for as skipped, in both the results and the audit.
    assert_eq!(finished.status, JobStatus::Failed);
    let results = fixture.jobs.list_results(job.id).await.unwrap();
    assert_eq!(results.len(), plan.pair_count());
    assert!(results.iter().all(|r| r.outcome == TargetOutcome::Skipped));
    assert!(
        results
            .iter()
            .all(|r| r.error_kind == Some(ErrorKind::Cancelled))
    );
    assert_eq!(
        fixture.audit.count_by_job(job.id).await.unwrap(),
        plan.pair_count() as u64
    );

    // No target received anything.
    for target in &fixture.targets {
        let menu = fixture
            .gateway
            .read_snapshot(target.id, PropagationType::Products)
            .await
            .unwrap();
        assert_eq!(menu, ConfigSnapshot::Products(vec![]));
    }
}

#[tokio::test]
async fn cancel_persisted_before_pickup_is_honored() {
    let fixture = setup(2).await;
    seed_menu(&fixture).await;

    let plan = PropagationPlan::new(
        fixture.source.id,
        vec![PropagationType::Products],
        fixture.targets.iter().map(|t| t.id).collect(),
        Uuid::new_v4(),
    );
    let job = fixture.jobs.create(&plan).await.unwrap();

    // The cancel lands in the store while the executor still holds the
    // snapshot taken at submission time, where the flag is unset.
    fixture.jobs.request_cancel(job.id).await.unwrap();
    assert!(!job.cancel_requested);

    let exec = executor(&fixture, Arc::clone(&fixture.gateway), EngineConfig::default());
    let finished = exec.run(&job).await.unwrap();

    assert_eq!(finished.status, JobStatus::Failed);
    let results = fixture.jobs.list_results(job.id).await.unwrap();
    assert_eq!(results.len(), plan.pair_count());
    assert!(results.iter().all(|r| r.outcome == TargetOutcome::Skipped));
}

#[tokio::test]
async fn unreadable_snapshot_fails_all_pairs_of_that_type() {
    let fixture = setup(2).await;
    // Products seeded, hours singleton left missing on the source.
    seed_menu(&fixture).await;

    let plan = PropagationPlan::new(
        fixture.source.id,
        vec![PropagationType::Products, PropagationType::Hours],
        fixture.targets.iter().map(|t| t.id).collect(),
        Uuid::new_v4(),
    );
    let job = fixture.jobs.create(&plan).await.unwrap();

    let exec = executor(&fixture, Arc::clone(&fixture.gateway), EngineConfig::default());
    let finished = exec.run(&job).await.unwrap();

    assert_eq!(finished.status, JobStatus::CompletedWithErrors);
    let results = fixture.jobs.list_results(job.id).await.unwrap();
    assert_eq!(results.len(), plan.pair_count());
    for result in &results {
        match result.propagation_type {
            PropagationType::Products => assert_eq!(result.outcome, TargetOutcome::Success),
            PropagationType::Hours => {
                assert_eq!(result.outcome, TargetOutcome::Failed);
                // No apply was ever attempted; the failure names the
                // read side, not the targets, which all exist.
                assert_eq!(result.error_kind, Some(ErrorKind::SourceReadFailed));
                assert_eq!(result.attempt_count, 0);
            }
            other => panic!("unexpected type in results: {other}"),
        }
    }
}
