//! Integration tests for the append-only audit log using in-memory
//! SurrealDB.

use orgsync_core::models::audit::CreateAuditRecord;
use orgsync_core::models::job::{ErrorKind, TargetOutcome};
use orgsync_core::models::propagation::PropagationType;
use orgsync_core::repository::AuditLogRepository;
use orgsync_db::repository::SurrealAuditLogRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    orgsync_db::run_migrations(&db).await.unwrap();
    db
}

fn record(
    job_id: Uuid,
    target: Uuid,
    ty: PropagationType,
    outcome: TargetOutcome,
    error_kind: Option<ErrorKind>,
) -> CreateAuditRecord {
    CreateAuditRecord {
        job_id,
        target_tenant_id: target,
        propagation_type: ty,
        outcome,
        error_kind,
    }
}

#[tokio::test]
async fn append_and_list_by_job() {
    let db = setup().await;
    let repo = SurrealAuditLogRepository::new(db);

    let job_id = Uuid::new_v4();
    let target = Uuid::new_v4();

    let appended = repo
        .append(record(
            job_id,
            target,
            PropagationType::Products,
            TargetOutcome::Success,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(appended.job_id, job_id);
    assert_eq!(appended.outcome, TargetOutcome::Success);
    assert_eq!(appended.error_kind, None);

    repo.append(record(
        job_id,
        target,
        PropagationType::Hours,
        TargetOutcome::Failed,
        Some(ErrorKind::Storage),
    ))
    .await
    .unwrap();
    // A different job's record never shows up in this job's trail.
    repo.append(record(
        Uuid::new_v4(),
        target,
        PropagationType::Products,
        TargetOutcome::Success,
        None,
    ))
    .await
    .unwrap();

    let trail = repo.list_by_job(job_id).await.unwrap();
    assert_eq!(trail.len(), 2);
    assert!(trail.iter().all(|r| r.job_id == job_id));

    let failed = trail
        .iter()
        .find(|r| r.propagation_type == PropagationType::Hours)
        .unwrap();
    assert_eq!(failed.outcome, TargetOutcome::Failed);
    assert_eq!(failed.error_kind, Some(ErrorKind::Storage));
}

#[tokio::test]
async fn count_by_job() {
    let db = setup().await;
    let repo = SurrealAuditLogRepository::new(db);

    let job_id = Uuid::new_v4();
    assert_eq!(repo.count_by_job(job_id).await.unwrap(), 0);

    for target in [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()] {
        repo.append(record(
            job_id,
            target,
            PropagationType::Profile,
            TargetOutcome::Skipped,
            Some(ErrorKind::Cancelled),
        ))
        .await
        .unwrap();
    }

    assert_eq!(repo.count_by_job(job_id).await.unwrap(), 3);
}

#[tokio::test]
async fn one_record_per_pair_is_enforced() {
    let db = setup().await;
    let repo = SurrealAuditLogRepository::new(db);

    let input = record(
        Uuid::new_v4(),
        Uuid::new_v4(),
        PropagationType::Categories,
        TargetOutcome::Success,
        None,
    );

    repo.append(input.clone()).await.unwrap();
    assert!(repo.append(input).await.is_err());
}
