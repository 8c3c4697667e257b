//! Integration tests for the identity repository using in-memory
//! SurrealDB.

use orgsync_core::error::OrgSyncError;
use orgsync_core::models::actor::TenantRole;
use orgsync_core::repository::IdentityRepository;
use orgsync_db::repository::SurrealIdentityRepository;
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

#[tokio::test]
async fn create_and_get_actor() {
    let db = setup().await;
    let repo = SurrealIdentityRepository::new(db);

    let actor = repo.create_actor("Giulia", false).await.unwrap();
    assert_eq!(actor.display_name, "Giulia");
    assert!(!actor.platform_admin);

    let fetched = repo.get_actor(actor.id).await.unwrap();
    assert_eq!(fetched.id, actor.id);

    let err = repo.get_actor(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, OrgSyncError::NotFound { .. }));
}

#[tokio::test]
async fn role_on_returns_assigned_role() {
    let db = setup().await;
    let repo = SurrealIdentityRepository::new(db);

    let actor = repo.create_actor("Marco", false).await.unwrap();
    let tenant_id = Uuid::new_v4();

    assert_eq!(repo.role_on(actor.id, tenant_id).await.unwrap(), None);

    repo.assign_role(actor.id, tenant_id, TenantRole::Manager)
        .await
        .unwrap();
    assert_eq!(
        repo.role_on(actor.id, tenant_id).await.unwrap(),
        Some(TenantRole::Manager)
    );

    // Reassignment replaces the grant instead of stacking a second one.
    repo.assign_role(actor.id, tenant_id, TenantRole::Admin)
        .await
        .unwrap();
    assert_eq!(
        repo.role_on(actor.id, tenant_id).await.unwrap(),
        Some(TenantRole::Admin)
    );

    // Roles are per tenant.
    assert_eq!(repo.role_on(actor.id, Uuid::new_v4()).await.unwrap(), None);
}
