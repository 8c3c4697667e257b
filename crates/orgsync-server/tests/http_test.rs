//! HTTP surface tests over in-memory SurrealDB: routing, status codes,
//! and error payloads.

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use orgsync_core::models::actor::TenantRole;
use orgsync_core::models::organization::CreateOrganization;
use orgsync_core::models::plan::PropagationPlan;
use orgsync_core::models::propagation::PropagationType;
use orgsync_core::models::snapshot::{ConfigSnapshot, ProductRecord};
use orgsync_core::models::tenant::CreateTenant;
use orgsync_core::models::tier::SubscriptionTier;
use orgsync_core::repository::{ConfigGateway, JobRepository};
use orgsync_db::repository::{
    SurrealConfigGateway, SurrealDirectoryRepository, SurrealIdentityRepository,
    SurrealJobRepository,
};
use orgsync_engine::EngineConfig;
use orgsync_server::{AppState, router};
use serde_json::{Value, json};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use tower::ServiceExt;
use uuid::Uuid;

type Db = surrealdb::engine::local::Db;

struct Fixture {
    app: Router,
    db: Surreal<Db>,
    actor_id: Uuid,
    source_id: Uuid,
    target_ids: Vec<Uuid>,
}

/// Spin up in-memory DB, seed one organization with a source, two
/// siblings, an owner actor, and a catalog, and build the router.
async fn setup(tier: SubscriptionTier) -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    orgsync_db::run_migrations(&db).await.unwrap();

    let directory = SurrealDirectoryRepository::new(db.clone());
    let identity = SurrealIdentityRepository::new(db.clone());
    let gateway = SurrealConfigGateway::new(db.clone());

    let org = directory
        .create_organization(CreateOrganization {
            name: "Chain".into(),
            slug: "chain".into(),
            tier,
        })
        .await
        .unwrap();
    let owner_id = Uuid::new_v4();

    let mut tenant_ids = Vec::new();
    for slug in ["source", "target-0", "target-1"] {
        let tenant = directory
            .create_tenant(CreateTenant {
                organization_id: Some(org.id),
                owner_id,
                name: slug.into(),
                slug: slug.into(),
                tier,
            })
            .await
            .unwrap();
        tenant_ids.push(tenant.id);
    }
    let source_id = tenant_ids[0];
    let target_ids = tenant_ids[1..].to_vec();

    let actor = identity.create_actor("Owner", false).await.unwrap();
    identity
        .assign_role(actor.id, source_id, TenantRole::Owner)
        .await
        .unwrap();

    gateway
        .apply_snapshot(
            source_id,
            &ConfigSnapshot::Products(vec![ProductRecord {
                sku: "SKU-1".into(),
                name: "Espresso".into(),
                description: None,
                price_cents: 250,
                tax_rate_bps: 2200,
                active: true,
            }]),
        )
        .await
        .unwrap();

    let state = AppState::new(db.clone(), EngineConfig::default());
    Fixture {
        app: router(state),
        db,
        actor_id: actor.id,
        source_id,
        target_ids,
    }
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    actor: Option<Uuid>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(actor) = actor {
        builder = builder.header("x-actor-id", actor.to_string());
    }
    let request = builder
        .body(match body {
            Some(body) => Body::from(serde_json::to_vec(&body).unwrap()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn submit_body(fixture: &Fixture) -> Value {
    json!({
        "sourceTenantId": fixture.source_id,
        "types": ["products"],
        "targets": "all",
    })
}

/// Poll the job route until the job is terminal.
async fn wait_terminal(fixture: &Fixture, job_id: &str) -> Value {
    for _ in 0..500 {
        let (status, body) = send(
            &fixture.app,
            "GET",
            &format!("/propagation/jobs/{job_id}"),
            Some(fixture.actor_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        match body["status"].as_str() {
            Some("pending") | Some("running") => {
                tokio::time::sleep(Duration::from_millis(10)).await
            }
            Some(_) => return body,
            None => panic!("job response missing status: {body}"),
        }
    }
    panic!("job {job_id} did not reach a terminal status");
}

#[tokio::test]
async fn submit_poll_and_complete() {
    let fixture = setup(SubscriptionTier::Professional).await;

    let (status, body) = send(
        &fixture.app,
        "POST",
        "/propagation/jobs",
        Some(fixture.actor_id),
        Some(submit_body(&fixture)),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["sourceTenantId"], json!(fixture.source_id));
    let job_id = body["jobId"].as_str().unwrap().to_string();

    let finished = wait_terminal(&fixture, &job_id).await;
    assert_eq!(finished["status"], "completed");
    let results = finished["results"].as_array().unwrap();
    assert_eq!(results.len(), fixture.target_ids.len());
    assert!(results.iter().all(|r| r["outcome"] == "success"));
}

#[tokio::test]
async fn missing_actor_header_is_rejected() {
    let fixture = setup(SubscriptionTier::Professional).await;

    let (status, body) = send(
        &fixture.app,
        "POST",
        "/propagation/jobs",
        None,
        Some(submit_body(&fixture)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn unknown_type_is_rejected() {
    let fixture = setup(SubscriptionTier::Professional).await;

    let (status, body) = send(
        &fixture.app,
        "POST",
        "/propagation/jobs",
        Some(fixture.actor_id),
        Some(json!({
            "sourceTenantId": fixture.source_id,
            "types": ["inventory"],
            "targets": "all",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn tier_gate_maps_to_forbidden() {
    let fixture = setup(SubscriptionTier::Starter).await;

    let (status, body) = send(
        &fixture.app,
        "POST",
        "/propagation/jobs",
        Some(fixture.actor_id),
        Some(submit_body(&fixture)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "tier_upgrade_required");
    assert_eq!(body["requiredTier"], "professional");
}

#[tokio::test]
async fn duplicate_active_job_maps_to_conflict() {
    let fixture = setup(SubscriptionTier::Professional).await;

    // An identical job is already pending in the store.
    let jobs = SurrealJobRepository::new(fixture.db.clone());
    let plan = PropagationPlan::new(
        fixture.source_id,
        vec![PropagationType::Products],
        fixture.target_ids.clone(),
        fixture.actor_id,
    );
    jobs.create(&plan).await.unwrap();

    let (status, body) = send(
        &fixture.app,
        "POST",
        "/propagation/jobs",
        Some(fixture.actor_id),
        Some(submit_body(&fixture)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "duplicate_job");
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let fixture = setup(SubscriptionTier::Professional).await;

    let (status, body) = send(
        &fixture.app,
        "GET",
        &format!("/propagation/jobs/{}", Uuid::new_v4()),
        Some(fixture.actor_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn cancel_route_returns_the_job() {
    let fixture = setup(SubscriptionTier::Professional).await;

    let (_, body) = send(
        &fixture.app,
        "POST",
        "/propagation/jobs",
        Some(fixture.actor_id),
        Some(submit_body(&fixture)),
    )
    .await;
    let job_id = body["jobId"].as_str().unwrap().to_string();
    wait_terminal(&fixture, &job_id).await;

    // Cancelling a finished job is a no-op that returns it as is.
    let (status, body) = send(
        &fixture.app,
        "POST",
        &format!("/propagation/jobs/{job_id}/cancel"),
        Some(fixture.actor_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["cancelRequested"], false);
}
