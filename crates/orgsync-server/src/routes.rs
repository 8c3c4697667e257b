//! Route definitions and handlers.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use orgsync_core::error::{OrgSyncError, OrgSyncResult};
use surrealdb::Connection;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::dto::{JobDetailDto, JobDto, SubmitJobRequest};
use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the authenticated actor, set by the edge proxy.
const ACTOR_HEADER: &str = "x-actor-id";

pub fn router<C: Connection>(state: AppState<C>) -> Router {
    Router::new()
        .route("/propagation/jobs", post(submit_job))
        .route("/propagation/jobs/:id", get(get_job))
        .route("/propagation/jobs/:id/cancel", post(cancel_job))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn actor_id(headers: &HeaderMap) -> OrgSyncResult<Uuid> {
    let value = headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| OrgSyncError::Validation {
            message: format!("missing {ACTOR_HEADER} header"),
        })?;
    Uuid::parse_str(value).map_err(|_| OrgSyncError::Validation {
        message: format!("invalid {ACTOR_HEADER} header"),
    })
}

async fn submit_job<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Json(request): Json<SubmitJobRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = actor_id(&headers)?;
    let types = request.propagation_types()?;
    let selector = request.selector()?;

    let job = state
        .service
        .submit(actor, request.source_tenant_id, types, selector)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(JobDto::from(job))))
}

async fn get_job<C: Connection>(
    State(state): State<AppState<C>>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobDetailDto>, ApiError> {
    let (job, results) = state.service.get_job(id).await?;
    Ok(Json(JobDetailDto {
        job: JobDto::from(job),
        results: results.into_iter().map(Into::into).collect(),
    }))
}

async fn cancel_job<C: Connection>(
    State(state): State<AppState<C>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state.service.cancel_job(id).await?;
    Ok((StatusCode::ACCEPTED, Json(JobDto::from(job))))
}
