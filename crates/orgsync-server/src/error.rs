//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use orgsync_core::error::OrgSyncError;
use serde_json::json;
use tracing::error;

/// Wrapper that maps domain errors onto HTTP responses.
pub struct ApiError(pub OrgSyncError);

impl From<OrgSyncError> for ApiError {
    fn from(e: OrgSyncError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            OrgSyncError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            OrgSyncError::TierUpgradeRequired { .. } => {
                (StatusCode::FORBIDDEN, "tier_upgrade_required")
            }
            OrgSyncError::InsufficientLocations => {
                (StatusCode::FORBIDDEN, "insufficient_locations")
            }
            OrgSyncError::AdminRequired => (StatusCode::FORBIDDEN, "admin_required"),
            OrgSyncError::RoleInsufficient => (StatusCode::FORBIDDEN, "role_insufficient"),
            OrgSyncError::NoEligibleTargets => (StatusCode::BAD_REQUEST, "no_eligible_targets"),
            OrgSyncError::TargetNotEligible { .. } => {
                (StatusCode::BAD_REQUEST, "target_not_eligible")
            }
            OrgSyncError::Validation { .. } => (StatusCode::BAD_REQUEST, "validation"),
            OrgSyncError::DuplicateJob { .. } => (StatusCode::CONFLICT, "duplicate_job"),
            OrgSyncError::JobAlreadyTerminal { .. } => {
                (StatusCode::CONFLICT, "job_already_terminal")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "Request failed");
        }

        let mut body = json!({
            "error": code,
            "message": self.0.to_string(),
        });
        if let OrgSyncError::TierUpgradeRequired { required } = &self.0 {
            body["requiredTier"] = json!(required.as_str());
        }

        (status, Json(body)).into_response()
    }
}
