//! Propagation plans.
//!
//! A plan is the resolved, authorized (source, types, targets) tuple for
//! one request. Plans are immutable once constructed; a new request
//! produces a new plan. The signature is the dedup key used to reject a
//! resubmission while an identical job is still pending or running.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::propagation::PropagationType;

/// How the caller names the targets of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSelector {
    /// All eligible sibling locations of the source.
    All,
    /// An explicit subset of the eligible siblings.
    Explicit(Vec<Uuid>),
}

/// The resolved, authorized propagation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropagationPlan {
    pub source_tenant_id: Uuid,
    /// Requested types, deduplicated, in descriptor-table order.
    pub types: Vec<PropagationType>,
    /// Resolved targets, deduplicated, never containing the source.
    pub target_tenant_ids: Vec<Uuid>,
    pub requested_by: Uuid,
    pub created_at: DateTime<Utc>,
    /// Content-addressed dedup key over (source, types, targets).
    pub signature: String,
}

impl PropagationPlan {
    /// Build a plan and compute its signature.
    ///
    /// Types and targets are sorted before hashing so that the signature
    /// is insensitive to request ordering.
    pub fn new(
        source_tenant_id: Uuid,
        mut types: Vec<PropagationType>,
        mut target_tenant_ids: Vec<Uuid>,
        requested_by: Uuid,
    ) -> Self {
        types.sort();
        types.dedup();
        target_tenant_ids.sort();
        target_tenant_ids.dedup();

        let signature = plan_signature(source_tenant_id, &types, &target_tenant_ids);

        Self {
            source_tenant_id,
            types,
            target_tenant_ids,
            requested_by,
            created_at: Utc::now(),
            signature,
        }
    }

    /// Number of (type, target) pairs this plan will execute.
    pub fn pair_count(&self) -> usize {
        self.types.len() * self.target_tenant_ids.len()
    }
}

/// SHA-256 over the canonical plan tuple, base64 URL-safe encoded.
fn plan_signature(source: Uuid, types: &[PropagationType], targets: &[Uuid]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    for ty in types {
        hasher.update(ty.as_str().as_bytes());
        hasher.update([0u8]);
    }
    for target in targets {
        hasher.update(target.as_bytes());
    }
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
