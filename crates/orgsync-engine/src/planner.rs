//! Plan construction — target resolution and per-type authorization.

use std::sync::Arc;

use orgsync_core::error::{OrgSyncError, OrgSyncResult};
use orgsync_core::models::plan::{PropagationPlan, TargetSelector};
use orgsync_core::models::propagation::PropagationType;
use orgsync_core::models::tenant::TenantStatus;
use orgsync_core::repository::{DirectoryRepository, IdentityRepository};
use tracing::debug;
use uuid::Uuid;

use crate::gate::{GateContext, TierGate};

/// Builds immutable [`PropagationPlan`]s from client requests.
pub struct PropagationPlanner<D, I> {
    directory: Arc<D>,
    identity: Arc<I>,
}

impl<D: DirectoryRepository, I: IdentityRepository> PropagationPlanner<D, I> {
    pub fn new(directory: Arc<D>, identity: Arc<I>) -> Self {
        Self {
            directory,
            identity,
        }
    }

    /// Resolve targets and authorize every requested type.
    ///
    /// A request naming multiple types where one fails authorization is
    /// rejected as a whole — no partial plan silently drops a type, so
    /// the authorization outcome stays explicit to the caller.
    pub async fn plan(
        &self,
        actor_id: Uuid,
        source_tenant_id: Uuid,
        types: Vec<PropagationType>,
        selector: TargetSelector,
    ) -> OrgSyncResult<PropagationPlan> {
        if types.is_empty() {
            return Err(OrgSyncError::Validation {
                message: "at least one propagation type is required".into(),
            });
        }

        let actor = self.identity.get_actor(actor_id).await?;
        let source = self.directory.get_tenant(source_tenant_id).await?;
        if source.status == TenantStatus::Deleted {
            return Err(OrgSyncError::NotFound {
                entity: "tenant".into(),
                id: source_tenant_id.to_string(),
            });
        }

        let siblings = self.directory.eligible_siblings(&source).await?;

        // Effective tier: organization tier when the source belongs to
        // one, else the source location's own tier.
        let effective_tier = match source.organization_id {
            Some(org_id) => self.directory.get_organization(org_id).await?.tier,
            None => source.tier,
        };

        let role_on_source = self.identity.role_on(actor.id, source.id).await?;

        let ctx = GateContext {
            actor: &actor,
            effective_tier,
            location_count: 1 + siblings.len(),
            role_on_source,
        };

        let mut unique_types = types;
        unique_types.sort();
        unique_types.dedup();
        for ty in &unique_types {
            TierGate::authorize(&ctx, *ty)?;
        }

        let sibling_ids: Vec<Uuid> = siblings.iter().map(|t| t.id).collect();
        let targets = match selector {
            TargetSelector::All => sibling_ids,
            TargetSelector::Explicit(requested) => {
                let mut targets = Vec::with_capacity(requested.len());
                for id in requested {
                    // The source slipping into its own target list is a
                    // client mistake, not an error.
                    if id == source.id {
                        continue;
                    }
                    if !sibling_ids.contains(&id) {
                        return Err(OrgSyncError::TargetNotEligible { tenant_id: id });
                    }
                    targets.push(id);
                }
                targets
            }
        };

        if targets.is_empty() {
            return Err(OrgSyncError::NoEligibleTargets);
        }

        let plan = PropagationPlan::new(source.id, unique_types, targets, actor.id);
        debug!(
            source = %plan.source_tenant_id,
            types = plan.types.len(),
            targets = plan.target_tenant_ids.len(),
            signature = %plan.signature,
            "Constructed propagation plan"
        );
        Ok(plan)
    }
}
