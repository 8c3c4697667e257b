//! Tier gate — the single authorization rule evaluator for propagation.
//!
//! All seven propagation types share this one call site, replacing the
//! per-route checks a CRUD layer would otherwise scatter. Authorization
//! is a property of the (source, type) pair, so the gate is evaluated
//! once per requested type at plan time, not per target.

use orgsync_core::error::{OrgSyncError, OrgSyncResult};
use orgsync_core::models::actor::{Actor, TenantRole};
use orgsync_core::models::propagation::PropagationType;
use orgsync_core::models::tier::SubscriptionTier;

/// Request-scoped facts the gate evaluates against, assembled once by the
/// planner from the directory and identity services.
#[derive(Debug, Clone)]
pub struct GateContext<'a> {
    pub actor: &'a Actor,
    /// Organization tier when the source belongs to one, else the
    /// source location's own tier.
    pub effective_tier: SubscriptionTier,
    /// Source plus its eligible siblings.
    pub location_count: usize,
    pub role_on_source: Option<TenantRole>,
}

pub struct TierGate;

impl TierGate {
    /// Evaluate the authorization rules, in order.
    pub fn authorize(ctx: &GateContext<'_>, ty: PropagationType) -> OrgSyncResult<()> {
        // 1. Platform administrators bypass every following check. The
        //    bypass lives here and only here, so it stays auditable.
        if ctx.actor.platform_admin {
            return Ok(());
        }

        // 2. Propagation is meaningless with a single location.
        if ctx.location_count < 2 {
            return Err(OrgSyncError::InsufficientLocations);
        }

        // 3. Effective tier must reach the type's minimum. The required
        //    tier name is reported for client-side upgrade prompts.
        let descriptor = ty.descriptor();
        if ctx.effective_tier < descriptor.minimum_tier {
            return Err(OrgSyncError::TierUpgradeRequired {
                required: descriptor.minimum_tier,
            });
        }

        // 4. Admin-only types never open up with tier. This closes the
        //    escalation path where a location owner grants itself
        //    elevated capability flags on sibling locations.
        if descriptor.admin_only {
            return Err(OrgSyncError::AdminRequired);
        }

        // 5. The actor must administer the source location.
        match ctx.role_on_source {
            Some(role) if role.can_administer() => Ok(()),
            _ => Err(OrgSyncError::RoleInsufficient),
        }
    }
}
