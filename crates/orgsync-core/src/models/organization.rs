//! Organization domain model.
//!
//! Organizations group multiple locations (tenants) under shared
//! ownership. Propagation never crosses organization boundaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::tier::SubscriptionTier;

/// An organization groups multiple locations under a single chain account.
///
/// The organization's subscription tier, when the source location belongs
/// to one, is the effective tier used for propagation authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    /// Human-readable name.
    pub name: String,
    /// URL-safe unique identifier (e.g., `acme-stores`).
    pub slug: String,
    /// Subscription tier of the whole chain.
    pub tier: SubscriptionTier,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganization {
    pub name: String,
    pub slug: String,
    pub tier: SubscriptionTier,
}
