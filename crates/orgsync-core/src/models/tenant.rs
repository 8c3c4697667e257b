//! Tenant (location) domain model.
//!
//! A tenant is a single store/business record with its own configuration
//! domains. Tenants may belong to an organization or stand alone under
//! a direct owner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::tier::SubscriptionTier;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Deleted,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(TenantStatus::Active),
            "deleted" => Some(TenantStatus::Deleted),
            _ => None,
        }
    }
}

/// A single location.
///
/// `organization_id` is `None` for standalone locations owned directly by
/// an account; sibling resolution then falls back to `owner_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    /// Account that provisioned and administers this location.
    pub owner_id: Uuid,
    /// Human-readable name.
    pub name: String,
    /// URL-safe unique identifier (e.g., `downtown-branch`).
    pub slug: String,
    /// The location's own subscription tier, used as the effective tier
    /// when the location does not belong to an organization.
    pub tier: SubscriptionTier,
    pub status: TenantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    pub organization_id: Option<Uuid>,
    pub owner_id: Uuid,
    pub name: String,
    pub slug: String,
    pub tier: SubscriptionTier,
}
