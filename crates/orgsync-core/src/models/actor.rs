//! Actor (staff account) domain model.
//!
//! Identity resolution is an external concern; the engine only consumes
//! the actor's platform-admin flag and per-tenant role.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A staff account acting on the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub display_name: String,
    /// Platform administrators bypass tier and role checks.
    pub platform_admin: bool,
}

/// Role an actor holds on a specific tenant.
///
/// Only `Owner` and `Admin` may trigger propagation from a location.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TenantRole {
    Owner,
    Admin,
    Manager,
    Viewer,
}

impl TenantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantRole::Owner => "owner",
            TenantRole::Admin => "admin",
            TenantRole::Manager => "manager",
            TenantRole::Viewer => "viewer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(TenantRole::Owner),
            "admin" => Some(TenantRole::Admin),
            "manager" => Some(TenantRole::Manager),
            "viewer" => Some(TenantRole::Viewer),
            _ => None,
        }
    }

    /// Whether this role may administer the tenant's configuration.
    pub fn can_administer(&self) -> bool {
        matches!(self, TenantRole::Owner | TenantRole::Admin)
    }
}
