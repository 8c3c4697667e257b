//! Configuration snapshots — the payloads moved between locations.
//!
//! A snapshot is captured once per job from the source location and applied
//! unchanged to every target, so all targets in one job receive a consistent
//! view even if the source changes mid-run.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{OrgSyncError, OrgSyncResult};
use crate::models::actor::TenantRole;
use crate::models::propagation::PropagationType;

/// One sellable item. Keyed by `sku` within a tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRecord {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    /// Tax rate in basis points (e.g., 825 = 8.25%).
    pub tax_rate_bps: u32,
    pub active: bool,
}

/// One catalog category. Keyed by `slug` within a tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryRecord {
    pub slug: String,
    pub name: String,
    /// Display position within the storefront navigation.
    pub position: u32,
}

/// Opening hours for one weekday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayHours {
    /// Lowercase weekday name (`monday` … `sunday`).
    pub day: String,
    /// `HH:MM` local time; `None` when closed all day.
    pub open: Option<String>,
    /// `HH:MM` local time; `None` when closed all day.
    pub close: Option<String>,
}

/// Weekly business hours. One record per tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusinessHours {
    pub weekly: Vec<DayHours>,
    /// IANA timezone name the hours are expressed in.
    pub timezone: String,
}

/// Public-facing business profile. One record per tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusinessProfile {
    pub display_name: String,
    pub contact_email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// ISO 4217 currency code used on the storefront.
    pub currency: String,
}

/// One staff role grant. Keyed by `user_id` within a tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleAssignment {
    pub user_id: Uuid,
    pub role: TenantRole,
}

/// Brand asset set. One record per tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrandAssets {
    pub logo_url: Option<String>,
    pub favicon_url: Option<String>,
    /// Hex color, `#rrggbb`.
    pub primary_color: String,
    /// Hex color, `#rrggbb`.
    pub secondary_color: String,
}

/// One capability toggle. Keyed by `key` within a tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureFlag {
    pub key: String,
    pub enabled: bool,
}

/// A typed configuration snapshot for exactly one propagation type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ConfigSnapshot {
    Products(Vec<ProductRecord>),
    Categories(Vec<CategoryRecord>),
    Hours(BusinessHours),
    Profile(BusinessProfile),
    UserRoles(Vec<RoleAssignment>),
    BrandAssets(BrandAssets),
    FeatureFlags(Vec<FeatureFlag>),
}

impl ConfigSnapshot {
    /// The propagation type this snapshot carries.
    pub fn kind(&self) -> PropagationType {
        match self {
            ConfigSnapshot::Products(_) => PropagationType::Products,
            ConfigSnapshot::Categories(_) => PropagationType::Categories,
            ConfigSnapshot::Hours(_) => PropagationType::Hours,
            ConfigSnapshot::Profile(_) => PropagationType::Profile,
            ConfigSnapshot::UserRoles(_) => PropagationType::UserRoles,
            ConfigSnapshot::BrandAssets(_) => PropagationType::BrandAssets,
            ConfigSnapshot::FeatureFlags(_) => PropagationType::FeatureFlags,
        }
    }

    /// Structural validation before apply: collection snapshots must not
    /// contain duplicate keys, since the key drives idempotent upserts.
    pub fn validate(&self) -> OrgSyncResult<()> {
        match self {
            ConfigSnapshot::Products(items) => {
                check_unique("sku", items.iter().map(|p| p.sku.as_str()))
            }
            ConfigSnapshot::Categories(items) => {
                check_unique("slug", items.iter().map(|c| c.slug.as_str()))
            }
            ConfigSnapshot::UserRoles(items) => {
                let mut seen = std::collections::HashSet::new();
                for a in items {
                    if !seen.insert(a.user_id) {
                        return Err(OrgSyncError::Validation {
                            message: format!("duplicate user_id in role snapshot: {}", a.user_id),
                        });
                    }
                }
                Ok(())
            }
            ConfigSnapshot::FeatureFlags(items) => {
                check_unique("key", items.iter().map(|f| f.key.as_str()))
            }
            ConfigSnapshot::Hours(_)
            | ConfigSnapshot::Profile(_)
            | ConfigSnapshot::BrandAssets(_) => Ok(()),
        }
    }
}

fn check_unique<'a>(field: &str, keys: impl Iterator<Item = &'a str>) -> OrgSyncResult<()> {
    let mut seen = std::collections::HashSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(OrgSyncError::Validation {
                message: format!("duplicate {field} in snapshot: {key}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_sku_fails_validation() {
        let snap = ConfigSnapshot::Products(vec![
            ProductRecord {
                sku: "ESP-01".into(),
                name: "Espresso".into(),
                description: None,
                price_cents: 350,
                tax_rate_bps: 825,
                active: true,
            },
            ProductRecord {
                sku: "ESP-01".into(),
                name: "Double Espresso".into(),
                description: None,
                price_cents: 450,
                tax_rate_bps: 825,
                active: true,
            },
        ]);
        assert!(snap.validate().is_err());
    }

    #[test]
    fn singleton_snapshots_always_validate() {
        let snap = ConfigSnapshot::BrandAssets(BrandAssets {
            logo_url: None,
            favicon_url: None,
            primary_color: "#102030".into(),
            secondary_color: "#aabbcc".into(),
        });
        assert!(snap.validate().is_ok());
        assert_eq!(snap.kind(), PropagationType::BrandAssets);
    }
}
