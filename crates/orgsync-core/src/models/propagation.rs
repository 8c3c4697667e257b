//! Propagation types and their static descriptor registry.
//!
//! Each configuration domain that can be copied between locations has one
//! descriptor: the minimum subscription tier, whether the apply is a full
//! overwrite or a key-based merge, and whether the type is restricted to
//! platform administrators regardless of tier.

use serde::{Deserialize, Serialize};

use crate::models::tier::SubscriptionTier;

/// One of the seven configuration domains that can be propagated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PropagationType {
    Products,
    Categories,
    Hours,
    Profile,
    UserRoles,
    BrandAssets,
    FeatureFlags,
}

/// How a snapshot is applied to a target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationMode {
    /// Replace the target's corresponding configuration wholesale.
    Overwrite,
    /// Key-based upsert; target-local entries absent from the source
    /// are left untouched.
    Merge,
}

/// Static authorization and apply-semantics metadata for one type.
#[derive(Debug, Clone, Copy)]
pub struct PropagationTypeDescriptor {
    pub propagation_type: PropagationType,
    pub minimum_tier: SubscriptionTier,
    pub mode: ApplicationMode,
    /// Restricted to platform administrators regardless of tier.
    /// Feature flags can change access-control-relevant capability on
    /// target locations, so tenant owners must not self-serve them.
    pub admin_only: bool,
}

static DESCRIPTORS: &[PropagationTypeDescriptor] = &[
    PropagationTypeDescriptor {
        propagation_type: PropagationType::Products,
        minimum_tier: SubscriptionTier::Professional,
        mode: ApplicationMode::Overwrite,
        admin_only: false,
    },
    PropagationTypeDescriptor {
        propagation_type: PropagationType::Categories,
        minimum_tier: SubscriptionTier::Professional,
        mode: ApplicationMode::Overwrite,
        admin_only: false,
    },
    PropagationTypeDescriptor {
        propagation_type: PropagationType::Hours,
        minimum_tier: SubscriptionTier::Starter,
        mode: ApplicationMode::Overwrite,
        admin_only: false,
    },
    PropagationTypeDescriptor {
        propagation_type: PropagationType::Profile,
        minimum_tier: SubscriptionTier::Starter,
        mode: ApplicationMode::Overwrite,
        admin_only: false,
    },
    PropagationTypeDescriptor {
        propagation_type: PropagationType::UserRoles,
        minimum_tier: SubscriptionTier::Enterprise,
        mode: ApplicationMode::Merge,
        admin_only: false,
    },
    PropagationTypeDescriptor {
        propagation_type: PropagationType::BrandAssets,
        minimum_tier: SubscriptionTier::Professional,
        mode: ApplicationMode::Overwrite,
        admin_only: false,
    },
    PropagationTypeDescriptor {
        propagation_type: PropagationType::FeatureFlags,
        minimum_tier: SubscriptionTier::Enterprise,
        mode: ApplicationMode::Overwrite,
        admin_only: true,
    },
];

impl PropagationType {
    /// All propagation types, in descriptor-table order.
    pub const ALL: [PropagationType; 7] = [
        PropagationType::Products,
        PropagationType::Categories,
        PropagationType::Hours,
        PropagationType::Profile,
        PropagationType::UserRoles,
        PropagationType::BrandAssets,
        PropagationType::FeatureFlags,
    ];

    /// Descriptor lookup. The table is in enum order, one entry per type.
    pub fn descriptor(&self) -> &'static PropagationTypeDescriptor {
        &DESCRIPTORS[*self as usize]
    }

    /// Wire/storage name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            PropagationType::Products => "products",
            PropagationType::Categories => "categories",
            PropagationType::Hours => "hours",
            PropagationType::Profile => "profile",
            PropagationType::UserRoles => "user_roles",
            PropagationType::BrandAssets => "brand_assets",
            PropagationType::FeatureFlags => "feature_flags",
        }
    }

    /// Parse a stored type name. Returns `None` for unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "products" => Some(PropagationType::Products),
            "categories" => Some(PropagationType::Categories),
            "hours" => Some(PropagationType::Hours),
            "profile" => Some(PropagationType::Profile),
            "user_roles" => Some(PropagationType::UserRoles),
            "brand_assets" => Some(PropagationType::BrandAssets),
            "feature_flags" => Some(PropagationType::FeatureFlags),
            _ => None,
        }
    }
}

impl std::fmt::Display for PropagationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
