//! Subscription tiers.
//!
//! Tiers are totally ordered; propagation authorization compares the
//! effective tier of a request against a per-type minimum.

use serde::{Deserialize, Serialize};

/// Subscription tier of an organization or standalone location.
///
/// Ordering is derived from declaration order: `Starter` is the lowest
/// tier, `Enterprise` the highest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Starter,
    Professional,
    Enterprise,
}

impl SubscriptionTier {
    /// Wire/storage name of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Starter => "starter",
            SubscriptionTier::Professional => "professional",
            SubscriptionTier::Enterprise => "enterprise",
        }
    }

    /// Parse a stored tier name. Returns `None` for unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "starter" => Some(SubscriptionTier::Starter),
            "professional" => Some(SubscriptionTier::Professional),
            "enterprise" => Some(SubscriptionTier::Enterprise),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
