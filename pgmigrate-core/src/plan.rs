//! Tier-partitioned migration plan and its aggregate queries.

use serde::{Deserialize, Deserializer, Serialize};

use crate::change::{Change, SafetyTier};

/// Decode a JSON array that the extension may send as `null`.
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Change>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Change>>::deserialize(deserializer)?.unwrap_or_default())
}

/// An immutable snapshot of the changes needed to reconcile desired and live
/// schema, partitioned by safety tier.
///
/// Each tier keeps the order the extension returned. Re-planning means a new
/// load + plan cycle, never mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default, deserialize_with = "null_as_empty")]
    safe: Vec<Change>,
    #[serde(default, deserialize_with = "null_as_empty")]
    destructive: Vec<Change>,
    #[serde(default, deserialize_with = "null_as_empty")]
    breaking: Vec<Change>,
}

impl Plan {
    pub fn new(safe: Vec<Change>, destructive: Vec<Change>, breaking: Vec<Change>) -> Self {
        Self {
            safe,
            destructive,
            breaking,
        }
    }

    /// Decode a plan from the extension's JSON payload.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Changes in one tier, in plan order.
    pub fn tier(&self, tier: SafetyTier) -> &[Change] {
        match tier {
            SafetyTier::Safe => &self.safe,
            SafetyTier::Destructive => &self.destructive,
            SafetyTier::Breaking => &self.breaking,
        }
    }

    pub fn safe(&self) -> &[Change] {
        &self.safe
    }

    pub fn destructive(&self) -> &[Change] {
        &self.destructive
    }

    pub fn breaking(&self) -> &[Change] {
        &self.breaking
    }

    pub fn is_empty(&self) -> bool {
        self.safe.is_empty() && self.destructive.is_empty() && self.breaking.is_empty()
    }

    pub fn has_breaking(&self) -> bool {
        !self.breaking.is_empty()
    }

    pub fn has_destructive(&self) -> bool {
        !self.destructive.is_empty()
    }

    pub fn safe_count(&self) -> usize {
        self.safe.len()
    }

    pub fn destructive_count(&self) -> usize {
        self.destructive.len()
    }

    pub fn breaking_count(&self) -> usize {
        self.breaking.len()
    }

    pub fn total_count(&self) -> usize {
        self.safe.len() + self.destructive.len() + self.breaking.len()
    }

    /// Every change with its tier, in rendering order (Safe, Destructive, Breaking).
    pub fn iter(&self) -> impl Iterator<Item = (SafetyTier, &Change)> + '_ {
        SafetyTier::ALL
            .into_iter()
            .flat_map(move |tier| self.tier(tier).iter().map(move |c| (tier, c)))
    }
}
