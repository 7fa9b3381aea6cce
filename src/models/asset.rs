use serde::{Deserialize, Serialize};

use super::Id;

/// What kind of leasable hardware an asset is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Chip,
    Router,
    #[default]
    Other,
}

/// A leasable asset tracked by the inventory.
///
/// `historical_days` is the count carried over from before accrual tracking
/// existed and is never lowered. `rented_days` is owned by the accrual engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: Id,
    pub label: String,
    #[serde(default)]
    pub kind: AssetKind,
    #[serde(default)]
    pub historical_days: u64,
    #[serde(default)]
    pub rented_days: u64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

impl Asset {
    pub fn new(label: impl Into<String>, kind: AssetKind) -> Self {
        Self::new_with(Id::new(), label, kind)
    }

    pub fn new_with(id: Id, label: impl Into<String>, kind: AssetKind) -> Self {
        Self {
            id,
            label: label.into(),
            kind,
            historical_days: 0,
            rented_days: 0,
            deleted: false,
        }
    }

    /// Seed the pre-tracking day count. The stored total starts at the same value.
    pub fn with_historical_days(mut self, days: u64) -> Self {
        self.historical_days = days;
        self.rented_days = self.rented_days.max(days);
        self
    }

    pub fn with_rented_days(mut self, days: u64) -> Self {
        self.rented_days = days;
        self
    }

    pub fn is_active(&self) -> bool {
        !self.deleted
    }
}
