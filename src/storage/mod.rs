mod json_file;
mod lookup;
mod memory;

pub use json_file::JsonFileStorage;
pub use lookup::find_asset;
pub use memory::MemoryStorage;

use anyhow::Result;

use crate::models::{Asset, AssociationPeriod, Id};

/// Read/write access to asset records.
///
/// The accrual engine only ever writes `rented_days`, and only through
/// [`AssetRepository::compare_and_set_rented_days`].
#[async_trait::async_trait]
pub trait AssetRepository: Send + Sync {
    /// Load an asset, including soft-deleted ones.
    async fn get_asset(&self, id: &Id) -> Result<Option<Asset>>;

    /// Ids of every asset that is not soft-deleted.
    async fn list_active_asset_ids(&self) -> Result<Vec<Id>>;

    /// Set `rented_days` to `value` only if it currently equals `expected`.
    ///
    /// Returns `Ok(false)` when the stored value no longer matches (or the
    /// asset vanished); nothing is written in that case. An `Err` means the
    /// write failed and the stored value is unchanged.
    async fn compare_and_set_rented_days(&self, id: &Id, expected: u64, value: u64)
        -> Result<bool>;

    /// Insert or replace a whole asset record.
    async fn save_asset(&self, asset: &Asset) -> Result<()>;

    async fn list_assets(&self) -> Result<Vec<Asset>>;
}

/// Read access to association history.
#[async_trait::async_trait]
pub trait AssociationRepository: Send + Sync {
    /// All periods for an asset, open ones included.
    async fn list_periods_for_asset(&self, asset_id: &Id) -> Result<Vec<AssociationPeriod>>;

    async fn append_periods(&self, asset_id: &Id, periods: &[AssociationPeriod]) -> Result<()>;
}
