//! In-memory storage implementation for tests and embedding.

use std::collections::HashMap;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::models::{Asset, AssociationPeriod, Id};

use super::{AssetRepository, AssociationRepository};

/// In-memory asset and association store.
pub struct MemoryStorage {
    assets: Mutex<HashMap<Id, Asset>>,
    periods: Mutex<HashMap<Id, Vec<AssociationPeriod>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            assets: Mutex::new(HashMap::new()),
            periods: Mutex::new(HashMap::new()),
        }
    }

    /// Overwrite `rented_days` unconditionally, bypassing the engine.
    pub async fn force_rented_days(&self, id: &Id, value: u64) -> Result<()> {
        let mut assets = self.assets.lock().await;
        match assets.get_mut(id) {
            Some(asset) => {
                asset.rented_days = value;
                Ok(())
            }
            None => anyhow::bail!("Asset not found: {id}"),
        }
    }

    /// Drop every association period for an asset.
    pub async fn clear_periods(&self, asset_id: &Id) {
        self.periods.lock().await.remove(asset_id);
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AssetRepository for MemoryStorage {
    async fn get_asset(&self, id: &Id) -> Result<Option<Asset>> {
        let assets = self.assets.lock().await;
        Ok(assets.get(id).cloned())
    }

    async fn list_active_asset_ids(&self) -> Result<Vec<Id>> {
        let assets = self.assets.lock().await;
        let mut ids: Vec<Id> = assets
            .values()
            .filter(|a| a.is_active())
            .map(|a| a.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn compare_and_set_rented_days(
        &self,
        id: &Id,
        expected: u64,
        value: u64,
    ) -> Result<bool> {
        let mut assets = self.assets.lock().await;
        match assets.get_mut(id) {
            Some(asset) if asset.rented_days == expected => {
                asset.rented_days = value;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn save_asset(&self, asset: &Asset) -> Result<()> {
        let mut assets = self.assets.lock().await;
        assets.insert(asset.id.clone(), asset.clone());
        Ok(())
    }

    async fn list_assets(&self) -> Result<Vec<Asset>> {
        let assets = self.assets.lock().await;
        let mut all: Vec<Asset> = assets.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }
}

#[async_trait::async_trait]
impl AssociationRepository for MemoryStorage {
    async fn list_periods_for_asset(&self, asset_id: &Id) -> Result<Vec<AssociationPeriod>> {
        let periods = self.periods.lock().await;
        Ok(periods.get(asset_id).cloned().unwrap_or_default())
    }

    async fn append_periods(&self, asset_id: &Id, new_periods: &[AssociationPeriod]) -> Result<()> {
        if new_periods.is_empty() {
            return Ok(());
        }
        let mut periods = self.periods.lock().await;
        periods
            .entry(asset_id.clone())
            .or_default()
            .extend(new_periods.iter().cloned());
        Ok(())
    }
}
