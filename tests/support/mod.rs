#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use fleetdays::accrual::AccrualService;
use fleetdays::models::{Asset, AssetKind, AssociationPeriod, Id};
use fleetdays::storage::{AssetRepository, AssociationRepository, MemoryStorage};
use tokio_util::sync::CancellationToken;

pub fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Save an asset with the given historical and stored counts plus closed periods.
pub async fn seed_asset(
    storage: &MemoryStorage,
    label: &str,
    historical_days: u64,
    rented_days: u64,
    periods: &[(NaiveDate, NaiveDate)],
) -> Result<Id> {
    let asset = Asset::new(label, AssetKind::Chip)
        .with_historical_days(historical_days)
        .with_rented_days(rented_days);
    storage.save_asset(&asset).await?;

    let periods: Vec<AssociationPeriod> = periods
        .iter()
        .map(|(entry, exit)| AssociationPeriod::closed(asset.id.clone(), *entry, *exit))
        .collect();
    storage.append_periods(&asset.id, &periods).await?;

    Ok(asset.id)
}

pub fn service_over(storage: Arc<MemoryStorage>) -> AccrualService {
    AccrualService::from_storage(storage)
}

/// Asset repository that delegates to memory storage but injects failures.
pub struct FaultyAssets {
    pub inner: Arc<MemoryStorage>,
    pub fail_lookups: HashSet<Id>,
    pub fail_writes: HashSet<Id>,
    /// Number of conditional writes that are made to lose a race: the stored
    /// value is bumped by one just before the comparison.
    pub races_to_lose: AtomicU32,
}

impl FaultyAssets {
    pub fn new(inner: Arc<MemoryStorage>) -> Self {
        Self {
            inner,
            fail_lookups: HashSet::new(),
            fail_writes: HashSet::new(),
            races_to_lose: AtomicU32::new(0),
        }
    }

    pub fn failing_lookup(mut self, id: &Id) -> Self {
        self.fail_lookups.insert(id.clone());
        self
    }

    pub fn failing_write(mut self, id: &Id) -> Self {
        self.fail_writes.insert(id.clone());
        self
    }

    pub fn losing_races(self, count: u32) -> Self {
        self.races_to_lose.store(count, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl AssetRepository for FaultyAssets {
    async fn get_asset(&self, id: &Id) -> Result<Option<Asset>> {
        if self.fail_lookups.contains(id) {
            anyhow::bail!("simulated lookup failure for {id}");
        }
        self.inner.get_asset(id).await
    }

    async fn list_active_asset_ids(&self) -> Result<Vec<Id>> {
        self.inner.list_active_asset_ids().await
    }

    async fn compare_and_set_rented_days(
        &self,
        id: &Id,
        expected: u64,
        value: u64,
    ) -> Result<bool> {
        if self.fail_writes.contains(id) {
            anyhow::bail!("simulated write failure for {id}");
        }
        let lose = self
            .races_to_lose
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lose {
            self.inner.force_rented_days(id, expected + 1).await?;
        }
        self.inner
            .compare_and_set_rented_days(id, expected, value)
            .await
    }

    async fn save_asset(&self, asset: &Asset) -> Result<()> {
        self.inner.save_asset(asset).await
    }

    async fn list_assets(&self) -> Result<Vec<Asset>> {
        self.inner.list_assets().await
    }
}

/// Repository whose fleet listing always fails.
pub struct UnlistableAssets;

#[async_trait]
impl AssetRepository for UnlistableAssets {
    async fn get_asset(&self, _id: &Id) -> Result<Option<Asset>> {
        Ok(None)
    }

    async fn list_active_asset_ids(&self) -> Result<Vec<Id>> {
        anyhow::bail!("asset table unavailable")
    }

    async fn compare_and_set_rented_days(
        &self,
        _id: &Id,
        _expected: u64,
        _value: u64,
    ) -> Result<bool> {
        Ok(false)
    }

    async fn save_asset(&self, _asset: &Asset) -> Result<()> {
        Ok(())
    }

    async fn list_assets(&self) -> Result<Vec<Asset>> {
        Ok(Vec::new())
    }
}

/// Repository that cancels a batch run from inside the `cancel_on`-th lookup,
/// the way an operator's Ctrl-C lands while an asset is being processed.
pub struct CancellingAssets {
    pub inner: Arc<MemoryStorage>,
    pub cancel: CancellationToken,
    cancel_on: usize,
    lookups: AtomicUsize,
    cancelled_during: Mutex<Option<Id>>,
}

impl CancellingAssets {
    pub fn new(inner: Arc<MemoryStorage>, cancel: CancellationToken, cancel_on: usize) -> Self {
        Self {
            inner,
            cancel,
            cancel_on,
            lookups: AtomicUsize::new(0),
            cancelled_during: Mutex::new(None),
        }
    }

    /// The asset whose lookup triggered the cancellation, if it happened.
    pub fn cancelled_during(&self) -> Option<Id> {
        self.cancelled_during.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetRepository for CancellingAssets {
    async fn get_asset(&self, id: &Id) -> Result<Option<Asset>> {
        let seen = self.lookups.fetch_add(1, Ordering::SeqCst) + 1;
        if seen == self.cancel_on {
            *self.cancelled_during.lock().unwrap() = Some(id.clone());
            self.cancel.cancel();
        }
        self.inner.get_asset(id).await
    }

    async fn list_active_asset_ids(&self) -> Result<Vec<Id>> {
        self.inner.list_active_asset_ids().await
    }

    async fn compare_and_set_rented_days(
        &self,
        id: &Id,
        expected: u64,
        value: u64,
    ) -> Result<bool> {
        self.inner
            .compare_and_set_rented_days(id, expected, value)
            .await
    }

    async fn save_asset(&self, asset: &Asset) -> Result<()> {
        self.inner.save_asset(asset).await
    }

    async fn list_assets(&self) -> Result<Vec<Asset>> {
        self.inner.list_assets().await
    }
}
