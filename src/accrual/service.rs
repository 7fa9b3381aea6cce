use std::cmp::Ordering;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::models::{Asset, Id};
use crate::storage::{AssetRepository, AssociationRepository};

use super::calculator::{calculate, AccrualTotals};
use super::error::AccrualError;
use super::models::{AccrualResult, AccrualWarning, InvocationContext};
use super::normalize::{normalize, NormalizedPeriods};

const DEFAULT_WRITE_ATTEMPTS: u32 = 3;

/// Recomputes and persists rented-day totals.
pub struct AccrualService {
    pub(super) assets: Arc<dyn AssetRepository>,
    pub(super) associations: Arc<dyn AssociationRepository>,
    pub(super) clock: Arc<dyn Clock>,
    write_attempts: u32,
    pub(super) concurrency: usize,
}

/// One asset's stored record next to its freshly recomputed totals.
pub(super) struct Recomputed {
    pub asset: Asset,
    pub normalized: NormalizedPeriods,
    pub totals: AccrualTotals,
}

impl AccrualService {
    pub fn new(
        assets: Arc<dyn AssetRepository>,
        associations: Arc<dyn AssociationRepository>,
    ) -> Self {
        Self {
            assets,
            associations,
            clock: Arc::new(SystemClock),
            write_attempts: DEFAULT_WRITE_ATTEMPTS,
            concurrency: 1,
        }
    }

    /// Build a service over one store that serves both assets and associations.
    pub fn from_storage<S>(storage: Arc<S>) -> Self
    where
        S: AssetRepository + AssociationRepository + 'static,
    {
        Self::new(storage.clone(), storage)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// How many times a conditional write may lose to a concurrent writer
    /// before the update gives up.
    pub fn with_write_attempts(mut self, attempts: u32) -> Self {
        self.write_attempts = attempts.max(1);
        self
    }

    /// Maximum number of assets processed at once by a batch run.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub(super) async fn recompute(&self, asset_id: &Id) -> Result<Recomputed, AccrualError> {
        let asset = self
            .assets
            .get_asset(asset_id)
            .await
            .map_err(|source| AccrualError::Lookup {
                asset_id: asset_id.clone(),
                source,
            })?
            .filter(Asset::is_active)
            .ok_or_else(|| AccrualError::NotFound {
                asset_id: asset_id.clone(),
            })?;

        let periods = self
            .associations
            .list_periods_for_asset(asset_id)
            .await
            .map_err(|source| AccrualError::Lookup {
                asset_id: asset_id.clone(),
                source,
            })?;

        let normalized = normalize(&periods);
        let totals = calculate(asset.historical_days, &normalized.intervals);

        debug!(
            asset_id = %asset_id,
            periods = periods.len(),
            intervals = normalized.intervals.len(),
            open_periods = normalized.open_periods,
            calculated_days = totals.calculated_days,
            "recomputed rented days"
        );

        Ok(Recomputed {
            asset,
            normalized,
            totals,
        })
    }

    /// Recompute one asset and store the new total if it grew.
    ///
    /// Equal totals are a no-op. A lower total is never written; the stored
    /// value is kept and a [`AccrualWarning::RegressionPrevented`] is attached.
    pub async fn update_one(
        &self,
        ctx: &InvocationContext,
        asset_id: &Id,
    ) -> Result<AccrualResult, AccrualError> {
        for attempt in 1..=self.write_attempts {
            let Recomputed {
                asset,
                normalized,
                totals,
            } = self.recompute(asset_id).await?;

            let mut warnings: Vec<AccrualWarning> = Vec::new();
            for bad in normalized.malformed {
                warn!(
                    asset_id = %asset_id,
                    period_id = %bad.period_id,
                    entry_date = %bad.entry_date,
                    exit_date = %bad.exit_date,
                    "skipping association period that ends before it starts"
                );
                warnings.push(AccrualWarning::MalformedPeriod {
                    period_id: bad.period_id,
                    entry_date: bad.entry_date,
                    exit_date: bad.exit_date,
                });
            }

            let stored = asset.rented_days;
            let computed = totals.total_days;
            let mut result = AccrualResult {
                asset_id: asset_id.clone(),
                historical_days: totals.historical_days,
                calculated_days: totals.calculated_days,
                total_days: computed,
                previous_rented_days: stored,
                stored_rented_days: stored,
                updated: false,
                warnings,
            };

            match computed.cmp(&stored) {
                Ordering::Equal => {
                    debug!(asset_id = %asset_id, rented_days = stored, "rented days unchanged");
                    return Ok(result);
                }
                Ordering::Less => {
                    warn!(
                        asset_id = %asset_id,
                        actor = %ctx.actor,
                        stored,
                        computed,
                        "recomputed total is below stored value; keeping stored value"
                    );
                    result
                        .warnings
                        .push(AccrualWarning::RegressionPrevented { stored, computed });
                    return Ok(result);
                }
                Ordering::Greater => {}
            }

            let written = self
                .assets
                .compare_and_set_rented_days(asset_id, stored, computed)
                .await
                .map_err(|source| AccrualError::PersistenceFailure {
                    asset_id: asset_id.clone(),
                    source,
                })?;

            if written {
                info!(
                    asset_id = %asset_id,
                    actor = %ctx.actor,
                    from = stored,
                    to = computed,
                    "updated rented days"
                );
                result.updated = true;
                result.stored_rented_days = computed;
                return Ok(result);
            }

            debug!(
                asset_id = %asset_id,
                attempt,
                "rented days changed since read; recomputing"
            );
        }

        Err(AccrualError::WriteConflict {
            asset_id: asset_id.clone(),
            attempts: self.write_attempts,
        })
    }
}
