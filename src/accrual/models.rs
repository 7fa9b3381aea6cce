use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::Id;

use super::error::{AccrualError, ErrorKind};

/// Who asked for an accrual run. Only used for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationContext {
    pub actor: String,
}

impl InvocationContext {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
        }
    }

    /// Context for scheduled or otherwise unattended runs.
    pub fn system() -> Self {
        Self::new("system")
    }
}

/// Non-fatal conditions reported alongside a successful update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccrualWarning {
    /// A closed period ended before it started and was left out of the total.
    MalformedPeriod {
        period_id: Id,
        entry_date: NaiveDate,
        exit_date: NaiveDate,
    },
    /// The recomputed total is below the stored one; the stored value was kept.
    RegressionPrevented { stored: u64, computed: u64 },
}

/// Outcome of recomputing one asset's rented days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccrualResult {
    pub asset_id: Id,
    pub historical_days: u64,
    pub calculated_days: u64,
    /// Historical plus calculated, as recomputed from current data.
    pub total_days: u64,
    /// Value stored before this run.
    pub previous_rented_days: u64,
    /// Value stored after this run.
    pub stored_rented_days: u64,
    pub updated: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<AccrualWarning>,
}

impl AccrualResult {
    pub fn regression_prevented(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, AccrualWarning::RegressionPrevented { .. }))
    }
}

/// A per-asset failure captured by a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetFailure {
    /// Absent when the failure happened before any asset was picked, such as
    /// listing the fleet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<Id>,
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AccrualError> for AssetFailure {
    fn from(err: &AccrualError) -> Self {
        Self {
            asset_id: Some(err.asset_id().clone()),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// A warning raised while updating one asset in a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetWarning {
    pub asset_id: Id,
    #[serde(flatten)]
    pub warning: AccrualWarning,
}

/// Aggregate over one fleet-wide run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub run_at: DateTime<Utc>,
    pub total_processed: usize,
    pub total_updated: usize,
    pub total_errors: usize,
    pub total_regressions_prevented: usize,
    pub cancelled: bool,
    pub errors: Vec<AssetFailure>,
    /// Warnings from successful updates, tagged with their asset.
    pub warnings: Vec<AssetWarning>,
}

impl BatchSummary {
    pub fn new(run_at: DateTime<Utc>) -> Self {
        Self {
            run_at,
            total_processed: 0,
            total_updated: 0,
            total_errors: 0,
            total_regressions_prevented: 0,
            cancelled: false,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, outcome: Result<AccrualResult, AccrualError>) {
        self.total_processed += 1;
        match outcome {
            Ok(result) => {
                if result.updated {
                    self.total_updated += 1;
                }
                if result.regression_prevented() {
                    self.total_regressions_prevented += 1;
                }
                let asset_id = result.asset_id;
                self.warnings
                    .extend(result.warnings.into_iter().map(|warning| AssetWarning {
                        asset_id: asset_id.clone(),
                        warning,
                    }));
            }
            Err(err) => self.record_failure(AssetFailure::from(&err)),
        }
    }

    pub(crate) fn record_failure(&mut self, failure: AssetFailure) {
        self.total_errors += 1;
        self.errors.push(failure);
    }
}

/// Read-only comparison of the stored total against a fresh recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityCheckResult {
    pub asset_id: Id,
    pub current_rented_days: Option<u64>,
    /// Freshly recomputed total (historical plus calculated).
    pub calculated_days: Option<u64>,
    pub is_consistent: bool,
    pub message: String,
}
