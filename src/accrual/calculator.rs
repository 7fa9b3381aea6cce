use serde::Serialize;

use super::normalize::DayInterval;

/// Freshly computed day counts for one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccrualTotals {
    pub historical_days: u64,
    pub calculated_days: u64,
    pub total_days: u64,
}

/// Combine the frozen historical count with normalized billable intervals.
///
/// The result replaces the stored total; it is never added to it. Callers are
/// responsible for refusing totals below what is already stored.
pub fn calculate(historical_days: u64, intervals: &[DayInterval]) -> AccrualTotals {
    let calculated_days = intervals
        .iter()
        .fold(0u64, |acc, interval| acc.saturating_add(interval.days()));

    AccrualTotals {
        historical_days,
        calculated_days,
        total_days: historical_days.saturating_add(calculated_days),
    }
}
