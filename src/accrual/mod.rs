//! Rented-days accrual: merge association history, recompute totals, and
//! persist them without ever lowering what is stored.

mod audit;
mod batch;
pub mod calculator;
mod error;
mod models;
pub mod normalize;
mod service;

pub use calculator::{calculate, AccrualTotals};
pub use error::{AccrualError, ErrorKind};
pub use models::{
    AccrualResult, AccrualWarning, AssetFailure, AssetWarning, BatchSummary,
    IntegrityCheckResult, InvocationContext,
};
pub use normalize::{normalize, DayInterval, MalformedPeriod, NormalizedPeriods};
pub use service::AccrualService;
