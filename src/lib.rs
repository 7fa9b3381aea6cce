pub mod accrual;
pub mod clock;
pub mod config;
pub mod models;
pub mod storage;
