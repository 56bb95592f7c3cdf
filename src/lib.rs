//! finance_manager: monthly expense and income records with rolling windowed summaries.
//!
//! Records are reached through a `Repository`, which keeps a `RecordStore` and an in-memory
//! `RecordCache` consistent. `build_monthly_series` aligns expenses and incomes onto a contiguous
//! monthly axis, and `Dashboard` ties the two together.

pub mod args;
mod cache;
pub mod commands;
mod config;
mod dashboard;
mod db;
mod error;
pub mod model;
mod repository;
mod series;
pub mod store;
mod utils;


pub use cache::RecordCache;
pub use config::Config;
pub use dashboard::{Dashboard, MonthlyView};
pub use error::Error;
pub use error::ErrorType;
pub use error::Result;
pub use repository::{Repository, DEFAULT_STORAGE_TIMEOUT};
pub use series::{
    anchor_choices, build_monthly_series, CategoryBucket, MonthBucket, MonthlySeries,
};
