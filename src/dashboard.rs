//! The dashboard pairs an expense repository with an income repository and turns an anchor month
//! into a `MonthlySeries`.

use crate::model::{Expense, Income, Month};
use crate::repository::Repository;
use crate::series::{build_monthly_series, window_len, MonthlySeries};
use crate::store::RecordStore;
use crate::{Config, Error, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything the presentation layer needs for one window.
#[derive(Debug)]
pub struct MonthlyView {
    series: MonthlySeries,
    skipped_rows: usize,
    storage_failures: Vec<Error>,
}

impl MonthlyView {
    pub fn series(&self) -> &MonthlySeries {
        &self.series
    }

    /// Stored rows that could not be read and were left out of the series.
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Fetches that failed. The affected side of the series is all zeros.
    pub fn storage_failures(&self) -> &[Error] {
        &self.storage_failures
    }

    pub fn is_degraded(&self) -> bool {
        !self.storage_failures.is_empty()
    }
}

pub struct Dashboard {
    expenses: Repository<Expense>,
    incomes: Repository<Income>,
}

impl Dashboard {
    pub fn new(expenses: Repository<Expense>, incomes: Repository<Income>) -> Self {
        Self { expenses, incomes }
    }

    /// Opens a dashboard over the SQLite database in `config`, with both caches loaded. Every
    /// storage call, including those loads, is bounded by the configured storage timeout.
    pub async fn open(config: &Config) -> Self {
        let timeout = config.storage_timeout();
        let expense_store: Arc<dyn RecordStore<Expense>> = Arc::new(config.db().clone());
        let income_store: Arc<dyn RecordStore<Income>> = Arc::new(config.db().clone());
        let (expenses, incomes) = tokio::join!(
            Repository::open(expense_store, timeout),
            Repository::open(income_store, timeout)
        );
        Self::new(expenses, incomes)
    }

    pub fn expenses(&self) -> &Repository<Expense> {
        &self.expenses
    }

    pub fn incomes(&self) -> &Repository<Income> {
        &self.incomes
    }

    /// Fetches `window_months` expenses and incomes up to `anchor`, both at once, and aggregates
    /// them. A side whose fetch fails contributes zeros and its error is reported in the view.
    ///
    /// # Errors
    /// - `InvalidWindow` if `window_months` is not positive or the window cannot be represented.
    ///   Nothing is fetched in that case.
    pub async fn monthly_view(&self, anchor: Month, window_months: i64) -> Result<MonthlyView> {
        let count = window_len(anchor, window_months)?;
        let (expenses, incomes) = tokio::join!(
            self.expenses.windowed_query(anchor, count),
            self.incomes.windowed_query(anchor, count)
        );

        let skipped_rows = expenses.skipped() + incomes.skipped();
        if skipped_rows > 0 {
            warn!("{skipped_rows} stored row(s) could not be read and are not shown");
        }
        let series = build_monthly_series(
            anchor,
            window_months,
            expenses.records(),
            incomes.records(),
        )?;
        debug!("Built a {count} month series ending at {anchor}");

        let storage_failures = expenses
            .into_failure()
            .into_iter()
            .chain(incomes.into_failure())
            .collect();
        Ok(MonthlyView {
            series,
            skipped_rows,
            storage_failures,
        })
    }

    /// Reloads both caches from storage and returns the number of stored rows that could not be
    /// read.
    ///
    /// # Errors
    /// - `StorageUnavailable` if either side cannot be read in time.
    pub async fn refresh(&self) -> Result<usize> {
        let (expenses, incomes) = tokio::join!(self.expenses.refresh(), self.incomes.refresh());
        Ok(expenses? + incomes?)
    }
}
