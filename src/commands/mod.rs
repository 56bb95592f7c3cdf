//! Command handlers for the finman CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod init;
mod insert;
mod query;
mod series;

use crate::model::{Amount, Expense, Income, Record, RecordKind};
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use init::init;
pub use insert::{insert_expense, insert_income};
pub use query::{records, window};
pub use series::{periods, series};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Records of either kind, as returned by `records` and `window`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Records {
    Expenses(Vec<Expense>),
    Incomes(Vec<Income>),
}

impl Records {
    pub fn len(&self) -> usize {
        match self {
            Records::Expenses(v) => v.len(),
            Records::Incomes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One line per record.
    fn lines(&self) -> Vec<String> {
        match self {
            Records::Expenses(v) => v.iter().map(record_line).collect(),
            Records::Incomes(v) => v.iter().map(record_line).collect(),
        }
    }
}

/// e.g. `2024-05  total 712.50  housing 700.00, food 12.50`. Zero amounts are left out.
fn record_line<R: Record>(record: &R) -> String {
    format!(
        "{}  total {}  {}",
        record.month(),
        record.total(),
        amounts_line(R::KIND, &record.amounts())
    )
    .trim_end()
    .to_string()
}

/// e.g. `housing 700.00, food 12.50`. `amounts` is in column order; zeros are left out.
fn amounts_line(kind: RecordKind, amounts: &[Amount]) -> String {
    kind.amount_columns()
        .iter()
        .zip(amounts)
        .filter(|(_, amount)| !amount.is_zero())
        .map(|(column, amount)| format!("{column} {amount}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A closing line about stored rows that were left out, if there were any.
fn skipped_line(skipped: usize) -> Option<String> {
    (skipped > 0).then(|| format!("{skipped} stored row(s) could not be read and are not included"))
}
