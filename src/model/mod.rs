//! Types that represent the core data model, such as `Expense` and `Income`.
mod amount;
mod expense;
mod income;
mod month;
mod record;

pub use amount::{Amount, AmountError};
pub use expense::{Expense, ExpenseBreakdown};
pub use income::{Income, IncomeSources};
pub use month::Month;
pub use record::{Record, RecordKind};

pub(crate) use record::sort_newest_first;

use crate::error::{Error, ErrorType};
use crate::Result;

/// Rejects negative component amounts. `amounts` is in `kind.amount_columns()` order.
fn ensure_non_negative(kind: RecordKind, amounts: &[Amount]) -> Result<()> {
    for (column, amount) in kind.amount_columns().iter().zip(amounts) {
        if amount.is_negative() {
            return Err(Error::msg(
                ErrorType::MalformedRecord,
                format!("The {kind} amount '{column}' cannot be negative, got {amount}"),
            ));
        }
    }
    Ok(())
}

/// Sums the component amounts of a record.
fn record_total(kind: RecordKind, amounts: &[Amount]) -> Result<Amount> {
    Amount::checked_sum(amounts.iter().copied()).ok_or_else(|| {
        Error::msg(
            ErrorType::MalformedRecord,
            format!("The {kind} total is too large to be represented"),
        )
    })
}
