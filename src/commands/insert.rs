//! Insert command handlers.

use crate::args::{ExpenseArgs, IncomeArgs};
use crate::commands::Out;
use crate::dashboard::Dashboard;
use crate::model::{Expense, Income, Record};
use crate::{Config, Result};

/// Records the expenses of one month in the local SQLite database.
///
/// Several expenses may be recorded for the same month; they are summed in the series.
///
/// # Errors
/// - `MalformedRecord` if any category amount is negative or the total is too large.
/// - `StorageUnavailable` if the database does not accept the record.
pub async fn insert_expense(config: Config, args: ExpenseArgs) -> Result<Out<Expense>> {
    let expense = Expense::new(args.date().first_day(), args.breakdown())?;
    let dashboard = Dashboard::open(&config).await;
    dashboard.expenses().insert(expense.clone()).await?;
    Ok(Out::new(inserted_message(&expense), expense))
}

/// Records the income of one month in the local SQLite database.
///
/// # Errors
/// - `MalformedRecord` if any source amount is negative or the total is too large.
/// - `StorageUnavailable` if the database does not accept the record.
pub async fn insert_income(config: Config, args: IncomeArgs) -> Result<Out<Income>> {
    let income = Income::new(args.date().first_day(), args.sources())?;
    let dashboard = Dashboard::open(&config).await;
    dashboard.incomes().insert(income.clone()).await?;
    Ok(Out::new(inserted_message(&income), income))
}

fn inserted_message<R: Record>(record: &R) -> String {
    format!(
        "Inserted {} of {} for {}",
        R::KIND,
        record.total(),
        record.month()
    )
}
