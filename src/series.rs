//! Aligns expenses and incomes onto a common, contiguous monthly axis.
//!
//! Everything here is pure: the caller fetches the records (usually through
//! `Repository::windowed_query`) and hands them to `build_monthly_series`.

use crate::error::{Error, ErrorType};
use crate::model::{Amount, Expense, ExpenseBreakdown, Income, Month, Record};
use crate::Result;
use serde::Serialize;
use std::collections::HashMap;

/// Expense and income totals for one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthBucket {
    month: Month,
    expense_total: Amount,
    income_total: Amount,
}

impl MonthBucket {
    fn empty(month: Month) -> Self {
        Self {
            month,
            expense_total: Amount::ZERO,
            income_total: Amount::ZERO,
        }
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn expense_total(&self) -> Amount {
        self.expense_total
    }

    pub fn income_total(&self) -> Amount {
        self.income_total
    }

    /// Income minus expenses. Both totals are non-negative, so the difference is representable.
    pub fn net(&self) -> Amount {
        self.income_total - self.expense_total
    }
}

/// Per-category expense sums for one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryBucket {
    month: Month,
    #[serde(flatten)]
    breakdown: ExpenseBreakdown,
}

impl CategoryBucket {
    pub fn month(&self) -> Month {
        self.month
    }

    pub fn breakdown(&self) -> &ExpenseBreakdown {
        &self.breakdown
    }
}

/// The result of `build_monthly_series`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlySeries {
    anchor: Month,
    buckets: Vec<MonthBucket>,
    categories: Vec<CategoryBucket>,
    latest_breakdown: Option<ExpenseBreakdown>,
    expense_total: Amount,
    income_total: Amount,
}

impl MonthlySeries {
    /// The last month of the window.
    pub fn anchor(&self) -> Month {
        self.anchor
    }

    /// One bucket per month of the window, oldest first. Months without records hold zeros.
    pub fn buckets(&self) -> &[MonthBucket] {
        &self.buckets
    }

    /// Per-category expense sums, aligned with `buckets`.
    pub fn category_buckets(&self) -> &[CategoryBucket] {
        &self.categories
    }

    /// The category split of the most recent expense in the window, if there is one.
    pub fn latest_breakdown(&self) -> Option<&ExpenseBreakdown> {
        self.latest_breakdown.as_ref()
    }

    pub fn expense_total(&self) -> Amount {
        self.expense_total
    }

    pub fn income_total(&self) -> Amount {
        self.income_total
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Builds one bucket for every month from `anchor - (window_months - 1)` through `anchor`.
///
/// Each bucket holds the summed `total` of the records whose month matches it; months with no
/// records hold zero. Records outside the window are ignored. Several records in one month are
/// summed. Amounts are not checked for sign.
///
/// # Errors
/// - `InvalidWindow` if `window_months` is not positive or the first month of the window cannot be
///   represented.
/// - `AmountOverflow` if a bucket, category or window total cannot be represented.
pub fn build_monthly_series(
    anchor: Month,
    window_months: i64,
    expenses: &[Expense],
    incomes: &[Income],
) -> Result<MonthlySeries> {
    let months = window(anchor, window_months)?;
    let index: HashMap<Month, usize> = months.iter().enumerate().map(|(i, m)| (*m, i)).collect();

    let mut buckets: Vec<MonthBucket> = months.iter().copied().map(MonthBucket::empty).collect();
    let mut categories: Vec<CategoryBucket> = months
        .iter()
        .map(|&month| CategoryBucket {
            month,
            breakdown: ExpenseBreakdown::default(),
        })
        .collect();
    let mut latest: Option<&Expense> = None;

    for expense in expenses {
        let Some(&ix) = index.get(&expense.month()) else {
            continue;
        };
        let month = expense.month();
        buckets[ix].expense_total = buckets[ix]
            .expense_total
            .checked_add(expense.total())
            .ok_or_else(|| overflow(format!("The expenses of {month}")))?;
        categories[ix].breakdown = categories[ix]
            .breakdown
            .checked_add(expense.breakdown())
            .ok_or_else(|| overflow(format!("The expense categories of {month}")))?;
        // Strictly newer only, so the first of several equally recent expenses wins.
        if latest.map_or(true, |l| expense.date() > l.date()) {
            latest = Some(expense);
        }
    }

    for income in incomes {
        if let Some(&ix) = index.get(&income.month()) {
            buckets[ix].income_total = buckets[ix]
                .income_total
                .checked_add(income.total())
                .ok_or_else(|| overflow(format!("The income of {}", income.month())))?;
        }
    }

    let expense_total = Amount::checked_sum(buckets.iter().map(|b| b.expense_total))
        .ok_or_else(|| overflow(format!("The expenses of the window ending at {anchor}")))?;
    let income_total = Amount::checked_sum(buckets.iter().map(|b| b.income_total))
        .ok_or_else(|| overflow(format!("The income of the window ending at {anchor}")))?;

    Ok(MonthlySeries {
        anchor,
        buckets,
        categories,
        latest_breakdown: latest.map(|e| *e.breakdown()),
        expense_total,
        income_total,
    })
}

fn overflow(what: String) -> Error {
    Error::msg(
        ErrorType::AmountOverflow,
        format!("{what} add up to more than can be represented"),
    )
}

/// The `count` months ending at `latest`, newest first. This is the list of anchors a user can
/// pick from. The list is shorter than `count` if it runs off the start of the calendar.
pub fn anchor_choices(latest: Month, count: u32) -> Vec<Month> {
    (0..count).map_while(|back| latest.checked_sub(back)).collect()
}

/// Checks that a window of `window_months` ending at `anchor` can be built and returns its length.
///
/// # Errors
/// - `InvalidWindow` if `window_months` is not positive or the first month of the window cannot be
///   represented.
pub(crate) fn window_len(anchor: Month, window_months: i64) -> Result<u32> {
    if window_months <= 0 {
        return Err(Error::msg(
            ErrorType::InvalidWindow,
            format!("The window must be at least one month, got {window_months}"),
        ));
    }
    u32::try_from(window_months)
        .ok()
        .filter(|&count| anchor.checked_sub(count - 1).is_some())
        .ok_or_else(|| {
            Error::msg(
                ErrorType::InvalidWindow,
                format!(
                    "A window of {window_months} months ending at {anchor} cannot be represented"
                ),
            )
        })
}

/// The months of the window, oldest first.
fn window(anchor: Month, window_months: i64) -> Result<Vec<Month>> {
    let count = window_len(anchor, window_months)?;
    // Every month after the first one is representable, since the first one is.
    Ok((0..count)
        .rev()
        .filter_map(|back| anchor.checked_sub(back))
        .collect())
}
