use crate::model::{Amount, Month};
use crate::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Debug;

/// The two kinds of record, each persisted in its own table.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Expense,
    Income,
}

serde_plain::derive_display_from_serialize!(RecordKind);
serde_plain::derive_fromstr_from_deserialize!(RecordKind);

const EXPENSE_COLUMNS: &[&str] = &[
    "housing",
    "food",
    "going_out",
    "transportation",
    "travel",
    "tax",
    "other",
];

const INCOME_COLUMNS: &[&str] = &["salary", "help", "entrepreneur", "passive", "other"];

impl RecordKind {
    /// The table holding records of this kind.
    pub fn table(&self) -> &'static str {
        match self {
            RecordKind::Expense => "expense",
            RecordKind::Income => "income",
        }
    }

    /// The amount columns of this kind, in the order returned by `Record::amounts`.
    pub fn amount_columns(&self) -> &'static [&'static str] {
        match self {
            RecordKind::Expense => EXPENSE_COLUMNS,
            RecordKind::Income => INCOME_COLUMNS,
        }
    }
}

/// Behavior shared by `Expense` and `Income`.
///
/// Records are immutable. `total` is computed once, when the record is built, and always equals
/// the sum of `amounts`.
pub trait Record: Clone + Debug + PartialEq + Send + Sync + 'static {
    const KIND: RecordKind;

    /// The first day of the record's month.
    fn date(&self) -> NaiveDate;

    fn total(&self) -> Amount;

    /// The component amounts, in `KIND.amount_columns()` order.
    fn amounts(&self) -> Vec<Amount>;

    /// Builds a record from a date and component amounts in `KIND.amount_columns()` order.
    fn from_amounts(date: NaiveDate, amounts: &[Amount]) -> Result<Self>;

    fn month(&self) -> Month {
        Month::from_date(self.date())
    }

    /// The natural order of records: most recent first. Records in the same month compare equal,
    /// so a stable sort keeps them in their existing relative order.
    fn newest_first(a: &Self, b: &Self) -> Ordering {
        b.date().cmp(&a.date())
    }
}

/// Stable sort into natural (newest first) order.
pub(crate) fn sort_newest_first<R: Record>(records: &mut [R]) {
    records.sort_by(R::newest_first);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_kind_display() {
        assert_eq!(RecordKind::Expense.to_string(), "expense");
        assert_eq!(RecordKind::from_str("income").unwrap(), RecordKind::Income);
        assert!(RecordKind::from_str("loan").is_err());
    }

    #[test]
    fn test_column_counts() {
        assert_eq!(RecordKind::Expense.amount_columns().len(), 7);
        assert_eq!(RecordKind::Income.amount_columns().len(), 5);
    }
}
