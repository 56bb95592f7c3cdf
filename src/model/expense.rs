use crate::error::{Error, ErrorType};
use crate::model::{ensure_non_negative, record_total, Amount, Month, Record, RecordKind};
use crate::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The seven expense categories of one month.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExpenseBreakdown {
    pub housing: Amount,
    pub food: Amount,
    pub going_out: Amount,
    pub transportation: Amount,
    pub travel: Amount,
    pub tax: Amount,
    pub other: Amount,
}

impl ExpenseBreakdown {
    /// The amounts in column order.
    pub fn to_vec(&self) -> Vec<Amount> {
        vec![
            self.housing,
            self.food,
            self.going_out,
            self.transportation,
            self.travel,
            self.tax,
            self.other,
        ]
    }

    /// Sum of all categories, or `None` if it cannot be represented.
    pub fn checked_total(&self) -> Option<Amount> {
        Amount::checked_sum(self.to_vec())
    }

    /// Category-wise sum, or `None` if any category overflows.
    pub fn checked_add(&self, rhs: &ExpenseBreakdown) -> Option<ExpenseBreakdown> {
        Some(ExpenseBreakdown {
            housing: self.housing.checked_add(rhs.housing)?,
            food: self.food.checked_add(rhs.food)?,
            going_out: self.going_out.checked_add(rhs.going_out)?,
            transportation: self.transportation.checked_add(rhs.transportation)?,
            travel: self.travel.checked_add(rhs.travel)?,
            tax: self.tax.checked_add(rhs.tax)?,
            other: self.other.checked_add(rhs.other)?,
        })
    }
}

/// One month of expenses.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Expense {
    date: NaiveDate,
    #[serde(flatten)]
    breakdown: ExpenseBreakdown,
    total: Amount,
}

impl Expense {
    /// Builds an expense, normalizing `date` to the first day of its month.
    ///
    /// # Errors
    /// - `MalformedRecord` if any category amount is negative or the total cannot be represented.
    pub fn new(date: NaiveDate, breakdown: ExpenseBreakdown) -> Result<Self> {
        let amounts = breakdown.to_vec();
        ensure_non_negative(RecordKind::Expense, &amounts)?;
        Ok(Self {
            date: Month::from_date(date).first_day(),
            total: record_total(RecordKind::Expense, &amounts)?,
            breakdown,
        })
    }

    pub fn breakdown(&self) -> &ExpenseBreakdown {
        &self.breakdown
    }

    pub fn housing(&self) -> Amount {
        self.breakdown.housing
    }

    pub fn food(&self) -> Amount {
        self.breakdown.food
    }

    pub fn going_out(&self) -> Amount {
        self.breakdown.going_out
    }

    pub fn transportation(&self) -> Amount {
        self.breakdown.transportation
    }

    pub fn travel(&self) -> Amount {
        self.breakdown.travel
    }

    pub fn tax(&self) -> Amount {
        self.breakdown.tax
    }

    pub fn other(&self) -> Amount {
        self.breakdown.other
    }
}

impl Record for Expense {
    const KIND: RecordKind = RecordKind::Expense;

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn total(&self) -> Amount {
        self.total
    }

    fn amounts(&self) -> Vec<Amount> {
        self.breakdown.to_vec()
    }

    fn from_amounts(date: NaiveDate, amounts: &[Amount]) -> Result<Self> {
        let [housing, food, going_out, transportation, travel, tax, other] = amounts else {
            return Err(Error::msg(
                ErrorType::MalformedRecord,
                format!("An expense needs 7 amounts, got {}", amounts.len()),
            ));
        };
        Expense::new(
            date,
            ExpenseBreakdown {
                housing: *housing,
                food: *food,
                going_out: *going_out,
                transportation: *transportation,
                travel: *travel,
                tax: *tax,
                other: *other,
            },
        )
    }
}
