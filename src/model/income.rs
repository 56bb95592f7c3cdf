use crate::error::{Error, ErrorType};
use crate::model::{ensure_non_negative, record_total, Amount, Month, Record, RecordKind};
use crate::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The five income sources of one month.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IncomeSources {
    pub salary: Amount,
    pub help: Amount,
    pub entrepreneur: Amount,
    pub passive: Amount,
    pub other: Amount,
}

impl IncomeSources {
    /// The amounts in column order.
    pub fn to_vec(&self) -> Vec<Amount> {
        vec![
            self.salary,
            self.help,
            self.entrepreneur,
            self.passive,
            self.other,
        ]
    }

    /// Sum of all sources, or `None` if it cannot be represented.
    pub fn checked_total(&self) -> Option<Amount> {
        Amount::checked_sum(self.to_vec())
    }
}

/// One month of income.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Income {
    date: NaiveDate,
    #[serde(flatten)]
    sources: IncomeSources,
    total: Amount,
}

impl Income {
    /// Builds an income record, normalizing `date` to the first day of its month.
    ///
    /// # Errors
    /// - `MalformedRecord` if any source amount is negative or the total cannot be represented.
    pub fn new(date: NaiveDate, sources: IncomeSources) -> Result<Self> {
        let amounts = sources.to_vec();
        ensure_non_negative(RecordKind::Income, &amounts)?;
        Ok(Self {
            date: Month::from_date(date).first_day(),
            total: record_total(RecordKind::Income, &amounts)?,
            sources,
        })
    }

    pub fn sources(&self) -> &IncomeSources {
        &self.sources
    }

    pub fn salary(&self) -> Amount {
        self.sources.salary
    }

    pub fn help(&self) -> Amount {
        self.sources.help
    }

    pub fn entrepreneur(&self) -> Amount {
        self.sources.entrepreneur
    }

    pub fn passive(&self) -> Amount {
        self.sources.passive
    }

    pub fn other(&self) -> Amount {
        self.sources.other
    }
}

impl Record for Income {
    const KIND: RecordKind = RecordKind::Income;

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn total(&self) -> Amount {
        self.total
    }

    fn amounts(&self) -> Vec<Amount> {
        self.sources.to_vec()
    }

    fn from_amounts(date: NaiveDate, amounts: &[Amount]) -> Result<Self> {
        let [salary, help, entrepreneur, passive, other] = amounts else {
            return Err(Error::msg(
                ErrorType::MalformedRecord,
                format!("An income needs 5 amounts, got {}", amounts.len()),
            ));
        };
        Income::new(
            date,
            IncomeSources {
                salary: *salary,
                help: *help,
                entrepreneur: *entrepreneur,
                passive: *passive,
                other: *other,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn amt(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    #[test]
    fn test_total_is_sum_of_sources() {
        let sources = IncomeSources {
            salary: amt("2500.33"),
            help: amt("100"),
            entrepreneur: amt("0.01"),
            passive: amt("42.5"),
            other: amt("7"),
        };
        let i = Income::new(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(), sources).unwrap();
        assert_eq!(Some(i.total()), sources.checked_total());
        assert_eq!(i.total(), amt("2649.84"));
        assert_eq!(i.date(), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }

    #[test]
    fn test_all_zero() {
        let i = Income::new(
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            IncomeSources::default(),
        )
        .unwrap();
        assert!(i.total().is_zero());
    }

    #[test]
    fn test_negative_source_is_rejected() {
        let sources = IncomeSources {
            passive: amt("-3"),
            ..IncomeSources::default()
        };
        let err = Income::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), sources).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::MalformedRecord);
    }

    #[test]
    fn test_unrepresentable_total_is_rejected() {
        let half = Amount::new(Decimal::MAX / Decimal::TWO);
        let sources = IncomeSources {
            salary: half,
            passive: half,
            other: half,
            ..IncomeSources::default()
        };
        let err = Income::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), sources).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::MalformedRecord);
    }
}
