//! The `Month` type, a calendar month without a day.

use anyhow::{bail, Context};
use chrono::{Datelike, Local, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A calendar month (year + month). Internally this is the first day of the month, which makes
/// every `Month` valid by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(NaiveDate);

impl Month {
    /// Returns `None` when `month` is not in `1..=12` or `year` is out of chrono's range.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    /// The month containing `date`. The day is discarded.
    pub fn from_date(date: NaiveDate) -> Self {
        // Day 1 exists in every month, so subtracting `day0` cannot leave the month.
        Self(date - chrono::Days::new(u64::from(date.day0())))
    }

    /// The month containing today's date in the local timezone.
    pub fn current() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    pub fn checked_sub(&self, months: u32) -> Option<Self> {
        self.0.checked_sub_months(Months::new(months)).map(Self)
    }

    pub fn checked_add(&self, months: u32) -> Option<Self> {
        self.0.checked_add_months(Months::new(months)).map(Self)
    }

    /// The following month, `None` at the end of chrono's range.
    pub fn succ(&self) -> Option<Self> {
        self.checked_add(1)
    }

    /// True when `date` falls inside this month.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year() && date.month() == self.month()
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

impl FromStr for Month {
    type Err = anyhow::Error;

    /// Accepts `yyyy-MM` or `yyyy-MM-dd`; the day is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self::from_date(date));
        }
        let (year, month) = match s.split_once('-') {
            Some(parts) => parts,
            None => bail!("Invalid month '{s}', expected yyyy-MM"),
        };
        let year: i32 = year
            .parse()
            .with_context(|| format!("Invalid year in month '{s}'"))?;
        let month: u32 = month
            .parse()
            .with_context(|| format!("Invalid month number in month '{s}'"))?;
        Self::new(year, month).with_context(|| format!("Month '{s}' does not exist"))
    }
}

impl From<NaiveDate> for Month {
    fn from(value: NaiveDate) -> Self {
        Self::from_date(value)
    }
}

impl Serialize for Month {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Month::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(s: &str) -> Month {
        Month::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_month_and_date() {
        assert_eq!(m("2024-06"), Month::new(2024, 6).unwrap());
        assert_eq!(m("2024-06-17"), Month::new(2024, 6).unwrap());
        assert_eq!(m("2024-6"), Month::new(2024, 6).unwrap());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Month::from_str("2024").is_err());
        assert!(Month::from_str("2024-13").is_err());
        assert!(Month::from_str("June 2024").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(m("2024-03-31").to_string(), "2024-03");
    }

    #[test]
    fn test_from_date_discards_day() {
        let date = NaiveDate::from_ymd_opt(2023, 2, 28).unwrap();
        let month = Month::from_date(date);
        assert_eq!(month.first_day(), NaiveDate::from_ymd_opt(2023, 2, 1).unwrap());
        assert!(month.contains(date));
    }

    #[test]
    fn test_arithmetic_crosses_years() {
        assert_eq!(m("2024-02").checked_sub(3), Some(m("2023-11")));
        assert_eq!(m("2023-12").succ(), Some(m("2024-01")));
        assert_eq!(m("2024-06").checked_sub(0), Some(m("2024-06")));
    }

    #[test]
    fn test_arithmetic_out_of_range() {
        let earliest = Month::from_date(NaiveDate::MIN);
        assert_eq!(earliest.checked_sub(1), None);
    }

    #[test]
    fn test_ordering() {
        assert!(m("2023-12") < m("2024-01"));
    }

    #[test]
    fn test_serde() {
        let json = serde_json::to_string(&m("2024-05")).unwrap();
        assert_eq!(json, "\"2024-05\"");
        let back: Month = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m("2024-05"));
    }
}
