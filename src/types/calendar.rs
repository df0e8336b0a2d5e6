//! Calendar months for monthly-mean time series.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar month, e.g. `2012-07`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    /// Year
    pub year: i32,
    /// Month, 1 to 12
    pub month: u32,
}

impl YearMonth {
    /// Create a month; `None` if `month` is not in 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The month after this one.
    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// First day of the month.
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Number of days in the month (leap years included).
    pub fn days(self) -> u32 {
        match (self.first_day(), self.succ().first_day()) {
            (Some(start), Some(end)) => (end - start).num_days() as u32,
            // Outside chrono's range; fall back to the Gregorian rule.
            _ => match self.month {
                2 if is_leap(self.year) => 29,
                2 => 28,
                4 | 6 | 9 | 11 => 30,
                _ => 31,
            },
        }
    }

    /// Inclusive range of months `first..=last`, empty if `last < first`.
    pub fn range_inclusive(first: Self, last: Self) -> Vec<Self> {
        let mut months = Vec::new();
        let mut current = first;
        while current <= last {
            months.push(current);
            current = current.succ();
        }
        months
    }

    /// Month containing the given date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

fn is_leap(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    /// Parse `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got '{s}'"))?;
        let year: i32 = year.parse().map_err(|_| format!("invalid year in '{s}'"))?;
        let month: u32 = month.parse().map_err(|_| format!("invalid month in '{s}'"))?;
        Self::new(year, month).ok_or_else(|| format!("month out of range in '{s}'"))
    }
}

/// Weights proportional to the number of days per month, normalized to mean 1.
///
/// Averaging monthly means with these weights lets every calendar day
/// contribute equally.
pub fn day_weights(months: &[YearMonth]) -> Vec<f64> {
    if months.is_empty() {
        return Vec::new();
    }
    let days: Vec<f64> = months.iter().map(|m| m.days() as f64).collect();
    let mean = days.iter().sum::<f64>() / days.len() as f64;
    days.into_iter().map(|d| d / mean).collect()
}
