//! Purchase periods and analysis horizons.
//!
//! A [`Period`] is a calendar year, quarter or month. Periods of the same
//! [`Granularity`] are totally ordered, so a [`Horizon`] can enumerate every
//! period between the first and last observed purchase, including periods in
//! which nothing was bought.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sub-year resolution used to bucket purchase dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Calendar year
    Year,
    /// Calendar quarter
    Quarter,
    /// Calendar month
    Month,
}

impl Granularity {
    /// Number of periods in one calendar year.
    pub const fn periods_per_year(&self) -> u8 {
        match self {
            Self::Year => 1,
            Self::Quarter => 4,
            Self::Month => 12,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Year => "year",
            Self::Quarter => "quarter",
            Self::Month => "month",
        };
        write!(f, "{}", name)
    }
}

/// A calendar period at a given granularity.
///
/// `index` is 1-based within the year: always 1 for years, 1..=4 for
/// quarters and 1..=12 for months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    /// Calendar year
    pub year: i32,
    /// Position within the year (1-based)
    pub index: u8,
    /// Resolution of this period
    pub granularity: Granularity,
}

impl Period {
    /// Period containing `date`.
    pub fn from_date(date: NaiveDate, granularity: Granularity) -> Self {
        let index = match granularity {
            Granularity::Year => 1,
            Granularity::Quarter => (date.month0() / 3 + 1) as u8,
            Granularity::Month => date.month() as u8,
        };
        Self {
            year: date.year(),
            index,
            granularity,
        }
    }

    /// The whole calendar year as a period.
    pub const fn year(year: i32) -> Self {
        Self {
            year,
            index: 1,
            granularity: Granularity::Year,
        }
    }

    /// Linear position of the period, counting from year zero.
    pub fn ordinal(&self) -> i64 {
        let per_year = i64::from(self.granularity.periods_per_year());
        i64::from(self.year) * per_year + i64::from(self.index) - 1
    }

    /// The period immediately after this one.
    pub const fn next(&self) -> Self {
        if self.index >= self.granularity.periods_per_year() {
            Self {
                year: self.year + 1,
                index: 1,
                granularity: self.granularity,
            }
        } else {
            Self {
                year: self.year,
                index: self.index + 1,
                granularity: self.granularity,
            }
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.granularity {
            Granularity::Year => write!(f, "{}", self.year),
            Granularity::Quarter => write!(f, "{}-Q{}", self.year, self.index),
            Granularity::Month => write!(f, "{}-{:02}", self.year, self.index),
        }
    }
}

/// Inclusive range of periods covered by an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Horizon {
    /// First period
    pub first: Period,
    /// Last period (inclusive)
    pub last: Period,
}

impl Horizon {
    /// Build a horizon, ordering the endpoints.
    pub fn new(a: Period, b: Period) -> Self {
        if a <= b {
            Self { first: a, last: b }
        } else {
            Self { first: b, last: a }
        }
    }

    /// Widen the horizon so it covers `period`.
    pub fn include(&mut self, period: Period) {
        if period < self.first {
            self.first = period;
        }
        if period > self.last {
            self.last = period;
        }
    }

    /// Number of periods in the horizon.
    pub fn len(&self) -> usize {
        (self.last.ordinal() - self.first.ordinal() + 1).max(0) as usize
    }

    /// A horizon always holds at least one period.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Every period from `first` through `last`, in order.
    pub fn periods(&self) -> Vec<Period> {
        let mut periods = Vec::with_capacity(self.len());
        let mut current = self.first;
        while current <= self.last {
            periods.push(current);
            current = current.next();
        }
        periods
    }

    /// Zero-based offset of `period` within the horizon.
    pub fn position(&self, period: Period) -> Option<usize> {
        if period < self.first || period > self.last {
            return None;
        }
        Some((period.ordinal() - self.first.ordinal()) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(Granularity::Year, 1)]
    #[case(Granularity::Quarter, 3)]
    #[case(Granularity::Month, 8)]
    fn test_period_from_date(#[case] granularity: Granularity, #[case] index: u8) {
        let period = Period::from_date(date(2022, 8, 15), granularity);
        assert_eq!(period.year, 2022);
        assert_eq!(period.index, index);
    }

    #[test]
    fn test_next_rolls_over_year() {
        let dec = Period::from_date(date(2021, 12, 1), Granularity::Month);
        let jan = dec.next();
        assert_eq!(jan.year, 2022);
        assert_eq!(jan.index, 1);

        let q4 = Period::from_date(date(2021, 11, 1), Granularity::Quarter);
        assert_eq!(q4.next().to_string(), "2022-Q1");
    }

    #[test]
    fn test_horizon_enumerates_gaps() {
        let first = Period::from_date(date(2020, 11, 3), Granularity::Month);
        let last = Period::from_date(date(2021, 2, 20), Granularity::Month);
        let horizon = Horizon::new(last, first);

        let labels: Vec<String> = horizon.periods().iter().map(|p| p.to_string()).collect();
        assert_eq!(labels, vec!["2020-11", "2020-12", "2021-01", "2021-02"]);
        assert_eq!(horizon.len(), 4);
        assert_eq!(horizon.position(last), Some(3));
        assert_eq!(
            horizon.position(Period::from_date(date(2021, 3, 1), Granularity::Month)),
            None
        );
    }

    #[test]
    fn test_horizon_include() {
        let mut horizon = Horizon::new(Period::year(2021), Period::year(2021));
        horizon.include(Period::year(2023));
        horizon.include(Period::year(2020));
        assert_eq!(horizon.len(), 4);
        assert_eq!(horizon.first, Period::year(2020));
    }
}
