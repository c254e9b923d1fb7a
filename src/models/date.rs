//! Calendar date and month types with strict German textual forms
//!
//! Bank exports and stored sessions carry dates as "DD.MM.YYYY" strings and
//! month-granularity filter bounds as "MM.YYYY". Both wrap chrono types so
//! that month lengths and leap years come out right.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{LedgerError, LedgerResult};

/// A calendar date in the strict textual form "DD.MM.YYYY"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LedgerDate(NaiveDate);

impl LedgerDate {
    /// Parse a "DD.MM.YYYY" string
    ///
    /// The string must split into exactly three numeric components and must
    /// name a valid calendar date ("30.02.2024" is rejected).
    pub fn parse(s: &str) -> LedgerResult<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(LedgerError::DateFormat(s.to_string()));
        }
        let day: u32 = parts[0]
            .trim()
            .parse()
            .map_err(|_| LedgerError::DateFormat(s.to_string()))?;
        let month: u32 = parts[1]
            .trim()
            .parse()
            .map_err(|_| LedgerError::DateFormat(s.to_string()))?;
        let year: i32 = parts[2]
            .trim()
            .parse()
            .map_err(|_| LedgerError::DateFormat(s.to_string()))?;

        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| LedgerError::DateFormat(s.to_string()))
    }

    /// Get the underlying chrono date
    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    /// Get the month bucket this date falls into
    pub fn month(&self) -> Month {
        Month {
            year: self.0.year(),
            month: self.0.month(),
        }
    }
}

impl From<NaiveDate> for LedgerDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for LedgerDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}.{:02}.{:04}",
            self.0.day(),
            self.0.month(),
            self.0.year()
        )
    }
}

impl FromStr for LedgerDate {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for LedgerDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for LedgerDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A month-granularity bucket in the textual form "MM.YYYY"
///
/// Field order matters for the derived ordering: years compare before months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

impl Month {
    /// Parse a "MM.YYYY" string
    pub fn parse(s: &str) -> LedgerResult<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 2 {
            return Err(LedgerError::MonthFormat(s.to_string()));
        }
        let month: u32 = parts[0]
            .trim()
            .parse()
            .map_err(|_| LedgerError::MonthFormat(s.to_string()))?;
        let year: i32 = parts[1]
            .trim()
            .parse()
            .map_err(|_| LedgerError::MonthFormat(s.to_string()))?;
        if !(1..=12).contains(&month) {
            return Err(LedgerError::MonthFormat(s.to_string()));
        }
        Ok(Self { year, month })
    }

    /// First calendar day of this month
    pub fn first_day(&self) -> NaiveDate {
        // Month is always validated to 1..=12
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("validated month")
    }

    /// Last calendar day of this month, leap years included
    pub fn last_day(&self) -> NaiveDate {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .expect("validated month")
            .pred_opt()
            .expect("not the first representable date")
    }

    /// Human-readable label, e.g. "Mar 2024"
    pub fn label(&self) -> String {
        format!("{} {}", MONTH_NAMES[self.month as usize - 1], self.year)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:04}", self.month, self.year)
    }
}

impl FromStr for Month {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
