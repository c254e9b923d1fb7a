//! Money type for representing currency amounts
//!
//! Internally stores amounts in cents (i64) to avoid floating-point precision
//! issues. On the wire (stored JSON, session exports) a `Money` value is a
//! plain decimal number, matching the bank-export shape of the data.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{LedgerError, LedgerResult};

/// A monetary amount stored as cents (hundredths of the currency unit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    /// Create a Money amount from cents
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Create a zero Money amount
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Get the amount in cents
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Get the amount as a floating point number of currency units
    pub fn as_units(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Check if the amount is zero
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Check if the amount is negative (an expense)
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Get the absolute value
    pub const fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Parse a German-format decimal amount, e.g. "1.234,56" or "-42,00"
    ///
    /// Thousands separators (".") are stripped, the comma is the decimal
    /// separator. This is the number format of German bank CSV exports.
    pub fn parse_german(s: &str) -> LedgerResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LedgerError::Validation("Amount is empty".into()));
        }
        let sanitized = s.replace('.', "").replace(',', ".");
        let units: f64 = sanitized
            .parse()
            .map_err(|_| LedgerError::Validation(format!("Invalid amount: {}", s)))?;
        Ok(Self::from_units(units))
    }

    /// Create a Money amount from a floating point number of currency units
    pub fn from_units(units: f64) -> Self {
        Self((units * 100.0).round() as i64)
    }

    /// Format as a de-DE locale currency string, e.g. "-1.234,56 €"
    ///
    /// Mirrors `Intl.NumberFormat('de-DE', {style: 'currency'})`: grouped
    /// thousands with ".", comma decimals, non-breaking space before the
    /// currency symbol.
    pub fn format_eur(&self) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        let abs = self.0.abs();
        let whole = abs / 100;
        let cents = abs % 100;

        let mut grouped = String::new();
        let digits = whole.to_string();
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }

        format!("{}{},{:02}\u{a0}€", sign, grouped, cents)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_eur())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_units())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let units = f64::deserialize(deserializer)?;
        Ok(Self::from_units(units))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_german() {
        assert_eq!(Money::parse_german("1.234,56").unwrap().cents(), 123456);
        assert_eq!(Money::parse_german("-42,00").unwrap().cents(), -4200);
        assert_eq!(Money::parse_german("0,99").unwrap().cents(), 99);
        assert_eq!(Money::parse_german("17").unwrap().cents(), 1700);
        assert!(Money::parse_german("").is_err());
        assert!(Money::parse_german("abc").is_err());
    }

    #[test]
    fn test_format_eur() {
        assert_eq!(Money::from_cents(-123456).format_eur(), "-1.234,56\u{a0}€");
        assert_eq!(Money::from_cents(-4200).format_eur(), "-42,00\u{a0}€");
        assert_eq!(Money::from_cents(0).format_eur(), "0,00\u{a0}€");
        assert_eq!(Money::from_cents(100000000).format_eur(), "1.000.000,00\u{a0}€");
    }

    #[test]
    fn test_serde_as_decimal_number() {
        let m = Money::from_cents(-4250);
        assert_eq!(serde_json::to_string(&m).unwrap(), "-42.5");

        let m: Money = serde_json::from_str("-42.5").unwrap();
        assert_eq!(m.cents(), -4250);

        // Whole numbers round-trip as well
        let m: Money = serde_json::from_str("100").unwrap();
        assert_eq!(m.cents(), 10000);
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(150);
        let b = Money::from_cents(-250);
        assert_eq!((a + b).cents(), -100);
        assert_eq!((a - b).cents(), 400);
        assert_eq!((-a).cents(), -150);
        assert!(b.is_negative());
        assert_eq!(b.abs().cents(), 250);

        let total: Money = [a, b, Money::from_cents(50)].into_iter().sum();
        assert_eq!(total.cents(), -50);
    }
}
