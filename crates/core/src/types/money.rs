//! Integer money amounts in the smallest currency unit.
//!
//! The shop prices livestock in whole New Taiwan dollars, so amounts are
//! plain integers. Formatting groups thousands the way the original pages
//! did (`NT$ 1,800`).

use std::iter::Sum;
use std::ops::{Add, Mul};

use serde::{Deserialize, Serialize};

/// Default currency prefix shown before amounts.
pub const DEFAULT_CURRENCY: &str = "NT$";

/// An amount in the smallest currency unit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Get the raw amount.
    #[must_use]
    pub const fn amount(self) -> i64 {
        self.0
    }

    /// Whether the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Format with a currency prefix, e.g. `NT$ 1,800`.
    #[must_use]
    pub fn display(self, currency: &str) -> String {
        format!("{currency} {}", group_thousands(self.0))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self::Output {
        Self(self.0.saturating_mul(i64::from(rhs)))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<i64> for Money {
    fn from(amount: i64) -> Self {
        Self(amount)
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Money::new(0).display("NT$"), "NT$ 0");
        assert_eq!(Money::new(600).display("NT$"), "NT$ 600");
        assert_eq!(Money::new(1800).display("NT$"), "NT$ 1,800");
        assert_eq!(Money::new(1_234_567).display("NT$"), "NT$ 1,234,567");
        assert_eq!(Money::new(-12_000).display("$"), "$ -12,000");
    }

    #[test]
    fn test_arithmetic_saturates() {
        assert_eq!(Money::new(600) * 3, Money::new(1800));
        assert_eq!(Money::new(i64::MAX) + Money::new(1), Money::new(i64::MAX));
        let total: Money = [Money::new(1), Money::new(2), Money::new(3)].into_iter().sum();
        assert_eq!(total, Money::new(6));
    }
}
