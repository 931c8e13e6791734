//! Type-safe monetary amounts using decimal arithmetic.
//!
//! The storefront backend prices everything in whole currency units with no
//! minor unit and no currency code, so an [`Amount`] is a bare decimal. It is
//! kept as a [`Decimal`] rather than an integer so percentage rules (tax) can
//! be applied exactly before rounding.

use std::iter::Sum;
use std::ops::Add;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A monetary amount in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// The largest representable amount. Arithmetic saturates here.
    pub const MAX: Self = Self(Decimal::MAX);

    /// Create an amount from a whole number of currency units.
    #[must_use]
    pub fn new(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// Create an amount from an arbitrary decimal.
    #[must_use]
    pub const fn from_decimal(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Multiply a unit price by a line quantity, saturating at [`Amount::MAX`].
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }

    /// Multiply a unit price by a line quantity, or `None` on overflow.
    #[must_use]
    pub fn checked_times(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(quantity)).map(Self)
    }

    /// Apply a rate (e.g. `0.09` for 9%) and round to whole units.
    ///
    /// Midpoints round away from zero, which for the non-negative amounts a
    /// cart produces is the same as rounding half up.
    #[must_use]
    pub fn apply_rate(self, rate: Decimal) -> Self {
        Self(
            self.0
                .saturating_mul(rate)
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Add for Amount {
    type Output = Self;

    /// Saturates at [`Amount::MAX`] / `Decimal::MIN`.
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_deserialize_from_number_and_string() {
        let from_number: Amount = serde_json::from_str("250000").unwrap();
        let from_string: Amount = serde_json::from_str("\"250000\"").unwrap();
        assert_eq!(from_number, Amount::new(250_000));
        assert_eq!(from_string, Amount::new(250_000));
    }

    #[test]
    fn test_times() {
        assert_eq!(Amount::new(150_000).times(3), Amount::new(450_000));
        assert_eq!(Amount::new(150_000).times(0), Amount::ZERO);
    }

    #[test]
    fn test_times_saturates_on_overflow() {
        let huge = Amount::from_decimal(Decimal::from_str("50000000000000000000000000000").unwrap());
        assert_eq!(huge.times(2), Amount::MAX);
        assert!(huge.checked_times(2).is_none());
        assert_eq!(Amount::new(7).checked_times(3), Some(Amount::new(21)));
    }

    #[test]
    fn test_add_saturates_on_overflow() {
        assert_eq!(Amount::MAX + Amount::new(1), Amount::MAX);
    }

    #[test]
    fn test_apply_rate_rounds_half_up() {
        let rate = Decimal::from_str("0.09").unwrap();
        // 50 * 0.09 = 4.5
        assert_eq!(Amount::new(50).apply_rate(rate), Amount::new(5));
        // 49 * 0.09 = 4.41
        assert_eq!(Amount::new(49).apply_rate(rate), Amount::new(4));
    }

    #[test]
    fn test_sum() {
        let total: Amount = [Amount::new(1), Amount::new(2), Amount::new(3)]
            .into_iter()
            .sum();
        assert_eq!(total, Amount::new(6));
    }

    #[test]
    fn test_display_normalizes() {
        let amount = Amount::from_decimal(Decimal::from_str("758500.00").unwrap());
        assert_eq!(amount.to_string(), "758500");
    }
}
