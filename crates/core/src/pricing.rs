//! Cart pricing: subtotal, shipping, tax and grand total.
//!
//! Pricing is a pure function of the cart lines. Both the cart view and the
//! checkout view compute totals from the same lines through [`calculate`], so
//! the two can never disagree.
//!
//! # Rules
//!
//! - `subtotal = Σ unit_price × quantity`
//! - `shipping = 0` when `subtotal > 1,000,000`, otherwise a flat `50,000`
//! - `tax = round(subtotal × 0.09)`, midpoints rounded up
//! - `total = subtotal + shipping + tax`
//!
//! A cart with nothing to pay for (zero subtotal) is not charged shipping, so
//! an empty cart prices to all zeros. Amounts saturate at [`Amount::MAX`]
//! rather than overflow, so pricing never panics on server-supplied prices.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Amount;

/// A cart line that can be priced.
pub trait PricedLine {
    /// Price of a single unit.
    fn unit_price(&self) -> Amount;

    /// Number of units on the line.
    fn quantity(&self) -> u32;

    /// `unit_price × quantity`.
    fn line_total(&self) -> Amount {
        self.unit_price().times(self.quantity())
    }
}

/// Shipping and tax constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingRules {
    /// Subtotals strictly above this ship free.
    pub free_shipping_threshold: Amount,
    /// Flat shipping fee charged at or below the threshold.
    pub flat_shipping_fee: Amount,
    /// Tax rate applied to the subtotal.
    pub tax_rate: Decimal,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Amount::new(1_000_000),
            flat_shipping_fee: Amount::new(50_000),
            tax_rate: Decimal::new(9, 2),
        }
    }
}

/// Pricing breakdown for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Amount,
    pub shipping: Amount,
    pub tax: Amount,
    pub total: Amount,
}

/// Price a set of lines with the default rules.
#[must_use]
pub fn calculate<L: PricedLine>(lines: &[L]) -> CartTotals {
    PricingRules::default().calculate(lines)
}

impl PricingRules {
    /// Price a set of lines.
    #[must_use]
    pub fn calculate<L: PricedLine>(&self, lines: &[L]) -> CartTotals {
        let subtotal: Amount = lines.iter().map(PricedLine::line_total).sum();
        let shipping = self.shipping_for(subtotal);
        let tax = subtotal.apply_rate(self.tax_rate);

        CartTotals {
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
        }
    }

    /// Shipping fee for a given subtotal.
    #[must_use]
    pub fn shipping_for(&self, subtotal: Amount) -> Amount {
        if subtotal.is_zero() || subtotal > self.free_shipping_threshold {
            Amount::ZERO
        } else {
            self.flat_shipping_fee
        }
    }
}
