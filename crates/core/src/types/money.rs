//! Money helpers and order total computation.
//!
//! All money values are [`Decimal`]s in the store currency's standard unit.
//! Intermediate arithmetic keeps full precision; rounding to two places
//! happens only at the persistence/response edge via [`round_money`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sales tax applied to every order, as a fraction of the subtotal.
pub const TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2); // 0.10

/// Orders with a subtotal strictly above this ship free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(50, 0, 0, false, 0); // 50

/// Flat shipping fee below the free-shipping threshold.
pub const FLAT_SHIPPING_FEE: Decimal = Decimal::from_parts(999, 0, 0, false, 2); // 9.99

/// Round a money amount to two decimal places (banker's-free, half-up).
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

/// Computed totals for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Compute tax, shipping, and total from a full-precision subtotal.
    ///
    /// Tax is [`TAX_RATE`] of the subtotal; shipping is waived when the
    /// subtotal exceeds [`FREE_SHIPPING_THRESHOLD`], otherwise the flat fee
    /// applies. All fields are rounded to two places.
    #[must_use]
    pub fn from_subtotal(subtotal: Decimal) -> Self {
        let tax = subtotal * TAX_RATE;
        let shipping = if subtotal > FREE_SHIPPING_THRESHOLD {
            Decimal::ZERO
        } else {
            FLAT_SHIPPING_FEE
        };
        let total = subtotal + tax + shipping;

        Self {
            subtotal: round_money(subtotal),
            tax: round_money(tax),
            shipping: round_money(shipping),
            total: round_money(total),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_constants() {
        assert_eq!(TAX_RATE, dec("0.10"));
        assert_eq!(FREE_SHIPPING_THRESHOLD, dec("50"));
        assert_eq!(FLAT_SHIPPING_FEE, dec("9.99"));
    }

    #[test]
    fn test_totals_under_free_shipping_threshold() {
        // 2 x 20.00: subtotal 40, tax 4, flat shipping, total 53.99
        let totals = OrderTotals::from_subtotal(dec("40.00"));
        assert_eq!(totals.subtotal, dec("40.00"));
        assert_eq!(totals.tax, dec("4.00"));
        assert_eq!(totals.shipping, dec("9.99"));
        assert_eq!(totals.total, dec("53.99"));
    }

    #[test]
    fn test_totals_above_free_shipping_threshold() {
        let totals = OrderTotals::from_subtotal(dec("60.00"));
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.total, dec("66.00"));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // Exactly 50.00 still pays the flat fee
        let totals = OrderTotals::from_subtotal(dec("50.00"));
        assert_eq!(totals.shipping, dec("9.99"));
    }

    #[test]
    fn test_tax_computed_before_rounding() {
        // 3 x 6.99 = 20.97; tax = 2.097 -> rounds to 2.10;
        // total = 20.97 + 2.097 + 9.99 = 33.057 -> 33.06
        let totals = OrderTotals::from_subtotal(dec("20.97"));
        assert_eq!(totals.tax, dec("2.10"));
        assert_eq!(totals.total, dec("33.06"));
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(dec("1.005")), dec("1.01"));
        assert_eq!(round_money(dec("1.004")), dec("1.00"));
    }
}
