//! Order total computation.
//!
//! A pure function of the supplied lines and the configured policy: no
//! catalog lookups, no side effects. Callers resolve each line's unit price
//! first (live price for cart previews, frozen price for orders).

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Configured tax rate and flat shipping fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Flat tax rate applied to the subtotal.
    pub tax_rate: Decimal,
    /// Flat per-order shipping fee, independent of item count or weight.
    pub shipping_fee: Decimal,
}

impl PricingPolicy {
    /// Default tax rate: 18%.
    pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(18, 0, 0, false, 2);
    /// Default flat shipping fee: 15.00.
    pub const DEFAULT_SHIPPING_FEE: Decimal = Decimal::from_parts(1500, 0, 0, false, 2);

    /// Compute totals over `(unit_price, quantity)` pairs.
    ///
    /// Intermediate math runs at full precision; each component is rounded
    /// to currency precision (2 decimal places) once, at this boundary, and
    /// the total is the exact sum of the rounded components.
    ///
    /// An empty line set prices to zero across the board - the shipping fee
    /// applies per order, and no lines means no order.
    #[must_use]
    pub fn price<I>(&self, lines: I) -> OrderTotals
    where
        I: IntoIterator<Item = (Decimal, i32)>,
    {
        let mut subtotal = Decimal::ZERO;
        let mut any = false;
        for (unit_price, quantity) in lines {
            subtotal += unit_price * Decimal::from(quantity);
            any = true;
        }
        if !any {
            return OrderTotals::zero();
        }

        let subtotal = round_currency(subtotal);
        let tax = round_currency(subtotal * self.tax_rate);
        let shipping = round_currency(self.shipping_fee);
        OrderTotals {
            subtotal,
            tax,
            shipping,
            total: subtotal + tax + shipping,
        }
    }
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: Self::DEFAULT_TAX_RATE,
            shipping_fee: Self::DEFAULT_SHIPPING_FEE,
        }
    }
}

/// Computed order totals. Always satisfies `total = subtotal + tax + shipping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// All-zero totals (empty cart preview), at currency precision.
    #[must_use]
    pub const fn zero() -> Self {
        const ZERO: Decimal = Decimal::from_parts(0, 0, 0, false, 2);
        Self {
            subtotal: ZERO,
            tax: ZERO,
            shipping: ZERO,
            total: ZERO,
        }
    }
}

/// Round to 2 decimal places, midpoints away from zero.
fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn money(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn test_default_policy_rates() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.tax_rate, money(18));
        assert_eq!(policy.shipping_fee, money(1500));
    }

    #[test]
    fn test_total_arithmetic() {
        // subtotal 100.00, tax rate 0.18, shipping 15.00 -> total 133.00
        let totals = PricingPolicy::default().price([(money(10000), 1)]);
        assert_eq!(totals.subtotal, money(10000));
        assert_eq!(totals.tax, money(1800));
        assert_eq!(totals.shipping, money(1500));
        assert_eq!(totals.total, money(13300));
    }

    #[test]
    fn test_quantity_multiplies_unit_price() {
        // 3 x 10.00 -> subtotal 30.00, tax 5.40, total 50.40
        let totals = PricingPolicy::default().price([(money(1000), 3)]);
        assert_eq!(totals.subtotal, money(3000));
        assert_eq!(totals.tax, money(540));
        assert_eq!(totals.total, money(5040));
    }

    #[test]
    fn test_multiple_lines_sum() {
        let totals = PricingPolicy::default().price([(money(1000), 2), (money(250), 4)]);
        assert_eq!(totals.subtotal, money(3000));
    }

    #[test]
    fn test_total_is_exact_sum_of_components() {
        // A price that forces rounding in the tax component.
        let totals = PricingPolicy::default().price([(money(999), 3)]);
        assert_eq!(totals.subtotal, money(2997));
        // 29.97 * 0.18 = 5.3946 -> 5.39
        assert_eq!(totals.tax, money(539));
        assert_eq!(totals.total, totals.subtotal + totals.tax + totals.shipping);
    }

    #[test]
    fn test_empty_lines_price_to_zero() {
        let totals = PricingPolicy::default().price(Vec::<(Decimal, i32)>::new());
        assert_eq!(totals, OrderTotals::zero());
    }

    #[test]
    fn test_custom_policy() {
        let policy = PricingPolicy {
            tax_rate: money(10),
            shipping_fee: money(500),
        };
        let totals = policy.price([(money(2000), 1)]);
        assert_eq!(totals.tax, money(200));
        assert_eq!(totals.shipping, money(500));
        assert_eq!(totals.total, money(2700));
    }
}
