//! Totals

use rust_decimal::{Decimal, RoundingStrategy};
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

/// Errors that can occur while rendering amounts as money.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    /// The amount does not fit in `i64` minor units.
    #[error("amount {0} cannot be represented in minor units")]
    MinorUnits(Decimal),
}

/// Monetary totals derived from a cart and an optional coupon.
///
/// Never stored on its own; always recomputed from the lines it describes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    subtotal: Decimal,
    product_discount: Decimal,
    coupon_discount: Decimal,
    final_total: Decimal,
    currency: &'static Currency,
}

impl Totals {
    /// Totals of an empty cart.
    #[must_use]
    pub fn empty(currency: &'static Currency) -> Self {
        Self::new(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, currency)
    }

    pub(crate) fn new(
        subtotal: Decimal,
        product_discount: Decimal,
        coupon_discount: Decimal,
        currency: &'static Currency,
    ) -> Self {
        Self {
            subtotal,
            product_discount,
            coupon_discount,
            final_total: subtotal.saturating_sub(coupon_discount),
            currency,
        }
    }

    /// Sum of effective line prices.
    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    /// Savings from variant discounts already folded into the subtotal.
    pub fn product_discount(&self) -> Decimal {
        self.product_discount
    }

    /// Discount granted by the coupon.
    pub fn coupon_discount(&self) -> Decimal {
        self.coupon_discount
    }

    /// Subtotal minus coupon discount. May be negative for fixed-amount coupons.
    pub fn final_total(&self) -> Decimal {
        self.final_total
    }

    /// Final total floored at zero.
    #[must_use]
    pub fn amount_payable(&self) -> Decimal {
        self.final_total.max(Decimal::ZERO)
    }

    /// Product and coupon savings combined.
    #[must_use]
    pub fn savings(&self) -> Decimal {
        self.product_discount.saturating_add(self.coupon_discount)
    }

    /// Currency of every amount.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Render an amount in this currency.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::MinorUnits`] if the amount overflows `i64` minor units.
    pub fn money(&self, amount: Decimal) -> Result<Money<'static, Currency>, PricingError> {
        to_money(amount, self.currency)
    }
}

/// Convert a decimal amount into money, rounding to the currency's minor unit.
///
/// # Errors
///
/// Returns [`PricingError::MinorUnits`] if the amount overflows `i64` minor units.
pub fn to_money(
    amount: Decimal,
    currency: &'static Currency,
) -> Result<Money<'static, Currency>, PricingError> {
    let mut minor = amount.round_dp_with_strategy(
        currency.exponent,
        RoundingStrategy::MidpointAwayFromZero,
    );

    minor.rescale(currency.exponent);

    let Ok(minor_units) = i64::try_from(minor.mantissa()) else {
        return Err(PricingError::MinorUnits(amount));
    };

    Ok(Money::from_minor(minor_units, currency))
}
