//! Pricing
//!
//! Pure functions deriving [`Totals`] from cart lines and an optional coupon. Nothing here
//! performs I/O or fails: missing prices count as zero and arithmetic saturates.

use rust_decimal::Decimal;
use rusty_money::iso::Currency;

use crate::{
    coupons::{Coupon, CouponKind},
    lines::{CartLine, PriceSnapshot},
    totals::Totals,
};

/// Unit price a line is charged at: the active discount price if there is one, otherwise
/// the list price.
#[must_use]
pub fn effective_unit_price(price: &PriceSnapshot) -> Decimal {
    price
        .active_discount_price()
        .unwrap_or_else(|| price.list_price())
}

/// Effective price of a whole line.
#[must_use]
pub fn line_total(line: &CartLine) -> Decimal {
    effective_unit_price(line.price()).saturating_mul(Decimal::from(line.quantity()))
}

/// Amount saved on a line by the variant's own discount.
#[must_use]
pub fn line_discount(line: &CartLine) -> Decimal {
    let price = line.price();

    price
        .list_price()
        .saturating_sub(effective_unit_price(price))
        .saturating_mul(Decimal::from(line.quantity()))
}

/// Discount a coupon grants on `subtotal`.
///
/// Percentage coupons are limited to at most 100% of the subtotal and capped by
/// `max_discount`. The result is exact; rounding to the currency's minor unit happens only
/// when an amount is rendered. Fixed-amount coupons are not limited by the subtotal.
#[must_use]
pub fn coupon_discount(subtotal: Decimal, coupon: &Coupon) -> Decimal {
    let value = coupon.value().max(Decimal::ZERO);

    match coupon.kind() {
        CouponKind::Percentage => {
            let percent = value.min(Decimal::ONE_HUNDRED);

            let discount = subtotal.saturating_mul(percent) / Decimal::ONE_HUNDRED;

            match coupon.max_discount() {
                Some(ceiling) => discount.min(ceiling.max(Decimal::ZERO)),
                None => discount,
            }
        }
        CouponKind::FixedAmount => value,
    }
}

/// Compute cart totals.
#[must_use]
pub fn compute_totals(
    lines: &[CartLine],
    coupon: Option<&Coupon>,
    currency: &'static Currency,
) -> Totals {
    let (subtotal, product_discount) = lines.iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(subtotal, discount), line| {
            (
                subtotal.saturating_add(line_total(line)),
                discount.saturating_add(line_discount(line)),
            )
        },
    );

    let coupon_discount = coupon.map_or(Decimal::ZERO, |coupon| coupon_discount(subtotal, coupon));

    Totals::new(subtotal, product_discount, coupon_discount, currency)
}
