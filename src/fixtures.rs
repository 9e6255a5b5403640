//! Fixtures
//!
//! Ready-made lines and coupons shared by unit tests, integration tests and the CLI demo data.

use rust_decimal::Decimal;

use crate::{
    coupons::Coupon,
    lines::{CartLine, LineId, NewLine, PriceSnapshot, ProductSummary, VariantId},
};

/// Discounted variant: list 100, active discount to 80.
pub const DISCOUNTED_VARIANT: VariantId = VariantId::new(1);

/// Undiscounted variant priced 50.
pub const PLAIN_VARIANT: VariantId = VariantId::new(2);

/// Price snapshot of [`DISCOUNTED_VARIANT`].
#[must_use]
pub fn discounted_price() -> PriceSnapshot {
    PriceSnapshot::discounted(Decimal::ONE_HUNDRED, Decimal::from(80))
}

/// Price snapshot of [`PLAIN_VARIANT`].
#[must_use]
pub fn plain_price() -> PriceSnapshot {
    PriceSnapshot::list(Decimal::from(50))
}

/// A server-confirmed line.
#[must_use]
pub fn remote_line(id: u64, variant: VariantId, quantity: u32, price: PriceSnapshot) -> CartLine {
    CartLine::new(LineId::Remote(id), variant, quantity, price)
}

/// A line created while anonymous.
#[must_use]
pub fn local_line(variant: VariantId, quantity: u32, price: PriceSnapshot) -> CartLine {
    NewLine::new(variant, quantity, price)
        .with_product(ProductSummary {
            name: Some(format!("Variant {variant}")),
            size: None,
        })
        .into_local_line()
}

/// Two remote lines: two discounted units (100 → 80) and one plain unit at 50.
///
/// Subtotal 210, product discount 40.
#[must_use]
pub fn two_line_cart() -> Vec<CartLine> {
    vec![
        remote_line(1, DISCOUNTED_VARIANT, 2, discounted_price()),
        remote_line(2, PLAIN_VARIANT, 1, plain_price()),
    ]
}

/// 10% off, capped at 15.
#[must_use]
pub fn capped_percentage_coupon() -> Coupon {
    Coupon::percentage("SAVE10", Decimal::TEN).with_max_discount(Decimal::from(15))
}
