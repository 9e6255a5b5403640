//! Coupons
//!
//! A coupon is a whole-cart discount that only ever exists after the backend validated it
//! against the authoritative subtotal.

use rust_decimal::Decimal;

/// How a coupon's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponKind {
    /// `value` percent of the subtotal, optionally capped by `max_discount`.
    Percentage,

    /// `value` off the subtotal, uncapped.
    FixedAmount,
}

/// A validated coupon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coupon {
    code: String,
    kind: CouponKind,
    value: Decimal,
    max_discount: Option<Decimal>,
    min_purchase: Option<Decimal>,
}

impl Coupon {
    /// Percentage coupon, e.g. `10` for "10% off".
    #[must_use]
    pub fn percentage(code: impl Into<String>, value: Decimal) -> Self {
        Self::new(code, CouponKind::Percentage, value)
    }

    /// Fixed-amount coupon, e.g. `50` for "50 off".
    #[must_use]
    pub fn fixed_amount(code: impl Into<String>, value: Decimal) -> Self {
        Self::new(code, CouponKind::FixedAmount, value)
    }

    /// Create a coupon of the given kind.
    #[must_use]
    pub fn new(code: impl Into<String>, kind: CouponKind, value: Decimal) -> Self {
        Self {
            code: code.into(),
            kind,
            value,
            max_discount: None,
            min_purchase: None,
        }
    }

    /// Cap the discount a percentage coupon can grant.
    #[must_use]
    pub fn with_max_discount(mut self, max_discount: Decimal) -> Self {
        self.max_discount = Some(max_discount);
        self
    }

    /// Require a minimum subtotal for the coupon to stay valid.
    #[must_use]
    pub fn with_min_purchase(mut self, min_purchase: Decimal) -> Self {
        self.min_purchase = Some(min_purchase);
        self
    }

    /// Coupon code
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Discount type
    pub fn kind(&self) -> CouponKind {
        self.kind
    }

    /// Discount magnitude
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Ceiling for percentage discounts
    pub fn max_discount(&self) -> Option<Decimal> {
        self.max_discount
    }

    /// Minimum subtotal
    pub fn min_purchase(&self) -> Option<Decimal> {
        self.min_purchase
    }

    /// Whether `subtotal` meets the coupon's minimum purchase amount.
    #[must_use]
    pub fn accepts_subtotal(&self, subtotal: Decimal) -> bool {
        self.min_purchase.is_none_or(|min| subtotal >= min)
    }
}

/// Result of a successful server-side coupon validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponValidation {
    /// The validated coupon.
    pub coupon: Coupon,

    /// Discount the server computed, if it reported one.
    pub discount: Option<Decimal>,

    /// Final total the server computed, if it reported one.
    pub final_total: Option<Decimal>,
}
