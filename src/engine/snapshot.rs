//! Cart Snapshot

use rust_decimal::Decimal;

use crate::{coupons::Coupon, engine::EngineMode, lines::CartLine, totals::Totals};

/// Immutable view of the engine's state at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct CartSnapshot {
    pub(crate) mode: EngineMode,
    pub(crate) generation: u64,
    pub(crate) lines: Vec<CartLine>,
    pub(crate) coupon: Option<Coupon>,
    pub(crate) totals: Totals,
    pub(crate) last_error: Option<String>,
}

impl CartSnapshot {
    /// Authoritative cart
    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    /// Session generation the snapshot belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Lines
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Applied coupon
    pub fn coupon(&self) -> Option<&Coupon> {
        self.coupon.as_ref()
    }

    /// Totals of the lines and coupon above.
    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    /// Last user-facing failure, cleared by the next successful operation.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity())).sum()
    }

    /// Check if the cart is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Shorthand for `totals().final_total()`.
    #[must_use]
    pub fn final_total(&self) -> Decimal {
        self.totals.final_total()
    }
}
