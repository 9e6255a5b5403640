//! Storefront cart prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{Cart, CartError},
    coupons::{Coupon, CouponKind, CouponValidation},
    engine::{
        CartEngine, CartSettings, CartSnapshot, EngineError, EngineMode, MergeLineFailure,
        MergeReport, SessionEvent, SessionState, SessionTransition,
    },
    gateway::{
        CartGateway, GatewayError, GatewayErrorKind, HttpCartGateway, HttpGatewayConfig,
    },
    lines::{CartLine, LineId, NewLine, PriceSnapshot, ProductSummary, VariantId},
    pricing::compute_totals,
    storage::{FileStore, KeyValueStore, LocalCartStore, MemoryStore, StorageError},
    totals::{PricingError, Totals},
};
