//! Remote Cart Gateway
//!
//! The engine's only view of the authenticated cart backend. [`HttpCartGateway`] speaks the
//! storefront's REST API; tests substitute the generated [`MockCartGateway`].

use async_trait::async_trait;
use mockall::automock;
use rust_decimal::Decimal;

use crate::{
    coupons::CouponValidation,
    lines::{CartLine, LineId, VariantId},
};

mod errors;
mod http;
mod wire;

pub use errors::{GatewayError, GatewayErrorKind};
pub use http::{HttpCartGateway, HttpGatewayConfig};

/// Operations the backend cart exposes to an authenticated user.
#[automock]
#[async_trait]
pub trait CartGateway: Send + Sync {
    /// Fetch the authoritative cart.
    async fn fetch_cart(&self) -> Result<Vec<CartLine>, GatewayError>;

    /// Add `quantity` units of a variant. The backend increments an existing line for the
    /// variant and returns the resulting line.
    async fn add_item(&self, variant: VariantId, quantity: u32) -> Result<CartLine, GatewayError>;

    /// Set a line's quantity.
    async fn update_item(&self, id: &LineId, quantity: u32) -> Result<(), GatewayError>;

    /// Remove a line.
    async fn remove_item(&self, id: &LineId) -> Result<(), GatewayError>;

    /// Validate a coupon code against the given subtotal.
    async fn validate_coupon(
        &self,
        code: &str,
        subtotal: Decimal,
    ) -> Result<CouponValidation, GatewayError>;
}
