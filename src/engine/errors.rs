//! Engine Errors

use thiserror::Error;

use crate::{cart::CartError, gateway::GatewayError};

/// Message returned when a coupon is applied without a session.
pub const SIGN_IN_REQUIRED_MESSAGE: &str = "Please log in to apply a coupon.";

/// Message returned when an empty coupon code is applied.
pub const MISSING_COUPON_CODE_MESSAGE: &str = "Coupon code is required";

/// Failure of a [`CartEngine`](super::CartEngine) operation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request would break a cart invariant.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The remote cart failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Coupons need a signed-in session.
    #[error("sign in required")]
    SignInRequired,

    /// The coupon code was blank.
    #[error("coupon code is missing")]
    MissingCouponCode,

    /// The backend refused the coupon.
    #[error("coupon rejected: {0}")]
    CouponRejected(String),

    /// A sign-in merge holds the cart.
    #[error("cart sync in progress")]
    SyncInProgress,

    /// The session changed while the operation was in flight; its result was discarded.
    #[error("session changed before the operation completed")]
    Superseded,
}

impl EngineError {
    /// Human-readable description suitable for showing to a shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Cart(CartError::QuantityOutOfRange { max, .. }) => {
                format!("Quantity must be between 1 and {max}.")
            }
            Self::Cart(CartError::StockExceeded { available, .. }) => {
                format!("Only {available} left in stock.")
            }
            Self::Cart(CartError::LineNotFound(_)) => {
                "This item is no longer in your cart.".to_string()
            }
            Self::Cart(CartError::DuplicateLine(_)) => {
                "This item is already in your cart.".to_string()
            }
            Self::Gateway(error) => error.user_message(),
            Self::SignInRequired => SIGN_IN_REQUIRED_MESSAGE.to_string(),
            Self::MissingCouponCode => MISSING_COUPON_CODE_MESSAGE.to_string(),
            Self::CouponRejected(message) => message.clone(),
            Self::SyncInProgress => {
                "Your cart is being synced. Please try again in a moment.".to_string()
            }
            Self::Superseded => "Your session changed. Please try again.".to_string(),
        }
    }
}
