//! Gateway Errors

use thiserror::Error;

use crate::lines::LineId;

/// Message shown when the backend could not be reached.
pub(crate) const NO_RESPONSE_MESSAGE: &str =
    "No response received from server. Please check your network connection.";

/// Message shown when a coupon rejection carried no usable detail.
pub(crate) const INVALID_COUPON_MESSAGE: &str =
    "Invalid coupon or cart data. Please check and try again.";

/// Message shown when the backend refused the session.
pub(crate) const AUTH_REQUIRED_MESSAGE: &str =
    "Authentication required. Please log in to apply a coupon.";

/// Broad classification of gateway failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Transport failure or server-side error; retrying later may succeed.
    Network,

    /// The backend rejected the request as invalid.
    Validation,

    /// The session is not authorised.
    Auth,
}

/// Errors that can occur when talking to the remote cart.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// An HTTP transport or decoding error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with an unexpected non-2xx status.
    #[error("cart backend returned status {status}")]
    Unavailable {
        /// HTTP status code.
        status: u16,

        /// Response body, for diagnostics.
        body: String,
    },

    /// The backend rejected the request with a user-facing reason.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The backend refused the credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The response body did not have the expected shape.
    #[error("unexpected response from cart backend: {0}")]
    UnexpectedResponse(String),

    /// The line only exists locally and has no remote counterpart.
    #[error("line {0} has no remote id")]
    LocalLine(LineId),
}

impl GatewayError {
    /// Classify the failure.
    #[must_use]
    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            Self::Http(_) | Self::Unavailable { .. } => GatewayErrorKind::Network,
            Self::Unauthorized(_) => GatewayErrorKind::Auth,
            Self::Rejected(_) | Self::UnexpectedResponse(_) | Self::LocalLine(_) => {
                GatewayErrorKind::Validation
            }
        }
    }

    /// Human-readable description suitable for showing to a shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(_) => NO_RESPONSE_MESSAGE.to_string(),
            Self::Unavailable { status, .. } => {
                format!("The server could not process the request (status {status}). Please try again later.")
            }
            Self::Rejected(message) | Self::Unauthorized(message) => message.clone(),
            Self::UnexpectedResponse(_) => {
                "Unexpected response from server. Please try again.".to_string()
            }
            Self::LocalLine(_) => "This item is not part of your account cart.".to_string(),
        }
    }
}
