//! HTTP client for the storefront cart API.

use std::{
    fmt,
    sync::{PoisonError, RwLock},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use crate::{
    coupons::CouponValidation,
    gateway::{
        CartGateway, GatewayError,
        errors::{AUTH_REQUIRED_MESSAGE, INVALID_COUPON_MESSAGE},
        wire::{
            self, AddItemRequest, RemoteCart, RemoteCartItem, UpdateItemRequest,
            ValidateCouponRequest, ValidateCouponResponse,
        },
    },
    lines::{CartLine, LineId, VariantId},
};

/// Configuration for connecting to the cart backend.
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// Backend address, e.g. `"http://localhost:8000"`.
    pub base_url: String,

    /// Bearer token of the signed-in user, if any.
    pub token: Option<String>,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpGatewayConfig {
    /// Configuration for `base_url` with the default timeout and no token.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Authenticate requests with a bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// [`CartGateway`] backed by the storefront's REST API.
pub struct HttpCartGateway {
    base_url: String,
    http: Client,
    token: RwLock<Option<String>>,
}

impl fmt::Debug for HttpCartGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCartGateway")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpCartGateway {
    /// Create a new client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Http`] if the HTTP client cannot be initialised.
    pub fn new(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            token: RwLock::new(config.token),
        })
    }

    /// Replace the bearer token, e.g. after the user signs in or out.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let builder = self.http.request(method, url);

        match self
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
        {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, GatewayError> {
        let response = builder.send().await?;
        let status = response.status();

        debug!(status = status.as_u16(), url = %response.url(), "cart backend responded");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();

        match status {
            StatusCode::BAD_REQUEST => {
                let message = serde_json::from_str::<Value>(&body)
                    .ok()
                    .and_then(|value| wire::rejection_message(&value))
                    .unwrap_or_else(|| INVALID_COUPON_MESSAGE.to_string());

                Err(GatewayError::Rejected(message))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(GatewayError::Unauthorized(AUTH_REQUIRED_MESSAGE.to_string()))
            }
            _ => Err(GatewayError::Unavailable {
                status: status.as_u16(),
                body,
            }),
        }
    }
}

fn remote_id(id: &LineId) -> Result<u64, GatewayError> {
    match id {
        LineId::Remote(id) => Ok(*id),
        LineId::Local(_) => Err(GatewayError::LocalLine(id.clone())),
    }
}

#[async_trait]
impl CartGateway for HttpCartGateway {
    async fn fetch_cart(&self) -> Result<Vec<CartLine>, GatewayError> {
        let response = self.send(self.request(Method::GET, "/api/cart/")).await?;

        let cart: RemoteCart = response.json().await?;

        Ok(cart.items.into_iter().map(CartLine::from).collect())
    }

    async fn add_item(&self, variant: VariantId, quantity: u32) -> Result<CartLine, GatewayError> {
        let body = AddItemRequest {
            product_variant_id: variant.get(),
            quantity,
        };

        let response = self
            .send(self.request(Method::POST, "/api/cart/add/").json(&body))
            .await?;

        let item: RemoteCartItem = response.json().await?;

        Ok(item.into())
    }

    async fn update_item(&self, id: &LineId, quantity: u32) -> Result<(), GatewayError> {
        let path = format!("/api/cart/update/{}/", remote_id(id)?);

        self.send(
            self.request(Method::PUT, &path)
                .json(&UpdateItemRequest { quantity }),
        )
        .await?;

        Ok(())
    }

    async fn remove_item(&self, id: &LineId) -> Result<(), GatewayError> {
        let path = format!("/api/cart/remove/{}/", remote_id(id)?);

        self.send(self.request(Method::DELETE, &path)).await?;

        Ok(())
    }

    async fn validate_coupon(
        &self,
        code: &str,
        subtotal: Decimal,
    ) -> Result<CouponValidation, GatewayError> {
        let body = ValidateCouponRequest {
            coupon: code,
            cart_total: subtotal,
        };

        let response = self
            .send(self.request(Method::POST, "/api/validate-coupon/").json(&body))
            .await?;

        let validation: ValidateCouponResponse = response.json().await?;

        Ok(validation.into())
    }
}
