//! Gateway Config

use std::time::Duration;

use clap::Args;
use storefront_cart::gateway::HttpGatewayConfig;

/// Remote cart API settings.
#[derive(Debug, Args)]
pub(crate) struct GatewayConfig {
    /// Base URL of the storefront API
    #[arg(long, env = "CART_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Bearer token of the signed-in customer
    #[arg(long, env = "CART_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "CART_API_TIMEOUT_SECONDS", default_value_t = 10u64)]
    pub api_timeout_seconds: u64,
}

impl GatewayConfig {
    /// Whether a customer token was supplied.
    pub(crate) fn has_token(&self) -> bool {
        self.api_token.as_deref().is_some_and(|token| !token.is_empty())
    }

    /// HTTP client settings for the gateway.
    pub(crate) fn http_config(&self) -> HttpGatewayConfig {
        let mut config = HttpGatewayConfig::new(self.api_url.clone());

        config.timeout = Duration::from_secs(self.api_timeout_seconds);

        match &self.api_token {
            Some(token) if !token.is_empty() => config.with_token(token.clone()),
            _ => config,
        }
    }
}
