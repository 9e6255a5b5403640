//! Cart Config

use clap::Args;
use rusty_money::iso::{self, Currency};
use storefront_cart::engine::{CartSettings, DEFAULT_MAX_LINE_QUANTITY};

use crate::commands::CliError;

/// Cart rules.
#[derive(Debug, Args)]
pub(crate) struct CartConfig {
    /// Largest quantity a single line may hold
    #[arg(long, env = "CART_MAX_LINE_QUANTITY", default_value_t = DEFAULT_MAX_LINE_QUANTITY)]
    pub max_line_quantity: u32,

    /// ISO 4217 currency code prices are quoted in
    #[arg(long, env = "CART_CURRENCY", default_value = "INR")]
    pub currency: String,
}

impl CartConfig {
    /// Resolve the configured currency.
    pub(crate) fn currency(&self) -> Result<&'static Currency, CliError> {
        iso::find(&self.currency.to_ascii_uppercase())
            .ok_or_else(|| CliError::UnknownCurrency(self.currency.clone()))
    }

    /// Engine settings for these rules.
    pub(crate) fn settings(&self) -> Result<CartSettings, CliError> {
        Ok(CartSettings::default()
            .with_max_line_quantity(self.max_line_quantity)
            .with_currency(self.currency()?))
    }
}
