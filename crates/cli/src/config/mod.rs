//! Command-line configuration

use clap::{Parser, Subcommand};

use crate::{
    commands::AddArgs,
    config::{
        cart::CartConfig, gateway::GatewayConfig, observability::LoggingConfig,
        storage::StorageConfig,
    },
};

pub(crate) mod cart;
pub(crate) mod gateway;
pub(crate) mod observability;
pub(crate) mod storage;

/// Storefront cart command-line client
#[derive(Debug, Parser)]
#[command(name = "storefront-cart", about = "Storefront cart client", long_about = None)]
pub(crate) struct CliConfig {
    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Remote cart API settings.
    #[command(flatten)]
    pub gateway: GatewayConfig,

    /// Local cart storage settings.
    #[command(flatten)]
    pub storage: StorageConfig,

    /// Cart rules.
    #[command(flatten)]
    pub cart: CartConfig,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub(crate) fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}

/// Cart commands.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Show the cart and its totals.
    Show,

    /// Add a product variant.
    Add(AddArgs),

    /// Change the quantity of a line.
    Update {
        /// Line id, numeric or `local_...`.
        line: storefront_cart::lines::LineId,

        /// New quantity.
        quantity: u32,
    },

    /// Remove a line.
    Remove {
        /// Line id, numeric or `local_...`.
        line: storefront_cart::lines::LineId,
    },

    /// Validate and apply a coupon code.
    Coupon {
        /// Coupon code.
        code: String,
    },

    /// Empty the cart.
    Clear,

    /// Sign in with the configured token, merging the local cart into the remote one.
    Login,
}
