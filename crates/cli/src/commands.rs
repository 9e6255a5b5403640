//! Command dispatch

use std::{io, sync::Arc};

use clap::Args;
use rust_decimal::Decimal;
use storefront_cart::{
    engine::{CartEngine, EngineError, SessionEvent, SessionState, SessionTransition},
    gateway::{GatewayError, HttpCartGateway},
    lines::{NewLine, PriceSnapshot, ProductSummary, VariantId},
    storage::{FileStore, StorageError},
};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    config::{CliConfig, Command},
    render::{self, RenderError},
};

/// Errors that end a command.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// `CART_CURRENCY` is not an ISO 4217 code.
    #[error("unknown currency code {0:?}")]
    UnknownCurrency(String),

    /// `login` needs a customer token.
    #[error("login requires a token, pass --api-token or set CART_API_TOKEN")]
    MissingToken,

    /// The storage directory could not be opened.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The HTTP client could not be built.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A cart operation failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Output could not be written.
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl CliError {
    /// Message shown to the user.
    pub(crate) fn user_message(&self) -> String {
        match self {
            Self::Engine(error) => error.user_message(),
            other => other.to_string(),
        }
    }
}

/// Arguments of the `add` command.
#[derive(Debug, Args)]
pub(crate) struct AddArgs {
    /// Catalog variant id
    #[arg(long)]
    pub variant: u64,

    /// Units to add
    #[arg(long, default_value_t = 1)]
    pub quantity: u32,

    /// List price
    #[arg(long)]
    pub price: Option<Decimal>,

    /// Active discount price
    #[arg(long)]
    pub discount_price: Option<Decimal>,

    /// Units in stock
    #[arg(long)]
    pub stock: Option<u32>,

    /// Product name shown in the cart
    #[arg(long)]
    pub name: Option<String>,

    /// Variant size label
    #[arg(long)]
    pub size: Option<String>,
}

impl AddArgs {
    fn into_new_line(self) -> NewLine {
        let price = PriceSnapshot {
            list_price: self.price,
            discount_active: self.discount_price.is_some(),
            discount_price: self.discount_price,
            stock: self.stock,
        };

        let line = NewLine::new(VariantId::new(self.variant), self.quantity, price);

        if self.name.is_none() && self.size.is_none() {
            return line;
        }

        line.with_product(ProductSummary {
            name: self.name,
            size: self.size,
        })
    }
}

/// Run the configured command and print the resulting cart.
pub(crate) async fn run(config: CliConfig) -> Result<(), CliError> {
    let settings = config.cart.settings()?;
    let storage = Arc::new(FileStore::open(config.storage.storage_dir.clone())?);
    let gateway = Arc::new(HttpCartGateway::new(config.gateway.http_config())?);

    // `login` starts anonymous so the local cart can be merged.
    let session = if config.gateway.has_token() && !matches!(config.command, Command::Login) {
        SessionState::Authenticated
    } else {
        SessionState::Anonymous
    };

    debug!(?session, dir = %storage.dir().display(), "starting cart engine");

    let engine = CartEngine::start(gateway, storage, settings, session).await;

    let mut merge_report = None;

    match config.command {
        Command::Show => {}
        Command::Add(args) => {
            let line = engine.add_item(args.into_new_line()).await?;

            info!(
                line = %line.id(),
                variant = %line.variant_id(),
                quantity = line.quantity(),
                "line added"
            );
        }
        Command::Update { line, quantity } => {
            engine.update_quantity(&line, quantity).await?;
        }
        Command::Remove { line } => {
            engine.remove_item(&line).await?;
        }
        Command::Coupon { code } => {
            engine.apply_coupon(&code).await?;
        }
        Command::Clear => {
            engine.clear_cart().await?;
        }
        Command::Login => {
            if !config.gateway.has_token() {
                return Err(CliError::MissingToken);
            }

            if let SessionTransition::Merged(report) =
                engine.handle_session_event(SessionEvent::SignedIn).await?
            {
                merge_report = Some(report);
            }
        }
    }

    let mut out = io::stdout().lock();

    if let Some(report) = &merge_report {
        render::write_merge_report(&mut out, report)?;
    }

    render::write_cart(&mut out, &engine.snapshot())?;

    Ok(())
}
