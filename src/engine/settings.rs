//! Engine Settings

use rusty_money::iso::{self, Currency};

/// Default per-line quantity ceiling.
pub const DEFAULT_MAX_LINE_QUANTITY: u32 = 10;

/// Default storage key of the anonymous cart.
pub const DEFAULT_STORAGE_KEY: &str = "localCart";

/// Tunables for a [`CartEngine`](super::CartEngine).
#[derive(Debug, Clone)]
pub struct CartSettings {
    max_line_quantity: u32,
    currency: &'static Currency,
    storage_key: String,
}

impl Default for CartSettings {
    fn default() -> Self {
        Self {
            max_line_quantity: DEFAULT_MAX_LINE_QUANTITY,
            currency: iso::INR,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl CartSettings {
    /// Set the largest quantity a single line may hold.
    #[must_use]
    pub fn with_max_line_quantity(mut self, max_line_quantity: u32) -> Self {
        self.max_line_quantity = max_line_quantity;
        self
    }

    /// Set the currency prices are expressed in.
    #[must_use]
    pub fn with_currency(mut self, currency: &'static Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Set the key the anonymous cart is stored under.
    #[must_use]
    pub fn with_storage_key(mut self, storage_key: impl Into<String>) -> Self {
        self.storage_key = storage_key.into();
        self
    }

    /// Per-line quantity ceiling
    pub fn max_line_quantity(&self) -> u32 {
        self.max_line_quantity
    }

    /// Price currency
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Anonymous cart storage key
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }
}
