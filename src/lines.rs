//! Cart Lines

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Prefix carried by ids generated for lines that only exist in local storage.
pub const LOCAL_LINE_PREFIX: &str = "local_";

/// Reference to a product variant owned by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(u64);

impl VariantId {
    /// Wrap a catalog variant id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw catalog id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for VariantId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Identifier of a line within one cart.
///
/// Server-confirmed lines carry the integer id assigned by the backend, lines created while
/// anonymous carry a generated `local_` id so the two can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LineId {
    /// Id assigned by the remote cart.
    Remote(u64),

    /// Id generated on this client.
    Local(String),
}

impl LineId {
    /// Generate a fresh local id.
    #[must_use]
    pub fn new_local() -> Self {
        Self::Local(format!("{LOCAL_LINE_PREFIX}{}", Uuid::now_v7().simple()))
    }

    /// Whether the id was generated on this client.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

impl Display for LineId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(id) => Display::fmt(id, f),
            Self::Local(id) => f.write_str(id),
        }
    }
}

/// Error returned when a string is neither a numeric nor a `local_` line id.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid line id: {0:?}")]
pub struct LineIdParseError(String);

impl FromStr for LineId {
    type Err = LineIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(id) = s.parse::<u64>() {
            return Ok(Self::Remote(id));
        }

        if s.len() > LOCAL_LINE_PREFIX.len() && s.starts_with(LOCAL_LINE_PREFIX) {
            return Ok(Self::Local(s.to_string()));
        }

        Err(LineIdParseError(s.to_string()))
    }
}

/// Variant pricing captured when the line was added or last fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    /// List price. Absent prices count as zero.
    #[serde(rename = "price", default)]
    pub list_price: Option<Decimal>,

    /// Discounted price, only honoured while the discount is active.
    #[serde(default)]
    pub discount_price: Option<Decimal>,

    /// Whether the variant's discount is currently active.
    #[serde(rename = "is_discount_active", default)]
    pub discount_active: bool,

    /// Units in stock when the snapshot was taken, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
}

impl PriceSnapshot {
    /// Snapshot of an undiscounted variant.
    #[must_use]
    pub fn list(price: Decimal) -> Self {
        Self {
            list_price: Some(price),
            ..Self::default()
        }
    }

    /// Snapshot of a variant with an active discount.
    #[must_use]
    pub fn discounted(price: Decimal, discount_price: Decimal) -> Self {
        Self {
            list_price: Some(price),
            discount_price: Some(discount_price),
            discount_active: true,
            stock: None,
        }
    }

    /// Attach a known stock level.
    #[must_use]
    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = Some(stock);
        self
    }

    /// List price, zero when absent.
    #[must_use]
    pub fn list_price(&self) -> Decimal {
        self.list_price.unwrap_or_default()
    }

    /// The discount price that applies right now, if any.
    ///
    /// A zero discount price is treated as missing.
    #[must_use]
    pub fn active_discount_price(&self) -> Option<Decimal> {
        if !self.discount_active {
            return None;
        }

        self.discount_price.filter(|price| !price.is_zero())
    }
}

/// Display details kept alongside a line so anonymous carts can render without the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    /// Product name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Variant size label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

/// One product variant entry in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    id: LineId,

    #[serde(rename = "product_variant_id")]
    variant_id: VariantId,

    quantity: u32,

    #[serde(rename = "product_variant", default)]
    price: PriceSnapshot,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    product: Option<ProductSummary>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    added_at: Option<Timestamp>,
}

impl CartLine {
    /// Create a line.
    #[must_use]
    pub fn new(id: LineId, variant_id: VariantId, quantity: u32, price: PriceSnapshot) -> Self {
        Self {
            id,
            variant_id,
            quantity,
            price,
            product: None,
            added_at: None,
        }
    }

    /// Attach display details.
    #[must_use]
    pub fn with_product(mut self, product: ProductSummary) -> Self {
        self.product = Some(product);
        self
    }

    /// Record when the line was created.
    #[must_use]
    pub fn with_added_at(mut self, added_at: Timestamp) -> Self {
        self.added_at = Some(added_at);
        self
    }

    /// Line id
    pub fn id(&self) -> &LineId {
        &self.id
    }

    /// Variant id
    pub fn variant_id(&self) -> VariantId {
        self.variant_id
    }

    /// Requested quantity
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Price snapshot
    pub fn price(&self) -> &PriceSnapshot {
        &self.price
    }

    /// Display details, if captured.
    pub fn product(&self) -> Option<&ProductSummary> {
        self.product.as_ref()
    }

    /// When the line was first added locally.
    pub fn added_at(&self) -> Option<Timestamp> {
        self.added_at
    }

    pub(crate) fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }
}

/// Request to add a variant to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLine {
    /// Variant to add.
    pub variant_id: VariantId,

    /// Quantity to add.
    pub quantity: u32,

    /// Pricing known to the caller at add time.
    pub price: PriceSnapshot,

    /// Display details for anonymous carts.
    pub product: Option<ProductSummary>,
}

impl NewLine {
    /// Create an add request without display details.
    #[must_use]
    pub fn new(variant_id: VariantId, quantity: u32, price: PriceSnapshot) -> Self {
        Self {
            variant_id,
            quantity,
            price,
            product: None,
        }
    }

    /// Attach display details.
    #[must_use]
    pub fn with_product(mut self, product: ProductSummary) -> Self {
        self.product = Some(product);
        self
    }

    /// Materialise the request as a locally-owned line with a fresh local id.
    #[must_use]
    pub fn into_local_line(self) -> CartLine {
        CartLine {
            id: LineId::new_local(),
            variant_id: self.variant_id,
            quantity: self.quantity,
            price: self.price,
            product: self.product,
            added_at: Some(Timestamp::now()),
        }
    }
}
