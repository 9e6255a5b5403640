//! Cart

use thiserror::Error;
use tracing::warn;

use crate::lines::{CartLine, LineId, NewLine, VariantId};

/// Errors raised by cart mutations that would break a cart invariant.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// No line with the given id exists in the cart.
    #[error("line {0} not found")]
    LineNotFound(LineId),

    /// Quantity outside `1..=max` (requested, max).
    #[error("quantity {requested} is outside the allowed range 1..={max}")]
    QuantityOutOfRange {
        /// Quantity the caller asked for.
        requested: u32,

        /// Configured per-line ceiling.
        max: u32,
    },

    /// Quantity larger than the stock known for the variant (requested, available).
    #[error("only {available} in stock, {requested} requested")]
    StockExceeded {
        /// Quantity the caller asked for.
        requested: u32,

        /// Units in stock.
        available: u32,
    },

    /// The same line id appears twice.
    #[error("line {0} appears more than once")]
    DuplicateLine(LineId),
}

/// Validate a quantity against the per-line ceiling and, if known, the stock level.
///
/// # Errors
///
/// - [`CartError::QuantityOutOfRange`]: `requested` is zero or above `max`.
/// - [`CartError::StockExceeded`]: `requested` is above `stock`.
pub fn check_quantity(requested: u32, max: u32, stock: Option<u32>) -> Result<(), CartError> {
    if requested == 0 || requested > max {
        return Err(CartError::QuantityOutOfRange { requested, max });
    }

    match stock {
        Some(available) if requested > available => Err(CartError::StockExceeded {
            requested,
            available,
        }),
        _ => Ok(()),
    }
}

/// Ordered collection of lines for one owner context.
///
/// Line ids are unique and every line has a quantity of at least one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cart from trusted lines.
    ///
    /// # Errors
    ///
    /// - [`CartError::DuplicateLine`]: two lines share an id.
    /// - [`CartError::QuantityOutOfRange`]: a line has a zero quantity.
    pub fn with_lines(lines: impl Into<Vec<CartLine>>) -> Result<Self, CartError> {
        let lines = lines.into();

        for (i, line) in lines.iter().enumerate() {
            if line.quantity() == 0 {
                return Err(CartError::QuantityOutOfRange {
                    requested: 0,
                    max: u32::MAX,
                });
            }

            if lines.iter().skip(i + 1).any(|other| other.id() == line.id()) {
                return Err(CartError::DuplicateLine(line.id().clone()));
            }
        }

        Ok(Self { lines })
    }

    /// Build a cart from lines read from storage or the network, dropping any line that would
    /// break an invariant.
    #[must_use]
    pub fn normalized(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::new();

        for line in lines {
            if line.quantity() == 0 {
                warn!(line = %line.id(), "dropping zero-quantity line");

                continue;
            }

            if cart.contains(line.id()) {
                warn!(line = %line.id(), "dropping duplicate line");

                continue;
            }

            cart.lines.push(line);
        }

        cart
    }

    /// Add a variant, incrementing the existing line for that variant if there is one.
    ///
    /// New lines receive a local id. Returns the resulting line.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the resulting quantity is out of range or above stock. The
    /// cart is left unchanged in that case.
    pub fn add(&mut self, line: NewLine, max_quantity: u32) -> Result<CartLine, CartError> {
        check_quantity(line.quantity, max_quantity, line.price.stock)?;

        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|existing| existing.variant_id() == line.variant_id)
        {
            let combined = existing.quantity().saturating_add(line.quantity);
            let stock = line.price.stock.or(existing.price().stock);

            check_quantity(combined, max_quantity, stock)?;

            existing.set_quantity(combined);

            return Ok(existing.clone());
        }

        let created = line.into_local_line();

        self.lines.push(created.clone());

        Ok(created)
    }

    /// Set the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// - [`CartError::LineNotFound`]: no such line.
    /// - [`CartError::QuantityOutOfRange`] / [`CartError::StockExceeded`]: invalid quantity.
    pub fn set_quantity(
        &mut self,
        id: &LineId,
        quantity: u32,
        max_quantity: u32,
    ) -> Result<(), CartError> {
        let line = self
            .lines
            .iter_mut()
            .find(|line| line.id() == id)
            .ok_or_else(|| CartError::LineNotFound(id.clone()))?;

        check_quantity(quantity, max_quantity, line.price().stock)?;

        line.set_quantity(quantity);

        Ok(())
    }

    /// Remove a line, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if there is no such line.
    pub fn remove(&mut self, id: &LineId) -> Result<CartLine, CartError> {
        let index = self
            .lines
            .iter()
            .position(|line| line.id() == id)
            .ok_or_else(|| CartError::LineNotFound(id.clone()))?;

        Ok(self.lines.remove(index))
    }

    /// Replace the line with the same id, or append it.
    pub fn upsert(&mut self, line: CartLine) {
        if line.quantity() == 0 {
            self.lines.retain(|existing| existing.id() != line.id());

            return;
        }

        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|existing| existing.id() == line.id())
        {
            *existing = line;
        } else {
            self.lines.push(line);
        }
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Get a line by id.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if there is no such line.
    pub fn get(&self, id: &LineId) -> Result<&CartLine, CartError> {
        self.lines
            .iter()
            .find(|line| line.id() == id)
            .ok_or_else(|| CartError::LineNotFound(id.clone()))
    }

    /// Find the line holding a variant.
    pub fn find_variant(&self, variant: VariantId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.variant_id() == variant)
    }

    /// Whether a line with the id exists.
    #[must_use]
    pub fn contains(&self, id: &LineId) -> bool {
        self.lines.iter().any(|line| line.id() == id)
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Iterate over the lines.
    pub fn iter(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter()
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if the cart is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity())).sum()
    }
}
