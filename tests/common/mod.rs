//! In-memory cart backend shared by the engine integration tests.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use rust_decimal::Decimal;
use storefront_cart::{fixtures, prelude::*, pricing};
use tokio::sync::Notify;

/// Remote cart that merges adds by variant the way the storefront backend does.
#[derive(Debug, Default)]
pub struct FakeRemote {
    lines: Mutex<Vec<CartLine>>,
    next_id: AtomicU64,
    failing: Mutex<Vec<VariantId>>,
    fetch_fails: AtomicBool,
    adds: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(100),
            ..Self::default()
        }
    }

    pub fn with_lines(lines: Vec<CartLine>) -> Self {
        let remote = Self::new();
        *remote.lines.lock().unwrap_or_else(PoisonError::into_inner) = lines;
        remote
    }

    /// Reject every add of `variant`.
    pub fn failing_variant(self, variant: VariantId) -> Self {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(variant);
        self
    }

    /// Hold every add, update and removal until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fetch_fails.store(fail, Ordering::SeqCst);
    }

    pub fn lines(&self) -> Vec<CartLine> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn quantity_of(&self, variant: VariantId) -> Option<u32> {
        self.lines()
            .iter()
            .find(|line| line.variant_id() == variant)
            .map(CartLine::quantity)
    }

    pub fn add_calls(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }

    fn catalog_price(variant: VariantId) -> PriceSnapshot {
        if variant == fixtures::DISCOUNTED_VARIANT {
            fixtures::discounted_price()
        } else {
            fixtures::plain_price()
        }
    }
}

#[async_trait]
impl CartGateway for FakeRemote {
    async fn fetch_cart(&self) -> Result<Vec<CartLine>, GatewayError> {
        if self.fetch_fails.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable {
                status: 503,
                body: String::new(),
            });
        }

        Ok(self.lines())
    }

    async fn add_item(&self, variant: VariantId, quantity: u32) -> Result<CartLine, GatewayError> {
        self.adds.fetch_add(1, Ordering::SeqCst);
        self.wait().await;

        if self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&variant)
        {
            return Err(GatewayError::Rejected("Product variant not available".to_string()));
        }

        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);

        let line = match lines.iter().position(|line| line.variant_id() == variant) {
            Some(index) => {
                let existing = lines.remove(index);

                CartLine::new(
                    existing.id().clone(),
                    variant,
                    existing.quantity() + quantity,
                    existing.price().clone(),
                )
            }
            None => CartLine::new(
                LineId::Remote(self.next_id.fetch_add(1, Ordering::SeqCst)),
                variant,
                quantity,
                Self::catalog_price(variant),
            ),
        };

        lines.push(line.clone());

        Ok(line)
    }

    async fn update_item(&self, id: &LineId, quantity: u32) -> Result<(), GatewayError> {
        self.wait().await;

        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(index) = lines.iter().position(|line| line.id() == id) else {
            return Err(GatewayError::Unavailable {
                status: 404,
                body: "Not found.".to_string(),
            });
        };

        let existing = lines.remove(index);

        lines.insert(
            index,
            CartLine::new(
                existing.id().clone(),
                existing.variant_id(),
                quantity,
                existing.price().clone(),
            ),
        );

        Ok(())
    }

    async fn remove_item(&self, id: &LineId) -> Result<(), GatewayError> {
        self.wait().await;

        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        let before = lines.len();

        lines.retain(|line| line.id() != id);

        if lines.len() == before {
            return Err(GatewayError::Unavailable {
                status: 404,
                body: "Not found.".to_string(),
            });
        }

        Ok(())
    }

    async fn validate_coupon(
        &self,
        code: &str,
        subtotal: Decimal,
    ) -> Result<CouponValidation, GatewayError> {
        if code != "SAVE10" {
            return Err(GatewayError::Rejected("Invalid coupon code.".to_string()));
        }

        let coupon = fixtures::capped_percentage_coupon();
        let discount = pricing::coupon_discount(subtotal, &coupon);

        Ok(CouponValidation {
            coupon,
            discount: Some(discount),
            final_total: Some(subtotal - discount),
        })
    }
}

pub fn storage() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

pub fn engine(remote: &Arc<FakeRemote>, storage: &Arc<MemoryStore>) -> CartEngine {
    CartEngine::new(remote.clone(), storage.clone(), CartSettings::default())
}

pub async fn signed_in_engine(remote: &Arc<FakeRemote>, storage: &Arc<MemoryStore>) -> CartEngine {
    CartEngine::start(
        remote.clone(),
        storage.clone(),
        CartSettings::default(),
        SessionState::Authenticated,
    )
    .await
}

pub fn new_line(variant: VariantId, quantity: u32) -> NewLine {
    NewLine::new(variant, quantity, FakeRemote::catalog_price(variant))
}
