//! Cart Reconciliation Engine
//!
//! [`CartEngine`] owns the authoritative cart for one client session. While anonymous the
//! cart lives in local storage; after sign-in it is merged into the remote cart, which then
//! becomes authoritative until sign-out.
//!
//! Mutations, refreshes and merges are serialised by an operation latch. Every session
//! transition bumps a generation counter, and a gateway response that arrives for an older
//! generation is discarded with [`EngineError::Superseded`]. Consumers observe state through
//! immutable [`CartSnapshot`]s.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use rust_decimal::Decimal;
use rusty_money::iso::Currency;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::{debug, info, warn};

use crate::{
    cart::{Cart, check_quantity},
    gateway::{CartGateway, GatewayError, GatewayErrorKind},
    lines::{CartLine, LineId, NewLine},
    pricing,
    storage::{KeyValueStore, LocalCartStore},
    totals::Totals,
};

mod errors;
mod merge;
mod session;
mod settings;
mod snapshot;
mod state;

pub use errors::{EngineError, MISSING_COUPON_CODE_MESSAGE, SIGN_IN_REQUIRED_MESSAGE};
pub use merge::{MergeLineFailure, MergeReport};
pub use session::{SessionEvent, SessionState, SessionTransition};
pub use settings::{CartSettings, DEFAULT_MAX_LINE_QUANTITY, DEFAULT_STORAGE_KEY};
pub use snapshot::CartSnapshot;
pub use state::EngineMode;

use state::EngineState;

/// Largest difference tolerated between the server's coupon discount and ours.
const DISCOUNT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Shopping cart state machine.
pub struct CartEngine {
    gateway: Arc<dyn CartGateway>,
    store: LocalCartStore,
    settings: CartSettings,
    latch: AsyncMutex<()>,
    state: Mutex<EngineState>,
    snapshots: watch::Sender<Arc<CartSnapshot>>,
}

impl fmt::Debug for CartEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartEngine")
            .field("store", &self.store)
            .field("settings", &self.settings)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl CartEngine {
    /// Create an engine for an anonymous session, loading the cart from local storage.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn CartGateway>,
        storage: Arc<dyn KeyValueStore>,
        settings: CartSettings,
    ) -> Self {
        let store = LocalCartStore::new(storage, settings.storage_key());
        let cart = Cart::normalized(store.read());

        let state = EngineState::new(EngineMode::AnonymousLocal, cart);
        let snapshot = Self::build_snapshot(&state, settings.currency());
        let (snapshots, _) = watch::channel(Arc::new(snapshot));

        Self {
            gateway,
            store,
            settings,
            latch: AsyncMutex::new(()),
            state: Mutex::new(state),
            snapshots,
        }
    }

    /// Create an engine for the session state detected at startup.
    ///
    /// An authenticated session starts from the remote cart. If that fetch fails the engine
    /// still starts, with an empty cart and the failure in [`CartSnapshot::last_error`].
    pub async fn start(
        gateway: Arc<dyn CartGateway>,
        storage: Arc<dyn KeyValueStore>,
        settings: CartSettings,
        session: SessionState,
    ) -> Self {
        let engine = Self::new(gateway, storage, settings);

        if session == SessionState::Authenticated {
            {
                let mut state = engine.lock_state();
                state.transition(EngineMode::AuthenticatedRemote, Cart::new());
                engine.publish(&mut state);
            }

            if let Err(error) = engine.refresh().await {
                warn!(%error, "initial cart fetch failed");
            }
        }

        engine
    }

    /// Latest snapshot. Never blocks on an in-flight operation and never performs I/O.
    #[must_use]
    pub fn snapshot(&self) -> Arc<CartSnapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    /// Observe every snapshot published from now on.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<CartSnapshot>> {
        self.snapshots.subscribe()
    }

    /// Which cart is authoritative right now.
    #[must_use]
    pub fn mode(&self) -> EngineMode {
        self.lock_state().mode
    }

    /// Engine settings.
    #[must_use]
    pub fn settings(&self) -> &CartSettings {
        &self.settings
    }

    /// Sum of effective line prices.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.snapshot().totals().subtotal()
    }

    /// Savings from variant discounts.
    #[must_use]
    pub fn product_discount_total(&self) -> Decimal {
        self.snapshot().totals().product_discount()
    }

    /// Discount granted by the applied coupon.
    #[must_use]
    pub fn coupon_discount(&self) -> Decimal {
        self.snapshot().totals().coupon_discount()
    }

    /// Subtotal minus coupon discount.
    #[must_use]
    pub fn final_total(&self) -> Decimal {
        self.snapshot().totals().final_total()
    }

    /// Total units in the cart.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.snapshot().item_count()
    }

    /// Add a variant to the cart, incrementing its line if it already has one.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Cart`]: the resulting quantity is out of range or above stock.
    /// - [`EngineError::Gateway`]: the remote cart refused the request.
    /// - [`EngineError::SyncInProgress`] / [`EngineError::Superseded`]: see the module docs.
    pub async fn add_item(&self, line: NewLine) -> Result<CartLine, EngineError> {
        let _latch = self.latch.lock().await;
        let max = self.settings.max_line_quantity();

        let generation = {
            let mut state = self.lock_state();

            match state.mode {
                EngineMode::Syncing => return Err(EngineError::SyncInProgress),
                EngineMode::AnonymousLocal => {
                    let added = state.cart.add(line, max)?;

                    self.store.write(state.cart.lines());
                    state.last_error = None;
                    self.publish(&mut state);

                    debug!(
                        line = %added.id(),
                        variant = %added.variant_id(),
                        quantity = added.quantity(),
                        "added local line"
                    );

                    return Ok(added);
                }
                EngineMode::AuthenticatedRemote => {}
            }

            check_quantity(line.quantity, max, line.price.stock)?;

            if let Some(existing) = state.cart.find_variant(line.variant_id) {
                let combined = existing.quantity().saturating_add(line.quantity);

                check_quantity(combined, max, line.price.stock.or(existing.price().stock))?;
            }

            debug!(variant = %line.variant_id, quantity = line.quantity, "adding remote line");

            state.generation
        };

        match self.gateway.add_item(line.variant_id, line.quantity).await {
            Ok(added) => self.commit(generation, |state| {
                state.cart.upsert(added.clone());
                Ok(added)
            }),
            Err(error) => Err(self.fail(generation, error)),
        }
    }

    /// Set a line's quantity.
    ///
    /// Quantities below one are rejected; remove the line instead.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Cart`]: unknown line, or the quantity is out of range or above stock.
    /// - [`EngineError::Gateway`]: the remote cart refused the update. The remote cart is
    ///   re-fetched before returning.
    /// - [`EngineError::SyncInProgress`] / [`EngineError::Superseded`]: see the module docs.
    pub async fn update_quantity(&self, id: &LineId, quantity: u32) -> Result<(), EngineError> {
        let max = self.settings.max_line_quantity();

        check_quantity(quantity, max, None)?;

        let _latch = self.latch.lock().await;

        let generation = {
            let mut state = self.lock_state();

            match state.mode {
                EngineMode::Syncing => return Err(EngineError::SyncInProgress),
                EngineMode::AnonymousLocal => {
                    state.cart.set_quantity(id, quantity, max)?;

                    self.store.write(state.cart.lines());
                    state.last_error = None;
                    self.publish(&mut state);

                    return Ok(());
                }
                EngineMode::AuthenticatedRemote => {}
            }

            let line = state.cart.get(id)?;

            check_quantity(quantity, max, line.price().stock)?;

            state.generation
        };

        match self.gateway.update_item(id, quantity).await {
            Ok(()) => self.commit(generation, |state| {
                state.cart.set_quantity(id, quantity, max)?;
                Ok(())
            }),
            Err(error) => Err(self.recover(generation, error).await),
        }
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Cart`]: unknown line.
    /// - [`EngineError::Gateway`]: the remote cart refused the removal. The remote cart is
    ///   re-fetched before returning.
    /// - [`EngineError::SyncInProgress`] / [`EngineError::Superseded`]: see the module docs.
    pub async fn remove_item(&self, id: &LineId) -> Result<CartLine, EngineError> {
        let _latch = self.latch.lock().await;

        let generation = {
            let mut state = self.lock_state();

            match state.mode {
                EngineMode::Syncing => return Err(EngineError::SyncInProgress),
                EngineMode::AnonymousLocal => {
                    let removed = state.cart.remove(id)?;

                    self.store.write(state.cart.lines());
                    state.last_error = None;
                    self.publish(&mut state);

                    return Ok(removed);
                }
                EngineMode::AuthenticatedRemote => {}
            }

            state.cart.get(id)?;

            state.generation
        };

        match self.gateway.remove_item(id).await {
            Ok(()) => self.commit(generation, |state| {
                state.cart.remove(id).map_err(EngineError::from)
            }),
            Err(error) => Err(self.recover(generation, error).await),
        }
    }

    /// Validate a coupon with the backend and apply it.
    ///
    /// A rejected coupon clears any coupon already applied.
    ///
    /// # Errors
    ///
    /// - [`EngineError::MissingCouponCode`]: the code is blank.
    /// - [`EngineError::SignInRequired`]: the session is anonymous.
    /// - [`EngineError::CouponRejected`]: the backend refused the coupon; carries its reason.
    /// - [`EngineError::Gateway`]: the backend could not be reached.
    /// - [`EngineError::SyncInProgress`] / [`EngineError::Superseded`]: see the module docs.
    pub async fn apply_coupon(&self, code: &str) -> Result<Totals, EngineError> {
        let code = code.trim();

        if code.is_empty() {
            return Err(EngineError::MissingCouponCode);
        }

        let _latch = self.latch.lock().await;

        let (generation, subtotal) = {
            let state = self.lock_state();

            match state.mode {
                EngineMode::Syncing => return Err(EngineError::SyncInProgress),
                EngineMode::AnonymousLocal => return Err(EngineError::SignInRequired),
                EngineMode::AuthenticatedRemote => {}
            }

            let subtotal =
                pricing::compute_totals(state.cart.lines(), None, self.settings.currency())
                    .subtotal();

            (state.generation, subtotal)
        };

        let validated = self.gateway.validate_coupon(code, subtotal).await;

        let mut state = self.lock_state();

        if state.generation != generation {
            warn!(coupon = code, "discarding coupon validation after session change");

            return Err(EngineError::Superseded);
        }

        match validated {
            Ok(validation) => {
                let local = pricing::coupon_discount(subtotal, &validation.coupon);

                if let Some(remote) = validation.discount
                    && (remote - local).abs() > DISCOUNT_TOLERANCE
                {
                    warn!(
                        coupon = code,
                        %remote,
                        %local,
                        "server coupon discount differs from local calculation"
                    );
                }

                info!(coupon = code, discount = %local, "coupon applied");

                state.coupon = Some(validation.coupon);
                state.last_error = None;

                let snapshot = self.publish(&mut state);

                Ok(*snapshot.totals())
            }
            Err(error) => {
                let message = error.user_message();

                info!(coupon = code, %error, "coupon rejected");

                state.coupon = None;
                state.last_error = Some(message.clone());
                self.publish(&mut state);

                match error.kind() {
                    GatewayErrorKind::Validation | GatewayErrorKind::Auth => {
                        Err(EngineError::CouponRejected(message))
                    }
                    GatewayErrorKind::Network => Err(error.into()),
                }
            }
        }
    }

    /// Remove the applied coupon, if any.
    pub fn remove_coupon(&self) {
        let mut state = self.lock_state();

        if let Some(coupon) = state.coupon.take() {
            info!(coupon = coupon.code(), "coupon removed");
        }

        self.publish(&mut state);
    }

    /// Empty the cart and drop the coupon.
    ///
    /// Anonymous carts are also removed from local storage. The remote cart is left as is.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SyncInProgress`] while a sign-in merge is running.
    pub async fn clear_cart(&self) -> Result<(), EngineError> {
        let _latch = self.latch.lock().await;
        let mut state = self.lock_state();

        match state.mode {
            EngineMode::Syncing => return Err(EngineError::SyncInProgress),
            EngineMode::AnonymousLocal => self.store.clear(),
            EngineMode::AuthenticatedRemote => {}
        }

        state.cart.clear();
        state.coupon = None;
        state.last_error = None;
        self.publish(&mut state);

        Ok(())
    }

    /// Reload the authoritative cart: local storage while anonymous, the remote cart once
    /// signed in.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Gateway`]: the remote cart could not be fetched.
    /// - [`EngineError::SyncInProgress`] / [`EngineError::Superseded`]: see the module docs.
    pub async fn refresh(&self) -> Result<(), EngineError> {
        let _latch = self.latch.lock().await;

        let generation = {
            let mut state = self.lock_state();

            match state.mode {
                EngineMode::Syncing => return Err(EngineError::SyncInProgress),
                EngineMode::AnonymousLocal => {
                    state.cart = Cart::normalized(self.store.read());
                    state.last_error = None;
                    self.publish(&mut state);

                    return Ok(());
                }
                EngineMode::AuthenticatedRemote => state.generation,
            }
        };

        match self.gateway.fetch_cart().await {
            Ok(lines) => self.commit(generation, |state| {
                state.cart = Cart::normalized(lines);
                Ok(())
            }),
            Err(error) => Err(self.fail(generation, error)),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply the result of a successful remote call, unless the session moved on meanwhile.
    fn commit<T>(
        &self,
        generation: u64,
        apply: impl FnOnce(&mut EngineState) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut state = self.lock_state();

        if state.generation != generation {
            warn!(generation, current = state.generation, "discarding stale cart response");

            return Err(EngineError::Superseded);
        }

        let result = apply(&mut state);

        if result.is_ok() {
            state.last_error = None;
        }

        self.publish(&mut state);

        result
    }

    /// Record a failed remote call without touching the cart.
    fn fail(&self, generation: u64, error: GatewayError) -> EngineError {
        let mut state = self.lock_state();

        if state.generation != generation {
            return EngineError::Superseded;
        }

        warn!(%error, "cart backend request failed");

        state.last_error = Some(error.user_message());
        self.publish(&mut state);

        error.into()
    }

    /// Record a failed remote mutation and re-fetch the authoritative cart.
    async fn recover(&self, generation: u64, error: GatewayError) -> EngineError {
        warn!(%error, "cart backend request failed; re-fetching cart");

        let fetched = self.gateway.fetch_cart().await;

        let mut state = self.lock_state();

        if state.generation != generation {
            return EngineError::Superseded;
        }

        match fetched {
            Ok(lines) => state.cart = Cart::normalized(lines),
            Err(fetch_error) => {
                warn!(%fetch_error, "could not re-fetch cart after failed update");
            }
        }

        state.last_error = Some(error.user_message());
        self.publish(&mut state);

        error.into()
    }

    /// Drop a coupon that no longer applies, recompute totals and publish a snapshot.
    fn publish(&self, state: &mut EngineState) -> Arc<CartSnapshot> {
        let currency = self.settings.currency();
        let subtotal = pricing::compute_totals(state.cart.lines(), None, currency).subtotal();

        let stale = state
            .coupon
            .as_ref()
            .is_some_and(|coupon| state.cart.is_empty() || !coupon.accepts_subtotal(subtotal));

        if stale && let Some(coupon) = state.coupon.take() {
            info!(coupon = coupon.code(), %subtotal, "coupon no longer applies to cart; cleared");
        }

        let snapshot = Arc::new(Self::build_snapshot(state, currency));

        self.snapshots
            .send_modify(|current| *current = Arc::clone(&snapshot));

        snapshot
    }

    fn build_snapshot(state: &EngineState, currency: &'static Currency) -> CartSnapshot {
        CartSnapshot {
            mode: state.mode,
            generation: state.generation,
            lines: state.cart.lines().to_vec(),
            coupon: state.coupon.clone(),
            totals: pricing::compute_totals(state.cart.lines(), state.coupon.as_ref(), currency),
            last_error: state.last_error.clone(),
        }
    }
}
