//! Session Transitions

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    cart::Cart,
    engine::{CartEngine, EngineError, EngineMode, MergeReport, merge},
};

/// Session state detected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No signed-in user.
    Anonymous,

    /// A user is signed in.
    Authenticated,
}

/// Authentication change reported by the session boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A user signed in.
    SignedIn,

    /// The user signed out.
    SignedOut,
}

/// What the engine did in response to a [`SessionEvent`].
#[derive(Debug)]
pub enum SessionTransition {
    /// Nothing; the engine was already in, or already moving to, the requested context.
    Ignored,

    /// The anonymous cart was merged into the remote cart, which is now authoritative.
    Merged(MergeReport),

    /// The remote cart was discarded and the anonymous cart reloaded.
    SignedOut,
}

impl CartEngine {
    /// React to a sign-in or sign-out.
    ///
    /// Signing in pushes every local line to the remote cart, clears local storage and then
    /// fetches the remote cart. A sign-in while signed in or while a merge is running is
    /// ignored. Signing out never waits for in-flight operations.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Superseded`] if the user signed out before the merge finished.
    pub async fn handle_session_event(
        &self,
        event: SessionEvent,
    ) -> Result<SessionTransition, EngineError> {
        match event {
            SessionEvent::SignedIn => self.sign_in().await,
            SessionEvent::SignedOut => Ok(self.sign_out()),
        }
    }

    /// Follow an `is_authenticated` signal until its sender is dropped.
    ///
    /// Events are handled one at a time; a sign-out that arrives during a merge is handled
    /// once the merge returns.
    pub async fn follow_session(&self, mut authenticated: watch::Receiver<bool>) {
        loop {
            let event = if *authenticated.borrow_and_update() {
                SessionEvent::SignedIn
            } else {
                SessionEvent::SignedOut
            };

            if let Err(error) = self.handle_session_event(event).await {
                warn!(?event, %error, "session transition did not complete");
            }

            if authenticated.changed().await.is_err() {
                debug!("session signal closed");

                break;
            }
        }
    }

    async fn sign_in(&self) -> Result<SessionTransition, EngineError> {
        let mode = self.mode();

        if mode != EngineMode::AnonymousLocal {
            debug!(%mode, "ignoring sign-in");

            return Ok(SessionTransition::Ignored);
        }

        // Local storage is read under the latch so lines still being pushed by a
        // superseded merge are never captured twice.
        let _latch = self.latch.lock().await;

        let (generation, local) = {
            let mut state = self.lock_state();

            if state.mode != EngineMode::AnonymousLocal {
                debug!(mode = %state.mode, "ignoring sign-in");

                return Ok(SessionTransition::Ignored);
            }

            let local = Cart::normalized(self.store.read());

            if local.is_empty() {
                state.transition(EngineMode::AuthenticatedRemote, Cart::new());
            } else {
                state.transition(EngineMode::Syncing, local.clone());
            }

            debug!(generation = state.generation, lines = local.len(), "signed in");

            self.publish(&mut state);

            (state.generation, local)
        };

        let mut report = if local.is_empty() {
            MergeReport::default()
        } else {
            let report = merge::push_lines(self.gateway.as_ref(), local.lines()).await;

            self.store.clear();

            report
        };

        let fetched = self.gateway.fetch_cart().await;

        let mut state = self.lock_state();

        if state.generation != generation {
            warn!(generation, current = state.generation, "discarding merge after session change");

            if state.mode == EngineMode::AnonymousLocal {
                state.cart = Cart::normalized(self.store.read());
                self.publish(&mut state);
            }

            return Err(EngineError::Superseded);
        }

        state.mode = EngineMode::AuthenticatedRemote;

        match fetched {
            Ok(lines) => {
                state.cart = Cart::normalized(lines);
                state.last_error = None;
            }
            Err(error) => {
                warn!(%error, "fetching remote cart after merge failed");

                state.cart = Cart::new();
                state.last_error = Some(error.user_message());
                report.fetch_error = Some(error);
            }
        }

        info!(
            merged = report.merged.len(),
            failed = report.failed.len(),
            lines = state.cart.len(),
            "cart merged into account"
        );

        self.publish(&mut state);

        Ok(SessionTransition::Merged(report))
    }

    fn sign_out(&self) -> SessionTransition {
        let mut state = self.lock_state();

        if state.mode == EngineMode::AnonymousLocal {
            debug!("ignoring sign-out");

            return SessionTransition::Ignored;
        }

        state.transition(EngineMode::AnonymousLocal, Cart::normalized(self.store.read()));

        info!(generation = state.generation, "signed out; reloaded local cart");

        self.publish(&mut state);

        SessionTransition::SignedOut
    }
}
