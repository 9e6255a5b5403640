//! Engine State

use std::fmt::{self, Display, Formatter};

use crate::{cart::Cart, coupons::Coupon};

/// Which cart is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    /// The cart lives in local storage; no session.
    AnonymousLocal,

    /// Local lines are being pushed to the remote cart after sign-in.
    Syncing,

    /// The remote cart is authoritative.
    AuthenticatedRemote,
}

impl Display for EngineMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AnonymousLocal => "anonymous",
            Self::Syncing => "syncing",
            Self::AuthenticatedRemote => "authenticated",
        })
    }
}

#[derive(Debug)]
pub(crate) struct EngineState {
    pub(crate) mode: EngineMode,
    pub(crate) generation: u64,
    pub(crate) cart: Cart,
    pub(crate) coupon: Option<Coupon>,
    pub(crate) last_error: Option<String>,
}

impl EngineState {
    pub(crate) fn new(mode: EngineMode, cart: Cart) -> Self {
        Self {
            mode,
            generation: 0,
            cart,
            coupon: None,
            last_error: None,
        }
    }

    /// Enter a new session context. Responses to operations started before this point are
    /// discarded.
    pub(crate) fn transition(&mut self, mode: EngineMode, cart: Cart) {
        self.generation = self.generation.wrapping_add(1);
        self.mode = mode;
        self.cart = cart;
        self.coupon = None;
        self.last_error = None;
    }
}
