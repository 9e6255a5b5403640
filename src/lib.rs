//! Storefront Cart
//!
//! Shopping-cart reconciliation and pricing engine for a storefront client. Keeps an anonymous
//! cart in local storage, merges it into the account cart on sign-in and recomputes totals
//! under product discounts and coupons after every change.

pub mod cart;
pub mod coupons;
pub mod engine;
pub mod fixtures;
pub mod gateway;
pub mod lines;
pub mod prelude;
pub mod pricing;
pub mod storage;
pub mod totals;
