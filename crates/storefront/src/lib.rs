//! PVA Market Storefront library.
//!
//! The customer-side state core: cart, session and theme stores backed by a
//! durable key-value store, and the checkout pipeline that turns a cart into
//! an order in the remote ledger.
//!
//! # Architecture
//!
//! - [`state::Storefront`] is the single store object handed to consumers
//! - [`cart`], [`session`] and [`checkout`] hold the pure rules
//! - [`persistence`] provides the on-disk key-value store
//! - All network access goes through [`pva_market_core::StoreApi`]

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod persistence;
pub mod session;
pub mod state;

pub use config::StorefrontConfig;
pub use error::{AppError, AuthError, ValidationError};
pub use state::{Snapshot, Storefront};
