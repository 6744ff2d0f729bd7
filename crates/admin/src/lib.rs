//! PVA Market admin console library.
//!
//! Keeps a local copy of the order ledger in sync with the order service by
//! polling, and changes order statuses optimistically: the local record is
//! rewritten first, then reconciled with the server's answer or resynced by
//! a full re-fetch when the update fails.
//!
//! # Architecture
//!
//! - [`sync::AdminConsole`] owns the auth state machine and the poller
//! - [`board::OrderBoard`] is the local order state the console renders from
//! - All network access goes through [`pva_market_core::StoreApi`]

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod board;
pub mod config;
pub mod error;
pub mod sync;

pub use board::OrderBoard;
pub use config::AdminConfig;
pub use error::AdminError;
pub use sync::{AdminConsole, AdminView, AuthState};
