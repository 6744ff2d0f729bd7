//! PVA Market Core - shared types library.
//!
//! This crate provides the types and contracts used across all PVA Market
//! components:
//! - `storefront` - Customer-side cart, session and checkout stores
//! - `admin` - Order-management console with polling sync
//! - `cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains types and traits. The only I/O lives behind the
//! `http` feature, which provides the `reqwest` implementation of the remote
//! API contract.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, emails, statuses and domain records
//! - [`storage`] - Durable key-value contract for client-side state
//! - [`api`] - Remote order service contract

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod storage;
pub mod types;

pub use api::{
    AdminToken, ApiError, AuthSession, ChatMessage, ChatReply, ChatRole, Registration, StoreApi,
    sort_newest_first,
};
#[cfg(feature = "fixture")]
pub use api::{Failure, FixtureStoreApi};
#[cfg(feature = "http")]
pub use api::HttpStoreApi;
pub use storage::{KeyValueStore, MemoryStore, StorageError};
pub use types::*;
