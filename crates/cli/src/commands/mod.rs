//! Command implementations, one module per area.

pub mod account;
pub mod admin;
pub mod config;
pub mod shop;
