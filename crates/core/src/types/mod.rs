//! Core types for PVA Market.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod contact;
pub mod email;
pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod status;
pub mod user;

pub use cart::CartItem;
pub use contact::{ContactDetails, ContactError, require_guest_contact};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{NewOrder, Order, OrderLine, OrderOwner};
pub use price::{Price, PriceError};
pub use product::{Product, ProductCategory};
pub use status::*;
pub use user::User;
