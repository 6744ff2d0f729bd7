//! Integration tests for PVA Market.
//!
//! The storefront and the admin console are wired to the same in-process
//! [`FixtureStoreApi`], so a test can check out as a customer and watch the
//! order arrive on the admin board.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pva-market-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `checkout` - Cart, session and order submission
//! - `admin_sync` - Polling, optimistic updates and reconciliation
//! - `persistence` - Restart behaviour on a real data directory

use std::sync::Arc;
use std::time::Duration;

use pva_market_admin::AdminConsole;
use pva_market_core::{
    Email, FixtureStoreApi, KeyValueStore, MemoryStore, Price, Product, ProductCategory,
    ProductId, User, UserId,
};
use pva_market_storefront::Storefront;
use secrecy::SecretString;

/// Admin poll period used by every console built here.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Password of [`customer`] in [`service`].
pub const CUSTOMER_PASSWORD: &str = "hunter2";

/// Admin password of [`service`].
pub const ADMIN_PASSWORD: &str = "admin";

#[must_use]
pub fn product(id: &str, title: &str, dollars: u32) -> Product {
    Product {
        id: ProductId::new(id),
        title: title.to_string(),
        category: ProductCategory::Social,
        price: Price::from_dollars(dollars),
        stock: 3,
        icon: String::new(),
        description: String::new(),
        features: Vec::new(),
    }
}

/// The catalog: a $300 `LinkedIn` account and a $5 Telegram account.
#[must_use]
pub fn catalog() -> Vec<Product> {
    vec![
        product("li-1", "LinkedIn", 300),
        product("tg-1", "Telegram", 5),
    ]
}

/// A registered customer.
///
/// # Panics
///
/// Panics if the hard-coded email stops parsing.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn customer() -> User {
    User {
        id: UserId::new("user-alice"),
        name: "Alice".to_string(),
        email: Email::parse("alice@example.com").unwrap(),
    }
}

/// Order service with [`catalog`] and [`customer`].
#[must_use]
pub fn service() -> FixtureStoreApi {
    FixtureStoreApi::new()
        .with_products(catalog())
        .with_account(customer(), CUSTOMER_PASSWORD)
        .with_admin_password(ADMIN_PASSWORD)
}

#[must_use]
pub fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

/// A storefront on `api` backed by `store`.
pub fn storefront(api: &FixtureStoreApi, store: Arc<dyn KeyValueStore>) -> Storefront {
    Storefront::init(Arc::new(api.clone()), store)
}

/// An unauthenticated admin console on `api` with a fresh session store.
#[must_use]
pub fn console(api: &FixtureStoreApi) -> AdminConsole {
    AdminConsole::new(
        Arc::new(api.clone()),
        Arc::new(MemoryStore::new()),
        "http://127.0.0.1:3001/",
        POLL_INTERVAL,
    )
}

/// Let spawned tasks run to completion under a paused clock.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
