//! Restart behaviour with the on-disk store.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use pva_market_core::storage::{self, keys};
use pva_market_core::{Price, ProductId, Theme};
use pva_market_integration_tests::{CUSTOMER_PASSWORD, customer, secret, service, storefront};
use pva_market_storefront::StorefrontConfig;
use pva_market_storefront::persistence::FileStore;

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let api = service();

    {
        let shop = storefront(&api, Arc::new(FileStore::open(dir.path()).unwrap()));
        shop.login("alice@example.com", secret(CUSTOMER_PASSWORD))
            .await
            .unwrap();
        shop.add_product_by_id(&ProductId::new("li-1"), 2)
            .await
            .unwrap();
        shop.set_theme(Theme::Dark);
    }

    let shop = storefront(&api, Arc::new(FileStore::open(dir.path()).unwrap()));
    assert_eq!(shop.current_user(), Some(customer()));
    assert_eq!(shop.cart_total(), Price::from_dollars(600));
    assert_eq!(shop.theme(), Theme::Dark);
}

#[tokio::test]
async fn test_cart_file_is_flat_json() {
    let dir = tempfile::tempdir().unwrap();
    let api = service();
    let shop = storefront(&api, Arc::new(FileStore::open(dir.path()).unwrap()));
    shop.add_product_by_id(&ProductId::new("tg-1"), 3)
        .await
        .unwrap();

    let raw = std::fs::read_to_string(dir.path().join("cart.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value[0]["id"], "tg-1");
    assert_eq!(value[0]["quantity"], 3);
}

#[tokio::test]
async fn test_logout_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let api = service();

    {
        let shop = storefront(&api, Arc::new(FileStore::open(dir.path()).unwrap()));
        shop.login("alice@example.com", secret(CUSTOMER_PASSWORD))
            .await
            .unwrap();
        shop.add_product_by_id(&ProductId::new("li-1"), 1)
            .await
            .unwrap();
        shop.logout();
    }

    let shop = storefront(&api, Arc::new(FileStore::open(dir.path()).unwrap()));
    assert!(shop.current_user().is_none());
    assert!(shop.cart().is_empty());
}

#[test]
fn test_corrupt_files_start_fresh() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cart.json"), "not json").unwrap();
    std::fs::write(dir.path().join("theme.json"), "\"neon\"").unwrap();

    let shop = storefront(&service(), Arc::new(FileStore::open(dir.path()).unwrap()));
    assert!(shop.cart().is_empty());
    assert_eq!(shop.theme(), Theme::Light);
}

#[test]
fn test_backend_override_wins_over_configured_url() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    let config = StorefrontConfig::from_lookup(|key| {
        (key == "PVA_MARKET_API_URL").then(|| "http://10.0.0.1:3001".to_string())
    })
    .unwrap();

    assert_eq!(config.resolve_api_url(&store).as_str(), "http://10.0.0.1:3001/");

    storage::save(&store, keys::BACKEND_URL, "https://shop.example.com/").unwrap();
    assert_eq!(
        config.resolve_api_url(&store).as_str(),
        "https://shop.example.com/"
    );
}
