//! The admin console following the ledger the storefront writes to.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use pva_market_admin::{AdminError, AuthState};
use pva_market_core::{ContactDetails, Failure, MemoryStore, OrderStatus, ProductId};
use pva_market_integration_tests::{
    ADMIN_PASSWORD, CUSTOMER_PASSWORD, POLL_INTERVAL, console, secret, service, settle,
    storefront,
};

async fn next_poll() {
    tokio::time::sleep(POLL_INTERVAL + Duration::from_millis(100)).await;
    settle().await;
}

#[tokio::test(start_paused = true)]
async fn test_customer_order_appears_on_next_poll() {
    let api = service();
    let admin = console(&api);
    admin.login(&secret(ADMIN_PASSWORD)).await.unwrap();
    assert!(admin.orders().is_empty());

    let shop = storefront(&api, Arc::new(MemoryStore::new()));
    shop.add_product_by_id(&ProductId::new("li-1"), 1)
        .await
        .unwrap();
    let order = shop
        .checkout(Some(&ContactDetails::telegram("@alice")))
        .await
        .unwrap();

    next_poll().await;
    let orders = admin.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, order.id);
    assert_eq!(orders[0].status, OrderStatus::Pending);
}

#[tokio::test(start_paused = true)]
async fn test_optimistic_update_reconciles_to_server_status() {
    let api = service();
    let shop = storefront(&api, Arc::new(MemoryStore::new()));
    shop.add_product_by_id(&ProductId::new("li-1"), 1)
        .await
        .unwrap();
    let order = shop
        .checkout(Some(&ContactDetails::telegram("@alice")))
        .await
        .unwrap();

    let admin = console(&api);
    admin.login(&secret(ADMIN_PASSWORD)).await.unwrap();

    api.hold_updates();
    api.override_next_status(OrderStatus::Completed);
    let update = {
        let admin = admin.clone();
        let id = order.id.clone();
        tokio::spawn(async move { admin.update_status(&id, OrderStatus::Shipped).await })
    };
    settle().await;

    // The local record moves before the server answers.
    assert_eq!(
        admin.order(&order.id).map(|o| o.status),
        Some(OrderStatus::Shipped)
    );

    api.release_updates(1);
    let stored = update.await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Completed);
    assert_eq!(
        admin.order(&order.id).map(|o| o.status),
        Some(OrderStatus::Completed)
    );
}

#[tokio::test(start_paused = true)]
async fn test_status_change_is_visible_to_customer() {
    let api = service();
    let shop = storefront(&api, Arc::new(MemoryStore::new()));
    shop.login("alice@example.com", secret(CUSTOMER_PASSWORD))
        .await
        .unwrap();
    shop.add_product_by_id(&ProductId::new("tg-1"), 1)
        .await
        .unwrap();
    let order = shop.checkout(None).await.unwrap();

    let admin = console(&api);
    admin.login(&secret(ADMIN_PASSWORD)).await.unwrap();
    admin
        .update_status(&order.id, OrderStatus::Processing)
        .await
        .unwrap();

    let mine = shop.my_orders().await.unwrap();
    assert_eq!(mine[0].status, OrderStatus::Processing);
}

#[tokio::test(start_paused = true)]
async fn test_failed_update_resyncs_from_server() {
    let api = service();
    let shop = storefront(&api, Arc::new(MemoryStore::new()));
    shop.add_product_by_id(&ProductId::new("li-1"), 1)
        .await
        .unwrap();
    let order = shop
        .checkout(Some(&ContactDetails::telegram("@alice")))
        .await
        .unwrap();

    let admin = console(&api);
    admin.login(&secret(ADMIN_PASSWORD)).await.unwrap();
    let fetches = api.fetch_all_calls();

    api.fail_next_update(Failure::Server);
    let err = admin
        .update_status(&order.id, OrderStatus::Shipped)
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::Server(_)));

    settle().await;
    assert!(api.fetch_all_calls() > fetches);
    assert_eq!(
        admin.order(&order.id).map(|o| o.status),
        Some(OrderStatus::Pending)
    );
}

#[tokio::test(start_paused = true)]
async fn test_poll_failure_keeps_list_and_polling_continues() {
    let api = service();
    let shop = storefront(&api, Arc::new(MemoryStore::new()));
    shop.add_product_by_id(&ProductId::new("li-1"), 1)
        .await
        .unwrap();
    shop.checkout(Some(&ContactDetails::telegram("@alice")))
        .await
        .unwrap();

    let admin = console(&api);
    admin.login(&secret(ADMIN_PASSWORD)).await.unwrap();
    assert_eq!(admin.orders().len(), 1);

    api.fail_next_fetch_all(Failure::Server);
    next_poll().await;
    assert_eq!(admin.orders().len(), 1);
    assert_eq!(admin.auth_state(), AuthState::Authenticated);

    let before = api.fetch_all_calls();
    next_poll().await;
    assert_eq!(api.fetch_all_calls(), before + 1);
    assert_eq!(admin.orders().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_logout_stops_polling() {
    let api = service();
    let admin = console(&api);
    admin.login(&secret(ADMIN_PASSWORD)).await.unwrap();
    admin.logout();

    let calls = api.fetch_all_calls();
    next_poll().await;
    next_poll().await;
    assert_eq!(api.fetch_all_calls(), calls);
    assert!(admin.orders().is_empty());
    assert_eq!(admin.auth_state(), AuthState::Unauthenticated);
}
