//! End-to-end cart, session and checkout behaviour against the fixture
//! order service.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use pva_market_core::{ContactDetails, ContactError, Failure, MemoryStore, Price, ProductId};
use pva_market_integration_tests::{CUSTOMER_PASSWORD, customer, secret, service, storefront};
use pva_market_storefront::{AppError, ValidationError};

fn li() -> ProductId {
    ProductId::new("li-1")
}

fn tg() -> ProductId {
    ProductId::new("tg-1")
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_adding_same_product_merges_lines() {
    let api = service();
    let shop = storefront(&api, Arc::new(MemoryStore::new()));

    shop.add_product_by_id(&li(), 1).await.unwrap();
    shop.add_product_by_id(&li(), 2).await.unwrap();

    let cart = shop.cart();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].quantity, 3);
    assert_eq!(shop.cart_total(), Price::from_dollars(900));
}

#[tokio::test]
async fn test_total_is_recomputed_after_remove() {
    let api = service();
    let shop = storefront(&api, Arc::new(MemoryStore::new()));

    shop.add_product_by_id(&li(), 1).await.unwrap();
    shop.add_product_by_id(&tg(), 2).await.unwrap();
    assert_eq!(shop.cart_total(), Price::from_dollars(310));

    assert!(shop.remove_from_cart(&li()));
    assert_eq!(shop.cart_total(), Price::from_dollars(10));
    assert_eq!(shop.item_count(), 2);
}

#[tokio::test]
async fn test_unknown_product_is_rejected() {
    let api = service();
    let shop = storefront(&api, Arc::new(MemoryStore::new()));

    let err = shop
        .add_product_by_id(&ProductId::new("nope"), 1)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::UnknownProduct(_))
    ));
    assert!(shop.cart().is_empty());
}

// =============================================================================
// Guest checkout
// =============================================================================

#[tokio::test]
async fn test_guest_checkout_sends_contact_and_total() {
    let api = service();
    let shop = storefront(&api, Arc::new(MemoryStore::new()));
    shop.add_product_by_id(&li(), 1).await.unwrap();

    let order = shop
        .checkout(Some(&ContactDetails::telegram("@alice")))
        .await
        .unwrap();

    let created = api.created_requests();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].user_id, None);
    assert_eq!(created[0].total, Price::from_dollars(300));
    assert_eq!(
        created[0]
            .contact_details
            .as_ref()
            .and_then(|c| c.telegram.as_deref()),
        Some("@alice")
    );
    assert_eq!(order.total, Price::from_dollars(300));
    assert!(shop.cart().is_empty());
}

#[tokio::test]
async fn test_guest_without_telegram_keeps_cart_and_sends_nothing() {
    let api = service();
    let shop = storefront(&api, Arc::new(MemoryStore::new()));
    shop.add_product_by_id(&li(), 1).await.unwrap();

    let err = shop.checkout(None).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::Contact(ContactError::Missing))
    ));

    let discord_only = ContactDetails {
        discord: Some("alice#1".to_string()),
        ..ContactDetails::default()
    };
    let err = shop.checkout(Some(&discord_only)).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::Contact(ContactError::MissingTelegram))
    ));

    assert!(api.created_requests().is_empty());
    assert_eq!(shop.cart().len(), 1);
}

#[tokio::test]
async fn test_empty_cart_is_rejected_before_network() {
    let api = service();
    let shop = storefront(&api, Arc::new(MemoryStore::new()));

    let err = shop
        .checkout(Some(&ContactDetails::telegram("@alice")))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::EmptyCart)
    ));
    assert!(api.created_requests().is_empty());
}

#[tokio::test]
async fn test_failed_submission_keeps_cart() {
    let api = service();
    let shop = storefront(&api, Arc::new(MemoryStore::new()));
    shop.add_product_by_id(&li(), 1).await.unwrap();

    api.fail_next_create(Failure::Server);
    let err = shop
        .checkout(Some(&ContactDetails::telegram("@alice")))
        .await
        .unwrap_err();
    assert!(err.is_server_class());
    assert_eq!(shop.cart().len(), 1);

    api.set_offline(true);
    let err = shop
        .checkout(Some(&ContactDetails::telegram("@alice")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Connectivity(_)));
    assert_eq!(shop.cart_total(), Price::from_dollars(300));
}

// =============================================================================
// Logged-in checkout and session
// =============================================================================

#[tokio::test]
async fn test_logged_in_checkout_lists_order() {
    let api = service();
    let shop = storefront(&api, Arc::new(MemoryStore::new()));
    shop.login("alice@example.com", secret(CUSTOMER_PASSWORD))
        .await
        .unwrap();
    shop.add_product_by_id(&tg(), 2).await.unwrap();

    let order = shop.checkout(None).await.unwrap();
    assert_eq!(order.user_id, Some(customer().id));
    assert_eq!(order.total, Price::from_dollars(10));

    let mine = shop.my_orders().await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, order.id);
}

#[tokio::test]
async fn test_logout_clears_user_and_cart() {
    let api = service();
    let shop = storefront(&api, Arc::new(MemoryStore::new()));
    shop.login("alice@example.com", secret(CUSTOMER_PASSWORD))
        .await
        .unwrap();
    shop.add_product_by_id(&li(), 1).await.unwrap();

    shop.logout();

    assert!(shop.current_user().is_none());
    assert!(shop.cart().is_empty());
    assert_eq!(shop.cart_total(), Price::ZERO);
    assert!(matches!(
        shop.my_orders().await.unwrap_err(),
        AppError::Validation(ValidationError::NotLoggedIn)
    ));
}

#[tokio::test]
async fn test_wrong_password_leaves_session_anonymous() {
    let api = service();
    let shop = storefront(&api, Arc::new(MemoryStore::new()));

    let err = shop
        .login("alice@example.com", secret("wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Auth(_)));
    assert!(shop.current_user().is_none());
}
