//! The storefront store object.
//!
//! [`Storefront`] owns the cart, session and theme for one client process.
//! It is created once with [`Storefront::init`] (load persisted slots, seed
//! the in-memory state, publish the first snapshot) and handed to every
//! consumer by cloning; clones share state. Consumers observe changes
//! through [`Storefront::subscribe`].
//!
//! Every committed mutation writes its slot back to the key-value store
//! before the new snapshot is published.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pva_market_core::storage::{self, KeyValueStore, keys};
use pva_market_core::{
    CartItem, ChatMessage, ChatReply, ContactDetails, Order, Price, Product, ProductId, StoreApi,
    Theme, User,
};
use secrecy::SecretString;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

use crate::cart::Cart;
use crate::checkout;
use crate::error::{Result, ValidationError, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::persistence::{PersistedState, forget, persist};
use crate::session::{Credentials, Session, validate_registration};

/// Chat messages (both roles, so 10 exchanges) kept and sent as context.
pub const CHAT_HISTORY_LIMIT: usize = 20;

/// Point-in-time view of the customer state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub session: Session,
    pub cart: Vec<CartItem>,
    pub cart_total: Price,
    pub item_count: u32,
    pub theme: Theme,
}

struct LocalState {
    cart: Cart,
    session: Session,
    theme: Theme,
}

impl LocalState {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            session: self.session.clone(),
            cart: self.cart.items().to_vec(),
            cart_total: self.cart.total(),
            item_count: self.cart.item_count(),
            theme: self.theme,
        }
    }
}

/// Customer-side state shared by every consumer.
///
/// Cheap to clone via `Arc`.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    api: Arc<dyn StoreApi>,
    store: Arc<dyn KeyValueStore>,
    state: Mutex<LocalState>,
    chat: Mutex<Vec<ChatMessage>>,
    updates: watch::Sender<Snapshot>,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Load persisted state, seed the stores and publish the first snapshot.
    #[must_use]
    pub fn init(api: Arc<dyn StoreApi>, store: Arc<dyn KeyValueStore>) -> Self {
        let persisted = PersistedState::load(store.as_ref());
        if let Some(user) = &persisted.user {
            set_sentry_user(user);
        }

        let state = LocalState {
            cart: Cart::from_items(persisted.cart),
            session: Session::from(persisted.user),
            theme: persisted.theme,
        };
        let (updates, _) = watch::channel(state.snapshot());

        Self {
            inner: Arc::new(StorefrontInner {
                api,
                store,
                state: Mutex::new(state),
                chat: Mutex::new(Vec::new()),
                updates,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, LocalState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn chat_log(&self) -> MutexGuard<'_, Vec<ChatMessage>> {
        self.inner
            .chat
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self) -> &dyn KeyValueStore {
        self.inner.store.as_ref()
    }

    fn publish(&self, state: &LocalState) {
        self.inner.updates.send_replace(state.snapshot());
    }

    /// Apply a cart mutation, persist the cart and publish.
    fn update_cart<R>(&self, f: impl FnOnce(&mut Cart) -> R) -> R {
        let mut state = self.state();
        let result = f(&mut state.cart);
        persist(self.store(), keys::CART, state.cart.items());
        self.publish(&state);
        result
    }

    /// Receive a snapshot after every committed change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.inner.updates.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.state().snapshot()
    }

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn cart(&self) -> Vec<CartItem> {
        self.state().cart.items().to_vec()
    }

    #[must_use]
    pub fn cart_total(&self) -> Price {
        self.state().cart.total()
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.state().cart.item_count()
    }

    /// Add `quantity` units of `product` to the cart.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ZeroQuantity` for a zero quantity.
    pub fn add_to_cart(&self, product: Product, quantity: u32) -> Result<()> {
        let id = product.id.clone();
        self.update_cart(|cart| cart.add(product, quantity))?;
        debug!(product_id = %id, quantity, "Added to cart");
        add_breadcrumb("cart", "Added product", Some(&[("product_id", id.as_str())]));
        Ok(())
    }

    /// Look a product up in the catalog and add it to the cart.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnknownProduct` if the catalog has no such
    /// id, or the catalog fetch error.
    pub async fn add_product_by_id(&self, id: &ProductId, quantity: u32) -> Result<Product> {
        let product = self.product(id).await?;
        self.add_to_cart(product.clone(), quantity)?;
        Ok(product)
    }

    /// Remove a product's line. Returns whether anything was removed.
    pub fn remove_from_cart(&self, id: &ProductId) -> bool {
        self.update_cart(|cart| cart.remove(id))
    }

    pub fn clear_cart(&self) {
        self.update_cart(Cart::clear);
    }

    // -------------------------------------------------------------------------
    // Session
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn session(&self) -> Session {
        self.state().session.clone()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.state().session.user().cloned()
    }

    /// Enter `user`'s session. A guest cart carries over; a different
    /// customer's cart and chat do not.
    fn sign_in(&self, user: &User) {
        let mut state = self.state();
        let switched = state
            .session
            .user()
            .is_some_and(|previous| previous.id != user.id);
        if switched {
            state.cart.clear();
            persist(self.store(), keys::CART, state.cart.items());
        }
        state.session = Session::Authenticated(user.clone());
        persist(self.store(), keys::CURRENT_USER, user);
        self.publish(&state);
        drop(state);

        if switched {
            self.chat_log().clear();
            debug!(user_id = %user.id, "Customer switched, cart and chat cleared");
        }
        set_sentry_user(user);
    }

    /// Log in. On failure the session is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for malformed input,
    /// `AuthError::InvalidCredentials` for a mismatch, or a service error.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: SecretString) -> Result<User> {
        let credentials = Credentials::parse(email, password)?;
        let session = self
            .inner
            .api
            .login(&credentials.email, &credentials.password)
            .await?;
        self.sign_in(&session.user);
        info!(user_id = %session.user.id, "Customer logged in");
        Ok(session.user)
    }

    /// Create an account and log it in. On failure the session is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` before any network call when a field
    /// or the contact channel is missing, `AuthError::UserExists` for a
    /// taken email, or a service error.
    #[instrument(skip(self, password, contacts))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: SecretString,
        contacts: &ContactDetails,
    ) -> Result<User> {
        let registration = validate_registration(name, email, password, contacts)?;
        let session = self.inner.api.register(&registration).await?;
        self.sign_in(&session.user);
        info!(user_id = %session.user.id, "Customer registered");
        Ok(session.user)
    }

    /// Drop the session and empty the cart, so nothing carries over to the
    /// next identity.
    pub fn logout(&self) {
        let mut state = self.state();
        state.session = Session::Anonymous;
        state.cart.clear();
        forget(self.store(), keys::CURRENT_USER);
        persist(self.store(), keys::CART, state.cart.items());
        self.publish(&state);
        drop(state);

        self.chat_log().clear();
        clear_sentry_user();
        info!("Customer logged out");
    }

    // -------------------------------------------------------------------------
    // Checkout and orders
    // -------------------------------------------------------------------------

    /// Submit the cart as an order and clear it once the service confirms.
    ///
    /// Guests must pass contact details with a Telegram handle. On any
    /// failure the cart is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` (empty cart, missing guest contact)
    /// before any network call, otherwise the mapped service error.
    pub async fn checkout(&self, contact: Option<&ContactDetails>) -> Result<Order> {
        let (user, items) = {
            let state = self.state();
            (state.session.user().cloned(), state.cart.items().to_vec())
        };

        let order =
            checkout::submit_order(self.inner.api.as_ref(), user.as_ref(), &items, contact).await?;

        self.clear_cart();
        add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order.id.as_str())]));
        Ok(order)
    }

    /// The logged-in customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NotLoggedIn` for anonymous callers, or the
    /// service error.
    #[instrument(skip(self))]
    pub async fn my_orders(&self) -> Result<Vec<Order>> {
        let user = self.current_user().ok_or(ValidationError::NotLoggedIn)?;
        Ok(self.inner.api.get_orders(&user.id).await?)
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    /// The full catalog.
    ///
    /// # Errors
    ///
    /// Returns the service error.
    pub async fn products(&self) -> Result<Vec<Product>> {
        Ok(self.inner.api.get_products().await?)
    }

    /// One catalog entry.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnknownProduct` or the service error.
    pub async fn product(&self, id: &ProductId) -> Result<Product> {
        self.products()
            .await?
            .into_iter()
            .find(|product| &product.id == id)
            .ok_or_else(|| ValidationError::UnknownProduct(id.clone()).into())
    }

    // -------------------------------------------------------------------------
    // Theme
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.state().theme
    }

    pub fn set_theme(&self, theme: Theme) {
        let mut state = self.state();
        state.theme = theme;
        persist(self.store(), keys::THEME, &theme);
        self.publish(&state);
    }

    /// Switch to the other theme and return it.
    pub fn toggle_theme(&self) -> Theme {
        let theme = self.theme().toggle();
        self.set_theme(theme);
        theme
    }

    // -------------------------------------------------------------------------
    // Assistant
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn chat_history(&self) -> Vec<ChatMessage> {
        self.chat_log().clone()
    }

    /// Ask the shopping assistant, sending recent messages as context.
    ///
    /// The exchange is recorded only when the assistant answers.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::BlankMessage` or the service error.
    #[instrument(skip(self, message))]
    pub async fn chat(&self, message: &str) -> Result<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ValidationError::BlankMessage.into());
        }

        let history = self.chat_history();
        let reply = self
            .inner
            .api
            .send_chat_message(message, &history)
            .await?;

        let mut log = self.chat_log();
        log.push(ChatMessage::user(message));
        log.push(ChatMessage::assistant(reply.text.clone()));
        let excess = log.len().saturating_sub(CHAT_HISTORY_LIMIT);
        log.drain(..excess);
        Ok(reply)
    }

    // -------------------------------------------------------------------------
    // Teardown
    // -------------------------------------------------------------------------

    /// Flush every slot and publish a final snapshot. Call once at process
    /// exit.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Storage` if a slot cannot be written.
    pub fn shutdown(&self) -> Result<()> {
        let state = self.state();
        storage::save(self.store(), keys::CART, state.cart.items())?;
        match state.session.user() {
            Some(user) => storage::save(self.store(), keys::CURRENT_USER, user)?,
            None => self.store().remove(keys::CURRENT_USER)?,
        }
        storage::save(self.store(), keys::THEME, &state.theme)?;
        self.publish(&state);
        debug!("Storefront state flushed");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pva_market_core::{
        Email, Failure, FixtureStoreApi, MemoryStore, ProductCategory, UserId,
    };

    use super::*;
    use crate::error::{AppError, AuthError};

    fn product(id: &str, dollars: u32) -> Product {
        Product {
            id: ProductId::new(id),
            title: format!("Account {id}"),
            category: ProductCategory::Messaging,
            price: Price::from_dollars(dollars),
            stock: 5,
            icon: String::new(),
            description: String::new(),
            features: Vec::new(),
        }
    }

    fn alice() -> User {
        User {
            id: UserId::new("user-alice"),
            name: "Alice".to_string(),
            email: Email::parse("alice@example.com").unwrap(),
        }
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    fn setup() -> (Storefront, FixtureStoreApi, MemoryStore) {
        let api = FixtureStoreApi::new()
            .with_products(vec![product("li-1", 300), product("tg-1", 5)])
            .with_account(alice(), "hunter2");
        let store = MemoryStore::new();
        let storefront = Storefront::init(Arc::new(api.clone()), Arc::new(store.clone()));
        (storefront, api, store)
    }

    #[test]
    fn test_init_seeds_from_persisted_slots() {
        let store = MemoryStore::new();
        persist(&store, keys::CART, &[CartItem::new(product("li-1", 300), 2)]);
        persist(&store, keys::CURRENT_USER, &alice());
        persist(&store, keys::THEME, &Theme::Dark);

        let storefront = Storefront::init(Arc::new(FixtureStoreApi::new()), Arc::new(store));
        let snapshot = storefront.subscribe().borrow().clone();
        assert_eq!(snapshot.item_count, 2);
        assert_eq!(snapshot.cart_total, Price::from_dollars(600));
        assert_eq!(snapshot.session, Session::Authenticated(alice()));
        assert_eq!(snapshot.theme, Theme::Dark);
    }

    #[test]
    fn test_init_with_corrupt_slots_starts_empty() {
        let store = MemoryStore::with_slots([
            (keys::CART, "{{{"),
            (keys::CURRENT_USER, "[]"),
            (keys::THEME, "\"neon\""),
        ]);
        let storefront = Storefront::init(Arc::new(FixtureStoreApi::new()), Arc::new(store));
        let snapshot = storefront.snapshot();
        assert!(snapshot.cart.is_empty());
        assert_eq!(snapshot.session, Session::Anonymous);
        assert_eq!(snapshot.theme, Theme::Light);
    }

    #[test]
    fn test_cart_mutations_are_persisted_and_published() {
        let (storefront, _, store) = setup();
        let mut updates = storefront.subscribe();

        storefront.add_to_cart(product("li-1", 300), 1).unwrap();
        storefront.add_to_cart(product("li-1", 300), 2).unwrap();
        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().item_count, 3);

        let saved: Vec<CartItem> = storage::load(&store, keys::CART).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].quantity, 3);

        assert!(storefront.remove_from_cart(&ProductId::new("li-1")));
        let saved: Vec<CartItem> = storage::load(&store, keys::CART).unwrap();
        assert!(saved.is_empty());
        assert_eq!(storefront.cart_total(), Price::ZERO);
    }

    #[tokio::test]
    async fn test_add_product_by_id_uses_catalog() {
        let (storefront, _, _) = setup();
        storefront
            .add_product_by_id(&ProductId::new("tg-1"), 2)
            .await
            .unwrap();
        assert_eq!(storefront.cart_total(), Price::from_dollars(10));

        let err = storefront
            .add_product_by_id(&ProductId::new("nope"), 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::UnknownProduct(_))
        ));
    }

    #[tokio::test]
    async fn test_login_persists_user_and_keeps_cart() {
        let (storefront, _, store) = setup();
        storefront.add_to_cart(product("li-1", 300), 1).unwrap();

        let user = storefront
            .login("alice@example.com", secret("hunter2"))
            .await
            .unwrap();
        assert_eq!(user, alice());
        assert_eq!(storefront.item_count(), 1);
        assert_eq!(storage::load::<User>(&store, keys::CURRENT_USER), Some(alice()));
    }

    #[tokio::test]
    async fn test_switching_customer_drops_previous_cart_and_chat() {
        let bob = User {
            id: UserId::new("user-bob"),
            name: "Bob".to_string(),
            email: Email::parse("bob@example.com").unwrap(),
        };
        let api = FixtureStoreApi::new()
            .with_products(vec![product("li-1", 300)])
            .with_account(alice(), "hunter2")
            .with_account(bob.clone(), "swordfish");
        let store = MemoryStore::new();
        let storefront = Storefront::init(Arc::new(api), Arc::new(store.clone()));

        storefront
            .login("alice@example.com", secret("hunter2"))
            .await
            .unwrap();
        storefront.add_to_cart(product("li-1", 300), 2).unwrap();
        storefront.chat("hello").await.unwrap();

        storefront
            .login("bob@example.com", secret("swordfish"))
            .await
            .unwrap();
        assert_eq!(storefront.current_user(), Some(bob));
        assert!(storefront.cart().is_empty());
        assert!(storefront.chat_history().is_empty());
        assert_eq!(
            storage::load::<Vec<CartItem>>(&store, keys::CART),
            Some(Vec::new())
        );
    }

    #[tokio::test]
    async fn test_repeat_login_as_same_customer_keeps_cart() {
        let (storefront, _, _) = setup();
        storefront
            .login("alice@example.com", secret("hunter2"))
            .await
            .unwrap();
        storefront.add_to_cart(product("tg-1", 5), 3).unwrap();

        storefront
            .login("alice@example.com", secret("hunter2"))
            .await
            .unwrap();
        assert_eq!(storefront.item_count(), 3);
    }

    #[tokio::test]
    async fn test_failed_login_leaves_session_unchanged() {
        let (storefront, _, store) = setup();
        let err = storefront
            .login("alice@example.com", secret("wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::InvalidCredentials)));
        assert_eq!(storefront.session(), Session::Anonymous);
        assert_eq!(storage::load::<User>(&store, keys::CURRENT_USER), None);
    }

    #[tokio::test]
    async fn test_logout_clears_user_and_guest_cart() {
        let (storefront, _, store) = setup();
        storefront.add_to_cart(product("tg-1", 5), 4).unwrap();
        storefront
            .login("alice@example.com", secret("hunter2"))
            .await
            .unwrap();

        storefront.logout();
        assert_eq!(storefront.session(), Session::Anonymous);
        assert!(storefront.cart().is_empty());
        assert_eq!(storage::load::<User>(&store, keys::CURRENT_USER), None);
        assert_eq!(
            storage::load::<Vec<CartItem>>(&store, keys::CART),
            Some(Vec::new())
        );
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let (storefront, _, _) = setup();
        let err = storefront
            .register(
                "Alice Again",
                "alice@example.com",
                secret("pw"),
                &ContactDetails::telegram("@alice2"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::UserExists)));
        assert!(!storefront.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_register_logs_in() {
        let (storefront, _, _) = setup();
        let user = storefront
            .register(
                "Carol",
                "carol@example.com",
                secret("pw"),
                &ContactDetails::telegram("@carol"),
            )
            .await
            .unwrap();
        assert_eq!(storefront.current_user(), Some(user));
    }

    #[tokio::test]
    async fn test_guest_checkout_clears_cart_on_success() {
        let (storefront, api, store) = setup();
        storefront.add_to_cart(product("li-1", 300), 1).unwrap();
        let before = storefront.cart_total();

        let order = storefront
            .checkout(Some(&ContactDetails::telegram("@alice")))
            .await
            .unwrap();
        assert_eq!(order.total, before);
        assert!(storefront.cart().is_empty());
        assert_eq!(
            storage::load::<Vec<CartItem>>(&store, keys::CART),
            Some(Vec::new())
        );
        assert_eq!(api.created_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_checkout_failure_keeps_cart() {
        let (storefront, api, _) = setup();
        storefront.add_to_cart(product("li-1", 300), 1).unwrap();
        let before = storefront.cart();

        api.fail_next_create(Failure::Connectivity);
        let err = storefront
            .checkout(Some(&ContactDetails::telegram("@alice")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Connectivity(_)));
        assert_eq!(storefront.cart(), before);

        let err = storefront.checkout(None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(storefront.cart(), before);
    }

    #[tokio::test]
    async fn test_my_orders_requires_login() {
        let (storefront, _, _) = setup();
        let err = storefront.my_orders().await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::NotLoggedIn)
        ));

        storefront
            .login("alice@example.com", secret("hunter2"))
            .await
            .unwrap();
        storefront.add_to_cart(product("li-1", 300), 1).unwrap();
        let first = storefront.checkout(None).await.unwrap();
        storefront.add_to_cart(product("tg-1", 5), 1).unwrap();
        let second = storefront.checkout(None).await.unwrap();

        let orders = storefront.my_orders().await.unwrap();
        let ids: Vec<_> = orders.iter().map(|o| o.id.clone()).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn test_toggle_theme_persists() {
        let (storefront, _, store) = setup();
        assert_eq!(storefront.toggle_theme(), Theme::Dark);
        assert_eq!(storage::load::<Theme>(&store, keys::THEME), Some(Theme::Dark));
        assert_eq!(storefront.toggle_theme(), Theme::Light);
    }

    #[tokio::test]
    async fn test_chat_history_is_bounded() {
        let (storefront, _, _) = setup();
        assert!(matches!(
            storefront.chat("   ").await.unwrap_err(),
            AppError::Validation(ValidationError::BlankMessage)
        ));

        for i in 0..15 {
            storefront.chat(&format!("question {i}")).await.unwrap();
        }
        let history = storefront.chat_history();
        assert_eq!(history.len(), CHAT_HISTORY_LIMIT);
        assert_eq!(history.last().unwrap().role, pva_market_core::ChatRole::Assistant);

        let reply = storefront.chat("one more").await.unwrap();
        assert!(reply.text.starts_with("(20 earlier messages)"));
    }

    #[test]
    fn test_shutdown_flushes_slots() {
        let (storefront, _, store) = setup();
        storefront.add_to_cart(product("tg-1", 5), 1).unwrap();
        store.remove(keys::CART).unwrap();

        storefront.shutdown().unwrap();
        let saved: Vec<CartItem> = storage::load(&store, keys::CART).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(storage::load::<Theme>(&store, keys::THEME), Some(Theme::Light));
    }
}
