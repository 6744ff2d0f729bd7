//! In-process implementation of [`StoreApi`] for tests and offline demos.
//!
//! Behaves like a tiny order ledger: accounts, a catalog and an order list
//! held in memory. Knobs let a test script failures, take the service
//! offline, override the status the server "decides" on, or hold responses
//! until the test releases them.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Semaphore;

use super::{
    AdminToken, ApiError, AuthSession, ChatMessage, ChatReply, Registration, StoreApi,
    sort_newest_first,
};
use crate::types::{
    Email, NewOrder, Order, OrderId, OrderStatus, Product, User, UserId,
};

const FIXTURE_ADMIN_TOKEN: &str = "fixture-admin-token";

/// A failure the fixture can be told to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Behave as if the service were unreachable.
    Connectivity,
    /// Answer with HTTP 500.
    Server,
    /// Answer with HTTP 400.
    Rejected,
}

impl Failure {
    fn into_error(self) -> ApiError {
        match self {
            Self::Connectivity => ApiError::Connectivity("connection refused".to_owned()),
            Self::Server => ApiError::Server {
                status: 500,
                message: "internal error".to_owned(),
            },
            Self::Rejected => ApiError::Rejected {
                status: 400,
                message: "rejected by fixture".to_owned(),
            },
        }
    }
}

struct Account {
    user: User,
    password: String,
}

#[derive(Default)]
struct FixtureState {
    products: Vec<Product>,
    accounts: Vec<Account>,
    orders: Vec<Order>,
    admin_password: String,
    offline: bool,
    fail_create: Option<Failure>,
    fail_fetch_all: Vec<Failure>,
    fail_update: Option<Failure>,
    status_override: Option<OrderStatus>,
    created: Vec<NewOrder>,
    fetch_all_calls: usize,
    update_calls: usize,
    next_id: u64,
}

/// Scripted in-memory order service.
#[derive(Clone, Default)]
pub struct FixtureStoreApi {
    state: Arc<Mutex<FixtureState>>,
    update_gate: Arc<Mutex<Option<Arc<Semaphore>>>>,
    fetch_gate: Arc<Mutex<Option<Arc<Semaphore>>>>,
    admin_login_gate: Arc<Mutex<Option<Arc<Semaphore>>>>,
}

impl std::fmt::Debug for FixtureStoreApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixtureStoreApi").finish_non_exhaustive()
    }
}

impl FixtureStoreApi {
    /// Empty ledger with admin password `admin`.
    #[must_use]
    pub fn new() -> Self {
        let fixture = Self::default();
        fixture.state().admin_password = "admin".to_owned();
        fixture
    }

    fn state(&self) -> MutexGuard<'_, FixtureState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the catalog.
    #[must_use]
    pub fn with_products(self, products: Vec<Product>) -> Self {
        self.state().products = products;
        self
    }

    /// Register an account directly.
    #[must_use]
    pub fn with_account(self, user: User, password: &str) -> Self {
        self.state().accounts.push(Account {
            user,
            password: password.to_owned(),
        });
        self
    }

    /// Change the admin password.
    #[must_use]
    pub fn with_admin_password(self, password: &str) -> Self {
        password.clone_into(&mut self.state().admin_password);
        self
    }

    /// Seed an order in the ledger.
    #[must_use]
    pub fn with_order(self, order: Order) -> Self {
        self.state().orders.push(order);
        self
    }

    /// Simulate losing or regaining the network.
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// Make the next `create_order` fail.
    pub fn fail_next_create(&self, failure: Failure) {
        self.state().fail_create = Some(failure);
    }

    /// Make the next `get_all_orders` fail.
    pub fn fail_next_fetch_all(&self, failure: Failure) {
        self.state().fail_fetch_all.push(failure);
    }

    /// Make the next `update_order_status` fail.
    pub fn fail_next_update(&self, failure: Failure) {
        self.state().fail_update = Some(failure);
    }

    /// Store this status instead of the requested one on the next update.
    pub fn override_next_status(&self, status: OrderStatus) {
        self.state().status_override = Some(status);
    }

    /// Change an order behind the client's back (another admin's write).
    pub fn set_order_status(&self, order_id: &OrderId, status: OrderStatus) {
        if let Some(order) = self.state().orders.iter_mut().find(|o| &o.id == order_id) {
            order.status = status;
        }
    }

    /// Delete an order behind the client's back.
    pub fn remove_order(&self, order_id: &OrderId) {
        self.state().orders.retain(|o| &o.id != order_id);
    }

    /// Block status updates until [`Self::release_updates`] is called.
    pub fn hold_updates(&self) {
        *self
            .update_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `n` held status updates proceed.
    pub fn release_updates(&self, n: usize) {
        if let Some(gate) = self
            .update_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            gate.add_permits(n);
        }
    }

    /// Block admin order fetches until [`Self::release_fetches`] is called.
    pub fn hold_fetches(&self) {
        *self
            .fetch_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `n` held admin order fetches proceed.
    pub fn release_fetches(&self, n: usize) {
        if let Some(gate) = self
            .fetch_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            gate.add_permits(n);
        }
    }

    /// Block admin logins until [`Self::release_admin_logins`] is called.
    pub fn hold_admin_logins(&self) {
        *self
            .admin_login_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `n` held admin logins proceed.
    pub fn release_admin_logins(&self, n: usize) {
        if let Some(gate) = self
            .admin_login_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            gate.add_permits(n);
        }
    }

    /// Every order request received so far, in arrival order.
    #[must_use]
    pub fn created_requests(&self) -> Vec<NewOrder> {
        self.state().created.clone()
    }

    /// Current ledger contents.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.state().orders.clone()
    }

    /// How many admin order fetches have been served or attempted.
    #[must_use]
    pub fn fetch_all_calls(&self) -> usize {
        self.state().fetch_all_calls
    }

    /// How many status updates have been attempted.
    #[must_use]
    pub fn update_calls(&self) -> usize {
        self.state().update_calls
    }

    fn check_online(&self) -> Result<(), ApiError> {
        if self.state().offline {
            return Err(Failure::Connectivity.into_error());
        }
        Ok(())
    }

    fn check_admin(token: &AdminToken) -> Result<(), ApiError> {
        if token.expose() == FIXTURE_ADMIN_TOKEN {
            Ok(())
        } else {
            Err(ApiError::Unauthorized)
        }
    }

    async fn pass_gate(gate: &Mutex<Option<Arc<Semaphore>>>) {
        let gate = gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(gate) = gate
            && let Ok(permit) = gate.acquire().await
        {
            permit.forget();
        }
    }
}

#[async_trait]
impl StoreApi for FixtureStoreApi {
    async fn login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, ApiError> {
        self.check_online()?;
        let state = self.state();
        state
            .accounts
            .iter()
            .find(|a| &a.user.email == email && a.password == password.expose_secret())
            .map(|a| AuthSession {
                user: a.user.clone(),
                token: SecretString::from(format!("session-{}", a.user.id)),
            })
            .ok_or(ApiError::InvalidCredentials)
    }

    async fn register(&self, registration: &Registration) -> Result<AuthSession, ApiError> {
        self.check_online()?;
        let mut state = self.state();
        if state
            .accounts
            .iter()
            .any(|a| a.user.email == registration.email)
        {
            return Err(ApiError::UserExists);
        }

        state.next_id += 1;
        let user = User {
            id: UserId::new(format!("user-{}", state.next_id)),
            name: registration.name.clone(),
            email: registration.email.clone(),
        };
        state.accounts.push(Account {
            user: user.clone(),
            password: registration.password.expose_secret().to_owned(),
        });

        Ok(AuthSession {
            token: SecretString::from(format!("session-{}", user.id)),
            user,
        })
    }

    async fn get_products(&self) -> Result<Vec<Product>, ApiError> {
        self.check_online()?;
        Ok(self.state().products.clone())
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Order, ApiError> {
        self.check_online()?;
        let mut state = self.state();
        state.created.push(order.clone());
        if let Some(failure) = state.fail_create.take() {
            return Err(failure.into_error());
        }

        state.next_id += 1;
        let sequence = i64::try_from(state.next_id).unwrap_or(i64::MAX);
        let stored = Order {
            id: OrderId::new(format!("ord-{}", state.next_id)),
            user_id: order.user_id.clone(),
            contact_details: order.contact_details.clone(),
            items: order.items.clone(),
            total: order.total,
            status: OrderStatus::Pending,
            // Strictly increasing so newest-first ordering is deterministic.
            created_at: Utc::now() + ChronoDuration::milliseconds(sequence),
        };
        state.orders.push(stored.clone());
        Ok(stored)
    }

    async fn get_orders(&self, user_id: &UserId) -> Result<Vec<Order>, ApiError> {
        self.check_online()?;
        let mut orders: Vec<Order> = self
            .state()
            .orders
            .iter()
            .filter(|o| o.user_id.as_ref() == Some(user_id))
            .cloned()
            .collect();
        sort_newest_first(&mut orders);
        Ok(orders)
    }

    async fn get_all_orders(&self, token: &AdminToken) -> Result<Vec<Order>, ApiError> {
        {
            let mut state = self.state();
            state.fetch_all_calls += 1;
            if state.offline {
                return Err(Failure::Connectivity.into_error());
            }
            if !state.fail_fetch_all.is_empty() {
                let failure = state.fail_fetch_all.remove(0);
                return Err(failure.into_error());
            }
        }
        Self::check_admin(token)?;

        // Snapshot before waiting so a held fetch returns the state as of
        // its arrival, like a slow response would.
        let mut orders = self.state().orders.clone();
        Self::pass_gate(&self.fetch_gate).await;
        sort_newest_first(&mut orders);
        Ok(orders)
    }

    async fn update_order_status(
        &self,
        token: &AdminToken,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, ApiError> {
        self.state().update_calls += 1;
        Self::pass_gate(&self.update_gate).await;
        self.check_online()?;
        Self::check_admin(token)?;

        let mut state = self.state();
        if let Some(failure) = state.fail_update.take() {
            return Err(failure.into_error());
        }
        let applied = state.status_override.take().unwrap_or(status);
        let order = state
            .orders
            .iter_mut()
            .find(|o| &o.id == order_id)
            .ok_or_else(|| ApiError::NotFound(order_id.to_string()))?;
        order.status = applied;
        Ok(order.clone())
    }

    async fn admin_login(&self, password: &SecretString) -> Result<AdminToken, ApiError> {
        Self::pass_gate(&self.admin_login_gate).await;
        self.check_online()?;
        if password.expose_secret() == self.state().admin_password {
            Ok(AdminToken::new(FIXTURE_ADMIN_TOKEN))
        } else {
            Err(ApiError::InvalidCredentials)
        }
    }

    async fn send_chat_message(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<ChatReply, ApiError> {
        self.check_online()?;
        Ok(ChatReply {
            text: format!("({} earlier messages) you said: {message}", history.len()),
        })
    }
}
