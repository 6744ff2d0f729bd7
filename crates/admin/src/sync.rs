//! Admin session and order synchronization.
//!
//! # States
//!
//! `Unauthenticated -> Authenticating -> Authenticated`, and back to
//! `Unauthenticated` on a failed login or on logout.
//!
//! # Polling
//!
//! While authenticated, a timer task triggers a full fetch every poll
//! interval. Each tick spawns its fetch without waiting for the previous
//! one, so fetches may overlap; whichever completes last overwrites the
//! board. Every continuation compares the session generation it started
//! under with the current one and drops its result on mismatch, so nothing
//! lands after logout or after the console is dropped.
//!
//! Only the first fetch after login and [`AdminConsole::refresh`] raise the
//! loading flag. Polls and [`AdminConsole::force_sync`] are silent, and
//! their failures are logged rather than returned.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use pva_market_core::storage::{self, KeyValueStore, keys};
use pva_market_core::{AdminToken, ApiError, Order, OrderId, OrderStatus, StoreApi};
use secrecy::SecretString;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::board::OrderBoard;
use crate::error::AdminError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated,
}

/// What the console renders from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminView {
    pub auth: AuthState,
    pub board: OrderBoard,
    pub loading: bool,
}

struct ConsoleState {
    auth: AuthState,
    token: Option<AdminToken>,
    board: OrderBoard,
    /// In-flight fetches that show the loading indicator.
    loading: u32,
    /// Bumped on every login and logout.
    generation: u64,
    poller: Option<JoinHandle<()>>,
}

impl ConsoleState {
    fn view(&self) -> AdminView {
        AdminView {
            auth: self.auth,
            board: self.board.clone(),
            loading: self.loading > 0,
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.auth == AuthState::Authenticated
    }

    fn stop_poller(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

struct ConsoleInner {
    api: Arc<dyn StoreApi>,
    session: Arc<dyn KeyValueStore>,
    base_url: String,
    poll_interval: Duration,
    state: Mutex<ConsoleState>,
    updates: watch::Sender<AdminView>,
}

impl Drop for ConsoleInner {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        state.stop_poller();
    }
}

/// Admin order console.
///
/// Cheap to clone via `Arc`. The poller holds only a weak reference, so
/// dropping the last handle stops it.
#[derive(Clone)]
pub struct AdminConsole {
    inner: Arc<ConsoleInner>,
}

impl std::fmt::Debug for AdminConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConsole")
            .field("base_url", &self.inner.base_url)
            .field("auth", &self.auth_state())
            .finish_non_exhaustive()
    }
}

/// Holds one unit of the loading count for a loud fetch and gives it back
/// when dropped, so a cancelled fetch cannot leave the indicator stuck.
struct LoadingGuard<'a> {
    console: &'a AdminConsole,
    generation: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.console.state();
        // logout already zeroed the count for older generations
        if state.generation == self.generation && state.loading > 0 {
            state.loading -= 1;
            self.console.publish(&state);
        }
    }
}

/// Returns an unfinished login to `Unauthenticated` when dropped, unless
/// the session moved on first.
struct PendingLogin<'a> {
    console: &'a AdminConsole,
    generation: u64,
}

impl Drop for PendingLogin<'_> {
    fn drop(&mut self) {
        let mut state = self.console.state();
        if state.generation == self.generation && state.auth == AuthState::Authenticating {
            state.auth = AuthState::Unauthenticated;
            self.console.publish(&state);
        }
    }
}

/// Which indicator a fetch drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchMode {
    Loud,
    Silent,
}

impl AdminConsole {
    /// Create an unauthenticated console.
    ///
    /// `session` holds the admin token for the lifetime of the process;
    /// `base_url` is only used to name the backend in connectivity errors.
    #[must_use]
    pub fn new(
        api: Arc<dyn StoreApi>,
        session: Arc<dyn KeyValueStore>,
        base_url: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        let state = ConsoleState {
            auth: AuthState::Unauthenticated,
            token: None,
            board: OrderBoard::new(),
            loading: 0,
            generation: 0,
            poller: None,
        };
        let (updates, _) = watch::channel(state.view());

        Self {
            inner: Arc::new(ConsoleInner {
                api,
                session,
                base_url: base_url.into(),
                poll_interval,
                state: Mutex::new(state),
                updates,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ConsoleState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &ConsoleState) {
        self.inner.updates.send_replace(state.view());
    }

    fn api_error(&self, err: ApiError) -> AdminError {
        AdminError::from_api(err, &self.inner.base_url)
    }

    // -------------------------------------------------------------------------
    // Observation
    // -------------------------------------------------------------------------

    /// Receive a view after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AdminView> {
        self.inner.updates.subscribe()
    }

    #[must_use]
    pub fn view(&self) -> AdminView {
        self.state().view()
    }

    #[must_use]
    pub fn auth_state(&self) -> AuthState {
        self.state().auth
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state().loading > 0
    }

    /// Local orders, newest first.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.state().board.orders().to_vec()
    }

    #[must_use]
    pub fn order(&self, id: &OrderId) -> Option<Order> {
        self.state().board.get(id).cloned()
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    // -------------------------------------------------------------------------
    // Session
    // -------------------------------------------------------------------------

    /// Authenticate, then load the orders and start polling.
    ///
    /// A failure to load the first batch of orders does not fail the login;
    /// it is logged and the next poll tries again. Dropping the future
    /// before the service answers leaves the console `Unauthenticated`.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::BackendUnreachable` when the service cannot be
    /// reached, `AdminError::InvalidPassword` for a wrong password,
    /// `AdminError::LoginInProgress` if another login is pending, or
    /// `AdminError::AlreadyAuthenticated` while a session is active. The
    /// password is not checked in the last two cases.
    #[instrument(skip(self, password))]
    pub async fn login(&self, password: &SecretString) -> Result<(), AdminError> {
        let started = {
            let mut state = self.state();
            match state.auth {
                AuthState::Authenticating => return Err(AdminError::LoginInProgress),
                AuthState::Authenticated => return Err(AdminError::AlreadyAuthenticated),
                AuthState::Unauthenticated => {}
            }
            state.auth = AuthState::Authenticating;
            self.publish(&state);
            state.generation
        };
        let pending = PendingLogin {
            console: self,
            generation: started,
        };

        let token = match self.inner.api.admin_login(password).await {
            Ok(token) => token,
            Err(e) => {
                drop(pending);
                let err = self.api_error(e);
                warn!(error = %err, "Admin login failed");
                return Err(err);
            }
        };
        let generation = self.enter_session(token.clone(), AuthState::Authenticating, started)?;
        drop(pending);
        info!("Admin logged in");

        if let Err(e) = self.fetch(generation, &token, FetchMode::Loud).await {
            warn!(error = %e, "Initial order fetch failed");
        }
        Ok(())
    }

    /// Resume a session whose token is still held in the session store.
    /// Returns whether a session was resumed.
    pub async fn resume(&self) -> bool {
        let Some(raw) = storage::load::<String>(self.inner.session.as_ref(), keys::ADMIN_TOKEN)
        else {
            return false;
        };
        let token = AdminToken::new(raw);
        let started = self.state().generation;
        match self.enter_session(token.clone(), AuthState::Unauthenticated, started) {
            Ok(generation) => {
                debug!("Resumed admin session");
                if let Err(e) = self.fetch(generation, &token, FetchMode::Loud).await {
                    warn!(error = %e, "Order fetch after resume failed");
                }
                true
            }
            Err(_) => false,
        }
    }

    /// Switch from `from` to `Authenticated`, remember the token and start
    /// the poller. Fails if the state moved on since generation `started`
    /// (a logout during a pending login).
    fn enter_session(
        &self,
        token: AdminToken,
        from: AuthState,
        started: u64,
    ) -> Result<u64, AdminError> {
        let mut state = self.state();
        if state.auth != from || state.generation != started {
            return Err(AdminError::NotAuthenticated);
        }
        state.generation += 1;
        let generation = state.generation;
        state.auth = AuthState::Authenticated;
        if let Err(e) = storage::save(
            self.inner.session.as_ref(),
            keys::ADMIN_TOKEN,
            token.expose(),
        ) {
            warn!(error = %e, "Failed to store admin token");
        }
        state.token = Some(token);
        state.stop_poller();
        state.poller = Some(self.spawn_poller(generation));
        self.publish(&state);
        Ok(generation)
    }

    /// Leave the session: stop the poller, forget the token and orders.
    pub fn logout(&self) {
        let mut state = self.state();
        state.generation += 1;
        state.auth = AuthState::Unauthenticated;
        state.token = None;
        state.board.clear();
        state.loading = 0;
        state.stop_poller();
        if let Err(e) = self.inner.session.remove(keys::ADMIN_TOKEN) {
            warn!(error = %e, "Failed to clear admin token");
        }
        self.publish(&state);
        drop(state);
        info!("Admin logged out");
    }

    fn session_token(&self) -> Result<(AdminToken, u64), AdminError> {
        let state = self.state();
        match (&state.auth, &state.token) {
            (AuthState::Authenticated, Some(token)) => Ok((token.clone(), state.generation)),
            _ => Err(AdminError::NotAuthenticated),
        }
    }

    // -------------------------------------------------------------------------
    // Fetching
    // -------------------------------------------------------------------------

    fn spawn_poller(&self, generation: u64) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.poll_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let console = Self { inner };
                let token = {
                    let state = console.state();
                    if !state.is_current(generation) {
                        break;
                    }
                    state.token.clone()
                };
                if let Some(token) = token {
                    console.spawn_background_fetch(generation, token);
                }
            }
            debug!(generation, "Order poller stopped");
        })
    }

    /// Start a silent fetch that applies its result only if the console is
    /// still alive and still in the same session.
    fn spawn_background_fetch(&self, generation: u64, token: AdminToken) {
        let api = Arc::clone(&self.inner.api);
        let weak: Weak<ConsoleInner> = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            let result = api.get_all_orders(&token).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let console = Self { inner };
            if let Err(e) = console.apply(generation, result) {
                warn!(error = %e, "Background order poll failed");
            }
        });
    }

    fn begin_loading(&self, generation: u64) -> Option<LoadingGuard<'_>> {
        let mut state = self.state();
        if !state.is_current(generation) {
            return None;
        }
        state.loading += 1;
        self.publish(&state);
        Some(LoadingGuard {
            console: self,
            generation,
        })
    }

    async fn fetch(
        &self,
        generation: u64,
        token: &AdminToken,
        mode: FetchMode,
    ) -> Result<(), AdminError> {
        let _loading = match mode {
            FetchMode::Loud => match self.begin_loading(generation) {
                Some(guard) => Some(guard),
                None => return Ok(()),
            },
            FetchMode::Silent => None,
        };

        let result = self.inner.api.get_all_orders(token).await;
        self.apply(generation, result)
    }

    fn apply(
        &self,
        generation: u64,
        result: Result<Vec<Order>, ApiError>,
    ) -> Result<(), AdminError> {
        let mut state = self.state();
        if !state.is_current(generation) {
            debug!(generation, "Discarding order fetch from a previous session");
            return Ok(());
        }

        let outcome = match result {
            Ok(orders) => {
                debug!(count = orders.len(), "Applied order fetch");
                state.board.replace_all(orders);
                Ok(())
            }
            Err(e) => Err(self.api_error(e)),
        };
        self.publish(&state);
        outcome
    }

    /// Fetch every order with the loading indicator shown.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotAuthenticated` outside a session, or the
    /// fetch error. The board keeps its previous contents on failure.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), AdminError> {
        let (token, generation) = self.session_token()?;
        self.fetch(generation, &token, FetchMode::Loud).await
    }

    /// Fetch every order silently; failures are logged only.
    pub async fn force_sync(&self) {
        let Ok((token, generation)) = self.session_token() else {
            return;
        };
        if let Err(e) = self.fetch(generation, &token, FetchMode::Silent).await {
            warn!(error = %e, "Order resync failed");
        }
    }

    // -------------------------------------------------------------------------
    // Status updates
    // -------------------------------------------------------------------------

    /// Change an order's status optimistically.
    ///
    /// The local record shows `status` immediately. On success it is
    /// replaced by the order the server returns, which may differ from what
    /// was requested. On failure nothing is rolled back by hand; the whole
    /// board is re-fetched instead.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotAuthenticated`, `AdminError::OrderNotFound`
    /// when the order is not on the board or the server no longer has it,
    /// or the update error.
    #[instrument(skip_all, fields(order_id = %order_id, status = %status))]
    pub async fn update_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, AdminError> {
        let (token, generation) = {
            let mut state = self.state();
            let token = match (&state.auth, &state.token) {
                (AuthState::Authenticated, Some(token)) => token.clone(),
                _ => return Err(AdminError::NotAuthenticated),
            };
            if !state.board.set_status(order_id, status) {
                return Err(AdminError::OrderNotFound(order_id.clone()));
            }
            self.publish(&state);
            (token, state.generation)
        };

        match self
            .inner
            .api
            .update_order_status(&token, order_id, status)
            .await
        {
            Ok(order) => {
                let mut state = self.state();
                if state.is_current(generation) {
                    if order.status != status {
                        info!(applied = %order.status, "Server applied a different status");
                    }
                    state.board.reconcile(order.clone());
                    self.publish(&state);
                }
                Ok(order)
            }
            Err(e) => {
                let err = AdminError::from_order_api(e, &self.inner.base_url, order_id);
                warn!(error = %err, "Status update failed, resyncing");
                let still_current = self.state().is_current(generation);
                if still_current {
                    self.force_sync().await;
                }
                Err(err)
            }
        }
    }
}
