//! `reqwest` implementation of [`StoreApi`].
//!
//! Talks JSON to the remote order service. The catalog is cached with `moka`
//! (5-minute TTL); everything else goes to the network on every call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use super::{
    AdminToken, ApiError, AuthSession, ChatMessage, ChatReply, Registration, StoreApi,
    sort_newest_first,
};
use crate::types::{
    ContactDetails, Email, NewOrder, Order, OrderId, OrderStatus, Product, User, UserId,
};

const CATALOG_KEY: &str = "catalog";
const CATALOG_TTL: Duration = Duration::from_secs(300);

/// HTTP client for the remote order service.
#[derive(Clone)]
pub struct HttpStoreApi {
    inner: Arc<HttpStoreApiInner>,
}

struct HttpStoreApiInner {
    client: Client,
    base_url: Url,
    catalog: Cache<&'static str, Arc<Vec<Product>>>,
}

impl std::fmt::Debug for HttpStoreApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStoreApi")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    contacts: &'a ContactDetails,
}

#[derive(Serialize)]
struct AdminLoginBody<'a> {
    password: &'a str,
}

#[derive(Serialize)]
struct StatusBody {
    status: OrderStatus,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    message: &'a str,
    history: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct AuthResponse {
    user: User,
    token: String,
}

#[derive(Deserialize)]
struct AdminLoginResponse {
    success: bool,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "message")]
    error: String,
}

impl HttpStoreApi {
    /// Create a client for the service at `base_url`.
    ///
    /// `timeout` bounds each request; `None` leaves requests unbounded.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Connectivity` if the URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Connectivity(format!("invalid backend URL: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Connectivity(e.to_string()))?;

        let catalog = Cache::builder()
            .max_capacity(1)
            .time_to_live(CATALOG_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(HttpStoreApiInner {
                client,
                base_url,
                catalog,
            }),
        })
    }

    /// The service base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| ApiError::Connectivity(format!("invalid endpoint {path}: {e}")))
    }

    /// Send a request and decode a JSON body, mapping transport and status
    /// failures to [`ApiError`].
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await.map_err(|e| {
            if e.is_decode() {
                ApiError::Decode(e.to_string())
            } else {
                ApiError::Connectivity(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Connectivity(e.to_string()))?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            warn!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to decode order service response"
            );
            ApiError::Decode(e.to_string())
        })
    }
}

/// Map a non-success status to the generic error variants.
fn status_error(status: StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body).map_or_else(
        |_| body.chars().take(200).collect::<String>(),
        |parsed| parsed.error,
    );

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ApiError::Rejected {
            status: status.as_u16(),
            message,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized,
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        _ => ApiError::Server {
            status: status.as_u16(),
            message,
        },
    }
}

impl From<AuthResponse> for AuthSession {
    fn from(response: AuthResponse) -> Self {
        Self {
            user: response.user,
            token: SecretString::from(response.token),
        }
    }
}

#[async_trait]
impl StoreApi for HttpStoreApi {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, ApiError> {
        let request = self
            .inner
            .client
            .post(self.endpoint("api/auth/login")?)
            .json(&LoginBody {
                email: email.as_str(),
                password: password.expose_secret(),
            });

        match self.send::<AuthResponse>(request).await {
            Ok(response) => Ok(response.into()),
            // The service answers a bad password with 401 or 400.
            Err(ApiError::Unauthorized | ApiError::Rejected { .. }) => {
                Err(ApiError::InvalidCredentials)
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, registration), fields(email = %registration.email))]
    async fn register(&self, registration: &Registration) -> Result<AuthSession, ApiError> {
        let request = self
            .inner
            .client
            .post(self.endpoint("api/auth/register")?)
            .json(&RegisterBody {
                name: &registration.name,
                email: registration.email.as_str(),
                password: registration.password.expose_secret(),
                contacts: &registration.contacts,
            });

        match self.send::<AuthResponse>(request).await {
            Ok(response) => Ok(response.into()),
            Err(ApiError::Rejected { message, .. }) if message.to_lowercase().contains("exist") => {
                Err(ApiError::UserExists)
            }
            Err(ApiError::Server { status: 409, .. }) => Err(ApiError::UserExists),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    async fn get_products(&self) -> Result<Vec<Product>, ApiError> {
        if let Some(products) = self.inner.catalog.get(&CATALOG_KEY).await {
            debug!("Cache hit for catalog");
            return Ok(products.as_ref().clone());
        }

        let request = self.inner.client.get(self.endpoint("api/products")?);
        let products: Vec<Product> = self.send(request).await?;
        self.inner
            .catalog
            .insert(CATALOG_KEY, Arc::new(products.clone()))
            .await;
        Ok(products)
    }

    #[instrument(skip(self, order), fields(lines = order.items.len(), total = %order.total))]
    async fn create_order(&self, order: &NewOrder) -> Result<Order, ApiError> {
        let request = self
            .inner
            .client
            .post(self.endpoint("api/orders")?)
            .json(order);
        self.send(request).await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn get_orders(&self, user_id: &UserId) -> Result<Vec<Order>, ApiError> {
        let request = self
            .inner
            .client
            .get(self.endpoint("api/orders")?)
            .query(&[("userId", user_id.as_str())]);
        let mut orders: Vec<Order> = self.send(request).await?;
        sort_newest_first(&mut orders);
        Ok(orders)
    }

    #[instrument(skip(self, token))]
    async fn get_all_orders(&self, token: &AdminToken) -> Result<Vec<Order>, ApiError> {
        let request = self
            .inner
            .client
            .get(self.endpoint("api/orders")?)
            .bearer_auth(token.expose());
        let mut orders: Vec<Order> = self.send(request).await?;
        sort_newest_first(&mut orders);
        Ok(orders)
    }

    #[instrument(skip(self, token), fields(order_id = %order_id, status = %status))]
    async fn update_order_status(
        &self,
        token: &AdminToken,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, ApiError> {
        let path = format!("api/orders/{order_id}/status");
        let request = self
            .inner
            .client
            .patch(self.endpoint(&path)?)
            .bearer_auth(token.expose())
            .json(&StatusBody { status });
        self.send(request).await
    }

    #[instrument(skip(self, password))]
    async fn admin_login(&self, password: &SecretString) -> Result<AdminToken, ApiError> {
        let request = self
            .inner
            .client
            .post(self.endpoint("api/auth/admin")?)
            .json(&AdminLoginBody {
                password: password.expose_secret(),
            });

        let response = match self.send::<AdminLoginResponse>(request).await {
            Ok(response) => response,
            Err(ApiError::Unauthorized | ApiError::Rejected { .. }) => {
                return Err(ApiError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        match (response.success, response.token) {
            (true, Some(token)) => Ok(AdminToken::new(token)),
            _ => Err(ApiError::InvalidCredentials),
        }
    }

    #[instrument(skip(self, message, history), fields(history = history.len()))]
    async fn send_chat_message(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<ChatReply, ApiError> {
        let request = self
            .inner
            .client
            .post(self.endpoint("api/chat")?)
            .json(&ChatBody { message, history });
        self.send(request).await
    }
}
