//! Remote order service contract.
//!
//! [`StoreApi`] is the only network boundary in the system. The storefront
//! stores and the admin console call through it and never talk HTTP
//! directly, which keeps them testable against in-process fakes.
//!
//! # Example
//!
//! ```rust,ignore
//! use pva_market_core::api::{HttpStoreApi, StoreApi};
//!
//! let api = HttpStoreApi::new("http://127.0.0.1:3001", None)?;
//! let products = api.get_products().await?;
//! ```

#[cfg(feature = "fixture")]
pub mod fixture;
#[cfg(feature = "http")]
mod http;

#[cfg(feature = "fixture")]
pub use fixture::{Failure, FixtureStoreApi};
#[cfg(feature = "http")]
pub use http::HttpStoreApi;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{
    ContactDetails, Email, NewOrder, Order, OrderId, OrderStatus, Product, User, UserId,
};

/// Errors that can occur when calling the remote order service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Email/password (or admin password) did not match.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Registration email is already taken.
    #[error("an account with this email already exists")]
    UserExists,

    /// The admin token was missing, expired or rejected.
    #[error("unauthorized")]
    Unauthorized,

    /// The service could not be reached (DNS, refused connection, timeout).
    #[error("cannot reach backend: {0}")]
    Connectivity(String),

    /// The service rejected the request as invalid (HTTP 400).
    #[error("request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message reported by the service.
        message: String,
    },

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The service failed unexpectedly (HTTP 5xx or unexpected status).
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message reported by the service.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether the failure happened before the service answered.
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }

    /// Whether the failure is a credential or duplicate-account problem the
    /// caller should show verbatim.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials | Self::UserExists | Self::Unauthorized
        )
    }
}

/// Bearer token for admin-scoped calls. Redacted in `Debug`.
#[derive(Clone)]
pub struct AdminToken(SecretString);

impl AdminToken {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token, for building an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for AdminToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AdminToken([REDACTED])")
    }
}

/// Result of a successful customer login or registration.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// The authenticated customer.
    pub user: User,
    /// Customer session token.
    pub token: SecretString,
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub password: SecretString,
    pub contacts: ContactDetails,
}

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of the assistant conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    /// A turn typed by the customer.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    /// A turn produced by the assistant.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

/// Assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub text: String,
}

/// Remote order service operations.
#[async_trait]
pub trait StoreApi: Send + Sync {
    /// Authenticate a customer.
    ///
    /// Fails with [`ApiError::InvalidCredentials`] on an email/password
    /// mismatch.
    async fn login(&self, email: &Email, password: &SecretString)
    -> Result<AuthSession, ApiError>;

    /// Create an account and log it in.
    ///
    /// Fails with [`ApiError::UserExists`] when the email is taken.
    async fn register(&self, registration: &Registration) -> Result<AuthSession, ApiError>;

    /// Fetch the full catalog.
    async fn get_products(&self) -> Result<Vec<Product>, ApiError>;

    /// Submit an order.
    async fn create_order(&self, order: &NewOrder) -> Result<Order, ApiError>;

    /// Orders belonging to one customer, newest first.
    async fn get_orders(&self, user_id: &UserId) -> Result<Vec<Order>, ApiError>;

    /// Every order in the ledger (admin-scoped).
    async fn get_all_orders(&self, token: &AdminToken) -> Result<Vec<Order>, ApiError>;

    /// Change an order's status and return the stored record (admin-scoped).
    async fn update_order_status(
        &self,
        token: &AdminToken,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, ApiError>;

    /// Authenticate the admin console.
    ///
    /// A wrong password is [`ApiError::InvalidCredentials`]; an unreachable
    /// service is [`ApiError::Connectivity`].
    async fn admin_login(&self, password: &SecretString) -> Result<AdminToken, ApiError>;

    /// Forward a message to the shopping assistant.
    async fn send_chat_message(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<ChatReply, ApiError>;
}

/// Sort orders newest first.
pub fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_token_debug_redacts() {
        let token = AdminToken::new("super-secret-token");
        let debug = format!("{token:?}");
        assert!(!debug.contains("super-secret-token"));
        assert_eq!(token.expose(), "super-secret-token");
    }

    #[test]
    fn test_error_classification() {
        assert!(ApiError::Connectivity("refused".to_string()).is_connectivity());
        assert!(ApiError::InvalidCredentials.is_auth());
        assert!(
            !ApiError::Server {
                status: 500,
                message: "boom".to_string()
            }
            .is_auth()
        );
    }
}
