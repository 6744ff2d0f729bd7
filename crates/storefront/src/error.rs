//! Unified error handling with Sentry integration.
//!
//! Every user-initiated storefront operation returns `Result<T, AppError>`.
//! The variants follow the failure taxonomy the UI cares about: validation
//! failures caught before any network call, credential problems shown
//! verbatim, connectivity problems, and server failures that are reported to
//! Sentry and shown as a generic message.

use pva_market_core::{ApiError, ContactError, EmailError, ProductId, StorageError, User};
use thiserror::Error;

/// A precondition that failed before any network call was attempted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("your cart is empty")]
    EmptyCart,

    #[error(transparent)]
    Contact(#[from] ContactError),

    #[error("invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("name must not be blank")]
    BlankName,

    #[error("password must not be blank")]
    BlankPassword,

    #[error("quantity must be at least 1")]
    ZeroQuantity,

    #[error("message must not be blank")]
    BlankMessage,

    #[error("you must be logged in")]
    NotLoggedIn,

    #[error("unknown product: {0}")]
    UnknownProduct(ProductId),
}

/// Credential failures reported by the order service.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account with this email already exists")]
    UserExists,

    #[error("Your session is no longer valid")]
    Unauthorized,
}

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Input failed a local precondition.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Credentials were rejected.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// The order service could not be reached.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// The order service refused the request as invalid.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The requested record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The order service failed unexpectedly.
    #[error("Server error: {0}")]
    Server(String),

    /// Local state could not be written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::InvalidCredentials => Self::Auth(AuthError::InvalidCredentials),
            ApiError::UserExists => Self::Auth(AuthError::UserExists),
            ApiError::Unauthorized => Self::Auth(AuthError::Unauthorized),
            ApiError::Connectivity(message) => Self::Connectivity(message),
            ApiError::Rejected { message, .. } => Self::Rejected(message),
            ApiError::NotFound(what) => Self::NotFound(what),
            ApiError::Server { status, message } => Self::Server(format!("{status}: {message}")),
            ApiError::Decode(message) => Self::Server(message),
        }
    }
}

impl From<ContactError> for AppError {
    fn from(err: ContactError) -> Self {
        Self::Validation(err.into())
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        Self::Validation(err.into())
    }
}

impl AppError {
    /// Whether this failure should be captured to Sentry.
    #[must_use]
    pub const fn is_server_class(&self) -> bool {
        matches!(self, Self::Server(_) | Self::Storage(_))
    }

    /// Message safe to show to the customer.
    ///
    /// Validation and auth failures are shown as-is; server and
    /// connectivity details stay in the logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => capitalize(&err.to_string()),
            Self::Auth(err) => err.to_string(),
            Self::Connectivity(_) => {
                "Cannot reach the store right now. Check your connection and try again."
                    .to_string()
            }
            Self::Rejected(message) => format!("The store rejected this request: {message}"),
            Self::NotFound(_) => "That item could not be found".to_string(),
            Self::Server(_) => "Something went wrong on our side. Please try again.".to_string(),
            Self::Storage(_) => "Could not save your data locally".to_string(),
        }
    }

    /// Log the failure and capture server-class errors to Sentry.
    pub fn report(&self) {
        if self.is_server_class() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        } else if matches!(self, Self::Connectivity(_)) {
            tracing::warn!(error = %self, "Order service unreachable");
        } else {
            tracing::debug!(error = %self, "Request refused");
        }
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from the logged-in customer.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user: &User) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user.id.to_string()),
            email: Some(user.email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added product", Some(&[("product_id", "li-1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
