//! Unified error handling for the admin console.

use pva_market_core::{ApiError, OrderId};
use thiserror::Error;

/// Errors surfaced by user-initiated console actions.
///
/// Background polling never returns these; it logs and waits for the next
/// tick.
#[derive(Debug, Error)]
pub enum AdminError {
    /// The order service could not be reached at all. Distinct from a wrong
    /// password so the operator can be pointed at the backend override.
    #[error("Cannot reach backend at {base_url}")]
    BackendUnreachable { base_url: String },

    #[error("Invalid admin password")]
    InvalidPassword,

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Login already in progress")]
    LoginInProgress,

    /// `login` was called while a session is active. Log out first.
    #[error("Already logged in")]
    AlreadyAuthenticated,

    /// The admin token was rejected; a fresh login is needed.
    #[error("Admin session expired")]
    SessionExpired,

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl AdminError {
    /// Map a service error, naming `base_url` for connectivity failures.
    ///
    /// A 404 carries the server's message, not an id, so it maps to
    /// [`Self::NotFound`]. Callers that know which order they asked for use
    /// [`Self::from_order_api`].
    #[must_use]
    pub fn from_api(err: ApiError, base_url: &str) -> Self {
        match err {
            ApiError::Connectivity(_) => Self::BackendUnreachable {
                base_url: base_url.to_owned(),
            },
            ApiError::InvalidCredentials => Self::InvalidPassword,
            ApiError::Unauthorized => Self::SessionExpired,
            ApiError::UserExists => Self::Rejected("account already exists".to_string()),
            ApiError::Rejected { message, .. } => Self::Rejected(message),
            ApiError::NotFound(message) => Self::NotFound(message),
            ApiError::Server { status, message } => Self::Server(format!("{status}: {message}")),
            ApiError::Decode(message) => Self::Server(message),
        }
    }

    /// Map a service error from a call about `order_id`.
    #[must_use]
    pub fn from_order_api(err: ApiError, base_url: &str, order_id: &OrderId) -> Self {
        match err {
            ApiError::NotFound(_) => Self::OrderNotFound(order_id.clone()),
            other => Self::from_api(other, base_url),
        }
    }

    /// Whether the operator should be offered the backend URL override.
    #[must_use]
    pub const fn suggests_backend_override(&self) -> bool {
        matches!(self, Self::BackendUnreachable { .. })
    }

    /// Log the failure and capture server errors to Sentry.
    pub fn report(&self) {
        if matches!(self, Self::Server(_)) {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin console error"
            );
        } else {
            tracing::warn!(error = %self, "Admin action failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_is_not_a_password_problem() {
        let err = AdminError::from_api(
            ApiError::Connectivity("connection refused".to_string()),
            "http://127.0.0.1:3001/",
        );
        assert!(err.suggests_backend_override());
        assert_eq!(
            err.to_string(),
            "Cannot reach backend at http://127.0.0.1:3001/"
        );

        let err = AdminError::from_api(ApiError::InvalidCredentials, "http://x/");
        assert!(matches!(err, AdminError::InvalidPassword));
        assert!(!err.suggests_backend_override());
    }

    #[test]
    fn test_other_mappings() {
        assert!(matches!(
            AdminError::from_api(ApiError::Unauthorized, ""),
            AdminError::SessionExpired
        ));
        assert!(matches!(
            AdminError::from_api(
                ApiError::Server {
                    status: 500,
                    message: "boom".to_string()
                },
                ""
            ),
            AdminError::Server(_)
        ));
    }

    #[test]
    fn test_not_found_names_the_requested_order() {
        let missing = || ApiError::NotFound("no such row".to_string());

        let err = AdminError::from_api(missing(), "");
        assert!(matches!(err, AdminError::NotFound(ref m) if m == "no such row"));

        let id = OrderId::new("ord-42");
        let err = AdminError::from_order_api(missing(), "", &id);
        assert!(matches!(err, AdminError::OrderNotFound(ref got) if *got == id));
        assert_eq!(err.to_string(), "Order not found: ord-42");

        assert!(matches!(
            AdminError::from_order_api(ApiError::Unauthorized, "", &id),
            AdminError::SessionExpired
        ));
    }
}
