//! Customer identity.

use serde::{Deserialize, Serialize};

use super::{Email, UserId};

/// An authenticated customer as the client sees it.
///
/// The credential never leaves the server; only id, name and email are held
/// in the session and persisted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
}
