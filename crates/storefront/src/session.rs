//! Customer session state and the local checks that run before the order
//! service is asked to log in or register anyone.

use pva_market_core::{ContactDetails, Email, Registration, User};
use secrecy::{ExposeSecret, SecretString};

use crate::error::ValidationError;

/// Who is using the storefront.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated(User),
}

impl Session {
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(user) => Some(user),
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

impl From<Option<User>> for Session {
    fn from(user: Option<User>) -> Self {
        user.map_or(Self::Anonymous, Self::Authenticated)
    }
}

/// Validated login input.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: Email,
    pub password: SecretString,
}

impl Credentials {
    /// Check login input locally.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Email` for a malformed address or
    /// `ValidationError::BlankPassword` for an empty password.
    pub fn parse(email: &str, password: SecretString) -> Result<Self, ValidationError> {
        let email = Email::parse(email)?;
        if password.expose_secret().is_empty() {
            return Err(ValidationError::BlankPassword);
        }
        Ok(Self { email, password })
    }
}

/// Check registration input locally and build the request.
///
/// At least one contact channel is required so the operator can reach the
/// account holder.
///
/// # Errors
///
/// Returns the first failing `ValidationError`: blank name, bad email,
/// blank password, then missing contact channel.
pub fn validate_registration(
    name: &str,
    email: &str,
    password: SecretString,
    contacts: &ContactDetails,
) -> Result<Registration, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::BlankName);
    }
    let Credentials { email, password } = Credentials::parse(email, password)?;
    let contacts = contacts.validate_for_registration()?;

    Ok(Registration {
        name: name.to_owned(),
        email,
        password,
        contacts,
    })
}
