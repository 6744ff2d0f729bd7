//! Contact handles used to reach a customer about delivery.
//!
//! Guests have no account, so the operator identifies and reaches them
//! through these handles. Telegram is the designated required channel for
//! guest checkout; every other channel is optional.

use serde::{Deserialize, Serialize};

/// Validation failures for [`ContactDetails`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContactError {
    /// No contact details were supplied for a guest checkout.
    #[error("contact details are required for guest checkout")]
    Missing,
    /// The required Telegram handle is absent or blank.
    #[error("a Telegram handle is required for guest checkout")]
    MissingTelegram,
    /// Registration supplied no delivery channel at all.
    #[error("at least one contact handle is required")]
    NoChannel,
}

/// Typed contact bag with one required-for-guests field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other: Option<String>,
}

impl ContactDetails {
    /// Contact details with only a Telegram handle.
    #[must_use]
    pub fn telegram(handle: impl Into<String>) -> Self {
        Self {
            telegram: Some(handle.into()),
            ..Self::default()
        }
    }

    /// Trim every handle and drop the ones left blank.
    #[must_use]
    pub fn normalized(&self) -> Self {
        fn clean(field: Option<&String>) -> Option<String> {
            field
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
        }

        Self {
            telegram: clean(self.telegram.as_ref()),
            discord: clean(self.discord.as_ref()),
            whatsapp: clean(self.whatsapp.as_ref()),
            other: clean(self.other.as_ref()),
        }
    }

    /// Whether at least one channel carries a non-blank handle.
    #[must_use]
    pub fn has_any_channel(&self) -> bool {
        let cleaned = self.normalized();
        cleaned.telegram.is_some()
            || cleaned.discord.is_some()
            || cleaned.whatsapp.is_some()
            || cleaned.other.is_some()
    }

    /// Validate the bag for a guest checkout and return the normalized copy.
    ///
    /// # Errors
    ///
    /// Returns `ContactError::MissingTelegram` when the Telegram handle is
    /// absent or blank.
    pub fn validate_for_guest(&self) -> Result<Self, ContactError> {
        let cleaned = self.normalized();
        if cleaned.telegram.is_none() {
            return Err(ContactError::MissingTelegram);
        }
        Ok(cleaned)
    }

    /// Validate the bag for account registration and return the normalized
    /// copy.
    ///
    /// # Errors
    ///
    /// Returns `ContactError::NoChannel` when every handle is blank.
    pub fn validate_for_registration(&self) -> Result<Self, ContactError> {
        let cleaned = self.normalized();
        if !cleaned.has_any_channel() {
            return Err(ContactError::NoChannel);
        }
        Ok(cleaned)
    }
}

/// Validate optional guest contact details, treating `None` as missing.
///
/// # Errors
///
/// Returns `ContactError::Missing` for `None`, otherwise the result of
/// [`ContactDetails::validate_for_guest`].
pub fn require_guest_contact(
    contact: Option<&ContactDetails>,
) -> Result<ContactDetails, ContactError> {
    contact
        .ok_or(ContactError::Missing)?
        .validate_for_guest()
}
