//! Order submission.
//!
//! Checkout is at-most-once per call: the cart stays the source of truth
//! until the order service acknowledges the order. There is no idempotency
//! key, so retrying after an ambiguous failure (such as a timeout) may
//! create a duplicate order.

use pva_market_core::{
    CartItem, ContactDetails, NewOrder, Order, OrderOwner, StoreApi, User, require_guest_contact,
};
use tracing::{info, instrument};

use crate::error::{AppError, ValidationError};

/// Build the create-order request for a cart snapshot.
///
/// Authenticated customers are identified by user id and any supplied
/// contact details are ignored; guests must supply a Telegram handle.
///
/// # Errors
///
/// Returns `ValidationError::EmptyCart` for an empty snapshot, or a contact
/// validation error for a guest without a usable Telegram handle.
pub fn prepare_order(
    user: Option<&User>,
    items: &[CartItem],
    contact: Option<&ContactDetails>,
) -> Result<NewOrder, ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::EmptyCart);
    }

    let owner = match user {
        Some(user) => OrderOwner::User(user.id.clone()),
        None => OrderOwner::Guest(require_guest_contact(contact)?),
    };
    Ok(NewOrder::from_cart(owner, items))
}

/// Validate and submit a cart snapshot.
///
/// Never touches the cart; clearing it after success is the caller's job.
///
/// # Errors
///
/// Returns `AppError::Validation` before any network call when the
/// preconditions fail, otherwise the mapped service error.
#[instrument(skip_all, fields(lines = items.len(), guest = user.is_none()))]
pub async fn submit_order(
    api: &dyn StoreApi,
    user: Option<&User>,
    items: &[CartItem],
    contact: Option<&ContactDetails>,
) -> Result<Order, AppError> {
    let request = prepare_order(user, items, contact)?;
    let order = api.create_order(&request).await?;
    info!(order_id = %order.id, total = %order.total, "Order created");
    Ok(order)
}
