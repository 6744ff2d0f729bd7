//! Orders as stored in the remote ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CartItem, ContactDetails, OrderId, OrderStatus, Price, ProductId, UserId};

/// One line of an order: a snapshot of the product at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub title: String,
    pub quantity: u32,
    /// Unit price at submission time.
    pub price: Price,
}

impl OrderLine {
    /// `price * quantity`.
    #[must_use]
    pub fn extension(&self) -> Price {
        self.price.line(self.quantity)
    }
}

impl From<&CartItem> for OrderLine {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product.id.clone(),
            title: item.product.title.clone(),
            quantity: item.quantity,
            price: item.product.price,
        }
    }
}

/// Who an order belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOwner {
    /// An authenticated customer.
    User(UserId),
    /// A guest identified by contact handles.
    Guest(ContactDetails),
}

/// An order as returned by the remote ledger.
///
/// Immutable apart from `status`, which only the admin path changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_details: Option<ContactDetails>,
    pub items: Vec<OrderLine>,
    pub total: Price,
    #[serde(default)]
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// The owning identity, preferring the account when both are present.
    #[must_use]
    pub fn owner(&self) -> OrderOwner {
        self.user_id.as_ref().map_or_else(
            || OrderOwner::Guest(self.contact_details.clone().unwrap_or_default()),
            |id| OrderOwner::User(id.clone()),
        )
    }

    /// Sum of line extensions, for checking against `total`.
    #[must_use]
    pub fn lines_total(&self) -> Price {
        self.items.iter().map(OrderLine::extension).sum()
    }

    /// Number of units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }
}

/// Body of a create-order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub user_id: Option<UserId>,
    pub items: Vec<OrderLine>,
    pub total: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_details: Option<ContactDetails>,
}

impl NewOrder {
    /// Assemble a request from a cart snapshot.
    ///
    /// The total is computed here from the snapshot's own prices; the server
    /// does not recompute it.
    #[must_use]
    pub fn from_cart(owner: OrderOwner, cart: &[CartItem]) -> Self {
        let items: Vec<OrderLine> = cart.iter().map(OrderLine::from).collect();
        let total = items.iter().map(OrderLine::extension).sum();
        let (user_id, contact_details) = match owner {
            OrderOwner::User(id) => (Some(id), None),
            OrderOwner::Guest(contact) => (None, Some(contact)),
        };

        Self {
            user_id,
            items,
            total,
            contact_details,
        }
    }
}
