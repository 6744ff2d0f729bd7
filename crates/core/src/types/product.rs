//! Catalog product records.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// Product category.
///
/// The catalog uses a small fixed set; anything the client does not know
/// about deserializes as [`ProductCategory::Other`] instead of failing the
/// whole catalog fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductCategory {
    Social,
    Messaging,
    Email,
    Marketplace,
    Gaming,
    #[default]
    #[serde(other)]
    Other,
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Social => "social",
            Self::Messaging => "messaging",
            Self::Email => "email",
            Self::Marketplace => "marketplace",
            Self::Gaming => "gaming",
            Self::Other => "other",
        })
    }
}

/// A catalog item. Immutable once fetched.
///
/// `stock` is display data only; nothing in the client enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub category: ProductCategory,
    pub price: Price,
    #[serde(default)]
    pub stock: u32,
    /// Opaque display reference (emoji, icon name or URL).
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
}

impl Product {
    /// Whether the catalog lists any units.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}
