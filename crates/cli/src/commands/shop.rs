//! Catalog, cart, checkout, theme and assistant commands.
//!
//! # Usage
//!
//! ```bash
//! pva-cli products --category gaming
//! pva-cli cart add li-1 -q 2
//! pva-cli cart remove li-1
//! pva-cli checkout --telegram @alice
//! pva-cli theme toggle
//! pva-cli chat which accounts are aged
//! ```

use pva_market_core::{ContactDetails, ProductCategory, ProductId, Theme};

use crate::context::{CliError, Context};
use crate::output;

pub async fn products(
    context: &Context,
    category: Option<ProductCategory>,
) -> Result<(), CliError> {
    let mut products = context.storefront().products().await?;
    if let Some(category) = category {
        products.retain(|product| product.category == category);
    }
    output::products(&products);
    Ok(())
}

pub fn show_cart(context: &Context) {
    let storefront = context.storefront();
    output::cart(&storefront.cart(), storefront.cart_total());
}

pub async fn add(context: &Context, id: &ProductId, quantity: u32) -> Result<(), CliError> {
    let product = context
        .storefront()
        .add_product_by_id(id, quantity)
        .await?;
    output::line(&format!("Added {quantity} x {}", product.title));
    show_cart(context);
    Ok(())
}

pub fn remove(context: &Context, id: &ProductId) {
    if context.storefront().remove_from_cart(id) {
        output::line(&format!("Removed {id}"));
    } else {
        output::line(&format!("{id} is not in the cart"));
    }
    show_cart(context);
}

pub fn clear(context: &Context) {
    context.storefront().clear_cart();
    output::line("Cart cleared.");
}

/// Submit the cart. Guests must pass at least one contact handle.
pub async fn checkout(
    context: &Context,
    contact: Option<ContactDetails>,
) -> Result<(), CliError> {
    let order = context.storefront().checkout(contact.as_ref()).await?;
    output::line("Order placed:");
    output::order(&order);
    Ok(())
}

pub fn show_theme(context: &Context) {
    output::line(&context.storefront().theme().to_string());
}

pub fn set_theme(context: &Context, theme: Theme) {
    context.storefront().set_theme(theme);
    show_theme(context);
}

pub fn toggle_theme(context: &Context) {
    let theme = context.storefront().toggle_theme();
    output::line(&theme.to_string());
}

pub async fn chat(context: &Context, message: &str) -> Result<(), CliError> {
    let storefront = context.storefront();
    storefront.chat(message).await?;
    output::chat(&storefront.chat_history());
    Ok(())
}
