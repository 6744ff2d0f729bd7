//! Customer account commands.

use pva_market_core::ContactDetails;
use secrecy::SecretString;

use crate::context::{CliError, Context};
use crate::output;

pub async fn register(
    context: &Context,
    name: &str,
    email: &str,
    password: SecretString,
    contacts: &ContactDetails,
) -> Result<(), CliError> {
    let user = context
        .storefront()
        .register(name, email, password, contacts)
        .await?;
    output::line("Registered and logged in:");
    output::user(Some(&user));
    Ok(())
}

pub async fn login(context: &Context, email: &str, password: SecretString) -> Result<(), CliError> {
    let user = context.storefront().login(email, password).await?;
    output::line("Logged in:");
    output::user(Some(&user));
    Ok(())
}

/// Log out. The cart is emptied as well.
pub fn logout(context: &Context) {
    context.storefront().logout();
    output::line("Logged out.");
}

pub fn whoami(context: &Context) {
    output::user(context.storefront().current_user().as_ref());
}

pub async fn orders(context: &Context) -> Result<(), CliError> {
    let orders = context.storefront().my_orders().await?;
    output::orders(&orders);
    Ok(())
}
