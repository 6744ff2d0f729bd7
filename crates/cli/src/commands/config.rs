//! Backend override management.
//!
//! The override is stored next to the cart and survives restarts; it wins
//! over `PVA_MARKET_API_URL`.

use pva_market_core::storage::{self, KeyValueStore, keys};
use pva_market_storefront::config::parse_url;

use crate::context::{CliError, Context};
use crate::output;

pub fn set_backend(context: &Context, raw: &str) -> Result<(), CliError> {
    let url = parse_url(keys::BACKEND_URL, raw)?;
    storage::save(context.store(), keys::BACKEND_URL, url.as_str())?;
    tracing::info!(backend = %url, "Backend override saved");
    output::line(&format!("Backend set to {url}"));
    Ok(())
}

pub fn clear_backend(context: &Context) -> Result<(), CliError> {
    context.store().remove(keys::BACKEND_URL)?;
    output::line(&format!(
        "Backend override cleared; using {}",
        context.config().api_url
    ));
    Ok(())
}

pub fn show(context: &Context) {
    let config = context.config();
    let overridden = storage::load::<String>(context.store(), keys::BACKEND_URL).is_some();
    output::line(&format!(
        "backend:   {}{}",
        context.api().base_url(),
        if overridden { " (override)" } else { "" }
    ));
    output::line(&format!("data dir:  {}", context.store().dir().display()));
    output::line(&format!(
        "timeout:   {}",
        config
            .api_timeout
            .map_or_else(|| "none".to_string(), |t| format!("{}s", t.as_secs()))
    ));
    output::line(&format!("theme:     {}", context.storefront().theme()));
}
