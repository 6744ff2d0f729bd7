//! Admin console commands.
//!
//! # Usage
//!
//! ```bash
//! # Follow the order board until Ctrl+C
//! PVA_MARKET_ADMIN_PASSWORD=... pva-cli admin watch
//!
//! # Mark an order shipped
//! PVA_MARKET_ADMIN_PASSWORD=... pva-cli admin set-status ord-42 shipped
//! ```
//!
//! # Environment Variables
//!
//! - `PVA_MARKET_ADMIN_PASSWORD` - Admin password (required)
//! - `PVA_MARKET_POLL_INTERVAL_SECS` - Seconds between polls (default: 5)

use std::sync::Arc;

use pva_market_admin::{AdminConsole, AuthState};
use pva_market_core::{MemoryStore, OrderId, OrderStatus};

use crate::context::{CliError, Context};
use crate::output;

/// Build a console and log it in. The token lives in memory only.
async fn connect(context: &Context) -> Result<AdminConsole, CliError> {
    let config = Context::admin_config()?;
    let password = config.require_password()?;
    let api = context.api();
    let base_url = api.base_url().to_string();
    let console = AdminConsole::new(
        api,
        Arc::new(MemoryStore::new()),
        base_url,
        config.poll_interval,
    );
    console.login(&password).await?;
    Ok(console)
}

/// Print the board, then again after every change until interrupted.
pub async fn watch(context: &Context, once: bool) -> Result<(), CliError> {
    let console = connect(context).await?;
    output::board(&console.view());
    if once {
        console.logout();
        return Ok(());
    }

    let mut updates = console.subscribe();
    updates.mark_unchanged();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = updates.borrow_and_update().clone();
                if view.auth != AuthState::Authenticated {
                    break;
                }
                if !view.loading {
                    output::board(&view);
                }
            }
        }
    }

    console.logout();
    Ok(())
}

pub async fn set_status(
    context: &Context,
    order_id: &OrderId,
    status: OrderStatus,
) -> Result<(), CliError> {
    let console = connect(context).await?;
    let result = console.update_status(order_id, status).await;
    console.logout();
    let order = result?;
    output::line("Updated:");
    output::order(&order);
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping watch");
}
