//! PVA Market CLI - storefront and admin console from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog and fill the cart
//! pva-cli products
//! pva-cli cart add li-1 --quantity 2
//!
//! # Check out as a guest
//! pva-cli checkout --telegram @alice
//!
//! # Watch the order board as admin (polls every 5 seconds)
//! PVA_MARKET_ADMIN_PASSWORD=... pva-cli admin watch
//!
//! # Point the CLI at another backend
//! pva-cli config set-backend https://shop.example.com
//! ```
//!
//! # Commands
//!
//! - `products` - List the catalog
//! - `cart` - Show or change the cart
//! - `checkout` - Submit the cart as an order
//! - `register`, `login`, `logout`, `whoami`, `orders` - Customer account
//! - `theme` - Show or change the colour theme
//! - `chat` - Ask the shopping assistant
//! - `admin watch`, `admin set-status` - Order console
//! - `config` - Backend override

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Args, Parser, Subcommand};
use pva_market_core::{ContactDetails, OrderId, OrderStatus, ProductCategory, ProductId, Theme};
use pva_market_storefront::StorefrontConfig;
use secrecy::SecretString;

mod commands;
mod context;
mod output;
mod telemetry;

use context::{CliError, Context};

#[derive(Parser)]
#[command(name = "pva-cli")]
#[command(author, version, about = "PVA Market command-line client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog products
    Products {
        /// Only show one category
        #[arg(short, long, value_parser = parse_category)]
        category: Option<ProductCategory>,
    },
    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: Option<CartAction>,
    },
    /// Submit the cart as an order
    Checkout(ContactArgs),
    /// Create an account and log in
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(long, env = "PVA_MARKET_PASSWORD", hide_env_values = true)]
        password: String,

        #[command(flatten)]
        contacts: ContactArgs,
    },
    /// Log in
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(long, env = "PVA_MARKET_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log out and empty the cart
    Logout,
    /// Show the logged-in customer
    Whoami,
    /// List your orders, newest first
    Orders,
    /// Show or change the colour theme
    Theme {
        #[command(subcommand)]
        action: Option<ThemeAction>,
    },
    /// Ask the shopping assistant
    Chat {
        /// Message to send
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Order console
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Local settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart contents (default)
    Show,
    /// Add a product by id
    Add {
        product_id: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product's line
    Remove { product_id: String },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum ThemeAction {
    /// Show the current theme (default)
    Show,
    /// Set the theme
    Set {
        #[arg(value_parser = parse_theme)]
        theme: Theme,
    },
    /// Switch between light and dark
    Toggle,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Log in and print the order board on every change until Ctrl+C
    Watch {
        /// Print the board once and exit
        #[arg(long)]
        once: bool,
    },
    /// Change an order's status
    SetStatus {
        order_id: String,

        #[arg(value_parser = parse_status)]
        status: OrderStatus,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Use another backend URL from now on
    SetBackend { url: String },
    /// Forget the backend override
    ClearBackend,
    /// Print effective settings
    Show,
}

/// Contact handles for guest checkout and registration.
#[derive(Args, Debug, Default)]
struct ContactArgs {
    #[arg(long)]
    telegram: Option<String>,

    #[arg(long)]
    discord: Option<String>,

    #[arg(long)]
    whatsapp: Option<String>,

    #[arg(long)]
    other: Option<String>,
}

impl ContactArgs {
    fn into_details(self) -> Option<ContactDetails> {
        let details = ContactDetails {
            telegram: self.telegram,
            discord: self.discord,
            whatsapp: self.whatsapp,
            other: self.other,
        };
        (details != ContactDetails::default()).then_some(details)
    }
}

fn parse_category(s: &str) -> Result<ProductCategory, String> {
    [
        ProductCategory::Social,
        ProductCategory::Messaging,
        ProductCategory::Email,
        ProductCategory::Marketplace,
        ProductCategory::Gaming,
        ProductCategory::Other,
    ]
    .into_iter()
    .find(|category| category.to_string().eq_ignore_ascii_case(s.trim()))
    .ok_or_else(|| format!("unknown category '{s}'"))
}

fn parse_theme(s: &str) -> Result<Theme, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn parse_status(s: &str) -> Result<OrderStatus, String> {
    s.parse().map_err(|e| format!("{e}"))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // Tracing is not initialized yet.
            output::failure(&CliError::from(e));
            std::process::exit(1);
        }
    };

    // Sentry before the subscriber so the tracing layer has a client
    let _sentry_guard = telemetry::init_sentry(&config);
    telemetry::init_tracing(config.log_format);

    let result = match Context::open(config) {
        Ok(context) => {
            let result = run(cli, &context).await;
            context.shutdown();
            result
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        e.report();
        tracing::error!("Command failed: {e}");
        output::failure(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, context: &Context) -> Result<(), CliError> {
    match cli.command {
        Commands::Products { category } => commands::shop::products(context, category).await?,
        Commands::Cart { action } => match action.unwrap_or(CartAction::Show) {
            CartAction::Show => commands::shop::show_cart(context),
            CartAction::Add {
                product_id,
                quantity,
            } => commands::shop::add(context, &ProductId::new(product_id), quantity).await?,
            CartAction::Remove { product_id } => {
                commands::shop::remove(context, &ProductId::new(product_id));
            }
            CartAction::Clear => commands::shop::clear(context),
        },
        Commands::Checkout(contact) => {
            commands::shop::checkout(context, contact.into_details()).await?;
        }
        Commands::Register {
            name,
            email,
            password,
            contacts,
        } => {
            let contacts = contacts.into_details().unwrap_or_default();
            commands::account::register(
                context,
                &name,
                &email,
                SecretString::from(password),
                &contacts,
            )
            .await?;
        }
        Commands::Login { email, password } => {
            commands::account::login(context, &email, SecretString::from(password)).await?;
        }
        Commands::Logout => commands::account::logout(context),
        Commands::Whoami => commands::account::whoami(context),
        Commands::Orders => commands::account::orders(context).await?,
        Commands::Theme { action } => match action.unwrap_or(ThemeAction::Show) {
            ThemeAction::Show => commands::shop::show_theme(context),
            ThemeAction::Set { theme } => commands::shop::set_theme(context, theme),
            ThemeAction::Toggle => commands::shop::toggle_theme(context),
        },
        Commands::Chat { message } => commands::shop::chat(context, &message.join(" ")).await?,
        Commands::Admin { action } => match action {
            AdminAction::Watch { once } => commands::admin::watch(context, once).await?,
            AdminAction::SetStatus { order_id, status } => {
                commands::admin::set_status(context, &OrderId::new(order_id), status).await?;
            }
        },
        Commands::Config { action } => match action {
            ConfigAction::SetBackend { url } => commands::config::set_backend(context, &url)?,
            ConfigAction::ClearBackend => commands::config::clear_backend(context)?,
            ConfigAction::Show => commands::config::show(context),
        },
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_cart_add() {
        let cli = Cli::try_parse_from(["pva-cli", "cart", "add", "li-1", "-q", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cart {
                action: Some(CartAction::Add { quantity: 3, .. })
            }
        ));
    }

    #[test]
    fn test_parse_status_and_category() {
        assert_eq!(parse_status("Shipped"), Ok(OrderStatus::Shipped));
        assert!(parse_status("lost").is_err());
        assert_eq!(parse_category("gaming"), Ok(ProductCategory::Gaming));
        assert!(parse_category("cars").is_err());
        assert_eq!(parse_theme("dark"), Ok(Theme::Dark));
    }

    #[test]
    fn test_empty_contact_args_are_absent() {
        assert!(ContactArgs::default().into_details().is_none());
        let details = ContactArgs {
            telegram: Some("@alice".to_string()),
            ..ContactArgs::default()
        }
        .into_details()
        .unwrap();
        assert_eq!(details.telegram.as_deref(), Some("@alice"));
    }
}
