//! Vitrine CLI - drive the storefront purchase path from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Put two shirts in the cart
//! vitrine cart add --product 7 --name "Camiseta" --price 59,90 --size M --quantity 2
//!
//! # See the cart with totals
//! vitrine cart show
//!
//! # Check out with Pix
//! vitrine checkout --first-name Ana --last-name Souza --email ana@loja.com.br \
//!     --phone 11987654321 --zip 01310-100 --number 1000 --payment pix
//!
//! # Move an order along
//! vitrine orders advance 1767225600000 processing
//! vitrine orders ship 1767225600000 BR123456789BR
//! ```
//!
//! # Commands
//!
//! - `cart` - Add, update, adjust, remove and show cart lines
//! - `checkout` - Run the checkout wizard and place the order
//! - `orders` - List, show and move orders through their lifecycle
//! - `account` - Sign in, sign out and show the current customer
//!
//! State lives in `VITRINE_DATA_DIR`; see `vitrine_storefront::config` for
//! every variable.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitrine_core::{OrderId, OrderStatus};
use vitrine_storefront::config::StorefrontConfig;
use vitrine_storefront::{AppError, Storefront};

mod commands;

use commands::cart::{LineArgs, ProductArgs};
use commands::checkout::CheckoutArgs;

#[derive(Parser)]
#[command(name = "vitrine")]
#[command(author, version, about = "Vitrine storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the shopping cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Fill in the checkout form and place the order
    Checkout(Box<CheckoutArgs>),
    /// Inspect and manage orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Manage the signed-in customer
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Add a product to the cart (merges with an existing line)
    Add {
        #[command(flatten)]
        product: ProductArgs,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity
    Update {
        #[command(flatten)]
        line: LineArgs,

        /// New quantity (at least 1)
        #[arg(short, long)]
        quantity: u32,
    },
    /// Add to or subtract from a line's quantity
    Adjust {
        #[command(flatten)]
        line: LineArgs,

        /// Signed change, e.g. 1 or -1
        #[arg(long, allow_hyphen_values = true)]
        by: i64,
    },
    /// Remove a line
    Remove {
        #[command(flatten)]
        line: LineArgs,
    },
    /// Show the cart with totals
    Show,
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List every order, newest first
    List,
    /// Show one order
    Show {
        /// Order ID
        id: OrderId,
    },
    /// Move an order to a new status
    Advance {
        /// Order ID
        id: OrderId,

        /// Target status (`processing`, `shipped`, `delivered`, `cancelled`)
        status: OrderStatus,
    },
    /// Mark a processing order as shipped
    Ship {
        /// Order ID
        id: OrderId,

        /// Carrier tracking code
        tracking: String,
    },
}

#[derive(Subcommand)]
enum AccountAction {
    /// Sign in as a customer
    Login {
        /// Customer email address
        #[arg(short, long)]
        email: String,

        /// Customer display name (defaults to the email's local part)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show the signed-in customer
    Show,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry.dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry
                .environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vitrine=info,vitrine_storefront=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("{e}");
            std::process::exit(2);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = run(cli, config).await {
        e.report();
        tracing::error!("{}", e.user_message());
        if e.is_retryable() {
            tracing::info!("This may be temporary, please try again");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), AppError> {
    let storefront = Storefront::open_on_disk(config).await?;

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Add { product, quantity } => {
                commands::cart::add(&storefront, product, quantity).await?;
            }
            CartAction::Update { line, quantity } => {
                commands::cart::update(&storefront, &line, quantity).await?;
            }
            CartAction::Adjust { line, by } => {
                commands::cart::adjust(&storefront, &line, by).await?;
            }
            CartAction::Remove { line } => commands::cart::remove(&storefront, &line).await?,
            CartAction::Show => commands::cart::show(&storefront).await,
        },
        Commands::Checkout(args) => commands::checkout::run(&storefront, &args).await?,
        Commands::Orders { action } => match action {
            OrdersAction::List => commands::orders::list(&storefront).await,
            OrdersAction::Show { id } => commands::orders::show(&storefront, id).await?,
            OrdersAction::Advance { id, status } => {
                commands::orders::advance(&storefront, id, status).await?;
            }
            OrdersAction::Ship { id, tracking } => {
                commands::orders::ship(&storefront, id, tracking).await?;
            }
        },
        Commands::Account { action } => match action {
            AccountAction::Login { email, name } => {
                commands::account::login(&storefront, &email, name.as_deref()).await?;
            }
            AccountAction::Logout => commands::account::logout(&storefront).await?,
            AccountAction::Show => commands::account::show(&storefront).await,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_adjust_accepts_negative_delta() {
        let cli = Cli::try_parse_from(["vitrine", "cart", "adjust", "--product", "7", "--by", "-1"]);
        assert!(matches!(
            cli.map(|cli| cli.command),
            Ok(Commands::Cart {
                action: CartAction::Adjust { by: -1, .. }
            })
        ));
    }

    #[test]
    fn test_orders_advance_parses_status() {
        let cli = Cli::try_parse_from(["vitrine", "orders", "advance", "42", "processing"]);
        assert!(matches!(
            cli.map(|cli| cli.command),
            Ok(Commands::Orders {
                action: OrdersAction::Advance {
                    status: OrderStatus::Processing,
                    ..
                }
            })
        ));
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        assert!(Cli::try_parse_from(["vitrine", "orders", "advance", "42", "lost"]).is_err());
    }
}
