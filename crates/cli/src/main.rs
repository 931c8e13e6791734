//! Shopfront CLI - Browse products, manage the cart and check out.
//!
//! # Usage
//!
//! ```bash
//! # List a page of products
//! shopfront products --limit 8
//!
//! # Show the cart and its totals
//! shopfront cart show
//!
//! # Add, change and remove lines
//! shopfront cart add 42 --quantity 2
//! shopfront cart update 7 3
//! shopfront cart remove 7
//!
//! # Log in, then place the order
//! shopfront login --token <TOKEN>
//! shopfront checkout --address 3 --payment cod --notes "Ring twice"
//! ```
//!
//! # Environment Variables
//!
//! - `SHOPFRONT_API_BASE_URL` - Backend base URL (required)
//! - `SHOPFRONT_SESSION_FILE` - Where tokens are persisted
//! - `SENTRY_DSN` - Enables error tracking when set
//!
//! Ctrl+C cancels the request in flight.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use shopfront_client::ClientConfig;
use shopfront_client::checkout::PaymentMethod;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{CommandContext, CommandError};

#[derive(Parser)]
#[command(name = "shopfront")]
#[command(author, version, about = "Shopfront storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a page of products
    Products {
        /// Number of products to request
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Show and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for the current cart
    Checkout {
        /// Saved address to ship to (defaults to the default address)
        #[arg(short, long)]
        address: Option<String>,

        /// Payment method (`online`, `cod`)
        #[arg(short, long, default_value = "online")]
        payment: PaymentMethod,

        /// Notes for the order
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Persist a bearer token
    Login {
        /// Bearer token issued by the backend
        #[arg(short, long)]
        token: String,
    },
    /// Forget the persisted bearer token
    Logout,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show items and totals
    Show,
    /// Add a product
    Add {
        /// Product ID
        product_id: String,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (zero removes it)
    Update {
        /// Cart line ID
        item_id: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        /// Cart line ID
        item_id: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
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

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopfront=info,shopfront_client=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_interrupt(cancel.clone()));

    if let Err(e) = run(cli, config, &cancel).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig, cancel: &CancellationToken) -> Result<(), CommandError> {
    let ctx = CommandContext::new(config)?;

    match cli.command {
        Commands::Products { limit } => commands::products::list(&ctx, limit, cancel).await,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&ctx, cancel).await,
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(&ctx, &product_id.into(), quantity, cancel).await,
            CartAction::Update { item_id, quantity } => {
                commands::cart::update(&ctx, &item_id.into(), quantity, cancel).await
            }
            CartAction::Remove { item_id } => {
                commands::cart::remove(&ctx, &item_id.into(), cancel).await
            }
        },
        Commands::Checkout {
            address,
            payment,
            notes,
        } => {
            let options = commands::checkout::CheckoutOptions {
                address: address.map(Into::into),
                payment,
                notes,
            };
            commands::checkout::place(&ctx, options, cancel).await
        }
        Commands::Login { token } => commands::session::login(&ctx, token),
        Commands::Logout => commands::session::logout(&ctx),
    }
}

/// Cancel `token` on Ctrl+C.
async fn cancel_on_interrupt(token: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Interrupt received, cancelling");
        token.cancel();
    }
}
