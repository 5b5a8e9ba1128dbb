//! Phonestore CLI - session and cart tools for the storefront core.
//!
//! # Usage
//!
//! ```bash
//! # Sign in and show the resolved role
//! ps-cli session login -e cliente@loja.com -p 's3nha'
//! ps-cli session whoami
//!
//! # Build a cart and price it with a coupon
//! ps-cli cart add --product-id 5f0c... --name "Galaxy S24" --price-cents 450000 --category smartphones
//! ps-cli cart totals --coupon SAVE10
//!
//! # Walk through a cart against an in-memory backend
//! ps-cli demo
//! ```
//!
//! # Commands
//!
//! - `session` - Sign in, sign out, show the current role
//! - `cart` - Add, remove, update, clear, show and total the local cart
//! - `demo` - Run a sample checkout without a backend

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use phonestore_core::{ProductId, VariantId};
use phonestore_storefront::config::StorefrontConfig;
use phonestore_storefront::error::AppError;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "ps-cli")]
#[command(author, version, about = "Phonestore storefront tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the signed-in session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Manage the local cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Run a sample checkout against an in-memory backend
    Demo,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Sign in with email and password
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Sign out and clear cached profiles
    Logout,
    /// Show the resolved role and profile
    Whoami,
}

#[derive(Subcommand)]
enum CartAction {
    /// Add one unit of a product
    Add {
        #[arg(long)]
        product_id: ProductId,

        #[arg(long)]
        name: String,

        /// Unit price in centavos
        #[arg(long)]
        price_cents: i64,

        #[arg(long)]
        category: String,

        #[arg(long)]
        variant_id: Option<VariantId>,

        #[arg(long)]
        variant_name: Option<String>,

        /// Mark the product as on promotion
        #[arg(long)]
        promotion: bool,

        /// Image URL (repeatable)
        #[arg(long = "image")]
        images: Vec<String>,
    },
    /// Remove a product's line
    Remove {
        #[arg(long)]
        product_id: ProductId,
    },
    /// Set a line's quantity (1-5)
    Update {
        #[arg(long)]
        product_id: ProductId,

        #[arg(long)]
        quantity: u32,
    },
    /// Empty the cart
    Clear,
    /// Show cart lines and totals
    Show,
    /// Show totals, optionally with a coupon applied
    Totals {
        #[arg(long)]
        coupon: Option<String>,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
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
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "phonestore_storefront=info,phonestore_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = if matches!(cli.command, Commands::Demo) {
        None
    } else {
        match StorefrontConfig::from_env() {
            Ok(config) => Some(config),
            Err(e) => {
                let err = AppError::from(e);
                output::error(&err.user_message());
                return ExitCode::from(err.exit_code());
            }
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = config.as_ref().and_then(init_sentry);
    init_tracing();

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let e = e.capture();
            tracing::debug!(error = %e, "Command failed");
            output::error(&e.user_message());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli, config: Option<StorefrontConfig>) -> Result<(), AppError> {
    let Some(config) = config else {
        return commands::demo::run().await;
    };
    let app = commands::App::new(&config)?;

    match cli.command {
        Commands::Session { action } => match action {
            SessionAction::Login { email, password } => {
                app.bounded(commands::session::login(&app, &email, password))
                    .await
            }
            SessionAction::Logout => app.bounded(commands::session::logout(&app)).await,
            SessionAction::Whoami => app.bounded(commands::session::whoami(&app)).await,
        },
        Commands::Cart { action } => match action {
            CartAction::Add {
                product_id,
                name,
                price_cents,
                category,
                variant_id,
                variant_name,
                promotion,
                images,
            } => commands::cart::add(
                &app,
                commands::cart::NewItem {
                    product_id,
                    name,
                    price_cents,
                    category,
                    variant_id,
                    variant_name,
                    is_promotion: promotion,
                    images,
                },
            ),
            CartAction::Remove { product_id } => commands::cart::remove(&app, product_id),
            CartAction::Update {
                product_id,
                quantity,
            } => commands::cart::update(&app, product_id, quantity),
            CartAction::Clear => commands::cart::clear(&app),
            CartAction::Show => commands::cart::show(&app),
            CartAction::Totals { coupon } => {
                app.bounded(commands::cart::totals(&app, coupon.as_deref()))
                    .await
            }
        },
        Commands::Demo => commands::demo::run().await,
    }
}
