//! Marketplace CLI - Browse, shop and bid from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Search the catalog
//! mkt products jordan --sort price-low
//!
//! # Show a product with its auction countdown
//! mkt show 1
//!
//! # Sign in (password is read from stdin)
//! mkt login -e jane@example.com
//!
//! # Interactive session with cart, watchlist and live countdowns
//! mkt shop
//! ```
//!
//! Configuration comes from `MARKETPLACE_*` environment variables (see
//! `marketplace_storefront::config`). Logs go to stderr; set `RUST_LOG` to
//! change the level and `MARKETPLACE_LOG_JSON=1` for JSON lines.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use marketplace_storefront::api::ProfileUpdate;
use marketplace_storefront::Storefront;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod render;

use commands::catalog::ProductsArgs;

#[derive(Parser)]
#[command(name = "mkt")]
#[command(author, version, about = "Marketplace storefront in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List or search products
    Products(ProductsArgs),
    /// List categories
    Categories,
    /// Show one product
    Show {
        /// Product id
        id: String,
    },
    /// Show an auction's bid history
    Bids {
        /// Product id
        id: String,
    },
    /// Place a bid on an auction
    Bid {
        /// Product id
        id: String,

        /// Bid amount, e.g. 310 or $310.00
        amount: String,
    },
    /// Sign in
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Create an account
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Sign out
    Logout,
    /// Show or update your profile
    Profile {
        /// New display name
        #[arg(long)]
        name: Option<String>,

        /// New avatar URL
        #[arg(long)]
        avatar: Option<String>,
    },
    /// Show your order history
    Orders,
    /// Show your saved watchlist
    Watchlist,
    /// Start an interactive shopping session
    Shop,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

/// Text logs to stderr, or JSON lines when `MARKETPLACE_LOG_JSON` is set.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "marketplace_storefront=info,mkt=info".into());

    let json = std::env::var_os("MARKETPLACE_LOG_JSON").is_some();
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer =
        (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut storefront = Storefront::from_env()?;
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Products(args) => {
            commands::catalog::products(&storefront, args, &mut out).await?;
        }
        Commands::Categories => commands::catalog::categories(&storefront, &mut out).await?,
        Commands::Show { id } => commands::catalog::show(&storefront, &id, &mut out).await?,
        Commands::Bids { id } => commands::catalog::bids(&storefront, &id, &mut out).await?,
        Commands::Bid { id, amount } => {
            commands::catalog::bid(&mut storefront, &id, &amount, &mut out).await?;
        }
        Commands::Login { email } => {
            commands::account::login(&mut storefront, &email, &mut out).await?;
        }
        Commands::Register { name, email } => {
            commands::account::register(&mut storefront, &name, &email, &mut out).await?;
        }
        Commands::Logout => commands::account::logout(&mut storefront, &mut out).await?,
        Commands::Profile { name, avatar } => {
            let update = ProfileUpdate { name, avatar };
            commands::account::profile(&mut storefront, update, &mut out).await?;
        }
        Commands::Orders => commands::account::orders(&mut storefront, &mut out).await?,
        Commands::Watchlist => commands::account::watchlist(&mut storefront, &mut out).await?,
        Commands::Shop => commands::shop::run(&mut storefront, &mut out).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_product_filters() {
        let cli = Cli::try_parse_from([
            "mkt",
            "products",
            "kobe",
            "--listing",
            "buy-it-now",
            "--max-price",
            "$400",
            "--sort",
            "price-high",
        ]);
        let Ok(Cli {
            command: Commands::Products(args),
        }) = cli
        else {
            panic!("expected products command");
        };
        assert_eq!(args.text.as_deref(), Some("kobe"));
        assert!(args.max_price.is_some());
        assert_eq!(args.page, 1);
    }

    #[test]
    fn test_rejects_unknown_sort() {
        assert!(Cli::try_parse_from(["mkt", "products", "--sort", "cheapest"]).is_err());
    }
}
