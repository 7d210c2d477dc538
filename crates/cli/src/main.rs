//! Restock CLI - Database migrations and fulfillment management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run fulfillment database migrations
//! restock-cli migrate
//!
//! # Validate the standard mix configuration
//! restock-cli mix check
//!
//! # Show current product balances
//! restock-cli stock balances
//!
//! # Credit stock for a product
//! restock-cli stock credit -p 3 -q 500
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `mix check` - Report whether the configured percentages are usable
//! - `stock balances` - Print ledger-derived balances per product
//! - `stock credit` - Write a manual credit movement

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "restock-cli")]
#[command(author, version, about = "Restock CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run fulfillment database migrations
    Migrate,
    /// Inspect the standard mix configuration
    Mix {
        #[command(subcommand)]
        action: MixAction,
    },
    /// Inspect and adjust the stock ledger
    Stock {
        #[command(subcommand)]
        action: StockAction,
    },
}

#[derive(Subcommand)]
enum MixAction {
    /// Check that active percentages sum to 100 within tolerance
    Check,
}

#[derive(Subcommand)]
enum StockAction {
    /// Print ledger-derived balances per product
    Balances,
    /// Write a manual credit movement
    Credit {
        /// Product ID to credit
        #[arg(short, long)]
        product: i32,

        /// Units to credit
        #[arg(short, long)]
        quantity: i32,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Mix { action } => match action {
            MixAction::Check => commands::mix::check().await?,
        },
        Commands::Stock { action } => match action {
            StockAction::Balances => commands::stock::balances().await?,
            StockAction::Credit { product, quantity } => {
                commands::stock::credit(product, quantity).await?;
            }
        },
    }
    Ok(())
}
