//! Dram CLI - catalog inspection tools.
//!
//! # Usage
//!
//! ```bash
//! # List the catalog, newest first
//! dram products
//!
//! # Search, printing JSON
//! dram products --search "côtes du rhône" --json
//!
//! # Look up one product (accent drift in the slug is tolerated)
//! dram product cotes-du-rhone-villages-2021
//!
//! # Show the varieties of a product and the heuristic that found each one
//! dram varieties jameson-700ml
//!
//! # Print the slug for a product name
//! dram slugify "Côtes du Rhône!"
//! ```
//!
//! Catalog commands read their settings from the environment (see
//! `dram_catalog::config`). Set `LOG_FORMAT=json` for JSON logs.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dram_catalog::{CatalogConfig, CatalogService};

mod commands;

#[derive(Parser)]
#[command(name = "dram")]
#[command(author, version, about = "Dram catalog tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products, optionally filtered by a search query
    Products {
        /// Search query
        #[arg(short, long)]
        search: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one product
    Product {
        /// Product slug
        slug: String,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// List the varieties of a product
    Varieties {
        /// Product slug
        slug: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the URL slug for some text
    Slugify {
        /// Text to slugify
        #[arg(required = true)]
        text: Vec<String>,
    },
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

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dram_catalog=info".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Commands::Slugify { text } = &cli.command {
        commands::slugify::run(&text.join(" "));
        return Ok(());
    }

    let config = CatalogConfig::from_env()?;
    let catalog = CatalogService::from_config(&config).await?;

    match cli.command {
        Commands::Products { search, json } => {
            commands::catalog::products(&catalog, search.as_deref(), json).await?;
        }
        Commands::Product { slug, json } => {
            commands::catalog::product(&catalog, &slug, json).await?;
        }
        Commands::Varieties { slug, json } => {
            commands::catalog::varieties(&catalog, &slug, config.varieties, json).await?;
        }
        Commands::Slugify { .. } => {}
    }
    Ok(())
}
