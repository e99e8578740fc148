//! # tally-admin Entry Point
//!
//! ## Startup Sequence
//! 1. Parse arguments
//! 2. Load configuration (defaults → admin.toml → TALLY_* → flags)
//! 3. Initialize tracing (logging to stderr), then report where config came from
//! 4. Connect to database & run migrations
//! 5. Run the command, print JSON to stdout
//!
//! On failure the `{ code, message }` report goes to stderr and the exit
//! status reflects the code.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tally_admin::{AdminConfig, AdminError, AdminResult, AdminService};
use tally_core::tax::{LineItem, SaleRegion};
use tally_core::TenantSettings;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tally-admin", version, about = "Tally POS operator tool")]
struct Cli {
    /// Config file (default: platform config dir/admin.toml)
    #[arg(long, global = true, env = "TALLY_CONFIG")]
    config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Is the tenant open?
    Status {
        slug: String,
        /// Instant to evaluate at (RFC 3339, default: now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// When does the tenant open next?
    NextOpen {
        slug: String,
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Price a cart from a JSON array of line items
    Quote {
        slug: String,
        /// File with `[{ "price": "4.50", "quantity": 2, ... }]`
        #[arg(long)]
        items: PathBuf,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        zip: Option<String>,
        /// Record the tax of each line in the audit trail under this sale id
        #[arg(long)]
        sale_id: Option<String>,
    },

    #[command(subcommand)]
    Settings(SettingsCommand),

    #[command(subcommand)]
    Tenant(TenantCommand),
}

#[derive(Debug, Subcommand)]
enum SettingsCommand {
    /// Print the settings document and its version
    Show { slug: String },

    /// Replace the settings document from a JSON file
    Import {
        slug: String,
        file: PathBuf,
        /// Fail if the stored version is not this one
        #[arg(long)]
        expected_version: Option<i64>,
    },
}

#[derive(Debug, Subcommand)]
enum TenantCommand {
    Create { slug: String, name: String },
    List,
    Deactivate { slug: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AdminConfig::load(cli.config.clone()).context("Failed to load configuration")?;
    if let Some(db) = &cli.db {
        config.database.path = db.clone();
    }

    // RUST_LOG wins over the configured filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        source = ?config.source,
        db = %config.database.path.display(),
        tie_break = ?config.tax.tie_break,
        "Configuration loaded"
    );

    if let Err(err) = run(cli.command, &config).await {
        let report = err.report();
        eprintln!("{}", serde_json::to_string_pretty(&report)?);
        std::process::exit(report.code.exit_code());
    }

    Ok(())
}

async fn run(command: Command, config: &AdminConfig) -> AdminResult<()> {
    let service = AdminService::open(config).await?;

    match command {
        Command::Status { slug, at } => {
            print(&service.status(&slug, at.unwrap_or_else(Utc::now)).await?)
        }
        Command::NextOpen { slug, at } => {
            print(&service.next_open(&slug, at.unwrap_or_else(Utc::now)).await?)
        }
        Command::Quote {
            slug,
            items,
            country,
            state,
            city,
            zip,
            sale_id,
        } => {
            let items: Vec<LineItem> = read_json(&items)?;
            let region = SaleRegion {
                country,
                state,
                city,
                zip_code: zip,
            };
            let region = (region != SaleRegion::default()).then_some(region);

            print(
                &service
                    .quote(&slug, &items, region.as_ref(), sale_id.as_deref())
                    .await?,
            )
        }
        Command::Settings(SettingsCommand::Show { slug }) => {
            print(&service.settings_show(&slug).await?)
        }
        Command::Settings(SettingsCommand::Import {
            slug,
            file,
            expected_version,
        }) => {
            let settings: TenantSettings = read_json(&file)?;
            print(
                &service
                    .settings_import(&slug, settings, expected_version)
                    .await?,
            )
        }
        Command::Tenant(TenantCommand::Create { slug, name }) => {
            print(&service.create_tenant(&slug, &name).await?)
        }
        Command::Tenant(TenantCommand::List) => print(&service.list_tenants().await?),
        Command::Tenant(TenantCommand::Deactivate { slug }) => {
            service.deactivate_tenant(&slug).await?;
            print(&serde_json::json!({ "slug": slug, "isActive": false }))
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> AdminResult<T> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| AdminError::invalid_input(format!("{}: {}", path.display(), e)))?;
    Ok(serde_json::from_str(&contents)?)
}

fn print<T: Serialize>(value: &T) -> AdminResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
