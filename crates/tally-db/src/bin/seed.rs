//! # Seed Data Generator
//!
//! Creates a demo tenant with representative tax rules, opening hours and
//! holidays for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./tally_dev.db with tenant "demo-market"
//! cargo run -p tally-db --bin seed
//!
//! # Custom slug and database path
//! cargo run -p tally-db --bin seed -- --slug harbor-cafe --db ./data/tally.db
//! ```
//!
//! ## Generated Settings
//! - Default rate 8.25 %
//! - Groceries exempt (category rule, priority 10)
//! - Services 5 % (priority 5)
//! - California state rate 7.25 % (region rule, priority 1)
//! - Mon–Fri 09:00–18:00 with a lunch break, Sat 10:00–16:00, Sun closed
//! - Christmas and New Year closed, short hours on Christmas Eve

use anyhow::Context;
use chrono::Weekday;
use clap::Parser;
use rust_decimal::Decimal;
use tally_core::holiday::{Holiday, Recurrence, RecurrencePattern};
use tally_core::hours::{BusinessHours, DaySchedule, SpecialHours, WeeklySchedule};
use tally_core::tax::{AppliesTo, TaxRegion, TaxRule};
use tally_core::{TaxRate, TenantSettings};
use tally_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "seed", about = "Tally POS demo tenant generator")]
struct Args {
    /// Database file path
    #[arg(short, long, default_value = "./tally_dev.db")]
    db: String,

    /// Slug of the demo tenant
    #[arg(short, long, default_value = "demo-market")]
    slug: String,

    /// Display name of the demo tenant
    #[arg(short, long, default_value = "Demo Market")]
    name: String,
}

fn percent(value: i64, scale: u32) -> TaxRate {
    TaxRate::from_percent(Decimal::new(value, scale))
}

fn rule(id: &str, name: &str, rate: TaxRate, label: &str, priority: i32) -> TaxRule {
    TaxRule {
        id: id.to_string(),
        name: name.to_string(),
        rate,
        label: label.to_string(),
        applies_to: AppliesTo::All,
        category_ids: Vec::new(),
        product_ids: Vec::new(),
        region: None,
        priority,
        is_active: true,
    }
}

fn yearly(id: &str, name: &str, month: u32, day: u32) -> Holiday {
    Holiday::recurring(
        id,
        name,
        Recurrence {
            pattern: RecurrencePattern::Yearly,
            day_of_month: Some(day),
            day_of_week: None,
            month: Some(month),
        },
        true,
    )
}

fn demo_settings() -> TenantSettings {
    let groceries = TaxRule {
        applies_to: AppliesTo::Categories,
        category_ids: vec!["groceries".to_string()],
        ..rule("groceries-exempt", "Groceries exemption", TaxRate::zero(), "Tax Exempt", 10)
    };
    let services = TaxRule {
        applies_to: AppliesTo::Services,
        ..rule("services", "Service tax", percent(5, 0), "Service Tax", 5)
    };
    let california = TaxRule {
        region: Some(TaxRegion {
            country: Some("US".to_string()),
            state: Some("CA".to_string()),
            city: None,
            zip_codes: Vec::new(),
        }),
        ..rule("ca-state", "California sales tax", percent(725, 2), "CA Sales Tax", 1)
    };

    let weekday = DaySchedule::open("09:00", "18:00").with_break("12:00", "13:00");
    let schedule = [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri]
        .into_iter()
        .fold(WeeklySchedule::default(), |s, d| s.with_day(d, weekday.clone()))
        .with_day(Weekday::Sat, DaySchedule::open("10:00", "16:00"))
        .with_day(Weekday::Sun, DaySchedule::closed());

    let hours = BusinessHours {
        timezone: "America/Los_Angeles".to_string(),
        schedule,
        special_hours: vec![SpecialHours {
            date: "2025-12-24".to_string(),
            enabled: true,
            open_time: Some("09:00".to_string()),
            close_time: Some("13:00".to_string()),
            note: Some("Christmas Eve".to_string()),
        }],
    };

    TenantSettings::default()
        .with_default_tax_rate(percent(825, 2))
        .with_tax_rule(groceries)
        .with_tax_rule(services)
        .with_tax_rule(california)
        .with_business_hours(Some(hours))
        .with_holiday(yearly("christmas", "Christmas Day", 12, 25))
        .with_holiday(yearly("new-year", "New Year's Day", 1, 1))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    info!(db = %args.db, slug = %args.slug, "Tally POS seed");

    let db = Database::new(DbConfig::new(&args.db))
        .await
        .context("opening database")?;

    if db.tenants().resolve_slug(&args.slug).await?.is_some() {
        warn!(slug = %args.slug, "Tenant already exists, skipping seed");
        return Ok(());
    }

    let tenant = db
        .tenants()
        .create(&args.slug, &args.name)
        .await
        .context("creating demo tenant")?;

    let saved = db
        .scope(tenant.id)
        .settings()
        .update(|_| demo_settings())
        .await
        .context("writing demo settings")?;

    info!(
        tenant_id = %tenant.id,
        rules = saved.value.tax_rules.len(),
        holidays = saved.value.holidays.len(),
        version = saved.version,
        "Demo tenant seeded"
    );

    db.close().await;
    Ok(())
}
