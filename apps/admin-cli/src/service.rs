//! # Admin Service
//!
//! The operations behind each `tally-admin` command.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  slug ──► TenantRepository::resolve_slug ──► TenantScope                │
//! │                                                  │                      │
//! │                          settings().load() ◄─────┤                      │
//! │                                  │               │                      │
//! │                                  ▼               │                      │
//! │                   tally-core (pure evaluation)   │                      │
//! │                   open_status_at / quote_sale    │                      │
//! │                                  │               │                      │
//! │                                  ▼               ▼                      │
//! │                             report ◄──── audit().record_sale(...)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The clock is read by the caller; every method here takes the instant it
//! evaluates at.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tally_core::tax::{LineItem, SaleRegion, TaxResolver};
use tally_core::{
    quote_sale_with, Money, OpenStatus, SaleQuote, Tenant, TenantSettings, TieBreak, Versioned,
};
use tally_db::{Database, TenantScope};
use tracing::{debug, info};

use crate::config::AdminConfig;
use crate::error::{AdminError, AdminResult};

// =============================================================================
// Reports
// =============================================================================

/// Answer to "is the store open?".
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub tenant: String,
    pub timezone: String,
    pub at: DateTime<Utc>,
    pub local_time: NaiveDateTime,
    #[serde(flatten)]
    pub status: OpenStatus,
    /// `status.next_open` as an instant.
    pub next_open_utc: Option<DateTime<Utc>>,
}

/// Answer to "when do we open next?".
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextOpenReport {
    pub tenant: String,
    pub from: DateTime<Utc>,
    /// `None` when nothing opens within the lookahead window.
    pub next_open: Option<DateTime<Utc>>,
}

/// A priced cart, optionally written to the tax audit trail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteReport {
    pub tenant: String,
    pub sale_id: Option<String>,
    #[serde(flatten)]
    pub quote: SaleQuote,
    pub audited_lines: usize,
}

// =============================================================================
// Service
// =============================================================================

/// Store access plus the policy knobs from [`AdminConfig`].
#[derive(Debug, Clone)]
pub struct AdminService {
    db: Database,
    tie_break: TieBreak,
}

impl AdminService {
    pub fn new(db: Database, tie_break: TieBreak) -> Self {
        AdminService { db, tie_break }
    }

    /// Connects to the configured store and runs migrations.
    pub async fn open(config: &AdminConfig) -> AdminResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(Self::new(db, config.tax.tie_break))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Resolves an active tenant's slug to its scope.
    pub async fn resolve(&self, slug: &str) -> AdminResult<TenantScope> {
        let tenant_id = self
            .db
            .tenants()
            .resolve_slug(slug)
            .await?
            .ok_or_else(|| AdminError::TenantNotFound(slug.to_string()))?;

        debug!(slug = %slug, tenant_id = %tenant_id, "Resolved tenant");
        Ok(self.db.scope(tenant_id))
    }

    async fn settings_for(&self, slug: &str) -> AdminResult<(TenantScope, TenantSettings)> {
        let scope = self.resolve(slug).await?;
        let settings = scope.settings().load().await?.value;
        Ok((scope, settings))
    }

    // =========================================================================
    // Business Hours
    // =========================================================================

    pub async fn status(&self, slug: &str, at: DateTime<Utc>) -> AdminResult<StatusReport> {
        let (_, settings) = self.settings_for(slug).await?;

        let status = settings.open_status_at(at);
        let next_open_utc = match (&settings.business_hours, status.next_open) {
            (Some(hours), Some(local)) => Some(hours.to_utc(local)),
            (None, Some(local)) => Some(local.and_utc()),
            (_, None) => None,
        };

        Ok(StatusReport {
            tenant: slug.to_string(),
            timezone: settings
                .business_hours
                .as_ref()
                .map(|h| h.tz().name().to_string())
                .unwrap_or_else(|| "UTC".to_string()),
            at,
            local_time: settings.local_time(at),
            status,
            next_open_utc,
        })
    }

    pub async fn next_open(&self, slug: &str, from: DateTime<Utc>) -> AdminResult<NextOpenReport> {
        let (_, settings) = self.settings_for(slug).await?;

        Ok(NextOpenReport {
            tenant: slug.to_string(),
            from,
            next_open: settings.next_open_at(from),
        })
    }

    // =========================================================================
    // Tax
    // =========================================================================

    /// Prices `items`; with a `sale_id`, also records one audit entry per line.
    ///
    /// The lines of a sale are audited together and only once; quoting an
    /// already audited sale id again fails with a validation error.
    pub async fn quote(
        &self,
        slug: &str,
        items: &[LineItem],
        region: Option<&SaleRegion>,
        sale_id: Option<&str>,
    ) -> AdminResult<QuoteReport> {
        let (scope, settings) = self.settings_for(slug).await?;
        let quote = quote_sale_with(items, &settings, region, self.tie_break);

        let mut audited_lines = 0;
        if let Some(sale_id) = sale_id {
            let resolver = TaxResolver::new(&settings.tax_rules, settings.default_tax_rate)
                .tie_break(self.tie_break);
            let calculations: Vec<_> = items
                .iter()
                .map(|item| resolver.calculate(&item.context(region)))
                .collect();
            let lines: Vec<_> = calculations
                .iter()
                .enumerate()
                .map(|(index, calculation)| (index, calculation, Money::from_decimal(calculation.amount)))
                .collect();

            audited_lines = scope.audit().record_sale(sale_id, &lines).await?.len();

            info!(
                tenant_id = %scope.tenant_id(),
                sale_id = %sale_id,
                lines = audited_lines,
                total = %quote.total,
                "Recorded sale tax"
            );
        }

        Ok(QuoteReport {
            tenant: slug.to_string(),
            sale_id: sale_id.map(str::to_string),
            quote,
            audited_lines,
        })
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub async fn settings_show(&self, slug: &str) -> AdminResult<Versioned<TenantSettings>> {
        let scope = self.resolve(slug).await?;
        Ok(scope.settings().load().await?)
    }

    /// Replaces a tenant's settings document.
    ///
    /// With `expected_version` the write fails if anyone saved since that
    /// version; without it the current version is read and the write retried.
    pub async fn settings_import(
        &self,
        slug: &str,
        settings: TenantSettings,
        expected_version: Option<i64>,
    ) -> AdminResult<Versioned<TenantSettings>> {
        let scope = self.resolve(slug).await?;
        let repo = scope.settings();

        let saved = match expected_version {
            Some(expected) => {
                let version = repo.save(expected, &settings).await?;
                Versioned::new(settings, version)
            }
            None => repo.update(|_| settings.clone()).await?,
        };

        info!(slug = %slug, version = saved.version, "Settings imported");
        Ok(saved)
    }

    // =========================================================================
    // Tenants
    // =========================================================================

    pub async fn create_tenant(&self, slug: &str, name: &str) -> AdminResult<Tenant> {
        Ok(self.db.tenants().create(slug, name).await?)
    }

    pub async fn list_tenants(&self) -> AdminResult<Vec<Tenant>> {
        Ok(self.db.tenants().list_active().await?)
    }

    pub async fn deactivate_tenant(&self, slug: &str) -> AdminResult<()> {
        let scope = self.resolve(slug).await?;
        self.db.tenants().deactivate(scope.tenant_id()).await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use chrono::{NaiveDate, TimeZone, Weekday};
    use rust_decimal_macros::dec;
    use tally_core::hours::{BusinessHours, DaySchedule, WeeklySchedule};
    use tally_core::tax::{AppliesTo, ProductType, TaxRule};
    use tally_core::{Holiday, OpenBasis, TaxRate, TaxSource};
    use tally_db::DbConfig;

    async fn service() -> AdminService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        AdminService::new(db, TieBreak::FirstListed)
    }

    fn weekdays_nine_to_five() -> BusinessHours {
        let mut schedule = WeeklySchedule::default();
        for day in [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri] {
            schedule = schedule.with_day(day, DaySchedule::open("09:00", "17:00"));
        }
        BusinessHours {
            timezone: "America/New_York".to_string(),
            schedule,
            special_hours: Vec::new(),
        }
    }

    fn item(price: rust_decimal::Decimal, quantity: u32, product_type: ProductType) -> LineItem {
        LineItem {
            product_id: None,
            category_id: None,
            product_type: Some(product_type),
            price,
            quantity,
        }
    }

    #[tokio::test]
    async fn test_unknown_slug() {
        let service = service().await;
        let err = service.status("nowhere", Utc::now()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_new_tenant_is_always_open() {
        let service = service().await;
        service.create_tenant("corner-bakery", "Corner Bakery").await.unwrap();

        let report = service.status("corner-bakery", Utc::now()).await.unwrap();
        assert!(report.status.is_open);
        assert_eq!(report.status.basis, OpenBasis::Unconfigured);
        assert_eq!(report.timezone, "UTC");
    }

    #[tokio::test]
    async fn test_status_in_tenant_timezone() {
        let service = service().await;
        service.create_tenant("corner-bakery", "Corner Bakery").await.unwrap();
        let settings = TenantSettings::default().with_business_hours(Some(weekdays_nine_to_five()));
        service
            .settings_import("corner-bakery", settings, Some(0))
            .await
            .unwrap();

        // Monday 2025-03-10 13:00 UTC is 09:00 EDT.
        let at = Utc.with_ymd_and_hms(2025, 3, 10, 13, 0, 0).unwrap();
        let report = service.status("corner-bakery", at).await.unwrap();
        assert!(report.status.is_open);
        assert_eq!(report.timezone, "America/New_York");
        assert_eq!(
            report.local_time,
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(9, 0, 0).unwrap()
        );

        // 08:00 EDT: closed until 09:00 EDT today.
        let early = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let report = service.status("corner-bakery", early).await.unwrap();
        assert!(!report.status.is_open);
        assert_eq!(report.next_open_utc, Some(at));
    }

    #[tokio::test]
    async fn test_next_open_skips_holiday() {
        let service = service().await;
        service.create_tenant("corner-bakery", "Corner Bakery").await.unwrap();
        let monday = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let settings = TenantSettings::default()
            .with_business_hours(Some(weekdays_nine_to_five()))
            .with_holiday(Holiday::single("h1", "Staff Day", monday, true));
        service
            .settings_import("corner-bakery", settings, None)
            .await
            .unwrap();

        // Monday 06:00 EDT: Monday is a holiday, so Tuesday 09:00 EDT.
        let from = Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
        let report = service.next_open("corner-bakery", from).await.unwrap();
        assert_eq!(
            report.next_open,
            Some(Utc.with_ymd_and_hms(2025, 3, 11, 13, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_quote_records_audit_per_line() {
        let service = service().await;
        service.create_tenant("corner-bakery", "Corner Bakery").await.unwrap();
        let services_rule = TaxRule {
            id: "svc".to_string(),
            name: "Service tax".to_string(),
            rate: TaxRate::from_percent(dec!(5)),
            label: "Service Tax".to_string(),
            applies_to: AppliesTo::Services,
            category_ids: Vec::new(),
            product_ids: Vec::new(),
            region: None,
            priority: 5,
            is_active: true,
        };
        let settings = TenantSettings::default()
            .with_default_tax_rate(TaxRate::from_percent(dec!(8.25)))
            .with_tax_rule(services_rule);
        service
            .settings_import("corner-bakery", settings, Some(0))
            .await
            .unwrap();

        let items = [
            item(dec!(10.99), 1, ProductType::Product),
            item(dec!(20.00), 1, ProductType::Service),
        ];
        let report = service
            .quote("corner-bakery", &items, None, Some("sale-1"))
            .await
            .unwrap();

        // 0.906675 + 1.00 = 1.906675 → 1.91
        assert_eq!(report.quote.tax.cents(), 191);
        assert_eq!(report.quote.total.cents(), 3290);
        assert_eq!(report.audited_lines, 2);

        let scope = service.resolve("corner-bakery").await.unwrap();
        let entries = scope.audit().list_for_sale("sale-1").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].source, TaxSource::DefaultRate);
        assert_eq!(entries[0].tax.cents(), 91);
        assert_eq!(entries[1].source, TaxSource::Rule);
        assert_eq!(entries[1].rule_snapshot[0].id, "svc");
    }

    #[tokio::test]
    async fn test_requote_of_audited_sale_is_rejected() {
        let service = service().await;
        service.create_tenant("corner-bakery", "Corner Bakery").await.unwrap();
        let items = [
            item(dec!(2.00), 1, ProductType::Product),
            item(dec!(3.00), 1, ProductType::Product),
        ];

        service
            .quote("corner-bakery", &items, None, Some("sale-9"))
            .await
            .unwrap();
        let err = service
            .quote("corner-bakery", &items, None, Some("sale-9"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let scope = service.resolve("corner-bakery").await.unwrap();
        assert_eq!(scope.audit().list_for_sale("sale-9").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_quote_without_sale_id_writes_nothing() {
        let service = service().await;
        service.create_tenant("corner-bakery", "Corner Bakery").await.unwrap();

        let report = service
            .quote("corner-bakery", &[item(dec!(3.00), 2, ProductType::Product)], None, None)
            .await
            .unwrap();
        assert_eq!(report.audited_lines, 0);
        assert!(report.quote.tax.is_zero());
        assert_eq!(report.quote.total.cents(), 600);
    }

    #[tokio::test]
    async fn test_import_with_stale_version_conflicts() {
        let service = service().await;
        service.create_tenant("corner-bakery", "Corner Bakery").await.unwrap();

        let first = TenantSettings::default().with_default_tax_rate(TaxRate::from_percent(dec!(5)));
        let saved = service
            .settings_import("corner-bakery", first, Some(0))
            .await
            .unwrap();
        assert_eq!(saved.version, 1);

        let second = TenantSettings::default().with_default_tax_rate(TaxRate::from_percent(dec!(6)));
        let err = service
            .settings_import("corner-bakery", second, Some(0))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);

        let shown = service.settings_show("corner-bakery").await.unwrap();
        assert_eq!(shown.version, 1);
        assert_eq!(shown.value.default_tax_rate, TaxRate::from_percent(dec!(5)));
    }

    #[tokio::test]
    async fn test_deactivated_tenant_no_longer_resolves() {
        let service = service().await;
        service.create_tenant("corner-bakery", "Corner Bakery").await.unwrap();
        service.create_tenant("harbor-cafe", "Harbor Cafe").await.unwrap();

        service.deactivate_tenant("corner-bakery").await.unwrap();

        let active = service.list_tenants().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].slug, "harbor-cafe");
        assert!(matches!(
            service.resolve("corner-bakery").await,
            Err(AdminError::TenantNotFound(_))
        ));
    }
}
