//! # Settings Repository
//!
//! Reads and writes a tenant's settings document with optimistic concurrency.
//!
//! ## Write Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Admin A                         Admin B                                │
//! │  load() → v3                     load() → v3                            │
//! │  settings.with_tax_rule(..)      settings.with_holiday(..)              │
//! │  save(3, ..) → v4 ✓                                                     │
//! │                                  save(3, ..) → VersionConflict(4)       │
//! │                                  load() → v4, reapply, save(4) → v5 ✓   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `update` runs the load → apply → save loop for the caller. No lock is held
//! while the caller's closure runs.

use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tally_core::validation::validate_settings;
use tally_core::{TenantId, TenantSettings, Versioned};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};

/// How many times [`SettingsRepository::update`] tries before giving up.
pub const MAX_UPDATE_ATTEMPTS: usize = 3;

#[derive(Debug, FromRow)]
struct SettingsRow {
    document: String,
    version: i64,
}

/// Repository for one tenant's settings document.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
    tenant_id: TenantId,
}

impl SettingsRepository {
    pub(crate) fn new(pool: SqlitePool, tenant_id: TenantId) -> Self {
        SettingsRepository { pool, tenant_id }
    }

    /// Loads the current settings and their version.
    ///
    /// A tenant without a stored document gets the defaults at version 0.
    pub async fn load(&self) -> DbResult<Versioned<TenantSettings>> {
        let row = sqlx::query_as::<_, SettingsRow>(
            r#"
            SELECT document, version
            FROM tenant_settings
            WHERE tenant_id = ?1
            "#,
        )
        .bind(self.tenant_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let settings: TenantSettings = serde_json::from_str(&row.document)?;
                debug!(tenant_id = %self.tenant_id, version = row.version, "Loaded settings");
                Ok(Versioned::new(settings, row.version))
            }
            None => {
                debug!(tenant_id = %self.tenant_id, "No settings stored, using defaults");
                Ok(Versioned::new(TenantSettings::default(), 0))
            }
        }
    }

    /// Saves `settings` if the stored version is still `expected_version`.
    ///
    /// ## Returns
    /// The new version (`expected_version + 1`).
    ///
    /// ## Errors
    /// - `Validation` if the document fails write-time validation
    /// - `VersionConflict` if someone else saved in between
    pub async fn save(&self, expected_version: i64, settings: &TenantSettings) -> DbResult<i64> {
        validate_settings(settings)?;
        let document = serde_json::to_string(settings)?;
        let next_version = expected_version + 1;
        let tenant = self.tenant_id.to_string();

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE tenant_settings
            SET document = ?1, version = ?2, updated_at = ?3
            WHERE tenant_id = ?4 AND version = ?5
            "#,
        )
        .bind(&document)
        .bind(next_version)
        .bind(Utc::now())
        .bind(&tenant)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let actual: Option<i64> =
                sqlx::query_scalar("SELECT version FROM tenant_settings WHERE tenant_id = ?1")
                    .bind(&tenant)
                    .fetch_optional(&mut *tx)
                    .await?;

            match actual {
                None if expected_version == 0 => {
                    sqlx::query(
                        r#"
                        INSERT INTO tenant_settings (tenant_id, document, version, updated_at)
                        VALUES (?1, ?2, ?3, ?4)
                        "#,
                    )
                    .bind(&tenant)
                    .bind(&document)
                    .bind(next_version)
                    .bind(Utc::now())
                    .execute(&mut *tx)
                    .await?;
                }
                actual => {
                    let actual = actual.unwrap_or(0);
                    debug!(
                        tenant_id = %self.tenant_id,
                        expected = expected_version,
                        actual,
                        "Settings version conflict"
                    );
                    return Err(DbError::VersionConflict {
                        tenant_id: self.tenant_id,
                        expected: expected_version,
                        actual,
                    });
                }
            }
        }

        tx.commit().await?;

        info!(tenant_id = %self.tenant_id, version = next_version, "Settings saved");
        Ok(next_version)
    }

    /// Loads, applies `change`, and saves, retrying on version conflicts.
    ///
    /// `change` may run more than once and must not have side effects.
    pub async fn update<F>(&self, mut change: F) -> DbResult<Versioned<TenantSettings>>
    where
        F: FnMut(&TenantSettings) -> TenantSettings,
    {
        let mut attempt = 1;
        loop {
            let current = self.load().await?;
            let next = change(&current.value);

            match self.save(current.version, &next).await {
                Ok(version) => return Ok(Versioned::new(next, version)),
                Err(err) if err.is_conflict() && attempt < MAX_UPDATE_ATTEMPTS => {
                    warn!(
                        tenant_id = %self.tenant_id,
                        attempt,
                        "Settings changed during update, retrying"
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use rust_decimal_macros::dec;
    use tally_core::tax::{AppliesTo, TaxRule};
    use tally_core::{TaxRate, TenantSettings, ValidationError};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn rule(id: &str, rate: rust_decimal::Decimal) -> TaxRule {
        TaxRule {
            id: id.to_string(),
            name: format!("Rule {id}"),
            rate: TaxRate::from_percent(rate),
            label: "Sales Tax".to_string(),
            applies_to: AppliesTo::All,
            category_ids: Vec::new(),
            product_ids: Vec::new(),
            region: None,
            priority: 0,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let db = db().await;
        let tenant = db.tenants().create("shop-one", "Shop One").await.unwrap();
        let repo = db.scope(tenant.id).settings();

        let current = repo.load().await.unwrap();
        let next = current.value.with_tax_rule(rule("state", dec!(7.25)));
        let version = repo.save(current.version, &next).await.unwrap();
        assert_eq!(version, 1);

        let reloaded = repo.load().await.unwrap();
        assert_eq!(reloaded.version, 1);
        assert_eq!(reloaded.value, next);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let db = db().await;
        let tenant = db.tenants().create("shop-two", "Shop Two").await.unwrap();
        let repo = db.scope(tenant.id).settings();

        let first = repo.load().await.unwrap();
        let second = repo.load().await.unwrap();

        repo.save(first.version, &first.value.with_default_tax_rate(TaxRate::from_percent(dec!(5))))
            .await
            .unwrap();

        let err = repo
            .save(second.version, &second.value.with_default_tax_rate(TaxRate::from_percent(dec!(6))))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::VersionConflict { expected: 0, actual: 1, .. }
        ));
        assert_eq!(
            repo.load().await.unwrap().value.default_tax_rate,
            TaxRate::from_percent(dec!(5))
        );
    }

    #[tokio::test]
    async fn test_invalid_settings_not_written() {
        let db = db().await;
        let tenant = db.tenants().create("shop-three", "Shop Three").await.unwrap();
        let repo = db.scope(tenant.id).settings();

        let mut bad = TenantSettings::default();
        bad.currency = "dollars".to_string();

        let err = repo.save(0, &bad).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(ValidationError::InvalidFormat { .. })));
        assert_eq!(repo.load().await.unwrap().version, 0);
    }

    #[tokio::test]
    async fn test_update_applies_change() {
        let db = db().await;
        let tenant = db.tenants().create("shop-four", "Shop Four").await.unwrap();
        let repo = db.scope(tenant.id).settings();

        let saved = repo
            .update(|s| s.with_tax_rule(rule("city", dec!(1.5))))
            .await
            .unwrap();
        assert_eq!(saved.version, 1);

        let saved = repo
            .update(|s| s.with_tax_rule(rule("county", dec!(0.5))))
            .await
            .unwrap();
        assert_eq!(saved.version, 2);
        assert_eq!(saved.value.tax_rules.len(), 2);
    }

    #[tokio::test]
    async fn test_scope_isolation() {
        let db = db().await;
        let a = db.tenants().create("tenant-a", "Tenant A").await.unwrap();
        let b = db.tenants().create("tenant-b", "Tenant B").await.unwrap();

        db.scope(a.id)
            .settings()
            .update(|s| s.with_tax_rule(rule("a-only", dec!(9))))
            .await
            .unwrap();

        let b_settings = db.scope(b.id).settings().load().await.unwrap();
        assert!(b_settings.value.tax_rules.is_empty());
        assert_eq!(b_settings.version, 0);

        // Tenant B saving at version 0 does not collide with tenant A's version 1.
        db.scope(b.id)
            .settings()
            .save(0, &TenantSettings::default())
            .await
            .unwrap();
        assert_eq!(db.scope(a.id).settings().load().await.unwrap().version, 1);
    }
}
