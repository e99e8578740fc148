//! # Tax Audit Repository
//!
//! Keeps the tax decision behind every settled sale line.
//!
//! A tax rule can be edited or deleted after a sale. The audit entry stores a
//! snapshot of the rule that was applied, so the receipt can always be
//! explained with the rule as it was at the time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use tally_core::tax::{TaxCalculation, TaxRule, TaxSource};
use tally_core::{Money, TaxRate, TenantId};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// One audited sale line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxAuditEntry {
    pub id: String,
    pub tenant_id: TenantId,
    pub sale_id: String,
    pub line_index: usize,
    /// Settled tax for the line.
    pub tax: Money,
    pub rate: TaxRate,
    pub label: String,
    pub source: TaxSource,
    /// The rules applied at the time (zero or one).
    pub rule_snapshot: Vec<TaxRule>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct AuditRow {
    id: String,
    tenant_id: String,
    sale_id: String,
    line_index: i64,
    tax_cents: i64,
    rate: String,
    label: String,
    source: String,
    rule_snapshot: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for TaxAuditEntry {
    type Error = DbError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let tenant_id = row
            .tenant_id
            .parse::<TenantId>()
            .map_err(|e| DbError::Internal(e.to_string()))?;
        let rate = Decimal::from_str(&row.rate)
            .map_err(|e| DbError::Internal(format!("stored rate '{}': {e}", row.rate)))?;
        let source: TaxSource = serde_json::from_value(serde_json::Value::String(row.source))?;

        Ok(TaxAuditEntry {
            id: row.id,
            tenant_id,
            sale_id: row.sale_id,
            line_index: usize::try_from(row.line_index)
                .map_err(|e| DbError::Internal(e.to_string()))?,
            tax: Money::from_cents(row.tax_cents),
            rate: TaxRate::from_percent(rate),
            label: row.label,
            source,
            rule_snapshot: serde_json::from_str(&row.rule_snapshot)?,
            created_at: row.created_at,
        })
    }
}

/// Repository for one tenant's tax audit trail.
#[derive(Debug, Clone)]
pub struct TaxAuditRepository {
    pool: SqlitePool,
    tenant_id: TenantId,
}

impl TaxAuditRepository {
    pub(crate) fn new(pool: SqlitePool, tenant_id: TenantId) -> Self {
        TaxAuditRepository { pool, tenant_id }
    }

    /// Records how line `line_index` of sale `sale_id` was taxed.
    ///
    /// ## Errors
    /// - `UniqueViolation` if that line of the sale is already audited
    pub async fn record(
        &self,
        sale_id: &str,
        line_index: usize,
        calculation: &TaxCalculation,
        tax: Money,
    ) -> DbResult<TaxAuditEntry> {
        let mut entries = self
            .record_sale(sale_id, &[(line_index, calculation, tax)])
            .await?;
        entries
            .pop()
            .ok_or_else(|| DbError::Internal("audit insert returned no entry".to_string()))
    }

    /// Records every line of a sale in one transaction.
    ///
    /// ## Transaction
    /// ```text
    /// BEGIN
    ///   INSERT tax_audit (sale, line 0)
    ///   INSERT tax_audit (sale, line 1)
    ///   ...
    /// COMMIT            (any failure: nothing is written)
    /// ```
    ///
    /// ## Errors
    /// - `UniqueViolation` if any line is already audited (including a line
    ///   listed twice); no line of the call is kept
    pub async fn record_sale(
        &self,
        sale_id: &str,
        lines: &[(usize, &TaxCalculation, Money)],
    ) -> DbResult<Vec<TaxAuditEntry>> {
        let created_at = Utc::now();
        let mut entries = Vec::with_capacity(lines.len());

        let mut tx = self.pool.begin().await?;

        for &(line_index, calculation, tax) in lines {
            let entry = TaxAuditEntry {
                id: Uuid::new_v4().to_string(),
                tenant_id: self.tenant_id,
                sale_id: sale_id.to_string(),
                line_index,
                tax,
                rate: calculation.rate,
                label: calculation.label.clone(),
                source: calculation.source,
                rule_snapshot: calculation.applied_rules.clone(),
                created_at,
            };
            let source = match serde_json::to_value(entry.source)? {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };

            sqlx::query(
                r#"
                INSERT INTO tax_audit (
                    id, tenant_id, sale_id, line_index, tax_cents,
                    rate, label, source, rule_snapshot, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(&entry.id)
            .bind(self.tenant_id.to_string())
            .bind(&entry.sale_id)
            .bind(i64::try_from(line_index).map_err(|e| DbError::Internal(e.to_string()))?)
            .bind(tax.cents())
            .bind(entry.rate.percent().to_string())
            .bind(&entry.label)
            .bind(source)
            .bind(serde_json::to_string(&entry.rule_snapshot)?)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { .. } => {
                    DbError::duplicate("sale line", format!("{sale_id}#{line_index}"))
                }
                other => other,
            })?;

            entries.push(entry);
        }

        tx.commit().await?;

        debug!(
            tenant_id = %self.tenant_id,
            sale_id = %sale_id,
            lines = entries.len(),
            "Recorded tax audit entries"
        );

        Ok(entries)
    }

    /// Lists the audited lines of one sale in line order.
    pub async fn list_for_sale(&self, sale_id: &str) -> DbResult<Vec<TaxAuditEntry>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, tenant_id, sale_id, line_index, tax_cents,
                   rate, label, source, rule_snapshot, created_at
            FROM tax_audit
            WHERE tenant_id = ?1 AND sale_id = ?2
            ORDER BY line_index
            "#,
        )
        .bind(self.tenant_id.to_string())
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TaxAuditEntry::try_from).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use rust_decimal_macros::dec;
    use tally_core::tax::{calculate_tax, AppliesTo, TaxCalculationContext, TaxRule, TaxSource};
    use tally_core::{Money, TaxRate, TenantId};

    fn vat() -> TaxRule {
        TaxRule {
            id: "vat".to_string(),
            name: "VAT".to_string(),
            rate: TaxRate::from_percent(dec!(20)),
            label: "VAT".to_string(),
            applies_to: AppliesTo::All,
            category_ids: Vec::new(),
            product_ids: Vec::new(),
            region: None,
            priority: 1,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_record_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tenant = db.tenants().create("audit-shop", "Audit Shop").await.unwrap();
        let audit = db.scope(tenant.id).audit();

        let rules = vec![vat()];
        let taxed = calculate_tax(&TaxCalculationContext::for_subtotal(dec!(12.50)), &rules, TaxRate::zero());
        let untaxed = calculate_tax(&TaxCalculationContext::for_subtotal(dec!(3)), &[], TaxRate::zero());

        audit.record("sale-1", 1, &untaxed, Money::zero()).await.unwrap();
        audit
            .record("sale-1", 0, &taxed, Money::from_decimal(taxed.amount))
            .await
            .unwrap();
        audit.record("sale-2", 0, &untaxed, Money::zero()).await.unwrap();

        let entries = audit.list_for_sale("sale-1").await.unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].line_index, 0);
        assert_eq!(entries[0].tax.cents(), 250);
        assert_eq!(entries[0].rate, TaxRate::from_percent(dec!(20)));
        assert_eq!(entries[0].source, TaxSource::Rule);
        assert_eq!(entries[0].rule_snapshot, rules);

        assert_eq!(entries[1].source, TaxSource::NoTax);
        assert!(entries[1].rule_snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_line_cannot_be_recorded_twice() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tenant = db.tenants().create("audit-once", "Audit Once").await.unwrap();
        let audit = db.scope(tenant.id).audit();

        let none = calculate_tax(&TaxCalculationContext::for_subtotal(dec!(1)), &[], TaxRate::zero());
        audit.record("sale-1", 0, &none, Money::zero()).await.unwrap();

        let err = audit.record("sale-1", 0, &none, Money::zero()).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(audit.list_for_sale("sale-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_record_sale_is_all_or_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tenant = db.tenants().create("audit-atomic", "Audit Atomic").await.unwrap();
        let audit = db.scope(tenant.id).audit();

        let rules = vec![vat()];
        let taxed = calculate_tax(&TaxCalculationContext::for_subtotal(dec!(10)), &rules, TaxRate::zero());
        let tax = Money::from_decimal(taxed.amount);

        // Line 1 listed twice: the whole sale is rejected.
        let err = audit
            .record_sale("sale-1", &[(0, &taxed, tax), (1, &taxed, tax), (1, &taxed, tax)])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert!(audit.list_for_sale("sale-1").await.unwrap().is_empty());

        let entries = audit
            .record_sale("sale-1", &[(0, &taxed, tax), (1, &taxed, tax)])
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);

        // Re-recording an audited sale keeps the original entries.
        assert!(audit
            .record_sale("sale-1", &[(0, &taxed, tax), (1, &taxed, tax)])
            .await
            .is_err());
        let stored = audit.list_for_sale("sale-1").await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].id, entries[0].id);
    }

    #[tokio::test]
    async fn test_audit_is_tenant_scoped() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = db.tenants().create("audit-a", "A").await.unwrap();
        let b = db.tenants().create("audit-b", "B").await.unwrap();

        let none = calculate_tax(&TaxCalculationContext::for_subtotal(dec!(1)), &[], TaxRate::zero());
        db.scope(a.id)
            .audit()
            .record("shared-sale-id", 0, &none, Money::zero())
            .await
            .unwrap();

        assert!(db
            .scope(b.id)
            .audit()
            .list_for_sale("shared-sale-id")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tenant_scope_cannot_write() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let scope = db.scope(TenantId::new());
        assert_eq!(scope.settings().load().await.unwrap().version, 0);
        let audit = scope.audit();

        let none = calculate_tax(&TaxCalculationContext::for_subtotal(dec!(1)), &[], TaxRate::zero());
        let err = audit.record("sale-1", 0, &none, Money::zero()).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        assert!(audit.list_for_sale("sale-1").await.unwrap().is_empty());
    }
}
