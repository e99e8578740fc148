//! # Tenant Repository
//!
//! The tenant directory: creation, lookup by slug, deactivation.
//!
//! ## Slug Resolution
//! ```text
//! "/s/corner-bakery/..."
//!        │
//!        ▼
//! resolve_slug("corner-bakery") ──► Some(TenantId)  (active tenants only)
//!        │
//!        ▼
//! db.scope(tenant_id) ──► every later query is bound to that id
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tally_core::validation::{validate_slug, validate_tenant_name};
use tally_core::{Tenant, TenantId, TenantSettings};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

#[derive(Debug, FromRow)]
struct TenantRow {
    id: String,
    slug: String,
    name: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TenantRow> for Tenant {
    type Error = DbError;

    fn try_from(row: TenantRow) -> Result<Self, Self::Error> {
        let id = row
            .id
            .parse::<TenantId>()
            .map_err(|e| DbError::Internal(e.to_string()))?;

        Ok(Tenant {
            id,
            slug: row.slug,
            name: row.name,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for the tenant directory.
#[derive(Debug, Clone)]
pub struct TenantRepository {
    pool: SqlitePool,
}

impl TenantRepository {
    /// Creates a new TenantRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TenantRepository { pool }
    }

    /// Creates an active tenant with an empty settings document.
    ///
    /// ## Errors
    /// - `Validation` for a malformed slug or blank name
    /// - `UniqueViolation` if the slug is taken
    pub async fn create(&self, slug: &str, name: &str) -> DbResult<Tenant> {
        validate_slug(slug)?;
        validate_tenant_name(name)?;

        let now = Utc::now();
        let tenant = Tenant {
            id: TenantId::new(),
            slug: slug.to_string(),
            name: name.trim().to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let document = serde_json::to_string(&TenantSettings::default())?;

        debug!(slug = %slug, "Creating tenant");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO tenants (id, slug, name, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, 1, ?4, ?5)
            "#,
        )
        .bind(tenant.id.to_string())
        .bind(&tenant.slug)
        .bind(&tenant.name)
        .bind(tenant.created_at)
        .bind(tenant.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("slug", slug),
            other => other,
        })?;

        sqlx::query(
            r#"
            INSERT INTO tenant_settings (tenant_id, document, version, updated_at)
            VALUES (?1, ?2, 0, ?3)
            "#,
        )
        .bind(tenant.id.to_string())
        .bind(document)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(tenant_id = %tenant.id, slug = %tenant.slug, "Tenant created");
        Ok(tenant)
    }

    /// Gets a tenant by id, active or not.
    pub async fn get(&self, id: TenantId) -> DbResult<Tenant> {
        let row = sqlx::query_as::<_, TenantRow>(
            r#"
            SELECT id, slug, name, is_active, created_at, updated_at
            FROM tenants
            WHERE id = ?1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Tenant", id.to_string()))?;

        row.try_into()
    }

    /// Resolves a slug to the id of an active tenant.
    pub async fn resolve_slug(&self, slug: &str) -> DbResult<Option<TenantId>> {
        let id: Option<String> = sqlx::query_scalar(
            r#"
            SELECT id FROM tenants
            WHERE slug = ?1 AND is_active = 1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        debug!(slug = %slug, found = id.is_some(), "Resolved tenant slug");

        id.map(|raw| {
            raw.parse::<TenantId>()
                .map_err(|e| DbError::Internal(e.to_string()))
        })
        .transpose()
    }

    /// Lists active tenants ordered by slug.
    pub async fn list_active(&self) -> DbResult<Vec<Tenant>> {
        let rows = sqlx::query_as::<_, TenantRow>(
            r#"
            SELECT id, slug, name, is_active, created_at, updated_at
            FROM tenants
            WHERE is_active = 1
            ORDER BY slug
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Tenant::try_from).collect()
    }

    /// Deactivates a tenant. Its slug stops resolving; its data stays.
    pub async fn deactivate(&self, id: TenantId) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tenants
            SET is_active = 0, updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id.to_string())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Tenant", id.to_string()));
        }

        info!(tenant_id = %id, "Tenant deactivated");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
