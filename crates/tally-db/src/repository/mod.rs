//! # Repository Module
//!
//! Database repository implementations for Tally POS.
//!
//! ## Tenant Scoping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who May Touch Which Rows                             │
//! │                                                                         │
//! │  Database                                                              │
//! │  ├── tenants()  → TenantRepository     the directory itself            │
//! │  │                                                                      │
//! │  └── scope(id)  → TenantScope { tenant_id }                            │
//! │                   ├── settings() → SettingsRepository                  │
//! │                   └── audit()    → TaxAuditRepository                  │
//! │                                                                         │
//! │  Scoped repositories have crate-private constructors and no method     │
//! │  that takes a tenant id. Every statement they run binds the scope's    │
//! │  id, so a caller holding tenant A's scope cannot read tenant B.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`TenantRepository`](tenant::TenantRepository) - Tenant directory
//! - [`SettingsRepository`](settings::SettingsRepository) - Versioned settings document
//! - [`TaxAuditRepository`](audit::TaxAuditRepository) - Tax decisions per sale line

pub mod audit;
pub mod settings;
pub mod tenant;

use sqlx::SqlitePool;
use tally_core::TenantId;

use audit::TaxAuditRepository;
use settings::SettingsRepository;

/// The store as seen by one tenant.
#[derive(Debug, Clone)]
pub struct TenantScope {
    pool: SqlitePool,
    tenant_id: TenantId,
}

impl TenantScope {
    pub(crate) fn new(pool: SqlitePool, tenant_id: TenantId) -> Self {
        TenantScope { pool, tenant_id }
    }

    /// The tenant this scope is bound to.
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the tenant's settings repository.
    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.pool.clone(), self.tenant_id)
    }

    /// Returns the tenant's tax audit repository.
    pub fn audit(&self) -> TaxAuditRepository {
        TaxAuditRepository::new(self.pool.clone(), self.tenant_id)
    }
}
