//! # Domain Types
//!
//! Tenant-level types shared by the engines and the store.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Tenant Aggregate                                │
//! │                                                                         │
//! │  ┌─────────────────┐        ┌──────────────────────────────────────┐   │
//! │  │     Tenant      │ 1    1 │        TenantSettings                │   │
//! │  │  ─────────────  │───────►│  ──────────────────────────────────  │   │
//! │  │  id (UUID)      │        │  currency         "USD"              │   │
//! │  │  slug           │        │  default_tax_rate TaxRate            │   │
//! │  │  name           │        │  tax_rules        Vec<TaxRule>       │   │
//! │  │  is_active      │        │  business_hours   Option<...>        │   │
//! │  └─────────────────┘        │  holidays         Vec<Holiday>       │   │
//! │                             └──────────────────────────────────────┘   │
//! │                                        │                                │
//! │                              Versioned<TenantSettings>                  │
//! │                              (loaded whole, saved whole,                │
//! │                               version checked on write)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Settings are plain immutable values. Changing them means building a new
//! value (`with_*` methods) and saving it against the version it came from.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::CoreError;
use crate::holiday::Holiday;
use crate::hours::{self, BusinessHours, OpenStatus};
use crate::tax::TaxRule;

// =============================================================================
// Tax Rate
// =============================================================================

/// A tax rate expressed as a percentage (`8.5` = 8.5 %).
///
/// ## Why Decimal?
/// Rates like 8.875 % (New York City) do not fit basis points, and the
/// resolver must return the exact, unrounded amount. Rounding to cents is the
/// caller's job (see [`crate::money::Money::from_decimal`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(#[ts(type = "string")] Decimal);

impl TaxRate {
    /// Creates a tax rate from a percentage.
    #[inline]
    pub const fn from_percent(percent: Decimal) -> Self {
        TaxRate(percent)
    }

    /// Returns the rate as a percentage.
    #[inline]
    pub const fn percent(&self) -> Decimal {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(Decimal::ZERO)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the rate would produce any tax.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Applies the rate: `subtotal × rate / 100`, unrounded.
    ///
    /// Products too large to represent are divided first; if that still
    /// overflows the result degrades to zero rather than panicking.
    pub fn apply(&self, subtotal: Decimal) -> Decimal {
        subtotal
            .checked_mul(self.0)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .or_else(|| {
                subtotal
                    .checked_div(Decimal::ONE_HUNDRED)
                    .and_then(|v| v.checked_mul(self.0))
            })
            .unwrap_or(Decimal::ZERO)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

// =============================================================================
// Tenant Identity
// =============================================================================

/// Identifier of a tenant (UUID v4).
///
/// Every store query is keyed by one of these; see `tally_db::TenantScope`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TenantId(#[ts(type = "string")] Uuid);

impl TenantId {
    /// Generates a fresh tenant id.
    pub fn new() -> Self {
        TenantId(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub const fn from_uuid(id: Uuid) -> Self {
        TenantId(id)
    }

    /// Returns the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TenantId {
    fn default() -> Self {
        TenantId::new()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TenantId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(TenantId)
            .map_err(|_| CoreError::InvalidTenantId(s.to_string()))
    }
}

/// An isolated store/organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: TenantId,

    /// URL path segment used to address the tenant (`/s/{slug}/...`).
    pub slug: String,

    /// Display name.
    pub name: String,

    /// Inactive tenants no longer resolve from their slug.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Tenant Settings
// =============================================================================

/// The per-tenant configuration document.
///
/// Every field has a default so a partially written document still loads,
/// and an empty document means: no tax, always open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TenantSettings {
    /// ISO 4217 currency code.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Flat rate applied when no tax rule matches.
    #[serde(default)]
    pub default_tax_rate: TaxRate,

    #[serde(default)]
    pub tax_rules: Vec<TaxRule>,

    #[serde(default)]
    pub business_hours: Option<BusinessHours>,

    #[serde(default)]
    pub holidays: Vec<Holiday>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for TenantSettings {
    fn default() -> Self {
        TenantSettings {
            currency: default_currency(),
            default_tax_rate: TaxRate::zero(),
            tax_rules: Vec::new(),
            business_hours: None,
            holidays: Vec::new(),
        }
    }
}

impl TenantSettings {
    /// Returns a copy with `rule` inserted, replacing any rule with the same id.
    pub fn with_tax_rule(&self, rule: TaxRule) -> Self {
        let mut next = self.clone();
        match next.tax_rules.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => *existing = rule,
            None => next.tax_rules.push(rule),
        }
        next
    }

    /// Returns a copy without the rule `id`.
    pub fn without_tax_rule(&self, id: &str) -> Self {
        let mut next = self.clone();
        next.tax_rules.retain(|r| r.id != id);
        next
    }

    /// Returns a copy with `holiday` inserted, replacing any holiday with the same id.
    pub fn with_holiday(&self, holiday: Holiday) -> Self {
        let mut next = self.clone();
        match next.holidays.iter_mut().find(|h| h.id == holiday.id) {
            Some(existing) => *existing = holiday,
            None => next.holidays.push(holiday),
        }
        next
    }

    /// Returns a copy with the weekly schedule replaced.
    pub fn with_business_hours(&self, hours: Option<BusinessHours>) -> Self {
        TenantSettings {
            business_hours: hours,
            ..self.clone()
        }
    }

    /// Returns a copy with a new fallback tax rate.
    pub fn with_default_tax_rate(&self, rate: TaxRate) -> Self {
        TenantSettings {
            default_tax_rate: rate,
            ..self.clone()
        }
    }

    /// Evaluates opening status for a UTC instant in the tenant's timezone.
    pub fn open_status_at(&self, instant: DateTime<Utc>) -> OpenStatus {
        hours::is_business_open_at(instant, self.business_hours.as_ref(), &self.holidays)
    }

    /// Finds the next opening instant at or after `instant`.
    pub fn next_open_at(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        hours::next_open_at(instant, self.business_hours.as_ref(), &self.holidays)
    }

    /// Converts a UTC instant to the tenant's wall-clock time.
    pub fn local_time(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        match &self.business_hours {
            Some(hours) => hours.local_time(instant),
            None => instant.naive_utc(),
        }
    }
}

// =============================================================================
// Versioned Values
// =============================================================================

/// A value together with the store version it was read at.
///
/// Version `0` means the value has never been written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub value: T,
    pub version: i64,
}

impl<T> Versioned<T> {
    pub fn new(value: T, version: i64) -> Self {
        Versioned { value, version }
    }

    /// True if nothing has been persisted yet.
    pub fn is_new(&self) -> bool {
        self.version == 0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
