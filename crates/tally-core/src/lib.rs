//! # tally-core: Pure Rule Engines for Tally POS
//!
//! This crate holds the per-tenant rule engines of Tally POS as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  tally-admin (CLI) / web frontend               │   │
//! │  │     status ──► next-open ──► quote ──► settings import         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  tally-db (Store Layer)                         │   │
//! │  │     tenants, TenantScope, versioned settings, tax audit         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ TenantSettings (immutable value)       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │    tax    │  │   hours   │  │  holiday  │  │   quote   │  │   │
//! │  │   │ TaxRule   │  │ Schedule  │  │ Holiday   │  │ SaleQuote │  │   │
//! │  │   │ Resolver  │  │ OpenStatus│  │ Recurrence│  │   Money   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`tax`] - Tax rule resolution (priority, product scope, region)
//! - [`hours`] - Business-hours evaluation and next-open search
//! - [`holiday`] - Holiday calendar matching
//! - [`quote`] - Cart totals settled to cents
//! - [`types`] - Tenant, TenantSettings, TaxRate, Versioned
//! - [`money`] - Integer-cent money with half-even rounding
//! - [`validation`] - Write-time settings validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Evaluators never fail**: missing or malformed configuration means
//!    no tax and always open, and the result says which branch was taken
//! 2. **Time is an argument**: nothing here reads the system clock
//! 3. **Exact until settled**: rates and tax amounts are `Decimal`; only
//!    [`money::Money::from_decimal`] rounds
//! 4. **Explicit Errors**: validation errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use tally_core::tax::{calculate_tax, TaxCalculationContext};
//! use tally_core::{Money, TaxRate};
//!
//! let context = TaxCalculationContext::for_subtotal(Decimal::new(1099, 2)); // $10.99
//! let tax = calculate_tax(&context, &[], TaxRate::from_percent(Decimal::new(825, 2)));
//!
//! // 10.99 × 8.25% = 0.906675, settled half-even to $0.91
//! assert_eq!(Money::from_decimal(tax.amount).cents(), 91);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod holiday;
pub mod hours;
pub mod money;
pub mod quote;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tally_core::Money` instead of
// `use tally_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use holiday::{get_holiday_for_date, Holiday};
pub use hours::{get_next_open_time, is_business_open, BusinessHours, OpenBasis, OpenStatus};
pub use money::Money;
pub use quote::{quote_sale, quote_sale_with, SaleQuote};
pub use tax::{calculate_tax, calculate_tax_for_items, TaxCalculation, TaxRule, TaxSource, TieBreak};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Shortest accepted tenant slug.
pub const MIN_SLUG_LEN: usize = 3;

/// Longest accepted tenant slug (one DNS label).
pub const MAX_SLUG_LEN: usize = 63;
