//! # Sale Quote
//!
//! Turns the resolver's exact decimal output into settled cents for a cart.
//!
//! ```text
//! items ──► TaxResolver::calculate_items ──► exact per-line tax
//!                                              │
//!                      Σ exact tax ◄───────────┘
//!                           │
//!                 Money::from_decimal (half-even, once)
//!                           │
//!                           ▼
//!            SaleQuote { subtotal, tax, total, lines }
//! ```
//!
//! Line `tax` values are also rounded for display, but the quote's `tax` is
//! rounded from the exact sum, so it may differ from the sum of the rounded
//! line values by a cent.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::tax::{LineItem, SaleRegion, TaxResolver, TieBreak};
use crate::types::{TaxRate, TenantSettings};

/// One priced line of a [`SaleQuote`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLine {
    pub item_index: usize,
    pub subtotal: Money,
    pub tax: Money,
    pub rate: TaxRate,
    pub label: String,
}

/// Settled totals for a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleQuote {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub lines: Vec<QuoteLine>,
}

/// Prices `items` against a tenant's tax configuration.
pub fn quote_sale(
    items: &[LineItem],
    settings: &TenantSettings,
    region: Option<&SaleRegion>,
) -> SaleQuote {
    quote_sale_with(items, settings, region, TieBreak::default())
}

/// [`quote_sale`] with an explicit policy for equal-priority rules.
pub fn quote_sale_with(
    items: &[LineItem],
    settings: &TenantSettings,
    region: Option<&SaleRegion>,
    tie_break: TieBreak,
) -> SaleQuote {
    let resolver =
        TaxResolver::new(&settings.tax_rules, settings.default_tax_rate).tie_break(tie_break);
    let taxed = resolver.calculate_items(items, region);

    let mut exact_subtotal = Decimal::ZERO;
    let lines: Vec<QuoteLine> = items
        .iter()
        .zip(taxed.item_taxes)
        .map(|(item, tax)| {
            let line_subtotal = item.subtotal();
            exact_subtotal = exact_subtotal.saturating_add(line_subtotal);
            QuoteLine {
                item_index: tax.item_index,
                subtotal: Money::from_decimal(line_subtotal),
                tax: Money::from_decimal(tax.tax),
                rate: tax.rate,
                label: tax.label,
            }
        })
        .collect();

    let subtotal = Money::from_decimal(exact_subtotal);
    let tax = Money::from_decimal(taxed.total_tax);

    SaleQuote {
        subtotal,
        tax,
        total: subtotal + tax,
        lines,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
