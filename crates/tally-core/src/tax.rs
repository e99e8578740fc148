//! # Tax Rule Resolver
//!
//! Selects the single tax rule that applies to a sale line and computes the
//! exact tax amount.
//!
//! ## Resolution Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  rules ──► is_active? ──► matches(context)? ──► max priority ──► rule  │
//! │                                   │                                     │
//! │                                   │  (a) applies_to vs product type     │
//! │                                   │  (b) category membership            │
//! │                                   │  (c) product id membership          │
//! │                                   │  (d) region: every populated field  │
//! │                                                                         │
//! │  No rule matched:                                                       │
//! │     default rate > 0  ──► TaxSource::DefaultRate, label "Tax"          │
//! │     otherwise         ──► TaxSource::NoTax, amount 0                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here returns an error. A half-configured tenant still sells; it
//! just collects the default rate (or nothing).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::TaxRate;

/// Label used when the tenant's default rate applies.
pub const DEFAULT_TAX_LABEL: &str = "Tax";

/// Label used when no tax is charged.
pub const NO_TAX_LABEL: &str = "No Tax";

// =============================================================================
// Rule Types
// =============================================================================

/// What kind of line a rule targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum AppliesTo {
    #[default]
    All,
    Products,
    Services,
    Categories,
}

/// Whether a sale line is a physical product or a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Product,
    Service,
}

/// Geographic constraint on a rule. Only populated fields are checked.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TaxRegion {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub zip_codes: Vec<String>,
}

/// A prioritized, conditionally applicable rate definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TaxRule {
    pub id: String,
    pub name: String,
    pub rate: TaxRate,
    /// Text printed on receipts ("VAT", "CA Sales Tax", ...).
    pub label: String,
    #[serde(default)]
    pub applies_to: AppliesTo,
    #[serde(default)]
    pub category_ids: Vec<String>,
    #[serde(default)]
    pub product_ids: Vec<String>,
    #[serde(default)]
    pub region: Option<TaxRegion>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Calculation Context
// =============================================================================

/// Where the sale happens.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleRegion {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
}

/// The sale line being taxed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TaxCalculationContext {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub product_type: Option<ProductType>,
    #[serde(default)]
    pub region: Option<SaleRegion>,
    /// Pre-tax amount of the line, must be ≥ 0. Negative values are clamped.
    #[ts(type = "string")]
    pub subtotal: Decimal,
}

impl TaxCalculationContext {
    /// Shorthand for a context that carries only a subtotal.
    pub fn for_subtotal(subtotal: Decimal) -> Self {
        TaxCalculationContext {
            subtotal,
            ..Default::default()
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// Which branch produced a [`TaxCalculation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum TaxSource {
    /// A configured rule matched.
    Rule,
    /// No rule matched; the tenant's default rate applied.
    DefaultRate,
    /// No rule matched and there is no default rate.
    NoTax,
}

/// Outcome of resolving one sale line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TaxCalculation {
    /// Exact, unrounded tax amount.
    #[ts(type = "string")]
    pub amount: Decimal,
    pub rate: TaxRate,
    pub label: String,
    /// The rule that was applied (zero or one entry).
    pub applied_rules: Vec<TaxRule>,
    pub source: TaxSource,
}

/// How to choose between matching rules that share the top priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The rule listed first wins.
    #[default]
    FirstListed,
    /// The rule with the lexically smallest id wins, independent of order.
    LowestId,
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves tax for sale lines against a rule set.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use tally_core::tax::{TaxCalculationContext, TaxResolver, TaxSource};
/// use tally_core::TaxRate;
///
/// let resolver = TaxResolver::new(&[], TaxRate::from_percent(Decimal::new(85, 1)));
/// let tax = resolver.calculate(&TaxCalculationContext::for_subtotal(Decimal::ONE_HUNDRED));
///
/// assert_eq!(tax.amount, Decimal::new(85, 1));
/// assert_eq!(tax.source, TaxSource::DefaultRate);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TaxResolver<'a> {
    rules: &'a [TaxRule],
    default_rate: TaxRate,
    tie_break: TieBreak,
}

impl<'a> TaxResolver<'a> {
    pub fn new(rules: &'a [TaxRule], default_rate: TaxRate) -> Self {
        TaxResolver {
            rules,
            default_rate,
            tie_break: TieBreak::default(),
        }
    }

    /// Sets the tie-break policy for equal priorities.
    pub fn tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Picks the rule that applies to `context`, if any.
    pub fn select(&self, context: &TaxCalculationContext) -> Option<&'a TaxRule> {
        let mut best: Option<&'a TaxRule> = None;

        for rule in self.rules.iter().filter(|r| r.is_active) {
            if !rule_matches(rule, context) {
                continue;
            }
            best = match best {
                None => Some(rule),
                Some(current) if rule.priority > current.priority => Some(rule),
                Some(current)
                    if rule.priority == current.priority
                        && self.tie_break == TieBreak::LowestId
                        && rule.id < current.id =>
                {
                    Some(rule)
                }
                keep => keep,
            };
        }

        best
    }

    /// Computes tax for one line.
    pub fn calculate(&self, context: &TaxCalculationContext) -> TaxCalculation {
        let subtotal = context.subtotal.max(Decimal::ZERO);

        if let Some(rule) = self.select(context) {
            return TaxCalculation {
                amount: rule.rate.apply(subtotal),
                rate: rule.rate,
                label: rule.label.clone(),
                applied_rules: vec![rule.clone()],
                source: TaxSource::Rule,
            };
        }

        if self.default_rate.is_positive() {
            return TaxCalculation {
                amount: self.default_rate.apply(subtotal),
                rate: self.default_rate,
                label: DEFAULT_TAX_LABEL.to_string(),
                applied_rules: Vec::new(),
                source: TaxSource::DefaultRate,
            };
        }

        TaxCalculation {
            amount: Decimal::ZERO,
            rate: TaxRate::zero(),
            label: NO_TAX_LABEL.to_string(),
            applied_rules: Vec::new(),
            source: TaxSource::NoTax,
        }
    }

    /// Computes tax for every line; lines never influence each other.
    pub fn calculate_items(&self, items: &[LineItem], region: Option<&SaleRegion>) -> ItemsTax {
        let mut total_tax = Decimal::ZERO;
        let mut item_taxes = Vec::with_capacity(items.len());

        for (item_index, item) in items.iter().enumerate() {
            let context = item.context(region);
            let tax = self.calculate(&context);
            total_tax = total_tax.saturating_add(tax.amount);
            item_taxes.push(ItemTax {
                item_index,
                tax: tax.amount,
                rate: tax.rate,
                label: tax.label,
            });
        }

        ItemsTax {
            total_tax,
            item_taxes,
        }
    }
}

/// Computes tax for one sale line.
pub fn calculate_tax(
    context: &TaxCalculationContext,
    rules: &[TaxRule],
    default_rate: TaxRate,
) -> TaxCalculation {
    TaxResolver::new(rules, default_rate).calculate(context)
}

/// Computes tax for each line and the sum across lines.
pub fn calculate_tax_for_items(
    items: &[LineItem],
    rules: &[TaxRule],
    default_rate: TaxRate,
    region: Option<&SaleRegion>,
) -> ItemsTax {
    TaxResolver::new(rules, default_rate).calculate_items(items, region)
}

// =============================================================================
// Matching
// =============================================================================

fn rule_matches(rule: &TaxRule, context: &TaxCalculationContext) -> bool {
    let type_ok = match rule.applies_to {
        AppliesTo::All => true,
        AppliesTo::Products => context.product_type == Some(ProductType::Product),
        AppliesTo::Services => context.product_type == Some(ProductType::Service),
        AppliesTo::Categories => context
            .category_id
            .as_ref()
            .is_some_and(|c| rule.category_ids.contains(c)),
    };
    if !type_ok {
        return false;
    }

    if !rule.product_ids.is_empty()
        && !context
            .product_id
            .as_ref()
            .is_some_and(|p| rule.product_ids.contains(p))
    {
        return false;
    }

    match &rule.region {
        Some(region) => region_matches(region, context.region.as_ref()),
        None => true,
    }
}

fn region_matches(rule: &TaxRegion, sale: Option<&SaleRegion>) -> bool {
    let field_ok = |wanted: &Option<String>, actual: Option<&String>| match populated(wanted) {
        Some(w) => actual.is_some_and(|a| a == w),
        None => true,
    };

    let country = sale.and_then(|s| s.country.as_ref());
    let state = sale.and_then(|s| s.state.as_ref());
    let city = sale.and_then(|s| s.city.as_ref());
    let zip = sale.and_then(|s| s.zip_code.as_ref());

    let zip_ok = rule.zip_codes.iter().all(|z| z.is_empty())
        || zip.is_some_and(|z| rule.zip_codes.contains(z));

    field_ok(&rule.country, country)
        && field_ok(&rule.state, state)
        && field_ok(&rule.city, city)
        && zip_ok
}

fn populated(field: &Option<String>) -> Option<&String> {
    field.as_ref().filter(|s| !s.is_empty())
}

// =============================================================================
// Line Items
// =============================================================================

/// A line on a sale, as seen by the resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub product_type: Option<ProductType>,
    /// Unit price in major currency units.
    #[ts(type = "string")]
    pub price: Decimal,
    pub quantity: u32,
}

impl LineItem {
    /// `price × quantity`.
    pub fn subtotal(&self) -> Decimal {
        self.price
            .checked_mul(Decimal::from(self.quantity))
            .unwrap_or(Decimal::ZERO)
    }

    /// The resolver context for this line sold in `region`.
    pub fn context(&self, region: Option<&SaleRegion>) -> TaxCalculationContext {
        TaxCalculationContext {
            product_id: self.product_id.clone(),
            category_id: self.category_id.clone(),
            product_type: self.product_type,
            region: region.cloned(),
            subtotal: self.subtotal(),
        }
    }
}

/// Tax for one line of [`calculate_tax_for_items`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ItemTax {
    pub item_index: usize,
    #[ts(type = "string")]
    pub tax: Decimal,
    pub rate: TaxRate,
    pub label: String,
}

/// Result of [`calculate_tax_for_items`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ItemsTax {
    #[ts(type = "string")]
    pub total_tax: Decimal,
    pub item_taxes: Vec<ItemTax>,
}

// =============================================================================
// Unit Tests
// =============================================================================
