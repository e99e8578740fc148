//! # Validation Module
//!
//! Write-time validation of tenant settings.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Two Different Attitudes                            │
//! │                                                                         │
//! │  SAVE  (settings import, admin edits)                                  │
//! │  ├── THIS MODULE: strict, first error wins                             │
//! │  └── A document that fails here is never written                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  STORE (tenant_settings.document)                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  EVALUATE (tax, hours, holidays)                                       │
//! │  ├── Lenient: malformed pieces are skipped or fail open                │
//! │  └── Never returns an error                                            │
//! │                                                                         │
//! │  Older documents written before a rule existed must still evaluate.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_slug, validate_time_of_day};
//!
//! assert!(validate_slug("corner-bakery").is_ok());
//! assert!(validate_time_of_day("openTime", "25:00").is_err());
//! ```

use std::collections::HashSet;

use chrono_tz::Tz;
use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::holiday::{parse_day, Holiday, HolidayType, RecurrencePattern};
use crate::hours::{BusinessHours, DaySchedule, TimeOfDay};
use crate::tax::{AppliesTo, TaxRule};
use crate::types::{TaxRate, TenantSettings};
use crate::{MAX_SLUG_LEN, MIN_SLUG_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Tenant Validators
// =============================================================================

/// Validates a tenant slug.
///
/// ## Rules
/// - 3 to 63 characters
/// - Lowercase ASCII letters, digits and hyphens
/// - Must not start or end with a hyphen
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_slug;
///
/// assert!(validate_slug("joes-diner").is_ok());
/// assert!(validate_slug("Joes Diner").is_err());
/// assert!(validate_slug("-joe").is_err());
/// ```
pub fn validate_slug(slug: &str) -> ValidationResult<()> {
    if slug.is_empty() {
        return Err(ValidationError::required("slug"));
    }

    if slug.len() < MIN_SLUG_LEN {
        return Err(ValidationError::TooShort {
            field: "slug".to_string(),
            min: MIN_SLUG_LEN,
        });
    }

    if slug.len() > MAX_SLUG_LEN {
        return Err(ValidationError::TooLong {
            field: "slug".to_string(),
            max: MAX_SLUG_LEN,
        });
    }

    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ValidationError::invalid(
            "slug",
            "must contain only lowercase letters, digits, and hyphens",
        ));
    }

    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(ValidationError::invalid(
            "slug",
            "must not start or end with a hyphen",
        ));
    }

    Ok(())
}

/// Validates a tenant display name (1 to 200 characters after trimming).
pub fn validate_tenant_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("name"));
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates an ISO 4217 style currency code (`USD`, `EUR`).
pub fn validate_currency(code: &str) -> ValidationResult<()> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::invalid(
            "currency",
            "must be three uppercase letters",
        ));
    }
    Ok(())
}

// =============================================================================
// Tax Validators
// =============================================================================

/// Validates a percentage rate: 0 to 100 inclusive.
pub fn validate_tax_rate(field: &str, rate: TaxRate) -> ValidationResult<()> {
    let percent = rate.percent();
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

/// Validates a single tax rule.
///
/// ## Rules
/// - `id` and `name` must not be blank
/// - `rate` within 0–100
/// - `categories` rules list at least one category id
/// - `products` / `services` rules may list product ids, or none (then
///   they match by product type alone)
pub fn validate_tax_rule(rule: &TaxRule) -> ValidationResult<()> {
    if rule.id.trim().is_empty() {
        return Err(ValidationError::required("taxRules.id"));
    }

    if rule.name.trim().is_empty() {
        return Err(ValidationError::required("taxRules.name"));
    }

    validate_tax_rate("taxRules.rate", rule.rate)?;

    if rule.applies_to == AppliesTo::Categories && rule.category_ids.is_empty() {
        return Err(ValidationError::invalid(
            "taxRules.categoryIds",
            format!("rule '{}' applies to categories but lists none", rule.id),
        ));
    }

    Ok(())
}

// =============================================================================
// Hours Validators
// =============================================================================

/// Validates an `HH:MM` time between `00:00` and `24:00`.
pub fn validate_time_of_day(field: &str, raw: &str) -> ValidationResult<TimeOfDay> {
    TimeOfDay::parse(raw).ok_or_else(|| {
        ValidationError::invalid(field, format!("'{raw}' is not a time between 00:00 and 24:00"))
    })
}

/// Validates an IANA timezone name.
pub fn validate_timezone(name: &str) -> ValidationResult<()> {
    name.parse::<Tz>()
        .map(|_| ())
        .map_err(|_| ValidationError::invalid("timezone", format!("unknown timezone '{name}'")))
}

fn validate_day(day: &DaySchedule) -> ValidationResult<()> {
    let open = validate_time_of_day("openTime", &day.open_time)?;
    let close = validate_time_of_day("closeTime", &day.close_time)?;

    for window in &day.breaks {
        let start = validate_time_of_day("breaks.start", &window.start)?;
        let end = validate_time_of_day("breaks.end", &window.end)?;

        if start >= end {
            return Err(ValidationError::invalid(
                "breaks",
                format!("break {}-{} ends before it starts", window.start, window.end),
            ));
        }

        // Breaks only make sense inside a same-day window.
        if close > open && (start < open || end > close) {
            return Err(ValidationError::invalid(
                "breaks",
                format!("break {}-{} is outside opening hours", window.start, window.end),
            ));
        }
    }

    Ok(())
}

/// Validates a business-hours configuration.
pub fn validate_business_hours(hours: &BusinessHours) -> ValidationResult<()> {
    validate_timezone(&hours.timezone)?;

    for (_, day) in hours.schedule.days() {
        validate_day(day)?;
    }

    let mut seen = HashSet::new();
    for special in &hours.special_hours {
        let date = parse_day(&special.date).ok_or_else(|| {
            ValidationError::invalid(
                "specialHours.date",
                format!("'{}' is not a YYYY-MM-DD date", special.date),
            )
        })?;

        if !seen.insert(date) {
            return Err(ValidationError::Duplicate {
                field: "specialHours.date".to_string(),
                value: special.date.clone(),
            });
        }

        match (&special.open_time, &special.close_time) {
            (Some(open), Some(close)) => {
                validate_time_of_day("specialHours.openTime", open)?;
                validate_time_of_day("specialHours.closeTime", close)?;
            }
            (None, None) => {}
            _ => {
                return Err(ValidationError::invalid(
                    "specialHours",
                    format!("{} sets only one of openTime and closeTime", special.date),
                ))
            }
        }
    }

    Ok(())
}

// =============================================================================
// Holiday Validators
// =============================================================================

fn check_range(field: &str, value: Option<u32>, min: u32, max: u32) -> ValidationResult<u32> {
    let value = value.ok_or_else(|| ValidationError::required(field))?;
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: i64::from(min),
            max: i64::from(max),
        });
    }
    Ok(value)
}

/// Validates a holiday entry.
///
/// ## Required Fields
/// ```text
/// single            date (YYYY-MM-DD)
/// recurring yearly  month + dayOfMonth, or dayOfWeek
/// recurring monthly dayOfMonth (1-31)
/// recurring weekly  dayOfWeek  (0 = Sunday … 6)
/// ```
pub fn validate_holiday(holiday: &Holiday) -> ValidationResult<()> {
    if holiday.id.trim().is_empty() {
        return Err(ValidationError::required("holidays.id"));
    }

    if holiday.name.trim().is_empty() {
        return Err(ValidationError::required("holidays.name"));
    }

    match holiday.holiday_type {
        HolidayType::Single => {
            if holiday.single_date().is_none() {
                return Err(ValidationError::invalid(
                    "holidays.date",
                    format!("holiday '{}' needs a YYYY-MM-DD date", holiday.id),
                ));
            }
        }
        HolidayType::Recurring => {
            let recurrence = holiday
                .recurring
                .as_ref()
                .ok_or_else(|| ValidationError::required("holidays.recurring"))?;

            match recurrence.pattern {
                RecurrencePattern::Yearly => {
                    if recurrence.month.is_some() || recurrence.day_of_month.is_some() {
                        check_range("recurring.month", recurrence.month, 1, 12)?;
                        check_range("recurring.dayOfMonth", recurrence.day_of_month, 1, 31)?;
                    } else {
                        check_range("recurring.dayOfWeek", recurrence.day_of_week, 0, 6)?;
                    }
                }
                RecurrencePattern::Monthly => {
                    check_range("recurring.dayOfMonth", recurrence.day_of_month, 1, 31)?;
                }
                RecurrencePattern::Weekly => {
                    check_range("recurring.dayOfWeek", recurrence.day_of_week, 0, 6)?;
                }
            }
        }
    }

    Ok(())
}

// =============================================================================
// Document Validator
// =============================================================================

/// Validates a whole settings document before it is saved.
///
/// Rule and holiday ids must be unique within the document.
pub fn validate_settings(settings: &TenantSettings) -> ValidationResult<()> {
    validate_currency(&settings.currency)?;
    validate_tax_rate("defaultTaxRate", settings.default_tax_rate)?;

    let mut rule_ids = HashSet::new();
    for rule in &settings.tax_rules {
        validate_tax_rule(rule)?;
        if !rule_ids.insert(rule.id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "taxRules.id".to_string(),
                value: rule.id.clone(),
            });
        }
    }

    if let Some(hours) = &settings.business_hours {
        validate_business_hours(hours)?;
    }

    let mut holiday_ids = HashSet::new();
    for holiday in &settings.holidays {
        validate_holiday(holiday)?;
        if !holiday_ids.insert(holiday.id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "holidays.id".to_string(),
                value: holiday.id.clone(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
