//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Settings rejected at write time                │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Storage failures, version conflicts            │
//! │                                                                         │
//! │  tally-admin errors (app)                                              │
//! │  └── AdminError       - What the operator sees                         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → AdminError              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What Never Errors
//! The tax resolver and the business-hours evaluator do not return errors at
//! all. Incomplete configuration degrades to "no tax" and "always open" so a
//! storefront keeps selling. Errors only exist on the write path, where an
//! operator is present to fix the input.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Tenant slug or id did not resolve to an active tenant.
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    /// A tenant id string could not be parsed.
    #[error("Invalid tenant id: {0}")]
    InvalidTenantId(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Produced by [`crate::validation`] when tenant settings are saved.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid time, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., two tax rules sharing an id).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    pub(crate) fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::TenantNotFound("corner-bakery".to_string());
        assert_eq!(err.to_string(), "Tenant not found: corner-bakery");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("taxRules[0].name");
        assert_eq!(err.to_string(), "taxRules[0].name is required");

        let err = ValidationError::OutOfRange {
            field: "defaultTaxRate".to_string(),
            min: 0,
            max: 100,
        };
        assert_eq!(err.to_string(), "defaultTaxRate must be between 0 and 100");

        let err = ValidationError::invalid("openTime", "expected HH:MM");
        assert_eq!(err.to_string(), "openTime has invalid format: expected HH:MM");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::required("slug");
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
