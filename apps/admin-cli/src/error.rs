//! # Admin Error Type
//!
//! Unified error type for `tally-admin` commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in tally-admin                            │
//! │                                                                         │
//! │  Command                   AdminService                                 │
//! │  ───────                   ────────────                                 │
//! │                                                                         │
//! │  tally-admin quote corner-bakery --items cart.json                      │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Result<T, AdminError>                                           │  │
//! │  │         │                                                        │  │
//! │  │  Unknown slug? ──── AdminError::TenantNotFound ────┐            │  │
//! │  │  Stale version? ─── DbError::VersionConflict ──────┤            │  │
//! │  │  Bad JSON? ──────── AdminError::Json ──────────────┤            │  │
//! │  │         │                                          ▼            │  │
//! │  │         ▼                                   ErrorReport ──────► stderr
//! │  │  Success ──────────────────────────────────────────────────────► stdout
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "code": "CONFLICT", "message": "Settings for tenant ... changed" }  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tally_core::CoreError;
use tally_db::DbError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by admin commands.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The slug does not name an active tenant.
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    /// A command argument could not be used.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for admin operations.
pub type AdminResult<T> = Result<T, AdminError>;

/// Machine-readable error codes.
///
/// ```json
/// { "code": "NOT_FOUND", "message": "Tenant not found: corner-bakery" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    /// Settings changed since they were read.
    Conflict,
    DatabaseError,
    ConfigError,
    InvalidInput,
    Internal,
}

impl ErrorCode {
    /// Process exit status for this code.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorCode::NotFound => 3,
            ErrorCode::ValidationError | ErrorCode::InvalidInput => 2,
            ErrorCode::Conflict => 4,
            ErrorCode::ConfigError => 78,
            ErrorCode::DatabaseError | ErrorCode::Internal => 1,
        }
    }
}

/// What a failed command prints.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
}

impl AdminError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        AdminError::InvalidInput(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AdminError::TenantNotFound(_) => ErrorCode::NotFound,
            AdminError::InvalidInput(_) | AdminError::Json(_) => ErrorCode::InvalidInput,
            AdminError::Config(_) => ErrorCode::ConfigError,
            AdminError::Io(_) => ErrorCode::Internal,
            AdminError::Core(CoreError::TenantNotFound(_)) => ErrorCode::NotFound,
            AdminError::Core(CoreError::InvalidTenantId(_)) => ErrorCode::InvalidInput,
            AdminError::Core(CoreError::Validation(_)) => ErrorCode::ValidationError,
            AdminError::Db(err) => match err {
                DbError::NotFound { .. } => ErrorCode::NotFound,
                DbError::UniqueViolation { .. }
                | DbError::ForeignKeyViolation { .. }
                | DbError::Validation(_) => ErrorCode::ValidationError,
                DbError::VersionConflict { .. } => ErrorCode::Conflict,
                DbError::Serialization(_) | DbError::Internal(_) => ErrorCode::Internal,
                DbError::ConnectionFailed(_)
                | DbError::MigrationFailed(_)
                | DbError::QueryFailed(_)
                | DbError::PoolExhausted => ErrorCode::DatabaseError,
            },
        }
    }

    /// The serializable form printed on failure.
    ///
    /// Query failures are logged in full and reported generically.
    pub fn report(&self) -> ErrorReport {
        let message = match self {
            AdminError::Db(DbError::QueryFailed(e)) | AdminError::Db(DbError::Internal(e)) => {
                tracing::error!("Database operation failed: {}", e);
                "Database operation failed".to_string()
            }
            other => other.to_string(),
        };

        ErrorReport {
            code: self.code(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{TenantId, ValidationError};

    #[test]
    fn test_codes() {
        assert_eq!(
            AdminError::TenantNotFound("nope".into()).code(),
            ErrorCode::NotFound
        );
        assert_eq!(
            AdminError::from(DbError::VersionConflict {
                tenant_id: TenantId::new(),
                expected: 1,
                actual: 2,
            })
            .code(),
            ErrorCode::Conflict
        );
        assert_eq!(
            AdminError::from(DbError::Validation(ValidationError::Required {
                field: "name".into()
            }))
            .code(),
            ErrorCode::ValidationError
        );
    }

    #[test]
    fn test_report_hides_query_details() {
        let report = AdminError::from(DbError::QueryFailed("near \"SELEC\": syntax".into())).report();
        assert_eq!(report.code, ErrorCode::DatabaseError);
        assert_eq!(report.message, "Database operation failed");

        let json = serde_json::to_value(
            AdminError::TenantNotFound("corner-bakery".into()).report(),
        )
        .unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Tenant not found: corner-bakery");
    }

    #[test]
    fn test_exit_codes_distinguish_conflict() {
        assert_ne!(
            ErrorCode::Conflict.exit_code(),
            ErrorCode::ValidationError.exit_code()
        );
        assert_eq!(ErrorCode::Internal.exit_code(), 1);
    }
}
