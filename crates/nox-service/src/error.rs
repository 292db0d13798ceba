//! # Service Error Types
//!
//! The error taxonomy API callers see.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  CoreError (nox-core)        DbError (nox-db)                          │
//! │       │                           │                                     │
//! │       │  From<CoreError>          │  From<DbError>                      │
//! │       │  variant-for-variant      │  NotFound → NotFound                │
//! │       │                           │  everything else → Storage          │
//! │       ▼                           ▼                                     │
//! │  ServiceError (this module)                                            │
//! │                                                                         │
//! │  Conflict (a lost CAS guard) is NOT mapped blindly: the service        │
//! │  methods translate it in context: a lost table occupy is              │
//! │  TableUnavailable, a lost status transition is InvalidState.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use nox_core::{CoreError, ValidationError};
use nox_db::DbError;

/// Errors surfaced by [`crate::SessionService`] operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The table is occupied, reserved, or under maintenance.
    #[error("Table {table_id} is not available")]
    TableUnavailable { table_id: String },

    /// The entity's current state forbids the operation.
    #[error("{entity} {id} is {status}, cannot {operation}")]
    InvalidState {
        entity: &'static str,
        id: String,
        status: String,
        operation: &'static str,
    },

    /// Invoice generation with nothing billable.
    #[error("Session {session_id} has no billable items")]
    EmptyOrder { session_id: String },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Some of N split invoices were created before a failure.
    ///
    /// The invoices in `created` are real and remain visible; the
    /// session stays in `billing` for manual reconciliation.
    #[error("{} of {expected} split invoices created before failure: {detail}", created.len())]
    PartialSplitFailure {
        created: Vec<String>,
        expected: u32,
        detail: String,
    },

    /// Caller input failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The persistence layer failed in a way the caller cannot fix.
    #[error("Storage error: {0}")]
    Storage(DbError),
}

impl ServiceError {
    /// Creates an InvalidState error with the usual context fields.
    pub fn invalid_state(
        entity: &'static str,
        id: impl Into<String>,
        status: impl std::fmt::Debug,
        operation: &'static str,
    ) -> Self {
        ServiceError::InvalidState {
            entity,
            id: id.into(),
            status: format!("{:?}", status).to_lowercase(),
            operation,
        }
    }

    /// Creates a NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::TableUnavailable { table_id } => {
                ServiceError::TableUnavailable { table_id }
            }
            CoreError::InvalidState {
                entity,
                id,
                status,
                operation,
            } => ServiceError::InvalidState {
                entity,
                id,
                status,
                operation,
            },
            CoreError::EmptyOrder { session_id } => ServiceError::EmptyOrder { session_id },
            CoreError::NotFound { entity, id } => ServiceError::NotFound {
                entity: entity.to_string(),
                id,
            },
            CoreError::PartialSplitFailure {
                created,
                expected,
                detail,
            } => ServiceError::PartialSplitFailure {
                created,
                expected,
                detail,
            },
            CoreError::Validation(v) => ServiceError::Validation(v),
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            // A NotFound from the db layer carries its own entity label
            DbError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            other => ServiceError::Storage(other),
        }
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_maps_variant_for_variant() {
        let err: ServiceError = CoreError::EmptyOrder {
            session_id: "s-1".to_string(),
        }
        .into();
        assert!(matches!(err, ServiceError::EmptyOrder { .. }));
    }

    #[test]
    fn test_db_not_found_maps_to_not_found() {
        let err: ServiceError = DbError::not_found("Invoice", "inv-1").into();
        assert!(matches!(err, ServiceError::NotFound { .. }));
        assert_eq!(err.to_string(), "Invoice not found: inv-1");
    }

    #[test]
    fn test_db_other_maps_to_storage() {
        let err: ServiceError = DbError::PoolExhausted.into();
        assert!(matches!(err, ServiceError::Storage(_)));
    }
}
