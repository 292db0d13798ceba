//! # Error Types
//!
//! Domain-specific error types for nox-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  nox-core errors (this file)                                           │
//! │  ├── CoreError        - Billing/state-machine rule violations          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  nox-db errors (separate crate)                                        │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  nox-service errors (separate crate)                                   │
//! │  └── ServiceError     - What API callers see                           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → Caller             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (session id, table id, etc.)
//! 3. Errors are enum variants, never String
//! 4. Every error here is recoverable at the call site; none is fatal

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations in the session and
/// billing state machines. The caller decides whether to retry, abort,
/// or surface them to staff.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A check-in race was lost, or the table is not `available`.
    ///
    /// ## When This Occurs
    /// - Two devices check in to the same table; one loses the
    ///   compare-and-set on the occupancy flag
    /// - The table is reserved or under maintenance
    #[error("Table {table_id} is not available")]
    TableUnavailable { table_id: String },

    /// An operation was attempted against an entity in a state that
    /// forbids it.
    ///
    /// ## When This Occurs
    /// - Adding an order to a `billing` session
    /// - Cancelling a `served` item
    /// - Closing an already-closed session
    #[error("{entity} {id} is {status}, cannot {operation}")]
    InvalidState {
        entity: &'static str,
        id: String,
        status: String,
        operation: &'static str,
    },

    /// Invoice generation attempted with zero billable subtotal.
    ///
    /// Happens when every order in the session was cancelled, or the
    /// session never ordered anything.
    #[error("Session {session_id} has no billable items")]
    EmptyOrder { session_id: String },

    /// A referenced session/order/item/invoice does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// One or more of N split-invoice inserts failed after others
    /// succeeded.
    ///
    /// The invoices in `created` are real obligations and remain
    /// visible; the session stays in `billing`. Staff reconcile the
    /// remainder manually.
    #[error("{} of {expected} split invoices created before failure: {detail}", created.len())]
    PartialSplitFailure {
        created: Vec<String>,
        expected: u32,
        detail: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidState error with the usual context fields.
    pub fn invalid_state(
        entity: &'static str,
        id: impl Into<String>,
        status: impl std::fmt::Debug,
        operation: &'static str,
    ) -> Self {
        CoreError::InvalidState {
            entity,
            id: id.into(),
            status: format!("{:?}", status).to_lowercase(),
            operation,
        }
    }

    /// Creates a NotFound error.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
