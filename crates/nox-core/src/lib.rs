//! # nox-core: Pure Business Logic for Nox
//!
//! This crate is the **heart** of Nox, a table-session order and billing
//! engine for nightlife venues. It contains all business logic as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Nox Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    nox-service (Orchestration)                  │   │
//! │  │   check-in ──► orders ──► invoices ──► payments ──► close      │   │
//! │  │   venue cache • change feed • session service                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ nox-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  billing  │  │  display  │  │   │
//! │  │   │  Session  │  │   Money   │  │  totals   │  │  kitchen/ │  │   │
//! │  │   │  Invoice  │  │   Rate    │  │  splits   │  │  bar view │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    nox-db (Database Layer)                      │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (VenueTable, TableSession, SessionInvoice, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`billing`] - Invoice totals and split-share computation
//! - [`display`] - Kitchen/bar destination projections
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in minor units (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use nox_core::money::{Money, Rate};
//!
//! // Create money from minor units (never from floats!)
//! let subtotal = Money::from_minor(215_000);
//!
//! // Apply a tax rate with half-up rounding
//! let tax_rate = Rate::from_percent(10);
//! let tax = subtotal.apply_rate(tax_rate);
//! assert_eq!(tax.minor(), 21_500);
//!
//! // Split a bill three ways; the last share absorbs the remainder
//! let shares = subtotal.split_even(3);
//! assert_eq!(shares.iter().map(|m| m.minor()).sum::<i64>(), 215_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod display;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use nox_core::Money` instead of
// `use nox_core::money::Money`

pub use billing::{InvoiceTotals, SplitShare};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Rate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum items allowed in a single order submission
///
/// ## Business Reason
/// Prevents runaway orders and ensures reasonable ticket sizes on the
/// kitchen and bar displays. Can be made configurable per-venue later.
pub const MAX_ORDER_ITEMS: usize = 100;

/// Maximum quantity of a single item in an order
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum party size a session can record at check-in
pub const MAX_GUEST_COUNT: i64 = 500;

/// Maximum number of ways a bill can be split
///
/// ## Business Reason
/// Splits beyond 20 produce shares too small to be meaningful and
/// flood the invoice list; large parties settle with one invoice and
/// sort it out themselves.
pub const MAX_SPLIT_COUNT: i64 = 20;
