//! # nox-db: Database Layer for Nox
//!
//! This crate provides database access for the Nox billing engine.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Nox Data Flow                                  │
//! │                                                                         │
//! │  SessionService (check_in, submit_order, generate_invoice, ...)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      nox-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (table.rs,    │    │  (embedded)  │  │   │
//! │  │   │               │    │  session.rs,  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│  order.rs,    │    │ 001_init.sql │  │   │
//! │  │   │ Connection    │    │  invoice.rs)  │    │ ...          │  │   │
//! │  │   │ Management    │    │               │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │              ./data/nox.db  (WAL mode, FK on)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (table, session, order, invoice)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nox_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/nox.db")).await?;
//!
//! db.tables().occupy(&table_id).await?;
//! let snapshot = db.sessions().load_with_orders(&session_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::invoice::{format_invoice_number, InvoiceRepository};
pub use repository::order::OrderRepository;
pub use repository::session::SessionRepository;
pub use repository::table::TableRepository;
