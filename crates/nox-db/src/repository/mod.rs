//! # Repository Module
//!
//! Database repository implementations for Nox.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  SessionService                                                        │
//! │       │                                                                 │
//! │       │  db.sessions().load_with_orders(&id)                           │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  SessionRepository                                                     │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── load_with_orders(&self, id)                                       │
//! │  ├── transition(&self, id, from, to)   ← guarded CAS                   │
//! │  └── ...                                                               │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • SQL is isolated in one place                                        │
//! │  • State guards live next to the statements that enforce them          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`table::TableRepository`] - Venue table occupancy (compare-and-set)
//! - [`session::SessionRepository`] - Session lifecycle and snapshots
//! - [`order::OrderRepository`] - Orders, items, and the cancel cascade
//! - [`invoice::InvoiceRepository`] - Invoices and the number counter

pub mod invoice;
pub mod order;
pub mod session;
pub mod table;
