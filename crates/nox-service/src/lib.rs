//! # Nox Service
//!
//! Orchestration layer for the Nox table-session engine: one
//! [`SessionService`] method per operation a staff device performs,
//! from check-in to close.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          nox-service                                    │
//! │                                                                         │
//! │   staff device request                                                  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   SessionService ──── validate ────► nox-core  (pure rules + math)     │
//! │        │                                                                │
//! │        ├──── persist ──────────────► nox-db    (guarded SQL)           │
//! │        │                                                                │
//! │        ├──── invalidate ───────────► VenueCache                        │
//! │        │                                                                │
//! │        └──── publish ──────────────► ChangeFeed ──► display screens    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Billing always works from fresh database snapshots; the cache only
//! serves list-style reads.

pub mod cache;
pub mod error;
pub mod feed;
pub mod service;

pub use cache::VenueCache;
pub use error::{ServiceError, ServiceResult};
pub use feed::{ChangeFeed, SessionEvent, DEFAULT_FEED_CAPACITY};
pub use service::{
    BillingPolicy, CheckInRequest, GenerateInvoiceRequest, SessionService, SplitInvoiceRequest,
};
