//! # Change Feed
//!
//! In-process broadcast of session mutations.
//!
//! ## Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Change Feed                                     │
//! │                                                                         │
//! │  SessionService mutation                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  feed.publish(SessionEvent::OrderSubmitted { .. })                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tokio::sync::broadcast ──┬──► floor overview subscriber               │
//! │                           ├──► kitchen display subscriber              │
//! │                           └──► bar display subscriber                  │
//! │                                                                         │
//! │  The send result is deliberately ignored: with no subscribers the      │
//! │  channel returns an error, and a slow subscriber lags and drops        │
//! │  old events. Neither may ever block or fail a mutation.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Subscribers treat every event as "something changed, re-read": the
//! event carries identifiers, never payloads, so a dropped event costs a
//! refresh, not correctness.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use ts_rs::TS;

use nox_core::SessionStatus;

/// Default capacity of the broadcast channel.
///
/// A lagging subscriber loses the oldest events past this depth; since
/// events are invalidation hints, that only costs it a full refresh.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

/// A session mutation notification.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionOpened {
        venue_id: String,
        session_id: String,
    },
    OrderSubmitted {
        venue_id: String,
        session_id: String,
        order_id: String,
    },
    ItemStatusChanged {
        venue_id: String,
        session_id: String,
        item_id: String,
    },
    OrderCancelled {
        venue_id: String,
        session_id: String,
        order_id: String,
    },
    InvoicesGenerated {
        venue_id: String,
        session_id: String,
        invoice_ids: Vec<String>,
    },
    InvoiceAmended {
        venue_id: String,
        session_id: String,
        invoice_id: String,
    },
    PaymentRecorded {
        venue_id: String,
        session_id: String,
        invoice_id: String,
    },
    InvoiceVoided {
        venue_id: String,
        session_id: String,
        invoice_id: String,
    },
    SessionFinished {
        venue_id: String,
        session_id: String,
        status: SessionStatus,
    },
}

impl SessionEvent {
    /// The venue this event belongs to. Subscribers filter on it.
    pub fn venue_id(&self) -> &str {
        match self {
            SessionEvent::SessionOpened { venue_id, .. }
            | SessionEvent::OrderSubmitted { venue_id, .. }
            | SessionEvent::ItemStatusChanged { venue_id, .. }
            | SessionEvent::OrderCancelled { venue_id, .. }
            | SessionEvent::InvoicesGenerated { venue_id, .. }
            | SessionEvent::InvoiceAmended { venue_id, .. }
            | SessionEvent::PaymentRecorded { venue_id, .. }
            | SessionEvent::InvoiceVoided { venue_id, .. }
            | SessionEvent::SessionFinished { venue_id, .. } => venue_id,
        }
    }
}

/// Broadcast handle for session events.
///
/// Cheap to clone; all clones publish into the same channel.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<SessionEvent>,
}

impl ChangeFeed {
    /// Creates a feed with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        ChangeFeed { tx }
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Publishes an event to all subscribers.
    ///
    /// Never fails: a send error just means nobody is listening.
    pub fn publish(&self, event: SessionEvent) {
        debug!(venue_id = %event.venue_id(), event = ?event, "Publishing session event");
        let _ = self.tx.send(event);
    }

    /// Number of live subscribers (diagnostics).
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        ChangeFeed::new(DEFAULT_FEED_CAPACITY)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
