//! # Domain Types
//!
//! Core domain types for the table-session billing engine.
//!
//! ## Entity Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Entities                                 │
//! │                                                                         │
//! │  ┌──────────────┐      ┌────────────────┐      ┌──────────────────┐    │
//! │  │  VenueTable  │◄─────│  TableSession  │─────►│  SessionInvoice  │    │
//! │  │  ──────────  │ 0..1 │  ────────────  │ 0..N │  ──────────────  │    │
//! │  │  status      │      │  status        │      │  invoice_number  │    │
//! │  │  seat_count  │      │  guest_count   │      │  totals          │    │
//! │  └──────────────┘      └───────┬────────┘      └──────────────────┘    │
//! │                                │ 0..N                                   │
//! │                        ┌───────▼────────┐      ┌──────────────────┐    │
//! │                        │  SessionOrder  │─────►│ SessionOrderItem │    │
//! │                        │  ────────────  │ 1..N │  ──────────────  │    │
//! │                        │  order_number  │      │  destination     │    │
//! │                        │  status        │      │  name/price snap │    │
//! │                        └────────────────┘      └──────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (order_number, invoice_number, table_number) - human-readable
//!
//! ## State Machines
//! The status enums carry their own transition rules as pure methods
//! (`can_transition_to`). The persistence layer enforces the same rules a
//! second time with guarded conditional updates, so a race between two
//! staff devices can never skip a state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Table Status
// =============================================================================

/// Availability of a physical table.
///
/// Owned by the venue catalog; the billing engine only flips
/// `Available ↔ Occupied` at session open/close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    /// Free to seat guests.
    Available,
    /// Has a live session.
    Occupied,
    /// Held for an upcoming booking.
    Reserved,
    /// Out of service.
    Maintenance,
}

// =============================================================================
// Session Status
// =============================================================================

/// Lifecycle of a table session (the aggregate root).
///
/// ```text
/// open ──► billing ──► paid ──► closed
///   │         │
///   └────┬────┘
///        ▼
///    cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Guests seated, orders may be added.
    Open,
    /// Bill requested, invoices exist, no new orders.
    Billing,
    /// All non-void invoices settled.
    Paid,
    /// Session finished normally. Terminal.
    Closed,
    /// Session ended without payment. Terminal.
    Cancelled,
}

impl SessionStatus {
    /// Checks whether the session can never change state again.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Closed | SessionStatus::Cancelled)
    }

    /// Checks whether new orders/items may be added.
    ///
    /// Only `Open` qualifies: once a bill is requested the tab is frozen.
    /// Reopening is not supported; staff start a new session instead.
    pub const fn allows_new_orders(&self) -> bool {
        matches!(self, SessionStatus::Open)
    }

    /// Checks whether the session still holds its table.
    pub const fn holds_table(&self) -> bool {
        matches!(
            self,
            SessionStatus::Open | SessionStatus::Billing | SessionStatus::Paid
        )
    }

    /// Checks whether a transition to `to` is legal.
    pub fn can_transition_to(&self, to: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, to),
            (Open, Billing) | (Open, Cancelled) | (Billing, Paid) | (Billing, Cancelled) | (Paid, Closed)
        )
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle of a kitchen/bar ticket.
///
/// Forward-only chain with a cancel escape hatch from any non-terminal
/// state. Orders are created directly in `Confirmed`; kitchen/bar
/// acknowledgement advances them from there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Served,
    Cancelled,
}

impl OrderStatus {
    /// Checks whether the order can never change state again.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Served | OrderStatus::Cancelled)
    }

    /// Checks whether the order counts towards billing.
    pub const fn is_billable(&self) -> bool {
        !matches!(self, OrderStatus::Cancelled)
    }

    /// Checks whether a transition to `to` is legal.
    ///
    /// One forward step at a time; `Cancelled` is reachable from any
    /// non-terminal state.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, to) {
            (_, Cancelled) => !self.is_terminal(),
            (Pending, Confirmed) => true,
            (Confirmed, Preparing) => true,
            (Preparing, Ready) => true,
            (Ready, Served) => true,
            _ => false,
        }
    }
}

// =============================================================================
// Item Status
// =============================================================================

/// Lifecycle of a single line item.
///
/// ```text
/// pending ──► preparing ──► ready ──► served
///    │            │
///    └─────┬──────┘
///          ▼
///      cancelled
/// ```
///
/// Direct cancellation is allowed only from `Pending` or `Preparing`.
/// An order-level cancellation additionally cancels `Ready` items; a
/// `Served` item is never cancelled, and staff handle it with a
/// post-hoc discount on the invoice instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Preparing,
    Ready,
    Served,
    Cancelled,
}

impl ItemStatus {
    /// Checks whether the item can never change state again.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Served | ItemStatus::Cancelled)
    }

    /// Checks whether the item counts towards billing.
    pub const fn is_billable(&self) -> bool {
        !matches!(self, ItemStatus::Cancelled)
    }

    /// Checks whether the item still needs production work.
    ///
    /// Used by the destination display: served and cancelled items drop
    /// off the kitchen/bar screens.
    pub const fn needs_production(&self) -> bool {
        !matches!(self, ItemStatus::Served | ItemStatus::Cancelled)
    }

    /// Checks whether a transition to `to` is legal.
    ///
    /// Forward-only, one step at a time. `Cancelled` only from
    /// `Pending` or `Preparing`.
    pub fn can_transition_to(&self, to: ItemStatus) -> bool {
        use ItemStatus::*;
        match (self, to) {
            (Pending, Preparing) => true,
            (Preparing, Ready) => true,
            (Ready, Served) => true,
            (Pending, Cancelled) | (Preparing, Cancelled) => true,
            _ => false,
        }
    }
}

// =============================================================================
// Destination
// =============================================================================

/// The production station an item is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Kitchen,
    Bar,
    Other,
}

// =============================================================================
// Invoice Status
// =============================================================================

/// Lifecycle of a billing document.
///
/// The payment settlement collaborator is the sole writer of
/// `amount_paid` and the `Paid` flip; the engine itself only creates
/// invoices (`Pending`), applies discounts, and voids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    PartiallyPaid,
    Paid,
    Void,
}

impl InvoiceStatus {
    /// Checks whether the invoice counts for the session.
    pub const fn is_active(&self) -> bool {
        !matches!(self, InvoiceStatus::Void)
    }

    /// Checks whether the invoice can still be amended (discounts).
    pub const fn is_amendable(&self) -> bool {
        matches!(self, InvoiceStatus::Draft | InvoiceStatus::Pending)
    }
}

// =============================================================================
// Venue Table
// =============================================================================

/// A physical seating unit in the venue.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct VenueTable {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Venue this table belongs to.
    pub venue_id: String,

    /// Human-readable table number shown to staff.
    pub table_number: i64,

    /// How many guests the table seats.
    pub seat_count: i64,

    /// Floor zone (e.g. "terrace", "vip").
    pub zone: Option<String>,

    /// Current availability.
    pub status: TableStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Table Session
// =============================================================================

/// One open tab for a table or walk-in, from check-in to close.
///
/// The aggregate root of the billing engine. A table may have at most
/// one session in `{open, billing}` at a time; the table-occupancy
/// compare-and-set in the persistence layer enforces that.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TableSession {
    pub id: String,
    pub venue_id: String,
    /// None ⇒ walk-in; the session never touched a table.
    pub table_id: Option<String>,
    /// Originating booking or package purchase, if any.
    pub booking_id: Option<String>,
    pub status: SessionStatus,
    pub guest_count: i64,
    /// Denormalized snapshot from the guest directory, not a live ref.
    pub guest_name: Option<String>,
    pub notes: Option<String>,
    /// Staff identity that opened the session.
    pub opened_by: String,
    pub closed_by: Option<String>,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl TableSession {
    /// Checks whether this session is a walk-in (no table assigned).
    #[inline]
    pub fn is_walk_in(&self) -> bool {
        self.table_id.is_none()
    }
}

// =============================================================================
// Session Order
// =============================================================================

/// One ticket submitted to production within a session.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SessionOrder {
    pub id: String,
    pub session_id: String,
    /// Strictly increasing within the session, never reused.
    pub order_number: i64,
    pub status: OrderStatus,
    pub notes: Option<String>,
    #[ts(as = "Option<String>")]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Session Order Item
// =============================================================================

/// A line entry within an order.
///
/// Uses the snapshot pattern: `name` and `unit_price_minor` are frozen
/// at order time, so menu price changes never retroactively change
/// billed amounts.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SessionOrderItem {
    pub id: String,
    pub order_id: String,
    /// Optional reference back to the menu catalog.
    pub menu_item_id: Option<String>,
    /// Name at time of order (frozen).
    pub name: String,
    /// Quantity ordered (> 0).
    pub quantity: i64,
    /// Unit price in minor units at time of order (frozen).
    pub unit_price_minor: i64,
    /// Modifier key→value mapping, stored as a JSON object.
    pub modifiers: Option<String>,
    pub notes: Option<String>,
    /// Production station this item is routed to.
    pub destination: Destination,
    pub status: ItemStatus,
    #[ts(as = "Option<String>")]
    pub served_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SessionOrderItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_minor(self.unit_price_minor)
    }

    /// Returns the line value (quantity × unit price).
    #[inline]
    pub fn line_value(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }

    /// Parses the modifiers JSON into a key→value map.
    ///
    /// Malformed or absent JSON yields an empty map; modifiers are
    /// presentation data and must never fail billing.
    pub fn modifiers_map(&self) -> std::collections::BTreeMap<String, String> {
        self.modifiers
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}

/// Input for one line of a new order, before IDs and timestamps exist.
///
/// The caller (floor tablet) supplies the menu snapshot; the engine
/// validates and persists it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    pub menu_item_id: Option<String>,
    pub name: String,
    pub quantity: i64,
    pub unit_price_minor: i64,
    /// JSON object of modifier key→value, if any.
    pub modifiers: Option<String>,
    pub notes: Option<String>,
    pub destination: Destination,
}

// =============================================================================
// Session Invoice
// =============================================================================

/// A billing document derived from a session snapshot at generation
/// time. Never mutated by later order/item changes.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SessionInvoice {
    pub id: String,
    pub session_id: String,
    /// Human invoice number, suffixed `-k/N` for split k of N.
    pub invoice_number: String,
    pub subtotal_minor: i64,
    pub tax_minor: i64,
    pub service_charge_minor: i64,
    pub discount_minor: i64,
    pub discount_reason: Option<String>,
    /// Deposit credit applied. Always 0 on split invoices.
    pub deposit_credit_minor: i64,
    pub tip_minor: i64,
    pub total_minor: i64,
    /// Written only by the payment settlement collaborator.
    pub amount_paid_minor: i64,
    pub status: InvoiceStatus,
    /// Split-specific guest identity snapshot.
    pub guest_name: Option<String>,
    pub guest_phone: Option<String>,
    pub guest_email: Option<String>,
    pub guest_user_id: Option<String>,
    #[ts(as = "String")]
    pub generated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub voided_at: Option<DateTime<Utc>>,
    pub void_reason: Option<String>,
}

impl SessionInvoice {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_minor(self.subtotal_minor)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_minor(self.total_minor)
    }

    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_minor(self.amount_paid_minor)
    }

    /// Checks whether this invoice is part of a split set.
    #[inline]
    pub fn is_split(&self) -> bool {
        self.invoice_number.contains('/')
    }

    /// Checks the reconciliation invariant for non-split invoices:
    /// `total = subtotal + tax + service − discount − deposit + tip`.
    ///
    /// Split invoices are exempt: each component is an independently
    /// rounded share of the undivided quantity.
    pub fn reconciles(&self) -> bool {
        self.is_split()
            || self.total_minor
                == self.subtotal_minor + self.tax_minor + self.service_charge_minor
                    - self.discount_minor
                    - self.deposit_credit_minor
                    + self.tip_minor
    }
}

// =============================================================================
// Guest Identity
// =============================================================================

/// A denormalized guest identity snapshot attached to a split invoice.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GuestInfo {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub user_id: Option<String>,
}

// =============================================================================
// Read Models
// =============================================================================

/// An order joined with its items.
///
/// Constructed by explicit joins in the persistence layer; never a
/// bag of optional fields.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderWithItems {
    pub order: SessionOrder,
    pub items: Vec<SessionOrderItem>,
}

impl OrderWithItems {
    /// Sums the billable line values of this order.
    ///
    /// Cancelled orders contribute nothing; within a billable order,
    /// cancelled items are excluded.
    pub fn billable_value(&self) -> Money {
        if !self.order.status.is_billable() {
            return Money::zero();
        }
        self.items
            .iter()
            .filter(|item| item.status.is_billable())
            .fold(Money::zero(), |acc, item| acc + item.line_value())
    }
}

/// A session joined with its table and orders.
///
/// This is the authoritative snapshot the invoice generator reads:
/// always fetched fresh at call time, never from a cached aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionWithOrders {
    pub session: TableSession,
    pub table: Option<VenueTable>,
    pub orders: Vec<OrderWithItems>,
}

impl SessionWithOrders {
    /// Computes the billable subtotal across all orders.
    pub fn subtotal(&self) -> Money {
        self.orders
            .iter()
            .fold(Money::zero(), |acc, order| acc + order.billable_value())
    }

    /// Returns the table number for staff displays, if seated.
    pub fn table_number(&self) -> Option<i64> {
        self.table.as_ref().map(|t| t.table_number)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
