//! # Session Service
//!
//! The orchestration layer: one method per operation a staff device can
//! perform, from check-in to close.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Every mutation follows the same shape                   │
//! │                                                                         │
//! │  1. Validate input             (nox-core::validation)                  │
//! │  2. Load + check state         (fresh read, pure state-machine rules)  │
//! │  3. Mutate through repository  (guarded CAS backstops the rules)       │
//! │  4. Re-read authoritative row  (never echo the caller's input back)    │
//! │  5. Invalidate the venue cache                                         │
//! │  6. Publish a feed event                                               │
//! │                                                                         │
//! │  Lost CAS guards are translated in context: a lost table occupy is     │
//! │  TableUnavailable, a lost status transition is InvalidState.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Billing reads are always fresh database snapshots; the venue cache
//! only ever serves the list-style read endpoints.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use nox_core::billing::{self, InvoiceTotals, SplitShare};
use nox_core::display::{project_destination, DestinationProjection};
use nox_core::validation;
use nox_core::{
    Destination, GuestInfo, InvoiceStatus, ItemStatus, Money, NewOrderItem, OrderStatus, Rate,
    SessionInvoice, SessionOrder, SessionOrderItem, SessionStatus, SessionWithOrders, TableSession,
};
use nox_db::{format_invoice_number, Database, DbError};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cache::VenueCache;
use crate::error::{ServiceError, ServiceResult};
use crate::feed::{ChangeFeed, SessionEvent};

// =============================================================================
// Billing Policy
// =============================================================================

/// Venue billing rates, injected at service construction.
///
/// Rates come from venue settings upstream; the engine treats them as
/// read-only policy.
#[derive(Debug, Clone, Copy)]
pub struct BillingPolicy {
    pub tax_rate: Rate,
    pub service_rate: Rate,
}

impl BillingPolicy {
    pub fn new(tax_rate: Rate, service_rate: Rate) -> Self {
        BillingPolicy {
            tax_rate,
            service_rate,
        }
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// Input for opening a session.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub venue_id: String,
    /// None ⇒ walk-in (no table held).
    pub table_id: Option<String>,
    pub booking_id: Option<String>,
    pub guest_count: i64,
    /// Denormalized from the guest directory collaborator.
    pub guest_name: Option<String>,
    pub notes: Option<String>,
    pub opened_by: String,
}

/// Input for generating a single (non-split) invoice.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GenerateInvoiceRequest {
    pub session_id: String,
    pub discount_minor: i64,
    pub discount_reason: Option<String>,
    /// Credit from a booking deposit, supplied by the booking collaborator.
    pub deposit_credit_minor: i64,
}

/// Input for generating an N-way split set.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SplitInvoiceRequest {
    pub session_id: String,
    pub split_count: u32,
    pub discount_minor: i64,
    pub tip_minor: i64,
    /// Per-split guest identity snapshots, positional; missing entries
    /// produce anonymous splits.
    pub guests: Vec<GuestInfo>,
}

// =============================================================================
// Session Service
// =============================================================================

/// The billing engine's public surface.
///
/// Cheap to clone: database pool, cache, and feed are all shared
/// handles.
#[derive(Debug, Clone)]
pub struct SessionService {
    db: Database,
    cache: VenueCache,
    feed: ChangeFeed,
    policy: BillingPolicy,
}

impl SessionService {
    /// Creates a service over an existing database handle.
    pub fn new(db: Database, policy: BillingPolicy) -> Self {
        SessionService {
            db,
            cache: VenueCache::new(),
            feed: ChangeFeed::default(),
            policy,
        }
    }

    /// The underlying database handle (seeding, diagnostics).
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// The change feed, for subscribing display surfaces.
    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    // =========================================================================
    // Check-in
    // =========================================================================

    /// Opens a session, seating guests at a table or as a walk-in.
    ///
    /// Table check-in flips the occupancy flag with a compare-and-set;
    /// exactly one of two racing check-ins wins, the other gets
    /// `TableUnavailable`.
    pub async fn check_in(&self, req: CheckInRequest) -> ServiceResult<TableSession> {
        validation::validate_guest_count(req.guest_count)?;

        if let Some(table_id) = &req.table_id {
            match self.db.tables().occupy(table_id).await {
                Ok(()) => {}
                Err(DbError::Conflict { .. }) => {
                    // Guard miss: either the table is genuinely taken or
                    // the id is bogus. One fetch tells them apart.
                    return match self.db.tables().get_by_id(table_id).await? {
                        Some(_) => Err(ServiceError::TableUnavailable {
                            table_id: table_id.clone(),
                        }),
                        None => Err(ServiceError::not_found("Table", table_id.clone())),
                    };
                }
                Err(other) => return Err(other.into()),
            }
        }

        let session = TableSession {
            id: Uuid::new_v4().to_string(),
            venue_id: req.venue_id.clone(),
            table_id: req.table_id.clone(),
            booking_id: req.booking_id,
            status: SessionStatus::Open,
            guest_count: req.guest_count,
            guest_name: req.guest_name,
            notes: req.notes,
            opened_by: req.opened_by,
            closed_by: None,
            opened_at: Utc::now(),
            closed_at: None,
        };

        if let Err(err) = self.db.sessions().insert(&session).await {
            // Undo the occupancy flip so the table isn't stranded
            if let Some(table_id) = &req.table_id {
                if let Err(release_err) = self.db.tables().release(table_id).await {
                    warn!(table_id = %table_id, error = %release_err, "Failed to release table after check-in failure");
                }
            }
            return Err(err.into());
        }

        info!(
            session_id = %session.id,
            table_id = ?session.table_id,
            guest_count = session.guest_count,
            "Session opened"
        );

        self.cache.invalidate(&req.venue_id);
        self.feed.publish(SessionEvent::SessionOpened {
            venue_id: req.venue_id,
            session_id: session.id.clone(),
        });

        Ok(session)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Submits an order to an open session.
    ///
    /// The order is created `confirmed` (submission IS confirmation)
    /// with its items `pending`; name and price snapshots are persisted
    /// verbatim so later menu edits never move billed amounts.
    pub async fn submit_order(
        &self,
        session_id: &str,
        notes: Option<String>,
        items: Vec<NewOrderItem>,
    ) -> ServiceResult<(SessionOrder, Vec<SessionOrderItem>)> {
        validation::validate_order_size(items.len())?;
        for item in &items {
            validation::validate_item_name(&item.name)?;
            validation::validate_quantity(item.quantity)?;
            validation::validate_price_minor(item.unit_price_minor)?;
        }

        let session = self
            .db
            .sessions()
            .get_by_id(session_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Session", session_id))?;

        if !session.status.allows_new_orders() {
            return Err(ServiceError::invalid_state(
                "Session",
                session_id,
                session.status,
                "add an order",
            ));
        }

        let created = self.db.orders().create_order(session_id, notes, items).await?;

        debug!(
            session_id = %session_id,
            order_number = created.order.order_number,
            "Order submitted"
        );

        self.cache.invalidate(&session.venue_id);
        self.feed.publish(SessionEvent::OrderSubmitted {
            venue_id: session.venue_id,
            session_id: session_id.to_string(),
            order_id: created.order.id.clone(),
        });

        Ok((created.order, created.items))
    }

    /// Advances (or cancels) a single item.
    ///
    /// Forward-only, one step at a time; cancel only while the item is
    /// still `pending`/`preparing`. `served_at` is stamped on serve.
    pub async fn update_item_status(
        &self,
        item_id: &str,
        to: ItemStatus,
    ) -> ServiceResult<SessionOrderItem> {
        let item = self
            .db
            .orders()
            .get_item(item_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Item", item_id))?;

        if !item.status.can_transition_to(to) {
            return Err(ServiceError::invalid_state(
                "Item",
                item_id,
                item.status,
                "advance status",
            ));
        }

        match self.db.orders().transition_item(item_id, item.status, to).await {
            Ok(()) => {}
            Err(DbError::Conflict { .. }) => {
                // Someone else moved it between our read and our write
                return Err(ServiceError::invalid_state(
                    "Item",
                    item_id,
                    item.status,
                    "advance status",
                ));
            }
            Err(other) => return Err(other.into()),
        }

        let fresh = self
            .db
            .orders()
            .get_item(item_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Item", item_id))?;

        let (venue_id, session_id) = self.venue_of_order(&fresh.order_id).await?;
        self.cache.invalidate(&venue_id);
        self.feed.publish(SessionEvent::ItemStatusChanged {
            venue_id,
            session_id,
            item_id: item_id.to_string(),
        });

        Ok(fresh)
    }

    /// Cancels an order, cascading to every non-served item.
    ///
    /// Items already `ready` are cancelled along with the rest; only
    /// served items keep their status, and whether those are billed is
    /// then a post-hoc discount decision on the invoice.
    pub async fn cancel_order(
        &self,
        order_id: &str,
    ) -> ServiceResult<(SessionOrder, Vec<SessionOrderItem>)> {
        let order = self
            .db
            .orders()
            .get_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", order_id))?;

        if !order.status.can_transition_to(OrderStatus::Cancelled) {
            return Err(ServiceError::invalid_state(
                "Order",
                order_id,
                order.status,
                "cancel",
            ));
        }

        match self.db.orders().cancel_order(order_id).await {
            Ok(()) => {}
            Err(DbError::Conflict { .. }) => {
                return Err(ServiceError::invalid_state(
                    "Order",
                    order_id,
                    order.status,
                    "cancel",
                ));
            }
            Err(other) => return Err(other.into()),
        }

        let fresh = self
            .db
            .orders()
            .get_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", order_id))?;
        let items = self.db.orders().list_items(order_id).await?;

        let session = self
            .db
            .sessions()
            .get_by_id(&fresh.session_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Session", fresh.session_id.clone()))?;

        self.cache.invalidate(&session.venue_id);
        self.feed.publish(SessionEvent::OrderCancelled {
            venue_id: session.venue_id,
            session_id: fresh.session_id.clone(),
            order_id: order_id.to_string(),
        });

        Ok((fresh, items))
    }

    // =========================================================================
    // Invoices
    // =========================================================================

    /// Generates the session's invoice from a fresh snapshot.
    ///
    /// Moves an `open` session to `billing` (freezing the tab); while
    /// already `billing`, regeneration first voids the outstanding
    /// unpaid invoices with reason "regenerated", so at most one
    /// non-void bill set exists at a time.
    pub async fn generate_invoice(
        &self,
        req: GenerateInvoiceRequest,
    ) -> ServiceResult<SessionInvoice> {
        validation::validate_adjustment_minor(req.discount_minor)?;
        validation::validate_adjustment_minor(req.deposit_credit_minor)?;

        let snapshot = self.billing_snapshot(&req.session_id).await?;

        // EmptyOrder is checked before any state changes: a fruitless
        // generation must leave the session exactly as it was
        let totals = billing::invoice_totals(
            &req.session_id,
            snapshot.subtotal(),
            self.policy.tax_rate,
            self.policy.service_rate,
            Money::from_minor(req.discount_minor),
            Money::from_minor(req.deposit_credit_minor),
        )?;

        self.enter_billing(&snapshot).await?;

        let voided = self
            .db
            .invoices()
            .void_unpaid_for_session(&req.session_id, "regenerated")
            .await?;
        if voided > 0 {
            debug!(session_id = %req.session_id, voided = voided, "Previous invoices voided on regeneration");
        }

        let seq = self
            .db
            .invoices()
            .reserve_number(&snapshot.session.venue_id)
            .await?;
        let invoice = build_invoice(
            &req.session_id,
            format_invoice_number(seq),
            &totals,
            req.discount_reason,
            None,
        );
        self.db.invoices().insert(&invoice).await?;

        info!(
            session_id = %req.session_id,
            invoice_number = %invoice.invoice_number,
            total_minor = invoice.total_minor,
            "Invoice generated"
        );

        self.cache.invalidate(&snapshot.session.venue_id);
        self.feed.publish(SessionEvent::InvoicesGenerated {
            venue_id: snapshot.session.venue_id.clone(),
            session_id: req.session_id.clone(),
            invoice_ids: vec![invoice.id.clone()],
        });

        self.db
            .invoices()
            .get_by_id(&invoice.id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Invoice", invoice.id))
    }

    /// Generates an N-way even split from one fresh snapshot.
    ///
    /// Every monetary component is floor-divided with the remainder on
    /// the last split; the set shares one base number with `-k/N`
    /// suffixes. Inserts are independent: if one fails mid-set, the
    /// already-created invoices stand, the session stays `billing`, and
    /// the error carries the created ids for manual reconciliation.
    pub async fn generate_split_invoices(
        &self,
        req: SplitInvoiceRequest,
    ) -> ServiceResult<Vec<SessionInvoice>> {
        validation::validate_adjustment_minor(req.discount_minor)?;
        validation::validate_adjustment_minor(req.tip_minor)?;

        let snapshot = self.billing_snapshot(&req.session_id).await?;

        // Validates split_count and rejects empty sessions
        let shares = billing::split_totals(
            &req.session_id,
            snapshot.subtotal(),
            self.policy.tax_rate,
            self.policy.service_rate,
            Money::from_minor(req.discount_minor),
            Money::from_minor(req.tip_minor),
            req.split_count,
        )?;

        self.enter_billing(&snapshot).await?;

        self.db
            .invoices()
            .void_unpaid_for_session(&req.session_id, "regenerated")
            .await?;

        let seq = self
            .db
            .invoices()
            .reserve_number(&snapshot.session.venue_id)
            .await?;
        let base_number = format_invoice_number(seq);

        let mut created_ids = Vec::with_capacity(shares.len());
        for (i, share) in shares.iter().enumerate() {
            let guest = req.guests.get(i).cloned();
            let invoice = build_split_invoice(&req.session_id, &base_number, share, guest);

            if let Err(err) = self.db.invoices().insert(&invoice).await {
                warn!(
                    session_id = %req.session_id,
                    created = created_ids.len(),
                    expected = req.split_count,
                    error = %err,
                    "Split invoice set partially created"
                );
                self.cache.invalidate(&snapshot.session.venue_id);
                return Err(ServiceError::PartialSplitFailure {
                    created: created_ids,
                    expected: req.split_count,
                    detail: err.to_string(),
                });
            }
            created_ids.push(invoice.id);
        }

        info!(
            session_id = %req.session_id,
            base_number = %base_number,
            split_count = req.split_count,
            "Split invoice set generated"
        );

        self.cache.invalidate(&snapshot.session.venue_id);
        self.feed.publish(SessionEvent::InvoicesGenerated {
            venue_id: snapshot.session.venue_id.clone(),
            session_id: req.session_id.clone(),
            invoice_ids: created_ids.clone(),
        });

        let mut invoices = Vec::with_capacity(created_ids.len());
        for id in &created_ids {
            let invoice = self
                .db
                .invoices()
                .get_by_id(id)
                .await?
                .ok_or_else(|| ServiceError::not_found("Invoice", id.clone()))?;
            invoices.push(invoice);
        }

        Ok(invoices)
    }

    /// Applies (or replaces) a discount on an amendable invoice.
    ///
    /// Only the discount and the total move; every other component is
    /// frozen at generation time, and `amount_paid` is untouched.
    pub async fn apply_discount(
        &self,
        invoice_id: &str,
        discount_minor: i64,
        reason: Option<String>,
    ) -> ServiceResult<SessionInvoice> {
        validation::validate_adjustment_minor(discount_minor)?;

        let invoice = self
            .db
            .invoices()
            .get_by_id(invoice_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Invoice", invoice_id))?;

        if !invoice.status.is_amendable() {
            return Err(ServiceError::invalid_state(
                "Invoice",
                invoice_id,
                invoice.status,
                "apply a discount",
            ));
        }

        let new_total = billing::reprice_with_discount(
            Money::from_minor(invoice.subtotal_minor),
            Money::from_minor(invoice.tax_minor),
            Money::from_minor(invoice.service_charge_minor),
            Money::from_minor(discount_minor),
            Money::from_minor(invoice.deposit_credit_minor),
            Money::from_minor(invoice.tip_minor),
        );

        match self
            .db
            .invoices()
            .apply_discount(invoice_id, discount_minor, reason.as_deref(), new_total.minor())
            .await
        {
            Ok(()) => {}
            Err(DbError::Conflict { .. }) => {
                return Err(ServiceError::invalid_state(
                    "Invoice",
                    invoice_id,
                    invoice.status,
                    "apply a discount",
                ));
            }
            Err(other) => return Err(other.into()),
        }

        self.after_invoice_mutation(invoice_id, &invoice.session_id, |venue_id, session_id| {
            SessionEvent::InvoiceAmended {
                venue_id,
                session_id,
                invoice_id: invoice_id.to_string(),
            }
        })
        .await
    }

    /// Records a settlement payment against an invoice.
    ///
    /// Called by the payment settlement collaborator; this is the only
    /// writer of `amount_paid`. When every non-void invoice of the
    /// session is paid, the session moves to `paid`.
    pub async fn record_payment(
        &self,
        invoice_id: &str,
        amount_minor: i64,
    ) -> ServiceResult<SessionInvoice> {
        validation::validate_payment_amount(amount_minor)?;

        let invoice = self
            .db
            .invoices()
            .get_by_id(invoice_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Invoice", invoice_id))?;

        if !matches!(
            invoice.status,
            InvoiceStatus::Pending | InvoiceStatus::PartiallyPaid
        ) {
            return Err(ServiceError::invalid_state(
                "Invoice",
                invoice_id,
                invoice.status,
                "record a payment",
            ));
        }

        match self.db.invoices().record_payment(invoice_id, amount_minor).await {
            Ok(()) => {}
            Err(DbError::Conflict { .. }) => {
                return Err(ServiceError::invalid_state(
                    "Invoice",
                    invoice_id,
                    invoice.status,
                    "record a payment",
                ));
            }
            Err(other) => return Err(other.into()),
        }

        // Settle flip: once nothing is owed, the session is paid. Guard
        // miss here just means another payment already flipped it.
        if self.db.invoices().all_settled(&invoice.session_id).await? {
            match self
                .db
                .sessions()
                .transition(&invoice.session_id, SessionStatus::Billing, SessionStatus::Paid)
                .await
            {
                Ok(()) => {
                    info!(session_id = %invoice.session_id, "Session fully settled");
                }
                Err(DbError::Conflict { .. }) => {}
                Err(other) => return Err(other.into()),
            }
        }

        self.after_invoice_mutation(invoice_id, &invoice.session_id, |venue_id, session_id| {
            SessionEvent::PaymentRecorded {
                venue_id,
                session_id,
                invoice_id: invoice_id.to_string(),
            }
        })
        .await
    }

    /// Voids an unpaid invoice with a reason.
    pub async fn void_invoice(
        &self,
        invoice_id: &str,
        reason: &str,
    ) -> ServiceResult<SessionInvoice> {
        let invoice = self
            .db
            .invoices()
            .get_by_id(invoice_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Invoice", invoice_id))?;

        if matches!(invoice.status, InvoiceStatus::Paid | InvoiceStatus::Void) {
            return Err(ServiceError::invalid_state(
                "Invoice",
                invoice_id,
                invoice.status,
                "void",
            ));
        }

        match self.db.invoices().void(invoice_id, reason).await {
            Ok(()) => {}
            Err(DbError::Conflict { .. }) => {
                return Err(ServiceError::invalid_state(
                    "Invoice",
                    invoice_id,
                    invoice.status,
                    "void",
                ));
            }
            Err(other) => return Err(other.into()),
        }

        self.after_invoice_mutation(invoice_id, &invoice.session_id, |venue_id, session_id| {
            SessionEvent::InvoiceVoided {
                venue_id,
                session_id,
                invoice_id: invoice_id.to_string(),
            }
        })
        .await
    }

    // =========================================================================
    // Close
    // =========================================================================

    /// Ends a session and releases its table.
    ///
    /// A `paid` session closes normally; an `open` or `billing` session
    /// ends as `cancelled` (guests left without paying, staff decision).
    pub async fn close_session(
        &self,
        session_id: &str,
        closed_by: &str,
    ) -> ServiceResult<TableSession> {
        let session = self
            .db
            .sessions()
            .get_by_id(session_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Session", session_id))?;

        let to = match session.status {
            SessionStatus::Paid => SessionStatus::Closed,
            SessionStatus::Open | SessionStatus::Billing => SessionStatus::Cancelled,
            SessionStatus::Closed | SessionStatus::Cancelled => {
                return Err(ServiceError::invalid_state(
                    "Session",
                    session_id,
                    session.status,
                    "close",
                ));
            }
        };

        match self
            .db
            .sessions()
            .finish(session_id, session.status, to, closed_by)
            .await
        {
            Ok(()) => {}
            Err(DbError::Conflict { .. }) => {
                return Err(ServiceError::invalid_state(
                    "Session",
                    session_id,
                    session.status,
                    "close",
                ));
            }
            Err(other) => return Err(other.into()),
        }

        if let Some(table_id) = &session.table_id {
            match self.db.tables().release(table_id).await {
                Ok(()) => {}
                // Floor management may have already re-flagged the table
                Err(DbError::Conflict { .. }) => {
                    debug!(table_id = %table_id, "Table not occupied at session close");
                }
                Err(other) => return Err(other.into()),
            }
        }

        let fresh = self
            .db
            .sessions()
            .get_by_id(session_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Session", session_id))?;

        info!(
            session_id = %session_id,
            status = ?fresh.status,
            closed_by = %closed_by,
            "Session finished"
        );

        self.cache.invalidate(&fresh.venue_id);
        self.feed.publish(SessionEvent::SessionFinished {
            venue_id: fresh.venue_id.clone(),
            session_id: session_id.to_string(),
            status: fresh.status,
        });

        Ok(fresh)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Loads one session with its table, orders, and items. Always fresh.
    pub async fn get_session(&self, session_id: &str) -> ServiceResult<SessionWithOrders> {
        self.db
            .sessions()
            .load_with_orders(session_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Session", session_id))
    }

    /// Lists all invoices of a session, oldest first. Always fresh.
    pub async fn list_invoices(&self, session_id: &str) -> ServiceResult<Vec<SessionInvoice>> {
        Ok(self.db.invoices().list_by_session(session_id).await?)
    }

    /// Lists live (`open`/`billing`) sessions for a venue, through the
    /// venue cache.
    pub async fn list_open_sessions(
        &self,
        venue_id: &str,
    ) -> ServiceResult<Vec<SessionWithOrders>> {
        if let Some(cached) = self.cache.get(venue_id) {
            return Ok(cached);
        }

        let sessions = self.db.sessions().list_live_by_venue(venue_id).await?;
        let mut snapshots = Vec::with_capacity(sessions.len());
        for session in sessions {
            if let Some(snapshot) = self.db.sessions().load_with_orders(&session.id).await? {
                snapshots.push(snapshot);
            }
        }

        self.cache.store(venue_id, snapshots.clone());
        Ok(snapshots)
    }

    /// Projects the venue's live sessions onto one production station
    /// (kitchen/bar display).
    pub async fn list_destination_orders(
        &self,
        venue_id: &str,
        destination: Destination,
    ) -> ServiceResult<DestinationProjection> {
        let snapshots = self.list_open_sessions(venue_id).await?;
        Ok(project_destination(&snapshots, destination))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Loads the fresh snapshot invoice generation works from, and
    /// checks the session may be billed at all.
    async fn billing_snapshot(&self, session_id: &str) -> ServiceResult<SessionWithOrders> {
        let snapshot = self.get_session(session_id).await?;

        if !matches!(
            snapshot.session.status,
            SessionStatus::Open | SessionStatus::Billing
        ) {
            return Err(ServiceError::invalid_state(
                "Session",
                session_id,
                snapshot.session.status,
                "generate an invoice",
            ));
        }

        Ok(snapshot)
    }

    /// Freezes the tab: moves an `open` session to `billing` before any
    /// invoice rows exist. Already-billing sessions pass through.
    async fn enter_billing(&self, snapshot: &SessionWithOrders) -> ServiceResult<()> {
        if snapshot.session.status != SessionStatus::Open {
            return Ok(());
        }

        match self
            .db
            .sessions()
            .transition(
                &snapshot.session.id,
                SessionStatus::Open,
                SessionStatus::Billing,
            )
            .await
        {
            Ok(()) => Ok(()),
            Err(DbError::Conflict { .. }) => Err(ServiceError::invalid_state(
                "Session",
                snapshot.session.id.clone(),
                snapshot.session.status,
                "generate an invoice",
            )),
            Err(other) => Err(other.into()),
        }
    }

    /// Venue and session of an item's parent order, for cache and feed.
    async fn venue_of_order(&self, order_id: &str) -> ServiceResult<(String, String)> {
        let order = self
            .db
            .orders()
            .get_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", order_id))?;
        let session = self
            .db
            .sessions()
            .get_by_id(&order.session_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Session", order.session_id.clone()))?;

        Ok((session.venue_id, order.session_id))
    }

    /// Shared tail of every invoice mutation: fresh read, cache
    /// invalidation, feed event.
    async fn after_invoice_mutation(
        &self,
        invoice_id: &str,
        session_id: &str,
        event: impl FnOnce(String, String) -> SessionEvent,
    ) -> ServiceResult<SessionInvoice> {
        let fresh = self
            .db
            .invoices()
            .get_by_id(invoice_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Invoice", invoice_id))?;

        let session = self
            .db
            .sessions()
            .get_by_id(session_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Session", session_id))?;

        self.cache.invalidate(&session.venue_id);
        self.feed
            .publish(event(session.venue_id, session_id.to_string()));

        Ok(fresh)
    }
}

// =============================================================================
// Invoice Construction
// =============================================================================

fn build_invoice(
    session_id: &str,
    invoice_number: String,
    totals: &InvoiceTotals,
    discount_reason: Option<String>,
    guest: Option<GuestInfo>,
) -> SessionInvoice {
    let guest = guest.unwrap_or_default();
    SessionInvoice {
        id: Uuid::new_v4().to_string(),
        session_id: session_id.to_string(),
        invoice_number,
        subtotal_minor: totals.subtotal.minor(),
        tax_minor: totals.tax.minor(),
        service_charge_minor: totals.service_charge.minor(),
        discount_minor: totals.discount.minor(),
        discount_reason,
        deposit_credit_minor: totals.deposit_credit.minor(),
        tip_minor: totals.tip.minor(),
        total_minor: totals.total.minor(),
        amount_paid_minor: 0,
        status: InvoiceStatus::Pending,
        guest_name: guest.name,
        guest_phone: guest.phone,
        guest_email: guest.email,
        guest_user_id: guest.user_id,
        generated_at: Utc::now(),
        voided_at: None,
        void_reason: None,
    }
}

fn build_split_invoice(
    session_id: &str,
    base_number: &str,
    share: &SplitShare,
    guest: Option<GuestInfo>,
) -> SessionInvoice {
    let guest = guest.unwrap_or_default();
    SessionInvoice {
        id: Uuid::new_v4().to_string(),
        session_id: session_id.to_string(),
        invoice_number: format!("{}{}", base_number, share.number_suffix()),
        subtotal_minor: share.subtotal.minor(),
        tax_minor: share.tax.minor(),
        service_charge_minor: share.service_charge.minor(),
        discount_minor: share.discount.minor(),
        discount_reason: None,
        // Deposits are never split
        deposit_credit_minor: 0,
        tip_minor: share.tip.minor(),
        total_minor: share.total.minor(),
        amount_paid_minor: 0,
        status: InvoiceStatus::Pending,
        guest_name: guest.name,
        guest_phone: guest.phone,
        guest_email: guest.email,
        guest_user_id: guest.user_id,
        generated_at: Utc::now(),
        voided_at: None,
        void_reason: None,
    }
}

// =============================================================================
// Integration Tests (in-memory SQLite)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use nox_core::TableStatus;
    use nox_db::DbConfig;

    async fn test_service() -> SessionService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        SessionService::new(
            db,
            BillingPolicy::new(Rate::from_percent(10), Rate::from_percent(5)),
        )
    }

    async fn seed_table(service: &SessionService) -> String {
        let now = Utc::now();
        let table = nox_core::VenueTable {
            id: Uuid::new_v4().to_string(),
            venue_id: "venue-1".to_string(),
            table_number: 12,
            seat_count: 6,
            zone: Some("vip".to_string()),
            status: TableStatus::Available,
            created_at: now,
            updated_at: now,
        };
        service.database().tables().insert(&table).await.unwrap();
        table.id
    }

    fn check_in_req(table_id: Option<String>) -> CheckInRequest {
        CheckInRequest {
            venue_id: "venue-1".to_string(),
            table_id,
            booking_id: None,
            guest_count: 4,
            guest_name: Some("Ayu".to_string()),
            notes: None,
            opened_by: "staff-1".to_string(),
        }
    }

    fn drink(name: &str, qty: i64, price: i64) -> NewOrderItem {
        NewOrderItem {
            menu_item_id: None,
            name: name.to_string(),
            quantity: qty,
            unit_price_minor: price,
            modifiers: None,
            notes: None,
            destination: Destination::Bar,
        }
    }

    /// 2× Mojito @ 85,000 + 1× Nachos @ 45,000 = 215,000 subtotal.
    async fn session_with_order(service: &SessionService) -> String {
        let session = service.check_in(check_in_req(None)).await.unwrap();
        service
            .submit_order(
                &session.id,
                None,
                vec![drink("Mojito", 2, 85_000), drink("Nachos", 1, 45_000)],
            )
            .await
            .unwrap();
        session.id
    }

    #[tokio::test]
    async fn test_check_in_occupies_table() {
        let service = test_service().await;
        let table_id = seed_table(&service).await;

        let session = service
            .check_in(check_in_req(Some(table_id.clone())))
            .await
            .unwrap();
        assert_eq!(session.status, SessionStatus::Open);
        assert!(!session.is_walk_in());

        let table = service
            .database()
            .tables()
            .get_by_id(&table_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(table.status, TableStatus::Occupied);
    }

    #[tokio::test]
    async fn test_check_in_unknown_table_is_not_found() {
        let service = test_service().await;
        let err = service
            .check_in(check_in_req(Some("no-such-table".to_string())))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_check_in_single_winner() {
        let service = test_service().await;
        let table_id = seed_table(&service).await;

        let a = {
            let service = service.clone();
            let table_id = table_id.clone();
            tokio::spawn(async move { service.check_in(check_in_req(Some(table_id))).await })
        };
        let b = {
            let service = service.clone();
            let table_id = table_id.clone();
            tokio::spawn(async move { service.check_in(check_in_req(Some(table_id))).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);

        let loss = results.iter().find(|r| r.is_err()).unwrap();
        assert!(matches!(
            loss.as_ref().unwrap_err(),
            ServiceError::TableUnavailable { .. }
        ));
    }

    #[tokio::test]
    async fn test_submit_order_rejected_while_billing() {
        let service = test_service().await;
        let session_id = session_with_order(&service).await;

        service
            .generate_invoice(GenerateInvoiceRequest {
                session_id: session_id.clone(),
                discount_minor: 0,
                discount_reason: None,
                deposit_credit_minor: 0,
            })
            .await
            .unwrap();

        let err = service
            .submit_order(&session_id, None, vec![drink("Mojito", 1, 85_000)])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState { .. }));
        assert!(err.to_string().contains("billing"));
    }

    #[tokio::test]
    async fn test_generate_invoice_scenario_totals() {
        let service = test_service().await;
        let session_id = session_with_order(&service).await;

        let invoice = service
            .generate_invoice(GenerateInvoiceRequest {
                session_id: session_id.clone(),
                discount_minor: 0,
                discount_reason: None,
                deposit_credit_minor: 0,
            })
            .await
            .unwrap();

        assert_eq!(invoice.subtotal_minor, 215_000);
        assert_eq!(invoice.tax_minor, 21_500);
        assert_eq!(invoice.service_charge_minor, 10_750);
        assert_eq!(invoice.total_minor, 247_250);
        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert_eq!(invoice.amount_paid_minor, 0);
        assert!(invoice.reconciles());

        let session = service.get_session(&session_id).await.unwrap();
        assert_eq!(session.session.status, SessionStatus::Billing);
    }

    #[tokio::test]
    async fn test_generate_invoice_empty_session_stays_open() {
        let service = test_service().await;
        let session = service.check_in(check_in_req(None)).await.unwrap();

        let err = service
            .generate_invoice(GenerateInvoiceRequest {
                session_id: session.id.clone(),
                discount_minor: 0,
                discount_reason: None,
                deposit_credit_minor: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::EmptyOrder { .. }));

        // The fruitless generation must not freeze the tab
        let fresh = service.get_session(&session.id).await.unwrap();
        assert_eq!(fresh.session.status, SessionStatus::Open);
    }

    #[tokio::test]
    async fn test_generate_invoice_all_orders_cancelled_is_empty() {
        let service = test_service().await;
        let session = service.check_in(check_in_req(None)).await.unwrap();
        let (order, _) = service
            .submit_order(&session.id, None, vec![drink("Mojito", 1, 85_000)])
            .await
            .unwrap();
        service.cancel_order(&order.id).await.unwrap();

        let err = service
            .generate_invoice(GenerateInvoiceRequest {
                session_id: session.id.clone(),
                discount_minor: 0,
                discount_reason: None,
                deposit_credit_minor: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::EmptyOrder { .. }));
    }

    #[tokio::test]
    async fn test_regenerate_voids_previous() {
        let service = test_service().await;
        let session_id = session_with_order(&service).await;

        let req = GenerateInvoiceRequest {
            session_id: session_id.clone(),
            discount_minor: 0,
            discount_reason: None,
            deposit_credit_minor: 0,
        };
        let first = service.generate_invoice(req.clone()).await.unwrap();
        let second = service.generate_invoice(req).await.unwrap();

        assert_ne!(first.invoice_number, second.invoice_number);

        let invoices = service.list_invoices(&session_id).await.unwrap();
        assert_eq!(invoices.len(), 2);

        let first_fresh = invoices.iter().find(|i| i.id == first.id).unwrap();
        assert_eq!(first_fresh.status, InvoiceStatus::Void);
        assert_eq!(first_fresh.void_reason.as_deref(), Some("regenerated"));
        assert_eq!(second.status, InvoiceStatus::Pending);
    }

    #[tokio::test]
    async fn test_split_scenario_totals() {
        let service = test_service().await;
        let session_id = session_with_order(&service).await;

        let invoices = service
            .generate_split_invoices(SplitInvoiceRequest {
                session_id: session_id.clone(),
                split_count: 3,
                discount_minor: 0,
                tip_minor: 0,
                guests: vec![GuestInfo {
                    name: Some("Ayu".to_string()),
                    ..GuestInfo::default()
                }],
            })
            .await
            .unwrap();

        assert_eq!(invoices.len(), 3);
        assert_eq!(invoices[0].total_minor, 82_416);
        assert_eq!(invoices[1].total_minor, 82_416);
        assert_eq!(invoices[2].total_minor, 82_418);

        let sum: i64 = invoices.iter().map(|i| i.total_minor).sum();
        assert_eq!(sum, 247_250);

        // Shared base number with -k/N suffixes
        assert!(invoices[0].invoice_number.ends_with("-1/3"));
        assert!(invoices[2].invoice_number.ends_with("-3/3"));
        assert!(invoices.iter().all(|i| i.is_split()));

        // First split carries the guest snapshot, the rest are anonymous
        assert_eq!(invoices[0].guest_name.as_deref(), Some("Ayu"));
        assert!(invoices[1].guest_name.is_none());

        // Deposits are never split
        assert!(invoices.iter().all(|i| i.deposit_credit_minor == 0));
    }

    #[tokio::test]
    async fn test_split_count_of_one_rejected() {
        let service = test_service().await;
        let session_id = session_with_order(&service).await;

        let err = service
            .generate_split_invoices(SplitInvoiceRequest {
                session_id,
                split_count: 1,
                discount_minor: 0,
                tip_minor: 0,
                guests: Vec::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_payment_settles_session() {
        let service = test_service().await;
        let session_id = session_with_order(&service).await;

        let invoice = service
            .generate_invoice(GenerateInvoiceRequest {
                session_id: session_id.clone(),
                discount_minor: 0,
                discount_reason: None,
                deposit_credit_minor: 0,
            })
            .await
            .unwrap();

        let partially = service.record_payment(&invoice.id, 100_000).await.unwrap();
        assert_eq!(partially.status, InvoiceStatus::PartiallyPaid);
        let session = service.get_session(&session_id).await.unwrap();
        assert_eq!(session.session.status, SessionStatus::Billing);

        let paid = service.record_payment(&invoice.id, 147_250).await.unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);
        assert_eq!(paid.amount_paid_minor, 247_250);

        let session = service.get_session(&session_id).await.unwrap();
        assert_eq!(session.session.status, SessionStatus::Paid);
    }

    #[tokio::test]
    async fn test_split_settlement_requires_every_split() {
        let service = test_service().await;
        let session_id = session_with_order(&service).await;

        let invoices = service
            .generate_split_invoices(SplitInvoiceRequest {
                session_id: session_id.clone(),
                split_count: 2,
                discount_minor: 0,
                tip_minor: 0,
                guests: Vec::new(),
            })
            .await
            .unwrap();

        service
            .record_payment(&invoices[0].id, invoices[0].total_minor)
            .await
            .unwrap();
        let session = service.get_session(&session_id).await.unwrap();
        assert_eq!(session.session.status, SessionStatus::Billing);

        service
            .record_payment(&invoices[1].id, invoices[1].total_minor)
            .await
            .unwrap();
        let session = service.get_session(&session_id).await.unwrap();
        assert_eq!(session.session.status, SessionStatus::Paid);
    }

    #[tokio::test]
    async fn test_close_paid_session_releases_table() {
        let service = test_service().await;
        let table_id = seed_table(&service).await;
        let session = service
            .check_in(check_in_req(Some(table_id.clone())))
            .await
            .unwrap();
        service
            .submit_order(&session.id, None, vec![drink("Mojito", 1, 85_000)])
            .await
            .unwrap();

        let invoice = service
            .generate_invoice(GenerateInvoiceRequest {
                session_id: session.id.clone(),
                discount_minor: 0,
                discount_reason: None,
                deposit_credit_minor: 0,
            })
            .await
            .unwrap();
        service
            .record_payment(&invoice.id, invoice.total_minor)
            .await
            .unwrap();

        let closed = service.close_session(&session.id, "staff-2").await.unwrap();
        assert_eq!(closed.status, SessionStatus::Closed);
        assert_eq!(closed.closed_by.as_deref(), Some("staff-2"));

        let table = service
            .database()
            .tables()
            .get_by_id(&table_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(table.status, TableStatus::Available);
    }

    #[tokio::test]
    async fn test_close_unpaid_session_cancels() {
        let service = test_service().await;
        let session = service.check_in(check_in_req(None)).await.unwrap();

        let closed = service.close_session(&session.id, "staff-1").await.unwrap();
        assert_eq!(closed.status, SessionStatus::Cancelled);

        // Terminal sessions cannot be closed again
        let err = service
            .close_session(&session.id, "staff-1")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_apply_discount_reprices_total() {
        let service = test_service().await;
        let session_id = session_with_order(&service).await;

        let invoice = service
            .generate_invoice(GenerateInvoiceRequest {
                session_id,
                discount_minor: 0,
                discount_reason: None,
                deposit_credit_minor: 0,
            })
            .await
            .unwrap();

        let amended = service
            .apply_discount(&invoice.id, 30_000, Some("regular guest".to_string()))
            .await
            .unwrap();
        assert_eq!(amended.discount_minor, 30_000);
        assert_eq!(amended.total_minor, 217_250);
        assert!(amended.reconciles());
    }

    #[tokio::test]
    async fn test_void_then_regenerate_keeps_session_billing() {
        let service = test_service().await;
        let session_id = session_with_order(&service).await;

        let invoice = service
            .generate_invoice(GenerateInvoiceRequest {
                session_id: session_id.clone(),
                discount_minor: 0,
                discount_reason: None,
                deposit_credit_minor: 0,
            })
            .await
            .unwrap();

        let voided = service
            .void_invoice(&invoice.id, "wrong table")
            .await
            .unwrap();
        assert_eq!(voided.status, InvoiceStatus::Void);

        let session = service.get_session(&session_id).await.unwrap();
        assert_eq!(session.session.status, SessionStatus::Billing);
    }

    #[tokio::test]
    async fn test_cancel_cascade_spares_only_served_item() {
        let service = test_service().await;
        let session = service.check_in(check_in_req(None)).await.unwrap();
        let (order, items) = service
            .submit_order(
                &session.id,
                None,
                vec![
                    drink("Mojito", 1, 85_000),
                    drink("Negroni", 1, 95_000),
                    drink("Old Fashioned", 1, 105_000),
                ],
            )
            .await
            .unwrap();

        // First item fully served, second ready, third still pending
        for status in [ItemStatus::Preparing, ItemStatus::Ready, ItemStatus::Served] {
            service
                .update_item_status(&items[0].id, status)
                .await
                .unwrap();
        }
        service
            .update_item_status(&items[1].id, ItemStatus::Preparing)
            .await
            .unwrap();
        service
            .update_item_status(&items[1].id, ItemStatus::Ready)
            .await
            .unwrap();

        let (cancelled, fresh_items) = service.cancel_order(&order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let served = fresh_items.iter().find(|i| i.id == items[0].id).unwrap();
        assert_eq!(served.status, ItemStatus::Served);

        // Ready is not served: the cascade cancels it too
        let ready = fresh_items.iter().find(|i| i.id == items[1].id).unwrap();
        assert_eq!(ready.status, ItemStatus::Cancelled);

        let pending = fresh_items.iter().find(|i| i.id == items[2].id).unwrap();
        assert_eq!(pending.status, ItemStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_item_status_skips_rejected() {
        let service = test_service().await;
        let session = service.check_in(check_in_req(None)).await.unwrap();
        let (_, items) = service
            .submit_order(&session.id, None, vec![drink("Mojito", 1, 85_000)])
            .await
            .unwrap();

        let err = service
            .update_item_status(&items[0].id, ItemStatus::Served)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_destination_projection_via_cache() {
        let service = test_service().await;
        let session = service.check_in(check_in_req(None)).await.unwrap();
        service
            .submit_order(
                &session.id,
                None,
                vec![
                    drink("Mojito", 2, 85_000),
                    NewOrderItem {
                        destination: Destination::Kitchen,
                        ..drink("Nachos", 1, 45_000)
                    },
                ],
            )
            .await
            .unwrap();

        let bar = service
            .list_destination_orders("venue-1", Destination::Bar)
            .await
            .unwrap();
        assert_eq!(bar.len(), 1);
        assert_eq!(bar.iter().next().unwrap().items.len(), 1);
        assert_eq!(bar.iter().next().unwrap().items[0].name, "Mojito");

        let kitchen = service
            .list_destination_orders("venue-1", Destination::Kitchen)
            .await
            .unwrap();
        assert_eq!(kitchen.len(), 1);
        assert_eq!(kitchen.iter().next().unwrap().items[0].name, "Nachos");
    }

    #[tokio::test]
    async fn test_cache_invalidated_on_mutation() {
        let service = test_service().await;
        service.check_in(check_in_req(None)).await.unwrap();

        // Prime the cache
        let before = service.list_open_sessions("venue-1").await.unwrap();
        assert_eq!(before.len(), 1);

        // A second check-in must invalidate, not serve the stale list
        service.check_in(check_in_req(None)).await.unwrap();
        let after = service.list_open_sessions("venue-1").await.unwrap();
        assert_eq!(after.len(), 2);
    }

    #[tokio::test]
    async fn test_feed_emits_on_check_in() {
        let service = test_service().await;
        let mut rx = service.feed().subscribe();

        let session = service.check_in(check_in_req(None)).await.unwrap();

        let event = rx.recv().await.unwrap();
        match event {
            SessionEvent::SessionOpened {
                venue_id,
                session_id,
            } => {
                assert_eq!(venue_id, "venue-1");
                assert_eq!(session_id, session.id);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
