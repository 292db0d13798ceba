//! # Session Repository
//!
//! Database operations for table sessions.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Session Lifecycle                                  │
//! │                                                                         │
//! │  1. CHECK-IN                                                           │
//! │     └── insert() → TableSession { status: Open }                       │
//! │         (table occupancy CAS happens first, in TableRepository)        │
//! │                                                                         │
//! │  2. ORDERS                                                             │
//! │     └── OrderRepository.insert_order_with_items()                      │
//! │                                                                         │
//! │  3. BILLING                                                            │
//! │     └── transition(id, Open, Billing)    ← guarded CAS                 │
//! │                                                                         │
//! │  4. SETTLED                                                            │
//! │     └── transition(id, Billing, Paid)                                  │
//! │                                                                         │
//! │  5. CLOSE / CANCEL                                                     │
//! │     └── finish(id, from, to, staff)  → sets closed_by/closed_at        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every transition is a conditional UPDATE guarded on the expected
//! current status. A race between two staff devices cannot skip a
//! state: the loser's guard matches zero rows and surfaces as Conflict.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use nox_core::{
    OrderWithItems, SessionOrder, SessionOrderItem, SessionStatus, SessionWithOrders, TableSession,
    VenueTable,
};

const SELECT_COLUMNS: &str = r#"
    SELECT id, venue_id, table_id, booking_id, status, guest_count,
           guest_name, notes, opened_by, closed_by, opened_at, closed_at
    FROM table_sessions
"#;

/// Repository for session database operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    /// Creates a new SessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Inserts a new session.
    pub async fn insert(&self, session: &TableSession) -> DbResult<()> {
        debug!(id = %session.id, table_id = ?session.table_id, "Inserting session");

        sqlx::query(
            r#"
            INSERT INTO table_sessions (
                id, venue_id, table_id, booking_id, status, guest_count,
                guest_name, notes, opened_by, closed_by, opened_at, closed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&session.id)
        .bind(&session.venue_id)
        .bind(&session.table_id)
        .bind(&session.booking_id)
        .bind(session.status)
        .bind(session.guest_count)
        .bind(&session.guest_name)
        .bind(&session.notes)
        .bind(&session.opened_by)
        .bind(&session.closed_by)
        .bind(session.opened_at)
        .bind(session.closed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a session by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<TableSession>> {
        let session = sqlx::query_as::<_, TableSession>(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    /// Lists sessions in `open` or `billing` for a venue, oldest first.
    ///
    /// These are the live tabs a floor overview shows.
    pub async fn list_live_by_venue(&self, venue_id: &str) -> DbResult<Vec<TableSession>> {
        let sessions = sqlx::query_as::<_, TableSession>(&format!(
            "{SELECT_COLUMNS} WHERE venue_id = ?1 AND status IN ('open', 'billing') ORDER BY opened_at"
        ))
        .bind(venue_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    /// Moves a session from `from` to `to`, guarded on `from`.
    ///
    /// The caller is responsible for checking `can_transition_to`
    /// first; the guard here is the concurrent backstop, not the rule.
    ///
    /// ## Errors
    /// `Conflict` if the session is no longer in `from`.
    pub async fn transition(
        &self,
        session_id: &str,
        from: SessionStatus,
        to: SessionStatus,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE table_sessions SET
                status = ?3
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(session_id)
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict(
                "Session",
                session_id,
                format!("{:?}", from).to_lowercase(),
            ));
        }

        debug!(session_id = %session_id, from = ?from, to = ?to, "Session transitioned");
        Ok(())
    }

    /// Moves a session into a terminal state, recording who ended it.
    ///
    /// Same guard discipline as `transition`, plus `closed_by` and
    /// `closed_at` stamps.
    pub async fn finish(
        &self,
        session_id: &str,
        from: SessionStatus,
        to: SessionStatus,
        closed_by: &str,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE table_sessions SET
                status = ?3,
                closed_by = ?4,
                closed_at = ?5
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(session_id)
        .bind(from)
        .bind(to)
        .bind(closed_by)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict(
                "Session",
                session_id,
                format!("{:?}", from).to_lowercase(),
            ));
        }

        debug!(session_id = %session_id, to = ?to, closed_by = %closed_by, "Session finished");
        Ok(())
    }

    /// Loads a session joined with its table and all orders + items.
    ///
    /// This is the authoritative snapshot the billing math reads. It is
    /// always fetched fresh from the database at call time, never
    /// served from a cache.
    pub async fn load_with_orders(&self, session_id: &str) -> DbResult<Option<SessionWithOrders>> {
        let Some(session) = self.get_by_id(session_id).await? else {
            return Ok(None);
        };

        let table = match &session.table_id {
            Some(table_id) => {
                sqlx::query_as::<_, VenueTable>(
                    r#"
                    SELECT id, venue_id, table_number, seat_count, zone,
                           status, created_at, updated_at
                    FROM venue_tables
                    WHERE id = ?1
                    "#,
                )
                .bind(table_id)
                .fetch_optional(&self.pool)
                .await?
            }
            None => None,
        };

        let orders = sqlx::query_as::<_, SessionOrder>(
            r#"
            SELECT id, session_id, order_number, status, notes,
                   confirmed_at, created_at
            FROM session_orders
            WHERE session_id = ?1
            ORDER BY order_number
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, SessionOrderItem>(
            r#"
            SELECT i.id, i.order_id, i.menu_item_id, i.name, i.quantity,
                   i.unit_price_minor, i.modifiers, i.notes, i.destination,
                   i.status, i.served_at, i.created_at
            FROM session_order_items i
            JOIN session_orders o ON o.id = i.order_id
            WHERE o.session_id = ?1
            ORDER BY i.created_at
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        // Group items under their orders, preserving both orderings
        let orders = orders
            .into_iter()
            .map(|order| {
                let order_items = items
                    .iter()
                    .filter(|item| item.order_id == order.id)
                    .cloned()
                    .collect();
                OrderWithItems {
                    order,
                    items: order_items,
                }
            })
            .collect();

        Ok(Some(SessionWithOrders {
            session,
            table,
            orders,
        }))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
