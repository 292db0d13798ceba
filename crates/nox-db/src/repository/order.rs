//! # Order Repository
//!
//! Database operations for session orders and their line items.
//!
//! ## Order Number Assignment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │             Monotonic order numbers within a session                    │
//! │                                                                         │
//! │  BEGIN TRANSACTION                                                     │
//! │    next = SELECT COALESCE(MAX(order_number), 0) + 1                    │
//! │           FROM session_orders WHERE session_id = ?                     │
//! │    INSERT session_orders (..., order_number = next)                    │
//! │    INSERT session_order_items × N                                      │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  MAX+1 inside the transaction keeps numbers gapless and strictly       │
//! │  increasing; UNIQUE(session_id, order_number) is the backstop if       │
//! │  two inserts ever interleave.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use nox_core::{ItemStatus, NewOrderItem, OrderStatus, OrderWithItems, SessionOrder, SessionOrderItem};

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Creates an order with its items in a single transaction.
    ///
    /// The order number is assigned inside the transaction so it is
    /// strictly increasing within the session and never reused, even
    /// under concurrent submissions.
    ///
    /// Orders are born `Confirmed`: submission from the floor tablet IS
    /// the confirmation. Items are born `Pending`.
    pub async fn create_order(
        &self,
        session_id: &str,
        notes: Option<String>,
        items: Vec<NewOrderItem>,
    ) -> DbResult<OrderWithItems> {
        let now = Utc::now();
        let order_id = Uuid::new_v4().to_string();

        let mut tx = self.pool.begin().await?;

        let order_number: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(MAX(order_number), 0) + 1
            FROM session_orders
            WHERE session_id = ?1
            "#,
        )
        .bind(session_id)
        .fetch_one(&mut *tx)
        .await?;

        let order = SessionOrder {
            id: order_id.clone(),
            session_id: session_id.to_string(),
            order_number,
            status: OrderStatus::Confirmed,
            notes,
            confirmed_at: Some(now),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO session_orders (
                id, session_id, order_number, status, notes,
                confirmed_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&order.id)
        .bind(&order.session_id)
        .bind(order.order_number)
        .bind(order.status)
        .bind(&order.notes)
        .bind(order.confirmed_at)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        let mut inserted = Vec::with_capacity(items.len());
        for new_item in items {
            let item = SessionOrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order_id.clone(),
                menu_item_id: new_item.menu_item_id,
                name: new_item.name,
                quantity: new_item.quantity,
                unit_price_minor: new_item.unit_price_minor,
                modifiers: new_item.modifiers,
                notes: new_item.notes,
                destination: new_item.destination,
                status: ItemStatus::Pending,
                served_at: None,
                created_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO session_order_items (
                    id, order_id, menu_item_id, name, quantity,
                    unit_price_minor, modifiers, notes, destination,
                    status, served_at, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.menu_item_id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.unit_price_minor)
            .bind(&item.modifiers)
            .bind(&item.notes)
            .bind(item.destination)
            .bind(item.status)
            .bind(item.served_at)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;

            inserted.push(item);
        }

        tx.commit().await?;

        debug!(
            session_id = %session_id,
            order_number = order_number,
            items = inserted.len(),
            "Order created"
        );

        Ok(OrderWithItems {
            order,
            items: inserted,
        })
    }

    /// Gets an order by ID.
    pub async fn get_order(&self, order_id: &str) -> DbResult<Option<SessionOrder>> {
        let order = sqlx::query_as::<_, SessionOrder>(
            r#"
            SELECT id, session_id, order_number, status, notes,
                   confirmed_at, created_at
            FROM session_orders
            WHERE id = ?1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets an item by ID.
    pub async fn get_item(&self, item_id: &str) -> DbResult<Option<SessionOrderItem>> {
        let item = sqlx::query_as::<_, SessionOrderItem>(
            r#"
            SELECT id, order_id, menu_item_id, name, quantity,
                   unit_price_minor, modifiers, notes, destination,
                   status, served_at, created_at
            FROM session_order_items
            WHERE id = ?1
            "#,
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists all items of an order, oldest first.
    pub async fn list_items(&self, order_id: &str) -> DbResult<Vec<SessionOrderItem>> {
        let items = sqlx::query_as::<_, SessionOrderItem>(
            r#"
            SELECT id, order_id, menu_item_id, name, quantity,
                   unit_price_minor, modifiers, notes, destination,
                   status, served_at, created_at
            FROM session_order_items
            WHERE order_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Moves an order from `from` to `to`, guarded on `from`.
    pub async fn transition_order(
        &self,
        order_id: &str,
        from: OrderStatus,
        to: OrderStatus,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE session_orders SET
                status = ?3
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(order_id)
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict(
                "Order",
                order_id,
                format!("{:?}", from).to_lowercase(),
            ));
        }

        Ok(())
    }

    /// Moves an item from `from` to `to`, guarded on `from`.
    ///
    /// Stamps `served_at` when the item reaches `Served`.
    pub async fn transition_item(
        &self,
        item_id: &str,
        from: ItemStatus,
        to: ItemStatus,
    ) -> DbResult<()> {
        let served_at = if to == ItemStatus::Served {
            Some(Utc::now())
        } else {
            None
        };

        let result = sqlx::query(
            r#"
            UPDATE session_order_items SET
                status = ?3,
                served_at = COALESCE(?4, served_at)
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(item_id)
        .bind(from)
        .bind(to)
        .bind(served_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict(
                "Item",
                item_id,
                format!("{:?}", from).to_lowercase(),
            ));
        }

        Ok(())
    }

    /// Cancels an order and cascades to its items.
    ///
    /// ## Cascade Rule
    /// Every non-served item becomes `cancelled`, including items
    /// already `ready`. Served items keep their status: the plate is
    /// on the table, and whether it is billed is handled as a
    /// post-hoc invoice discount.
    ///
    /// Order guard and item cascade run in one transaction.
    pub async fn cancel_order(&self, order_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE session_orders SET
                status = 'cancelled'
            WHERE id = ?1 AND status NOT IN ('served', 'cancelled')
            "#,
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Order", order_id, "cancellable"));
        }

        sqlx::query(
            r#"
            UPDATE session_order_items SET
                status = 'cancelled'
            WHERE order_id = ?1 AND status NOT IN ('served', 'cancelled')
            "#,
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(order_id = %order_id, "Order cancelled with item cascade");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
