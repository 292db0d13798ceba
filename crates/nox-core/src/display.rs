//! # Destination Display Projection
//!
//! Read-only projection that groups a venue's open order items by
//! production destination (kitchen/bar) for staff fulfillment screens.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Destination Display (read-only)                        │
//! │                                                                         │
//! │  Open sessions (fresh snapshot)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  project_destination(sessions, Kitchen)                                │
//! │       │                                                                 │
//! │       ├── drop cancelled orders                                        │
//! │       ├── keep items routed to Kitchen that still need work            │
//! │       ├── one group per order, oldest waiting first                    │
//! │       ▼                                                                 │
//! │  [ Table 7 · order #2 · 12min ● high ]   ← wait banding per poll       │
//! │  [ walk-in · order #1 ·  3min ● normal ]                               │
//! │                                                                         │
//! │  No stored state: recomputed on every poll, independent of billing.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{Destination, ItemStatus, SessionOrderItem, SessionWithOrders};

// =============================================================================
// Wait Priority
// =============================================================================

/// Presentational urgency band for a waiting order.
///
/// A pure function of "now − oldest item creation time"; recomputed on
/// every poll, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum WaitPriority {
    /// Under 5 minutes.
    Normal,
    /// 5 to 10 minutes.
    Elevated,
    /// 10 to 15 minutes.
    High,
    /// 15 minutes or more.
    Critical,
}

impl WaitPriority {
    /// Bands a wait duration into a priority.
    pub fn from_wait(age: Duration) -> Self {
        let minutes = age.num_minutes();
        if minutes < 5 {
            WaitPriority::Normal
        } else if minutes < 10 {
            WaitPriority::Elevated
        } else if minutes < 15 {
            WaitPriority::High
        } else {
            WaitPriority::Critical
        }
    }
}

// =============================================================================
// Grouped Orders
// =============================================================================

/// One order's outstanding items for a single destination.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DestinationGroup {
    pub session_id: String,
    pub order_id: String,
    pub order_number: i64,
    /// Table number for seated sessions; None ⇒ walk-in.
    pub table_number: Option<i64>,
    pub is_walk_in: bool,
    /// Earliest creation time among the matching items (sort key).
    #[ts(as = "String")]
    pub waiting_since: DateTime<Utc>,
    /// Items routed to the requested destination that still need
    /// production work. Items for the other destination are excluded
    /// even though they belong to the same order.
    pub items: Vec<SessionOrderItem>,
}

impl DestinationGroup {
    /// Current urgency band for this group.
    pub fn priority(&self, now: DateTime<Utc>) -> WaitPriority {
        WaitPriority::from_wait(now - self.waiting_since)
    }
}

/// Item counts by status across a whole projection.
///
/// Drives a dashboard badge, never billing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub pending: usize,
    pub preparing: usize,
    pub ready: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.preparing + self.ready
    }
}

// =============================================================================
// Projection
// =============================================================================

/// A finite, restartable sequence of destination groups.
///
/// Built fresh per poll from a session snapshot; iterating it consumes
/// nothing, so staff screens can walk it as many times as they like.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DestinationProjection {
    pub destination: Destination,
    pub groups: Vec<DestinationGroup>,
}

impl DestinationProjection {
    pub fn iter(&self) -> std::slice::Iter<'_, DestinationGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Counts outstanding items by status across all groups.
    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for item in self.groups.iter().flat_map(|g| g.items.iter()) {
            match item.status {
                ItemStatus::Pending => counts.pending += 1,
                ItemStatus::Preparing => counts.preparing += 1,
                ItemStatus::Ready => counts.ready += 1,
                // Served/cancelled items never enter the projection
                ItemStatus::Served | ItemStatus::Cancelled => {}
            }
        }
        counts
    }
}

impl IntoIterator for DestinationProjection {
    type Item = DestinationGroup;
    type IntoIter = std::vec::IntoIter<DestinationGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

/// Projects a venue's sessions onto one destination display.
///
/// One group per non-cancelled order that has at least one item routed
/// to `destination` and still needing production work. Groups are
/// ordered by earliest matching-item creation time ascending, so the
/// longest wait is always at the top of the screen.
pub fn project_destination(
    sessions: &[SessionWithOrders],
    destination: Destination,
) -> DestinationProjection {
    let mut groups: Vec<DestinationGroup> = Vec::new();

    for session in sessions {
        for order in &session.orders {
            if !order.order.status.is_billable() {
                // Cancelled orders leave the board entirely
                continue;
            }

            let items: Vec<SessionOrderItem> = order
                .items
                .iter()
                .filter(|item| item.destination == destination && item.status.needs_production())
                .cloned()
                .collect();

            let Some(waiting_since) = items.iter().map(|i| i.created_at).min() else {
                continue;
            };

            groups.push(DestinationGroup {
                session_id: session.session.id.clone(),
                order_id: order.order.id.clone(),
                order_number: order.order.order_number,
                table_number: session.table_number(),
                is_walk_in: session.session.is_walk_in(),
                waiting_since,
                items,
            });
        }
    }

    groups.sort_by_key(|g| g.waiting_since);

    DestinationProjection {
        destination,
        groups,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        OrderStatus, OrderWithItems, SessionOrder, SessionStatus, TableSession, TableStatus,
        VenueTable,
    };

    fn item(
        id: &str,
        destination: Destination,
        status: ItemStatus,
        created_at: DateTime<Utc>,
    ) -> SessionOrderItem {
        SessionOrderItem {
            id: id.to_string(),
            order_id: "o-1".to_string(),
            menu_item_id: None,
            name: "Nachos".to_string(),
            quantity: 1,
            unit_price_minor: 45_000,
            modifiers: None,
            notes: None,
            destination,
            status,
            served_at: None,
            created_at,
        }
    }

    fn order(id: &str, number: i64, status: OrderStatus, items: Vec<SessionOrderItem>) -> OrderWithItems {
        OrderWithItems {
            order: SessionOrder {
                id: id.to_string(),
                session_id: "s-1".to_string(),
                order_number: number,
                status,
                notes: None,
                confirmed_at: None,
                created_at: Utc::now(),
            },
            items,
        }
    }

    fn session(table: Option<VenueTable>, orders: Vec<OrderWithItems>) -> SessionWithOrders {
        SessionWithOrders {
            session: TableSession {
                id: "s-1".to_string(),
                venue_id: "v-1".to_string(),
                table_id: table.as_ref().map(|t| t.id.clone()),
                booking_id: None,
                status: SessionStatus::Open,
                guest_count: 2,
                guest_name: None,
                notes: None,
                opened_by: "staff-1".to_string(),
                closed_by: None,
                opened_at: Utc::now(),
                closed_at: None,
            },
            table,
            orders,
        }
    }

    fn table_seven() -> VenueTable {
        VenueTable {
            id: "t-7".to_string(),
            venue_id: "v-1".to_string(),
            table_number: 7,
            seat_count: 4,
            zone: None,
            status: TableStatus::Occupied,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_wait_priority_bands() {
        assert_eq!(WaitPriority::from_wait(Duration::minutes(0)), WaitPriority::Normal);
        assert_eq!(WaitPriority::from_wait(Duration::minutes(4)), WaitPriority::Normal);
        assert_eq!(WaitPriority::from_wait(Duration::minutes(5)), WaitPriority::Elevated);
        assert_eq!(WaitPriority::from_wait(Duration::minutes(9)), WaitPriority::Elevated);
        assert_eq!(WaitPriority::from_wait(Duration::minutes(10)), WaitPriority::High);
        assert_eq!(WaitPriority::from_wait(Duration::minutes(14)), WaitPriority::High);
        assert_eq!(WaitPriority::from_wait(Duration::minutes(15)), WaitPriority::Critical);
        assert_eq!(WaitPriority::from_wait(Duration::hours(2)), WaitPriority::Critical);
    }

    #[test]
    fn test_projection_filters_by_destination() {
        let now = Utc::now();
        let sessions = vec![session(
            Some(table_seven()),
            vec![order(
                "o-1",
                1,
                OrderStatus::Confirmed,
                vec![
                    item("i-1", Destination::Bar, ItemStatus::Pending, now),
                    item("i-2", Destination::Kitchen, ItemStatus::Pending, now),
                ],
            )],
        )];

        let bar = project_destination(&sessions, Destination::Bar);
        assert_eq!(bar.len(), 1);
        assert_eq!(bar.groups[0].items.len(), 1);
        assert_eq!(bar.groups[0].items[0].id, "i-1");
        assert_eq!(bar.groups[0].table_number, Some(7));
        assert!(!bar.groups[0].is_walk_in);
    }

    #[test]
    fn test_projection_drops_served_and_cancelled_items() {
        let now = Utc::now();
        let sessions = vec![session(
            None,
            vec![order(
                "o-1",
                1,
                OrderStatus::Confirmed,
                vec![
                    item("i-1", Destination::Bar, ItemStatus::Served, now),
                    item("i-2", Destination::Bar, ItemStatus::Cancelled, now),
                ],
            )],
        )];

        let bar = project_destination(&sessions, Destination::Bar);
        assert!(bar.is_empty());
    }

    #[test]
    fn test_projection_drops_cancelled_orders() {
        let now = Utc::now();
        let sessions = vec![session(
            None,
            vec![order(
                "o-1",
                1,
                OrderStatus::Cancelled,
                vec![item("i-1", Destination::Kitchen, ItemStatus::Pending, now)],
            )],
        )];

        let kitchen = project_destination(&sessions, Destination::Kitchen);
        assert!(kitchen.is_empty());
    }

    #[test]
    fn test_projection_orders_oldest_wait_first() {
        let now = Utc::now();
        let sessions = vec![session(
            None,
            vec![
                order(
                    "o-new",
                    2,
                    OrderStatus::Confirmed,
                    vec![item("i-new", Destination::Kitchen, ItemStatus::Pending, now)],
                ),
                order(
                    "o-old",
                    1,
                    OrderStatus::Confirmed,
                    vec![item(
                        "i-old",
                        Destination::Kitchen,
                        ItemStatus::Preparing,
                        now - Duration::minutes(12),
                    )],
                ),
            ],
        )];

        let kitchen = project_destination(&sessions, Destination::Kitchen);
        assert_eq!(kitchen.len(), 2);
        assert_eq!(kitchen.groups[0].order_id, "o-old");
        assert_eq!(kitchen.groups[0].priority(now), WaitPriority::High);
        assert_eq!(kitchen.groups[1].order_id, "o-new");
        assert_eq!(kitchen.groups[1].priority(now), WaitPriority::Normal);
    }

    #[test]
    fn test_walk_in_flag() {
        let now = Utc::now();
        let sessions = vec![session(
            None,
            vec![order(
                "o-1",
                1,
                OrderStatus::Confirmed,
                vec![item("i-1", Destination::Kitchen, ItemStatus::Pending, now)],
            )],
        )];

        let kitchen = project_destination(&sessions, Destination::Kitchen);
        assert!(kitchen.groups[0].is_walk_in);
        assert_eq!(kitchen.groups[0].table_number, None);
    }

    #[test]
    fn test_status_counts() {
        let now = Utc::now();
        let sessions = vec![session(
            None,
            vec![order(
                "o-1",
                1,
                OrderStatus::Confirmed,
                vec![
                    item("i-1", Destination::Bar, ItemStatus::Pending, now),
                    item("i-2", Destination::Bar, ItemStatus::Pending, now),
                    item("i-3", Destination::Bar, ItemStatus::Preparing, now),
                    item("i-4", Destination::Bar, ItemStatus::Ready, now),
                ],
            )],
        )];

        let counts = project_destination(&sessions, Destination::Bar).status_counts();
        assert_eq!(counts.pending, 2);
        assert_eq!(counts.preparing, 1);
        assert_eq!(counts.ready, 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn test_projection_is_restartable() {
        let now = Utc::now();
        let sessions = vec![session(
            None,
            vec![order(
                "o-1",
                1,
                OrderStatus::Confirmed,
                vec![item("i-1", Destination::Bar, ItemStatus::Pending, now)],
            )],
        )];

        let projection = project_destination(&sessions, Destination::Bar);
        let first_pass: Vec<_> = projection.iter().map(|g| g.order_id.clone()).collect();
        let second_pass: Vec<_> = projection.iter().map(|g| g.order_id.clone()).collect();
        assert_eq!(first_pass, second_pass);
    }
}
