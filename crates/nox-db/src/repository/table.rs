//! # Table Repository
//!
//! Database operations for venue tables, including the occupancy
//! compare-and-set that serializes concurrent check-ins.
//!
//! ## Occupancy CAS
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Two devices check in to table 12 at once                   │
//! │                                                                         │
//! │  Device A: UPDATE ... SET status='occupied'                            │
//! │            WHERE id=? AND status='available'   → 1 row   ✓ wins        │
//! │                                                                         │
//! │  Device B: UPDATE ... SET status='occupied'                            │
//! │            WHERE id=? AND status='available'   → 0 rows  ✗ loses       │
//! │                                                                         │
//! │  The guard in the WHERE clause is the whole mechanism. No lock         │
//! │  table, no retry loop; the loser gets a Conflict and the service       │
//! │  layer reports "table unavailable".                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use nox_core::{TableStatus, VenueTable};

const SELECT_COLUMNS: &str = r#"
    SELECT id, venue_id, table_number, seat_count, zone,
           status, created_at, updated_at
    FROM venue_tables
"#;

/// Repository for venue-table database operations.
#[derive(Debug, Clone)]
pub struct TableRepository {
    pool: SqlitePool,
}

impl TableRepository {
    /// Creates a new TableRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TableRepository { pool }
    }

    /// Gets a table by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<VenueTable>> {
        let table = sqlx::query_as::<_, VenueTable>(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(table)
    }

    /// Lists all tables for a venue, ordered by table number.
    pub async fn list_by_venue(&self, venue_id: &str) -> DbResult<Vec<VenueTable>> {
        let tables = sqlx::query_as::<_, VenueTable>(&format!(
            "{SELECT_COLUMNS} WHERE venue_id = ?1 ORDER BY table_number"
        ))
        .bind(venue_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tables)
    }

    /// Inserts a table.
    pub async fn insert(&self, table: &VenueTable) -> DbResult<()> {
        debug!(id = %table.id, table_number = table.table_number, "Inserting venue table");

        sqlx::query(
            r#"
            INSERT INTO venue_tables (
                id, venue_id, table_number, seat_count, zone,
                status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&table.id)
        .bind(&table.venue_id)
        .bind(table.table_number)
        .bind(table.seat_count)
        .bind(&table.zone)
        .bind(table.status)
        .bind(table.created_at)
        .bind(table.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Marks a table occupied, but only if it is currently available.
    ///
    /// This is the compare-and-set that serializes concurrent check-ins:
    /// the status guard in the WHERE clause means exactly one of N
    /// racing callers sees `rows_affected == 1`.
    ///
    /// ## Errors
    /// `Conflict` if the table is not `available` (occupied, reserved,
    /// or under maintenance), or does not exist. The service layer
    /// disambiguates with a follow-up fetch.
    pub async fn occupy(&self, table_id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE venue_tables SET
                status = 'occupied',
                updated_at = ?2
            WHERE id = ?1 AND status = 'available'
            "#,
        )
        .bind(table_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Table", table_id, "available"));
        }

        debug!(table_id = %table_id, "Table occupied");
        Ok(())
    }

    /// Releases a table back to available when its session ends.
    ///
    /// Guarded on `occupied` so a stray double-release (or a release
    /// racing a maintenance flag) is a no-op rather than a stomp.
    pub async fn release(&self, table_id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE venue_tables SET
                status = 'available',
                updated_at = ?2
            WHERE id = ?1 AND status = 'occupied'
            "#,
        )
        .bind(table_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Table", table_id, "occupied"));
        }

        debug!(table_id = %table_id, "Table released");
        Ok(())
    }

    /// Sets a table's status directly (reserved, maintenance).
    ///
    /// Used by floor management, not by the session lifecycle; the
    /// lifecycle goes through `occupy`/`release`.
    pub async fn set_status(&self, table_id: &str, status: TableStatus) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE venue_tables SET
                status = ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(table_id)
        .bind(status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Table", table_id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn test_table(number: i64) -> VenueTable {
        let now = Utc::now();
        VenueTable {
            id: Uuid::new_v4().to_string(),
            venue_id: "venue-1".to_string(),
            table_number: number,
            seat_count: 4,
            zone: None,
            status: TableStatus::Available,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let table = test_table(12);

        db.tables().insert(&table).await.unwrap();

        let loaded = db.tables().get_by_id(&table.id).await.unwrap().unwrap();
        assert_eq!(loaded.table_number, 12);
        assert_eq!(loaded.status, TableStatus::Available);
    }

    #[tokio::test]
    async fn test_occupy_succeeds_once() {
        let db = test_db().await;
        let table = test_table(7);
        db.tables().insert(&table).await.unwrap();

        db.tables().occupy(&table.id).await.unwrap();

        // Second occupy loses the guard
        let err = db.tables().occupy(&table.id).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_release_requires_occupied() {
        let db = test_db().await;
        let table = test_table(3);
        db.tables().insert(&table).await.unwrap();

        let err = db.tables().release(&table.id).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        db.tables().occupy(&table.id).await.unwrap();
        db.tables().release(&table.id).await.unwrap();

        let loaded = db.tables().get_by_id(&table.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, TableStatus::Available);
    }

    #[tokio::test]
    async fn test_occupy_missing_table_conflicts() {
        let db = test_db().await;
        let err = db.tables().occupy("no-such-table").await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_list_by_venue_ordered() {
        let db = test_db().await;
        for n in [5, 1, 3] {
            db.tables().insert(&test_table(n)).await.unwrap();
        }

        let tables = db.tables().list_by_venue("venue-1").await.unwrap();
        let numbers: Vec<i64> = tables.iter().map(|t| t.table_number).collect();
        assert_eq!(numbers, vec![1, 3, 5]);
    }
}
