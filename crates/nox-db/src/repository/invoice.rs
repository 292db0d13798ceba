//! # Invoice Repository
//!
//! Database operations for session invoices and the per-venue invoice
//! number counter.
//!
//! ## Number Reservation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Monotonic invoice numbers per venue                     │
//! │                                                                         │
//! │  INSERT INTO invoice_counters (venue_id, next_value)                   │
//! │  VALUES (?, 2)                                                         │
//! │  ON CONFLICT(venue_id) DO UPDATE SET next_value = next_value + 1       │
//! │  RETURNING next_value                                                  │
//! │                                                                         │
//! │  One statement reserves AND returns; two concurrent generations        │
//! │  can never observe the same sequence value. Numbers reserved for       │
//! │  invoices that later fail to insert are burned, not reused; a gap      │
//! │  is harmless, a duplicate is not (UNIQUE(invoice_number) agrees).      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use nox_core::SessionInvoice;

const SELECT_COLUMNS: &str = r#"
    SELECT id, session_id, invoice_number, subtotal_minor, tax_minor,
           service_charge_minor, discount_minor, discount_reason,
           deposit_credit_minor, tip_minor, total_minor, amount_paid_minor,
           status, guest_name, guest_phone, guest_email, guest_user_id,
           generated_at, voided_at, void_reason
    FROM session_invoices
"#;

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Reserves the next invoice sequence number for a venue.
    ///
    /// Atomic upsert-and-return; see the module docs. The caller
    /// formats the returned sequence with [`format_invoice_number`].
    pub async fn reserve_number(&self, venue_id: &str) -> DbResult<i64> {
        let next: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoice_counters (venue_id, next_value)
            VALUES (?1, 2)
            ON CONFLICT(venue_id) DO UPDATE SET next_value = next_value + 1
            RETURNING next_value
            "#,
        )
        .bind(venue_id)
        .fetch_one(&self.pool)
        .await?;

        // next_value is the NEXT free sequence; what we reserved is one less
        Ok(next - 1)
    }

    /// Inserts an invoice.
    pub async fn insert(&self, invoice: &SessionInvoice) -> DbResult<()> {
        debug!(
            id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            total_minor = invoice.total_minor,
            "Inserting invoice"
        );

        sqlx::query(
            r#"
            INSERT INTO session_invoices (
                id, session_id, invoice_number, subtotal_minor, tax_minor,
                service_charge_minor, discount_minor, discount_reason,
                deposit_credit_minor, tip_minor, total_minor, amount_paid_minor,
                status, guest_name, guest_phone, guest_email, guest_user_id,
                generated_at, voided_at, void_reason
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8,
                ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17,
                ?18, ?19, ?20
            )
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.session_id)
        .bind(&invoice.invoice_number)
        .bind(invoice.subtotal_minor)
        .bind(invoice.tax_minor)
        .bind(invoice.service_charge_minor)
        .bind(invoice.discount_minor)
        .bind(&invoice.discount_reason)
        .bind(invoice.deposit_credit_minor)
        .bind(invoice.tip_minor)
        .bind(invoice.total_minor)
        .bind(invoice.amount_paid_minor)
        .bind(invoice.status)
        .bind(&invoice.guest_name)
        .bind(&invoice.guest_phone)
        .bind(&invoice.guest_email)
        .bind(&invoice.guest_user_id)
        .bind(invoice.generated_at)
        .bind(invoice.voided_at)
        .bind(&invoice.void_reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets an invoice by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<SessionInvoice>> {
        let invoice =
            sqlx::query_as::<_, SessionInvoice>(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(invoice)
    }

    /// Lists all invoices for a session, oldest first.
    pub async fn list_by_session(&self, session_id: &str) -> DbResult<Vec<SessionInvoice>> {
        let invoices = sqlx::query_as::<_, SessionInvoice>(&format!(
            "{SELECT_COLUMNS} WHERE session_id = ?1 ORDER BY generated_at, invoice_number"
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }

    /// Applies a discount to an amendable invoice and sets the new total.
    ///
    /// Only `draft` and `pending` invoices can be amended; everything
    /// else has money against it (or is void) and stays frozen.
    pub async fn apply_discount(
        &self,
        invoice_id: &str,
        discount_minor: i64,
        reason: Option<&str>,
        new_total_minor: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE session_invoices SET
                discount_minor = ?2,
                discount_reason = ?3,
                total_minor = ?4
            WHERE id = ?1 AND status IN ('draft', 'pending')
            "#,
        )
        .bind(invoice_id)
        .bind(discount_minor)
        .bind(reason)
        .bind(new_total_minor)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Invoice", invoice_id, "amendable"));
        }

        Ok(())
    }

    /// Records a payment against an invoice.
    ///
    /// Single atomic statement: increments `amount_paid` and flips the
    /// status to `paid` when the running total covers the invoice, or
    /// `partially_paid` otherwise.
    pub async fn record_payment(&self, invoice_id: &str, amount_minor: i64) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE session_invoices SET
                amount_paid_minor = amount_paid_minor + ?2,
                status = CASE
                    WHEN amount_paid_minor + ?2 >= total_minor THEN 'paid'
                    ELSE 'partially_paid'
                END
            WHERE id = ?1 AND status IN ('pending', 'partially_paid')
            "#,
        )
        .bind(invoice_id)
        .bind(amount_minor)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Invoice", invoice_id, "payable"));
        }

        debug!(invoice_id = %invoice_id, amount_minor = amount_minor, "Payment recorded");
        Ok(())
    }

    /// Voids an invoice with a reason.
    ///
    /// Paid invoices cannot be voided; that is a refund, which lives
    /// with the payment settlement collaborator.
    pub async fn void(&self, invoice_id: &str, reason: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE session_invoices SET
                status = 'void',
                voided_at = ?2,
                void_reason = ?3
            WHERE id = ?1 AND status NOT IN ('paid', 'void')
            "#,
        )
        .bind(invoice_id)
        .bind(now)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Invoice", invoice_id, "voidable"));
        }

        debug!(invoice_id = %invoice_id, reason = %reason, "Invoice voided");
        Ok(())
    }

    /// Voids every unpaid invoice of a session. Used on regeneration:
    /// the new invoice supersedes whatever was outstanding.
    ///
    /// Returns the number of invoices voided (zero is fine).
    pub async fn void_unpaid_for_session(&self, session_id: &str, reason: &str) -> DbResult<u64> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE session_invoices SET
                status = 'void',
                voided_at = ?2,
                void_reason = ?3
            WHERE session_id = ?1 AND status NOT IN ('paid', 'void')
            "#,
        )
        .bind(session_id)
        .bind(now)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Checks whether the session's bill is fully settled: at least one
    /// non-void invoice exists and none of them is still owed money.
    pub async fn all_settled(&self, session_id: &str) -> DbResult<bool> {
        let (active, unpaid): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status != 'void'),
                COUNT(*) FILTER (WHERE status NOT IN ('void', 'paid'))
            FROM session_invoices
            WHERE session_id = ?1
            "#,
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(active > 0 && unpaid == 0)
    }
}

/// Formats an invoice sequence number as `INV-NNNNNN`.
///
/// Split invoices append `-k/N` to this base; the base is shared by
/// every member of the split set.
pub fn format_invoice_number(seq: i64) -> String {
    format!("INV-{:06}", seq)
}

// =============================================================================
// Unit Tests
// =============================================================================
