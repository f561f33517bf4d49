//! # Bill Repository
//!
//! The append-only ledger. One row per completed payment event:
//!
//! ```text
//! purchase pay   ──► Bill { type: purchase, amount: order total, related_order }
//! create_sale    ──► Bill { type: sale,     amount: sale total,  related_order }
//! ```
//!
//! Rows are never updated; a schema trigger aborts any UPDATE, and
//! `(bill_type, related_order)` is UNIQUE. Deleting a row is left to manual
//! cleanup and nothing here does it.

use bookstore_core::query::{BillFilter, TextMatch};
use bookstore_core::{Bill, BillType, CoreError, Money, Operator, Page};
use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::filter::{fetch_page, Conditions};

const BILL_COLUMNS: &str =
    "id, bill_type, amount_cents, transaction_time, related_order, operator_id";

/// Repository for ledger entries.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Appends a ledger entry inside the caller's transaction.
    ///
    /// Only callable with an open transaction: the entry commits or rolls
    /// back together with the status change or sale that caused it.
    ///
    /// ## Returns
    /// * `Err(Domain(Duplicate))` - the order already has a bill of this type
    pub async fn record(
        tx: &mut Transaction<'_, Sqlite>,
        bill_type: BillType,
        amount: Money,
        related_order: i64,
        operator: &Operator,
    ) -> DbResult<Bill> {
        let transaction_time = Utc::now();

        debug!(
            bill_type = %bill_type.as_str(),
            amount_cents = amount.cents(),
            related_order,
            "Recording bill"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO bills (bill_type, amount_cents, transaction_time, related_order, operator_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(bill_type)
        .bind(amount.cents())
        .bind(transaction_time)
        .bind(related_order)
        .bind(&operator.employee_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => CoreError::duplicate(
                "Bill",
                format!("{} order {}", bill_type.as_str(), related_order),
            )
            .into(),
            other => other,
        })?;

        let bill = Bill {
            id: result.last_insert_rowid(),
            bill_type,
            amount_cents: amount.cents(),
            transaction_time,
            related_order,
            operator_id: operator.employee_id.clone(),
        };

        info!(
            bill_id = bill.id,
            bill_type = %bill_type.as_str(),
            amount = %amount,
            related_order,
            "Bill recorded"
        );

        Ok(bill)
    }

    /// Gets the bill of the given type for an order, if any.
    pub async fn for_order(&self, bill_type: BillType, related_order: i64) -> DbResult<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE bill_type = ? AND related_order = ?"
        ))
        .bind(bill_type)
        .bind(related_order)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bill)
    }

    /// Lists ledger entries matching the filter.
    pub async fn list(&self, filter: &BillFilter) -> DbResult<Page<Bill>> {
        let page = filter.validate()?;

        let mut conditions = Conditions::new();
        conditions
            .eq_text("bill_type", filter.bill_type.as_ref().map(BillType::as_str))
            .since("transaction_time", filter.start_date)
            .until("transaction_time", filter.end_date)
            .at_least("amount_cents", filter.min_amount)
            .at_most("amount_cents", filter.max_amount)
            .text(
                "operator_id",
                TextMatch::from_query(filter.operator_id.as_deref(), filter.exact_operator_id),
            )
            .eq_i64("related_order", filter.related_order);

        let order_by = format!(
            "{} {}, id {}",
            filter.sort_by.column(),
            filter.sort_order.as_sql(),
            filter.sort_order.as_sql()
        );

        fetch_page(&self.pool, BILL_COLUMNS, "bills", &conditions, &order_by, page).await
    }
}

/// Checks on the caller's connection whether an order has a bill.
pub(crate) async fn exists_for(
    conn: &mut SqliteConnection,
    bill_type: BillType,
    related_order: i64,
) -> DbResult<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM bills WHERE bill_type = ? AND related_order = ?)",
    )
    .bind(bill_type)
    .bind(related_order)
    .fetch_one(&mut *conn)
    .await?;

    Ok(exists)
}

// =============================================================================
// Unit Tests
// =============================================================================
