//! # Sale Repository
//!
//! Database operations for sale orders and their line items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE (one transaction)                                           │
//! │     └── load every book in the cart                                    │
//! │     └── SalePlan::build() → prices, stock check, total                 │
//! │     └── write_stock(-qty) per book (version checked)                   │
//! │     └── INSERT sale_orders, sale_items                                 │
//! │     └── BillRepository::record(sale, total)                            │
//! │                                                                         │
//! │  2. (OPTIONAL) UPDATE                                                  │
//! │     └── payment method / remark only                                   │
//! │                                                                         │
//! │  3. (OPTIONAL) DELETE                                                  │
//! │     └── refused once a bill exists                                     │
//! │     └── write_stock(+qty) per book, items go with the order (CASCADE)  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use bookstore_core::query::{SaleFilter, TextMatch};
use bookstore_core::sale::{transaction_number, SalePlan, SaleRequest};
use bookstore_core::validation::validate_remark;
use bookstore_core::{
    BillType, CoreError, Operator, Page, PaymentMethod, SaleItem, SaleItemDetail, SaleOrder,
    SaleOrderDetail, SaleUpdate,
};
use chrono::{Local, Utc};
use rand::Rng;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::bill::{exists_for, BillRepository};
use crate::repository::book::{load, write_stock};
use crate::repository::filter::{fetch_page, Conditions};

const SALE_COLUMNS: &str =
    "id, transaction_no, total_amount_cents, payment_method, remark, operator_id, created_at";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Records a sale: stock, order, lines and bill in one transaction.
    ///
    /// Sold prices are always the books' current retail prices. Nothing is
    /// written until every line has passed, and any failure rolls the whole
    /// sale back.
    ///
    /// ## Returns
    /// * `Err(Domain(EmptySale | SaleTooLarge | Validation))` - bad cart
    /// * `Err(Domain(BookNotFound))` - a line references an unknown ISBN
    /// * `Err(Domain(InsufficientStock))` - a line asks for more than is on hand
    /// * `Err(Domain(BookNotPriced))` - a book has no retail price
    /// * `Err(Domain(ConcurrentModification))` - a book changed mid-sale
    pub async fn create_sale(
        &self,
        request: &SaleRequest,
        operator: &Operator,
    ) -> DbResult<SaleOrderDetail> {
        SalePlan::check_cart(&request.items)?;
        validate_remark(request.remark.as_deref())?;

        let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
        let transaction_no = transaction_number(Local::now().naive_local(), suffix);

        debug!(
            transaction_no = %transaction_no,
            lines = request.items.len(),
            "Creating sale"
        );

        let mut tx = self.pool.begin().await?;

        let mut books = HashMap::new();
        for line in &request.items {
            if books.contains_key(&line.isbn) {
                continue;
            }
            if let Some(book) = load(&mut tx, &line.isbn).await? {
                books.insert(line.isbn.clone(), book);
            }
        }

        let plan = SalePlan::build(&request.items, &books)?;

        for change in &plan.stock_changes {
            write_stock(
                &mut tx,
                &change.isbn,
                change.expected_version,
                change.new_stock,
                None,
            )
            .await?;
        }

        let result = sqlx::query(
            r#"
            INSERT INTO sale_orders (
                transaction_no, total_amount_cents, payment_method, remark,
                operator_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&transaction_no)
        .bind(plan.total.cents())
        .bind(request.payment_method)
        .bind(&request.remark)
        .bind(&operator.employee_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                CoreError::duplicate("Transaction number", &transaction_no).into()
            }
            other => other,
        })?;

        let order_id = result.last_insert_rowid();

        for line in &plan.lines {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    order_id, isbn, quantity, sold_price_cents, total_amount_cents
                ) VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(order_id)
            .bind(&line.isbn)
            .bind(line.quantity)
            .bind(line.sold_price.cents())
            .bind(line.total.cents())
            .execute(&mut *tx)
            .await?;
        }

        BillRepository::record(&mut tx, BillType::Sale, plan.total, order_id, operator).await?;

        tx.commit().await?;

        info!(
            order_id,
            transaction_no = %transaction_no,
            total = %plan.total,
            "Sale completed"
        );

        self.get_sale(order_id).await
    }

    /// Deletes an unbilled sale and puts its stock back.
    ///
    /// ## Returns
    /// * `Err(Domain(SaleOrderNotFound))` - no such order
    /// * `Err(Domain(SaleAlreadyBilled))` - a sale bill references it
    pub async fn delete_sale(&self, order_id: i64) -> DbResult<()> {
        debug!(order_id, "Deleting sale");

        let mut tx = self.pool.begin().await?;

        load_order(&mut tx, order_id).await?;

        if exists_for(&mut tx, BillType::Sale, order_id).await? {
            return Err(CoreError::SaleAlreadyBilled { order_id }.into());
        }

        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, order_id, isbn, quantity, sold_price_cents, total_amount_cents
            FROM sale_items
            WHERE order_id = ?
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut *tx)
        .await?;

        // One write per book, even when it appears on several lines
        let mut restore: Vec<(String, i64)> = Vec::new();
        for item in items {
            match restore.iter_mut().find(|(isbn, _)| *isbn == item.isbn) {
                Some((_, quantity)) => *quantity += item.quantity,
                None => restore.push((item.isbn, item.quantity)),
            }
        }

        for (isbn, quantity) in &restore {
            let book = load(&mut tx, isbn)
                .await?
                .ok_or_else(|| CoreError::BookNotFound(isbn.clone()))?;
            write_stock(&mut tx, isbn, book.version, book.stock + quantity, None).await?;
        }

        sqlx::query("DELETE FROM sale_orders WHERE id = ?")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(order_id, books = restore.len(), "Sale deleted, stock restored");
        Ok(())
    }

    /// Changes the payment method and/or remark. `None` keeps the current value.
    pub async fn update_sale(&self, order_id: i64, update: &SaleUpdate) -> DbResult<SaleOrderDetail> {
        validate_remark(update.remark.as_deref())?;

        debug!(order_id, "Updating sale");

        let result = sqlx::query(
            r#"
            UPDATE sale_orders SET
                payment_method = COALESCE(?, payment_method),
                remark = COALESCE(?, remark)
            WHERE id = ?
            "#,
        )
        .bind(update.payment_method)
        .bind(&update.remark)
        .bind(order_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::SaleOrderNotFound(order_id).into());
        }

        self.get_sale(order_id).await
    }

    /// Gets an order with its lines and their book titles.
    pub async fn get_sale(&self, order_id: i64) -> DbResult<SaleOrderDetail> {
        let mut conn = self.pool.acquire().await?;

        let order = load_order(&mut conn, order_id).await?;

        let items = sqlx::query_as::<_, SaleItemDetail>(
            r#"
            SELECT
                i.isbn,
                b.title,
                i.quantity,
                i.sold_price_cents,
                i.total_amount_cents
            FROM sale_items i
            INNER JOIN books b ON b.isbn = i.isbn
            WHERE i.order_id = ?
            ORDER BY i.id
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(SaleOrderDetail { order, items })
    }

    /// Lists orders matching the filter, without their lines.
    pub async fn list_sales(&self, filter: &SaleFilter) -> DbResult<Page<SaleOrder>> {
        let page = filter.validate()?;

        let mut conditions = Conditions::new();
        conditions
            .text(
                "transaction_no",
                TextMatch::from_query(filter.transaction_no.as_deref(), filter.exact_transaction_no),
            )
            .eq_text("payment_method", filter.payment_method.as_ref().map(PaymentMethod::as_str))
            .text(
                "operator_id",
                TextMatch::from_query(filter.operator_id.as_deref(), filter.exact_operator_id),
            )
            .at_least("total_amount_cents", filter.min_amount)
            .at_most("total_amount_cents", filter.max_amount)
            .since("created_at", filter.start_date)
            .until("created_at", filter.end_date);

        let order_by = format!(
            "{} {}, id {}",
            filter.sort_by.column(),
            filter.sort_order.as_sql(),
            filter.sort_order.as_sql()
        );

        fetch_page(&self.pool, SALE_COLUMNS, "sale_orders", &conditions, &order_by, page).await
    }
}

async fn load_order(conn: &mut SqliteConnection, order_id: i64) -> DbResult<SaleOrder> {
    sqlx::query_as::<_, SaleOrder>(&format!(
        "SELECT {SALE_COLUMNS} FROM sale_orders WHERE id = ?"
    ))
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| CoreError::SaleOrderNotFound(order_id).into())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{operator, seed_book, test_db};
    use crate::Database;
    use bookstore_core::sale::SaleLine;
    use bookstore_core::{ErrorKind, Money};

    const RUST: &str = "9780000000001";
    const DUNE: &str = "9780000000002";

    fn cart(lines: &[(&str, i64)]) -> SaleRequest {
        SaleRequest {
            items: lines.iter().map(|(isbn, qty)| SaleLine::new(*isbn, *qty)).collect(),
            payment_method: Some(PaymentMethod::Cash),
            remark: None,
        }
    }

    async fn count(db: &Database, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_sale_decrements_stock_and_records_bill() {
        let db = test_db().await;
        seed_book(&db, RUST, 5, Some(2000)).await;

        let sale = db
            .sales()
            .create_sale(&cart(&[(RUST, 3)]), &operator("E1"))
            .await
            .unwrap();

        assert_eq!(sale.order.total_amount_cents, 6000);
        assert_eq!(sale.order.operator_id, "E1");
        assert!(sale.order.transaction_no.starts_with("SO"));
        assert_eq!(sale.order.transaction_no.len(), 22);
        assert_eq!(sale.items.len(), 1);
        assert_eq!(sale.items[0].sold_price_cents, 2000);
        assert_eq!(sale.items[0].title, format!("Book {RUST}"));

        assert_eq!(db.books().get(RUST).await.unwrap().stock, 2);

        let bill = db.bills().for_order(BillType::Sale, sale.order.id).await.unwrap().unwrap();
        assert_eq!(bill.amount_cents, 6000);
        assert_eq!(count(&db, "bills").await, 1);
    }

    #[tokio::test]
    async fn test_line_totals_match_order_total() {
        let db = test_db().await;
        seed_book(&db, RUST, 10, Some(999)).await;
        seed_book(&db, DUNE, 10, Some(1250)).await;

        let sale = db
            .sales()
            .create_sale(&cart(&[(RUST, 3), (DUNE, 2), (RUST, 1)]), &operator("E1"))
            .await
            .unwrap();

        assert_eq!(sale.items.len(), 3);
        assert_eq!(sale.items_total(), sale.order.total_amount());
        assert_eq!(sale.order.total_amount_cents, 999 * 4 + 1250 * 2);
        assert_eq!(db.books().get(RUST).await.unwrap().stock, 6);
        assert_eq!(db.books().get(DUNE).await.unwrap().stock, 8);
    }

    #[tokio::test]
    async fn test_insufficient_stock_changes_nothing() {
        let db = test_db().await;
        seed_book(&db, RUST, 10, Some(100)).await;
        seed_book(&db, DUNE, 2, Some(2000)).await;

        let err = db
            .sales()
            .create_sale(&cart(&[(RUST, 1), (DUNE, 3)]), &operator("E1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        assert_eq!(db.books().get(RUST).await.unwrap().stock, 10);
        assert_eq!(db.books().get(DUNE).await.unwrap().stock, 2);
        assert_eq!(count(&db, "sale_orders").await, 0);
        assert_eq!(count(&db, "sale_items").await, 0);
        assert_eq!(count(&db, "bills").await, 0);
    }

    #[tokio::test]
    async fn test_unknown_or_unpriced_book_rejected() {
        let db = test_db().await;
        seed_book(&db, RUST, 5, None).await;

        let err = db
            .sales()
            .create_sale(&cart(&[(DUNE, 1)]), &operator("E1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = db
            .sales()
            .create_sale(&cart(&[(RUST, 1)]), &operator("E1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        let err = db
            .sales()
            .create_sale(&cart(&[]), &operator("E1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_delete_billed_sale_conflicts() {
        let db = test_db().await;
        seed_book(&db, RUST, 5, Some(2000)).await;

        let sale = db
            .sales()
            .create_sale(&cart(&[(RUST, 2)]), &operator("E1"))
            .await
            .unwrap();

        let err = db.sales().delete_sale(sale.order.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(db.books().get(RUST).await.unwrap().stock, 3);
        assert!(db.sales().get_sale(sale.order.id).await.is_ok());

        let err = db.sales().delete_sale(999).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_sale_rolls_back_when_bill_insert_fails() {
        let db = test_db().await;
        seed_book(&db, RUST, 5, Some(2000)).await;

        // The first sale order gets id 1, whose bill key is already taken
        let mut tx = db.pool().begin().await.unwrap();
        BillRepository::record(&mut tx, BillType::Sale, Money::from_cents(100), 1, &operator("E9"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let err = db
            .sales()
            .create_sale(&cart(&[(RUST, 3)]), &operator("E1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        assert_eq!(db.books().get(RUST).await.unwrap().stock, 5);
        assert_eq!(count(&db, "sale_orders").await, 0);
        assert_eq!(count(&db, "sale_items").await, 0);
        assert_eq!(count(&db, "bills").await, 1);
    }

    #[tokio::test]
    async fn test_delete_after_bill_cleanup_restores_stock() {
        let db = test_db().await;
        seed_book(&db, RUST, 5, Some(2000)).await;

        let sale = db
            .sales()
            .create_sale(&cart(&[(RUST, 2)]), &operator("E1"))
            .await
            .unwrap();
        assert_eq!(db.books().get(RUST).await.unwrap().stock, 3);

        sqlx::query("DELETE FROM bills WHERE bill_type = 'sale' AND related_order = ?")
            .bind(sale.order.id)
            .execute(db.pool())
            .await
            .unwrap();

        db.sales().delete_sale(sale.order.id).await.unwrap();

        assert_eq!(db.books().get(RUST).await.unwrap().stock, 5);
        assert_eq!(count(&db, "sale_orders").await, 0);
        assert_eq!(count(&db, "sale_items").await, 0);
    }

    #[tokio::test]
    async fn test_delete_unbilled_sale_restores_stock() {
        let db = test_db().await;
        seed_book(&db, RUST, 1, Some(2000)).await;
        seed_book(&db, DUNE, 0, Some(500)).await;

        // A sale imported without a ledger entry
        let order_id = sqlx::query(
            r#"
            INSERT INTO sale_orders (transaction_no, total_amount_cents, operator_id, created_at)
            VALUES ('SO20240101000000000001', 5000, 'E1', '2024-01-01T00:00:00+00:00')
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap()
        .last_insert_rowid();

        for (isbn, qty, price) in [(RUST, 2, 2000), (DUNE, 1, 500), (RUST, 1, 500)] {
            sqlx::query(
                r#"
                INSERT INTO sale_items (order_id, isbn, quantity, sold_price_cents, total_amount_cents)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(order_id)
            .bind(isbn)
            .bind(qty)
            .bind(price)
            .bind(price * qty)
            .execute(db.pool())
            .await
            .unwrap();
        }

        db.sales().delete_sale(order_id).await.unwrap();

        assert_eq!(db.books().get(RUST).await.unwrap().stock, 4);
        assert_eq!(db.books().get(DUNE).await.unwrap().stock, 1);
        assert_eq!(count(&db, "sale_orders").await, 0);
        assert_eq!(count(&db, "sale_items").await, 0);
    }

    #[tokio::test]
    async fn test_update_sale_touches_only_soft_fields() {
        let db = test_db().await;
        seed_book(&db, RUST, 5, Some(2000)).await;

        let sale = db
            .sales()
            .create_sale(&cart(&[(RUST, 1)]), &operator("E1"))
            .await
            .unwrap();

        let updated = db
            .sales()
            .update_sale(
                sale.order.id,
                &SaleUpdate {
                    payment_method: Some(PaymentMethod::Mobile),
                    remark: Some("gift wrap".into()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.order.payment_method, Some(PaymentMethod::Mobile));
        assert_eq!(updated.order.remark.as_deref(), Some("gift wrap"));
        assert_eq!(updated.order.total_amount_cents, sale.order.total_amount_cents);
        assert_eq!(updated.items, sale.items);

        // Omitted fields keep their values
        let again = db
            .sales()
            .update_sale(sale.order.id, &SaleUpdate::default())
            .await
            .unwrap();
        assert_eq!(again.order.remark.as_deref(), Some("gift wrap"));

        let err = db
            .sales()
            .update_sale(404, &SaleUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_sales_filters() {
        let db = test_db().await;
        seed_book(&db, RUST, 50, Some(1000)).await;

        let small = db
            .sales()
            .create_sale(&cart(&[(RUST, 1)]), &operator("E1"))
            .await
            .unwrap();
        let mut big = cart(&[(RUST, 10)]);
        big.payment_method = Some(PaymentMethod::BankCard);
        db.sales().create_sale(&big, &operator("E2")).await.unwrap();

        let page = db.sales().list_sales(&SaleFilter::default()).await.unwrap();
        assert_eq!(page.total, 2);
        // Newest first
        assert_ne!(page.items[0].id, small.order.id);

        let card = db
            .sales()
            .list_sales(&SaleFilter {
                payment_method: Some(PaymentMethod::BankCard),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(card.total, 1);
        assert_eq!(card.items[0].total_amount_cents, 10_000);

        let exact = db
            .sales()
            .list_sales(&SaleFilter {
                transaction_no: Some(small.order.transaction_no.clone()),
                exact_transaction_no: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(exact.items.len(), 1);
        assert_eq!(exact.items[0].id, small.order.id);
    }
}
