//! # Purchase Order Repository
//!
//! Transactional lifecycle of restocking orders.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Purchase Order Lifecycle                            │
//! │                                                                         │
//! │  create()  ──► unpaid      (registers the book first if it is new)     │
//! │                  │                                                      │
//! │        ┌─────────┴──────────┐                                           │
//! │        ▼                    ▼                                           │
//! │  pay() ──► paid       return_order() ──► returned (terminal)           │
//! │        │  + Bill(purchase, total)                                       │
//! │        ▼                                                                │
//! │  arrive() ──► arrived (terminal)                                       │
//! │           + book.stock += quantity                                      │
//! │           + retail price, only if the book has none yet                 │
//! │                                                                         │
//! │  Each arrow is one transaction:                                        │
//! │    load order → PurchaseStatus::apply(action)                           │
//! │    → UPDATE … WHERE id = ? AND status = <loaded status>                 │
//! │    → side effects (bill / stock) → COMMIT                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bookstore_core::query::{PurchaseFilter, TextMatch};
use bookstore_core::validation::{
    validate_book_info, validate_isbn, validate_positive_cents, validate_quantity,
};
use bookstore_core::{
    BillType, Book, CoreError, Money, Operator, Page, PurchaseAction, PurchaseArrival,
    PurchaseOrder, PurchaseOrderRequest, PurchasePayment, PurchaseStatus, ValidationError,
};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::bill::BillRepository;
use crate::repository::book::{insert_book, load, write_stock};
use crate::repository::filter::{fetch_page, Conditions};

const PURCHASE_COLUMNS: &str = "id, isbn, purchase_price_cents, quantity, total_amount_cents, \
     order_date, status, created_by, settled_by, received_by";

/// Repository for purchase orders.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.purchases();
///
/// let order = repo.create(&request, &operator).await?;
/// let PurchasePayment { order, bill } = repo.pay(order.id, &operator).await?;
/// let PurchaseArrival { order, book } = repo.arrive(order.id, &operator, Some(999)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct PurchaseOrderRepository {
    pool: SqlitePool,
}

impl PurchaseOrderRepository {
    /// Creates a new PurchaseOrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseOrderRepository { pool }
    }

    /// Places an unpaid order.
    ///
    /// An unknown ISBN is registered from `request.book` with zero stock in
    /// the same transaction. No stock changes here.
    ///
    /// ## Returns
    /// * `Err(Domain(Validation))` - bad ISBN, quantity, price or book info
    /// * `Err(Domain(BookNotFound))` - unknown ISBN and no book info
    /// * `Err(Domain(Duplicate))` - the book was registered concurrently
    pub async fn create(
        &self,
        request: &PurchaseOrderRequest,
        operator: &Operator,
    ) -> DbResult<PurchaseOrder> {
        validate_isbn(&request.isbn)?;
        validate_quantity(request.quantity)?;
        validate_positive_cents("purchase_price", request.purchase_price_cents)?;
        if let Some(info) = &request.book {
            validate_book_info(info)?;
        }

        let total = Money::from_cents(request.purchase_price_cents)
            .checked_multiply_quantity(request.quantity)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "total_amount".to_string(),
                min: 1,
                max: i64::MAX,
            })?;

        debug!(
            isbn = %request.isbn,
            quantity = request.quantity,
            purchase_price_cents = request.purchase_price_cents,
            "Creating purchase order"
        );

        let mut tx = self.pool.begin().await?;

        if load(&mut tx, &request.isbn).await?.is_none() {
            match &request.book {
                Some(info) => {
                    insert_book(&mut tx, &info.clone().into_new_book(&request.isbn)).await?;
                    info!(isbn = %request.isbn, "Book registered from purchase order");
                }
                None => return Err(CoreError::BookNotFound(request.isbn.clone()).into()),
            }
        }

        let order_date = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO purchase_orders (
                isbn, purchase_price_cents, quantity, total_amount_cents,
                order_date, status, created_by
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.isbn)
        .bind(request.purchase_price_cents)
        .bind(request.quantity)
        .bind(total.cents())
        .bind(order_date)
        .bind(PurchaseStatus::Unpaid)
        .bind(&operator.employee_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let order = PurchaseOrder {
            id: result.last_insert_rowid(),
            isbn: request.isbn.clone(),
            purchase_price_cents: request.purchase_price_cents,
            quantity: request.quantity,
            total_amount_cents: total.cents(),
            order_date,
            status: PurchaseStatus::Unpaid,
            created_by: operator.employee_id.clone(),
            settled_by: None,
            received_by: None,
        };

        info!(order_id = order.id, total = %total, "Purchase order created");
        Ok(order)
    }

    /// Pays an unpaid order and records its purchase bill.
    ///
    /// The status change and the bill commit together; if the bill cannot be
    /// written the order stays unpaid.
    pub async fn pay(&self, order_id: i64, operator: &Operator) -> DbResult<PurchasePayment> {
        debug!(order_id, "Paying purchase order");

        let mut tx = self.pool.begin().await?;

        let order = load_order(&mut tx, order_id).await?;
        let next = order.status.apply(PurchaseAction::Pay)?;
        swap_status(&mut tx, &order, PurchaseAction::Pay, next, operator).await?;

        let bill = BillRepository::record(
            &mut tx,
            BillType::Purchase,
            order.total_amount(),
            order.id,
            operator,
        )
        .await?;

        tx.commit().await?;

        info!(order_id, amount = %order.total_amount(), "Purchase order paid");

        Ok(PurchasePayment {
            order: PurchaseOrder {
                status: next,
                settled_by: Some(operator.employee_id.clone()),
                ..order
            },
            bill,
        })
    }

    /// Cancels an unpaid order. No bill, no stock change.
    pub async fn return_order(&self, order_id: i64, operator: &Operator) -> DbResult<PurchaseOrder> {
        debug!(order_id, "Returning purchase order");

        let mut tx = self.pool.begin().await?;

        let order = load_order(&mut tx, order_id).await?;
        let next = order.status.apply(PurchaseAction::Return)?;
        swap_status(&mut tx, &order, PurchaseAction::Return, next, operator).await?;

        tx.commit().await?;

        info!(order_id, "Purchase order returned");

        Ok(PurchaseOrder {
            status: next,
            settled_by: Some(operator.employee_id.clone()),
            ..order
        })
    }

    /// Receives a paid order into stock.
    ///
    /// ## Retail Price Is Set Once
    /// A book that already has a retail price keeps it; `retail_price_cents`
    /// is ignored. A book without one must be given a positive price here,
    /// otherwise the arrival is refused with `RetailPriceRequired`.
    pub async fn arrive(
        &self,
        order_id: i64,
        operator: &Operator,
        retail_price_cents: Option<i64>,
    ) -> DbResult<PurchaseArrival> {
        debug!(order_id, retail_price_cents = ?retail_price_cents, "Receiving purchase order");

        let mut tx = self.pool.begin().await?;

        let order = load_order(&mut tx, order_id).await?;
        let next = order.status.apply(PurchaseAction::Arrive)?;

        let book = load(&mut tx, &order.isbn)
            .await?
            .ok_or_else(|| CoreError::BookNotFound(order.isbn.clone()))?;

        let new_price = if book.is_priced() {
            None
        } else {
            let price = retail_price_cents.ok_or_else(|| CoreError::RetailPriceRequired {
                isbn: book.isbn.clone(),
            })?;
            validate_positive_cents("retail_price", price)?;
            Some(price)
        };

        let new_stock = book
            .stock
            .checked_add(order.quantity)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "stock".to_string(),
                min: 0,
                max: i64::MAX,
            })?;

        write_stock(&mut tx, &book.isbn, book.version, new_stock, new_price).await?;
        swap_status(&mut tx, &order, PurchaseAction::Arrive, next, operator).await?;

        tx.commit().await?;

        info!(
            order_id,
            isbn = %book.isbn,
            added = order.quantity,
            stock = new_stock,
            "Purchase order arrived"
        );

        Ok(PurchaseArrival {
            book: Book {
                stock: new_stock,
                retail_price_cents: new_price.or(book.retail_price_cents),
                version: book.version + 1,
                ..book
            },
            order: PurchaseOrder {
                status: next,
                received_by: Some(operator.employee_id.clone()),
                ..order
            },
        })
    }

    /// Gets an order by id.
    pub async fn get(&self, order_id: i64) -> DbResult<PurchaseOrder> {
        let mut conn = self.pool.acquire().await?;
        load_order(&mut conn, order_id).await
    }

    /// Lists orders matching the filter.
    pub async fn list(&self, filter: &PurchaseFilter) -> DbResult<Page<PurchaseOrder>> {
        let page = filter.validate()?;

        let mut conditions = Conditions::new();
        conditions
            .eq_i64("id", filter.id)
            .text("isbn", TextMatch::from_query(filter.isbn.as_deref(), filter.exact_isbn))
            .eq_text("status", filter.status.as_ref().map(PurchaseStatus::as_str))
            .text(
                "created_by",
                TextMatch::from_query(filter.created_by.as_deref(), filter.exact_created_by),
            )
            .text(
                "settled_by",
                TextMatch::from_query(filter.settled_by.as_deref(), filter.exact_settled_by),
            )
            .text(
                "received_by",
                TextMatch::from_query(filter.received_by.as_deref(), filter.exact_received_by),
            )
            .since("order_date", filter.start_date)
            .until("order_date", filter.end_date)
            .at_least("purchase_price_cents", filter.min_price)
            .at_most("purchase_price_cents", filter.max_price)
            .at_least("quantity", filter.min_quantity)
            .at_most("quantity", filter.max_quantity);

        let (sort_by, sort_order) = filter.ordering();
        let order_by = format!(
            "{} {}, id {}",
            sort_by.column(),
            sort_order.as_sql(),
            sort_order.as_sql()
        );

        fetch_page(
            &self.pool,
            PURCHASE_COLUMNS,
            "purchase_orders",
            &conditions,
            &order_by,
            page,
        )
        .await
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

async fn load_order(conn: &mut SqliteConnection, order_id: i64) -> DbResult<PurchaseOrder> {
    sqlx::query_as::<_, PurchaseOrder>(&format!(
        "SELECT {PURCHASE_COLUMNS} FROM purchase_orders WHERE id = ?"
    ))
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| CoreError::PurchaseOrderNotFound(order_id).into())
}

/// Moves `order` from its loaded status to `next`, attributing the operator.
///
/// Pay and Return set the settler, Arrive sets the receiver. Zero rows
/// means another transition committed first.
async fn swap_status(
    conn: &mut SqliteConnection,
    order: &PurchaseOrder,
    action: PurchaseAction,
    next: PurchaseStatus,
    operator: &Operator,
) -> DbResult<()> {
    let column = match action {
        PurchaseAction::Pay | PurchaseAction::Return => "settled_by",
        PurchaseAction::Arrive => "received_by",
    };

    let result = sqlx::query(&format!(
        "UPDATE purchase_orders SET status = ?, {column} = ? WHERE id = ? AND status = ?"
    ))
    .bind(next)
    .bind(&operator.employee_id)
    .bind(order.id)
    .bind(order.status)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::InvalidTransition {
            from: order.status,
            action,
        }
        .into());
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
