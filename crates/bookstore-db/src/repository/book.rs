//! # Book Repository
//!
//! The catalog and its stock levels.
//!
//! ## Who Writes Stock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    books.stock / books.version                          │
//! │                                                                         │
//! │  purchase arrive   ──► write_stock(+qty, maybe price)                  │
//! │  create_sale       ──► write_stock(-qty)        ┐ all inside the       │
//! │  delete_sale       ──► write_stock(+qty)        │ caller's transaction │
//! │  update (catalog)  ──► UPDATE … version = ?     ┘                      │
//! │                                                                         │
//! │  Every write is                                                        │
//! │    UPDATE books SET stock = ?, version = version + 1                   │
//! │    WHERE isbn = ? AND version = ?   ← version read in the same tx      │
//! │                                                                         │
//! │  0 rows → another writer got there first → ConcurrentModification      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bookstore_core::query::{BookFilter, TextMatch};
use bookstore_core::validation::{validate_book_patch, validate_isbn, validate_new_book};
use bookstore_core::{Book, BookPatch, CoreError, NewBook, Page};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::filter::{fetch_page, Conditions};

pub(crate) const BOOK_COLUMNS: &str =
    "isbn, title, author, publisher, retail_price_cents, stock, version";

/// Repository for the book catalog.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.books();
///
/// let book = repo.create(&new_book).await?;
/// let page = repo.list(&BookFilter { title: Some("rust".into()), ..Default::default() }).await?;
/// ```
#[derive(Debug, Clone)]
pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    /// Creates a new BookRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BookRepository { pool }
    }

    /// Adds a catalog entry.
    ///
    /// ## Returns
    /// * `Err(Domain(Validation))` - bad ISBN, title, price or stock
    /// * `Err(Domain(Duplicate))` - ISBN already in the catalog
    pub async fn create(&self, book: &NewBook) -> DbResult<Book> {
        validate_new_book(book)?;

        let mut conn = self.pool.acquire().await?;
        let created = insert_book(&mut conn, book).await?;

        info!(isbn = %created.isbn, stock = created.stock, "Book created");
        Ok(created)
    }

    /// Gets a book by ISBN.
    pub async fn find(&self, isbn: &str) -> DbResult<Option<Book>> {
        let mut conn = self.pool.acquire().await?;
        load(&mut conn, isbn).await
    }

    /// Gets a book by ISBN, failing with `BookNotFound` when absent.
    pub async fn get(&self, isbn: &str) -> DbResult<Book> {
        validate_isbn(isbn)?;
        self.find(isbn)
            .await?
            .ok_or_else(|| CoreError::BookNotFound(isbn.to_string()).into())
    }

    /// Applies a partial update.
    ///
    /// The write is guarded by the version read at the start of the
    /// transaction, so a concurrent sale or arrival is never overwritten.
    pub async fn update(&self, isbn: &str, patch: &BookPatch) -> DbResult<Book> {
        validate_isbn(isbn)?;
        validate_book_patch(patch)?;

        debug!(isbn = %isbn, "Updating book");

        let mut tx = self.pool.begin().await?;

        let current = load(&mut tx, isbn)
            .await?
            .ok_or_else(|| CoreError::BookNotFound(isbn.to_string()))?;

        if patch.is_empty() {
            return Ok(current);
        }

        let updated = Book {
            isbn: current.isbn.clone(),
            title: patch.title.clone().unwrap_or(current.title),
            author: patch.author.clone().or(current.author),
            publisher: patch.publisher.clone().or(current.publisher),
            retail_price_cents: patch.retail_price_cents.or(current.retail_price_cents),
            stock: patch.stock.unwrap_or(current.stock),
            version: current.version + 1,
        };

        let result = sqlx::query(
            r#"
            UPDATE books SET
                title = ?,
                author = ?,
                publisher = ?,
                retail_price_cents = ?,
                stock = ?,
                version = version + 1
            WHERE isbn = ? AND version = ?
            "#,
        )
        .bind(&updated.title)
        .bind(&updated.author)
        .bind(&updated.publisher)
        .bind(updated.retail_price_cents)
        .bind(updated.stock)
        .bind(isbn)
        .bind(current.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::concurrent("Book", isbn).into());
        }

        tx.commit().await?;

        info!(isbn = %isbn, stock = updated.stock, "Book updated");
        Ok(updated)
    }

    /// Removes a catalog entry no order refers to.
    ///
    /// ## Returns
    /// * `Err(Domain(BookNotFound))` - no such ISBN
    /// * `Err(Domain(BookReferenced))` - a purchase order or sale line uses it
    pub async fn delete(&self, isbn: &str) -> DbResult<()> {
        validate_isbn(isbn)?;

        debug!(isbn = %isbn, "Deleting book");

        let mut tx = self.pool.begin().await?;

        if load(&mut tx, isbn).await?.is_none() {
            return Err(CoreError::BookNotFound(isbn.to_string()).into());
        }

        let referenced: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM purchase_orders WHERE isbn = ?1)
                OR EXISTS(SELECT 1 FROM sale_items WHERE isbn = ?1)
            "#,
        )
        .bind(isbn)
        .fetch_one(&mut *tx)
        .await?;

        if referenced {
            return Err(CoreError::BookReferenced {
                isbn: isbn.to_string(),
            }
            .into());
        }

        sqlx::query("DELETE FROM books WHERE isbn = ?")
            .bind(isbn)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(isbn = %isbn, "Book deleted");
        Ok(())
    }

    /// Lists books matching the filter.
    pub async fn list(&self, filter: &BookFilter) -> DbResult<Page<Book>> {
        let page = filter.validate()?;

        let mut conditions = Conditions::new();
        conditions
            .text("isbn", TextMatch::from_query(filter.isbn.as_deref(), filter.exact_isbn))
            .text("title", TextMatch::from_query(filter.title.as_deref(), filter.exact_title))
            .text("author", TextMatch::from_query(filter.author.as_deref(), filter.exact_author))
            .text(
                "publisher",
                TextMatch::from_query(filter.publisher.as_deref(), filter.exact_publisher),
            )
            .at_least("retail_price_cents", filter.min_price)
            .at_most("retail_price_cents", filter.max_price)
            .at_least("stock", filter.min_stock)
            .at_most("stock", filter.max_stock);

        let order_by = format!(
            "{} {}, isbn ASC",
            filter.sort_by.column(),
            filter.sort_order.as_sql()
        );

        fetch_page(&self.pool, BOOK_COLUMNS, "books", &conditions, &order_by, page).await
    }

    /// Counts catalog entries.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Inserts a validated book on the caller's connection.
///
/// A UNIQUE violation on the ISBN becomes `Duplicate`, which is how a
/// concurrent registration of the same book surfaces.
pub(crate) async fn insert_book(conn: &mut SqliteConnection, book: &NewBook) -> DbResult<Book> {
    debug!(isbn = %book.isbn, "Inserting book");

    sqlx::query(
        r#"
        INSERT INTO books (isbn, title, author, publisher, retail_price_cents, stock, version)
        VALUES (?, ?, ?, ?, ?, ?, 0)
        "#,
    )
    .bind(&book.isbn)
    .bind(&book.title)
    .bind(&book.author)
    .bind(&book.publisher)
    .bind(book.retail_price_cents)
    .bind(book.stock)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { .. } => CoreError::duplicate("Book", &book.isbn).into(),
        other => other,
    })?;

    Ok(Book {
        isbn: book.isbn.clone(),
        title: book.title.clone(),
        author: book.author.clone(),
        publisher: book.publisher.clone(),
        retail_price_cents: book.retail_price_cents,
        stock: book.stock,
        version: 0,
    })
}

/// Reads a book on the caller's connection.
pub(crate) async fn load(conn: &mut SqliteConnection, isbn: &str) -> DbResult<Option<Book>> {
    let book = sqlx::query_as::<_, Book>(&format!(
        "SELECT {BOOK_COLUMNS} FROM books WHERE isbn = ?"
    ))
    .bind(isbn)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(book)
}

/// Writes a new stock level, and optionally a retail price, if the row is
/// still at `expected_version`.
///
/// `new_price = None` keeps the stored price.
pub(crate) async fn write_stock(
    conn: &mut SqliteConnection,
    isbn: &str,
    expected_version: i64,
    new_stock: i64,
    new_price: Option<i64>,
) -> DbResult<()> {
    debug!(isbn = %isbn, expected_version, new_stock, "Writing stock");

    let result = sqlx::query(
        r#"
        UPDATE books SET
            stock = ?,
            retail_price_cents = COALESCE(?, retail_price_cents),
            version = version + 1
        WHERE isbn = ? AND version = ?
        "#,
    )
    .bind(new_stock)
    .bind(new_price)
    .bind(isbn)
    .bind(expected_version)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::concurrent("Book", isbn).into());
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
