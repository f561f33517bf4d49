//! # Repository Module
//!
//! Database repository implementations for the bookstore.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.purchases().pay(id, &operator)                             │
//! │       ▼                                                                 │
//! │  PurchaseOrderRepository                                               │
//! │  ├── BEGIN                                                             │
//! │  ├── PurchaseStatus::apply(Pay)        ← rule from bookstore-core      │
//! │  ├── UPDATE … WHERE status = 'unpaid'                                  │
//! │  ├── BillRepository::record(&mut tx)   ← same transaction              │
//! │  └── COMMIT                                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`BookRepository`](book::BookRepository) - Catalog and stock
//! - [`PurchaseOrderRepository`](purchase::PurchaseOrderRepository) - Restocking lifecycle
//! - [`SaleRepository`](sale::SaleRepository) - Sales and line items
//! - [`BillRepository`](bill::BillRepository) - Append-only ledger
//! - [`UserRepository`](user::UserRepository) - Staff accounts
//! - [`SessionRepository`](session::SessionRepository) - Login sessions

pub mod bill;
pub mod book;
mod filter;
pub mod purchase;
pub mod sale;
pub mod session;
pub mod user;

#[cfg(test)]
pub(crate) mod testing {
    use bookstore_core::{Book, Gender, NewBook, NewUser, Operator};

    use crate::{Database, DbConfig};

    pub(crate) async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub(crate) fn operator(employee_id: &str) -> Operator {
        Operator::new(employee_id, false)
    }

    /// Adds a book titled `Book <isbn>`.
    pub(crate) async fn seed_book(db: &Database, isbn: &str, stock: i64, price: Option<i64>) -> Book {
        db.books()
            .create(&NewBook {
                isbn: isbn.to_string(),
                title: format!("Book {isbn}"),
                author: None,
                publisher: None,
                retail_price_cents: price,
                stock,
            })
            .await
            .unwrap()
    }

    pub(crate) fn new_user(username: &str, employee_id: &str, is_supervisor: bool) -> NewUser {
        NewUser {
            username: username.to_string(),
            employee_id: employee_id.to_string(),
            true_name: username.to_string(),
            gender: Gender::Female,
            age: Some(30),
            is_supervisor,
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        }
    }
}
