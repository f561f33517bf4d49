//! # bookstore-db: Database Layer for the Bookstore Backend
//!
//! This crate provides database access for the bookstore service.
//! It uses SQLite with sqlx for async operations, and owns every
//! transaction boundary.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bookstore Data Flow                              │
//! │                                                                         │
//! │  HTTP handler (POST /sales)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   bookstore-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ BookRepo      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ PurchaseRepo  │    │ 001_initial  │  │   │
//! │  │   │ WAL, FKs,     │    │ SaleRepo      │    │   _schema    │  │   │
//! │  │   │ busy timeout  │    │ BillRepo ...  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ./bookstore.db  (BOOKSTORE_DATABASE_PATH)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bookstore_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./bookstore.db")).await?;
//!
//! let order = db.purchases().create(&request, &operator).await?;
//! let sale = db.sales().create_sale(&cart, &operator).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::bill::BillRepository;
pub use repository::book::BookRepository;
pub use repository::purchase::PurchaseOrderRepository;
pub use repository::sale::SaleRepository;
pub use repository::session::SessionRepository;
pub use repository::user::UserRepository;
