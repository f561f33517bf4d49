//! # bookstore-core: Pure Business Logic for the Bookstore Backend
//!
//! This crate is the **heart** of the bookstore backend. It contains the
//! order state machine, sale pricing and input validation as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Bookstore Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    bookstore-api (axum)                         │   │
//! │  │    /login, /books, /purchase/orders, /sales, /bills            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ Operator + validated input             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    bookstore-db (transactions)                  │   │
//! │  │    BookRepository, PurchaseOrderRepository, SaleRepository      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ asks before it writes                  │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ bookstore-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ purchase  │  │   sale    │  │   │
//! │  │   │   Book    │  │   Money   │  │  Status   │  │ SalePlan  │  │   │
//! │  │   │   Bill    │  │           │  │  Action   │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Book, PurchaseOrder, SaleOrder, Bill, User)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`purchase`] - Purchase order state machine (single transition table)
//! - [`sale`] - Validate-all-then-commit sale pricing plan
//! - [`query`] - Filter, sort and page types for the read paths
//! - [`error`] - Domain error types and the error taxonomy
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use bookstore_core::money::Money;
//! use bookstore_core::purchase::{PurchaseAction, PurchaseStatus};
//!
//! let total = Money::from_cents(500).multiply_quantity(10);
//! assert_eq!(total.cents(), 5000);
//!
//! let next = PurchaseStatus::Unpaid.apply(PurchaseAction::Pay).unwrap();
//! assert_eq!(next, PurchaseStatus::Paid);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod purchase;
pub mod query;
pub mod sale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use purchase::{PurchaseAction, PurchaseStatus};
pub use query::Page;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Length of a catalog code (ISBN-13).
pub const ISBN_LENGTH: usize = 13;

/// Maximum lines allowed in a single sale.
///
/// ## Business Reason
/// Prevents runaway carts and keeps one sale inside one short transaction.
pub const MAX_SALE_LINES: usize = 100;

/// Maximum quantity on a single purchase or sale line.
pub const MAX_ITEM_QUANTITY: i64 = 9999;

/// Largest page a list operation will return.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Prefix of every sale transaction number.
pub const TRANSACTION_NO_PREFIX: &str = "SO";
