//! # Sale Pricing Plan
//!
//! Validate-all-then-commit planning for a retail sale.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cart: [(isbn, qty), ...]                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SalePlan::check_cart   empty? too many lines? bad isbn/qty?            │
//! │       │                                                                 │
//! │       ▼  (bookstore-db loads every referenced Book in the transaction)  │
//! │  SalePlan::build ← THIS MODULE                                          │
//! │       │   per line, in cart order:                                      │
//! │       │     book exists?          → NotFound                            │
//! │       │     stock ≥ cumulative?   → InsufficientStock                   │
//! │       │     retail price set?     → BookNotPriced                       │
//! │       │     snapshot price, line total                                  │
//! │       ▼                                                                 │
//! │  SalePlan { lines, stock_changes, total }                               │
//! │       │                                                                 │
//! │       ▼  (bookstore-db applies it: stock CAS, order, items, bill)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is written until the whole plan has been built, so the first
//! failing line decides the error and no partial sale can exist.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Book, PaymentMethod};
use crate::validation::{validate_isbn, validate_quantity};
use crate::{MAX_SALE_LINES, TRANSACTION_NO_PREFIX};

// =============================================================================
// Input
// =============================================================================

/// One requested cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub isbn: String,
    pub quantity: i64,
}

impl SaleLine {
    pub fn new(isbn: impl Into<String>, quantity: i64) -> Self {
        Self {
            isbn: isbn.into(),
            quantity,
        }
    }
}

/// Input for creating a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleRequest {
    pub items: Vec<SaleLine>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub remark: Option<String>,
}

// =============================================================================
// Plan
// =============================================================================

/// A priced cart line, ready to be written as a SaleItem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub isbn: String,
    pub quantity: i64,
    /// Book retail price at planning time.
    pub sold_price: Money,
    pub total: Money,
}

/// The stock write for one distinct book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockChange {
    pub isbn: String,
    /// Version read in the same transaction; the write is guarded by it.
    pub expected_version: i64,
    pub new_stock: i64,
}

/// A fully validated sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalePlan {
    /// Cart lines in request order.
    pub lines: Vec<PlannedLine>,
    /// One entry per distinct ISBN, in first-seen order.
    pub stock_changes: Vec<StockChange>,
    /// Σ line totals.
    pub total: Money,
}

impl SalePlan {
    /// Checks the cart shape before any book is loaded.
    pub fn check_cart(lines: &[SaleLine]) -> CoreResult<()> {
        if lines.is_empty() {
            return Err(CoreError::EmptySale);
        }

        if lines.len() > MAX_SALE_LINES {
            return Err(CoreError::SaleTooLarge {
                max: MAX_SALE_LINES,
            });
        }

        for line in lines {
            validate_isbn(&line.isbn)?;
            validate_quantity(line.quantity)?;
        }

        Ok(())
    }

    /// Prices every line against the loaded books.
    ///
    /// `books` must contain every book the cart references that exists; a
    /// missing key is reported as `BookNotFound`. When an ISBN appears on
    /// several lines the stock check uses the running total for that ISBN.
    pub fn build(lines: &[SaleLine], books: &HashMap<String, Book>) -> CoreResult<SalePlan> {
        Self::check_cart(lines)?;

        let mut requested: HashMap<&str, i64> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        let mut planned = Vec::with_capacity(lines.len());
        let mut total = Money::zero();

        for line in lines {
            let book = books
                .get(&line.isbn)
                .ok_or_else(|| CoreError::BookNotFound(line.isbn.clone()))?;

            let cumulative = requested.entry(line.isbn.as_str()).or_insert_with(|| {
                order.push(line.isbn.as_str());
                0
            });
            *cumulative += line.quantity;

            if book.stock < *cumulative {
                return Err(CoreError::InsufficientStock {
                    isbn: line.isbn.clone(),
                    available: book.stock,
                    requested: *cumulative,
                });
            }

            let sold_price = book.retail_price().ok_or_else(|| CoreError::BookNotPriced {
                isbn: line.isbn.clone(),
            })?;

            let line_total = sold_price
                .checked_multiply_quantity(line.quantity)
                .ok_or_else(amount_overflow)?;
            total = total.checked_add(line_total).ok_or_else(amount_overflow)?;

            planned.push(PlannedLine {
                isbn: line.isbn.clone(),
                quantity: line.quantity,
                sold_price,
                total: line_total,
            });
        }

        let stock_changes = order
            .into_iter()
            .filter_map(|isbn| {
                let book = books.get(isbn)?;
                Some(StockChange {
                    isbn: isbn.to_string(),
                    expected_version: book.version,
                    new_stock: book.stock - requested.get(isbn).copied().unwrap_or(0),
                })
            })
            .collect();

        Ok(SalePlan {
            lines: planned,
            stock_changes,
            total,
        })
    }
}

fn amount_overflow() -> CoreError {
    ValidationError::OutOfRange {
        field: "total_amount".to_string(),
        min: 1,
        max: i64::MAX,
    }
    .into()
}

// =============================================================================
// Transaction Number
// =============================================================================

/// Formats a sale transaction number.
///
/// ## Format
/// `SO` + `YYYYMMDDHHMMSS` + 6 digits, e.g. `SO20240315143022042517`.
/// The caller supplies the local time and the random suffix; uniqueness is
/// left to the database constraint.
///
/// ```rust
/// use bookstore_core::sale::transaction_number;
/// use chrono::NaiveDate;
///
/// let at = NaiveDate::from_ymd_opt(2024, 3, 15)
///     .unwrap()
///     .and_hms_opt(14, 30, 22)
///     .unwrap();
/// assert_eq!(transaction_number(at, 42517), "SO20240315143022042517");
/// ```
pub fn transaction_number(at: NaiveDateTime, suffix: u32) -> String {
    format!(
        "{}{}{:06}",
        TRANSACTION_NO_PREFIX,
        at.format("%Y%m%d%H%M%S"),
        suffix % 1_000_000
    )
}

// =============================================================================
// Unit Tests
// =============================================================================
