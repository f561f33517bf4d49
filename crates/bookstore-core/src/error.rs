//! # Error Types
//!
//! Domain-specific error types for bookstore-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bookstore-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - Taxonomy every error is classified into        │
//! │                                                                         │
//! │  bookstore-db errors (separate crate)                                  │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  bookstore-api errors (in app)                                         │
//! │  └── ApiError         - What HTTP clients see (status + JSON body)     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ISBN, order ID, etc.)
//! 3. Errors are enum variants, never String
//! 4. Every variant maps to exactly one [`ErrorKind`]

use serde::Serialize;
use thiserror::Error;

use crate::purchase::{PurchaseAction, PurchaseStatus};

// =============================================================================
// Error Kind
// =============================================================================

/// Classification of every failure the backend can report.
///
/// The API layer turns a kind into an HTTP status; callers use it to decide
/// whether a retry makes sense. No operation retries on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Unknown book, order, user or session reference.
    NotFound,
    /// Transition attempted from a disallowed state.
    InvalidState,
    /// Malformed input or a field missing for the current state.
    BadRequest,
    /// Duplicate key, blocked deletion, or a lost concurrent update.
    Conflict,
    /// Missing, invalid or expired credentials.
    Unauthorized,
    /// Authenticated but not allowed.
    Forbidden,
    /// Storage or commit failure.
    Internal,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Book cannot be found by ISBN.
    #[error("Book not found: {0}")]
    BookNotFound(String),

    /// Purchase order cannot be found.
    #[error("Purchase order not found: {0}")]
    PurchaseOrderNotFound(i64),

    /// Sale order cannot be found.
    #[error("Sale order not found: {0}")]
    SaleOrderNotFound(i64),

    /// User cannot be found.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// A purchase order transition was attempted from a state that does not
    /// allow it.
    ///
    /// ## When This Occurs
    /// - Paying an order that is already paid, returned or arrived
    /// - Returning an order that is no longer unpaid
    /// - Marking an order arrived before it was paid
    #[error("Purchase order is {from}, cannot {action}")]
    InvalidTransition {
        from: PurchaseStatus,
        action: PurchaseAction,
    },

    /// Insufficient stock to complete a sale.
    ///
    /// ## User Workflow
    /// ```text
    /// Sale line (qty: 3)
    ///      │
    ///      ▼
    /// Check stock: available=2
    ///      │
    ///      ▼
    /// InsufficientStock { isbn: "9780000000001", available: 2, requested: 3 }
    /// ```
    #[error("Insufficient stock for {isbn}: available {available}, requested {requested}")]
    InsufficientStock {
        isbn: String,
        available: i64,
        requested: i64,
    },

    /// The book has no retail price and the arrival did not supply one.
    #[error("Book {isbn} has no retail price; one must be supplied on arrival")]
    RetailPriceRequired { isbn: String },

    /// An unpriced book cannot be sold.
    #[error("Book {isbn} has no retail price and cannot be sold")]
    BookNotPriced { isbn: String },

    /// A sale with a ledger entry cannot be deleted.
    #[error("Sale order {order_id} already has a bill and cannot be deleted")]
    SaleAlreadyBilled { order_id: i64 },

    /// A book referenced by orders cannot be deleted.
    #[error("Book {isbn} is referenced by existing orders")]
    BookReferenced { isbn: String },

    /// Unique key already taken.
    #[error("{entity} '{value}' already exists")]
    Duplicate { entity: String, value: String },

    /// The row changed between read and write inside the transaction.
    #[error("{entity} {id} was modified concurrently, retry the operation")]
    ConcurrentModification { entity: String, id: String },

    /// A sale must contain at least one line.
    #[error("Sale must contain at least one item")]
    EmptySale,

    /// Too many lines in one sale.
    #[error("Sale cannot have more than {max} items")]
    SaleTooLarge { max: usize },

    /// Login failed. Same message for unknown user and wrong password.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Missing, unknown or expired session token.
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    /// Operation requires a privilege the operator does not have.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::BookNotFound(_)
            | CoreError::PurchaseOrderNotFound(_)
            | CoreError::SaleOrderNotFound(_)
            | CoreError::UserNotFound(_) => ErrorKind::NotFound,

            CoreError::InvalidTransition { .. } => ErrorKind::InvalidState,

            CoreError::InsufficientStock { .. }
            | CoreError::SaleAlreadyBilled { .. }
            | CoreError::BookReferenced { .. }
            | CoreError::Duplicate { .. }
            | CoreError::ConcurrentModification { .. } => ErrorKind::Conflict,

            CoreError::RetailPriceRequired { .. }
            | CoreError::BookNotPriced { .. }
            | CoreError::EmptySale
            | CoreError::SaleTooLarge { .. }
            | CoreError::Validation(_) => ErrorKind::BadRequest,

            CoreError::InvalidCredentials | CoreError::Unauthenticated(_) => {
                ErrorKind::Unauthorized
            }

            CoreError::PermissionDenied(_) => ErrorKind::Forbidden,
        }
    }

    /// Creates a Duplicate error.
    pub fn duplicate(entity: impl Into<String>, value: impl Into<String>) -> Self {
        CoreError::Duplicate {
            entity: entity.into(),
            value: value.into(),
        }
    }

    /// Creates a ConcurrentModification error.
    pub fn concurrent(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::ConcurrentModification {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., ISBN with letters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            isbn: "9780000000001".to_string(),
            available: 2,
            requested: 3,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for 9780000000001: available 2, requested 3"
        );

        let err = CoreError::InvalidTransition {
            from: PurchaseStatus::Returned,
            action: PurchaseAction::Pay,
        };
        assert_eq!(err.to_string(), "Purchase order is returned, cannot pay");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(CoreError::BookNotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::InvalidTransition {
                from: PurchaseStatus::Paid,
                action: PurchaseAction::Return,
            }
            .kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            CoreError::SaleAlreadyBilled { order_id: 1 }.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            CoreError::RetailPriceRequired { isbn: "x".into() }.kind(),
            ErrorKind::BadRequest
        );
        assert_eq!(CoreError::InvalidCredentials.kind(), ErrorKind::Unauthorized);
        assert_eq!(
            CoreError::PermissionDenied("supervisor only".into()).kind(),
            ErrorKind::Forbidden
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "title".to_string(),
        };
        assert_eq!(validation_err.to_string(), "title is required");

        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::BadRequest);
    }
}
