//! # Validation Module
//!
//! Input validation for the bookstore backend.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP (axum)                                                  │
//! │  └── Type validation (JSON / query deserialization)                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Repository entry points                                      │
//! │  └── THIS MODULE: field rules, checked before any transaction opens    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints (isbn digits, prices > 0, stock >= 0)           │
//! │  ├── UNIQUE constraints                                                │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bookstore_core::validation::{validate_isbn, validate_quantity};
//!
//! validate_isbn("9780000000001").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::types::{BookInfo, BookPatch, NewBook};
use crate::{ISBN_LENGTH, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_AUTHOR_LEN: usize = 50;
pub const MAX_PUBLISHER_LEN: usize = 100;
pub const MAX_USERNAME_LEN: usize = 50;
pub const MAX_EMPLOYEE_ID_LEN: usize = 20;
pub const MAX_TRUE_NAME_LEN: usize = 50;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 20;
pub const MAX_REMARK_LEN: usize = 200;

// =============================================================================
// Helpers
// =============================================================================

fn required_bounded(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    bounded(field, value, max)
}

fn bounded(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Catalog Validators
// =============================================================================

/// Validates an ISBN-13 catalog code.
///
/// ## Rules
/// - Exactly 13 characters
/// - ASCII digits only (no hyphens, no check-digit letter)
///
/// ## Example
/// ```rust
/// use bookstore_core::validation::validate_isbn;
///
/// assert!(validate_isbn("9787111633333").is_ok());
/// assert!(validate_isbn("978-7111633333").is_err());
/// assert!(validate_isbn("978711163333").is_err());
/// ```
pub fn validate_isbn(isbn: &str) -> ValidationResult<()> {
    if isbn.len() != ISBN_LENGTH || !isbn.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "isbn".to_string(),
            reason: format!("must be exactly {ISBN_LENGTH} digits"),
        });
    }

    Ok(())
}

pub fn validate_title(title: &str) -> ValidationResult<()> {
    required_bounded("title", title, MAX_TITLE_LEN)
}

pub fn validate_author(author: Option<&str>) -> ValidationResult<()> {
    author.map_or(Ok(()), |a| bounded("author", a, MAX_AUTHOR_LEN))
}

pub fn validate_publisher(publisher: Option<&str>) -> ValidationResult<()> {
    publisher.map_or(Ok(()), |p| bounded("publisher", p, MAX_PUBLISHER_LEN))
}

/// Validates a strictly positive amount in cents.
///
/// Used for purchase prices and retail prices. Zero is rejected: a free book
/// cannot be sold and an unset retail price is `None`, never `0`.
pub fn validate_positive_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "stock".to_string(),
        });
    }

    Ok(())
}

/// Validates a line quantity for a purchase order or sale line.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a catalog entry before insert.
pub fn validate_new_book(book: &NewBook) -> ValidationResult<()> {
    validate_isbn(&book.isbn)?;
    validate_title(&book.title)?;
    validate_author(book.author.as_deref())?;
    validate_publisher(book.publisher.as_deref())?;
    if let Some(price) = book.retail_price_cents {
        validate_positive_cents("retail_price", price)?;
    }
    validate_stock(book.stock)
}

/// Validates descriptive fields supplied alongside a purchase order.
pub fn validate_book_info(info: &BookInfo) -> ValidationResult<()> {
    validate_title(&info.title)?;
    validate_author(info.author.as_deref())?;
    validate_publisher(info.publisher.as_deref())?;
    if let Some(price) = info.retail_price_cents {
        validate_positive_cents("retail_price", price)?;
    }
    Ok(())
}

/// Validates only the fields present in a patch.
pub fn validate_book_patch(patch: &BookPatch) -> ValidationResult<()> {
    if let Some(title) = &patch.title {
        validate_title(title)?;
    }
    validate_author(patch.author.as_deref())?;
    validate_publisher(patch.publisher.as_deref())?;
    if let Some(price) = patch.retail_price_cents {
        validate_positive_cents("retail_price", price)?;
    }
    if let Some(stock) = patch.stock {
        validate_stock(stock)?;
    }
    Ok(())
}

pub fn validate_remark(remark: Option<&str>) -> ValidationResult<()> {
    remark.map_or(Ok(()), |r| bounded("remark", r, MAX_REMARK_LEN))
}

// =============================================================================
// Account Validators
// =============================================================================

/// Validates a login name.
///
/// ## Rules
/// - 1 to 50 characters
/// - No whitespace
pub fn validate_username(username: &str) -> ValidationResult<()> {
    required_bounded("username", username, MAX_USERNAME_LEN)?;

    if username.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(())
}

pub fn validate_employee_id(employee_id: &str) -> ValidationResult<()> {
    required_bounded("employee_id", employee_id, MAX_EMPLOYEE_ID_LEN)
}

pub fn validate_true_name(true_name: &str) -> ValidationResult<()> {
    required_bounded("true_name", true_name, MAX_TRUE_NAME_LEN)
}

pub fn validate_age(age: i64) -> ValidationResult<()> {
    if age < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "age".to_string(),
        });
    }

    Ok(())
}

/// Validates a new password (6 to 20 characters).
pub fn validate_password(password: &str) -> ValidationResult<()> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return Err(ValidationError::OutOfRange {
            field: "password length".to_string(),
            min: MIN_PASSWORD_LEN as i64,
            max: MAX_PASSWORD_LEN as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_isbn() {
        assert!(validate_isbn("9780000000001").is_ok());

        assert!(validate_isbn("").is_err());
        assert!(validate_isbn("978000000000").is_err());
        assert!(validate_isbn("97800000000012").is_err());
        assert!(validate_isbn("978000000000X").is_err());
        // Full-width digits are not ASCII
        assert!(validate_isbn("978000000000１").is_err());
    }

    #[test]
    fn test_validate_title() {
        assert!(validate_title("The Rust Programming Language").is_ok());
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"A".repeat(101)).is_err());
        // Length is counted in characters, not bytes
        assert!(validate_title(&"书".repeat(100)).is_ok());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_positive_cents() {
        assert!(validate_positive_cents("retail_price", 999).is_ok());
        assert!(validate_positive_cents("retail_price", 0).is_err());
        assert!(validate_positive_cents("purchase_price", -100).is_err());
    }

    #[test]
    fn test_validate_new_book() {
        let mut book = NewBook {
            isbn: "9780000000001".to_string(),
            title: "Rust".to_string(),
            author: None,
            publisher: None,
            retail_price_cents: Some(2000),
            stock: 5,
        };
        assert!(validate_new_book(&book).is_ok());

        book.stock = -1;
        assert!(validate_new_book(&book).is_err());

        book.stock = 0;
        book.retail_price_cents = Some(0);
        assert!(validate_new_book(&book).is_err());
    }

    #[test]
    fn test_validate_book_patch() {
        assert!(validate_book_patch(&BookPatch::default()).is_ok());

        let patch = BookPatch {
            stock: Some(-3),
            ..Default::default()
        };
        assert!(validate_book_patch(&patch).is_err());

        let patch = BookPatch {
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(validate_book_patch(&patch).is_err());
    }

    #[test]
    fn test_validate_account_fields() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("al ice").is_err());

        assert!(validate_employee_id("0001").is_ok());
        assert!(validate_employee_id(&"9".repeat(21)).is_err());

        assert!(validate_age(0).is_ok());
        assert!(validate_age(-1).is_err());

        assert!(validate_password("secret").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(21)).is_err());
    }
}
