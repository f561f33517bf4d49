//! # Domain Types
//!
//! Core domain types used throughout the bookstore backend.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Book       │   │  PurchaseOrder  │   │   SaleOrder     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  isbn (PK)      │◄──│  isbn (FK)      │   │  id             │       │
//! │  │  title          │   │  status         │   │  transaction_no │       │
//! │  │  retail_price   │   │  total_amount   │   │  total_amount   │       │
//! │  │  stock          │   │  3 operators    │   │  items ──────┐  │       │
//! │  │  version        │   └────────┬────────┘   └───────┬──────┼──┘       │
//! │  └────────▲────────┘            │ pay                │      │          │
//! │           │                     ▼                    ▼      ▼          │
//! │           │            ┌─────────────────┐   ┌─────────────────┐       │
//! │           │            │      Bill       │   │    SaleItem     │       │
//! │           │            │  ─────────────  │   │  ─────────────  │       │
//! │           │            │  bill_type      │   │  sold_price     │       │
//! │           └────────────│  related_order  │   │  quantity       │       │
//! │                        │  amount         │   │  total_amount   │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All monetary fields are integer cents with a `_cents` suffix and a
//! [`Money`] accessor, matching the database columns one to one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::purchase::PurchaseStatus;

// =============================================================================
// Book
// =============================================================================

/// A catalog entry together with its stock level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Book {
    /// ISBN-13, 13 ASCII digits.
    pub isbn: String,
    pub title: String,
    pub author: Option<String>,
    pub publisher: Option<String>,

    /// Retail price in cents. `None` until first set, positive afterwards.
    pub retail_price_cents: Option<i64>,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Bumped on every stock or price write; guards read-modify-write.
    pub version: i64,
}

impl Book {
    /// Returns the retail price if one has been set.
    #[inline]
    pub fn retail_price(&self) -> Option<Money> {
        self.retail_price_cents
            .map(Money::from_cents)
            .filter(|price| price.is_positive())
    }

    /// Checks whether the book can be sold at all.
    #[inline]
    pub fn is_priced(&self) -> bool {
        self.retail_price().is_some()
    }
}

/// Input for creating a catalog entry directly.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewBook {
    pub isbn: String,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub retail_price_cents: Option<i64>,
    #[serde(default)]
    pub stock: i64,
}

/// Descriptive fields for a book first registered through a purchase order.
///
/// The book starts with zero stock. A retail price given here is kept, so
/// the arrival does not need to supply one.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BookInfo {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub retail_price_cents: Option<i64>,
}

impl BookInfo {
    /// Turns the info into a zero-stock [`NewBook`] under the given ISBN.
    pub fn into_new_book(self, isbn: &str) -> NewBook {
        NewBook {
            isbn: isbn.to_string(),
            title: self.title,
            author: self.author,
            publisher: self.publisher,
            retail_price_cents: self.retail_price_cents,
            stock: 0,
        }
    }
}

/// Partial update of a catalog entry. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BookPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub retail_price_cents: Option<i64>,
    #[serde(default)]
    pub stock: Option<i64>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.publisher.is_none()
            && self.retail_price_cents.is_none()
            && self.stock.is_none()
    }
}

// =============================================================================
// Purchase Order
// =============================================================================

/// A restocking order placed with a supplier.
///
/// ## Operator Attribution
/// - `created_by`: always set
/// - `settled_by`: who paid or returned it, set iff status ≠ unpaid
/// - `received_by`: who took delivery, set iff status = arrived
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseOrder {
    pub id: i64,
    pub isbn: String,
    pub purchase_price_cents: i64,
    pub quantity: i64,
    pub total_amount_cents: i64,
    #[ts(as = "String")]
    pub order_date: DateTime<Utc>,
    pub status: PurchaseStatus,
    pub created_by: String,
    pub settled_by: Option<String>,
    pub received_by: Option<String>,
}

impl PurchaseOrder {
    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_cents(self.purchase_price_cents)
    }

    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    /// Checks the attribution rule against the current status.
    pub fn attribution_consistent(&self) -> bool {
        self.status.attribution_consistent(
            self.settled_by.is_some(),
            self.received_by.is_some(),
        )
    }
}

/// Input for placing a purchase order.
///
/// `book` is only consulted when the ISBN is not yet in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseOrderRequest {
    pub isbn: String,
    pub quantity: i64,
    pub purchase_price_cents: i64,
    #[serde(default)]
    pub book: Option<BookInfo>,
}

/// Result of paying a purchase order: the order and its ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchasePayment {
    pub order: PurchaseOrder,
    pub bill: Bill,
}

/// Result of receiving a purchase order: the order and the restocked book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseArrival {
    pub order: PurchaseOrder,
    pub book: Book,
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankCard,
    /// Phone wallet or QR payment.
    Mobile,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankCard => "bank_card",
            PaymentMethod::Mobile => "mobile",
        }
    }
}

// =============================================================================
// Sale Order
// =============================================================================

/// A retail sale. Immutable once created apart from payment method and remark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleOrder {
    pub id: i64,
    /// `SO` + `YYYYMMDDHHMMSS` + 6 random digits. Unique.
    pub transaction_no: String,
    pub total_amount_cents: i64,
    pub payment_method: Option<PaymentMethod>,
    pub remark: Option<String>,
    pub operator_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleOrder {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

/// A line item in a sale.
/// Uses snapshot pattern to freeze the retail price at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: i64,
    pub order_id: i64,
    pub isbn: String,
    pub quantity: i64,
    /// Retail price at time of sale (frozen).
    pub sold_price_cents: i64,
    /// sold_price × quantity.
    pub total_amount_cents: i64,
}

impl SaleItem {
    #[inline]
    pub fn sold_price(&self) -> Money {
        Money::from_cents(self.sold_price_cents)
    }

    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

/// A sale line joined with the book title for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItemDetail {
    pub isbn: String,
    pub title: String,
    pub quantity: i64,
    pub sold_price_cents: i64,
    pub total_amount_cents: i64,
}

/// A sale order with all of its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleOrderDetail {
    #[serde(flatten)]
    pub order: SaleOrder,
    pub items: Vec<SaleItemDetail>,
}

impl SaleOrderDetail {
    /// Σ line totals, which must equal the order total.
    pub fn items_total(&self) -> Money {
        self.items
            .iter()
            .map(|item| Money::from_cents(item.total_amount_cents))
            .sum()
    }
}

/// Fields of a sale that may change after creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleUpdate {
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub remark: Option<String>,
}

// =============================================================================
// Bill
// =============================================================================

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum BillType {
    /// Money out: a purchase order was paid.
    Purchase,
    /// Money in: a sale was made.
    Sale,
}

impl BillType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BillType::Purchase => "purchase",
            BillType::Sale => "sale",
        }
    }
}

/// Append-only ledger row. Never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Bill {
    pub id: i64,
    pub bill_type: BillType,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub transaction_time: DateTime<Utc>,
    /// Purchase order id or sale order id, depending on `bill_type`.
    pub related_order: i64,
    pub operator_id: String,
}

impl Bill {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Users and Sessions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

/// A staff account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub username: String,
    pub employee_id: String,
    pub true_name: String,
    pub gender: Gender,
    pub age: Option<i64>,
    pub is_supervisor: bool,
    /// Argon2 PHC string. Never leaves the server.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
}

impl User {
    /// The operator this user acts as.
    pub fn operator(&self) -> Operator {
        Operator {
            employee_id: self.employee_id.clone(),
            is_supervisor: self.is_supervisor,
        }
    }
}

/// Input for registering a new account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub employee_id: String,
    pub true_name: String,
    pub gender: Gender,
    pub age: Option<i64>,
    pub is_supervisor: bool,
    pub password_hash: String,
}

/// Profile changes. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub employee_id: Option<String>,
    pub true_name: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<i64>,
    pub is_supervisor: Option<bool>,
    pub password_hash: Option<String>,
}

/// A live login. One per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Session {
    pub token: String,
    pub username: String,
    pub employee_id: String,
    pub is_supervisor: bool,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn operator(&self) -> Operator {
        Operator {
            employee_id: self.employee_id.clone(),
            is_supervisor: self.is_supervisor,
        }
    }
}

// =============================================================================
// Operator
// =============================================================================

/// The authenticated actor an operation is attributed to.
///
/// Resolved from the session by the API layer and passed into every
/// lifecycle operation. Order logic never looks at sessions itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Operator {
    pub employee_id: String,
    pub is_supervisor: bool,
}

impl Operator {
    pub fn new(employee_id: impl Into<String>, is_supervisor: bool) -> Self {
        Self {
            employee_id: employee_id.into(),
            is_supervisor,
        }
    }

    /// Fails with `PermissionDenied` unless the operator is a supervisor.
    pub fn require_supervisor(&self) -> CoreResult<()> {
        if self.is_supervisor {
            Ok(())
        } else {
            Err(CoreError::PermissionDenied(
                "supervisor privileges required".to_string(),
            ))
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn book(price: Option<i64>) -> Book {
        Book {
            isbn: "9780000000001".to_string(),
            title: "Rust".to_string(),
            author: None,
            publisher: None,
            retail_price_cents: price,
            stock: 5,
            version: 0,
        }
    }

    #[test]
    fn test_book_pricing() {
        assert_eq!(book(Some(2000)).retail_price(), Some(Money::from_cents(2000)));
        assert!(!book(None).is_priced());
        // A zero price counts as unset
        assert!(!book(Some(0)).is_priced());
    }

    #[test]
    fn test_book_info_starts_with_zero_stock() {
        let info = BookInfo {
            title: "Dune".to_string(),
            author: Some("Herbert".to_string()),
            publisher: None,
            retail_price_cents: None,
        };
        let new_book = info.into_new_book("9780000000002");
        assert_eq!(new_book.isbn, "9780000000002");
        assert_eq!(new_book.stock, 0);
    }

    #[test]
    fn test_payment_method_serde() {
        let json = serde_json::to_string(&PaymentMethod::BankCard).unwrap();
        assert_eq!(json, "\"bank_card\"");
        let parsed: PaymentMethod = serde_json::from_str("\"mobile\"").unwrap();
        assert_eq!(parsed, PaymentMethod::Mobile);
    }

    #[test]
    fn test_user_password_hash_not_serialized() {
        let user = User {
            username: "alice".to_string(),
            employee_id: "0002".to_string(),
            true_name: "Alice".to_string(),
            gender: Gender::Female,
            age: Some(30),
            is_supervisor: false,
            password_hash: "$argon2id$secret".to_string(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["gender"], "female");
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = Session {
            token: "t".to_string(),
            username: "alice".to_string(),
            employee_id: "0002".to_string(),
            is_supervisor: false,
            expires_at: now + Duration::hours(1),
        };
        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + Duration::hours(2)));
    }

    #[test]
    fn test_require_supervisor() {
        assert!(Operator::new("0001", true).require_supervisor().is_ok());
        let err = Operator::new("0002", false).require_supervisor().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Forbidden);
    }
}
