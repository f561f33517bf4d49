//! # Query Types
//!
//! Filter, sort and page types for the read paths.
//!
//! Filters arrive already deserialized (from an HTTP query string) and are
//! checked with `validate()` before bookstore-db turns them into SQL. Sort
//! keys are enums, so only whitelisted columns can ever reach an
//! `ORDER BY`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::purchase::PurchaseStatus;
use crate::types::{BillType, Gender, PaymentMethod};
use crate::MAX_PAGE_SIZE;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

// =============================================================================
// Paging
// =============================================================================

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Page<T> {
    /// Rows matching the filter, across all pages.
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

/// A validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// ## Rules
    /// - page ≥ 1
    /// - 1 ≤ page_size ≤ MAX_PAGE_SIZE
    pub fn new(page: u32, page_size: u32) -> CoreResult<Self> {
        if page < 1 {
            return Err(ValidationError::MustBePositive {
                field: "page".to_string(),
            }
            .into());
        }

        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ValidationError::OutOfRange {
                field: "page_size".to_string(),
                min: 1,
                max: MAX_PAGE_SIZE as i64,
            }
            .into());
        }

        Ok(Self { page, page_size })
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }

    pub fn into_page<T>(self, total: i64, items: Vec<T>) -> Page<T> {
        Page {
            total,
            page: self.page,
            page_size: self.page_size,
            items,
        }
    }
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub const fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    fn desc() -> Self {
        SortOrder::Desc
    }
}

// =============================================================================
// Text Matching
// =============================================================================

/// A text filter: exact equality or case-insensitive substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextMatch {
    Exact(String),
    Contains(String),
}

impl TextMatch {
    /// Builds a matcher from a query value and its `exact_*` flag.
    /// Blank values mean "no filter".
    pub fn from_query(value: Option<&str>, exact: bool) -> Option<TextMatch> {
        let value = value?.trim();
        if value.is_empty() {
            return None;
        }

        Some(if exact {
            TextMatch::Exact(value.to_string())
        } else {
            TextMatch::Contains(value.to_string())
        })
    }

    /// Pattern for `LIKE ? ESCAPE '\'`, with wildcards in the value escaped.
    pub fn like_pattern(value: &str) -> String {
        let mut pattern = String::with_capacity(value.len() + 2);
        pattern.push('%');
        for c in value.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }
}

fn check_range<T: PartialOrd + Into<i64> + Copy>(
    field: &str,
    min: Option<T>,
    max: Option<T>,
) -> CoreResult<()> {
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(ValidationError::InvalidFormat {
                field: field.to_string(),
                reason: format!("minimum {} is greater than maximum {}", min.into(), max.into()),
            }
            .into());
        }
    }
    Ok(())
}

fn check_dates(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> CoreResult<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(ValidationError::InvalidFormat {
                field: "date range".to_string(),
                reason: "start_date is after end_date".to_string(),
            }
            .into());
        }
    }
    Ok(())
}

// =============================================================================
// Books
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BookSort {
    #[default]
    Isbn,
    Title,
    Author,
    Publisher,
    RetailPrice,
    Stock,
}

impl BookSort {
    pub const fn column(&self) -> &'static str {
        match self {
            BookSort::Isbn => "isbn",
            BookSort::Title => "title",
            BookSort::Author => "author",
            BookSort::Publisher => "publisher",
            BookSort::RetailPrice => "retail_price_cents",
            BookSort::Stock => "stock",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct BookFilter {
    pub isbn: Option<String>,
    pub exact_isbn: bool,
    pub title: Option<String>,
    pub exact_title: bool,
    pub author: Option<String>,
    pub exact_author: bool,
    pub publisher: Option<String>,
    pub exact_publisher: bool,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_stock: Option<i64>,
    pub max_stock: Option<i64>,
    pub sort_by: BookSort,
    pub sort_order: SortOrder,
    pub page: u32,
    pub page_size: u32,
}

impl Default for BookFilter {
    fn default() -> Self {
        Self {
            isbn: None,
            exact_isbn: false,
            title: None,
            exact_title: false,
            author: None,
            exact_author: false,
            publisher: None,
            exact_publisher: false,
            min_price: None,
            max_price: None,
            min_stock: None,
            max_stock: None,
            sort_by: BookSort::default(),
            sort_order: SortOrder::Asc,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl BookFilter {
    pub fn validate(&self) -> CoreResult<PageRequest> {
        check_range("retail_price", self.min_price, self.max_price)?;
        check_range("stock", self.min_stock, self.max_stock)?;
        PageRequest::new(self.page, self.page_size)
    }
}

// =============================================================================
// Purchase Orders
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseSort {
    #[default]
    OrderDate,
    PurchasePrice,
    Quantity,
    TotalAmount,
}

impl PurchaseSort {
    pub const fn column(&self) -> &'static str {
        match self {
            PurchaseSort::OrderDate => "order_date",
            PurchaseSort::PurchasePrice => "purchase_price_cents",
            PurchaseSort::Quantity => "quantity",
            PurchaseSort::TotalAmount => "total_amount_cents",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct PurchaseFilter {
    pub id: Option<i64>,
    pub isbn: Option<String>,
    pub exact_isbn: bool,
    pub status: Option<PurchaseStatus>,
    pub created_by: Option<String>,
    pub exact_created_by: bool,
    pub settled_by: Option<String>,
    pub exact_settled_by: bool,
    pub received_by: Option<String>,
    pub exact_received_by: bool,
    #[ts(as = "Option<String>")]
    pub start_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub end_date: Option<DateTime<Utc>>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_quantity: Option<i64>,
    pub max_quantity: Option<i64>,
    /// Without a sort key, orders list oldest first and `sort_order` is
    /// ignored.
    pub sort_by: Option<PurchaseSort>,
    pub sort_order: SortOrder,
    pub page: u32,
    pub page_size: u32,
}

impl Default for PurchaseFilter {
    fn default() -> Self {
        Self {
            id: None,
            isbn: None,
            exact_isbn: false,
            status: None,
            created_by: None,
            exact_created_by: false,
            settled_by: None,
            exact_settled_by: false,
            received_by: None,
            exact_received_by: false,
            start_date: None,
            end_date: None,
            min_price: None,
            max_price: None,
            min_quantity: None,
            max_quantity: None,
            sort_by: None,
            sort_order: SortOrder::desc(),
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PurchaseFilter {
    pub fn validate(&self) -> CoreResult<PageRequest> {
        check_dates(self.start_date, self.end_date)?;
        check_range("purchase_price", self.min_price, self.max_price)?;
        check_range("quantity", self.min_quantity, self.max_quantity)?;
        PageRequest::new(self.page, self.page_size)
    }

    /// The effective sort key and direction.
    pub fn ordering(&self) -> (PurchaseSort, SortOrder) {
        match self.sort_by {
            Some(sort) => (sort, self.sort_order),
            None => (PurchaseSort::OrderDate, SortOrder::Asc),
        }
    }
}

// =============================================================================
// Sale Orders
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleSort {
    #[default]
    CreatedAt,
    TransactionNo,
    TotalAmount,
}

impl SaleSort {
    pub const fn column(&self) -> &'static str {
        match self {
            SaleSort::CreatedAt => "created_at",
            SaleSort::TransactionNo => "transaction_no",
            SaleSort::TotalAmount => "total_amount_cents",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct SaleFilter {
    pub transaction_no: Option<String>,
    pub exact_transaction_no: bool,
    pub payment_method: Option<PaymentMethod>,
    pub operator_id: Option<String>,
    pub exact_operator_id: bool,
    pub min_amount: Option<i64>,
    pub max_amount: Option<i64>,
    #[ts(as = "Option<String>")]
    pub start_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub end_date: Option<DateTime<Utc>>,
    pub sort_by: SaleSort,
    pub sort_order: SortOrder,
    pub page: u32,
    pub page_size: u32,
}

impl Default for SaleFilter {
    fn default() -> Self {
        Self {
            transaction_no: None,
            exact_transaction_no: false,
            payment_method: None,
            operator_id: None,
            exact_operator_id: false,
            min_amount: None,
            max_amount: None,
            start_date: None,
            end_date: None,
            sort_by: SaleSort::default(),
            sort_order: SortOrder::desc(),
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl SaleFilter {
    pub fn validate(&self) -> CoreResult<PageRequest> {
        check_dates(self.start_date, self.end_date)?;
        check_range("total_amount", self.min_amount, self.max_amount)?;
        PageRequest::new(self.page, self.page_size)
    }
}

// =============================================================================
// Bills
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BillSort {
    #[default]
    TransactionTime,
    Amount,
    BillType,
}

impl BillSort {
    pub const fn column(&self) -> &'static str {
        match self {
            BillSort::TransactionTime => "transaction_time",
            BillSort::Amount => "amount_cents",
            BillSort::BillType => "bill_type",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct BillFilter {
    pub bill_type: Option<BillType>,
    #[ts(as = "Option<String>")]
    pub start_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub end_date: Option<DateTime<Utc>>,
    pub min_amount: Option<i64>,
    pub max_amount: Option<i64>,
    pub operator_id: Option<String>,
    pub exact_operator_id: bool,
    pub related_order: Option<i64>,
    pub sort_by: BillSort,
    pub sort_order: SortOrder,
    pub page: u32,
    pub page_size: u32,
}

impl Default for BillFilter {
    fn default() -> Self {
        Self {
            bill_type: None,
            start_date: None,
            end_date: None,
            min_amount: None,
            max_amount: None,
            operator_id: None,
            exact_operator_id: false,
            related_order: None,
            sort_by: BillSort::default(),
            sort_order: SortOrder::desc(),
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl BillFilter {
    pub fn validate(&self) -> CoreResult<PageRequest> {
        check_dates(self.start_date, self.end_date)?;
        check_range("amount", self.min_amount, self.max_amount)?;
        PageRequest::new(self.page, self.page_size)
    }
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UserSort {
    #[default]
    Username,
    EmployeeId,
    TrueName,
    Age,
}

impl UserSort {
    pub const fn column(&self) -> &'static str {
        match self {
            UserSort::Username => "username",
            UserSort::EmployeeId => "employee_id",
            UserSort::TrueName => "true_name",
            UserSort::Age => "age",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct UserFilter {
    pub username: Option<String>,
    pub exact_username: bool,
    pub employee_id: Option<String>,
    pub exact_employee_id: bool,
    pub true_name: Option<String>,
    pub exact_true_name: bool,
    pub gender: Option<Gender>,
    pub is_supervisor: Option<bool>,
    pub sort_by: UserSort,
    pub sort_order: SortOrder,
    pub page: u32,
    pub page_size: u32,
}

impl Default for UserFilter {
    fn default() -> Self {
        Self {
            username: None,
            exact_username: false,
            employee_id: None,
            exact_employee_id: false,
            true_name: None,
            exact_true_name: false,
            gender: None,
            is_supervisor: None,
            sort_by: UserSort::default(),
            sort_order: SortOrder::Asc,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl UserFilter {
    pub fn validate(&self) -> CoreResult<PageRequest> {
        PageRequest::new(self.page, self.page_size)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_page_request_bounds() {
        let req = PageRequest::new(3, 20).unwrap();
        assert_eq!(req.limit(), 20);
        assert_eq!(req.offset(), 40);

        assert!(PageRequest::new(0, 10).is_err());
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(1, MAX_PAGE_SIZE).is_ok());
        assert!(PageRequest::new(1, MAX_PAGE_SIZE + 1).is_err());
    }

    #[test]
    fn test_text_match() {
        assert_eq!(TextMatch::from_query(None, true), None);
        assert_eq!(TextMatch::from_query(Some("  "), false), None);
        assert_eq!(
            TextMatch::from_query(Some(" Rust "), true),
            Some(TextMatch::Exact("Rust".to_string()))
        );
        assert_eq!(
            TextMatch::from_query(Some("Rust"), false),
            Some(TextMatch::Contains("Rust".to_string()))
        );
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(TextMatch::like_pattern("rust"), "%rust%");
        assert_eq!(TextMatch::like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_filter_defaults() {
        let books = BookFilter::default();
        assert_eq!(books.sort_by, BookSort::Isbn);
        assert_eq!(books.sort_order, SortOrder::Asc);

        let sales = SaleFilter::default();
        assert_eq!(sales.sort_by, SaleSort::CreatedAt);
        assert_eq!(sales.sort_order, SortOrder::Desc);
        assert_eq!(sales.page, 1);
        assert_eq!(sales.page_size, DEFAULT_PAGE_SIZE);

        let bills = BillFilter::default();
        assert_eq!(bills.sort_order, SortOrder::Desc);

        let purchases = PurchaseFilter::default();
        assert_eq!(purchases.ordering(), (PurchaseSort::OrderDate, SortOrder::Asc));
    }

    #[test]
    fn test_purchase_sort_key_defaults_to_descending() {
        let filter: PurchaseFilter =
            serde_json::from_str(r#"{"sort_by":"quantity"}"#).unwrap();
        assert_eq!(filter.ordering(), (PurchaseSort::Quantity, SortOrder::Desc));

        let filter: PurchaseFilter =
            serde_json::from_str(r#"{"sort_by":"quantity","sort_order":"asc"}"#).unwrap();
        assert_eq!(filter.ordering(), (PurchaseSort::Quantity, SortOrder::Asc));
    }

    #[test]
    fn test_filter_deserializes_from_partial_json() {
        let filter: PurchaseFilter =
            serde_json::from_str(r#"{"status":"paid","sort_by":"total_amount"}"#).unwrap();
        assert_eq!(filter.status, Some(PurchaseStatus::Paid));
        assert_eq!(filter.sort_by, Some(PurchaseSort::TotalAmount));
        assert_eq!(filter.page, 1);
        assert_eq!(filter.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_inverted_ranges_rejected() {
        let filter = BookFilter {
            min_stock: Some(10),
            max_stock: Some(1),
            ..Default::default()
        };
        assert!(filter.validate().is_err());

        let now = Utc::now();
        let filter = SaleFilter {
            start_date: Some(now),
            end_date: Some(now - Duration::days(1)),
            ..Default::default()
        };
        assert!(filter.validate().is_err());
    }
}
