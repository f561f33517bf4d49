//! # Dynamic WHERE Clauses
//!
//! Builds the filtered, sorted, paged read paths shared by every repository.
//!
//! ```text
//! BookFilter { title: "rust", min_price: 1000, sort_by: Title, page: 2 }
//!       │
//!       ▼
//! Conditions
//!   clauses:  ["title LIKE ? ESCAPE '\'", "retail_price_cents >= ?"]
//!   bindings: [Text("%rust%"), Integer(1000)]
//!       │
//!       ▼
//! fetch_page
//!   SELECT COUNT(*) FROM books WHERE …                 → total
//!   SELECT … FROM books WHERE … ORDER BY title ASC, isbn ASC LIMIT ? OFFSET ?
//! ```
//!
//! Column names only ever come from `&'static str` whitelists (the sort enums
//! and the repositories themselves); user input is always bound.

use bookstore_core::query::{PageRequest, TextMatch};
use bookstore_core::Page;
use chrono::{DateTime, Utc};
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{FromRow, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

#[derive(Debug, Clone)]
enum Binding {
    Text(String),
    Integer(i64),
    Time(DateTime<Utc>),
}

/// Accumulates `AND`-joined conditions and their bindings, in order.
#[derive(Debug, Default)]
pub(crate) struct Conditions {
    clauses: Vec<String>,
    bindings: Vec<Binding>,
}

impl Conditions {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, clause: String, binding: Binding) -> &mut Self {
        self.clauses.push(clause);
        self.bindings.push(binding);
        self
    }

    /// Exact equality or case-insensitive substring, per the matcher.
    pub(crate) fn text(&mut self, column: &'static str, matcher: Option<TextMatch>) -> &mut Self {
        match matcher {
            Some(TextMatch::Exact(value)) => self.push(format!("{column} = ?"), Binding::Text(value)),
            Some(TextMatch::Contains(value)) => self.push(
                format!("{column} LIKE ? ESCAPE '\\'"),
                Binding::Text(TextMatch::like_pattern(&value)),
            ),
            None => self,
        }
    }

    pub(crate) fn eq_text(&mut self, column: &'static str, value: Option<&str>) -> &mut Self {
        match value {
            Some(value) => self.push(format!("{column} = ?"), Binding::Text(value.to_string())),
            None => self,
        }
    }

    pub(crate) fn eq_i64(&mut self, column: &'static str, value: Option<i64>) -> &mut Self {
        match value {
            Some(value) => self.push(format!("{column} = ?"), Binding::Integer(value)),
            None => self,
        }
    }

    pub(crate) fn at_least(&mut self, column: &'static str, value: Option<i64>) -> &mut Self {
        match value {
            Some(value) => self.push(format!("{column} >= ?"), Binding::Integer(value)),
            None => self,
        }
    }

    pub(crate) fn at_most(&mut self, column: &'static str, value: Option<i64>) -> &mut Self {
        match value {
            Some(value) => self.push(format!("{column} <= ?"), Binding::Integer(value)),
            None => self,
        }
    }

    pub(crate) fn since(&mut self, column: &'static str, value: Option<DateTime<Utc>>) -> &mut Self {
        match value {
            Some(value) => self.push(format!("{column} >= ?"), Binding::Time(value)),
            None => self,
        }
    }

    pub(crate) fn until(&mut self, column: &'static str, value: Option<DateTime<Utc>>) -> &mut Self {
        match value {
            Some(value) => self.push(format!("{column} <= ?"), Binding::Time(value)),
            None => self,
        }
    }

    /// ` WHERE a AND b`, or an empty string when unfiltered.
    pub(crate) fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub(crate) fn bind_as<'q, O>(
        &'q self,
        mut query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    ) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
        for binding in &self.bindings {
            query = match binding {
                Binding::Text(value) => query.bind(value.as_str()),
                Binding::Integer(value) => query.bind(*value),
                Binding::Time(value) => query.bind(*value),
            };
        }
        query
    }

    pub(crate) fn bind_scalar<'q, O>(
        &'q self,
        mut query: QueryScalar<'q, Sqlite, O, SqliteArguments<'q>>,
    ) -> QueryScalar<'q, Sqlite, O, SqliteArguments<'q>> {
        for binding in &self.bindings {
            query = match binding {
                Binding::Text(value) => query.bind(value.as_str()),
                Binding::Integer(value) => query.bind(*value),
                Binding::Time(value) => query.bind(*value),
            };
        }
        query
    }
}

/// Runs the count and page queries for one filtered listing.
///
/// `order_by` must end with a unique column so pages never overlap.
pub(crate) async fn fetch_page<T>(
    pool: &SqlitePool,
    columns: &str,
    from: &str,
    conditions: &Conditions,
    order_by: &str,
    page: PageRequest,
) -> DbResult<Page<T>>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let where_clause = conditions.where_clause();

    let count_sql = format!("SELECT COUNT(*) FROM {from}{where_clause}");
    let total: i64 = conditions
        .bind_scalar(sqlx::query_scalar(&count_sql))
        .fetch_one(pool)
        .await?;

    let select_sql = format!(
        "SELECT {columns} FROM {from}{where_clause} ORDER BY {order_by} LIMIT ? OFFSET ?"
    );
    let items: Vec<T> = conditions
        .bind_as(sqlx::query_as::<_, T>(&select_sql))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    debug!(from = %from, total, returned = items.len(), page = page.page, "Fetched page");

    Ok(page.into_page(total, items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_where_clause() {
        assert_eq!(Conditions::new().where_clause(), "");
    }

    #[test]
    fn test_skips_absent_filters() {
        let mut conditions = Conditions::new();
        conditions
            .text("title", None)
            .eq_text("status", None)
            .at_least("stock", Some(3))
            .at_most("stock", None);

        assert_eq!(conditions.where_clause(), " WHERE stock >= ?");
        assert_eq!(conditions.bindings.len(), 1);
    }

    #[test]
    fn test_text_matchers() {
        let mut conditions = Conditions::new();
        conditions
            .text("isbn", Some(TextMatch::Exact("9780000000001".into())))
            .text("title", Some(TextMatch::Contains("50%".into())));

        assert_eq!(
            conditions.where_clause(),
            " WHERE isbn = ? AND title LIKE ? ESCAPE '\\'"
        );
        assert!(matches!(&conditions.bindings[1], Binding::Text(p) if p == "%50\\%%"));
    }
}
