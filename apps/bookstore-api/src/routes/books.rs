//! Catalog routes.
//!
//! | Path | Method |
//! |------|--------|
//! | /books | GET, POST |
//! | /books/{isbn} | GET, PUT, DELETE |

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use bookstore_core::query::BookFilter;
use bookstore_core::{Book, BookPatch, NewBook, Page};
use tracing::info;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/books", get(list).post(create))
        .route("/books/{isbn}", get(get_by_isbn).put(update).delete(delete))
}

/// GET /books
async fn list(
    State(state): State<AppState>,
    _current: CurrentUser,
    ApiQuery(filter): ApiQuery<BookFilter>,
) -> ApiResult<Json<Page<Book>>> {
    let page = state.db.books().list(&filter).await?;
    Ok(Json(page))
}

/// POST /books
async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(book): ApiJson<NewBook>,
) -> ApiResult<(StatusCode, Json<Book>)> {
    let book = state.db.books().create(&book).await?;
    info!(by = %current.operator.employee_id, isbn = %book.isbn, "Book added");
    Ok((StatusCode::CREATED, Json(book)))
}

/// GET /books/{isbn}
async fn get_by_isbn(
    State(state): State<AppState>,
    _current: CurrentUser,
    ApiPath(isbn): ApiPath<String>,
) -> ApiResult<Json<Book>> {
    let book = state.db.books().get(&isbn).await?;
    Ok(Json(book))
}

/// PUT /books/{isbn}
async fn update(
    State(state): State<AppState>,
    _current: CurrentUser,
    ApiPath(isbn): ApiPath<String>,
    ApiJson(patch): ApiJson<BookPatch>,
) -> ApiResult<Json<Book>> {
    let book = state.db.books().update(&isbn, &patch).await?;
    Ok(Json(book))
}

/// DELETE /books/{isbn}
async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(isbn): ApiPath<String>,
) -> ApiResult<StatusCode> {
    state.db.books().delete(&isbn).await?;
    info!(by = %current.operator.employee_id, isbn = %isbn, "Book removed");
    Ok(StatusCode::NO_CONTENT)
}
