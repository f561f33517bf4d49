//! Ledger route. Bills are read-only over HTTP.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use bookstore_core::query::BillFilter;
use bookstore_core::{Bill, Page};

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/bills", get(list))
}

/// GET /bills
async fn list(
    State(state): State<AppState>,
    _current: CurrentUser,
    ApiQuery(filter): ApiQuery<BillFilter>,
) -> ApiResult<Json<Page<Bill>>> {
    let page = state.db.bills().list(&filter).await?;
    Ok(Json(page))
}
