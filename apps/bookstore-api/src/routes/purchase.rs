//! Purchase order routes.
//!
//! ```text
//! POST /purchase/orders              ──► Unpaid
//! PUT  /purchase/orders/{id}/pay     Unpaid ──► Paid      (+ purchase bill)
//! PUT  /purchase/orders/{id}/return  Unpaid ──► Returned
//! PUT  /purchase/orders/{id}/arrive  Paid   ──► Arrived   (+ stock)
//! ```

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use bookstore_core::query::PurchaseFilter;
use bookstore_core::{Page, PurchaseArrival, PurchaseOrder, PurchaseOrderRequest, PurchasePayment};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/purchase/orders", get(list).post(create))
        .route("/purchase/orders/{id}", get(get_by_id))
        .route("/purchase/orders/{id}/pay", put(pay))
        .route("/purchase/orders/{id}/return", put(return_order))
        .route("/purchase/orders/{id}/arrive", put(arrive))
}

/// POST /purchase/orders
async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(req): ApiJson<PurchaseOrderRequest>,
) -> ApiResult<(StatusCode, Json<PurchaseOrder>)> {
    let order = state.db.purchases().create(&req, &current.operator).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /purchase/orders
async fn list(
    State(state): State<AppState>,
    _current: CurrentUser,
    ApiQuery(filter): ApiQuery<PurchaseFilter>,
) -> ApiResult<Json<Page<PurchaseOrder>>> {
    let page = state.db.purchases().list(&filter).await?;
    Ok(Json(page))
}

/// GET /purchase/orders/{id}
async fn get_by_id(
    State(state): State<AppState>,
    _current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<PurchaseOrder>> {
    let order = state.db.purchases().get(id).await?;
    Ok(Json(order))
}

/// PUT /purchase/orders/{id}/pay
async fn pay(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<PurchasePayment>> {
    let payment = state.db.purchases().pay(id, &current.operator).await?;
    Ok(Json(payment))
}

/// PUT /purchase/orders/{id}/return
async fn return_order(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<PurchaseOrder>> {
    let order = state.db.purchases().return_order(id, &current.operator).await?;
    Ok(Json(order))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ArriveQuery {
    /// Only used when the book has no retail price yet.
    pub retail_price_cents: Option<i64>,
}

/// PUT /purchase/orders/{id}/arrive?retail_price_cents=...
async fn arrive(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(req): ApiQuery<ArriveQuery>,
) -> ApiResult<Json<PurchaseArrival>> {
    let arrival = state
        .db
        .purchases()
        .arrive(id, &current.operator, req.retail_price_cents)
        .await?;
    Ok(Json(arrival))
}
