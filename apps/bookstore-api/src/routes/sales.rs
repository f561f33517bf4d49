//! Sale routes.
//!
//! | Path | Method |
//! |------|--------|
//! | /sales | POST, GET |
//! | /sales/{id} | GET, PUT, DELETE |

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use bookstore_core::query::SaleFilter;
use bookstore_core::sale::SaleRequest;
use bookstore_core::{Page, SaleOrder, SaleOrderDetail, SaleUpdate};
use tracing::info;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sales", get(list).post(create))
        .route("/sales/{id}", get(get_by_id).put(update).delete(delete))
}

/// POST /sales
async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(req): ApiJson<SaleRequest>,
) -> ApiResult<(StatusCode, Json<SaleOrderDetail>)> {
    let sale = state.db.sales().create_sale(&req, &current.operator).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// GET /sales
async fn list(
    State(state): State<AppState>,
    _current: CurrentUser,
    ApiQuery(filter): ApiQuery<SaleFilter>,
) -> ApiResult<Json<Page<SaleOrder>>> {
    let page = state.db.sales().list_sales(&filter).await?;
    Ok(Json(page))
}

/// GET /sales/{id}
async fn get_by_id(
    State(state): State<AppState>,
    _current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<SaleOrderDetail>> {
    let sale = state.db.sales().get_sale(id).await?;
    Ok(Json(sale))
}

/// PUT /sales/{id}
async fn update(
    State(state): State<AppState>,
    _current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<SaleUpdate>,
) -> ApiResult<Json<SaleOrderDetail>> {
    let sale = state.db.sales().update_sale(id, &update).await?;
    Ok(Json(sale))
}

/// DELETE /sales/{id}
///
/// Refused with `409` once the sale has a bill.
async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.db.sales().delete_sale(id).await?;
    info!(by = %current.operator.employee_id, sale_id = id, "Sale deleted");
    Ok(StatusCode::NO_CONTENT)
}
