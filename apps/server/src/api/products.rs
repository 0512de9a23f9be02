//! # Product Handlers

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::api::LimitQuery;
use crate::auth::ActingUser;
use crate::error::ApiResult;
use crate::state::AppState;
use tally_core::Product;

/// `GET /api/products/barcode/{barcode}`
pub async fn by_barcode(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> ApiResult<Json<Product>> {
    let product = state.db.products().get_by_barcode(&barcode).await?;
    Ok(Json(product))
}

/// `GET /api/products/low-stock?limit=`
pub async fn low_stock(
    State(state): State<AppState>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Product>>> {
    let Query(query) = query?;
    let products = state.db.products().low_stock(query.limit()).await?;
    Ok(Json(products))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub delta: i64,
}

/// `POST /api/products/{id}/stock` with `{"delta": n}`. Admin only.
pub async fn adjust_stock(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<String>,
    payload: Result<Json<StockAdjustment>, JsonRejection>,
) -> ApiResult<Json<Product>> {
    user.require_admin()?;
    let Json(adjustment) = payload?;

    let product = state
        .db
        .products()
        .adjust_stock(&id, adjustment.delta, &state.policy)
        .await?;

    info!(
        user = %user.id,
        product_id = %product.id,
        delta = adjustment.delta,
        stock = product.stock_quantity,
        "Manual stock adjustment"
    );
    Ok(Json(product))
}
