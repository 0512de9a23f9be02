//! # Sale Handlers

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::api::LimitQuery;
use crate::auth::ActingUser;
use crate::error::ApiResult;
use crate::state::AppState;
use tally_core::{CheckoutRequest, Sale, SaleDetail, SalesStats};

/// `POST /api/sales`
pub async fn create(
    State(state): State<AppState>,
    user: ActingUser,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Sale>)> {
    let Json(request) = payload?;
    debug!(
        user = %user.id,
        payment_type = %request.payment_type,
        lines = request.items.len(),
        "create sale"
    );

    let sale = state
        .db
        .sales()
        .complete_sale(&request, &user.id, &state.policy)
        .await?;

    Ok((StatusCode::CREATED, Json(sale)))
}

/// `GET /api/sales?limit=`
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Sale>>> {
    let Query(query) = query?;
    let sales = state.db.sales().recent(query.limit()).await?;
    Ok(Json(sales))
}

/// `GET /api/sales/{id}`
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleDetail>> {
    let detail = state.db.sales().detail(&id).await?;
    Ok(Json(detail))
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// `GET /api/sales/stats?start=&end=`, both RFC 3339.
pub async fn stats(
    State(state): State<AppState>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> ApiResult<Json<SalesStats>> {
    let Query(query) = query?;
    let stats = state
        .db
        .sales()
        .stats_between(query.start, query.end)
        .await?;
    Ok(Json(stats))
}
