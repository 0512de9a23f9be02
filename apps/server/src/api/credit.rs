//! # Credit Handlers

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use crate::api::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crate::auth::ActingUser;
use crate::error::ApiResult;
use crate::state::AppState;
use tally_core::{CreditPayment, NewCreditPayment, Sale, DEFAULT_OVERDUE_DAYS};

/// `POST /api/credit-payments`
pub async fn record(
    State(state): State<AppState>,
    user: ActingUser,
    payload: Result<Json<NewCreditPayment>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreditPayment>)> {
    let Json(input) = payload?;
    debug!(user = %user.id, sale_id = %input.sale_id, amount_cents = input.amount_cents, "record payment");

    let payment = state
        .db
        .credit_payments()
        .record_payment(&input, &user.id, &state.policy)
        .await?;

    Ok((StatusCode::CREATED, Json(payment)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub customer_id: Option<String>,
    pub limit: Option<u32>,
}

/// `GET /api/credit-payments?customerId=&limit=`
pub async fn history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<CreditPayment>>> {
    let Query(query) = query?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let payments = state
        .db
        .credit_payments()
        .list(query.customer_id.as_deref(), limit)
        .await?;
    Ok(Json(payments))
}

#[derive(Debug, Deserialize)]
pub struct OverdueQuery {
    pub days: Option<i64>,
}

/// `GET /api/credit/overdue?days=`
pub async fn overdue(
    State(state): State<AppState>,
    query: Result<Query<OverdueQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Sale>>> {
    let Query(query) = query?;
    let days = query.days.unwrap_or(DEFAULT_OVERDUE_DAYS);

    let sales = state.db.sales().overdue(days, Utc::now()).await?;
    Ok(Json(sales))
}
