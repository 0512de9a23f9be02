//! # Purchase Handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::auth::ActingUser;
use crate::error::ApiResult;
use crate::state::AppState;
use tally_core::{NewPurchase, Purchase};

/// `POST /api/purchases`
pub async fn create(
    State(state): State<AppState>,
    user: ActingUser,
    payload: Result<Json<NewPurchase>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Purchase>)> {
    let Json(input) = payload?;

    let purchase = state
        .db
        .purchases()
        .create_purchase(&input, &user.id)
        .await?;

    Ok((StatusCode::CREATED, Json(purchase)))
}
