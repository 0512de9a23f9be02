//! # Dashboard Handler

use axum::extract::State;
use axum::Json;

use crate::error::ApiResult;
use crate::state::AppState;
use tally_core::DashboardStats;

/// `GET /api/dashboard`
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<DashboardStats>> {
    let stats = state.db.dashboard().stats().await?;
    Ok(Json(stats))
}
