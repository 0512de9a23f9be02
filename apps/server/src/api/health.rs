//! # Health Check
//!
//! ```json
//! { "status": "ok", "version": "0.1.0", "storeName": "Tally Store", "database": "ok" }
//! ```

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok` or `degraded`
    status: &'static str,
    version: &'static str,
    store_name: String,
    /// `ok` or `error`
    database: &'static str,
}

/// `GET /health`. Answers 503 when the database does not respond.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_ok = state.db.health_check().await;

    let (status, code, database) = if db_ok {
        ("ok", StatusCode::OK, "ok")
    } else {
        ("degraded", StatusCode::SERVICE_UNAVAILABLE, "error")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            store_name: state.store_name.clone(),
            database,
        }),
    )
}
