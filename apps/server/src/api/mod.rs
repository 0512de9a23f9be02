//! # HTTP API
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | POST | `/api/sales` | [`sales::create`] |
//! | GET | `/api/sales` | [`sales::list`] |
//! | GET | `/api/sales/stats` | [`sales::stats`] |
//! | GET | `/api/sales/{id}` | [`sales::detail`] |
//! | GET | `/api/products/barcode/{barcode}` | [`products::by_barcode`] |
//! | GET | `/api/products/low-stock` | [`products::low_stock`] |
//! | POST | `/api/products/{id}/stock` | [`products::adjust_stock`] |
//! | POST | `/api/credit-payments` | [`credit::record`] |
//! | GET | `/api/credit-payments` | [`credit::history`] |
//! | GET | `/api/credit/overdue` | [`credit::overdue`] |
//! | POST | `/api/purchases` | [`purchases::create`] |
//! | GET | `/api/dashboard` | [`dashboard::stats`] |
//! | GET | `/health` | [`health::health`] |

pub mod credit;
pub mod dashboard;
pub mod health;
pub mod products;
pub mod purchases;
pub mod sales;


use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::state::AppState;

pub const DEFAULT_LIST_LIMIT: u32 = 50;
pub const MAX_LIST_LIMIT: u32 = 500;

/// `?limit=` shared by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

impl LimitQuery {
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/sales", post(sales::create).get(sales::list))
        .route("/api/sales/stats", get(sales::stats))
        .route("/api/sales/{id}", get(sales::detail))
        .route("/api/products/barcode/{barcode}", get(products::by_barcode))
        .route("/api/products/low-stock", get(products::low_stock))
        .route("/api/products/{id}/stock", post(products::adjust_stock))
        .route("/api/credit-payments", post(credit::record).get(credit::history))
        .route("/api/credit/overdue", get(credit::overdue))
        .route("/api/purchases", post(purchases::create))
        .route("/api/dashboard", get(dashboard::stats))
}
