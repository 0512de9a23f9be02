//! # tally-server: HTTP/JSON Binding for the Tally Ledger
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/sales  (x-user-id: u-1)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  TraceLayer ─► ActingUser extractor ─► Json<CheckoutRequest>           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.sales().complete_sale(&request, user, &state.policy)               │
//! │       │                                                                 │
//! │       ├── Ok(Sale)      ─► 201 + sale JSON                             │
//! │       └── Err(DbError)  ─► ApiError { code, message } + status         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages
//! - `RUST_LOG=tally=trace` - Show trace for tally crates only
//! - Default: `info,tally=debug,sqlx=warn`

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::AppState;

/// Builds the application router with tracing attached.
pub fn app(state: AppState) -> Router {
    api::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
