//! # Shared Application State

use tally_core::LedgerPolicy;
use tally_db::Database;

/// Cloned into every handler. `Database` wraps a pool, so clones are cheap.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub policy: LedgerPolicy,
    pub store_name: String,
}

impl AppState {
    pub fn new(db: Database, policy: LedgerPolicy, store_name: impl Into<String>) -> Self {
        AppState {
            db,
            policy,
            store_name: store_name.into(),
        }
    }
}
