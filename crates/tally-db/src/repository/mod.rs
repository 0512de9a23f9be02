//! # Repository Module
//!
//! Database repository implementations for the Tally ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.sales().complete_sale(&request, user_id, &policy)          │
//! │       ▼                                                                 │
//! │  SaleRepository                                                        │
//! │  ├── pre-validate against the pool (no storage effect)                 │
//! │  └── one transaction:                                                  │
//! │        INSERT sale ─► INSERT items ─► stock -= qty ─► debt += rem      │
//! │       │                                                                 │
//! │       │  COMMIT (or drop = ROLLBACK)                                    │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transaction Rules
//! - Reads that decide whether to proceed happen on the pool, before `BEGIN`.
//! - The first statement inside a write transaction is a write, so a second
//!   writer waits on the busy timeout instead of failing on a stale snapshot.
//! - Balances change only through relative updates (`col = col + ?`).
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Barcode lookup, inserts, stock adjuster
//! - [`CustomerRepository`] / [`SupplierRepository`] - Reference data
//! - [`SaleRepository`] - Sale transaction engine and sale queries
//! - [`CreditPaymentRepository`] - Credit payment reconciler
//! - [`PurchaseRepository`] - Stock intake from suppliers
//! - [`DashboardRepository`] - Read-only rollups and the debt audit

pub mod credit;
pub mod customer;
pub mod dashboard;
pub mod product;
pub mod purchase;
pub mod sale;
pub mod supplier;

#[cfg(test)]
pub(crate) mod testing;

pub use credit::CreditPaymentRepository;
pub use customer::CustomerRepository;
pub use dashboard::DashboardRepository;
pub use product::ProductRepository;
pub use purchase::PurchaseRepository;
pub use sale::SaleRepository;
pub use supplier::SupplierRepository;

use uuid::Uuid;

/// Generates a new entity ID.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Suffix for sale and purchase numbers: 16 random bits of a v4 UUID.
pub(crate) fn number_entropy() -> u16 {
    let bytes = Uuid::new_v4().into_bytes();
    u16::from_be_bytes([bytes[0], bytes[1]])
}
