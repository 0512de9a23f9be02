//! # tally-core: Pure Business Logic for the Tally ledger
//!
//! This crate holds the rules of the sale and store-credit ledger as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/server (axum)                           │   │
//! │  │    POST /api/sales, POST /api/credit-payments, /api/dashboard   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ checkout  │  │  policy   │  │   │
//! │  │   │  Product  │  │   Money   │  │  totals   │  │  strict / │  │   │
//! │  │   │   Sale    │  │  (cents)  │  │  discount │  │ permissive│  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │        SQLite transactions: sale, payment, purchase, stock      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, Sale, CreditPayment, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`checkout`] - Cart validation and sale totals
//! - [`policy`] - Stock floor and overpayment guards
//! - [`error`] - Domain error types
//! - [`validation`] - Field-level validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::checkout::{CartLine, CheckoutRequest, Discount};
//! use tally_core::PaymentType;
//!
//! let request = CheckoutRequest {
//!     customer_id: None,
//!     payment_type: PaymentType::Cash,
//!     discount: Discount::Percent(1000), // 10%
//!     items: vec![CartLine::new("p-1", 2, 1000)],
//! };
//!
//! let totals = request.totals().unwrap();
//! assert_eq!(totals.subtotal.cents(), 2000);
//! assert_eq!(totals.discount.cents(), 200);
//! assert_eq!(totals.paid.cents(), 1800);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod money;
pub mod policy;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tally_core::Money` instead of
// `use tally_core::money::Money`

pub use checkout::{CartLine, CheckoutRequest, Discount, SaleTotals};
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use policy::{FloorPolicy, LedgerPolicy};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart or purchase.
///
/// ## Business Reason
/// Prevents runaway carts and keeps one sale transaction short.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// How many sale-number candidates a sale tries before giving up.
pub const MAX_NUMBER_ATTEMPTS: usize = 5;

/// Age after which an unpaid credit sale counts as overdue.
pub const DEFAULT_OVERDUE_DAYS: i64 = 30;
