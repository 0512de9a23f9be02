//! # Domain Types
//!
//! Core domain types used throughout the Tally ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │  CreditPayment  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  barcode        │   │  sale_number    │   │  sale_id (FK)   │       │
//! │  │  sell_price     │   │  payment_type   │   │  customer_id    │       │
//! │  │  stock_quantity │   │  total/paid/rem │   │  amount_cents   │       │
//! │  └─────────────────┘   └────────┬────────┘   └─────────────────┘       │
//! │                                 │ owns                                  │
//! │  ┌─────────────────┐   ┌────────▼────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │    SaleItem     │   │  PaymentType    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  total_debt     │   │  unit price     │   │  Cash           │       │
//! │  │  (= Σ remaining)│   │  (snapshot)     │   │  Credit         │       │
//! │  └─────────────────┘   └─────────────────┘   │  Installment    │       │
//! │                                              └─────────────────┘       │
//! │  Stock intake: Supplier ──► Purchase ──► PurchaseItem                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Money Columns
//! Every monetary field is stored as integer cents with a `_cents` suffix and
//! exposed as [`Money`] through an accessor of the same name without it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    pub description: Option<String>,

    /// Barcode (EAN-13, UPC-A, etc.). Unique when present.
    pub barcode: Option<String>,

    pub brand: Option<String>,

    /// What the store paid per unit, in cents.
    pub cost_price_cents: i64,

    /// Current shelf price per unit, in cents.
    pub sell_price_cents: i64,

    /// Units on hand. Only ever changed by a relative update.
    pub stock_quantity: i64,

    /// Threshold at or below which the product counts as low stock.
    pub min_stock: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    #[inline]
    pub fn sell_price(&self) -> Money {
        Money::from_cents(self.sell_price_cents)
    }

    /// Checks if the product is at or below its minimum stock.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock
    }

    /// Value of what is on hand at cost.
    pub fn inventory_value(&self) -> Money {
        self.cost_price() * self.stock_quantity
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    pub cost_price_cents: i64,
    pub sell_price_cents: i64,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default = "default_min_stock")]
    pub min_stock: i64,
}

fn default_min_stock() -> i64 {
    5
}

// =============================================================================
// Customer
// =============================================================================

/// A customer who may buy on credit.
///
/// `total_debt_cents` always equals the sum of `remaining_cents` over the
/// customer's non-cash sales. Sales raise it, credit payments lower it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub total_debt_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Customer {
    #[inline]
    pub fn total_debt(&self) -> Money {
        Money::from_cents(self.total_debt_cents)
    }
}

/// Input for creating a customer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewCustomer {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

// =============================================================================
// Supplier
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewSupplier {
    pub name: String,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

// =============================================================================
// Payment Type
// =============================================================================

/// How a sale is settled.
///
/// | Type | At checkout | Customer debt |
/// |---|---|---|
/// | `Cash` | paid = total | unchanged |
/// | `Credit` | paid = 0 | + total |
/// | `Installment` | paid = 0 | + total |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Cash,
    Credit,
    Installment,
}

impl PaymentType {
    /// Whether a sale of this type leaves a balance owed by the customer.
    #[inline]
    pub const fn creates_debt(&self) -> bool {
        !matches!(self, PaymentType::Cash)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Cash => "cash",
            PaymentType::Credit => "credit",
            PaymentType::Installment => "installment",
        }
    }
}

impl Default for PaymentType {
    fn default() -> Self {
        PaymentType::Cash
    }
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentType::Cash),
            "credit" => Ok(PaymentType::Credit),
            "installment" => Ok(PaymentType::Installment),
            _ => Err(ValidationError::NotAllowed {
                field: "paymentType".to_string(),
                allowed: vec![
                    "cash".to_string(),
                    "credit".to_string(),
                    "installment".to_string(),
                ],
            }),
        }
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// Lifecycle status of a sale or purchase record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Completed,
    Pending,
    Cancelled,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Completed
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A persisted sale. Never deleted; only `paid_cents` and `remaining_cents`
/// change after creation, and only through credit payments.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Human-readable unique number, e.g. `S240315-142233-9F3A`.
    pub sale_number: String,
    /// Absent for anonymous cash sales.
    pub customer_id: Option<String>,
    /// User who rang the sale up.
    pub user_id: String,
    pub payment_type: PaymentType,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub remaining_cents: i64,
    pub status: SaleStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_cents(self.paid_cents)
    }

    #[inline]
    pub fn remaining(&self) -> Money {
        Money::from_cents(self.remaining_cents)
    }

    /// `total == subtotal - discount` and `paid + remaining == total`.
    pub fn is_balanced(&self) -> bool {
        self.total() == self.subtotal() - self.discount()
            && self.paid() + self.remaining() == self.total()
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// unit_price × quantity.
    pub line_total_cents: i64,
}

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// A sale together with its line items.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// =============================================================================
// Credit Payment
// =============================================================================

/// A later payment against one non-cash sale. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreditPayment {
    pub id: String,
    pub sale_id: String,
    pub customer_id: String,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub payment_date: DateTime<Utc>,
    pub user_id: String,
    pub note: Option<String>,
}

impl CreditPayment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Input for recording a credit payment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewCreditPayment {
    pub sale_id: String,
    pub customer_id: String,
    pub amount_cents: i64,
    #[serde(default)]
    pub note: Option<String>,
}

// =============================================================================
// Purchases (stock intake)
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    /// Human-readable unique number, e.g. `P240315-142233-1B0C`.
    pub purchase_number: String,
    pub supplier_id: String,
    pub user_id: String,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub remaining_cents: i64,
    pub status: SaleStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Purchase {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub line_total_cents: i64,
}

/// One line of incoming stock.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

/// Input for recording a purchase from a supplier.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewPurchase {
    pub supplier_id: String,
    pub items: Vec<PurchaseLine>,
    /// Amount settled with the supplier up front. Defaults to the full total.
    #[serde(default)]
    pub paid_cents: Option<i64>,
}

// =============================================================================
// Read Models
// =============================================================================

/// Figures for the dashboard. Every field is zero on an empty store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardStats {
    pub today_sales_cents: i64,
    pub today_orders: i64,
    pub inventory_value_cents: i64,
    pub total_debt_cents: i64,
    pub low_stock_count: i64,
    pub total_products: i64,
}

/// Sales total and count over a time window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesStats {
    pub total_cents: i64,
    pub count: i64,
}

/// A customer whose stored debt disagrees with their open sale balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DebtMismatch {
    pub customer_id: String,
    pub customer_name: String,
    pub recorded_debt_cents: i64,
    pub outstanding_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
