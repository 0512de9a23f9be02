//! # Checkout
//!
//! Pure sale math: cart validation, totals, discount clamping, and the
//! paid/remaining split by payment type.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CheckoutRequest { customerId?, paymentType, discount, items[] }       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate()          empty cart, quantities, prices, credit w/o        │
//! │       │              customer → InvalidRequest                          │
//! │       ▼                                                                 │
//! │  verify_line()       per line against the stored Product               │
//! │       │              (unknown / inactive / price mismatch)              │
//! │       ▼                                                                 │
//! │  totals()            subtotal = Σ qty × unit price                     │
//! │       │              discount clamped to [0, subtotal]                  │
//! │       │              total = subtotal − discount                        │
//! │       ▼              cash: paid = total | credit: remaining = total     │
//! │  SaleTotals ─────────────────────────► tally-db::complete_sale         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::policy::LedgerPolicy;
use crate::types::{PaymentType, Product};
use crate::validation::{
    validate_discount_bps, validate_id, validate_line_count, validate_price_cents,
    validate_quantity,
};

// =============================================================================
// Request Types
// =============================================================================

/// One line of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl CartLine {
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
        CartLine {
            product_id: product_id.into(),
            quantity,
            unit_price_cents,
        }
    }

    /// `quantity × unit_price`, or `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price_cents
            .checked_mul(self.quantity)
            .map(Money::from_cents)
    }
}

/// Discount applied to the whole cart.
///
/// Serialized as `{"type":"percent","value":1000}` (10.00%) or
/// `{"type":"amount","value":250}` (2.50 off).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
#[ts(export)]
pub enum Discount {
    #[default]
    None,
    /// Basis points of the subtotal (1000 = 10%).
    Percent(u32),
    /// Fixed amount in cents.
    Amount(i64),
}

impl Discount {
    /// The discount in money for a given subtotal, clamped to `[0, subtotal]`.
    pub fn amount_for(&self, subtotal: Money) -> Money {
        let raw = match *self {
            Discount::None => Money::zero(),
            Discount::Percent(bps) => subtotal.percentage(bps),
            Discount::Amount(cents) => Money::from_cents(cents),
        };
        raw.clamp_to(Money::zero(), subtotal.max(Money::zero()))
    }
}

/// Everything needed to ring up a sale, minus the acting user.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub customer_id: Option<String>,
    pub payment_type: PaymentType,
    #[serde(default)]
    pub discount: Discount,
    pub items: Vec<CartLine>,
}

/// Computed money figures of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub paid: Money,
    pub remaining: Money,
}

// =============================================================================
// Validation & Totals
// =============================================================================

impl CheckoutRequest {
    /// Checks everything that can be checked without storage.
    pub fn validate(&self) -> CoreResult<()> {
        validate_line_count("items", self.items.len())?;

        for line in &self.items {
            validate_id("productId", &line.product_id)?;
            validate_quantity(line.quantity)?;
            validate_price_cents(line.unit_price_cents)?;
        }

        if let Discount::Percent(bps) = self.discount {
            validate_discount_bps(bps)?;
        }

        match self.customer_id.as_deref() {
            Some(id) => validate_id("customerId", id)?,
            None if self.payment_type.creates_debt() => {
                return Err(CoreError::invalid(format!(
                    "a {} sale requires a customer",
                    self.payment_type
                )));
            }
            None => {}
        }

        Ok(())
    }

    /// Validates the request and computes its totals.
    pub fn totals(&self) -> CoreResult<SaleTotals> {
        self.validate()?;

        let mut subtotal = Money::zero();
        for line in &self.items {
            let line_total = line
                .line_total()
                .ok_or_else(|| CoreError::invalid("line total is too large"))?;
            subtotal = Money::from_cents(
                subtotal
                    .cents()
                    .checked_add(line_total.cents())
                    .ok_or_else(|| CoreError::invalid("subtotal is too large"))?,
            );
        }

        Ok(split_totals(subtotal, self.discount, self.payment_type))
    }
}

/// Applies the discount and splits the total into paid and remaining.
pub fn split_totals(subtotal: Money, discount: Discount, payment_type: PaymentType) -> SaleTotals {
    let discount = discount.amount_for(subtotal);
    let total = subtotal - discount;
    let (paid, remaining) = if payment_type.creates_debt() {
        (Money::zero(), total)
    } else {
        (total, Money::zero())
    };

    SaleTotals {
        subtotal,
        discount,
        total,
        paid,
        remaining,
    }
}

/// Checks a cart line against the stored product it references.
///
/// `product` is `None` when the id did not resolve.
pub fn verify_line(
    line: &CartLine,
    product: Option<&Product>,
    policy: &LedgerPolicy,
) -> CoreResult<()> {
    let product = match product {
        Some(p) if p.is_active => p,
        Some(_) => {
            return Err(CoreError::invalid(format!(
                "product {} is inactive",
                line.product_id
            )))
        }
        None => {
            return Err(CoreError::invalid(format!(
                "unknown product {}",
                line.product_id
            )))
        }
    };

    if !policy.allow_price_override && line.unit_price_cents != product.sell_price_cents {
        return Err(CoreError::invalid(format!(
            "unit price {} for {} does not match sell price {}",
            Money::from_cents(line.unit_price_cents),
            product.name,
            product.sell_price()
        )));
    }

    Ok(())
}

// =============================================================================
// Document Numbers
// =============================================================================

/// Formats a sale or purchase number: `{prefix}{YYMMDD}-{HHMMSS}-{XXXX}`.
///
/// The suffix is four hex digits of caller-supplied randomness. Uniqueness is
/// enforced by storage, which asks for a new candidate on conflict.
pub fn document_number(prefix: char, at: DateTime<Utc>, entropy: u16) -> String {
    format!("{}{}-{:04X}", prefix, at.format("%y%m%d-%H%M%S"), entropy)
}

pub fn sale_number(at: DateTime<Utc>, entropy: u16) -> String {
    document_number('S', at, entropy)
}

pub fn purchase_number(at: DateTime<Utc>, entropy: u16) -> String {
    document_number('P', at, entropy)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request(payment_type: PaymentType, discount: Discount, items: Vec<CartLine>) -> CheckoutRequest {
        CheckoutRequest {
            customer_id: payment_type.creates_debt().then(|| "c-1".to_string()),
            payment_type,
            discount,
            items,
        }
    }

    fn product(id: &str, sell_price_cents: i64, is_active: bool) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: "Tea 250g".to_string(),
            description: None,
            barcode: None,
            brand: None,
            cost_price_cents: 300,
            sell_price_cents,
            stock_quantity: 10,
            min_stock: 2,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_cash_totals() {
        let req = request(
            PaymentType::Cash,
            Discount::None,
            vec![CartLine::new("p1", 2, 1000), CartLine::new("p2", 3, 333)],
        );
        let totals = req.totals().unwrap();

        assert_eq!(totals.subtotal.cents(), 2999);
        assert_eq!(totals.discount, Money::zero());
        assert_eq!(totals.total.cents(), 2999);
        assert_eq!(totals.paid, totals.total);
        assert_eq!(totals.remaining, Money::zero());
    }

    #[test]
    fn test_credit_totals_leave_everything_remaining() {
        let req = request(
            PaymentType::Credit,
            Discount::None,
            vec![CartLine::new("p1", 5, 1000)],
        );
        let totals = req.totals().unwrap();

        assert_eq!(totals.total.cents(), 5000);
        assert_eq!(totals.paid, Money::zero());
        assert_eq!(totals.remaining.cents(), 5000);
    }

    #[test]
    fn test_percent_discount_rounds_half_up() {
        // 12.5% of 9.99 = 1.24875 → 1.25
        let req = request(
            PaymentType::Cash,
            Discount::Percent(1250),
            vec![CartLine::new("p1", 1, 999)],
        );
        let totals = req.totals().unwrap();

        assert_eq!(totals.discount.cents(), 125);
        assert_eq!(totals.total.cents(), 874);
    }

    #[test]
    fn test_discount_is_clamped() {
        let subtotal = Money::from_cents(1000);
        assert_eq!(Discount::Amount(5000).amount_for(subtotal), subtotal);
        assert_eq!(Discount::Amount(-200).amount_for(subtotal), Money::zero());
        assert_eq!(Discount::Percent(10000).amount_for(subtotal), subtotal);
    }

    #[test]
    fn test_totals_always_balance() {
        let discounts = [
            Discount::None,
            Discount::Percent(1),
            Discount::Percent(3333),
            Discount::Percent(10000),
            Discount::Amount(1),
            Discount::Amount(999_999),
        ];
        for payment_type in [PaymentType::Cash, PaymentType::Credit, PaymentType::Installment] {
            for discount in discounts {
                let req = request(
                    payment_type,
                    discount,
                    vec![CartLine::new("p1", 7, 1999), CartLine::new("p2", 1, 1)],
                );
                let t = req.totals().unwrap();
                assert_eq!(t.total, t.subtotal - t.discount);
                assert_eq!(t.paid + t.remaining, t.total);
                assert!(!t.total.is_negative());
            }
        }
    }

    #[test]
    fn test_empty_cart_rejected() {
        let req = request(PaymentType::Cash, Discount::None, vec![]);
        assert!(req.totals().is_err());
    }

    #[test]
    fn test_bad_lines_rejected() {
        for line in [
            CartLine::new("p1", 0, 100),
            CartLine::new("p1", -2, 100),
            CartLine::new("p1", 1000, 100),
            CartLine::new("p1", 1, -1),
            CartLine::new("", 1, 100),
        ] {
            let req = request(PaymentType::Cash, Discount::None, vec![line]);
            assert!(req.validate().is_err());
        }
    }

    #[test]
    fn test_discount_over_hundred_percent_rejected() {
        let req = request(
            PaymentType::Cash,
            Discount::Percent(10001),
            vec![CartLine::new("p1", 1, 100)],
        );
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_credit_without_customer_rejected() {
        let mut req = request(
            PaymentType::Installment,
            Discount::None,
            vec![CartLine::new("p1", 1, 100)],
        );
        req.customer_id = None;
        let err = req.validate().unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequest(_)));
    }

    #[test]
    fn test_line_total_overflow_rejected() {
        let req = request(
            PaymentType::Cash,
            Discount::None,
            vec![CartLine::new("p1", 999, i64::MAX / 10)],
        );
        assert!(req.totals().is_err());
    }

    #[test]
    fn test_verify_line() {
        let policy = LedgerPolicy::default();
        let line = CartLine::new("p1", 1, 450);

        assert!(verify_line(&line, Some(&product("p1", 450, true)), &policy).is_ok());
        assert!(verify_line(&line, None, &policy).is_err());
        assert!(verify_line(&line, Some(&product("p1", 450, false)), &policy).is_err());
        assert!(verify_line(&line, Some(&product("p1", 500, true)), &policy).is_err());

        let overriding = LedgerPolicy {
            allow_price_override: true,
            ..LedgerPolicy::default()
        };
        assert!(verify_line(&line, Some(&product("p1", 500, true)), &overriding).is_ok());
    }

    #[test]
    fn test_discount_json_shape() {
        let json = serde_json::to_string(&Discount::Percent(1000)).unwrap();
        assert_eq!(json, r#"{"type":"percent","value":1000}"#);

        let parsed: Discount = serde_json::from_str(r#"{"type":"none"}"#).unwrap();
        assert_eq!(parsed, Discount::None);
    }

    #[test]
    fn test_document_numbers() {
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 14, 22, 33).unwrap();
        assert_eq!(sale_number(at, 0x9f3a), "S240315-142233-9F3A");
        assert_eq!(purchase_number(at, 0x000b), "P240315-142233-000B");
    }
}
