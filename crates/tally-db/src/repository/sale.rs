//! # Sale Repository
//!
//! The sale transaction engine and the read side of sales.
//!
//! ## complete_sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Completing a Sale                                 │
//! │                                                                         │
//! │  1. VALIDATE (no storage effect)                                       │
//! │     ├── CheckoutRequest::totals()   empty cart, qty, discount, ...     │
//! │     ├── each product: exists, active, price matches                    │
//! │     └── customer exists (when given)                                   │
//! │                                                                         │
//! │  2. ONE TRANSACTION                                                    │
//! │     ├── INSERT sales            (new sale number on UNIQUE conflict)   │
//! │     ├── INSERT sale_items       (unit price + name snapshot)           │
//! │     ├── stock_quantity -= qty   (floored when strict)                  │
//! │     └── total_debt += remaining (credit / installment only)            │
//! │                                                                         │
//! │  3. COMMIT                                                             │
//! │     └── any error before this point drops the transaction: nothing     │
//! │         of the sale is ever visible to other connections               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::product::apply_stock_delta;
use crate::repository::{generate_id, number_entropy};
use tally_core::checkout::{sale_number, verify_line};
use tally_core::validation::validate_id;
use tally_core::{
    CheckoutRequest, LedgerPolicy, Product, Sale, SaleDetail, SaleItem, SaleStatus, SalesStats,
    MAX_NUMBER_ATTEMPTS,
};

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Converts a cart into a persisted sale, atomically.
    ///
    /// ## Arguments
    /// * `request` - Cart, payment type, discount, optional customer
    /// * `user_id` - Acting user, recorded on the sale
    /// * `policy` - Stock floor and price override rules
    ///
    /// ## Errors
    /// * `InvalidRequest` - bad cart, unknown/inactive product or customer,
    ///   price mismatch, credit sale without customer
    /// * `ConsistencyViolation` - strict stock floor would be crossed
    /// * `StorageFailure` - anything the database refused; nothing was written
    pub async fn complete_sale(
        &self,
        request: &CheckoutRequest,
        user_id: &str,
        policy: &LedgerPolicy,
    ) -> DbResult<Sale> {
        self.complete_sale_numbered(request, user_id, policy, || {
            sale_number(Utc::now(), number_entropy())
        })
        .await
    }

    /// [`complete_sale`](Self::complete_sale) with the sale-number source
    /// supplied by the caller. Each UNIQUE conflict draws the next candidate.
    pub(crate) async fn complete_sale_numbered<F>(
        &self,
        request: &CheckoutRequest,
        user_id: &str,
        policy: &LedgerPolicy,
        next_number: F,
    ) -> DbResult<Sale>
    where
        F: FnMut() -> String,
    {
        validate_id("userId", user_id)?;
        let totals = request.totals()?;

        debug!(
            lines = request.items.len(),
            payment_type = %request.payment_type,
            subtotal = %totals.subtotal,
            "Validating sale"
        );

        let products = self.load_cart_products(request, policy).await?;

        if let Some(customer_id) = request.customer_id.as_deref() {
            let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM customers WHERE id = ?1")
                .bind(customer_id)
                .fetch_optional(&self.pool)
                .await?;
            if exists.is_none() {
                return Err(DbError::invalid(format!("unknown customer {}", customer_id)));
            }
        }

        let now = Utc::now();
        let mut sale = Sale {
            id: generate_id(),
            sale_number: String::new(),
            customer_id: request.customer_id.clone(),
            user_id: user_id.to_string(),
            payment_type: request.payment_type,
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount.cents(),
            total_cents: totals.total.cents(),
            paid_cents: totals.paid.cents(),
            remaining_cents: totals.remaining.cents(),
            status: SaleStatus::Completed,
            created_at: now,
        };

        let mut tx = self.pool.begin().await?;

        sale.sale_number = insert_sale_row(&mut tx, &sale, next_number).await?;

        for line in &request.items {
            let name_snapshot = products
                .get(line.product_id.as_str())
                .map(|p| p.name.clone())
                .unwrap_or_default();

            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, name_snapshot,
                    quantity, unit_price_cents, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(generate_id())
            .bind(&sale.id)
            .bind(&line.product_id)
            .bind(name_snapshot)
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .bind(line.unit_price_cents * line.quantity)
            .execute(&mut *tx)
            .await?;

            apply_stock_delta(&mut tx, &line.product_id, -line.quantity, policy.stock_floor, now)
                .await
                .map_err(|e| match e {
                    DbError::NotFound { id, .. } => DbError::invalid(format!("unknown product {}", id)),
                    other => other,
                })?;
        }

        if sale.payment_type.creates_debt() {
            if let Some(customer_id) = sale.customer_id.as_deref() {
                add_customer_debt(&mut tx, customer_id, sale.remaining_cents).await?;
            }
        }

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            sale_number = %sale.sale_number,
            payment_type = %sale.payment_type,
            total = %sale.total(),
            remaining = %sale.remaining(),
            "Sale completed"
        );

        Ok(sale)
    }

    /// Loads and checks every product the cart references, before any write.
    async fn load_cart_products(
        &self,
        request: &CheckoutRequest,
        policy: &LedgerPolicy,
    ) -> DbResult<HashMap<String, Product>> {
        let mut products: HashMap<String, Product> = HashMap::new();

        for line in &request.items {
            if !products.contains_key(&line.product_id) {
                let product =
                    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
                        .bind(&line.product_id)
                        .fetch_optional(&self.pool)
                        .await?;
                if let Some(product) = product {
                    products.insert(line.product_id.clone(), product);
                }
            }

            verify_line(line, products.get(&line.product_id), policy)?;
        }

        Ok(products)
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets a sale or fails with `NotFound`.
    pub async fn get(&self, id: &str) -> DbResult<Sale> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))
    }

    /// Gets all items for a sale, in insertion order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            "SELECT * FROM sale_items WHERE sale_id = ?1 ORDER BY rowid",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// A sale together with its line items.
    pub async fn detail(&self, id: &str) -> DbResult<SaleDetail> {
        let sale = self.get(id).await?;
        let items = self.get_items(id).await?;
        Ok(SaleDetail { sale, items })
    }

    /// Most recent sales first.
    pub async fn recent(&self, limit: u32) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            "SELECT * FROM sales ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Sales total and count for `[start, end)`.
    pub async fn stats_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<SalesStats> {
        if end < start {
            return Err(DbError::invalid("end must not be before start"));
        }

        let (total_cents, count): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(total_cents), 0), COUNT(*)
            FROM sales
            WHERE created_at >= ?1 AND created_at < ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(SalesStats { total_cents, count })
    }

    /// Credit and installment sales still owing money after `days` days.
    pub async fn overdue(&self, days: i64, now: DateTime<Utc>) -> DbResult<Vec<Sale>> {
        if days < 0 {
            return Err(DbError::invalid("days must not be negative"));
        }
        let cutoff = now - Duration::days(days);

        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT * FROM sales
            WHERE payment_type != 'cash'
              AND remaining_cents > 0
              AND created_at < ?1
            ORDER BY created_at ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }
}

/// Inserts the sale row, drawing the next candidate number on each UNIQUE
/// conflict, at most `MAX_NUMBER_ATTEMPTS` times.
///
/// Returns the number that was stored.
async fn insert_sale_row(
    conn: &mut SqliteConnection,
    sale: &Sale,
    mut next_number: impl FnMut() -> String,
) -> DbResult<String> {
    let mut last_candidate = String::new();

    for attempt in 1..=MAX_NUMBER_ATTEMPTS {
        let candidate = next_number();

        let result = sqlx::query(
            r#"
            INSERT INTO sales (
                id, sale_number, customer_id, user_id, payment_type,
                subtotal_cents, discount_cents, total_cents,
                paid_cents, remaining_cents, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&sale.id)
        .bind(&candidate)
        .bind(&sale.customer_id)
        .bind(&sale.user_id)
        .bind(sale.payment_type)
        .bind(sale.subtotal_cents)
        .bind(sale.discount_cents)
        .bind(sale.total_cents)
        .bind(sale.paid_cents)
        .bind(sale.remaining_cents)
        .bind(sale.status)
        .bind(sale.created_at)
        .execute(&mut *conn)
        .await
        .map_err(DbError::from);

        match result {
            Ok(_) => return Ok(candidate),
            Err(err) if err.is_unique_violation_on("sales.sale_number") => {
                warn!(attempt = attempt, candidate = %candidate, "Sale number taken, retrying");
                last_candidate = candidate;
            }
            Err(err) => return Err(err),
        }
    }

    Err(DbError::duplicate("sales.sale_number", last_candidate))
}

/// `total_debt_cents += amount` for one customer.
async fn add_customer_debt(
    conn: &mut SqliteConnection,
    customer_id: &str,
    amount_cents: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE customers SET total_debt_cents = total_debt_cents + ?1 WHERE id = ?2",
    )
    .bind(amount_cents)
    .bind(customer_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::invalid(format!("unknown customer {}", customer_id)));
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{seed_customer, seed_product, test_db};
    use crate::{Database, DbConfig};
    use tally_core::checkout::{CartLine, Discount};
    use tally_core::{ErrorKind, FloorPolicy, PaymentType};

    fn cash(items: Vec<CartLine>) -> CheckoutRequest {
        CheckoutRequest {
            customer_id: None,
            payment_type: PaymentType::Cash,
            discount: Discount::None,
            items,
        }
    }

    fn on_credit(customer_id: &str, items: Vec<CartLine>) -> CheckoutRequest {
        CheckoutRequest {
            customer_id: Some(customer_id.to_string()),
            payment_type: PaymentType::Credit,
            discount: Discount::None,
            items,
        }
    }

    async fn stock_of(db: &Database, id: &str) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().stock_quantity
    }

    async fn sale_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_cash_sale_decrements_stock() {
        let db = test_db().await;
        let p1 = seed_product(&db, "Rice 5kg", None, 1000, 10).await;

        let sale = db
            .sales()
            .complete_sale(
                &cash(vec![CartLine::new(&p1.id, 2, 1000)]),
                "u-1",
                &LedgerPolicy::default(),
            )
            .await
            .unwrap();

        assert_eq!(sale.subtotal_cents, 2000);
        assert_eq!(sale.total_cents, 2000);
        assert_eq!(sale.paid_cents, 2000);
        assert_eq!(sale.remaining_cents, 0);
        assert!(sale.is_balanced());
        assert!(sale.sale_number.starts_with('S'));
        assert_eq!(stock_of(&db, &p1.id).await, 8);

        let stored = db.sales().get(&sale.id).await.unwrap();
        assert_eq!(stored.sale_number, sale.sale_number);
        assert_eq!(stored.payment_type, PaymentType::Cash);
        assert_eq!(stored.status, SaleStatus::Completed);
    }

    #[tokio::test]
    async fn test_items_sum_to_subtotal_and_snapshot_price() {
        let db = test_db().await;
        let p1 = seed_product(&db, "Tea", None, 450, 10).await;
        let p2 = seed_product(&db, "Milk", None, 199, 10).await;

        let mut request = cash(vec![CartLine::new(&p1.id, 3, 450), CartLine::new(&p2.id, 2, 199)]);
        request.discount = Discount::Percent(1000);

        let sale = db
            .sales()
            .complete_sale(&request, "u-1", &LedgerPolicy::default())
            .await
            .unwrap();
        let detail = db.sales().detail(&sale.id).await.unwrap();

        let item_sum: i64 = detail.items.iter().map(|i| i.line_total_cents).sum();
        assert_eq!(item_sum, sale.subtotal_cents);
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].name_snapshot, "Tea");
        assert_eq!(detail.items[0].unit_price_cents, 450);
        assert_eq!(sale.discount_cents, 175);
        assert_eq!(sale.total_cents, 1748 - 175);
        assert!(detail.sale.is_balanced());

        // Later price changes do not touch the recorded sale.
        sqlx::query("UPDATE products SET sell_price_cents = 999 WHERE id = ?1")
            .bind(&p1.id)
            .execute(db.pool())
            .await
            .unwrap();
        let items = db.sales().get_items(&sale.id).await.unwrap();
        assert_eq!(items[0].unit_price_cents, 450);
    }

    #[tokio::test]
    async fn test_credit_sale_raises_debt() {
        let db = test_db().await;
        let p1 = seed_product(&db, "Flour", None, 1000, 10).await;
        let customer = seed_customer(&db, "Bilal").await;

        let sale = db
            .sales()
            .complete_sale(
                &on_credit(&customer.id, vec![CartLine::new(&p1.id, 5, 1000)]),
                "u-1",
                &LedgerPolicy::default(),
            )
            .await
            .unwrap();

        assert_eq!(sale.total_cents, 5000);
        assert_eq!(sale.paid_cents, 0);
        assert_eq!(sale.remaining_cents, 5000);

        let customer = db.customers().get(&customer.id).await.unwrap();
        assert_eq!(customer.total_debt_cents, 5000);
    }

    #[tokio::test]
    async fn test_cash_sale_with_customer_leaves_debt_alone() {
        let db = test_db().await;
        let p1 = seed_product(&db, "Flour", None, 1000, 10).await;
        let customer = seed_customer(&db, "Bilal").await;

        let mut request = cash(vec![CartLine::new(&p1.id, 1, 1000)]);
        request.customer_id = Some(customer.id.clone());
        db.sales()
            .complete_sale(&request, "u-1", &LedgerPolicy::default())
            .await
            .unwrap();

        let customer = db.customers().get(&customer.id).await.unwrap();
        assert_eq!(customer.total_debt_cents, 0);
    }

    #[tokio::test]
    async fn test_empty_cart_has_no_effect() {
        let db = test_db().await;
        let err = db
            .sales()
            .complete_sale(&cash(vec![]), "u-1", &LedgerPolicy::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(sale_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_product_rolls_back_everything() {
        let db = test_db().await;
        let p1 = seed_product(&db, "Oil", None, 800, 10).await;
        let customer = seed_customer(&db, "Chen").await;

        let err = db
            .sales()
            .complete_sale(
                &on_credit(
                    &customer.id,
                    vec![CartLine::new(&p1.id, 2, 800), CartLine::new("no-such-product", 1, 100)],
                ),
                "u-1",
                &LedgerPolicy::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(stock_of(&db, &p1.id).await, 10);
        assert_eq!(sale_count(&db).await, 0);
        assert_eq!(db.customers().get(&customer.id).await.unwrap().total_debt_cents, 0);
    }

    #[tokio::test]
    async fn test_inactive_product_and_price_mismatch_rejected() {
        let db = test_db().await;
        let p1 = seed_product(&db, "Soap", None, 250, 10).await;

        let err = db
            .sales()
            .complete_sale(&cash(vec![CartLine::new(&p1.id, 1, 200)]), "u-1", &LedgerPolicy::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let overriding = LedgerPolicy {
            allow_price_override: true,
            ..LedgerPolicy::default()
        };
        let sale = db
            .sales()
            .complete_sale(&cash(vec![CartLine::new(&p1.id, 1, 200)]), "u-1", &overriding)
            .await
            .unwrap();
        assert_eq!(sale.total_cents, 200);

        sqlx::query("UPDATE products SET is_active = 0 WHERE id = ?1")
            .bind(&p1.id)
            .execute(db.pool())
            .await
            .unwrap();
        let err = db
            .sales()
            .complete_sale(&cash(vec![CartLine::new(&p1.id, 1, 250)]), "u-1", &LedgerPolicy::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_unknown_customer_rejected() {
        let db = test_db().await;
        let p1 = seed_product(&db, "Oil", None, 800, 10).await;

        let err = db
            .sales()
            .complete_sale(
                &on_credit("ghost", vec![CartLine::new(&p1.id, 1, 800)]),
                "u-1",
                &LedgerPolicy::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(stock_of(&db, &p1.id).await, 10);
    }

    #[tokio::test]
    async fn test_strict_floor_rolls_back_whole_sale() {
        let db = test_db().await;
        let plenty = seed_product(&db, "Plenty", None, 100, 50).await;
        let scarce = seed_product(&db, "Scarce", None, 100, 1).await;

        let err = db
            .sales()
            .complete_sale(
                &cash(vec![CartLine::new(&plenty.id, 3, 100), CartLine::new(&scarce.id, 2, 100)]),
                "u-1",
                &LedgerPolicy::strict(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConsistencyViolation);
        assert_eq!(stock_of(&db, &plenty.id).await, 50);
        assert_eq!(stock_of(&db, &scarce.id).await, 1);
        assert_eq!(sale_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_strict_floor_counts_repeated_lines() {
        let db = test_db().await;
        let p1 = seed_product(&db, "Eggs", None, 30, 3).await;

        let err = db
            .sales()
            .complete_sale(
                &cash(vec![CartLine::new(&p1.id, 2, 30), CartLine::new(&p1.id, 2, 30)]),
                "u-1",
                &LedgerPolicy::strict(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConsistencyViolation);
        assert_eq!(stock_of(&db, &p1.id).await, 3);
    }

    #[tokio::test]
    async fn test_permissive_floor_allows_oversell() {
        let db = test_db().await;
        let p1 = seed_product(&db, "Eggs", None, 30, 1).await;

        db.sales()
            .complete_sale(
                &cash(vec![CartLine::new(&p1.id, 3, 30)]),
                "u-1",
                &LedgerPolicy::permissive(),
            )
            .await
            .unwrap();

        assert_eq!(stock_of(&db, &p1.id).await, -2);
    }

    #[tokio::test]
    async fn test_sale_numbers_are_unique() {
        let db = test_db().await;
        let p1 = seed_product(&db, "Bread", None, 150, 10).await;
        let policy = LedgerPolicy::default();

        let mut numbers = std::collections::HashSet::new();
        for _ in 0..10 {
            let sale = db
                .sales()
                .complete_sale(&cash(vec![CartLine::new(&p1.id, 1, 150)]), "u-1", &policy)
                .await
                .unwrap();
            assert_eq!(sale.sale_number.len(), "S240315-142233-9F3A".len());
            assert!(numbers.insert(sale.sale_number));
        }
        assert_eq!(stock_of(&db, &p1.id).await, 0);
    }

    #[tokio::test]
    async fn test_taken_sale_number_is_redrawn() {
        let db = test_db().await;
        let p1 = seed_product(&db, "Bread", None, 150, 10).await;
        let policy = LedgerPolicy::default();
        let taken = "S240315-142233-0001";

        let first = db
            .sales()
            .complete_sale_numbered(&cash(vec![CartLine::new(&p1.id, 1, 150)]), "u-1", &policy, || {
                taken.to_string()
            })
            .await
            .unwrap();
        assert_eq!(first.sale_number, taken);

        let mut candidates = vec![taken, "S240315-142233-0002"].into_iter();
        let second = db
            .sales()
            .complete_sale_numbered(&cash(vec![CartLine::new(&p1.id, 3, 150)]), "u-1", &policy, || {
                candidates.next().unwrap().to_string()
            })
            .await
            .unwrap();

        assert_eq!(second.sale_number, "S240315-142233-0002");
        let stored = db.sales().detail(&second.id).await.unwrap();
        assert_eq!(stored.sale.sale_number, "S240315-142233-0002");
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.items[0].quantity, 3);
        assert_eq!(stock_of(&db, &p1.id).await, 6);
        assert_eq!(sale_count(&db).await, 2);
    }

    #[tokio::test]
    async fn test_sale_number_attempts_exhausted() {
        let db = test_db().await;
        let p1 = seed_product(&db, "Bread", None, 150, 10).await;
        let customer = seed_customer(&db, "Amina").await;
        let policy = LedgerPolicy::default();
        let taken = "S240315-142233-0001";

        db.sales()
            .complete_sale_numbered(&cash(vec![CartLine::new(&p1.id, 1, 150)]), "u-1", &policy, || {
                taken.to_string()
            })
            .await
            .unwrap();

        let mut drawn = 0;
        let err = db
            .sales()
            .complete_sale_numbered(
                &on_credit(&customer.id, vec![CartLine::new(&p1.id, 2, 150)]),
                "u-1",
                &policy,
                || {
                    drawn += 1;
                    taken.to_string()
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StorageFailure);
        assert!(err.is_unique_violation_on("sales.sale_number"));
        assert_eq!(drawn, MAX_NUMBER_ATTEMPTS);
        assert_eq!(stock_of(&db, &p1.id).await, 9);
        assert_eq!(sale_count(&db).await, 1);
        let customer = db.customers().get(&customer.id).await.unwrap();
        assert_eq!(customer.total_debt_cents, 0);
    }

    #[tokio::test]
    async fn test_recent_stats_and_overdue() {
        let db = test_db().await;
        let p1 = seed_product(&db, "Bread", None, 150, 100).await;
        let customer = seed_customer(&db, "Dina").await;
        let policy = LedgerPolicy::default();

        let before = Utc::now() - Duration::seconds(1);
        db.sales()
            .complete_sale(&cash(vec![CartLine::new(&p1.id, 2, 150)]), "u-1", &policy)
            .await
            .unwrap();
        let credit = db
            .sales()
            .complete_sale(&on_credit(&customer.id, vec![CartLine::new(&p1.id, 4, 150)]), "u-1", &policy)
            .await
            .unwrap();
        let after = Utc::now() + Duration::seconds(1);

        let recent = db.sales().recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, credit.id);

        let stats = db.sales().stats_between(before, after).await.unwrap();
        assert_eq!(stats, SalesStats { total_cents: 900, count: 2 });

        let empty = db.sales().stats_between(after, after).await.unwrap();
        assert_eq!(empty, SalesStats::default());

        assert!(db.sales().overdue(30, Utc::now()).await.unwrap().is_empty());
        let overdue = db
            .sales()
            .overdue(30, Utc::now() + Duration::days(31))
            .await
            .unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, credit.id);
    }

    #[tokio::test]
    async fn test_missing_sale_detail() {
        let db = test_db().await;
        let err = db.sales().detail("nope").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    /// Two checkouts race for the last unit on separate connections.
    async fn race_for_last_unit(floor: FloorPolicy) -> (Vec<DbResult<Sale>>, i64) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("race.db")).max_connections(4))
            .await
            .unwrap();
        let product = seed_product(&db, "Last One", None, 500, 1).await;
        let policy = LedgerPolicy {
            stock_floor: floor,
            ..LedgerPolicy::default()
        };

        let mut handles = Vec::new();
        for user in ["u-1", "u-2"] {
            let db = db.clone();
            let request = cash(vec![CartLine::new(&product.id, 1, 500)]);
            handles.push(tokio::spawn(async move {
                db.sales().complete_sale(&request, user, &policy).await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        let stock = stock_of(&db, &product.id).await;
        (results, stock)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_last_unit_strict() {
        let (results, stock) = race_for_last_unit(FloorPolicy::Strict).await;

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let rejected: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(ok, 1);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].kind(), ErrorKind::ConsistencyViolation);
        assert_eq!(stock, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_last_unit_permissive() {
        let (results, stock) = race_for_last_unit(FloorPolicy::Permissive).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(stock, -1);
    }
}
