//! # Purchase Repository
//!
//! Stock intake from suppliers. A purchase is the mirror image of a sale:
//! one transaction inserts the purchase and its lines and raises stock with
//! the same relative-update primitive the sale engine uses to lower it.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::product::apply_stock_delta;
use crate::repository::{generate_id, number_entropy};
use tally_core::checkout::purchase_number;
use tally_core::validation::{
    validate_id, validate_line_count, validate_price_cents, validate_quantity,
};
use tally_core::{
    FloorPolicy, NewPurchase, Purchase, PurchaseItem, SaleStatus, MAX_NUMBER_ATTEMPTS,
};

#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Records a purchase and adds every line's quantity to stock.
    ///
    /// ## Errors
    /// * `InvalidRequest` - empty or malformed lines, unknown product,
    ///   paid amount outside `[0, total]`
    /// * `NotFound` - unknown supplier
    /// * `StorageFailure` - nothing was written
    pub async fn create_purchase(&self, input: &NewPurchase, user_id: &str) -> DbResult<Purchase> {
        self.create_purchase_numbered(input, user_id, || {
            purchase_number(Utc::now(), number_entropy())
        })
        .await
    }

    pub(crate) async fn create_purchase_numbered<F>(
        &self,
        input: &NewPurchase,
        user_id: &str,
        next_number: F,
    ) -> DbResult<Purchase>
    where
        F: FnMut() -> String,
    {
        validate_id("userId", user_id)?;
        validate_id("supplierId", &input.supplier_id)?;
        validate_line_count("items", input.items.len())?;

        let mut total_cents: i64 = 0;
        for line in &input.items {
            validate_id("productId", &line.product_id)?;
            validate_quantity(line.quantity)?;
            validate_price_cents(line.unit_cost_cents)?;
            total_cents = line
                .unit_cost_cents
                .checked_mul(line.quantity)
                .and_then(|line_total| total_cents.checked_add(line_total))
                .ok_or_else(|| DbError::invalid("purchase total is too large"))?;
        }

        let paid_cents = input.paid_cents.unwrap_or(total_cents);
        if !(0..=total_cents).contains(&paid_cents) {
            return Err(DbError::invalid(format!(
                "paid amount must be between 0 and {}",
                total_cents
            )));
        }

        let supplier_exists: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM suppliers WHERE id = ?1")
                .bind(&input.supplier_id)
                .fetch_optional(&self.pool)
                .await?;
        if supplier_exists.is_none() {
            return Err(DbError::not_found("Supplier", &input.supplier_id));
        }

        let mut checked = HashSet::new();
        for line in &input.items {
            if checked.insert(line.product_id.as_str()) {
                let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM products WHERE id = ?1")
                    .bind(&line.product_id)
                    .fetch_optional(&self.pool)
                    .await?;
                if exists.is_none() {
                    return Err(DbError::invalid(format!("unknown product {}", line.product_id)));
                }
            }
        }

        let now = Utc::now();
        let mut purchase = Purchase {
            id: generate_id(),
            purchase_number: String::new(),
            supplier_id: input.supplier_id.clone(),
            user_id: user_id.to_string(),
            total_cents,
            paid_cents,
            remaining_cents: total_cents - paid_cents,
            status: SaleStatus::Completed,
            created_at: now,
        };

        debug!(
            supplier_id = %purchase.supplier_id,
            lines = input.items.len(),
            total = %purchase.total(),
            "Recording purchase"
        );

        let mut tx = self.pool.begin().await?;

        purchase.purchase_number = insert_purchase_row(&mut tx, &purchase, next_number).await?;

        for line in &input.items {
            sqlx::query(
                r#"
                INSERT INTO purchase_items (
                    id, purchase_id, product_id, quantity, unit_cost_cents, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(generate_id())
            .bind(&purchase.id)
            .bind(&line.product_id)
            .bind(line.quantity)
            .bind(line.unit_cost_cents)
            .bind(line.unit_cost_cents * line.quantity)
            .execute(&mut *tx)
            .await?;

            apply_stock_delta(&mut tx, &line.product_id, line.quantity, FloorPolicy::Permissive, now)
                .await?;
        }

        tx.commit().await?;

        info!(
            purchase_id = %purchase.id,
            purchase_number = %purchase.purchase_number,
            total = %purchase.total(),
            "Purchase recorded"
        );

        Ok(purchase)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Purchase>> {
        let purchase = sqlx::query_as::<_, Purchase>("SELECT * FROM purchases WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(purchase)
    }

    pub async fn get_items(&self, purchase_id: &str) -> DbResult<Vec<PurchaseItem>> {
        let items = sqlx::query_as::<_, PurchaseItem>(
            "SELECT * FROM purchase_items WHERE purchase_id = ?1 ORDER BY rowid",
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

/// Inserts the purchase row, drawing the next candidate number on each
/// UNIQUE conflict.
async fn insert_purchase_row(
    conn: &mut SqliteConnection,
    purchase: &Purchase,
    mut next_number: impl FnMut() -> String,
) -> DbResult<String> {
    let mut last_candidate = String::new();

    for attempt in 1..=MAX_NUMBER_ATTEMPTS {
        let candidate = next_number();

        let result = sqlx::query(
            r#"
            INSERT INTO purchases (
                id, purchase_number, supplier_id, user_id,
                total_cents, paid_cents, remaining_cents, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&purchase.id)
        .bind(&candidate)
        .bind(&purchase.supplier_id)
        .bind(&purchase.user_id)
        .bind(purchase.total_cents)
        .bind(purchase.paid_cents)
        .bind(purchase.remaining_cents)
        .bind(purchase.status)
        .bind(purchase.created_at)
        .execute(&mut *conn)
        .await
        .map_err(DbError::from);

        match result {
            Ok(_) => return Ok(candidate),
            Err(err) if err.is_unique_violation_on("purchases.purchase_number") => {
                warn!(attempt = attempt, candidate = %candidate, "Purchase number taken, retrying");
                last_candidate = candidate;
            }
            Err(err) => return Err(err),
        }
    }

    Err(DbError::duplicate("purchases.purchase_number", last_candidate))
}
