//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Barcode lookup for the checkout scanner
//! - Product inserts (reference data)
//! - The inventory adjuster: relative stock updates
//! - Low-stock listing
//!
//! ## Stock Update Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ❌ WRONG: read, compute in memory, write back                     │
//! │     SELECT stock_quantity ...      → 1                             │
//! │     UPDATE products SET stock_quantity = 0                         │
//! │     (two concurrent sales both write 0, one sale is lost)          │
//! │                                                                     │
//! │  ✅ CORRECT: relative update, optionally floored                   │
//! │     UPDATE products SET stock_quantity = stock_quantity - 1        │
//! │     WHERE id = ? AND stock_quantity - 1 >= 0                       │
//! │     (the second sale matches 0 rows and is rejected)               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use tally_core::validation::{
    validate_barcode, validate_name, validate_price_cents, validate_stock_delta,
};
use tally_core::{CoreError, FloorPolicy, LedgerPolicy, NewProduct, Product};

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let product = repo.get_by_barcode("8901234567890").await?;
/// let restocked = repo.adjust_stock(&product.id, 12, &policy).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Looks up an active product by barcode.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Product found
    /// * `Err(DbError::NotFound)` - No active product carries this barcode
    /// * `Err(DbError::Domain)` - Barcode is blank or malformed
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Product> {
        let barcode = validate_barcode(barcode)?;

        debug!(barcode = %barcode, "Looking up product by barcode");

        sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE barcode = ?1 AND is_active = 1",
        )
        .bind(&barcode)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Product", barcode))
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with generated fields
    /// * `Err(DbError::UniqueViolation)` - Barcode already exists
    pub async fn insert(&self, input: &NewProduct) -> DbResult<Product> {
        validate_name("name", &input.name)?;
        validate_price_cents(input.cost_price_cents)?;
        validate_price_cents(input.sell_price_cents)?;
        let barcode = input
            .barcode
            .as_deref()
            .map(validate_barcode)
            .transpose()?;

        let now = Utc::now();
        let product = Product {
            id: generate_id(),
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            barcode,
            brand: input.brand.clone(),
            cost_price_cents: input.cost_price_cents,
            sell_price_cents: input.sell_price_cents,
            stock_quantity: input.stock_quantity,
            min_stock: input.min_stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, barcode, brand,
                cost_price_cents, sell_price_cents, stock_quantity, min_stock,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.barcode)
        .bind(&product.brand)
        .bind(product.cost_price_cents)
        .bind(product.sell_price_cents)
        .bind(product.stock_quantity)
        .bind(product.min_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: product.barcode.clone().unwrap_or_default(),
            },
            other => other,
        })?;

        Ok(product)
    }

    /// Applies a signed stock delta as one atomic statement.
    ///
    /// Negative deltas honour `policy.stock_floor`; positive deltas never
    /// fail on the floor, so restocking works even after an oversell.
    ///
    /// ## Arguments
    /// * `id` - Product ID
    /// * `delta` - Change in stock (negative for sales, positive for restocking)
    ///
    /// ## Returns
    /// * `Ok(Product)` - Product after the update
    /// * `Err(DbError::NotFound)` - Unknown product
    /// * `Err(DbError::Domain(InsufficientStock))` - Floor would be crossed
    pub async fn adjust_stock(
        &self,
        id: &str,
        delta: i64,
        policy: &LedgerPolicy,
    ) -> DbResult<Product> {
        validate_stock_delta(delta)?;

        let mut conn = self.pool.acquire().await?;
        let product = apply_stock_delta(&mut conn, id, delta, policy.stock_floor, Utc::now()).await?;

        debug!(id = %id, delta = delta, stock = product.stock_quantity, "Stock adjusted");
        Ok(product)
    }

    /// Products at or below their minimum stock, lowest stock first.
    pub async fn low_stock(&self, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE stock_quantity <= min_stock AND is_active = 1
            ORDER BY stock_quantity ASC, name ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// The inventory adjuster primitive, run on any connection or open transaction.
///
/// `stock_quantity = stock_quantity + delta` in a single statement. With a
/// strict floor and a negative delta, the row only matches while the result
/// stays at or above zero; a non-match is then reported as insufficient stock.
pub(crate) async fn apply_stock_delta(
    conn: &mut SqliteConnection,
    product_id: &str,
    delta: i64,
    floor: FloorPolicy,
    now: DateTime<Utc>,
) -> DbResult<Product> {
    let enforce_floor = delta < 0 && floor.is_strict();

    let updated = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity + ?1,
            updated_at = ?2
        WHERE id = ?3
          AND (?4 = 0 OR stock_quantity + ?1 >= 0)
        RETURNING *
        "#,
    )
    .bind(delta)
    .bind(now)
    .bind(product_id)
    .bind(enforce_floor)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(product) = updated {
        return Ok(product);
    }

    let available: Option<i64> =
        sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

    match available {
        None => Err(DbError::not_found("Product", product_id)),
        Some(available) => {
            warn!(
                product_id = %product_id,
                available = available,
                requested = -delta,
                "Stock floor rejected decrement"
            );
            Err(CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                available,
                requested: -delta,
            }
            .into())
        }
    }
}
