//! # Dashboard Repository
//!
//! Read-only rollups over the ledger. Nothing here writes.
//!
//! ## Snapshot Reads
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN (deferred, read-only use)                                       │
//! │    today's sales ─► inventory value ─► total debt ─► low stock ─► count│
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  Every figure comes from the same snapshot, so a sale committing       │
//! │  halfway through cannot show up in "today's sales" while its stock     │
//! │  decrement is missing from "inventory value".                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use tally_core::{DashboardStats, DebtMismatch};

#[derive(Debug, Clone)]
pub struct DashboardRepository {
    pool: SqlitePool,
}

impl DashboardRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DashboardRepository { pool }
    }

    /// Dashboard figures for the current local day.
    pub async fn stats(&self) -> DbResult<DashboardStats> {
        self.stats_at(Local::now()).await
    }

    /// Dashboard figures with "today" taken as the local day of `now`.
    ///
    /// An empty database yields all zeros.
    pub async fn stats_at<Tz: TimeZone>(&self, now: DateTime<Tz>) -> DbResult<DashboardStats> {
        let (day_start, day_end) = local_day_bounds(&now);
        debug!(%day_start, %day_end, "Computing dashboard stats");

        let mut tx = self.pool.begin().await?;

        let (today_sales_cents, today_orders): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(total_cents), 0), COUNT(*)
            FROM sales
            WHERE created_at >= ?1 AND created_at < ?2
            "#,
        )
        .bind(day_start)
        .bind(day_end)
        .fetch_one(&mut *tx)
        .await?;

        let (inventory_value_cents, low_stock_count, total_products): (i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    COALESCE(SUM(stock_quantity * cost_price_cents), 0),
                    COALESCE(SUM(CASE WHEN stock_quantity <= min_stock THEN 1 ELSE 0 END), 0),
                    COUNT(*)
                FROM products
                WHERE is_active = 1
                "#,
            )
            .fetch_one(&mut *tx)
            .await?;

        let total_debt_cents: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(total_debt_cents), 0) FROM customers")
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(DashboardStats {
            today_sales_cents,
            today_orders,
            inventory_value_cents,
            total_debt_cents,
            low_stock_count,
            total_products,
        })
    }

    /// Customers whose stored debt differs from the sum of `remaining` over
    /// their non-cash sales. Empty when the ledger is consistent.
    pub async fn debt_audit(&self) -> DbResult<Vec<DebtMismatch>> {
        let mismatches = sqlx::query_as::<_, DebtMismatch>(
            r#"
            SELECT
                c.id AS customer_id,
                c.name AS customer_name,
                c.total_debt_cents AS recorded_debt_cents,
                COALESCE(o.outstanding, 0) AS outstanding_cents
            FROM customers c
            LEFT JOIN (
                SELECT customer_id, SUM(remaining_cents) AS outstanding
                FROM sales
                WHERE payment_type != 'cash' AND customer_id IS NOT NULL
                GROUP BY customer_id
            ) o ON o.customer_id = c.id
            WHERE c.total_debt_cents != COALESCE(o.outstanding, 0)
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(mismatches)
    }
}

/// `[start, end)` of the local calendar day containing `now`, in UTC.
fn local_day_bounds<Tz: TimeZone>(now: &DateTime<Tz>) -> (DateTime<Utc>, DateTime<Utc>) {
    let tz = now.timezone();
    let day = now.date_naive();
    let start = local_midnight(&tz, day);
    let end = match day.succ_opt() {
        Some(next) => local_midnight(&tz, next),
        None => start + Duration::days(1),
    };
    (start, end)
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, day: NaiveDate) -> DateTime<Utc> {
    let midnight = day.and_time(NaiveTime::default());
    match tz.from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // Midnight skipped by a DST jump: the day starts at the first valid hour.
        None => tz
            .from_local_datetime(&(midnight + Duration::hours(1)))
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{seed_customer, seed_product, test_db};
    use chrono::FixedOffset;
    use tally_core::checkout::{CartLine, Discount};
    use tally_core::{CheckoutRequest, LedgerPolicy, NewCreditPayment, PaymentType};

    #[tokio::test]
    async fn test_empty_database_reports_zeros() {
        let db = test_db().await;
        let stats = db.dashboard().stats().await.unwrap();
        assert_eq!(stats, DashboardStats::default());
        assert!(db.dashboard().debt_audit().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats_after_sales() {
        let db = test_db().await;
        // cost 700, min_stock 5
        let rice = seed_product(&db, "Rice 5kg", None, 1000, 10).await;
        let customer = seed_customer(&db, "Bilal Stores").await;
        let policy = LedgerPolicy::default();

        db.sales()
            .complete_sale(
                &CheckoutRequest {
                    customer_id: None,
                    payment_type: PaymentType::Cash,
                    discount: Discount::None,
                    items: vec![CartLine::new(&rice.id, 2, 1000)],
                },
                "u-1",
                &policy,
            )
            .await
            .unwrap();
        db.sales()
            .complete_sale(
                &CheckoutRequest {
                    customer_id: Some(customer.id.clone()),
                    payment_type: PaymentType::Credit,
                    discount: Discount::Amount(500),
                    items: vec![CartLine::new(&rice.id, 3, 1000)],
                },
                "u-1",
                &policy,
            )
            .await
            .unwrap();

        let stats = db.dashboard().stats_at(Utc::now()).await.unwrap();
        assert_eq!(stats.today_sales_cents, 2000 + 2500);
        assert_eq!(stats.today_orders, 2);
        assert_eq!(stats.inventory_value_cents, 5 * 700);
        assert_eq!(stats.total_debt_cents, 2500);
        assert_eq!(stats.low_stock_count, 1);
        assert_eq!(stats.total_products, 1);

        let yesterday = db
            .dashboard()
            .stats_at(Utc::now() - Duration::days(1))
            .await
            .unwrap();
        assert_eq!(yesterday.today_orders, 0);
        assert_eq!(yesterday.today_sales_cents, 0);
    }

    #[tokio::test]
    async fn test_debt_audit_stays_clean_through_payments() {
        let db = test_db().await;
        let cement = seed_product(&db, "Cement bag", None, 2500, 10).await;
        let customer = seed_customer(&db, "Farah Builders").await;
        let policy = LedgerPolicy::default();

        let sale = db
            .sales()
            .complete_sale(
                &CheckoutRequest {
                    customer_id: Some(customer.id.clone()),
                    payment_type: PaymentType::Installment,
                    discount: Discount::None,
                    items: vec![CartLine::new(&cement.id, 4, 2500)],
                },
                "u-1",
                &policy,
            )
            .await
            .unwrap();

        db.credit_payments()
            .record_payment(
                &NewCreditPayment {
                    sale_id: sale.id.clone(),
                    customer_id: customer.id.clone(),
                    amount_cents: 4000,
                    note: None,
                },
                "u-1",
                &policy,
            )
            .await
            .unwrap();

        assert!(db.dashboard().debt_audit().await.unwrap().is_empty());

        sqlx::query("UPDATE customers SET total_debt_cents = 0 WHERE id = ?1")
            .bind(&customer.id)
            .execute(db.pool())
            .await
            .unwrap();

        let mismatches = db.dashboard().debt_audit().await.unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].recorded_debt_cents, 0);
        assert_eq!(mismatches[0].outstanding_cents, 6000);
    }

    #[test]
    fn test_local_day_bounds_follow_offset() {
        let karachi = FixedOffset::east_opt(5 * 3600).unwrap();
        let now = karachi.with_ymd_and_hms(2024, 3, 15, 1, 30, 0).unwrap();

        let (start, end) = local_day_bounds(&now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 14, 19, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 15, 19, 0, 0).unwrap());
    }
}
