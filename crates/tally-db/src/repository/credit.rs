//! # Credit Payment Repository
//!
//! The credit payment reconciler: records a payment against one credit or
//! installment sale and moves the sale balance and the customer debt in
//! lockstep.
//!
//! ## record_payment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  amount > 0?                    no → InvalidRequest                     │
//! │  sale exists? customer exists?  no → NotFound                           │
//! │  sale belongs to customer and is not cash?  no → InvalidRequest        │
//! │       │                                                                 │
//! │  BEGIN                                                                  │
//! │  ├── sales:     paid += a, remaining -= a                               │
//! │  │              (strict: only WHERE remaining >= a, else Overpayment)   │
//! │  ├── customers: total_debt -= a                                         │
//! │  └── INSERT credit_payments                                             │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  paid + remaining stays equal to total across any payment sequence     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use tally_core::validation::{validate_id, validate_note, validate_payment_amount};
use tally_core::{CoreError, CreditPayment, LedgerPolicy, Money, NewCreditPayment, Sale};

#[derive(Debug, Clone)]
pub struct CreditPaymentRepository {
    pool: SqlitePool,
}

impl CreditPaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CreditPaymentRepository { pool }
    }

    /// Records a payment against a sale's remaining balance.
    ///
    /// ## Errors
    /// * `InvalidRequest` - non-positive amount, sale not owned by the
    ///   customer, cash sale
    /// * `NotFound` - unknown sale or customer
    /// * `ConsistencyViolation` - amount exceeds remaining under a strict policy
    /// * `StorageFailure` - nothing was written
    pub async fn record_payment(
        &self,
        input: &NewCreditPayment,
        user_id: &str,
        policy: &LedgerPolicy,
    ) -> DbResult<CreditPayment> {
        validate_payment_amount(input.amount_cents)?;
        validate_id("saleId", &input.sale_id)?;
        validate_id("customerId", &input.customer_id)?;
        validate_id("userId", user_id)?;
        let note = validate_note(input.note.as_deref())?;

        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = ?1")
            .bind(&input.sale_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", &input.sale_id))?;

        let customer_exists: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM customers WHERE id = ?1")
                .bind(&input.customer_id)
                .fetch_optional(&self.pool)
                .await?;
        if customer_exists.is_none() {
            return Err(DbError::not_found("Customer", &input.customer_id));
        }

        if sale.customer_id.as_deref() != Some(input.customer_id.as_str()) {
            return Err(DbError::invalid(format!(
                "sale {} does not belong to customer {}",
                sale.sale_number, input.customer_id
            )));
        }
        if !sale.payment_type.creates_debt() {
            return Err(DbError::invalid(format!(
                "sale {} was paid in cash",
                sale.sale_number
            )));
        }

        debug!(
            sale_id = %sale.id,
            amount = %Money::from_cents(input.amount_cents),
            remaining = %sale.remaining(),
            "Recording credit payment"
        );

        let payment = CreditPayment {
            id: generate_id(),
            sale_id: input.sale_id.clone(),
            customer_id: input.customer_id.clone(),
            amount_cents: input.amount_cents,
            payment_date: Utc::now(),
            user_id: user_id.to_string(),
            note,
        };

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE sales
            SET paid_cents = paid_cents + ?1,
                remaining_cents = remaining_cents - ?1
            WHERE id = ?2
              AND (?3 = 0 OR remaining_cents >= ?1)
            "#,
        )
        .bind(payment.amount_cents)
        .bind(&payment.sale_id)
        .bind(policy.overpayment.is_strict())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let remaining: Option<i64> =
                sqlx::query_scalar("SELECT remaining_cents FROM sales WHERE id = ?1")
                    .bind(&payment.sale_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            return Err(match remaining {
                None => DbError::not_found("Sale", &payment.sale_id),
                Some(remaining) => {
                    warn!(
                        sale_id = %payment.sale_id,
                        amount = %payment.amount(),
                        remaining = %Money::from_cents(remaining),
                        "Overpayment rejected"
                    );
                    CoreError::Overpayment {
                        sale_id: payment.sale_id.clone(),
                        amount: payment.amount(),
                        remaining: Money::from_cents(remaining),
                    }
                    .into()
                }
            });
        }

        let debited = sqlx::query(
            "UPDATE customers SET total_debt_cents = total_debt_cents - ?1 WHERE id = ?2",
        )
        .bind(payment.amount_cents)
        .bind(&payment.customer_id)
        .execute(&mut *tx)
        .await?;

        if debited.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", &payment.customer_id));
        }

        sqlx::query(
            r#"
            INSERT INTO credit_payments (
                id, sale_id, customer_id, amount_cents, payment_date, user_id, note
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.sale_id)
        .bind(&payment.customer_id)
        .bind(payment.amount_cents)
        .bind(payment.payment_date)
        .bind(&payment.user_id)
        .bind(&payment.note)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            payment_id = %payment.id,
            sale_id = %payment.sale_id,
            customer_id = %payment.customer_id,
            amount = %payment.amount(),
            "Credit payment recorded"
        );

        Ok(payment)
    }

    /// Payment history, newest first, optionally for one customer.
    pub async fn list(&self, customer_id: Option<&str>, limit: u32) -> DbResult<Vec<CreditPayment>> {
        let payments = sqlx::query_as::<_, CreditPayment>(
            r#"
            SELECT * FROM credit_payments
            WHERE (?1 IS NULL OR customer_id = ?1)
            ORDER BY payment_date DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(customer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// All payments applied to one sale, oldest first.
    pub async fn for_sale(&self, sale_id: &str) -> DbResult<Vec<CreditPayment>> {
        let payments = sqlx::query_as::<_, CreditPayment>(
            "SELECT * FROM credit_payments WHERE sale_id = ?1 ORDER BY payment_date, rowid",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{seed_customer, seed_product, test_db};
    use crate::Database;
    use tally_core::checkout::{CartLine, Discount};
    use tally_core::{CheckoutRequest, ErrorKind, PaymentType};

    /// A 50.00 credit sale for a fresh customer. Returns (sale, customer id).
    async fn credit_sale(db: &Database) -> (Sale, String) {
        let product = seed_product(db, "Cement bag", None, 2500, 10).await;
        let customer = seed_customer(db, "Farah Builders").await;
        let sale = db
            .sales()
            .complete_sale(
                &CheckoutRequest {
                    customer_id: Some(customer.id.clone()),
                    payment_type: PaymentType::Installment,
                    discount: Discount::None,
                    items: vec![CartLine::new(&product.id, 2, 2500)],
                },
                "u-1",
                &LedgerPolicy::default(),
            )
            .await
            .unwrap();
        (sale, customer.id)
    }

    fn payment(sale: &Sale, customer_id: &str, amount_cents: i64) -> NewCreditPayment {
        NewCreditPayment {
            sale_id: sale.id.clone(),
            customer_id: customer_id.to_string(),
            amount_cents,
            note: None,
        }
    }

    #[tokio::test]
    async fn test_payment_moves_balances_in_lockstep() {
        let db = test_db().await;
        let (sale, customer_id) = credit_sale(&db).await;
        let policy = LedgerPolicy::default();

        let recorded = db
            .credit_payments()
            .record_payment(&payment(&sale, &customer_id, 2000), "u-2", &policy)
            .await
            .unwrap();
        assert_eq!(recorded.amount_cents, 2000);
        assert_eq!(recorded.user_id, "u-2");

        let after = db.sales().get(&sale.id).await.unwrap();
        assert_eq!(after.remaining_cents, 3000);
        assert_eq!(after.paid_cents, 2000);
        assert!(after.is_balanced());

        let customer = db.customers().get(&customer_id).await.unwrap();
        assert_eq!(customer.total_debt_cents, 3000);
    }

    #[tokio::test]
    async fn test_two_payments_in_either_order_settle_the_sale() {
        for amounts in [[2000, 3000], [3000, 2000]] {
            let db = test_db().await;
            let (sale, customer_id) = credit_sale(&db).await;

            for amount in amounts {
                db.credit_payments()
                    .record_payment(&payment(&sale, &customer_id, amount), "u-1", &LedgerPolicy::default())
                    .await
                    .unwrap();
            }

            let after = db.sales().get(&sale.id).await.unwrap();
            assert_eq!(after.remaining_cents, 0);
            assert_eq!(after.paid_cents, 5000);
            assert_eq!(db.customers().get(&customer_id).await.unwrap().total_debt_cents, 0);
            assert_eq!(db.credit_payments().for_sale(&sale.id).await.unwrap().len(), 2);
        }
    }

    #[tokio::test]
    async fn test_rejections_leave_no_trace() {
        let db = test_db().await;
        let (sale, customer_id) = credit_sale(&db).await;
        let policy = LedgerPolicy::default();
        let repo = db.credit_payments();

        let err = repo
            .record_payment(&payment(&sale, &customer_id, 0), "u-1", &policy)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let err = repo
            .record_payment(&payment(&sale, &customer_id, -100), "u-1", &policy)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let mut unknown_sale = payment(&sale, &customer_id, 100);
        unknown_sale.sale_id = "missing-sale".to_string();
        let err = repo.record_payment(&unknown_sale, "u-1", &policy).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = repo
            .record_payment(&payment(&sale, "missing-customer", 100), "u-1", &policy)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let other = seed_customer(&db, "Someone Else").await;
        let err = repo
            .record_payment(&payment(&sale, &other.id, 100), "u-1", &policy)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let err = repo
            .record_payment(&payment(&sale, &customer_id, 5001), "u-1", &policy)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConsistencyViolation);

        let after = db.sales().get(&sale.id).await.unwrap();
        assert_eq!(after.remaining_cents, 5000);
        assert_eq!(db.customers().get(&customer_id).await.unwrap().total_debt_cents, 5000);
        assert!(repo.list(None, 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cash_sale_cannot_take_payments() {
        let db = test_db().await;
        let product = seed_product(&db, "Nails", None, 100, 10).await;
        let customer = seed_customer(&db, "Gul").await;
        let sale = db
            .sales()
            .complete_sale(
                &CheckoutRequest {
                    customer_id: Some(customer.id.clone()),
                    payment_type: PaymentType::Cash,
                    discount: Discount::None,
                    items: vec![CartLine::new(&product.id, 1, 100)],
                },
                "u-1",
                &LedgerPolicy::default(),
            )
            .await
            .unwrap();

        let err = db
            .credit_payments()
            .record_payment(&payment(&sale, &customer.id, 50), "u-1", &LedgerPolicy::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_permissive_overpayment_goes_negative() {
        let db = test_db().await;
        let (sale, customer_id) = credit_sale(&db).await;

        db.credit_payments()
            .record_payment(&payment(&sale, &customer_id, 6000), "u-1", &LedgerPolicy::permissive())
            .await
            .unwrap();

        let after = db.sales().get(&sale.id).await.unwrap();
        assert_eq!(after.remaining_cents, -1000);
        assert_eq!(after.paid_cents, 6000);
        assert!(after.is_balanced());
        assert_eq!(db.customers().get(&customer_id).await.unwrap().total_debt_cents, -1000);
    }

    #[tokio::test]
    async fn test_history_filter_and_note() {
        let db = test_db().await;
        let (sale, customer_id) = credit_sale(&db).await;
        let mut first = payment(&sale, &customer_id, 1000);
        first.note = Some("  cash at counter  ".to_string());

        db.credit_payments()
            .record_payment(&first, "u-1", &LedgerPolicy::default())
            .await
            .unwrap();

        let all = db.credit_payments().list(None, 50).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].note.as_deref(), Some("cash at counter"));

        let mine = db.credit_payments().list(Some(&customer_id), 50).await.unwrap();
        assert_eq!(mine.len(), 1);
        let theirs = db.credit_payments().list(Some("someone-else"), 50).await.unwrap();
        assert!(theirs.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_payments_serialize() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(crate::DbConfig::new(dir.path().join("pay.db")).max_connections(4))
            .await
            .unwrap();
        let (sale, customer_id) = credit_sale(&db).await;

        let mut handles = Vec::new();
        for user in ["u-1", "u-2"] {
            let db = db.clone();
            let input = payment(&sale, &customer_id, 3000);
            handles.push(tokio::spawn(async move {
                db.credit_payments()
                    .record_payment(&input, user, &LedgerPolicy::strict())
                    .await
            }));
        }

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }

        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        let rejected = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert_eq!(rejected.kind(), ErrorKind::ConsistencyViolation);

        let after = db.sales().get(&sale.id).await.unwrap();
        assert_eq!(after.remaining_cents, 2000);
        assert_eq!(db.customers().get(&customer_id).await.unwrap().total_debt_cents, 2000);
    }
}
