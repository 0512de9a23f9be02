//! # Customer Repository
//!
//! Customers are reference data for credit sales. Their `total_debt_cents`
//! is never written from here after creation: the sale engine raises it and
//! the credit payment reconciler lowers it, both with relative updates.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use tally_core::validation::validate_name;
use tally_core::{Customer, NewCustomer};

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Gets a customer or fails with `NotFound`.
    pub async fn get(&self, id: &str) -> DbResult<Customer> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// Inserts a new customer with zero debt.
    pub async fn insert(&self, input: &NewCustomer) -> DbResult<Customer> {
        validate_name("name", &input.name)?;

        let customer = Customer {
            id: generate_id(),
            name: input.name.trim().to_string(),
            phone: input.phone.clone(),
            email: input.email.clone(),
            address: input.address.clone(),
            total_debt_cents: 0,
            created_at: Utc::now(),
        };

        debug!(id = %customer.id, name = %customer.name, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, phone, email, address, total_debt_cents, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(&customer.address)
        .bind(customer.total_debt_cents)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Customers who currently owe something, largest debt first.
    pub async fn with_debt(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE total_debt_cents > 0 ORDER BY total_debt_cents DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }
}
