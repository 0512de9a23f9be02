//! Fixtures shared by the repository tests.

use tally_core::{Customer, NewCustomer, NewProduct, NewSupplier, Product, Supplier};

use crate::{Database, DbConfig};

pub(crate) async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub(crate) async fn seed_product(
    db: &Database,
    name: &str,
    barcode: Option<&str>,
    sell_price_cents: i64,
    stock_quantity: i64,
) -> Product {
    db.products()
        .insert(&NewProduct {
            name: name.to_string(),
            description: None,
            barcode: barcode.map(str::to_string),
            brand: None,
            cost_price_cents: sell_price_cents * 7 / 10,
            sell_price_cents,
            stock_quantity,
            min_stock: 5,
        })
        .await
        .unwrap()
}

pub(crate) async fn seed_customer(db: &Database, name: &str) -> Customer {
    db.customers()
        .insert(&NewCustomer {
            name: name.to_string(),
            ..NewCustomer::default()
        })
        .await
        .unwrap()
}

pub(crate) async fn seed_supplier(db: &Database, name: &str) -> Supplier {
    db.suppliers()
        .insert(&NewSupplier {
            name: name.to_string(),
            ..NewSupplier::default()
        })
        .await
        .unwrap()
}
