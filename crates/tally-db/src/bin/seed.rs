//! # Seed Data Generator
//!
//! Populates a database with a small demo store for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./tally_dev.db
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//!
//! # See repository logs
//! RUST_LOG=debug cargo run -p tally-db --bin seed
//! ```
//!
//! ## Generated Data
//! - Two suppliers and one stock purchase from each
//! - Products across a few categories, each with a unique EAN-13 style barcode
//! - Three customers
//! - A handful of cash, credit and installment sales
//! - One credit payment against the first credit sale

use std::env;

use tally_core::checkout::{CartLine, Discount};
use tally_core::{
    CheckoutRequest, LedgerPolicy, NewCreditPayment, NewCustomer, NewProduct, NewPurchase,
    NewSupplier, PaymentType, Product, PurchaseLine,
};
use tally_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

/// (name, brand, sell price in cents, opening stock)
const PRODUCTS: &[(&str, &str, i64, i64)] = &[
    ("Basmati Rice 5kg", "Falak", 2450, 40),
    ("Sunflower Oil 1L", "Dalda", 620, 60),
    ("Sugar 1kg", "Local", 180, 100),
    ("Black Tea 475g", "Tapal", 890, 30),
    ("Milk Pack 1L", "Olpers", 280, 48),
    ("Lentils 1kg", "Local", 410, 25),
    ("Cement Bag 50kg", "Lucky", 1350, 120),
    ("Wall Paint 4L", "Berger", 3800, 12),
    ("Bath Soap", "Lux", 140, 3),
    ("Detergent 1kg", "Surf Excel", 560, 4),
];

const SUPPLIERS: &[&str] = &["Metro Wholesale", "Lucky Distributors"];

const CUSTOMERS: &[(&str, &str)] = &[
    ("Amina Traders", "0300-1112223"),
    ("Bilal Stores", "0321-4445556"),
    ("Farah Builders", "0333-7778889"),
];

const SEED_USER: &str = "seed";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tally Seed Data Generator");
    println!("=========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let policy = LedgerPolicy::default();

    let mut products: Vec<Product> = Vec::with_capacity(PRODUCTS.len());
    for (idx, (name, brand, price, stock)) in PRODUCTS.iter().enumerate() {
        let product = db
            .products()
            .insert(&NewProduct {
                name: name.to_string(),
                description: None,
                barcode: Some(barcode_for(idx)),
                brand: Some(brand.to_string()),
                cost_price_cents: price * 3 / 4,
                sell_price_cents: *price,
                stock_quantity: *stock,
                min_stock: 5,
            })
            .await?;
        products.push(product);
    }
    println!("✓ Inserted {} products", products.len());

    let mut suppliers = Vec::with_capacity(SUPPLIERS.len());
    for name in SUPPLIERS {
        let supplier = db
            .suppliers()
            .insert(&NewSupplier {
                name: name.to_string(),
                ..NewSupplier::default()
            })
            .await?;
        suppliers.push(supplier);
    }

    for (supplier, chunk) in suppliers.iter().zip(products.chunks(PRODUCTS.len() / 2)) {
        let purchase = db
            .purchases()
            .create_purchase(
                &NewPurchase {
                    supplier_id: supplier.id.clone(),
                    items: chunk
                        .iter()
                        .map(|p| PurchaseLine {
                            product_id: p.id.clone(),
                            quantity: 10,
                            unit_cost_cents: p.cost_price_cents,
                        })
                        .collect(),
                    paid_cents: None,
                },
                SEED_USER,
            )
            .await?;
        println!(
            "✓ Purchase {} from {} ({})",
            purchase.purchase_number,
            supplier.name,
            purchase.total()
        );
    }

    let mut customers = Vec::with_capacity(CUSTOMERS.len());
    for (name, phone) in CUSTOMERS {
        let customer = db
            .customers()
            .insert(&NewCustomer {
                name: name.to_string(),
                phone: Some(phone.to_string()),
                ..NewCustomer::default()
            })
            .await?;
        customers.push(customer);
    }
    println!("✓ Inserted {} customers", customers.len());

    let line = |idx: usize, quantity: i64| {
        let product = &products[idx];
        CartLine::new(product.id.clone(), quantity, product.sell_price_cents)
    };

    let sales = vec![
        CheckoutRequest {
            customer_id: None,
            payment_type: PaymentType::Cash,
            discount: Discount::None,
            items: vec![line(0, 1), line(2, 3), line(4, 2)],
        },
        CheckoutRequest {
            customer_id: None,
            payment_type: PaymentType::Cash,
            discount: Discount::Percent(500),
            items: vec![line(3, 2), line(8, 4)],
        },
        CheckoutRequest {
            customer_id: Some(customers[0].id.clone()),
            payment_type: PaymentType::Credit,
            discount: Discount::None,
            items: vec![line(1, 5), line(5, 2)],
        },
        CheckoutRequest {
            customer_id: Some(customers[2].id.clone()),
            payment_type: PaymentType::Installment,
            discount: Discount::Amount(1000),
            items: vec![line(6, 20), line(7, 2)],
        },
    ];

    let mut first_credit = None;
    for request in &sales {
        let sale = db.sales().complete_sale(request, SEED_USER, &policy).await?;
        println!(
            "✓ Sale {} ({}, total {})",
            sale.sale_number,
            sale.payment_type,
            sale.total()
        );
        if first_credit.is_none() && sale.payment_type.creates_debt() {
            first_credit = Some(sale);
        }
    }

    if let Some(sale) = first_credit {
        if let Some(customer_id) = sale.customer_id.clone() {
            let payment = db
                .credit_payments()
                .record_payment(
                    &NewCreditPayment {
                        sale_id: sale.id.clone(),
                        customer_id,
                        amount_cents: sale.remaining_cents / 2,
                        note: Some("first installment".to_string()),
                    },
                    SEED_USER,
                    &policy,
                )
                .await?;
            println!("✓ Payment of {} against {}", payment.amount(), sale.sale_number);
        }
    }

    let stats = db.dashboard().stats().await?;
    println!();
    println!("Dashboard");
    println!("  Today's sales:   {} cents in {} orders", stats.today_sales_cents, stats.today_orders);
    println!("  Inventory value: {} cents", stats.inventory_value_cents);
    println!("  Total debt:      {} cents", stats.total_debt_cents);
    println!("  Low stock:       {} products", stats.low_stock_count);

    let mismatches = db.dashboard().debt_audit().await?;
    if mismatches.is_empty() {
        println!("✓ Debt audit clean");
    } else {
        println!("⚠ Debt audit found {} mismatches", mismatches.len());
    }

    db.close().await;
    println!();
    println!("🎉 Seed complete!");

    Ok(())
}

/// A 13-digit barcode with a valid EAN-13 check digit.
fn barcode_for(idx: usize) -> String {
    let body = format!("890100{:06}", idx + 1);
    let sum: u32 = body
        .chars()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(pos, digit)| if pos % 2 == 0 { digit } else { digit * 3 })
        .sum();
    let check = (10 - sum % 10) % 10;
    format!("{}{}", body, check)
}
