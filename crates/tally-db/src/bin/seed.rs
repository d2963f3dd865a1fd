//! # Seed Data Generator
//!
//! Populates the database with a bar catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default venue
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path and venue
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db --venue my-venue
//!
//! # More log output
//! RUST_LOG=tally_db=debug cargo run -p tally-db --bin seed
//! ```
//!
//! Each product gets a price in the category's range and a stock level
//! between 0 and 48; roughly one in eleven starts sold out so empty shelves
//! show up in development.

use chrono::Utc;
use std::env;
use tally_core::{Product, DEFAULT_VENUE_ID};
use tally_db::repository::product::generate_product_id;
use tally_db::{Database, DbConfig};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// (category, base price in cents, products)
const CATALOG: &[(&str, i64, &[&str])] = &[
    (
        "Beer",
        550,
        &["Lager", "Pale Ale", "IPA", "Stout", "Pilsner", "Wheat Beer", "Cider"],
    ),
    (
        "Cocktails",
        1100,
        &[
            "Gin Tonic",
            "Mojito",
            "Margarita",
            "Negroni",
            "Old Fashioned",
            "Cuba Libre",
            "Espresso Martini",
        ],
    ),
    (
        "Shots",
        400,
        &["Tequila", "Jägermeister", "Vodka", "Sambuca", "Whisky"],
    ),
    (
        "Wine",
        750,
        &["House Red", "House White", "Rosé", "Prosecco"],
    ),
    (
        "Soft Drinks",
        300,
        &["Cola", "Lemonade", "Tonic Water", "Sparkling Water", "Energy Drink"],
    ),
    (
        "Food",
        800,
        &["Nachos", "Fries", "Chicken Wings", "Olives"],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./tally_dev.db");
    let mut venue_id = String::from(DEFAULT_VENUE_ID);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--venue" | "-v" => {
                if i + 1 < args.len() {
                    venue_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: ./tally_dev.db)");
                println!("  -v, --venue <ID>     Venue to seed (default: {})", DEFAULT_VENUE_ID);
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(database = %db_path, venue_id = %venue_id, "Seeding catalog");

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let products = db.products();

    let existing = products.count(&venue_id).await?;
    if existing > 0 {
        warn!(
            existing,
            "Venue already has products; skipping seed. Delete the database file to regenerate."
        );
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0usize;

    for (category, base_price, names) in CATALOG {
        for name in names.iter() {
            let product = generate_product(&venue_id, category, name, *base_price, generated);
            if let Err(e) = products.upsert(&product).await {
                error!(name = %product.name, error = %e, "Failed to insert product");
                continue;
            }
            generated += 1;
        }
    }

    info!(generated, elapsed = ?start.elapsed(), "Seed complete");

    let in_stock = products
        .list(&tally_core::ProductFilter {
            in_stock_only: true,
            ..tally_core::ProductFilter::for_venue(&venue_id)
        })
        .await?;
    info!(in_stock = in_stock.len(), "Products available for sale");

    db.close().await;
    Ok(())
}

/// Generates a single product with deterministic price and stock.
fn generate_product(
    venue_id: &str,
    category: &str,
    name: &str,
    base_price: i64,
    seed: usize,
) -> Product {
    // base price plus 0-3 in 50 cent steps
    let price_cents = base_price + ((seed * 7) % 4) as i64 * 50;

    // every 11th product starts sold out
    let available_quantity = if seed % 11 == 10 {
        0
    } else {
        ((seed * 13) % 48 + 1) as i64
    };

    Product {
        id: generate_product_id(),
        venue_id: venue_id.to_string(),
        name: name.to_string(),
        category: Some(category.to_string()),
        unit_price_cents: price_cents,
        available_quantity,
        is_active: true,
        updated_at: Utc::now(),
    }
}
