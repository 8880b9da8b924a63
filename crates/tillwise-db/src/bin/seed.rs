//! # Seed Data Generator
//!
//! Populates a development database with a small café menu.
//!
//! ## Usage
//! ```bash
//! # Seed the database named by TILLWISE_DB_PATH (default ./tillwise.db)
//! cargo run -p tillwise-db --bin seed
//!
//! # Specify database path
//! cargo run -p tillwise-db --bin seed -- --db ./data/dev.db
//!
//! # Skip the opening stock entries
//! cargo run -p tillwise-db --bin seed -- --no-stock
//! ```
//!
//! ## Generated Data
//! - Tax groups: GST 5%, GST 12%, GST 18% (inclusive)
//! - Categories: Beverages, Snacks, Meals, Desserts
//! - One product per menu entry, with opening stock

use std::env;
use std::path::PathBuf;

use tillwise_core::{Money, NewCategory, NewProduct, NewTaxGroup, SplitType};
use tillwise_db::{Database, TillConfig};
use tracing::info;

/// Tax groups: (name, code, rate in bps, tax inclusive)
const TAX_GROUPS: &[(&str, &str, u32, bool)] = &[
    ("GST 5%", "GST5", 500, false),
    ("GST 12%", "GST12", 1200, false),
    ("GST 18% Incl", "GST18I", 1800, true),
];

/// Menu: (category, [(name, price in paise, tax group index, opening stock)])
const MENU: &[(&str, &[(&str, i64, Option<usize>, i64)])] = &[
    (
        "Beverages",
        &[
            ("Masala Chai", 2000, Some(0), 200),
            ("Filter Coffee", 3000, Some(0), 200),
            ("Cold Coffee", 9000, Some(2), 60),
            ("Fresh Lime Soda", 6000, Some(0), 80),
            ("Mineral Water", 2000, None, 120),
        ],
    ),
    (
        "Snacks",
        &[
            ("Samosa", 1500, Some(0), 100),
            ("Vada Pav", 2500, Some(0), 100),
            ("Veg Sandwich", 6000, Some(1), 40),
            ("Paneer Puff", 4000, Some(1), 40),
        ],
    ),
    (
        "Meals",
        &[
            ("Veg Thali", 11800, Some(2), 30),
            ("Masala Dosa", 8000, Some(0), 50),
            ("Chole Bhature", 9500, Some(0), 40),
        ],
    ),
    (
        "Desserts",
        &[
            ("Gulab Jamun", 4000, Some(1), 60),
            ("Kulfi", 5000, Some(2), 50),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tillwise_db::init_tracing();

    let mut config = TillConfig::from_env();
    let mut with_stock = true;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--no-stock" => with_stock = false,
            "--help" | "-h" => {
                println!("Tillwise Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $TILLWISE_DB_PATH or ./tillwise.db)");
                println!("      --no-stock     Do not record opening stock");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    println!("🌱 Tillwise Seed Data Generator");
    println!("===============================");
    println!("Database: {}", config.database_path.display());
    for line in config.receipt_header() {
        println!("Header:   {}", line);
    }
    println!("Payment:  {} preselected", config.default_payment_method.as_str());
    println!();

    let db = Database::new(config.db_config()).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Tax groups
    let mut group_ids = Vec::with_capacity(TAX_GROUPS.len());
    for (name, code, rate_bps, inclusive) in TAX_GROUPS {
        let group = db
            .tax_groups()
            .create(NewTaxGroup {
                name: name.to_string(),
                total_rate_bps: *rate_bps,
                split_type: SplitType::Gst5050,
                is_tax_inclusive: *inclusive,
                is_active: true,
                code: Some(code.to_string()),
            })
            .await?;
        println!("✓ Tax group {}", group.name);
        group_ids.push(group.id);
    }

    // Categories and products
    let mut generated = 0;
    for (display_order, (category_name, items)) in MENU.iter().enumerate() {
        let category = db
            .categories()
            .create(NewCategory {
                name: category_name.to_string(),
                is_active: true,
                display_order: display_order as i64,
            })
            .await?;

        for (name, price_paise, group_idx, opening_stock) in items.iter() {
            let product = db
                .products()
                .insert(NewProduct {
                    name: name.to_string(),
                    barcode: Some(format!("890{:010}", generated + 1)),
                    category_id: Some(category.id.clone()),
                    price_paise: *price_paise,
                    tax_group_id: group_idx.map(|idx| group_ids[idx].clone()),
                })
                .await?;

            if with_stock {
                db.inventory()
                    .add_stock(&product.id, *opening_stock, Some("Opening stock"))
                    .await?;
            }

            generated += 1;
        }

        println!("✓ {} ({} items)", category.name, items.len());
    }

    info!(products = generated, "Seed complete");

    // Verify search
    println!();
    println!("Verifying catalog...");
    let results = db.products().search("masala", 10).await?;
    println!("  Search 'masala': {} results", results.len());
    if let Some(item) = db.products().catalog(1).await?.first() {
        println!(
            "  First item: {} at {}",
            item.product.name,
            config.format_currency(Money::from_paise(item.product.price_paise))
        );
    }

    println!();
    println!("✓ Seed complete! {} products", generated);

    db.close().await;
    Ok(())
}
