//! # Repository Module
//!
//! Database repository implementations for the till.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  Database                                                               │
//! │  ├── tax_groups()  → TaxGroupRepository        GST rules               │
//! │  ├── categories()  → CategoryRepository        menu sections           │
//! │  ├── products()    → ProductRepository         menu + catalog items    │
//! │  ├── inventory()   → InventoryRepository       stock ledger            │
//! │  ├── bills()       → BillRepository            bills + GST summary     │
//! │  └── outbox()      → SubmissionOutboxRepository head-office queue      │
//! │                                                                         │
//! │  Each repository owns a pool clone. Functions that must run inside a   │
//! │  caller's transaction take `&mut SqliteConnection` instead.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod bill;
pub mod category;
pub mod inventory;
pub mod outbox;
pub mod product;
pub mod tax_group;

#[cfg(test)]
pub(crate) mod test_support {
    use tillwise_core::{
        Category, NewCategory, NewProduct, NewTaxGroup, Product, SplitType, TaxGroup,
    };

    use crate::Database;

    /// A small café menu with stock on hand.
    pub struct Fixture {
        /// GST 5%, exclusive, even split.
        pub gst_5: TaxGroup,
        /// GST 18%, inclusive, even split.
        pub gst_18_incl: TaxGroup,
        pub beverages: Category,
        /// ₹20.00, GST 5%, 50 in stock.
        pub chai: Product,
        /// ₹118.00, GST 18% inclusive, 10 in stock.
        pub thali: Product,
        /// ₹20.00, untaxed, 5 in stock.
        pub water: Product,
    }

    pub fn new_product(name: &str, price_paise: i64, tax_group_id: Option<&str>) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            barcode: None,
            category_id: None,
            price_paise,
            tax_group_id: tax_group_id.map(str::to_string),
        }
    }

    pub async fn seeded_db() -> (Database, Fixture) {
        let db = Database::in_memory().await.unwrap();

        let gst_5 = db
            .tax_groups()
            .create(NewTaxGroup {
                name: "GST 5%".to_string(),
                total_rate_bps: 500,
                split_type: SplitType::Gst5050,
                is_tax_inclusive: false,
                is_active: true,
                code: None,
            })
            .await
            .unwrap();

        let gst_18_incl = db
            .tax_groups()
            .create(NewTaxGroup {
                name: "GST 18% incl.".to_string(),
                total_rate_bps: 1800,
                split_type: SplitType::Gst5050,
                is_tax_inclusive: true,
                is_active: true,
                code: None,
            })
            .await
            .unwrap();

        let beverages = db
            .categories()
            .create(NewCategory {
                name: "Beverages".to_string(),
                is_active: true,
                display_order: 1,
            })
            .await
            .unwrap();

        let mut chai = new_product("Masala Chai", 2000, Some(&gst_5.id));
        chai.category_id = Some(beverages.id.clone());
        chai.barcode = Some("8900000000011".to_string());
        let chai = db.products().insert(chai).await.unwrap();

        let thali = db
            .products()
            .insert(new_product("Veg Thali", 11800, Some(&gst_18_incl.id)))
            .await
            .unwrap();

        let mut water = new_product("Mineral Water", 2000, None);
        water.category_id = Some(beverages.id.clone());
        let water = db.products().insert(water).await.unwrap();

        for (product, qty) in [(&chai, 50), (&thali, 10), (&water, 5)] {
            db.inventory()
                .add_stock(&product.id, qty, Some("Opening stock"))
                .await
                .unwrap();
        }

        (
            db,
            Fixture {
                gst_5,
                gst_18_incl,
                beverages,
                chai,
                thali,
                water,
            },
        )
    }
}
