//! # Product Repository
//!
//! Menu items and the catalog the order screen prices from.
//!
//! ## Catalog Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products                         tax_groups                            │
//! │  ┌─────────────┬──────────────┐   ┌──────────┬──────┬──────┬───────┐    │
//! │  │ Masala Chai │ tg-5         │──►│ tg-5     │ 500  │ 50/50│ excl. │    │
//! │  │ Veg Thali   │ tg-18i       │──►│ tg-18i   │ 1800 │ 50/50│ incl. │    │
//! │  │ Water       │ NULL         │   └──────────┴──────┴──────┴───────┘    │
//! │  └─────────────┴──────────────┘                                         │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  CatalogItem { product, tax_group }  ──► tax_treatment()                │
//! │     Water → TaxTreatment::Untaxed                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Search is a case-insensitive substring match on name and barcode.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::tax_group;
use tillwise_core::validation::{validate_barcode, validate_search_query};
use tillwise_core::{CatalogItem, NewProduct, Product, ProductUpdate, TaxGroup};

const SELECT_PRODUCT: &str = r#"
    SELECT id, name, barcode, category_id, price_paise, tax_group_id,
           is_active, created_at, updated_at
    FROM products
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// // Search products
/// let results = repo.search("chai", 20).await?;
///
/// // Menu for the order screen
/// let menu = repo.catalog(200).await?;
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

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with generated fields
    /// * `Err(DbError::NotFound)` - Tax group missing or inactive
    /// * `Err(DbError::UniqueViolation)` - Barcode already exists
    /// * `Err(DbError::ForeignKeyViolation)` - Unknown category
    pub async fn insert(&self, new: NewProduct) -> DbResult<Product> {
        let new = new.validated()?;
        if let Some(tax_group_id) = &new.tax_group_id {
            self.ensure_assignable_tax_group(tax_group_id).await?;
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            barcode: new.barcode,
            category_id: new.category_id,
            price_paise: new.price_paise,
            tax_group_id: new.tax_group_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, barcode, category_id, price_paise, tax_group_id,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.barcode)
        .bind(&product.category_id)
        .bind(product.price_paise)
        .bind(&product.tax_group_id)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_on(&mut conn, id).await
    }

    /// Exact barcode lookup for the scanner, active or not.
    ///
    /// An inactive hit is still returned so the order screen can say the
    /// item is no longer sold instead of "unknown barcode".
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let barcode = validate_barcode(barcode)?;

        let product = sqlx::query_as::<_, Product>(&format!("{SELECT_PRODUCT} WHERE barcode = ?1"))
            .bind(&barcode)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Searches active products by name or barcode.
    ///
    /// ## Example
    /// ```rust,ignore
    /// // Matches "Masala Chai", "Ginger Chai", ...
    /// let products = repo.search("chai", 20).await?;
    ///
    /// // Empty query returns active products by name
    /// let products = repo.search("", 20).await?;
    /// ```
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, limit = %limit, "Searching products");

        let products = sqlx::query_as::<_, Product>(&format!(
            r#"{SELECT_PRODUCT}
            WHERE is_active = 1
            AND (?1 = ''
                 OR instr(lower(name), lower(?1)) > 0
                 OR instr(lower(COALESCE(barcode, '')), lower(?1)) > 0)
            ORDER BY name COLLATE NOCASE
            LIMIT ?2
            "#
        ))
        .bind(&query)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Active products in one category, by name.
    pub async fn list_by_category(&self, category_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "{SELECT_PRODUCT} WHERE category_id = ?1 AND is_active = 1 ORDER BY name COLLATE NOCASE"
        ))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Applies a partial update.
    pub async fn update(&self, id: &str, update: ProductUpdate) -> DbResult<Product> {
        let update = update.validated()?;
        let mut product = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        if let Some(tax_group_id) = &update.tax_group_id {
            self.ensure_assignable_tax_group(tax_group_id).await?;
        }

        update.apply_to(&mut product);
        product.updated_at = Utc::now();

        debug!(id = %id, "Updating product");

        sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                barcode = ?3,
                category_id = ?4,
                price_paise = ?5,
                tax_group_id = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.barcode)
        .bind(&product.category_id)
        .bind(product.price_paise)
        .bind(&product.tax_group_id)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Moves every product in a category onto one tax group.
    ///
    /// Returns how many products changed. An empty category is not an error.
    ///
    /// ## Errors
    /// - `NotFound` when the tax group is missing or inactive
    /// - `NotFound` when the category does not exist
    pub async fn assign_tax_group_to_category(
        &self,
        category_id: &str,
        tax_group_id: &str,
    ) -> DbResult<u64> {
        self.ensure_assignable_tax_group(tax_group_id).await?;

        let categories: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE id = ?1")
            .bind(category_id)
            .fetch_one(&self.pool)
            .await?;
        if categories == 0 {
            return Err(DbError::not_found("Category", category_id));
        }

        let result = sqlx::query(
            r#"
            UPDATE products SET tax_group_id = ?2, updated_at = ?3
            WHERE category_id = ?1
            AND (tax_group_id IS NULL OR tax_group_id <> ?2)
            "#,
        )
        .bind(category_id)
        .bind(tax_group_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let updated = result.rows_affected();
        info!(
            category_id = %category_id,
            tax_group_id = %tax_group_id,
            updated,
            "Category tax group assigned"
        );
        Ok(updated)
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Bills keep referencing the row, so it is never removed.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// One product with its resolved tax group.
    pub async fn catalog_item(&self, id: &str) -> DbResult<Option<CatalogItem>> {
        let mut conn = self.pool.acquire().await?;
        catalog_item_on(&mut conn, id).await
    }

    /// The menu: active products with their tax groups, by name.
    pub async fn catalog(&self, limit: u32) -> DbResult<Vec<CatalogItem>> {
        let products = self.search("", limit).await?;

        let groups: HashMap<String, TaxGroup> = sqlx::query_as::<_, TaxGroup>(
            r#"
            SELECT id, name, total_rate_bps, split_type, is_tax_inclusive,
                   is_active, code, created_at, updated_at
            FROM tax_groups
            WHERE id IN (SELECT tax_group_id FROM products WHERE is_active = 1)
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|g| (g.id.clone(), g))
        .collect();

        Ok(products
            .into_iter()
            .map(|product| {
                let tax_group = product
                    .tax_group_id
                    .as_ref()
                    .and_then(|id| groups.get(id))
                    .cloned();
                CatalogItem { product, tax_group }
            })
            .collect())
    }

    async fn ensure_assignable_tax_group(&self, tax_group_id: &str) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        match tax_group::fetch_on(&mut conn, tax_group_id).await? {
            Some(group) if group.is_active => Ok(()),
            _ => Err(DbError::not_found("Active tax group", tax_group_id)),
        }
    }
}

/// Fetches a product on an existing connection.
pub(crate) async fn fetch_on(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!("{SELECT_PRODUCT} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(product)
}

/// Resolves a catalog item on an existing connection (used inside the bill
/// transaction).
pub(crate) async fn catalog_item_on(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<CatalogItem>> {
    let Some(product) = fetch_on(conn, id).await? else {
        return Ok(None);
    };

    let tax_group = match &product.tax_group_id {
        Some(tax_group_id) => tax_group::fetch_on(conn, tax_group_id).await?,
        None => None,
    };

    Ok(Some(CatalogItem { product, tax_group }))
}
