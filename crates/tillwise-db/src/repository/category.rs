//! # Category Repository
//!
//! Menu sections shown as tabs above the order screen's item grid.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tillwise_core::{Category, CategoryUpdate, CoreError, NewCategory};

const SELECT_CATEGORY: &str = r#"
    SELECT id, name, is_active, display_order, created_at, updated_at
    FROM categories
"#;

/// Repository for category operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Creates a category. Names are unique ignoring case.
    pub async fn create(&self, new: NewCategory) -> DbResult<Category> {
        let new = new.validated()?;
        self.ensure_name_free(&new.name, None).await?;

        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            is_active: new.is_active,
            display_order: new.display_order,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %category.id, name = %category.name, "Creating category");

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, is_active, display_order, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(category.is_active)
        .bind(category.display_order)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(category)
    }

    /// Gets a category by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!("{SELECT_CATEGORY} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(category)
    }

    /// Active categories in menu order (display order, then name).
    pub async fn list_active(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "{SELECT_CATEGORY} WHERE is_active = 1 ORDER BY display_order, name COLLATE NOCASE"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Applies a partial update (rename, reorder, activate/deactivate).
    pub async fn update(&self, id: &str, update: CategoryUpdate) -> DbResult<Category> {
        let update = update.validated()?;
        let mut category = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))?;

        if let Some(name) = update.name {
            self.ensure_name_free(&name, Some(id)).await?;
            category.name = name;
        }
        if let Some(active) = update.is_active {
            category.is_active = active;
        }
        if let Some(order) = update.display_order {
            category.display_order = order;
        }
        category.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE categories SET
                name = ?2,
                is_active = ?3,
                display_order = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(category.is_active)
        .bind(category.display_order)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(category)
    }

    async fn ensure_name_free(&self, name: &str, except_id: Option<&str>) -> DbResult<()> {
        let taken: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM categories WHERE name = ?1 COLLATE NOCASE AND id <> ?2",
        )
        .bind(name)
        .bind(except_id.unwrap_or(""))
        .fetch_one(&self.pool)
        .await?;

        if taken > 0 {
            return Err(CoreError::DuplicateName {
                entity: "Category".to_string(),
                name: name.to_string(),
            }
            .into());
        }

        Ok(())
    }
}
