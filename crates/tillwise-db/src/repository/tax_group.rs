//! # Tax Group Repository
//!
//! Named GST rules that products point at.
//!
//! ## Deactivation Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  update(id, is_active = false)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SELECT COUNT(*) FROM products                                          │
//! │  WHERE tax_group_id = id AND is_active = 1                              │
//! │       │                                                                 │
//! │       ├── 0  ──► deactivate                                             │
//! │       └── n  ──► CoreError::TaxGroupInUse { product_count: n }          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Names are unique ignoring case ("GST 5%" and "gst 5%" clash).

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tillwise_core::{CoreError, NewTaxGroup, TaxGroup, TaxGroupUpdate};

const SELECT_TAX_GROUP: &str = r#"
    SELECT id, name, total_rate_bps, split_type, is_tax_inclusive,
           is_active, code, created_at, updated_at
    FROM tax_groups
"#;

/// Repository for tax group operations.
#[derive(Debug, Clone)]
pub struct TaxGroupRepository {
    pool: SqlitePool,
}

impl TaxGroupRepository {
    /// Creates a new TaxGroupRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TaxGroupRepository { pool }
    }

    /// Creates a tax group.
    ///
    /// ## Errors
    /// - `Rejected(InvalidArgument)` for a blank name or a rate above 100%
    /// - `Rejected(DuplicateName)` when the name is taken (any case)
    pub async fn create(&self, new: NewTaxGroup) -> DbResult<TaxGroup> {
        let new = new.validated()?;
        self.ensure_name_free(&new.name, None).await?;

        let now = Utc::now();
        let group = TaxGroup {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            total_rate_bps: new.total_rate_bps,
            split_type: new.split_type,
            is_tax_inclusive: new.is_tax_inclusive,
            is_active: new.is_active,
            code: new.code,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %group.id, name = %group.name, bps = group.total_rate_bps, "Creating tax group");

        sqlx::query(
            r#"
            INSERT INTO tax_groups (
                id, name, total_rate_bps, split_type, is_tax_inclusive,
                is_active, code, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&group.id)
        .bind(&group.name)
        .bind(group.total_rate_bps)
        .bind(group.split_type)
        .bind(group.is_tax_inclusive)
        .bind(group.is_active)
        .bind(&group.code)
        .bind(group.created_at)
        .bind(group.updated_at)
        .execute(&self.pool)
        .await?;

        info!(id = %group.id, name = %group.name, "Tax group created");
        Ok(group)
    }

    /// Gets a tax group by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<TaxGroup>> {
        let mut conn = self.pool.acquire().await?;
        fetch_on(&mut conn, id).await
    }

    /// All tax groups, lowest rate first.
    pub async fn list_all(&self) -> DbResult<Vec<TaxGroup>> {
        let groups = sqlx::query_as::<_, TaxGroup>(&format!(
            "{SELECT_TAX_GROUP} ORDER BY total_rate_bps, name COLLATE NOCASE"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    /// Groups that can be assigned to products.
    pub async fn list_active(&self) -> DbResult<Vec<TaxGroup>> {
        let groups = sqlx::query_as::<_, TaxGroup>(&format!(
            "{SELECT_TAX_GROUP} WHERE is_active = 1 ORDER BY total_rate_bps, name COLLATE NOCASE"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    /// Applies a partial update.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown id
    /// - `Rejected(DuplicateName)` when renaming onto another group's name
    /// - `Rejected(TaxGroupInUse)` when deactivating a group active products use
    pub async fn update(&self, id: &str, update: TaxGroupUpdate) -> DbResult<TaxGroup> {
        let update = update.validated()?;
        let mut group = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Tax group", id))?;

        if let Some(name) = &update.name {
            self.ensure_name_free(name, Some(id)).await?;
        }

        if update.is_active == Some(false) && group.is_active {
            let product_count = self.count_active_products(id).await?;
            if product_count > 0 {
                return Err(CoreError::TaxGroupInUse {
                    id: id.to_string(),
                    product_count,
                }
                .into());
            }
        }

        update.apply_to(&mut group);
        group.updated_at = Utc::now();

        debug!(id = %id, "Updating tax group");

        sqlx::query(
            r#"
            UPDATE tax_groups SET
                name = ?2,
                total_rate_bps = ?3,
                split_type = ?4,
                is_tax_inclusive = ?5,
                is_active = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&group.id)
        .bind(&group.name)
        .bind(group.total_rate_bps)
        .bind(group.split_type)
        .bind(group.is_tax_inclusive)
        .bind(group.is_active)
        .bind(group.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(group)
    }

    /// Number of active products using the group.
    pub async fn count_active_products(&self, id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE tax_group_id = ?1 AND is_active = 1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn ensure_name_free(&self, name: &str, except_id: Option<&str>) -> DbResult<()> {
        let taken: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tax_groups WHERE name = ?1 COLLATE NOCASE AND id <> ?2",
        )
        .bind(name)
        .bind(except_id.unwrap_or(""))
        .fetch_one(&self.pool)
        .await?;

        if taken > 0 {
            return Err(CoreError::DuplicateName {
                entity: "Tax group".to_string(),
                name: name.to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Fetches a tax group on an existing connection (used inside transactions).
pub(crate) async fn fetch_on(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<TaxGroup>> {
    let group = sqlx::query_as::<_, TaxGroup>(&format!("{SELECT_TAX_GROUP} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{new_product, seeded_db};
    use crate::Database;
    use tillwise_core::SplitType;

    fn gst(name: &str, bps: u32) -> NewTaxGroup {
        NewTaxGroup {
            name: name.to_string(),
            total_rate_bps: bps,
            split_type: SplitType::Gst5050,
            is_tax_inclusive: false,
            is_active: true,
            code: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.tax_groups();

        let created = repo.create(gst("  GST 12% ", 1200)).await.unwrap();
        assert_eq!(created.name, "GST 12%");

        let fetched = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.total_rate_bps, 1200);
        assert_eq!(fetched.split_type, SplitType::Gst5050);
        assert!(!fetched.is_tax_inclusive);

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_ignores_case() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.tax_groups();

        repo.create(gst("GST 5%", 500)).await.unwrap();
        let err = repo.create(gst("gst 5%", 500)).await.unwrap_err();

        assert!(matches!(
            err,
            DbError::Rejected(CoreError::DuplicateName { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.tax_groups();

        let err = repo.create(gst("   ", 500)).await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::InvalidArgument(_))));

        let err = repo.create(gst("Too much", 10_001)).await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_list_active_excludes_inactive() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.tax_groups();

        let five = repo.create(gst("GST 5%", 500)).await.unwrap();
        repo.create(gst("GST 18%", 1800)).await.unwrap();
        repo.update(
            &five.id,
            TaxGroupUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "GST 18%");
        assert_eq!(repo.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rename_conflict() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.tax_groups();

        repo.create(gst("GST 5%", 500)).await.unwrap();
        let other = repo.create(gst("GST 12%", 1200)).await.unwrap();

        let err = repo
            .update(
                &other.id,
                TaxGroupUpdate {
                    name: Some("GST 5%".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::DuplicateName { .. })));

        // Renaming to its own name in another case is fine.
        let renamed = repo
            .update(
                &other.id,
                TaxGroupUpdate {
                    name: Some("gst 12%".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "gst 12%");
    }

    #[tokio::test]
    async fn test_deactivation_refused_while_in_use() {
        let (db, fixture) = seeded_db().await;
        let repo = db.tax_groups();

        let err = repo
            .update(
                &fixture.gst_5.id,
                TaxGroupUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Rejected(CoreError::TaxGroupInUse { product_count: 1, .. })
        ));

        db.products().soft_delete(&fixture.chai.id).await.unwrap();

        let group = repo
            .update(
                &fixture.gst_5.id,
                TaxGroupUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!group.is_active);
    }

    #[tokio::test]
    async fn test_rate_change_updates_catalog_treatment() {
        let (db, fixture) = seeded_db().await;

        db.tax_groups()
            .update(
                &fixture.gst_5.id,
                TaxGroupUpdate {
                    total_rate_bps: Some(1200),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let item = db
            .products()
            .catalog_item(&fixture.chai.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.tax_treatment().effective_rate().bps(), 1200);

        // Sanity: helper builds untaxed products too.
        let water = db
            .products()
            .insert(new_product("Mineral Water", 2000, None))
            .await
            .unwrap();
        assert!(water.tax_group_id.is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let db = Database::in_memory().await.unwrap();
        let err = db
            .tax_groups()
            .update("missing", TaxGroupUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
