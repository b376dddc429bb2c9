//! # Category Repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use fixparts_core::error::{Entity, StorageResult};
use fixparts_core::storage::CategoryStore;
use fixparts_core::types::{Category, CategoryDraft};

use crate::error::DbError;

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }
}

#[async_trait]
impl CategoryStore for CategoryRepository {
    async fn get(&self, id: i64) -> StorageResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(category)
    }

    async fn list(&self) -> StorageResult<Vec<Category>> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name, id")
                .fetch_all(&self.pool)
                .await
                .map_err(DbError::from)?;

        Ok(categories)
    }

    async fn subcategories(&self, parent_id: i64) -> StorageResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE parent_id = ?1 ORDER BY name, id",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(categories)
    }

    async fn insert(&self, draft: &CategoryDraft) -> StorageResult<Category> {
        debug!(name = %draft.name, "Inserting category");
        let now = Utc::now();

        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description, parent_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            RETURNING *
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.parent_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(category)
    }

    async fn update(&self, id: i64, draft: &CategoryDraft) -> StorageResult<Category> {
        debug!(id, "Updating category");

        let category = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories SET
                name = ?2,
                description = ?3,
                parent_id = ?4,
                updated_at = ?5
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.parent_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(category.ok_or(DbError::not_found(Entity::Category, id))?)
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        debug!(id, "Deleting category");

        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Entity::Category, id).into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::database;
    use fixparts_core::error::StorageError;

    #[tokio::test]
    async fn test_insert_and_children() {
        let repo = database().await.categories();

        let brakes = repo.insert(&CategoryDraft::new("Brakes")).await.unwrap();
        assert_eq!(brakes.id, 1);
        assert_eq!(brakes.parent_id, None);

        repo.insert(&CategoryDraft::new("Rotors").with_parent(1))
            .await
            .unwrap();
        repo.insert(&CategoryDraft::new("Pads").with_parent(1))
            .await
            .unwrap();

        let names: Vec<_> = repo
            .subcategories(1)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Pads", "Rotors"]);
        assert_eq!(repo.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_parent_is_foreign_key_error() {
        let repo = database().await.categories();
        let err = repo
            .insert(&CategoryDraft::new("Pads").with_parent(42))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_delete_parent_restricted() {
        let repo = database().await.categories();
        repo.insert(&CategoryDraft::new("Brakes")).await.unwrap();
        repo.insert(&CategoryDraft::new("Pads").with_parent(1))
            .await
            .unwrap();

        let err = repo.delete(1).await.unwrap_err();
        assert!(matches!(err, StorageError::ForeignKeyViolation { .. }));

        repo.delete(2).await.unwrap();
        repo.delete(1).await.unwrap();
        assert!(matches!(
            repo.delete(1).await.unwrap_err(),
            StorageError::NotFound {
                entity: Entity::Category,
                id: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_update_missing() {
        let repo = database().await.categories();
        let err = repo.update(5, &CategoryDraft::new("Ghost")).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
        assert!(repo.get(5).await.unwrap().is_none());
    }
}
