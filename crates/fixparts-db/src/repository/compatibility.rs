//! # Compatibility Repository
//!
//! Both lookups resolve vehicle names through the full hierarchy:
//!
//! ```text
//! compatibility c
//!   JOIN vehicle_submodels s  ON s.id  = c.submodel_id
//!   JOIN vehicle_models    m  ON m.id  = s.model_id
//!   JOIN vehicle_makes     mk ON mk.id = m.make_id
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use fixparts_core::error::{Entity, StorageResult};
use fixparts_core::storage::CompatibilityStore;
use fixparts_core::types::{Compatibility, CompatibilityDetail, CompatibleItem};

use crate::error::DbError;

#[derive(Debug, Clone)]
pub struct CompatibilityRepository {
    pool: SqlitePool,
}

impl CompatibilityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CompatibilityRepository { pool }
    }
}

#[async_trait]
impl CompatibilityStore for CompatibilityRepository {
    async fn list_for_item(&self, item_id: i64) -> StorageResult<Vec<CompatibilityDetail>> {
        let links = sqlx::query_as::<_, CompatibilityDetail>(
            r#"
            SELECT
                c.id,
                c.item_id,
                c.submodel_id,
                c.notes,
                c.created_at,
                mk.name AS make_name,
                m.name AS model_name,
                s.name AS submodel_name
            FROM compatibility c
            JOIN vehicle_submodels s ON s.id = c.submodel_id
            JOIN vehicle_models m ON m.id = s.model_id
            JOIN vehicle_makes mk ON mk.id = m.make_id
            WHERE c.item_id = ?1
            ORDER BY mk.name, m.name, s.name
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(links)
    }

    async fn list_items_for_submodel(
        &self,
        submodel_id: i64,
    ) -> StorageResult<Vec<CompatibleItem>> {
        let items = sqlx::query_as::<_, CompatibleItem>(
            r#"
            SELECT
                i.*,
                c.notes AS compatibility_notes,
                mk.name AS make_name,
                m.name AS model_name,
                s.name AS submodel_name
            FROM compatibility c
            JOIN items i ON i.id = c.item_id
            JOIN vehicle_submodels s ON s.id = c.submodel_id
            JOIN vehicle_models m ON m.id = s.model_id
            JOIN vehicle_makes mk ON mk.id = m.make_id
            WHERE c.submodel_id = ?1
            ORDER BY i.part_number
            "#,
        )
        .bind(submodel_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(items)
    }

    async fn insert(
        &self,
        item_id: i64,
        submodel_id: i64,
        notes: Option<&str>,
    ) -> StorageResult<Compatibility> {
        debug!(item_id, submodel_id, "Inserting compatibility");

        let link = sqlx::query_as::<_, Compatibility>(
            r#"
            INSERT INTO compatibility (item_id, submodel_id, notes, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING *
            "#,
        )
        .bind(item_id)
        .bind(submodel_id)
        .bind(notes)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(link)
    }

    async fn remove(&self, item_id: i64, submodel_id: i64) -> StorageResult<()> {
        debug!(item_id, submodel_id, "Removing compatibility");

        let result =
            sqlx::query("DELETE FROM compatibility WHERE item_id = ?1 AND submodel_id = ?2")
                .bind(item_id)
                .bind(submodel_id)
                .execute(&self.pool)
                .await
                .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            // Links have no id callers know about.
            return Err(DbError::not_found(Entity::Compatibility, 0).into());
        }

        Ok(())
    }

    async fn count_fitted_submodels(&self) -> StorageResult<usize> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT submodel_id) FROM compatibility")
                .fetch_one(&self.pool)
                .await
                .map_err(DbError::from)?;

        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Database;
    use crate::repository::test_support::database;
    use fixparts_core::error::StorageError;
    use fixparts_core::money::Money;
    use fixparts_core::storage::{ItemStore, MakeStore, ModelStore, SubmodelStore};
    use fixparts_core::types::ItemDraft;
    use fixparts_core::vehicle::{MakeDraft, ModelDraft, SubmodelDraft};

    /// Items PN-A, PN-B and submodels "GL", "GLX" of one Corolla.
    async fn seeded() -> Database {
        let db = database().await;
        for (part, barcode) in [("PN-B", "BC-B"), ("PN-A", "BC-A")] {
            let mut draft = ItemDraft::new(
                part,
                "Spark plug",
                Money::from_cents(300),
                Money::from_cents(650),
            );
            draft.barcode = Some(barcode.into());
            db.items().insert(&draft).await.unwrap();
        }

        let vehicles = db.vehicles();
        MakeStore::insert(&vehicles, &MakeDraft::new("Toyota"))
            .await
            .unwrap();
        ModelStore::insert(&vehicles, &ModelDraft::new(1, "Corolla"))
            .await
            .unwrap();
        for name in ["GL", "GLX"] {
            SubmodelStore::insert(
                &vehicles,
                &SubmodelDraft {
                    model_id: 1,
                    name: name.into(),
                    year_from: 2002,
                    year_to: None,
                    engine_type: "I4".into(),
                    engine_displacement: 1.6,
                    fuel_type: "Petrol".into(),
                    transmission_type: "Manual".into(),
                    body_type: "Sedan".into(),
                },
            )
            .await
            .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_pair_is_unique() {
        let db = seeded().await;
        let repo = db.compatibility();
        repo.insert(1, 1, None).await.unwrap();

        let err = repo.insert(1, 1, None).await.unwrap_err();
        assert!(err.violates("item_id"));
        assert!(err.violates("submodel_id"));

        repo.remove(1, 1).await.unwrap();
        assert!(matches!(
            repo.remove(1, 1).await.unwrap_err(),
            StorageError::NotFound {
                entity: Entity::Compatibility,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_lookups_join_vehicle_names() {
        let db = seeded().await;
        let repo = db.compatibility();
        repo.insert(1, 2, Some("with gasket")).await.unwrap();
        repo.insert(1, 1, None).await.unwrap();
        repo.insert(2, 1, None).await.unwrap();

        let links = repo.list_for_item(1).await.unwrap();
        let names: Vec<_> = links.iter().map(|l| l.submodel_name.as_str()).collect();
        assert_eq!(names, vec!["GL", "GLX"]);
        assert_eq!(links[1].notes.as_deref(), Some("with gasket"));
        assert_eq!(links[0].make_name, "Toyota");

        let fitting = repo.list_items_for_submodel(1).await.unwrap();
        let parts: Vec<_> = fitting.iter().map(|c| c.item.part_number.as_str()).collect();
        assert_eq!(parts, vec!["PN-A", "PN-B"]);
        assert_eq!(fitting[0].model_name, "Corolla");
        assert_eq!(fitting[0].item.sell_price, Money::from_cents(650));
    }

    #[tokio::test]
    async fn test_links_cascade_with_item_and_submodel() {
        let db = seeded().await;
        let repo = db.compatibility();
        repo.insert(1, 1, None).await.unwrap();
        repo.insert(2, 2, None).await.unwrap();

        db.items().delete(1).await.unwrap();
        assert!(repo.list_items_for_submodel(1).await.unwrap().is_empty());

        SubmodelStore::delete(&db.vehicles(), 2).await.unwrap();
        assert!(repo.list_for_item(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_count_fitted_submodels() {
        let db = seeded().await;
        let repo = db.compatibility();
        assert_eq!(repo.count_fitted_submodels().await.unwrap(), 0);

        repo.insert(1, 1, None).await.unwrap();
        repo.insert(2, 1, None).await.unwrap();
        assert_eq!(repo.count_fitted_submodels().await.unwrap(), 1);

        repo.insert(2, 2, None).await.unwrap();
        assert_eq!(repo.count_fitted_submodels().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_dangling_reference() {
        let db = seeded().await;
        let err = db.compatibility().insert(9, 1, None).await.unwrap_err();
        assert!(matches!(err, StorageError::ForeignKeyViolation { .. }));
    }
}
