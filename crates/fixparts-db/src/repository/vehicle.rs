//! # Vehicle Repository
//!
//! One repository over the three vehicle tables. Each level is exposed
//! through its own store trait, so callers disambiguate with
//! `MakeStore::insert(&repo, ..)` and friends.
//!
//! ```text
//! vehicle_makes ──< vehicle_models ──< vehicle_submodels ──< compatibility
//!             RESTRICT            RESTRICT                CASCADE
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use fixparts_core::error::{Entity, StorageResult};
use fixparts_core::storage::{MakeStore, ModelStore, SubmodelStore};
use fixparts_core::vehicle::{
    MakeDraft, ModelDraft, SubmodelDraft, VehicleMake, VehicleModel, VehicleSubmodel,
};

use crate::error::DbError;

#[derive(Debug, Clone)]
pub struct VehicleRepository {
    pool: SqlitePool,
}

impl VehicleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        VehicleRepository { pool }
    }

    async fn delete_from(&self, table: &str, entity: Entity, id: i64) -> StorageResult<()> {
        debug!(table, id, "Deleting vehicle row");

        let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = ?1"))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(entity, id).into());
        }

        Ok(())
    }
}

// =============================================================================
// Makes
// =============================================================================

#[async_trait]
impl MakeStore for VehicleRepository {
    async fn get(&self, id: i64) -> StorageResult<Option<VehicleMake>> {
        let make = sqlx::query_as::<_, VehicleMake>("SELECT * FROM vehicle_makes WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(make)
    }

    async fn list(&self) -> StorageResult<Vec<VehicleMake>> {
        let makes =
            sqlx::query_as::<_, VehicleMake>("SELECT * FROM vehicle_makes ORDER BY name, id")
                .fetch_all(&self.pool)
                .await
                .map_err(DbError::from)?;

        Ok(makes)
    }

    async fn insert(&self, draft: &MakeDraft) -> StorageResult<VehicleMake> {
        debug!(name = %draft.name, "Inserting vehicle make");

        let make = sqlx::query_as::<_, VehicleMake>(
            r#"
            INSERT INTO vehicle_makes (name, country, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            RETURNING *
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.country)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(make)
    }

    async fn update(&self, id: i64, draft: &MakeDraft) -> StorageResult<VehicleMake> {
        debug!(id, "Updating vehicle make");

        let make = sqlx::query_as::<_, VehicleMake>(
            r#"
            UPDATE vehicle_makes SET name = ?2, country = ?3, updated_at = ?4
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.country)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(make.ok_or(DbError::not_found(Entity::Make, id))?)
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        self.delete_from("vehicle_makes", Entity::Make, id).await
    }
}

// =============================================================================
// Models
// =============================================================================

#[async_trait]
impl ModelStore for VehicleRepository {
    async fn get(&self, id: i64) -> StorageResult<Option<VehicleModel>> {
        let model =
            sqlx::query_as::<_, VehicleModel>("SELECT * FROM vehicle_models WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(DbError::from)?;

        Ok(model)
    }

    async fn list(&self) -> StorageResult<Vec<VehicleModel>> {
        let models =
            sqlx::query_as::<_, VehicleModel>("SELECT * FROM vehicle_models ORDER BY name, id")
                .fetch_all(&self.pool)
                .await
                .map_err(DbError::from)?;

        Ok(models)
    }

    async fn list_for_make(&self, make_id: i64) -> StorageResult<Vec<VehicleModel>> {
        let models = sqlx::query_as::<_, VehicleModel>(
            "SELECT * FROM vehicle_models WHERE make_id = ?1 ORDER BY name, id",
        )
        .bind(make_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(models)
    }

    async fn insert(&self, draft: &ModelDraft) -> StorageResult<VehicleModel> {
        debug!(make_id = draft.make_id, name = %draft.name, "Inserting vehicle model");

        let model = sqlx::query_as::<_, VehicleModel>(
            r#"
            INSERT INTO vehicle_models (make_id, name, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            RETURNING *
            "#,
        )
        .bind(draft.make_id)
        .bind(&draft.name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(model)
    }

    async fn update(&self, id: i64, draft: &ModelDraft) -> StorageResult<VehicleModel> {
        debug!(id, "Updating vehicle model");

        let model = sqlx::query_as::<_, VehicleModel>(
            r#"
            UPDATE vehicle_models SET make_id = ?2, name = ?3, updated_at = ?4
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(draft.make_id)
        .bind(&draft.name)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(model.ok_or(DbError::not_found(Entity::Model, id))?)
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        self.delete_from("vehicle_models", Entity::Model, id).await
    }
}

// =============================================================================
// Submodels
// =============================================================================

#[async_trait]
impl SubmodelStore for VehicleRepository {
    async fn get(&self, id: i64) -> StorageResult<Option<VehicleSubmodel>> {
        let submodel =
            sqlx::query_as::<_, VehicleSubmodel>("SELECT * FROM vehicle_submodels WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(DbError::from)?;

        Ok(submodel)
    }

    async fn list(&self) -> StorageResult<Vec<VehicleSubmodel>> {
        let submodels = sqlx::query_as::<_, VehicleSubmodel>(
            "SELECT * FROM vehicle_submodels ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(submodels)
    }

    async fn list_for_model(&self, model_id: i64) -> StorageResult<Vec<VehicleSubmodel>> {
        let submodels = sqlx::query_as::<_, VehicleSubmodel>(
            "SELECT * FROM vehicle_submodels WHERE model_id = ?1 ORDER BY name, id",
        )
        .bind(model_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(submodels)
    }

    async fn insert(&self, draft: &SubmodelDraft) -> StorageResult<VehicleSubmodel> {
        debug!(model_id = draft.model_id, name = %draft.name, "Inserting vehicle submodel");

        let submodel = sqlx::query_as::<_, VehicleSubmodel>(
            r#"
            INSERT INTO vehicle_submodels (
                model_id, name, year_from, year_to,
                engine_type, engine_displacement, fuel_type,
                transmission_type, body_type, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            RETURNING *
            "#,
        )
        .bind(draft.model_id)
        .bind(&draft.name)
        .bind(draft.year_from)
        .bind(draft.year_to)
        .bind(&draft.engine_type)
        .bind(draft.engine_displacement)
        .bind(&draft.fuel_type)
        .bind(&draft.transmission_type)
        .bind(&draft.body_type)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(submodel)
    }

    async fn update(&self, id: i64, draft: &SubmodelDraft) -> StorageResult<VehicleSubmodel> {
        debug!(id, "Updating vehicle submodel");

        let submodel = sqlx::query_as::<_, VehicleSubmodel>(
            r#"
            UPDATE vehicle_submodels SET
                model_id = ?2,
                name = ?3,
                year_from = ?4,
                year_to = ?5,
                engine_type = ?6,
                engine_displacement = ?7,
                fuel_type = ?8,
                transmission_type = ?9,
                body_type = ?10,
                updated_at = ?11
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(draft.model_id)
        .bind(&draft.name)
        .bind(draft.year_from)
        .bind(draft.year_to)
        .bind(&draft.engine_type)
        .bind(draft.engine_displacement)
        .bind(&draft.fuel_type)
        .bind(&draft.transmission_type)
        .bind(&draft.body_type)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(submodel.ok_or(DbError::not_found(Entity::Submodel, id))?)
    }

    /// Compatibility links of the submodel go with it.
    async fn delete(&self, id: i64) -> StorageResult<()> {
        self.delete_from("vehicle_submodels", Entity::Submodel, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::database;
    use fixparts_core::error::StorageError;

    fn submodel(model_id: i64) -> SubmodelDraft {
        SubmodelDraft {
            model_id,
            name: "LE".into(),
            year_from: 2014,
            year_to: Some(2019),
            engine_type: "I4".into(),
            engine_displacement: 1.8,
            fuel_type: "Petrol".into(),
            transmission_type: "CVT".into(),
            body_type: "Sedan".into(),
        }
    }

    #[tokio::test]
    async fn test_hierarchy_round_trip() {
        let repo = database().await.vehicles();
        let make = MakeStore::insert(&repo, &MakeDraft::new("Toyota"))
            .await
            .unwrap();
        let model = ModelStore::insert(&repo, &ModelDraft::new(make.id, "Corolla"))
            .await
            .unwrap();
        let sub = SubmodelStore::insert(&repo, &submodel(model.id))
            .await
            .unwrap();

        assert_eq!(sub.engine_displacement, 1.8);
        assert_eq!(sub.year_to, Some(2019));
        assert!(sub.covers_year(2016));

        assert_eq!(repo.list_for_make(make.id).await.unwrap().len(), 1);
        assert_eq!(repo.list_for_model(model.id).await.unwrap()[0], sub);
    }

    #[tokio::test]
    async fn test_parent_deletes_restricted() {
        let repo = database().await.vehicles();
        MakeStore::insert(&repo, &MakeDraft::new("Toyota"))
            .await
            .unwrap();
        ModelStore::insert(&repo, &ModelDraft::new(1, "Corolla"))
            .await
            .unwrap();
        SubmodelStore::insert(&repo, &submodel(1)).await.unwrap();

        let err = MakeStore::delete(&repo, 1).await.unwrap_err();
        assert!(matches!(err, StorageError::ForeignKeyViolation { .. }));
        let err = ModelStore::delete(&repo, 1).await.unwrap_err();
        assert!(matches!(err, StorageError::ForeignKeyViolation { .. }));

        SubmodelStore::delete(&repo, 1).await.unwrap();
        ModelStore::delete(&repo, 1).await.unwrap();
        MakeStore::delete(&repo, 1).await.unwrap();

        assert!(matches!(
            MakeStore::delete(&repo, 1).await.unwrap_err(),
            StorageError::NotFound {
                entity: Entity::Make,
                id: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_model_with_missing_make() {
        let repo = database().await.vehicles();
        let err = ModelStore::insert(&repo, &ModelDraft::new(7, "Civic"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ForeignKeyViolation { .. }));
    }
}
