//! # Vehicle Hierarchy Manager
//!
//! Make → Model → Submodel, each level pointing at an existing parent.
//!
//! ## Guards
//! | Operation            | Parent must exist | Children block delete |
//! |----------------------|-------------------|-----------------------|
//! | make create/update   | -                 | models                |
//! | model create/update  | make              | submodels             |
//! | submodel create/upd. | model             | - (links cascade)     |
//!
//! Model and submodel updates re-check the parent on every call, changed or
//! not.

use std::sync::Arc;

use tracing::{debug, info};

use fixparts_core::error::{CoreError, CoreResult, Entity, StorageError};
use fixparts_core::storage::{MakeStore, ModelStore, SubmodelStore};
use fixparts_core::validation::{
    validate_id, validate_make_draft, validate_model_draft, validate_submodel_draft,
};
use fixparts_core::vehicle::{
    MakeDraft, ModelDraft, SubmodelDraft, VehicleMake, VehicleModel, VehicleSubmodel,
};

#[derive(Clone)]
pub struct VehicleService {
    makes: Arc<dyn MakeStore>,
    models: Arc<dyn ModelStore>,
    submodels: Arc<dyn SubmodelStore>,
}

/// A parent removed between the check and the write.
fn parent_gone(err: StorageError, entity: Entity, parent_id: i64) -> CoreError {
    match err {
        StorageError::ForeignKeyViolation { .. } => CoreError::not_found(entity, parent_id),
        other => other.into(),
    }
}

/// A child added between the check and the delete.
fn still_referenced(err: StorageError, entity: Entity, id: i64) -> CoreError {
    match err {
        StorageError::ForeignKeyViolation { .. } => CoreError::Referenced { entity, id },
        other => other.into(),
    }
}

impl VehicleService {
    pub fn new(
        makes: Arc<dyn MakeStore>,
        models: Arc<dyn ModelStore>,
        submodels: Arc<dyn SubmodelStore>,
    ) -> Self {
        VehicleService {
            makes,
            models,
            submodels,
        }
    }

    // =========================================================================
    // Makes
    // =========================================================================

    pub async fn create_make(&self, draft: &MakeDraft) -> CoreResult<VehicleMake> {
        validate_make_draft(draft)?;

        debug!(name = %draft.name, "Creating vehicle make");
        let make = self.makes.insert(draft).await?;
        info!(id = make.id, name = %make.name, "Vehicle make created");
        Ok(make)
    }

    pub async fn update_make(&self, id: i64, draft: &MakeDraft) -> CoreResult<VehicleMake> {
        validate_id(Entity::Make, id)?;
        validate_make_draft(draft)?;
        self.get_make(id).await?;

        debug!(id, name = %draft.name, "Updating vehicle make");
        Ok(self.makes.update(id, draft).await?)
    }

    pub async fn delete_make(&self, id: i64) -> CoreResult<()> {
        validate_id(Entity::Make, id)?;
        self.get_make(id).await?;

        let models = self.models.list_for_make(id).await?;
        if !models.is_empty() {
            return Err(CoreError::HasDependents {
                entity: Entity::Make,
                id,
                dependent: Entity::Model,
                count: models.len(),
            });
        }

        debug!(id, "Deleting vehicle make");
        self.makes
            .delete(id)
            .await
            .map_err(|e| still_referenced(e, Entity::Make, id))?;
        info!(id, "Vehicle make deleted");
        Ok(())
    }

    pub async fn get_make(&self, id: i64) -> CoreResult<VehicleMake> {
        validate_id(Entity::Make, id)?;
        self.makes
            .get(id)
            .await?
            .ok_or(CoreError::not_found(Entity::Make, id))
    }

    pub async fn list_makes(&self) -> CoreResult<Vec<VehicleMake>> {
        Ok(self.makes.list().await?)
    }

    /// Models of one make; the make must exist.
    pub async fn models_for_make(&self, make_id: i64) -> CoreResult<Vec<VehicleModel>> {
        self.get_make(make_id).await?;
        Ok(self.models.list_for_make(make_id).await?)
    }

    // =========================================================================
    // Models
    // =========================================================================

    pub async fn create_model(&self, draft: &ModelDraft) -> CoreResult<VehicleModel> {
        validate_model_draft(draft)?;
        self.get_make(draft.make_id).await?;

        debug!(make_id = draft.make_id, name = %draft.name, "Creating vehicle model");
        let model = self
            .models
            .insert(draft)
            .await
            .map_err(|e| parent_gone(e, Entity::Make, draft.make_id))?;
        info!(id = model.id, make_id = model.make_id, name = %model.name, "Vehicle model created");
        Ok(model)
    }

    pub async fn update_model(&self, id: i64, draft: &ModelDraft) -> CoreResult<VehicleModel> {
        validate_id(Entity::Model, id)?;
        validate_model_draft(draft)?;
        self.get_model(id).await?;
        self.get_make(draft.make_id).await?;

        debug!(id, make_id = draft.make_id, "Updating vehicle model");
        self.models
            .update(id, draft)
            .await
            .map_err(|e| parent_gone(e, Entity::Make, draft.make_id))
    }

    pub async fn delete_model(&self, id: i64) -> CoreResult<()> {
        validate_id(Entity::Model, id)?;
        self.get_model(id).await?;

        let submodels = self.submodels.list_for_model(id).await?;
        if !submodels.is_empty() {
            return Err(CoreError::HasDependents {
                entity: Entity::Model,
                id,
                dependent: Entity::Submodel,
                count: submodels.len(),
            });
        }

        debug!(id, "Deleting vehicle model");
        self.models
            .delete(id)
            .await
            .map_err(|e| still_referenced(e, Entity::Model, id))?;
        info!(id, "Vehicle model deleted");
        Ok(())
    }

    pub async fn get_model(&self, id: i64) -> CoreResult<VehicleModel> {
        validate_id(Entity::Model, id)?;
        self.models
            .get(id)
            .await?
            .ok_or(CoreError::not_found(Entity::Model, id))
    }

    pub async fn list_models(&self) -> CoreResult<Vec<VehicleModel>> {
        Ok(self.models.list().await?)
    }

    /// Submodels of one model; the model must exist.
    pub async fn submodels_for_model(&self, model_id: i64) -> CoreResult<Vec<VehicleSubmodel>> {
        self.get_model(model_id).await?;
        Ok(self.submodels.list_for_model(model_id).await?)
    }

    // =========================================================================
    // Submodels
    // =========================================================================

    pub async fn create_submodel(&self, draft: &SubmodelDraft) -> CoreResult<VehicleSubmodel> {
        validate_submodel_draft(draft)?;
        self.get_model(draft.model_id).await?;

        debug!(model_id = draft.model_id, name = %draft.name, "Creating vehicle submodel");
        let submodel = self
            .submodels
            .insert(draft)
            .await
            .map_err(|e| parent_gone(e, Entity::Model, draft.model_id))?;
        info!(
            id = submodel.id,
            model_id = submodel.model_id,
            name = %submodel.name,
            "Vehicle submodel created"
        );
        Ok(submodel)
    }

    pub async fn update_submodel(
        &self,
        id: i64,
        draft: &SubmodelDraft,
    ) -> CoreResult<VehicleSubmodel> {
        validate_id(Entity::Submodel, id)?;
        validate_submodel_draft(draft)?;
        self.get_submodel(id).await?;
        self.get_model(draft.model_id).await?;

        debug!(id, model_id = draft.model_id, "Updating vehicle submodel");
        self.submodels
            .update(id, draft)
            .await
            .map_err(|e| parent_gone(e, Entity::Model, draft.model_id))
    }

    /// Deletes a submodel together with its compatibility links.
    pub async fn delete_submodel(&self, id: i64) -> CoreResult<()> {
        validate_id(Entity::Submodel, id)?;
        self.get_submodel(id).await?;

        debug!(id, "Deleting vehicle submodel");
        self.submodels.delete(id).await?;
        info!(id, "Vehicle submodel deleted");
        Ok(())
    }

    pub async fn get_submodel(&self, id: i64) -> CoreResult<VehicleSubmodel> {
        validate_id(Entity::Submodel, id)?;
        self.submodels
            .get(id)
            .await?
            .ok_or(CoreError::not_found(Entity::Submodel, id))
    }

    pub async fn list_submodels(&self) -> CoreResult<Vec<VehicleSubmodel>> {
        Ok(self.submodels.list().await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use fixparts_core::error::{ErrorKind, ValidationError};

    fn service() -> VehicleService {
        let store = Arc::new(MemoryStore::new());
        VehicleService::new(store.clone(), store.clone(), store)
    }

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
    async fn test_make_crud() {
        let svc = service();
        let make = svc.create_make(&MakeDraft::new("Toyota")).await.unwrap();
        assert_eq!(make.id, 1);

        let updated = svc
            .update_make(
                1,
                &MakeDraft {
                    name: "Toyota".into(),
                    country: Some("Japan".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.country.as_deref(), Some("Japan"));

        assert_eq!(
            svc.create_make(&MakeDraft::new("")).await.unwrap_err().kind(),
            ErrorKind::ValidationFailed
        );
        assert_eq!(
            svc.update_make(9, &MakeDraft::new("Ford"))
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            svc.update_make(0, &MakeDraft::new("Ford"))
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidId
        );

        svc.delete_make(1).await.unwrap();
        assert!(svc.list_makes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_model_requires_make() {
        let svc = service();
        let err = svc
            .create_model(&ModelDraft::new(3, "Corolla"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::NotFound {
                entity: Entity::Make,
                id: 3
            }
        ));

        svc.create_make(&MakeDraft::new("Toyota")).await.unwrap();
        svc.create_model(&ModelDraft::new(1, "Corolla"))
            .await
            .unwrap();

        let err = svc
            .update_model(1, &ModelDraft::new(2, "Corolla"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::NotFound {
                entity: Entity::Make,
                id: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_deletion_guards() {
        let svc = service();
        svc.create_make(&MakeDraft::new("Toyota")).await.unwrap();
        svc.create_model(&ModelDraft::new(1, "Corolla"))
            .await
            .unwrap();
        svc.create_submodel(&submodel(1)).await.unwrap();

        let err = svc.delete_make(1).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::HasDependents {
                entity: Entity::Make,
                dependent: Entity::Model,
                count: 1,
                ..
            }
        ));
        assert!(svc.get_make(1).await.is_ok());

        let err = svc.delete_model(1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DependencyBlocked);
        assert!(svc.get_model(1).await.is_ok());

        svc.delete_submodel(1).await.unwrap();
        svc.delete_model(1).await.unwrap();
        svc.delete_make(1).await.unwrap();
    }

    #[tokio::test]
    async fn test_submodel_year_range() {
        let svc = service();
        svc.create_make(&MakeDraft::new("Toyota")).await.unwrap();
        svc.create_model(&ModelDraft::new(1, "Corolla"))
            .await
            .unwrap();

        let mut draft = submodel(1);
        draft.year_from = 2010;
        draft.year_to = Some(2005);
        let err = svc.create_submodel(&draft).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "year_to"
        ));
        assert!(svc.list_submodels().await.unwrap().is_empty());

        draft.year_to = None;
        let created = svc.create_submodel(&draft).await.unwrap();
        assert_eq!(created.year_to, None);
    }

    #[tokio::test]
    async fn test_submodel_requires_model() {
        let svc = service();
        let err = svc.create_submodel(&submodel(4)).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::NotFound {
                entity: Entity::Model,
                id: 4
            }
        ));
    }

    #[tokio::test]
    async fn test_children_listings_require_parent() {
        let svc = service();
        assert_eq!(
            svc.models_for_make(1).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            svc.submodels_for_model(1).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );

        svc.create_make(&MakeDraft::new("Toyota")).await.unwrap();
        svc.create_model(&ModelDraft::new(1, "Yaris")).await.unwrap();
        svc.create_model(&ModelDraft::new(1, "Corolla"))
            .await
            .unwrap();
        let names: Vec<_> = svc
            .models_for_make(1)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Corolla", "Yaris"]);
    }

    #[tokio::test]
    async fn test_update_submodel() {
        let svc = service();
        svc.create_make(&MakeDraft::new("Toyota")).await.unwrap();
        svc.create_model(&ModelDraft::new(1, "Corolla"))
            .await
            .unwrap();
        svc.create_submodel(&submodel(1)).await.unwrap();

        let mut draft = submodel(1);
        draft.engine_displacement = 2.0;
        draft.year_to = Some(2022);
        let updated = svc.update_submodel(1, &draft).await.unwrap();
        assert_eq!(updated.engine_displacement, 2.0);
        assert_eq!(updated.year_to, Some(2022));

        draft.fuel_type = "".into();
        assert_eq!(
            svc.update_submodel(1, &draft).await.unwrap_err().kind(),
            ErrorKind::ValidationFailed
        );
    }
}
