//! # Compatibility Matcher
//!
//! Links items to the vehicle submodels they fit. The two sides live in
//! separately owned domains, so existence is checked on both before a link
//! is written:
//!
//! ```text
//!   add(item_id, submodel_id)
//!     ├── ids > 0                      → InvalidId
//!     ├── ItemService::get(item_id)    → NotFound(item)
//!     ├── SubmodelStore::get           → NotFound(submodel)
//!     ├── scan item's links            → CompatibilityExists
//!     └── insert (UNIQUE(item_id, submodel_id) → CompatibilityExists)
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use fixparts_core::error::{CoreError, CoreResult, Entity, StorageError};
use fixparts_core::storage::{CompatibilityStore, SubmodelStore};
use fixparts_core::types::{Compatibility, CompatibilityDetail, CompatibleItem};
use fixparts_core::validation::validate_id;

use crate::item::ItemService;

#[derive(Clone)]
pub struct CompatibilityService {
    store: Arc<dyn CompatibilityStore>,
    items: ItemService,
    submodels: Arc<dyn SubmodelStore>,
}

impl CompatibilityService {
    pub fn new(
        store: Arc<dyn CompatibilityStore>,
        items: ItemService,
        submodels: Arc<dyn SubmodelStore>,
    ) -> Self {
        CompatibilityService {
            store,
            items,
            submodels,
        }
    }

    /// Records that an item fits a submodel.
    pub async fn add(
        &self,
        item_id: i64,
        submodel_id: i64,
        notes: Option<&str>,
    ) -> CoreResult<Compatibility> {
        validate_id(Entity::Item, item_id)?;
        validate_id(Entity::Submodel, submodel_id)?;

        self.items.get(item_id).await?;
        if self.submodels.get(submodel_id).await?.is_none() {
            return Err(CoreError::not_found(Entity::Submodel, submodel_id));
        }

        let existing = self.store.list_for_item(item_id).await?;
        if existing.iter().any(|link| link.submodel_id == submodel_id) {
            return Err(CoreError::CompatibilityExists {
                item_id,
                submodel_id,
            });
        }

        let notes = notes.map(str::trim).filter(|n| !n.is_empty());
        debug!(item_id, submodel_id, "Adding compatibility");
        let link = self
            .store
            .insert(item_id, submodel_id, notes)
            .await
            .map_err(|e| match e {
                StorageError::UniqueViolation { .. } => CoreError::CompatibilityExists {
                    item_id,
                    submodel_id,
                },
                StorageError::ForeignKeyViolation { message } if message.contains("submodel") => {
                    CoreError::not_found(Entity::Submodel, submodel_id)
                }
                StorageError::ForeignKeyViolation { .. } => {
                    CoreError::not_found(Entity::Item, item_id)
                }
                other => other.into(),
            })?;

        info!(id = link.id, item_id, submodel_id, "Compatibility added");
        Ok(link)
    }

    /// Removes the link between an item and a submodel.
    pub async fn remove(&self, item_id: i64, submodel_id: i64) -> CoreResult<()> {
        validate_id(Entity::Item, item_id)?;
        validate_id(Entity::Submodel, submodel_id)?;

        debug!(item_id, submodel_id, "Removing compatibility");
        self.store.remove(item_id, submodel_id).await?;
        Ok(())
    }

    /// Links of one item, with make/model/submodel names.
    pub async fn list_for_item(&self, item_id: i64) -> CoreResult<Vec<CompatibilityDetail>> {
        validate_id(Entity::Item, item_id)?;
        Ok(self.store.list_for_item(item_id).await?)
    }

    /// Items that fit one submodel.
    pub async fn list_items_for_submodel(
        &self,
        submodel_id: i64,
    ) -> CoreResult<Vec<CompatibleItem>> {
        validate_id(Entity::Submodel, submodel_id)?;
        Ok(self.store.list_items_for_submodel(submodel_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::memory::MemoryStore;
    use crate::vehicle::VehicleService;
    use fixparts_core::error::ErrorKind;
    use fixparts_core::money::Money;
    use fixparts_core::types::ItemDraft;
    use fixparts_core::vehicle::{MakeDraft, ModelDraft, SubmodelDraft};

    struct Fixture {
        items: ItemService,
        vehicles: VehicleService,
        compat: CompatibilityService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let items = ItemService::new(store.clone(), &ServiceConfig::default());
        let vehicles = VehicleService::new(store.clone(), store.clone(), store.clone());
        let compat = CompatibilityService::new(store.clone(), items.clone(), store);
        Fixture {
            items,
            vehicles,
            compat,
        }
    }

    fn submodel(model_id: i64, name: &str) -> SubmodelDraft {
        SubmodelDraft {
            model_id,
            name: name.into(),
            year_from: 2014,
            year_to: Some(2019),
            engine_type: "I4".into(),
            engine_displacement: 1.8,
            fuel_type: "Petrol".into(),
            transmission_type: "CVT".into(),
            body_type: "Sedan".into(),
        }
    }

    /// Five items and nine submodels, so ids 5 and 9 exist.
    async fn populated() -> Fixture {
        let f = fixture();
        for n in 1..=5 {
            f.items
                .create(&ItemDraft::new(
                    format!("PN-{n}"),
                    format!("Part {n}"),
                    Money::from_cents(1000),
                    Money::from_cents(2000),
                ))
                .await
                .unwrap();
        }
        let make = f.vehicles.create_make(&MakeDraft::new("Toyota")).await.unwrap();
        let model = f
            .vehicles
            .create_model(&ModelDraft::new(make.id, "Corolla"))
            .await
            .unwrap();
        for n in 1..=9 {
            f.vehicles
                .create_submodel(&submodel(model.id, &format!("Trim {n}")))
                .await
                .unwrap();
        }
        f
    }

    #[tokio::test]
    async fn test_add_remove_symmetry() {
        let f = populated().await;

        f.compat.add(5, 9, None).await.unwrap();

        let err = f.compat.add(5, 9, None).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::CompatibilityExists {
                item_id: 5,
                submodel_id: 9
            }
        ));
        assert_eq!(err.kind(), ErrorKind::DuplicateConflict);

        f.compat.remove(5, 9).await.unwrap();

        let err = f.compat.remove(5, 9).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_invalid_ids() {
        let f = fixture();
        let err = f.compat.add(0, 9, None).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidId {
                entity: Entity::Item,
                ..
            }
        ));
        let err = f.compat.add(5, -1, None).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidId {
                entity: Entity::Submodel,
                ..
            }
        ));
        assert_eq!(
            f.compat.remove(0, 1).await.unwrap_err().kind(),
            ErrorKind::InvalidId
        );
    }

    #[tokio::test]
    async fn test_missing_item_or_submodel() {
        let f = populated().await;

        let err = f.compat.add(6, 1, None).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::NotFound {
                entity: Entity::Item,
                id: 6
            }
        ));

        let err = f.compat.add(1, 10, None).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::NotFound {
                entity: Entity::Submodel,
                id: 10
            }
        ));
    }

    #[tokio::test]
    async fn test_listings_carry_vehicle_names() {
        let f = populated().await;
        f.compat.add(2, 3, Some("needs spacer kit")).await.unwrap();
        f.compat.add(4, 3, None).await.unwrap();
        f.compat.add(2, 7, None).await.unwrap();

        let links = f.compat.list_for_item(2).await.unwrap();
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|l| l.make_name == "Toyota"));
        assert!(links.iter().all(|l| l.model_name == "Corolla"));
        let trim3 = links.iter().find(|l| l.submodel_id == 3).unwrap();
        assert_eq!(trim3.submodel_name, "Trim 3");
        assert_eq!(trim3.notes.as_deref(), Some("needs spacer kit"));

        let fitting = f.compat.list_items_for_submodel(3).await.unwrap();
        let parts: Vec<_> = fitting.iter().map(|c| c.item.part_number.as_str()).collect();
        assert_eq!(parts, vec!["PN-2", "PN-4"]);
        assert_eq!(fitting[0].compatibility_notes.as_deref(), Some("needs spacer kit"));
        assert_eq!(fitting[0].submodel_name, "Trim 3");
    }

    #[tokio::test]
    async fn test_item_delete_drops_links() {
        let f = populated().await;
        f.compat.add(1, 1, None).await.unwrap();
        f.items.delete(1).await.unwrap();
        assert!(f.compat.list_items_for_submodel(1).await.unwrap().is_empty());
    }
}
