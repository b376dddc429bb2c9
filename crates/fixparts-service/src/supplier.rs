//! # Supplier Registry
//!
//! Supplier names are unique. A supplier still referenced by items or
//! purchases cannot be deleted.

use std::sync::Arc;

use tracing::{debug, info};

use fixparts_core::error::{CoreError, CoreResult, Entity, StorageError};
use fixparts_core::storage::{ItemStore, SupplierStore};
use fixparts_core::types::{Supplier, SupplierDraft, SupplierFilter};
use fixparts_core::validation::{validate_id, validate_supplier_draft};

#[derive(Clone)]
pub struct SupplierService {
    store: Arc<dyn SupplierStore>,
    items: Arc<dyn ItemStore>,
}

impl SupplierService {
    pub fn new(store: Arc<dyn SupplierStore>, items: Arc<dyn ItemStore>) -> Self {
        SupplierService { store, items }
    }

    pub async fn create(&self, draft: &SupplierDraft) -> CoreResult<Supplier> {
        validate_supplier_draft(draft)?;
        let draft = normalized(draft);
        self.check_name(None, &draft.name).await?;

        debug!(name = %draft.name, "Creating supplier");
        let supplier = self
            .store
            .insert(&draft)
            .await
            .map_err(|e| translate(e, &draft))?;

        info!(id = supplier.id, name = %supplier.name, "Supplier created");
        Ok(supplier)
    }

    pub async fn update(&self, id: i64, draft: &SupplierDraft) -> CoreResult<Supplier> {
        validate_id(Entity::Supplier, id)?;
        validate_supplier_draft(draft)?;
        self.get(id).await?;

        let draft = normalized(draft);
        self.check_name(Some(id), &draft.name).await?;

        debug!(id, name = %draft.name, "Updating supplier");
        self.store
            .update(id, &draft)
            .await
            .map_err(|e| translate(e, &draft))
    }

    pub async fn delete(&self, id: i64) -> CoreResult<()> {
        validate_id(Entity::Supplier, id)?;
        self.get(id).await?;

        let count = self.items.count_for_supplier(id).await?;
        if count > 0 {
            return Err(CoreError::HasDependents {
                entity: Entity::Supplier,
                id,
                dependent: Entity::Item,
                count,
            });
        }

        debug!(id, "Deleting supplier");
        // Purchases are only caught by the store.
        self.store.delete(id).await.map_err(|e| match e {
            StorageError::ForeignKeyViolation { .. } => CoreError::Referenced {
                entity: Entity::Supplier,
                id,
            },
            other => other.into(),
        })?;

        info!(id, "Supplier deleted");
        Ok(())
    }

    pub async fn get(&self, id: i64) -> CoreResult<Supplier> {
        validate_id(Entity::Supplier, id)?;
        self.store
            .get(id)
            .await?
            .ok_or(CoreError::not_found(Entity::Supplier, id))
    }

    pub async fn find_by_name(&self, name: &str) -> CoreResult<Option<Supplier>> {
        Ok(self.store.get_by_name(name.trim()).await?)
    }

    pub async fn list(&self, filter: &SupplierFilter) -> CoreResult<Vec<Supplier>> {
        Ok(self.store.list(filter).await?)
    }

    async fn check_name(&self, exclude: Option<i64>, name: &str) -> CoreResult<()> {
        match self.store.get_by_name(name).await? {
            Some(existing) if Some(existing.id) != exclude => {
                Err(CoreError::duplicate(Entity::Supplier, "name", name))
            }
            _ => Ok(()),
        }
    }
}

fn normalized(draft: &SupplierDraft) -> SupplierDraft {
    SupplierDraft {
        name: draft.name.trim().to_string(),
        ..draft.clone()
    }
}

fn translate(err: StorageError, draft: &SupplierDraft) -> CoreError {
    match err {
        StorageError::UniqueViolation { .. } => {
            CoreError::duplicate(Entity::Supplier, "name", draft.name.as_str())
        }
        other => other.into(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use fixparts_core::error::ErrorKind;
    use fixparts_core::ledger::{PurchaseDraft, Purchases};
    use fixparts_core::money::Money;
    use fixparts_core::storage::LedgerStore;
    use fixparts_core::types::ItemDraft;
    use fixparts_core::LedgerEntry;
    use chrono::Utc;

    fn service() -> (SupplierService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (SupplierService::new(store.clone(), store.clone()), store)
    }

    #[tokio::test]
    async fn test_duplicate_name() {
        let (svc, _) = service();
        svc.create(&SupplierDraft::new("Bosch")).await.unwrap();

        let err = svc.create(&SupplierDraft::new(" Bosch ")).await.unwrap_err();
        assert!(err.is_duplicate_of("name"));
        assert_eq!(err.kind(), ErrorKind::DuplicateConflict);
        assert_eq!(svc.list(&SupplierFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_keeps_own_name() {
        let (svc, _) = service();
        svc.create(&SupplierDraft::new("Bosch")).await.unwrap();
        svc.create(&SupplierDraft::new("Denso")).await.unwrap();

        let mut draft = SupplierDraft::new("Bosch");
        draft.phone = Some("+49 711 400".into());
        let updated = svc.update(1, &draft).await.unwrap();
        assert_eq!(updated.phone.as_deref(), Some("+49 711 400"));

        let err = svc.update(2, &SupplierDraft::new("Bosch")).await.unwrap_err();
        assert!(err.is_duplicate_of("name"));
        assert_eq!(svc.get(2).await.unwrap().name, "Denso");
    }

    #[tokio::test]
    async fn test_invalid_email() {
        let (svc, _) = service();
        let mut draft = SupplierDraft::new("Bosch");
        draft.email = Some("sales.bosch.de".into());
        assert_eq!(
            svc.create(&draft).await.unwrap_err().kind(),
            ErrorKind::ValidationFailed
        );
    }

    #[tokio::test]
    async fn test_delete_blocked_by_items() {
        let (svc, store) = service();
        svc.create(&SupplierDraft::new("Bosch")).await.unwrap();

        let mut item = ItemDraft::new(
            "BP-100",
            "Brake pad set",
            Money::from_cents(1500),
            Money::from_cents(2500),
        );
        item.supplier_id = Some(1);
        item.barcode = Some("FIXED-1".into());
        ItemStore::insert(store.as_ref(), &item).await.unwrap();

        let err = svc.delete(1).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::HasDependents {
                entity: Entity::Supplier,
                dependent: Entity::Item,
                count: 1,
                ..
            }
        ));
        assert!(svc.get(1).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_blocked_by_purchases() {
        let (svc, store) = service();
        svc.create(&SupplierDraft::new("Bosch")).await.unwrap();

        let mut item = ItemDraft::new(
            "BP-100",
            "Brake pad set",
            Money::from_cents(1500),
            Money::from_cents(2500),
        );
        item.barcode = Some("FIXED-1".into());
        ItemStore::insert(store.as_ref(), &item).await.unwrap();

        let entry = LedgerEntry {
            draft: PurchaseDraft::new(1, 1, 4, Money::from_cents(1500)),
            reference: None,
            date: Utc::now(),
            total: Money::from_cents(6000),
        };
        LedgerStore::<Purchases>::insert(store.as_ref(), &entry)
            .await
            .unwrap();

        let err = svc.delete(1).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Referenced {
                entity: Entity::Supplier,
                id: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_search_and_missing() {
        let (svc, _) = service();
        let mut draft = SupplierDraft::new("Bosch");
        draft.contact_person = Some("Anke Weber".into());
        svc.create(&draft).await.unwrap();
        svc.create(&SupplierDraft::new("Denso")).await.unwrap();

        let found = svc
            .list(&SupplierFilter {
                search: Some("weber".into()),
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Bosch");

        assert!(svc.find_by_name("Denso").await.unwrap().is_some());
        assert_eq!(svc.get(9).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(svc.delete(0).await.unwrap_err().kind(), ErrorKind::InvalidId);
    }
}
