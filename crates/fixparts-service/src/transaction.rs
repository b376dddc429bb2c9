//! # Transaction Recorder
//!
//! One recorder per ledger family: [`SaleRecorder`] and [`PurchaseRecorder`]
//! are the same pipeline specialised by [`TransactionKind`].
//!
//! ## Write Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │ 1. line rules        ids > 0, qty > 0, unit price > 0, date <= now      │
//! │ 2. references        item exists, supplier exists (purchases)           │
//! │ 3. reference number  unique among its kind unless it is this record's  │
//! │ 4. derive            total = qty × unit price, date = now if unset      │
//! │ 5. write             LedgerStore::insert / update                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The total is always recomputed; no caller-supplied total is accepted.
//! Neither sales nor purchases move `current_stock`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use fixparts_core::error::{CoreError, CoreResult, Entity, StorageError};
use fixparts_core::ledger::{
    LedgerEntry, Purchase, PurchaseFilter, Purchases, Sale, SaleFilter, Sales, TransactionKind,
};
use fixparts_core::storage::{ItemStore, LedgerStore, SupplierStore};
use fixparts_core::validation::{compute_total, validate_id, validate_transaction_line};

pub type SaleRecorder = TransactionRecorder<Sales>;
pub type PurchaseRecorder = TransactionRecorder<Purchases>;

pub struct TransactionRecorder<K: TransactionKind> {
    store: Arc<dyn LedgerStore<K>>,
    items: Arc<dyn ItemStore>,
    suppliers: Arc<dyn SupplierStore>,
}

// Derive would demand `K: Clone`.
impl<K: TransactionKind> Clone for TransactionRecorder<K> {
    fn clone(&self) -> Self {
        TransactionRecorder {
            store: self.store.clone(),
            items: self.items.clone(),
            suppliers: self.suppliers.clone(),
        }
    }
}

impl<K: TransactionKind> TransactionRecorder<K> {
    pub fn new(
        store: Arc<dyn LedgerStore<K>>,
        items: Arc<dyn ItemStore>,
        suppliers: Arc<dyn SupplierStore>,
    ) -> Self {
        TransactionRecorder {
            store,
            items,
            suppliers,
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub async fn create(&self, draft: &K::Draft) -> CoreResult<K::Record> {
        let entry = self.resolve(None, draft).await?;

        debug!(
            entity = K::ENTITY.name(),
            item_id = K::line(draft).item_id,
            total = %entry.total,
            "Recording transaction"
        );
        let record = self
            .store
            .insert(&entry)
            .await
            .map_err(|e| translate::<K>(e, &entry))?;

        info!(
            entity = K::ENTITY.name(),
            id = K::record_id(&record),
            total = %entry.total,
            "Transaction recorded"
        );
        Ok(record)
    }

    /// Replaces a record; the total is derived again from the new line.
    pub async fn update(&self, id: i64, draft: &K::Draft) -> CoreResult<K::Record> {
        self.get(id).await?;
        let entry = self.resolve(Some(id), draft).await?;

        debug!(entity = K::ENTITY.name(), id, total = %entry.total, "Updating transaction");
        self.store
            .update(id, &entry)
            .await
            .map_err(|e| translate::<K>(e, &entry))
    }

    pub async fn delete(&self, id: i64) -> CoreResult<()> {
        validate_id(K::ENTITY, id)?;
        self.get(id).await?;

        self.store.delete(id).await?;
        info!(entity = K::ENTITY.name(), id, "Transaction deleted");
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get(&self, id: i64) -> CoreResult<K::Record> {
        validate_id(K::ENTITY, id)?;
        self.store
            .get(id)
            .await?
            .ok_or(CoreError::not_found(K::ENTITY, id))
    }

    /// Looks up by transaction number (sales) or invoice number (purchases).
    pub async fn get_by_reference(&self, reference: &str) -> CoreResult<Option<K::Record>> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Ok(None);
        }
        Ok(self.store.get_by_reference(reference).await?)
    }

    pub async fn list(&self, filter: &K::Filter) -> CoreResult<Vec<K::Record>> {
        Ok(self.store.list(filter).await?)
    }

    pub async fn list_for_item(&self, item_id: i64) -> CoreResult<Vec<K::Record>> {
        validate_id(Entity::Item, item_id)?;
        Ok(self.store.list(&K::item_filter(item_id)).await?)
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    /// Runs every rule and derives the write-time values.
    async fn resolve(
        &self,
        exclude: Option<i64>,
        draft: &K::Draft,
    ) -> CoreResult<LedgerEntry<K::Draft>> {
        let now = Utc::now();
        let line = K::line(draft);
        validate_transaction_line(&line, now)?;

        if self.items.get(line.item_id).await?.is_none() {
            return Err(CoreError::not_found(Entity::Item, line.item_id));
        }
        if let Some(supplier_id) = line.supplier_id {
            if self.suppliers.get(supplier_id).await?.is_none() {
                return Err(CoreError::not_found(Entity::Supplier, supplier_id));
            }
        }

        let reference = K::reference(draft).map(str::to_string);
        if let Some(reference) = &reference {
            if let Some(existing) = self.store.get_by_reference(reference).await? {
                if Some(K::record_id(&existing)) != exclude {
                    return Err(CoreError::duplicate(
                        K::ENTITY,
                        K::REFERENCE_FIELD,
                        reference.as_str(),
                    ));
                }
            }
        }

        let total = compute_total(line.quantity, line.unit_price)?;

        Ok(LedgerEntry {
            draft: draft.clone(),
            reference,
            date: line.date.unwrap_or(now),
            total,
        })
    }
}

fn translate<K: TransactionKind>(err: StorageError, entry: &LedgerEntry<K::Draft>) -> CoreError {
    let line = K::line(&entry.draft);
    match err {
        StorageError::UniqueViolation { .. } => CoreError::duplicate(
            K::ENTITY,
            K::REFERENCE_FIELD,
            entry.reference.as_deref().unwrap_or_default(),
        ),
        StorageError::ForeignKeyViolation { message } if message.contains("supplier_id") => {
            CoreError::not_found(Entity::Supplier, line.supplier_id.unwrap_or_default())
        }
        StorageError::ForeignKeyViolation { .. } => {
            CoreError::not_found(Entity::Item, line.item_id)
        }
        other => other.into(),
    }
}

// =============================================================================
// Family-specific Reads
// =============================================================================

impl TransactionRecorder<Sales> {
    /// Sales to the customer with this email address.
    pub async fn list_for_customer(&self, email: &str) -> CoreResult<Vec<Sale>> {
        let filter = SaleFilter {
            customer_email: Some(email.trim().to_string()),
            ..Default::default()
        };
        self.list(&filter).await
    }
}

impl TransactionRecorder<Purchases> {
    pub async fn list_for_supplier(&self, supplier_id: i64) -> CoreResult<Vec<Purchase>> {
        validate_id(Entity::Supplier, supplier_id)?;
        let filter = PurchaseFilter {
            supplier_id: Some(supplier_id),
            ..Default::default()
        };
        self.list(&filter).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
