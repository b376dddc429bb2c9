//! # Storage Gateway Traits
//!
//! The managers never talk to a database directly. They hold
//! `Arc<dyn ...Store>` handles to these per-entity capabilities.
//!
//! ```text
//! ┌──────────────────────┐        ┌──────────────────────────────────────┐
//! │  fixparts-service    │        │  implementations                     │
//! │                      │ uses   │                                      │
//! │  CategoryService ────┼───────►│  fixparts-db   SqliteCategoryRepo... │
//! │  ItemService     ────┼───────►│  fixparts-service::memory (tests)    │
//! │  ...                 │        │                                      │
//! └──────────────────────┘        └──────────────────────────────────────┘
//! ```
//!
//! ## Contract
//! - Lookups return `Ok(None)` for a missing row, never an error.
//! - `update`/`delete`/`remove` return [`StorageError::NotFound`] when no
//!   row was affected.
//! - Unique and foreign key violations are reported as
//!   [`StorageError::UniqueViolation`] / [`StorageError::ForeignKeyViolation`]
//!   so managers can translate them.
//! - Lists are ordered: categories, makes, models, submodels and suppliers
//!   by name; items by part number; ledger records newest first.
//!
//! [`StorageError::NotFound`]: crate::error::StorageError::NotFound
//! [`StorageError::UniqueViolation`]: crate::error::StorageError::UniqueViolation
//! [`StorageError::ForeignKeyViolation`]: crate::error::StorageError::ForeignKeyViolation

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::ledger::{LedgerEntry, TransactionKind};
use crate::types::{
    Category, CategoryDraft, Compatibility, CompatibilityDetail, CompatibleItem, Item, ItemDraft,
    ItemFilter, Supplier, SupplierDraft, SupplierFilter,
};
use crate::vehicle::{
    MakeDraft, ModelDraft, SubmodelDraft, VehicleMake, VehicleModel, VehicleSubmodel,
};

// =============================================================================
// Catalogue
// =============================================================================

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn get(&self, id: i64) -> StorageResult<Option<Category>>;

    async fn list(&self) -> StorageResult<Vec<Category>>;

    /// Direct children only.
    async fn subcategories(&self, parent_id: i64) -> StorageResult<Vec<Category>>;

    async fn insert(&self, draft: &CategoryDraft) -> StorageResult<Category>;

    async fn update(&self, id: i64, draft: &CategoryDraft) -> StorageResult<Category>;

    async fn delete(&self, id: i64) -> StorageResult<()>;
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn get(&self, id: i64) -> StorageResult<Option<Item>>;

    async fn list(&self, filter: &ItemFilter) -> StorageResult<Vec<Item>>;

    async fn get_by_part_number(&self, part_number: &str) -> StorageResult<Option<Item>>;

    async fn get_by_barcode(&self, barcode: &str) -> StorageResult<Option<Item>>;

    /// Number of items referencing the supplier.
    async fn count_for_supplier(&self, supplier_id: i64) -> StorageResult<usize>;

    /// Stores the draft as given; the barcode must already be resolved.
    async fn insert(&self, draft: &ItemDraft) -> StorageResult<Item>;

    async fn update(&self, id: i64, draft: &ItemDraft) -> StorageResult<Item>;

    async fn delete(&self, id: i64) -> StorageResult<()>;
}

#[async_trait]
pub trait SupplierStore: Send + Sync {
    async fn get(&self, id: i64) -> StorageResult<Option<Supplier>>;

    async fn list(&self, filter: &SupplierFilter) -> StorageResult<Vec<Supplier>>;

    async fn get_by_name(&self, name: &str) -> StorageResult<Option<Supplier>>;

    async fn insert(&self, draft: &SupplierDraft) -> StorageResult<Supplier>;

    async fn update(&self, id: i64, draft: &SupplierDraft) -> StorageResult<Supplier>;

    async fn delete(&self, id: i64) -> StorageResult<()>;
}

// =============================================================================
// Vehicles
// =============================================================================

#[async_trait]
pub trait MakeStore: Send + Sync {
    async fn get(&self, id: i64) -> StorageResult<Option<VehicleMake>>;

    async fn list(&self) -> StorageResult<Vec<VehicleMake>>;

    async fn insert(&self, draft: &MakeDraft) -> StorageResult<VehicleMake>;

    async fn update(&self, id: i64, draft: &MakeDraft) -> StorageResult<VehicleMake>;

    async fn delete(&self, id: i64) -> StorageResult<()>;
}

#[async_trait]
pub trait ModelStore: Send + Sync {
    async fn get(&self, id: i64) -> StorageResult<Option<VehicleModel>>;

    async fn list(&self) -> StorageResult<Vec<VehicleModel>>;

    async fn list_for_make(&self, make_id: i64) -> StorageResult<Vec<VehicleModel>>;

    async fn insert(&self, draft: &ModelDraft) -> StorageResult<VehicleModel>;

    async fn update(&self, id: i64, draft: &ModelDraft) -> StorageResult<VehicleModel>;

    async fn delete(&self, id: i64) -> StorageResult<()>;
}

#[async_trait]
pub trait SubmodelStore: Send + Sync {
    async fn get(&self, id: i64) -> StorageResult<Option<VehicleSubmodel>>;

    async fn list(&self) -> StorageResult<Vec<VehicleSubmodel>>;

    async fn list_for_model(&self, model_id: i64) -> StorageResult<Vec<VehicleSubmodel>>;

    async fn insert(&self, draft: &SubmodelDraft) -> StorageResult<VehicleSubmodel>;

    async fn update(&self, id: i64, draft: &SubmodelDraft) -> StorageResult<VehicleSubmodel>;

    async fn delete(&self, id: i64) -> StorageResult<()>;
}

// =============================================================================
// Compatibility
// =============================================================================

#[async_trait]
pub trait CompatibilityStore: Send + Sync {
    /// Links of one item, decorated with make/model/submodel names.
    async fn list_for_item(&self, item_id: i64) -> StorageResult<Vec<CompatibilityDetail>>;

    /// Items fitting one submodel, joined through the vehicle hierarchy.
    async fn list_items_for_submodel(&self, submodel_id: i64)
        -> StorageResult<Vec<CompatibleItem>>;

    async fn insert(
        &self,
        item_id: i64,
        submodel_id: i64,
        notes: Option<&str>,
    ) -> StorageResult<Compatibility>;

    async fn remove(&self, item_id: i64, submodel_id: i64) -> StorageResult<()>;

    /// Number of distinct submodels with at least one fitting item.
    async fn count_fitted_submodels(&self) -> StorageResult<usize>;
}

// =============================================================================
// Ledger
// =============================================================================

/// Storage for one ledger family, `LedgerStore<Sales>` or `LedgerStore<Purchases>`.
#[async_trait]
pub trait LedgerStore<K: TransactionKind>: Send + Sync {
    async fn get(&self, id: i64) -> StorageResult<Option<K::Record>>;

    /// Looks up by transaction number (sales) or invoice number (purchases).
    async fn get_by_reference(&self, reference: &str) -> StorageResult<Option<K::Record>>;

    async fn list(&self, filter: &K::Filter) -> StorageResult<Vec<K::Record>>;

    async fn insert(&self, entry: &LedgerEntry<K::Draft>) -> StorageResult<K::Record>;

    async fn update(&self, id: i64, entry: &LedgerEntry<K::Draft>) -> StorageResult<K::Record>;

    async fn delete(&self, id: i64) -> StorageResult<()>;
}
