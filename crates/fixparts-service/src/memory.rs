//! # In-Memory Store
//!
//! A process-local implementation of every storage trait, used by the
//! manager tests and by anyone embedding the managers without a database.
//!
//! It enforces the same constraints the SQLite schema declares so the
//! managers see identical failures from both:
//!
//! | Constraint                                   | On violation         |
//! |----------------------------------------------|----------------------|
//! | `items.part_number`, `items.barcode` unique  | `UniqueViolation`    |
//! | `suppliers.name` unique                      | `UniqueViolation`    |
//! | `(item_id, submodel_id)` unique              | `UniqueViolation`    |
//! | `sales.transaction_number` unique            | `UniqueViolation`    |
//! | `purchases.invoice_number` unique            | `UniqueViolation`    |
//! | referenced parent rows exist                 | `ForeignKeyViolation`|
//! | delete of a still-referenced row             | `ForeignKeyViolation`|
//!
//! Deleting an item or submodel cascades to its compatibility links, and
//! deleting a category clears `category_id` on its items.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use fixparts_core::error::{Entity, StorageError, StorageResult};
use fixparts_core::ledger::{
    LedgerEntry, Purchase, PurchaseDraft, Purchases, Sale, SaleDraft, Sales, TransactionKind,
};
use fixparts_core::storage::{
    CategoryStore, CompatibilityStore, ItemStore, LedgerStore, MakeStore, ModelStore,
    SubmodelStore, SupplierStore,
};
use fixparts_core::types::{
    Category, CategoryDraft, Compatibility, CompatibilityDetail, CompatibleItem, Item, ItemDraft,
    ItemFilter, Supplier, SupplierDraft, SupplierFilter,
};
use fixparts_core::vehicle::{
    MakeDraft, ModelDraft, SubmodelDraft, VehicleMake, VehicleModel, VehicleSubmodel,
};

// =============================================================================
// Tables
// =============================================================================

/// Rows keyed by id with an autoincrement counter.
#[derive(Debug)]
struct Table<T> {
    entity: Entity,
    rows: BTreeMap<i64, T>,
    last_id: i64,
}

impl<T: Clone> Table<T> {
    fn new(entity: Entity) -> Self {
        Table {
            entity,
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }

    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn get(&self, id: i64) -> Option<T> {
        self.rows.get(&id).cloned()
    }

    fn contains(&self, id: i64) -> bool {
        self.rows.contains_key(&id)
    }

    fn get_mut(&mut self, id: i64) -> StorageResult<&mut T> {
        let entity = self.entity;
        self.rows
            .get_mut(&id)
            .ok_or(StorageError::NotFound { entity, id })
    }

    fn remove(&mut self, id: i64) -> StorageResult<T> {
        self.rows.remove(&id).ok_or(StorageError::NotFound {
            entity: self.entity,
            id,
        })
    }

    fn values(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }
}

#[derive(Debug)]
struct State {
    categories: Table<Category>,
    items: Table<Item>,
    suppliers: Table<Supplier>,
    makes: Table<VehicleMake>,
    models: Table<VehicleModel>,
    submodels: Table<VehicleSubmodel>,
    compatibility: Table<Compatibility>,
    sales: Table<Sale>,
    purchases: Table<Purchase>,
}

impl Default for State {
    fn default() -> Self {
        State {
            categories: Table::new(Entity::Category),
            items: Table::new(Entity::Item),
            suppliers: Table::new(Entity::Supplier),
            makes: Table::new(Entity::Make),
            models: Table::new(Entity::Model),
            submodels: Table::new(Entity::Submodel),
            compatibility: Table::new(Entity::Compatibility),
            sales: Table::new(Entity::Sale),
            purchases: Table::new(Entity::Purchase),
        }
    }
}

fn unique(constraint: &str) -> StorageError {
    StorageError::UniqueViolation {
        constraint: constraint.to_string(),
    }
}

fn foreign_key(message: impl Into<String>) -> StorageError {
    StorageError::ForeignKeyViolation {
        message: message.into(),
    }
}

impl State {
    fn check_item(&self, id: Option<i64>, draft: &ItemDraft) -> StorageResult<()> {
        let others = || self.items.values().filter(|i| Some(i.id) != id);

        if others().any(|i| i.part_number == draft.part_number) {
            return Err(unique("items.part_number"));
        }
        if let Some(barcode) = &draft.barcode {
            if others().any(|i| i.barcode.as_ref() == Some(barcode)) {
                return Err(unique("items.barcode"));
            }
        }
        if let Some(category_id) = draft.category_id {
            if !self.categories.contains(category_id) {
                return Err(foreign_key("items.category_id"));
            }
        }
        if let Some(supplier_id) = draft.supplier_id {
            if !self.suppliers.contains(supplier_id) {
                return Err(foreign_key("items.supplier_id"));
            }
        }
        Ok(())
    }

    fn check_supplier(&self, id: Option<i64>, draft: &SupplierDraft) -> StorageResult<()> {
        if self
            .suppliers
            .values()
            .any(|s| Some(s.id) != id && s.name == draft.name)
        {
            return Err(unique("suppliers.name"));
        }
        Ok(())
    }

    /// Resolves make/model/submodel names for a submodel id.
    fn vehicle_names(&self, submodel_id: i64) -> Option<(String, String, String)> {
        let submodel = self.submodels.rows.get(&submodel_id)?;
        let model = self.models.rows.get(&submodel.model_id)?;
        let make = self.makes.rows.get(&model.make_id)?;
        Some((make.name.clone(), model.name.clone(), submodel.name.clone()))
    }

    fn fits(&self, item_id: i64, filter: &ItemFilter) -> bool {
        self.compatibility
            .values()
            .filter(|c| c.item_id == item_id)
            .any(|c| {
                let Some(submodel) = self.submodels.rows.get(&c.submodel_id) else {
                    return false;
                };
                let Some(model) = self.models.rows.get(&submodel.model_id) else {
                    return false;
                };
                filter.submodel_id.map_or(true, |id| id == submodel.id)
                    && filter.model_id.map_or(true, |id| id == model.id)
                    && filter.make_id.map_or(true, |id| id == model.make_id)
            })
    }
}

// =============================================================================
// Memory Store
// =============================================================================

/// Every storage trait over one mutex-guarded state.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".to_string()))
    }
}

fn sorted_by_name<T>(mut rows: Vec<T>, name: impl Fn(&T) -> &str) -> Vec<T> {
    rows.sort_by(|a, b| name(a).cmp(name(b)));
    rows
}

// -----------------------------------------------------------------------------
// Categories
// -----------------------------------------------------------------------------

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn get(&self, id: i64) -> StorageResult<Option<Category>> {
        Ok(self.lock()?.categories.get(id))
    }

    async fn list(&self) -> StorageResult<Vec<Category>> {
        let state = self.lock()?;
        Ok(sorted_by_name(
            state.categories.values().cloned().collect(),
            |c| &c.name,
        ))
    }

    async fn subcategories(&self, parent_id: i64) -> StorageResult<Vec<Category>> {
        let state = self.lock()?;
        Ok(sorted_by_name(
            state
                .categories
                .values()
                .filter(|c| c.parent_id == Some(parent_id))
                .cloned()
                .collect(),
            |c| &c.name,
        ))
    }

    async fn insert(&self, draft: &CategoryDraft) -> StorageResult<Category> {
        let mut state = self.lock()?;
        if let Some(parent_id) = draft.parent_id {
            if !state.categories.contains(parent_id) {
                return Err(foreign_key("categories.parent_id"));
            }
        }

        let now = Utc::now();
        let category = Category {
            id: state.categories.next_id(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            parent_id: draft.parent_id,
            created_at: now,
            updated_at: now,
        };
        state.categories.rows.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update(&self, id: i64, draft: &CategoryDraft) -> StorageResult<Category> {
        let mut state = self.lock()?;
        if let Some(parent_id) = draft.parent_id {
            if !state.categories.contains(parent_id) {
                return Err(foreign_key("categories.parent_id"));
            }
        }

        let category = state.categories.get_mut(id)?;
        category.name = draft.name.clone();
        category.description = draft.description.clone();
        category.parent_id = draft.parent_id;
        category.updated_at = Utc::now();
        Ok(category.clone())
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        let mut state = self.lock()?;
        if state.categories.values().any(|c| c.parent_id == Some(id)) {
            return Err(foreign_key("categories.parent_id"));
        }
        state.categories.remove(id)?;

        for item in state.items.rows.values_mut() {
            if item.category_id == Some(id) {
                item.category_id = None;
            }
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Items
// -----------------------------------------------------------------------------

fn apply_item_draft(item: &mut Item, draft: &ItemDraft) {
    item.item_name = draft.item_name.clone();
    item.part_number = draft.part_number.clone();
    item.description = draft.description.clone();
    item.category_id = draft.category_id;
    item.buy_price = draft.buy_price;
    item.sell_price = draft.sell_price;
    item.current_stock = draft.current_stock;
    item.minimum_stock = draft.minimum_stock;
    item.barcode = draft.barcode.clone();
    item.supplier_id = draft.supplier_id;
    item.location_aisle = draft.location_aisle.clone();
    item.location_shelf = draft.location_shelf.clone();
    item.location_bin = draft.location_bin.clone();
    item.weight_kg = draft.weight_kg;
    item.dimensions_cm = draft.dimensions_cm.clone();
    item.warranty_period = draft.warranty_period.clone();
    item.image_url = draft.image_url.clone();
    item.is_active = draft.is_active;
    item.notes = draft.notes.clone();
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn get(&self, id: i64) -> StorageResult<Option<Item>> {
        Ok(self.lock()?.items.get(id))
    }

    async fn list(&self, filter: &ItemFilter) -> StorageResult<Vec<Item>> {
        let state = self.lock()?;
        let mut items: Vec<Item> = state
            .items
            .values()
            .filter(|i| filter.matches(i))
            .filter(|i| !filter.has_fitment() || state.fits(i.id, filter))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.part_number.cmp(&b.part_number));
        Ok(items)
    }

    async fn get_by_part_number(&self, part_number: &str) -> StorageResult<Option<Item>> {
        let state = self.lock()?;
        let found = state
            .items
            .values()
            .find(|i| i.part_number == part_number)
            .cloned();
        Ok(found)
    }

    async fn get_by_barcode(&self, barcode: &str) -> StorageResult<Option<Item>> {
        let state = self.lock()?;
        let found = state
            .items
            .values()
            .find(|i| i.barcode.as_deref() == Some(barcode))
            .cloned();
        Ok(found)
    }

    async fn count_for_supplier(&self, supplier_id: i64) -> StorageResult<usize> {
        let state = self.lock()?;
        Ok(state
            .items
            .values()
            .filter(|i| i.supplier_id == Some(supplier_id))
            .count())
    }

    async fn insert(&self, draft: &ItemDraft) -> StorageResult<Item> {
        let mut state = self.lock()?;
        state.check_item(None, draft)?;

        let now = Utc::now();
        let mut item = Item {
            id: state.items.next_id(),
            item_name: String::new(),
            part_number: String::new(),
            description: String::new(),
            category_id: None,
            buy_price: draft.buy_price,
            sell_price: draft.sell_price,
            current_stock: 0,
            minimum_stock: 0,
            barcode: None,
            supplier_id: None,
            location_aisle: None,
            location_shelf: None,
            location_bin: None,
            weight_kg: None,
            dimensions_cm: None,
            warranty_period: None,
            image_url: None,
            is_active: true,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        apply_item_draft(&mut item, draft);
        state.items.rows.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update(&self, id: i64, draft: &ItemDraft) -> StorageResult<Item> {
        let mut state = self.lock()?;
        state.items.get_mut(id)?;
        state.check_item(Some(id), draft)?;

        let item = state.items.get_mut(id)?;
        apply_item_draft(item, draft);
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        let mut state = self.lock()?;
        if state.sales.values().any(|s| s.item_id == id)
            || state.purchases.values().any(|p| p.item_id == id)
        {
            return Err(foreign_key("items.id referenced by sales/purchases"));
        }
        state.items.remove(id)?;
        state.compatibility.rows.retain(|_, c| c.item_id != id);
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Suppliers
// -----------------------------------------------------------------------------

#[async_trait]
impl SupplierStore for MemoryStore {
    async fn get(&self, id: i64) -> StorageResult<Option<Supplier>> {
        Ok(self.lock()?.suppliers.get(id))
    }

    async fn list(&self, filter: &SupplierFilter) -> StorageResult<Vec<Supplier>> {
        let state = self.lock()?;
        Ok(sorted_by_name(
            state
                .suppliers
                .values()
                .filter(|s| filter.matches(s))
                .cloned()
                .collect(),
            |s| &s.name,
        ))
    }

    async fn get_by_name(&self, name: &str) -> StorageResult<Option<Supplier>> {
        let state = self.lock()?;
        let found = state.suppliers.values().find(|s| s.name == name).cloned();
        Ok(found)
    }

    async fn insert(&self, draft: &SupplierDraft) -> StorageResult<Supplier> {
        let mut state = self.lock()?;
        state.check_supplier(None, draft)?;

        let now = Utc::now();
        let supplier = Supplier {
            id: state.suppliers.next_id(),
            name: draft.name.clone(),
            contact_person: draft.contact_person.clone(),
            phone: draft.phone.clone(),
            email: draft.email.clone(),
            address: draft.address.clone(),
            tax_id: draft.tax_id.clone(),
            payment_terms: draft.payment_terms.clone(),
            notes: draft.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        state.suppliers.rows.insert(supplier.id, supplier.clone());
        Ok(supplier)
    }

    async fn update(&self, id: i64, draft: &SupplierDraft) -> StorageResult<Supplier> {
        let mut state = self.lock()?;
        state.suppliers.get_mut(id)?;
        state.check_supplier(Some(id), draft)?;

        let supplier = state.suppliers.get_mut(id)?;
        supplier.name = draft.name.clone();
        supplier.contact_person = draft.contact_person.clone();
        supplier.phone = draft.phone.clone();
        supplier.email = draft.email.clone();
        supplier.address = draft.address.clone();
        supplier.tax_id = draft.tax_id.clone();
        supplier.payment_terms = draft.payment_terms.clone();
        supplier.notes = draft.notes.clone();
        supplier.updated_at = Utc::now();
        Ok(supplier.clone())
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        let mut state = self.lock()?;
        if state.items.values().any(|i| i.supplier_id == Some(id))
            || state.purchases.values().any(|p| p.supplier_id == id)
        {
            return Err(foreign_key("suppliers.id referenced by items/purchases"));
        }
        state.suppliers.remove(id)?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Vehicles
// -----------------------------------------------------------------------------

#[async_trait]
impl MakeStore for MemoryStore {
    async fn get(&self, id: i64) -> StorageResult<Option<VehicleMake>> {
        Ok(self.lock()?.makes.get(id))
    }

    async fn list(&self) -> StorageResult<Vec<VehicleMake>> {
        let state = self.lock()?;
        Ok(sorted_by_name(state.makes.values().cloned().collect(), |m| {
            &m.name
        }))
    }

    async fn insert(&self, draft: &MakeDraft) -> StorageResult<VehicleMake> {
        let mut state = self.lock()?;
        let now = Utc::now();
        let make = VehicleMake {
            id: state.makes.next_id(),
            name: draft.name.clone(),
            country: draft.country.clone(),
            created_at: now,
            updated_at: now,
        };
        state.makes.rows.insert(make.id, make.clone());
        Ok(make)
    }

    async fn update(&self, id: i64, draft: &MakeDraft) -> StorageResult<VehicleMake> {
        let mut state = self.lock()?;
        let make = state.makes.get_mut(id)?;
        make.name = draft.name.clone();
        make.country = draft.country.clone();
        make.updated_at = Utc::now();
        Ok(make.clone())
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        let mut state = self.lock()?;
        if state.models.values().any(|m| m.make_id == id) {
            return Err(foreign_key("vehicle_models.make_id"));
        }
        state.makes.remove(id)?;
        Ok(())
    }
}

#[async_trait]
impl ModelStore for MemoryStore {
    async fn get(&self, id: i64) -> StorageResult<Option<VehicleModel>> {
        Ok(self.lock()?.models.get(id))
    }

    async fn list(&self) -> StorageResult<Vec<VehicleModel>> {
        let state = self.lock()?;
        Ok(sorted_by_name(state.models.values().cloned().collect(), |m| {
            &m.name
        }))
    }

    async fn list_for_make(&self, make_id: i64) -> StorageResult<Vec<VehicleModel>> {
        let state = self.lock()?;
        Ok(sorted_by_name(
            state
                .models
                .values()
                .filter(|m| m.make_id == make_id)
                .cloned()
                .collect(),
            |m| &m.name,
        ))
    }

    async fn insert(&self, draft: &ModelDraft) -> StorageResult<VehicleModel> {
        let mut state = self.lock()?;
        if !state.makes.contains(draft.make_id) {
            return Err(foreign_key("vehicle_models.make_id"));
        }
        let now = Utc::now();
        let model = VehicleModel {
            id: state.models.next_id(),
            make_id: draft.make_id,
            name: draft.name.clone(),
            created_at: now,
            updated_at: now,
        };
        state.models.rows.insert(model.id, model.clone());
        Ok(model)
    }

    async fn update(&self, id: i64, draft: &ModelDraft) -> StorageResult<VehicleModel> {
        let mut state = self.lock()?;
        if !state.makes.contains(draft.make_id) {
            return Err(foreign_key("vehicle_models.make_id"));
        }
        let model = state.models.get_mut(id)?;
        model.make_id = draft.make_id;
        model.name = draft.name.clone();
        model.updated_at = Utc::now();
        Ok(model.clone())
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        let mut state = self.lock()?;
        if state.submodels.values().any(|s| s.model_id == id) {
            return Err(foreign_key("vehicle_submodels.model_id"));
        }
        state.models.remove(id)?;
        Ok(())
    }
}

fn apply_submodel_draft(submodel: &mut VehicleSubmodel, draft: &SubmodelDraft) {
    submodel.model_id = draft.model_id;
    submodel.name = draft.name.clone();
    submodel.year_from = draft.year_from;
    submodel.year_to = draft.year_to;
    submodel.engine_type = draft.engine_type.clone();
    submodel.engine_displacement = draft.engine_displacement;
    submodel.fuel_type = draft.fuel_type.clone();
    submodel.transmission_type = draft.transmission_type.clone();
    submodel.body_type = draft.body_type.clone();
}

#[async_trait]
impl SubmodelStore for MemoryStore {
    async fn get(&self, id: i64) -> StorageResult<Option<VehicleSubmodel>> {
        Ok(self.lock()?.submodels.get(id))
    }

    async fn list(&self) -> StorageResult<Vec<VehicleSubmodel>> {
        let state = self.lock()?;
        Ok(sorted_by_name(
            state.submodels.values().cloned().collect(),
            |s| &s.name,
        ))
    }

    async fn list_for_model(&self, model_id: i64) -> StorageResult<Vec<VehicleSubmodel>> {
        let state = self.lock()?;
        Ok(sorted_by_name(
            state
                .submodels
                .values()
                .filter(|s| s.model_id == model_id)
                .cloned()
                .collect(),
            |s| &s.name,
        ))
    }

    async fn insert(&self, draft: &SubmodelDraft) -> StorageResult<VehicleSubmodel> {
        let mut state = self.lock()?;
        if !state.models.contains(draft.model_id) {
            return Err(foreign_key("vehicle_submodels.model_id"));
        }
        let now = Utc::now();
        let mut submodel = VehicleSubmodel {
            id: state.submodels.next_id(),
            model_id: draft.model_id,
            name: String::new(),
            year_from: draft.year_from,
            year_to: None,
            engine_type: String::new(),
            engine_displacement: draft.engine_displacement,
            fuel_type: String::new(),
            transmission_type: String::new(),
            body_type: String::new(),
            created_at: now,
            updated_at: now,
        };
        apply_submodel_draft(&mut submodel, draft);
        state.submodels.rows.insert(submodel.id, submodel.clone());
        Ok(submodel)
    }

    async fn update(&self, id: i64, draft: &SubmodelDraft) -> StorageResult<VehicleSubmodel> {
        let mut state = self.lock()?;
        if !state.models.contains(draft.model_id) {
            return Err(foreign_key("vehicle_submodels.model_id"));
        }
        let submodel = state.submodels.get_mut(id)?;
        apply_submodel_draft(submodel, draft);
        submodel.updated_at = Utc::now();
        Ok(submodel.clone())
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        let mut state = self.lock()?;
        state.submodels.remove(id)?;
        state.compatibility.rows.retain(|_, c| c.submodel_id != id);
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Compatibility
// -----------------------------------------------------------------------------

#[async_trait]
impl CompatibilityStore for MemoryStore {
    async fn list_for_item(&self, item_id: i64) -> StorageResult<Vec<CompatibilityDetail>> {
        let state = self.lock()?;
        let mut links: Vec<CompatibilityDetail> = state
            .compatibility
            .values()
            .filter(|c| c.item_id == item_id)
            .filter_map(|c| {
                let (make_name, model_name, submodel_name) = state.vehicle_names(c.submodel_id)?;
                Some(CompatibilityDetail {
                    id: c.id,
                    item_id: c.item_id,
                    submodel_id: c.submodel_id,
                    notes: c.notes.clone(),
                    created_at: c.created_at,
                    make_name,
                    model_name,
                    submodel_name,
                })
            })
            .collect();
        links.sort_by(|a, b| {
            (&a.make_name, &a.model_name, &a.submodel_name).cmp(&(
                &b.make_name,
                &b.model_name,
                &b.submodel_name,
            ))
        });
        Ok(links)
    }

    async fn list_items_for_submodel(
        &self,
        submodel_id: i64,
    ) -> StorageResult<Vec<CompatibleItem>> {
        let state = self.lock()?;
        let Some((make_name, model_name, submodel_name)) = state.vehicle_names(submodel_id) else {
            return Ok(Vec::new());
        };

        let mut items: Vec<CompatibleItem> = state
            .compatibility
            .values()
            .filter(|c| c.submodel_id == submodel_id)
            .filter_map(|c| {
                Some(CompatibleItem {
                    item: state.items.get(c.item_id)?,
                    compatibility_notes: c.notes.clone(),
                    make_name: make_name.clone(),
                    model_name: model_name.clone(),
                    submodel_name: submodel_name.clone(),
                })
            })
            .collect();
        items.sort_by(|a, b| a.item.part_number.cmp(&b.item.part_number));
        Ok(items)
    }

    async fn insert(
        &self,
        item_id: i64,
        submodel_id: i64,
        notes: Option<&str>,
    ) -> StorageResult<Compatibility> {
        let mut state = self.lock()?;
        if !state.items.contains(item_id) {
            return Err(foreign_key("compatibility.item_id"));
        }
        if !state.submodels.contains(submodel_id) {
            return Err(foreign_key("compatibility.submodel_id"));
        }
        if state
            .compatibility
            .values()
            .any(|c| c.item_id == item_id && c.submodel_id == submodel_id)
        {
            return Err(unique(
                "compatibility.item_id, compatibility.submodel_id",
            ));
        }

        let link = Compatibility {
            id: state.compatibility.next_id(),
            item_id,
            submodel_id,
            notes: notes.map(str::to_string),
            created_at: Utc::now(),
        };
        state.compatibility.rows.insert(link.id, link.clone());
        Ok(link)
    }

    async fn count_fitted_submodels(&self) -> StorageResult<usize> {
        let state = self.lock()?;
        let fitted: BTreeSet<i64> = state
            .compatibility
            .values()
            .map(|c| c.submodel_id)
            .collect();
        Ok(fitted.len())
    }

    async fn remove(&self, item_id: i64, submodel_id: i64) -> StorageResult<()> {
        let mut state = self.lock()?;
        let id = state
            .compatibility
            .values()
            .find(|c| c.item_id == item_id && c.submodel_id == submodel_id)
            .map(|c| c.id)
            .ok_or(StorageError::NotFound {
                entity: Entity::Compatibility,
                id: 0,
            })?;
        state.compatibility.remove(id)?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Ledger
// -----------------------------------------------------------------------------

fn newest_first<K: TransactionKind>(
    mut records: Vec<K::Record>,
    date: impl Fn(&K::Record) -> chrono::DateTime<Utc>,
) -> Vec<K::Record> {
    records.sort_by(|a, b| {
        date(b)
            .cmp(&date(a))
            .then_with(|| K::record_id(b).cmp(&K::record_id(a)))
    });
    records
}

fn apply_sale_entry(sale: &mut Sale, entry: &LedgerEntry<SaleDraft>) {
    let draft = &entry.draft;
    sale.date = entry.date;
    sale.item_id = draft.item_id;
    sale.quantity = draft.quantity;
    sale.price_per_unit = draft.price_per_unit;
    sale.total_price = entry.total;
    sale.transaction_number = entry.reference.clone();
    sale.customer_name = draft.customer_name.clone();
    sale.customer_phone = draft.customer_phone.clone();
    sale.customer_email = draft.customer_email.clone();
    sale.sold_by = draft.sold_by.clone();
    sale.notes = draft.notes.clone();
}

impl State {
    fn check_sale(&self, id: Option<i64>, entry: &LedgerEntry<SaleDraft>) -> StorageResult<()> {
        if !self.items.contains(entry.draft.item_id) {
            return Err(foreign_key("sales.item_id"));
        }
        if let Some(reference) = &entry.reference {
            if self
                .sales
                .values()
                .any(|s| Some(s.id) != id && s.transaction_number.as_ref() == Some(reference))
            {
                return Err(unique("sales.transaction_number"));
            }
        }
        Ok(())
    }

    fn check_purchase(
        &self,
        id: Option<i64>,
        entry: &LedgerEntry<PurchaseDraft>,
    ) -> StorageResult<()> {
        if !self.items.contains(entry.draft.item_id) {
            return Err(foreign_key("purchases.item_id"));
        }
        if !self.suppliers.contains(entry.draft.supplier_id) {
            return Err(foreign_key("purchases.supplier_id"));
        }
        if let Some(reference) = &entry.reference {
            if self
                .purchases
                .values()
                .any(|p| Some(p.id) != id && p.invoice_number.as_ref() == Some(reference))
            {
                return Err(unique("purchases.invoice_number"));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore<Sales> for MemoryStore {
    async fn get(&self, id: i64) -> StorageResult<Option<Sale>> {
        Ok(self.lock()?.sales.get(id))
    }

    async fn get_by_reference(&self, reference: &str) -> StorageResult<Option<Sale>> {
        let state = self.lock()?;
        let found = state
            .sales
            .values()
            .find(|s| s.transaction_number.as_deref() == Some(reference))
            .cloned();
        Ok(found)
    }

    async fn list(&self, filter: &<Sales as TransactionKind>::Filter) -> StorageResult<Vec<Sale>> {
        let state = self.lock()?;
        let sales = state
            .sales
            .values()
            .filter(|s| Sales::matches(filter, s))
            .cloned()
            .collect();
        Ok(newest_first::<Sales>(sales, |s| s.date))
    }

    async fn insert(&self, entry: &LedgerEntry<SaleDraft>) -> StorageResult<Sale> {
        let mut state = self.lock()?;
        state.check_sale(None, entry)?;

        let now = Utc::now();
        let mut sale = Sale {
            id: state.sales.next_id(),
            date: entry.date,
            item_id: entry.draft.item_id,
            quantity: entry.draft.quantity,
            price_per_unit: entry.draft.price_per_unit,
            total_price: entry.total,
            transaction_number: None,
            customer_name: None,
            customer_phone: None,
            customer_email: None,
            sold_by: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        apply_sale_entry(&mut sale, entry);
        state.sales.rows.insert(sale.id, sale.clone());
        Ok(sale)
    }

    async fn update(&self, id: i64, entry: &LedgerEntry<SaleDraft>) -> StorageResult<Sale> {
        let mut state = self.lock()?;
        state.sales.get_mut(id)?;
        state.check_sale(Some(id), entry)?;

        let sale = state.sales.get_mut(id)?;
        apply_sale_entry(sale, entry);
        sale.updated_at = Utc::now();
        Ok(sale.clone())
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        self.lock()?.sales.remove(id)?;
        Ok(())
    }
}

fn apply_purchase_entry(purchase: &mut Purchase, entry: &LedgerEntry<PurchaseDraft>) {
    let draft = &entry.draft;
    purchase.date = entry.date;
    purchase.supplier_id = draft.supplier_id;
    purchase.item_id = draft.item_id;
    purchase.quantity = draft.quantity;
    purchase.cost_per_unit = draft.cost_per_unit;
    purchase.total_cost = entry.total;
    purchase.invoice_number = entry.reference.clone();
    purchase.received_by = draft.received_by.clone();
    purchase.notes = draft.notes.clone();
}

#[async_trait]
impl LedgerStore<Purchases> for MemoryStore {
    async fn get(&self, id: i64) -> StorageResult<Option<Purchase>> {
        Ok(self.lock()?.purchases.get(id))
    }

    async fn get_by_reference(&self, reference: &str) -> StorageResult<Option<Purchase>> {
        let state = self.lock()?;
        let found = state
            .purchases
            .values()
            .find(|p| p.invoice_number.as_deref() == Some(reference))
            .cloned();
        Ok(found)
    }

    async fn list(
        &self,
        filter: &<Purchases as TransactionKind>::Filter,
    ) -> StorageResult<Vec<Purchase>> {
        let state = self.lock()?;
        let purchases = state
            .purchases
            .values()
            .filter(|p| Purchases::matches(filter, p))
            .cloned()
            .collect();
        Ok(newest_first::<Purchases>(purchases, |p| p.date))
    }

    async fn insert(&self, entry: &LedgerEntry<PurchaseDraft>) -> StorageResult<Purchase> {
        let mut state = self.lock()?;
        state.check_purchase(None, entry)?;

        let now = Utc::now();
        let mut purchase = Purchase {
            id: state.purchases.next_id(),
            date: entry.date,
            supplier_id: entry.draft.supplier_id,
            item_id: entry.draft.item_id,
            quantity: entry.draft.quantity,
            cost_per_unit: entry.draft.cost_per_unit,
            total_cost: entry.total,
            invoice_number: None,
            received_by: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        apply_purchase_entry(&mut purchase, entry);
        state.purchases.rows.insert(purchase.id, purchase.clone());
        Ok(purchase)
    }

    async fn update(
        &self,
        id: i64,
        entry: &LedgerEntry<PurchaseDraft>,
    ) -> StorageResult<Purchase> {
        let mut state = self.lock()?;
        state.purchases.get_mut(id)?;
        state.check_purchase(Some(id), entry)?;

        let purchase = state.purchases.get_mut(id)?;
        apply_purchase_entry(purchase, entry);
        purchase.updated_at = Utc::now();
        Ok(purchase.clone())
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        self.lock()?.purchases.remove(id)?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
