//! # Item Identity Manager
//!
//! Guards the two natural keys of an item: its part number (always unique)
//! and its barcode (unique when present).
//!
//! ## Barcode Resolution on Create
//! ```text
//!   draft.barcode supplied?
//!        │
//!    yes ├──► already used? ──► Duplicate(barcode)
//!        │         no  └──────► insert
//!        │
//!     no └──► for attempt in 1..=barcode_attempts
//!                 candidate = generator.generate(category, supplier)
//!                 used?            → warn, next attempt
//!                 insert
//!                   UniqueViolation(barcode) → warn, next attempt
//!                   Ok(item)                 → done
//!             exhausted → BarcodeGenerationExhausted
//! ```
//!
//! The storage UNIQUE constraints are authoritative; the lookups before
//! each write only produce the friendlier error earlier.

use std::sync::Arc;

use tracing::{debug, info, warn};

use fixparts_core::barcode::{BarcodeGenerator, SystemBarcodeGenerator};
use fixparts_core::error::{CoreError, CoreResult, Entity, StorageError};
use fixparts_core::storage::ItemStore;
use fixparts_core::types::{Item, ItemDraft, ItemFilter};
use fixparts_core::validation::{validate_id, validate_item_draft};

use crate::config::ServiceConfig;

#[derive(Clone)]
pub struct ItemService {
    store: Arc<dyn ItemStore>,
    barcodes: Arc<dyn BarcodeGenerator>,
    barcode_attempts: u32,
}

impl ItemService {
    /// Creates the manager with the system barcode generator.
    pub fn new(store: Arc<dyn ItemStore>, config: &ServiceConfig) -> Self {
        Self::with_generator(
            store,
            Arc::new(SystemBarcodeGenerator),
            config.barcode_attempts,
        )
    }

    pub fn with_generator(
        store: Arc<dyn ItemStore>,
        barcodes: Arc<dyn BarcodeGenerator>,
        barcode_attempts: u32,
    ) -> Self {
        ItemService {
            store,
            barcodes,
            barcode_attempts: barcode_attempts.max(1),
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Validates and stores a new item, generating a barcode if none is given.
    pub async fn create(&self, draft: &ItemDraft) -> CoreResult<Item> {
        validate_item_draft(draft)?;

        let mut draft = draft.clone();
        draft.part_number = draft.part_number.trim().to_string();

        if self
            .store
            .get_by_part_number(&draft.part_number)
            .await?
            .is_some()
        {
            return Err(CoreError::duplicate(
                Entity::Item,
                "part_number",
                &draft.part_number,
            ));
        }

        if let Some(code) = draft.supplied_barcode().map(str::to_string) {
            if self.store.get_by_barcode(&code).await?.is_some() {
                return Err(CoreError::duplicate(Entity::Item, "barcode", code));
            }
            draft.barcode = Some(code);

            debug!(part_number = %draft.part_number, "Inserting item");
            let item = self
                .store
                .insert(&draft)
                .await
                .map_err(|e| translate(e, &draft))?;
            info!(id = item.id, part_number = %item.part_number, "Item created");
            return Ok(item);
        }

        for attempt in 1..=self.barcode_attempts {
            let candidate = self
                .barcodes
                .generate(draft.category_id, draft.supplier_id)?;

            if self.store.get_by_barcode(&candidate).await?.is_some() {
                warn!(attempt, barcode = %candidate, "Generated barcode already in use");
                continue;
            }
            draft.barcode = Some(candidate);

            debug!(part_number = %draft.part_number, attempt, "Inserting item with generated barcode");
            match self.store.insert(&draft).await {
                Ok(item) => {
                    info!(
                        id = item.id,
                        part_number = %item.part_number,
                        barcode = ?item.barcode,
                        "Item created"
                    );
                    return Ok(item);
                }
                Err(e) if e.violates("barcode") => {
                    warn!(attempt, "Generated barcode taken concurrently");
                }
                Err(e) => return Err(translate(e, &draft)),
            }
        }

        Err(CoreError::BarcodeGenerationExhausted {
            attempts: self.barcode_attempts,
        })
    }

    /// Replaces every field of an item.
    ///
    /// Part number and barcode are re-checked only when they change. A blank
    /// barcode clears it.
    pub async fn update(&self, id: i64, draft: &ItemDraft) -> CoreResult<Item> {
        validate_id(Entity::Item, id)?;
        validate_item_draft(draft)?;
        let existing = self.get(id).await?;

        let mut draft = draft.clone();
        draft.part_number = draft.part_number.trim().to_string();
        draft.barcode = draft.supplied_barcode().map(str::to_string);

        if draft.part_number != existing.part_number {
            if let Some(other) = self.store.get_by_part_number(&draft.part_number).await? {
                if other.id != id {
                    return Err(CoreError::duplicate(
                        Entity::Item,
                        "part_number",
                        &draft.part_number,
                    ));
                }
            }
        }

        if let Some(code) = &draft.barcode {
            if existing.barcode.as_ref() != Some(code) {
                if let Some(other) = self.store.get_by_barcode(code).await? {
                    if other.id != id {
                        return Err(CoreError::duplicate(Entity::Item, "barcode", code));
                    }
                }
            }
        }

        debug!(id, part_number = %draft.part_number, "Updating item");
        self.store
            .update(id, &draft)
            .await
            .map_err(|e| translate(e, &draft))
    }

    /// Hard-deletes an item. Its compatibility links go with it; recorded
    /// sales or purchases block the delete.
    pub async fn delete(&self, id: i64) -> CoreResult<()> {
        validate_id(Entity::Item, id)?;
        self.get(id).await?;

        debug!(id, "Deleting item");
        self.store.delete(id).await.map_err(|e| match e {
            StorageError::ForeignKeyViolation { .. } => CoreError::Referenced {
                entity: Entity::Item,
                id,
            },
            other => other.into(),
        })?;

        info!(id, "Item deleted");
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Looks an item up by id, failing with `NotFound` when absent.
    pub async fn get(&self, id: i64) -> CoreResult<Item> {
        validate_id(Entity::Item, id)?;
        self.store
            .get(id)
            .await?
            .ok_or(CoreError::not_found(Entity::Item, id))
    }

    pub async fn find_by_part_number(&self, part_number: &str) -> CoreResult<Option<Item>> {
        Ok(self.store.get_by_part_number(part_number.trim()).await?)
    }

    pub async fn find_by_barcode(&self, barcode: &str) -> CoreResult<Option<Item>> {
        Ok(self.store.get_by_barcode(barcode.trim()).await?)
    }

    pub async fn list(&self, filter: &ItemFilter) -> CoreResult<Vec<Item>> {
        Ok(self.store.list(filter).await?)
    }

    /// Items at or below their minimum stock.
    pub async fn low_stock(&self) -> CoreResult<Vec<Item>> {
        self.list(&ItemFilter {
            low_stock: Some(true),
            ..Default::default()
        })
        .await
    }
}

/// Maps a storage constraint failure to the error the pre-checks use.
fn translate(err: StorageError, draft: &ItemDraft) -> CoreError {
    if err.violates("part_number") {
        return CoreError::duplicate(Entity::Item, "part_number", &draft.part_number);
    }
    if err.violates("barcode") {
        return CoreError::duplicate(
            Entity::Item,
            "barcode",
            draft.barcode.clone().unwrap_or_default(),
        );
    }
    if let StorageError::ForeignKeyViolation { message } = &err {
        if message.contains("category_id") {
            if let Some(id) = draft.category_id {
                return CoreError::not_found(Entity::Category, id);
            }
        }
        if message.contains("supplier_id") {
            if let Some(id) = draft.supplier_id {
                return CoreError::not_found(Entity::Supplier, id);
            }
        }
    }
    err.into()
}

// =============================================================================
// Unit Tests
// =============================================================================
