//! # Category Hierarchy Manager
//!
//! Keeps the category parent graph a forest.
//!
//! ## Rules
//! ```text
//! create(draft)      parent, if set, must exist          → ParentNotFound
//! update(id, draft)  category must exist                 → NotFound
//!                    parent, if set, must exist          → ParentNotFound
//!                    parent must not be the category or
//!                    any of its descendants              → CircularReference
//! delete(id)         category must exist                 → NotFound
//!                    no direct subcategories             → HasDependents
//! get_tree()         one fetch, one grouping pass        → forest
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use fixparts_core::error::{CoreError, CoreResult, Entity, StorageError};
use fixparts_core::hierarchy::{build_category_tree, parent_map, would_create_cycle};
use fixparts_core::storage::CategoryStore;
use fixparts_core::types::{Category, CategoryDetail, CategoryDraft, CategoryTreeNode};
use fixparts_core::validation::{validate_category_draft, validate_id};

#[derive(Clone)]
pub struct CategoryService {
    store: Arc<dyn CategoryStore>,
}

impl CategoryService {
    pub fn new(store: Arc<dyn CategoryStore>) -> Self {
        CategoryService { store }
    }

    /// Creates a category, returning the stored record (with its new id).
    pub async fn create(&self, draft: &CategoryDraft) -> CoreResult<Category> {
        validate_category_draft(draft)?;

        if let Some(parent_id) = draft.parent_id {
            self.require_parent(parent_id).await?;
        }

        debug!(name = %draft.name, parent_id = ?draft.parent_id, "Creating category");
        let category = self
            .store
            .insert(draft)
            .await
            .map_err(|e| parent_violation(e, draft))?;

        info!(id = category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Renames and/or reparents a category.
    ///
    /// The whole ancestor chain of the proposed parent is checked, so
    /// `A → B → A` is rejected as well as direct self-parenting.
    pub async fn update(&self, id: i64, draft: &CategoryDraft) -> CoreResult<Category> {
        validate_id(Entity::Category, id)?;
        validate_category_draft(draft)?;
        self.require(id).await?;

        if let Some(parent_id) = draft.parent_id {
            if parent_id == id {
                return Err(CoreError::CircularReference {
                    category_id: id,
                    parent_id,
                });
            }
            self.require_parent(parent_id).await?;

            let all = self.store.list().await?;
            if would_create_cycle(&parent_map(&all), id, parent_id) {
                return Err(CoreError::CircularReference {
                    category_id: id,
                    parent_id,
                });
            }
        }

        debug!(id, parent_id = ?draft.parent_id, "Updating category");
        let category = self
            .store
            .update(id, draft)
            .await
            .map_err(|e| parent_violation(e, draft))?;
        Ok(category)
    }

    /// Deletes a leaf category.
    pub async fn delete(&self, id: i64) -> CoreResult<()> {
        validate_id(Entity::Category, id)?;
        self.require(id).await?;

        let children = self.store.subcategories(id).await?;
        if !children.is_empty() {
            return Err(CoreError::HasDependents {
                entity: Entity::Category,
                id,
                dependent: Entity::Category,
                count: children.len(),
            });
        }

        debug!(id, "Deleting category");
        self.store.delete(id).await.map_err(|e| match e {
            StorageError::ForeignKeyViolation { .. } => CoreError::Referenced {
                entity: Entity::Category,
                id,
            },
            other => other.into(),
        })?;

        info!(id, "Category deleted");
        Ok(())
    }

    /// A category together with its direct subcategories.
    pub async fn get(&self, id: i64) -> CoreResult<CategoryDetail> {
        validate_id(Entity::Category, id)?;
        let category = self.require(id).await?;
        let subcategories = self.store.subcategories(id).await?;
        Ok(CategoryDetail {
            category,
            subcategories,
        })
    }

    pub async fn list(&self) -> CoreResult<Vec<Category>> {
        Ok(self.store.list().await?)
    }

    pub async fn subcategories(&self, parent_id: i64) -> CoreResult<Vec<Category>> {
        validate_id(Entity::Category, parent_id)?;
        self.require(parent_id).await?;
        Ok(self.store.subcategories(parent_id).await?)
    }

    /// The full category forest.
    pub async fn get_tree(&self) -> CoreResult<Vec<CategoryTreeNode>> {
        let categories = self.store.list().await?;
        let total = categories.len();
        let tree = build_category_tree(categories);
        debug!(categories = total, roots = tree.len(), "Built category tree");
        Ok(tree)
    }

    async fn require(&self, id: i64) -> CoreResult<Category> {
        self.store
            .get(id)
            .await?
            .ok_or(CoreError::not_found(Entity::Category, id))
    }

    async fn require_parent(&self, parent_id: i64) -> CoreResult<()> {
        match self.store.get(parent_id).await? {
            Some(_) => Ok(()),
            None => Err(CoreError::ParentNotFound { parent_id }),
        }
    }
}

/// A parent deleted between the check and the write shows up as a foreign
/// key failure.
fn parent_violation(err: StorageError, draft: &CategoryDraft) -> CoreError {
    match (err, draft.parent_id) {
        (StorageError::ForeignKeyViolation { .. }, Some(parent_id)) => {
            CoreError::ParentNotFound { parent_id }
        }
        (other, _) => other.into(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
