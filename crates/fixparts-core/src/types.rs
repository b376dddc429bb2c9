//! # Domain Types
//!
//! Catalogue types used throughout FixParts.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Catalogue Types                                 │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Category     │   │      Item       │   │    Supplier     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  category_id    │   │  id             │       │
//! │  │  name           │   │  supplier_id    │──►│  name (unique)  │       │
//! │  │  parent_id ─┐   │   │  part_number    │   │  contact info   │       │
//! │  └─────────────┼───┘   │  barcode        │   └─────────────────┘       │
//! │        ▲       │       └────────┬────────┘                              │
//! │        └───────┘                │ Compatibility (item, submodel)        │
//! │     parent graph                ▼                                       │
//! │     must stay acyclic    VehicleSubmodel (see `vehicle`)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Drafts and Records
//! Every entity comes in two shapes:
//! - `*Draft`: the caller-supplied fields for create/update
//! - the record itself: draft fields plus `id` and timestamps, owned by storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Category
// =============================================================================

/// A node in the category hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,

    /// `None` for root categories.
    pub parent_id: Option<i64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied category fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
}

impl CategoryDraft {
    pub fn new(name: impl Into<String>) -> Self {
        CategoryDraft {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// A category with its direct subcategories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub subcategories: Vec<Category>,
}

/// Read-only tree view derived from the flat category relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTreeNode {
    pub category: Category,

    /// Children in storage order.
    pub children: Vec<CategoryTreeNode>,
}

impl CategoryTreeNode {
    /// Number of nodes in this subtree, including itself.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(CategoryTreeNode::size).sum::<usize>()
    }
}

// =============================================================================
// Item
// =============================================================================

/// A stocked part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Item {
    pub id: i64,
    pub item_name: String,

    /// Business identifier, unique across all items.
    pub part_number: String,

    pub description: String,
    pub category_id: Option<i64>,
    pub buy_price: Money,
    pub sell_price: Money,
    pub current_stock: i64,
    pub minimum_stock: i64,

    /// Unique when present.
    pub barcode: Option<String>,

    pub supplier_id: Option<i64>,
    pub location_aisle: Option<String>,
    pub location_shelf: Option<String>,
    pub location_bin: Option<String>,
    pub weight_kg: Option<f64>,
    pub dimensions_cm: Option<String>,
    pub warranty_period: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Stock at or below the configured minimum.
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.minimum_stock
    }
}

/// Caller-supplied item fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub item_name: String,
    pub part_number: String,
    pub description: String,
    pub category_id: Option<i64>,
    pub buy_price: Money,
    pub sell_price: Money,
    pub current_stock: i64,
    pub minimum_stock: i64,

    /// Left empty to have one generated on create.
    pub barcode: Option<String>,

    pub supplier_id: Option<i64>,
    pub location_aisle: Option<String>,
    pub location_shelf: Option<String>,
    pub location_bin: Option<String>,
    pub weight_kg: Option<f64>,
    pub dimensions_cm: Option<String>,
    pub warranty_period: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub notes: Option<String>,
}

impl ItemDraft {
    /// Creates an active draft with the required fields set.
    pub fn new(
        part_number: impl Into<String>,
        description: impl Into<String>,
        buy_price: Money,
        sell_price: Money,
    ) -> Self {
        let description = description.into();
        ItemDraft {
            item_name: description.clone(),
            part_number: part_number.into(),
            description,
            category_id: None,
            buy_price,
            sell_price,
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
        }
    }

    /// The supplied barcode, treating blank text as absent.
    pub fn supplied_barcode(&self) -> Option<&str> {
        self.barcode
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
    }
}

impl From<&Item> for ItemDraft {
    fn from(item: &Item) -> Self {
        ItemDraft {
            item_name: item.item_name.clone(),
            part_number: item.part_number.clone(),
            description: item.description.clone(),
            category_id: item.category_id,
            buy_price: item.buy_price,
            sell_price: item.sell_price,
            current_stock: item.current_stock,
            minimum_stock: item.minimum_stock,
            barcode: item.barcode.clone(),
            supplier_id: item.supplier_id,
            location_aisle: item.location_aisle.clone(),
            location_shelf: item.location_shelf.clone(),
            location_bin: item.location_bin.clone(),
            weight_kg: item.weight_kg,
            dimensions_cm: item.dimensions_cm.clone(),
            warranty_period: item.warranty_period.clone(),
            image_url: item.image_url.clone(),
            is_active: item.is_active,
            notes: item.notes.clone(),
        }
    }
}

/// Item search criteria. Every set field narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFilter {
    pub category_id: Option<i64>,
    pub supplier_id: Option<i64>,

    /// Substring of the part number.
    pub part_number: Option<String>,

    /// Case-insensitive substring of name, part number or description.
    pub search: Option<String>,

    pub low_stock: Option<bool>,
    pub is_active: Option<bool>,

    /// Fitment: only items compatible with this make/model/submodel.
    pub make_id: Option<i64>,
    pub model_id: Option<i64>,
    pub submodel_id: Option<i64>,
}

impl ItemFilter {
    /// True when the filter restricts by vehicle fitment.
    pub fn has_fitment(&self) -> bool {
        self.make_id.is_some() || self.model_id.is_some() || self.submodel_id.is_some()
    }

    /// Evaluates every non-fitment criterion against an item.
    pub fn matches(&self, item: &Item) -> bool {
        if self.category_id.is_some() && item.category_id != self.category_id {
            return false;
        }
        if self.supplier_id.is_some() && item.supplier_id != self.supplier_id {
            return false;
        }
        if let Some(part) = &self.part_number {
            if !item.part_number.contains(part.as_str()) {
                return false;
            }
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let hit = item.item_name.to_lowercase().contains(&term)
                || item.part_number.to_lowercase().contains(&term)
                || item.description.to_lowercase().contains(&term);
            if !hit {
                return false;
            }
        }
        if let Some(low) = self.low_stock {
            if item.is_low_stock() != low {
                return false;
            }
        }
        if let Some(active) = self.is_active {
            if item.is_active != active {
                return false;
            }
        }
        true
    }
}

// =============================================================================
// Supplier
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    pub id: i64,

    /// Unique across suppliers.
    pub name: String,

    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub tax_id: Option<String>,
    pub payment_terms: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierDraft {
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub tax_id: Option<String>,
    pub payment_terms: Option<String>,
    pub notes: Option<String>,
}

impl SupplierDraft {
    pub fn new(name: impl Into<String>) -> Self {
        SupplierDraft {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierFilter {
    /// Case-insensitive substring of name, contact person or email.
    pub search: Option<String>,
}

impl SupplierFilter {
    pub fn matches(&self, supplier: &Supplier) -> bool {
        match &self.search {
            None => true,
            Some(term) => {
                let term = term.to_lowercase();
                let contains = |value: &Option<String>| {
                    value
                        .as_deref()
                        .is_some_and(|v| v.to_lowercase().contains(&term))
                };
                supplier.name.to_lowercase().contains(&term)
                    || contains(&supplier.contact_person)
                    || contains(&supplier.email)
            }
        }
    }
}

// =============================================================================
// Compatibility
// =============================================================================

/// Links an item to a vehicle submodel it fits.
///
/// The pair `(item_id, submodel_id)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Compatibility {
    pub id: i64,
    pub item_id: i64,
    pub submodel_id: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A compatibility link decorated with the vehicle names it resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CompatibilityDetail {
    pub id: i64,
    pub item_id: i64,
    pub submodel_id: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub make_name: String,
    pub model_name: String,
    pub submodel_name: String,
}

/// An item that fits a submodel, as returned by the reverse lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CompatibleItem {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub item: Item,

    /// Notes on the compatibility link, not the item.
    pub compatibility_notes: Option<String>,

    pub make_name: String,
    pub model_name: String,
    pub submodel_name: String,
}

// =============================================================================
// Unit Tests
// =============================================================================
