//! # Category Hierarchy
//!
//! Pure functions over the flat category relation.
//!
//! ## Tree Building
//! ```text
//!   flat rows (one fetch)         grouped by parent id          forest
//!   ─────────────────────         ────────────────────          ──────
//!   1 Brakes      parent -        None → [1, 4]                 Brakes
//!   2 Pads        parent 1        1    → [2, 3]                 ├── Pads
//!   3 Rotors      parent 1        2    → []                     └── Rotors
//!   4 Filters     parent -        ...                           Filters
//! ```
//!
//! Rows whose parent chain never reaches a root (dangling parent ids, or a
//! cycle already present in storage) are not reachable and are left out.

use std::collections::{HashMap, HashSet};

use crate::types::{Category, CategoryTreeNode};
use crate::MAX_CATEGORY_DEPTH;

/// Builds the category forest in one grouping pass.
///
/// Siblings keep the order in which they appear in `categories`.
pub fn build_category_tree(categories: Vec<Category>) -> Vec<CategoryTreeNode> {
    let mut by_parent: HashMap<Option<i64>, Vec<Category>> = HashMap::new();
    for category in categories {
        by_parent.entry(category.parent_id).or_default().push(category);
    }

    let roots = by_parent.remove(&None).unwrap_or_default();
    roots
        .into_iter()
        .map(|root| attach_children(root, &mut by_parent))
        .collect()
}

fn attach_children(
    category: Category,
    by_parent: &mut HashMap<Option<i64>, Vec<Category>>,
) -> CategoryTreeNode {
    let children = by_parent
        .remove(&Some(category.id))
        .unwrap_or_default()
        .into_iter()
        .map(|child| attach_children(child, by_parent))
        .collect();

    CategoryTreeNode { category, children }
}

/// Returns true if making `new_parent_id` the parent of `category_id` would
/// close a loop in the hierarchy.
///
/// Walks up from the proposed parent; reaching `category_id` means the
/// proposed parent is the category itself or one of its descendants.
///
/// ## Example
/// ```rust
/// use fixparts_core::hierarchy::would_create_cycle;
/// use std::collections::HashMap;
///
/// // 1 ← 2 ← 3
/// let parents = HashMap::from([(1, None), (2, Some(1)), (3, Some(2))]);
///
/// assert!(would_create_cycle(&parents, 1, 3));
/// assert!(would_create_cycle(&parents, 2, 2));
/// assert!(!would_create_cycle(&parents, 3, 1));
/// ```
pub fn would_create_cycle(
    parents: &HashMap<i64, Option<i64>>,
    category_id: i64,
    new_parent_id: i64,
) -> bool {
    let mut seen = HashSet::new();
    let mut current = Some(new_parent_id);

    while let Some(id) = current {
        if id == category_id {
            return true;
        }
        // A loop not passing through category_id, or an absurd depth, can only
        // come from corrupt data; refuse to attach anything beneath it.
        if !seen.insert(id) || seen.len() > MAX_CATEGORY_DEPTH {
            return true;
        }
        current = parents.get(&id).copied().flatten();
    }

    false
}

/// Builds the `id → parent_id` map used by [`would_create_cycle`].
pub fn parent_map(categories: &[Category]) -> HashMap<i64, Option<i64>> {
    categories.iter().map(|c| (c.id, c.parent_id)).collect()
}
