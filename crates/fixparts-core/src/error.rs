//! # Error Types
//!
//! Domain-specific error types for fixparts-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  fixparts-core errors (this file)                                      │
//! │  ├── CoreError        - Every failure a manager operation can return   │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── StorageError     - What a storage gateway reports                 │
//! │                                                                         │
//! │  fixparts-db errors (separate crate)                                   │
//! │  └── DbError          - sqlx failures, classified, → StorageError      │
//! │                                                                         │
//! │  Flow: DbError → StorageError → CoreError → caller                     │
//! │        ValidationError ───────→ CoreError → caller                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Taxonomy
//! Callers branch on [`CoreError::kind`], never on message text:
//!
//! | Kind                | Meaning                                        |
//! |---------------------|------------------------------------------------|
//! | `NotFound`          | target id does not resolve                     |
//! | `InvalidId`         | supplied identifier is non-positive            |
//! | `ValidationFailed`  | field empty, non-positive or out of domain     |
//! | `DuplicateConflict` | uniqueness (or self-parenting) would break     |
//! | `DependencyBlocked` | delete refused while dependents exist          |
//! | `StorageFailure`    | the gateway itself failed; opaque, no retry    |

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Entity
// =============================================================================

/// The entity families known to the core, used to give errors context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Category,
    Item,
    Supplier,
    Make,
    Model,
    Submodel,
    Compatibility,
    Sale,
    Purchase,
}

impl Entity {
    /// Lowercase display name ("submodel", "purchase", ...).
    pub fn name(&self) -> &'static str {
        match self {
            Entity::Category => "category",
            Entity::Item => "item",
            Entity::Supplier => "supplier",
            Entity::Make => "make",
            Entity::Model => "model",
            Entity::Submodel => "submodel",
            Entity::Compatibility => "compatibility",
            Entity::Sale => "sale",
            Entity::Purchase => "purchase",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    InvalidId,
    ValidationFailed,
    DuplicateConflict,
    DependencyBlocked,
    StorageFailure,
}

impl ErrorKind {
    /// Whether the caller can fix the input and try again.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ErrorKind::StorageFailure)
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Every failure a manager operation can return.
///
/// Each variant carries the entity, field or id that caused it so the caller
/// can render a precise message without parsing text.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Target id does not resolve in storage.
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: i64 },

    /// A category names a parent that does not exist.
    #[error("parent category not found: {parent_id}")]
    ParentNotFound { parent_id: i64 },

    /// A supplied identifier is zero or negative.
    #[error("invalid {entity} id: {id}")]
    InvalidId { entity: Entity, id: i64 },

    /// Validation error (wraps ValidationError).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A natural key is already taken.
    ///
    /// ## When This Occurs
    /// - Part number or barcode already used by another item
    /// - Invoice number / transaction number already recorded
    /// - Supplier name already registered
    #[error("{entity} {field} '{value}' already exists")]
    Duplicate {
        entity: Entity,
        field: String,
        value: String,
    },

    /// Setting the parent would make a category its own ancestor.
    #[error("category {category_id} cannot have {parent_id} as parent: circular reference")]
    CircularReference { category_id: i64, parent_id: i64 },

    /// The item is already linked to the submodel.
    #[error("item {item_id} is already compatible with submodel {submodel_id}")]
    CompatibilityExists { item_id: i64, submodel_id: i64 },

    /// Every generated barcode collided with an existing one.
    #[error("could not generate a unique barcode after {attempts} attempts")]
    BarcodeGenerationExhausted { attempts: u32 },

    /// Delete refused while dependent records exist.
    ///
    /// ## When This Occurs
    /// - Category with subcategories
    /// - Make with models, model with submodels
    /// - Supplier with items
    #[error("cannot delete {entity} {id}: {count} dependent {dependent} record(s) exist")]
    HasDependents {
        entity: Entity,
        id: i64,
        dependent: Entity,
        count: usize,
    },

    /// Delete refused by storage because other records still reference the
    /// target (an item with recorded sales or purchases).
    #[error("cannot delete {entity} {id}: still referenced by other records")]
    Referenced { entity: Entity, id: i64 },

    /// The OS random source could not be read.
    #[error("entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    /// The storage gateway failed.
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl CoreError {
    /// Creates a NotFound error.
    pub fn not_found(entity: Entity, id: i64) -> Self {
        CoreError::NotFound { entity, id }
    }

    /// Creates an InvalidId error.
    pub fn invalid_id(entity: Entity, id: i64) -> Self {
        CoreError::InvalidId { entity, id }
    }

    /// Creates a Duplicate error.
    pub fn duplicate(entity: Entity, field: impl Into<String>, value: impl Into<String>) -> Self {
        CoreError::Duplicate {
            entity,
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns the taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } | CoreError::ParentNotFound { .. } => ErrorKind::NotFound,
            CoreError::InvalidId { .. } => ErrorKind::InvalidId,
            CoreError::Validation(_) => ErrorKind::ValidationFailed,
            CoreError::Duplicate { .. }
            | CoreError::CircularReference { .. }
            | CoreError::CompatibilityExists { .. }
            | CoreError::BarcodeGenerationExhausted { .. } => ErrorKind::DuplicateConflict,
            CoreError::HasDependents { .. } | CoreError::Referenced { .. } => {
                ErrorKind::DependencyBlocked
            }
            CoreError::Storage(StorageError::NotFound { .. }) => ErrorKind::NotFound,
            CoreError::Storage(_) | CoreError::EntropyUnavailable(_) => ErrorKind::StorageFailure,
        }
    }

    /// Returns true if this is a duplicate error on the given field.
    pub fn is_duplicate_of(&self, field: &str) -> bool {
        matches!(self, CoreError::Duplicate { field: f, .. } if f == field)
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet requirements and are raised
/// before any storage call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be greater than 0")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Date lies after the current time.
    #[error("{field} cannot be in the future")]
    InFuture { field: String },

    /// Two related values are inconsistent.
    #[error("{field} is out of range: {reason}")]
    OutOfRange { field: String, reason: String },

    /// Invalid format (e.g. money with three decimals).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// The offending field name.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::Negative { field }
            | ValidationError::InFuture { field }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

// =============================================================================
// Storage Error
// =============================================================================

/// Failures reported by a storage gateway.
///
/// Gateways classify their native errors into these variants so the managers
/// can translate constraint violations into domain conflicts.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Update or delete matched no row.
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: i64 },

    /// A unique constraint rejected the write.
    ///
    /// `constraint` names the columns, e.g. `items.barcode`.
    #[error("unique constraint failed: {constraint}")]
    UniqueViolation { constraint: String },

    /// A foreign key constraint rejected the write.
    #[error("foreign key constraint failed: {message}")]
    ForeignKeyViolation { message: String },

    /// Anything else: connectivity, pool exhaustion, malformed SQL.
    #[error("{0}")]
    Backend(String),
}

impl StorageError {
    /// Returns true if this is a unique violation that involves `column`.
    pub fn violates(&self, column: &str) -> bool {
        match self {
            StorageError::UniqueViolation { constraint } => constraint
                .split(',')
                .map(|c| c.trim())
                .any(|c| c == column || c.rsplit('.').next() == Some(column)),
            _ => false,
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience type alias for storage gateway results.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Unit Tests
// =============================================================================
