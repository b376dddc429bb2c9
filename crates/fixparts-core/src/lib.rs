//! # fixparts-core: Pure Domain Logic for FixParts
//!
//! This crate holds the domain model of the parts inventory and every rule
//! that can be decided without touching storage.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        FixParts Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Presentation layer (not part of this repo)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ plain domain values                    │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    fixparts-service                             │   │
//! │  │   CategoryService, ItemService, CompatibilityService,           │   │
//! │  │   VehicleService, SupplierService, TransactionRecorder          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ fixparts-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌───────────┐ ┌─────────┐ ┌────────┐ │   │
//! │  │   │  types  │ │  money  │ │ validation│ │hierarchy│ │storage │ │   │
//! │  │   │ vehicle │ │  Money  │ │  rules    │ │  tree   │ │ traits │ │   │
//! │  │   │ ledger  │ │         │ │  barcode  │ │         │ │        │ │   │
//! │  │   └─────────┘ └─────────┘ └───────────┘ └─────────┘ └────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │ implemented by                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  fixparts-db (SQLite gateway)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Categories, items, suppliers, compatibility links
//! - [`vehicle`] - Make → Model → Submodel hierarchy
//! - [`ledger`] - Sales and purchases
//! - [`dashboard`] - Read-only report rows
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types and the failure taxonomy
//! - [`validation`] - Field-level business rules
//! - [`barcode`] - Barcode text generation
//! - [`hierarchy`] - Category tree building and cycle detection
//! - [`storage`] - Storage gateway traits consumed by the managers
//!
//! ## Example Usage
//!
//! ```rust
//! use fixparts_core::money::Money;
//!
//! let unit_price: Money = "49.99".parse().unwrap();
//! let total = unit_price.checked_multiply_quantity(3).unwrap();
//!
//! assert_eq!(total.cents(), 14997);
//! assert_eq!(total.to_string(), "$149.97");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod barcode;
pub mod dashboard;
pub mod error;
pub mod hierarchy;
pub mod ledger;
pub mod money;
pub mod storage;
pub mod types;
pub mod validation;
pub mod vehicle;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, Entity, ErrorKind, StorageError, ValidationError};
pub use ledger::*;
pub use money::Money;
pub use types::*;
pub use vehicle::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default number of attempts made to generate a barcode that does not
/// collide with an existing one.
pub const DEFAULT_BARCODE_ATTEMPTS: u32 = 5;

/// Upper bound on the parent chain walked when checking for category cycles.
///
/// A chain longer than this can only come from data that already contains a
/// cycle, which is reported as one.
pub const MAX_CATEGORY_DEPTH: usize = 256;
