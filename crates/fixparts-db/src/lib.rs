//! # fixparts-db: SQLite Storage Gateway
//!
//! Implements the `fixparts_core::storage` traits against SQLite using sqlx.
//! The managers in `fixparts-service` never see SQL; they receive the
//! repositories as trait objects through [`Database::stores`].
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        FixParts Data Flow                               │
//! │                                                                         │
//! │  Manager call (ItemService::create)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   fixparts-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │ (repository/)  │   │  (embedded)  │   │   │
//! │  │   │               │    │                │   │              │   │   │
//! │  │   │ SqlitePool    │◄───│ ItemRepository │   │ 001_initial  │   │   │
//! │  │   │ Stores wiring │    │ SaleRepository │   │ _schema.sql  │   │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (FIXPARTS_DATABASE_PATH)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types and constraint classification
//! - [`repository`] - One repository per storage trait
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fixparts_db::{Database, DbConfig};
//! use fixparts_service::{ServiceConfig, Services};
//!
//! let db = Database::new(DbConfig::from_env()?).await?;
//! let services = Services::new(db.stores(), ServiceConfig::from_env()?);
//!
//! let low = services.items.low_stock().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    CategoryRepository, CompatibilityRepository, ItemRepository, PurchaseRepository,
    SaleRepository, SupplierRepository, VehicleRepository,
};
