//! # Repository Module
//!
//! SQLite implementations of the `fixparts_core::storage` traits.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Manager (fixparts-service)                                             │
//! │       │  Arc<dyn ItemStore>                                             │
//! │       ▼                                                                 │
//! │  ItemRepository                                                         │
//! │  ├── get / list / get_by_part_number / get_by_barcode                   │
//! │  └── insert / update / delete                                           │
//! │       │                                                                 │
//! │       │  SQL (sqlx, runtime-checked)                                    │
//! │       ▼                                                                 │
//! │  SQLite ── UNIQUE / FOREIGN KEY failures ──► DbError ──► StorageError   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CategoryRepository`]: `CategoryStore`
//! - [`ItemRepository`]: `ItemStore`
//! - [`SupplierRepository`]: `SupplierStore`
//! - [`VehicleRepository`]: `MakeStore`, `ModelStore`, `SubmodelStore`
//! - [`CompatibilityRepository`]: `CompatibilityStore`
//! - [`SaleRepository`]: `LedgerStore<Sales>`
//! - [`PurchaseRepository`]: `LedgerStore<Purchases>`

pub mod category;
pub mod compatibility;
pub mod item;
pub mod purchase;
pub mod sale;
pub mod supplier;
pub mod vehicle;

pub use category::CategoryRepository;
pub use compatibility::CompatibilityRepository;
pub use item::ItemRepository;
pub use purchase::PurchaseRepository;
pub use sale::SaleRepository;
pub use supplier::SupplierRepository;
pub use vehicle::VehicleRepository;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::pool::{Database, DbConfig};

    /// A fresh, migrated in-memory database.
    pub async fn database() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }
}
