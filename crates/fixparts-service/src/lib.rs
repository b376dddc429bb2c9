//! # fixparts-service: Integrity Managers
//!
//! Stateless managers that enforce the rules a single storage statement
//! cannot: hierarchy shape, identity uniqueness, fitment links and ledger
//! derivations.
//!
//! ## Call Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  caller                                                                 │
//! │    │  create(draft)                                                     │
//! │    ▼                                                                    │
//! │  Manager                                                                │
//! │    ├── 1. field rules (fixparts_core::validation), no I/O               │
//! │    ├── 2. existence checks        ──► Store::get                        │
//! │    ├── 3. uniqueness / cycle pre-checks ──► Store::get_by_* / list      │
//! │    └── 4. write                   ──► Store::insert / update / delete   │
//! │              │                                                          │
//! │              └── UniqueViolation / ForeignKeyViolation translated to    │
//! │                  the same CoreError a pre-check would have returned     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation fails fast on the first violated rule and writes
//! nothing in that case.
//!
//! ## Example
//! ```rust
//! use fixparts_core::CategoryDraft;
//! use fixparts_service::{ServiceConfig, Services, Stores};
//!
//! # tokio_test_block(async {
//! let services = Services::new(Stores::in_memory(), ServiceConfig::default());
//!
//! let brakes = services.categories.create(&CategoryDraft::new("Brakes")).await.unwrap();
//! let pads = CategoryDraft::new("Pads").with_parent(brakes.id);
//! services.categories.create(&pads).await.unwrap();
//!
//! let tree = services.categories.get_tree().await.unwrap();
//! assert_eq!(tree.len(), 1);
//! assert_eq!(tree[0].children.len(), 1);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::sync::Arc;

use fixparts_core::ledger::{Purchases, Sales};
use fixparts_core::storage::{
    CategoryStore, CompatibilityStore, ItemStore, LedgerStore, MakeStore, ModelStore,
    SubmodelStore, SupplierStore,
};

pub mod category;
pub mod compatibility;
pub mod config;
pub mod dashboard;
pub mod item;
pub mod memory;
pub mod supplier;
pub mod transaction;
pub mod vehicle;

pub use category::CategoryService;
pub use compatibility::CompatibilityService;
pub use config::{ConfigError, ServiceConfig};
pub use dashboard::DashboardService;
pub use item::ItemService;
pub use memory::MemoryStore;
pub use supplier::SupplierService;
pub use transaction::{PurchaseRecorder, SaleRecorder, TransactionRecorder};
pub use vehicle::VehicleService;

// =============================================================================
// Stores
// =============================================================================

/// One handle per storage capability.
#[derive(Clone)]
pub struct Stores {
    pub categories: Arc<dyn CategoryStore>,
    pub items: Arc<dyn ItemStore>,
    pub suppliers: Arc<dyn SupplierStore>,
    pub makes: Arc<dyn MakeStore>,
    pub models: Arc<dyn ModelStore>,
    pub submodels: Arc<dyn SubmodelStore>,
    pub compatibility: Arc<dyn CompatibilityStore>,
    pub sales: Arc<dyn LedgerStore<Sales>>,
    pub purchases: Arc<dyn LedgerStore<Purchases>>,
}

impl Stores {
    /// Every capability backed by one shared [`MemoryStore`].
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Stores {
            categories: store.clone(),
            items: store.clone(),
            suppliers: store.clone(),
            makes: store.clone(),
            models: store.clone(),
            submodels: store.clone(),
            compatibility: store.clone(),
            sales: store.clone(),
            purchases: store,
        }
    }
}

// =============================================================================
// Services
// =============================================================================

/// All managers wired over one set of stores.
#[derive(Clone)]
pub struct Services {
    pub categories: CategoryService,
    pub items: ItemService,
    pub suppliers: SupplierService,
    pub vehicles: VehicleService,
    pub compatibility: CompatibilityService,
    pub sales: SaleRecorder,
    pub purchases: PurchaseRecorder,
    pub dashboard: DashboardService,
}

impl Services {
    pub fn new(stores: Stores, config: ServiceConfig) -> Self {
        let items = ItemService::new(stores.items.clone(), &config);
        let vehicles = VehicleService::new(
            stores.makes.clone(),
            stores.models.clone(),
            stores.submodels.clone(),
        );

        let dashboard = DashboardService::new(
            stores.items.clone(),
            stores.suppliers.clone(),
            stores.compatibility.clone(),
            stores.sales.clone(),
            stores.purchases.clone(),
        );

        Services {
            categories: CategoryService::new(stores.categories.clone()),
            suppliers: SupplierService::new(stores.suppliers.clone(), stores.items.clone()),
            compatibility: CompatibilityService::new(
                stores.compatibility.clone(),
                items.clone(),
                stores.submodels.clone(),
            ),
            sales: TransactionRecorder::new(
                stores.sales.clone(),
                stores.items.clone(),
                stores.suppliers.clone(),
            ),
            purchases: TransactionRecorder::new(
                stores.purchases,
                stores.items,
                stores.suppliers,
            ),
            items,
            vehicles,
            dashboard,
        }
    }
}
