//! # Dashboard Views
//!
//! Read-only report rows assembled from items, sales and purchases. Amounts
//! stay in [`Money`] cents; nothing here is stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Maximum rows returned by each dashboard list.
pub const DASHBOARD_LIST_LIMIT: usize = 10;

/// Days of sales history ranked by [`TopSeller`].
pub const TOP_SELLER_WINDOW_DAYS: i64 = 30;

/// The four headline counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub low_stock_count: usize,
    pub today_sales: Money,
    pub inventory_count: usize,
    pub vehicle_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockItem {
    pub item_id: i64,
    pub part_number: String,
    pub item_name: String,
    pub current_stock: i64,
    pub minimum_stock: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSale {
    pub sale_id: i64,
    pub date: DateTime<Utc>,
    pub part_number: String,
    pub item_name: String,
    pub customer_name: Option<String>,
    pub total: Money,
}

/// One item's sales inside the ranking window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopSeller {
    pub item_id: i64,
    pub part_number: String,
    pub item_name: String,

    /// Number of sale records.
    pub sales: usize,

    /// Units across those records.
    pub units: i64,

    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentPurchase {
    pub purchase_id: i64,
    pub date: DateTime<Utc>,
    pub part_number: String,
    pub supplier_name: String,
    pub cost: Money,
}
