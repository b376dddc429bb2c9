//! # Dashboard
//!
//! Read-only figures over items, sales and purchases. Nothing here writes.
//!
//! Sales and purchases are joined to their item (and supplier) by id; a row
//! whose item is gone is left out. Money is summed in cents with
//! [`Money::checked_add`], so an overflowing total is reported instead of
//! wrapping.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tracing::debug;

use fixparts_core::dashboard::{
    DashboardSummary, LowStockItem, RecentPurchase, RecentSale, TopSeller, DASHBOARD_LIST_LIMIT,
    TOP_SELLER_WINDOW_DAYS,
};
use fixparts_core::error::{CoreError, CoreResult, ValidationError};
use fixparts_core::ledger::{PurchaseFilter, Purchases, SaleFilter, Sales};
use fixparts_core::money::Money;
use fixparts_core::storage::{CompatibilityStore, ItemStore, LedgerStore, SupplierStore};
use fixparts_core::types::{Item, ItemFilter, SupplierFilter};

#[derive(Clone)]
pub struct DashboardService {
    items: Arc<dyn ItemStore>,
    suppliers: Arc<dyn SupplierStore>,
    compatibility: Arc<dyn CompatibilityStore>,
    sales: Arc<dyn LedgerStore<Sales>>,
    purchases: Arc<dyn LedgerStore<Purchases>>,
}

impl DashboardService {
    pub fn new(
        items: Arc<dyn ItemStore>,
        suppliers: Arc<dyn SupplierStore>,
        compatibility: Arc<dyn CompatibilityStore>,
        sales: Arc<dyn LedgerStore<Sales>>,
        purchases: Arc<dyn LedgerStore<Purchases>>,
    ) -> Self {
        DashboardService {
            items,
            suppliers,
            compatibility,
            sales,
            purchases,
        }
    }

    // -------------------------------------------------------------------------
    // Counters
    // -------------------------------------------------------------------------

    pub async fn summary(&self) -> CoreResult<DashboardSummary> {
        self.summary_at(Utc::now()).await
    }

    /// Counters with "today" taken from `now`.
    pub async fn summary_at(&self, now: DateTime<Utc>) -> CoreResult<DashboardSummary> {
        Ok(DashboardSummary {
            low_stock_count: self.low_stock_count().await?,
            today_sales: self.today_sales_at(now).await?,
            inventory_count: self.inventory_count().await?,
            vehicle_count: self.vehicle_count().await?,
        })
    }

    /// Items, active or not, at or below their minimum stock.
    pub async fn low_stock_count(&self) -> CoreResult<usize> {
        Ok(self.items.list(&low_stock_filter()).await?.len())
    }

    pub async fn today_sales(&self) -> CoreResult<Money> {
        self.today_sales_at(Utc::now()).await
    }

    /// Sum of sale totals dated on the UTC day containing `now`.
    pub async fn today_sales_at(&self, now: DateTime<Utc>) -> CoreResult<Money> {
        let start = start_of_day(now);
        let filter = SaleFilter {
            start_date: Some(start),
            end_date: Some(start + Duration::days(1) - Duration::microseconds(1)),
            ..SaleFilter::default()
        };

        let sales = self.sales.list(&filter).await?;
        let total = sum(sales.iter().map(|s| s.total_price), "today_sales")?;
        debug!(day = %start.date_naive(), count = sales.len(), %total, "Summed today's sales");
        Ok(total)
    }

    /// Active items in the catalogue.
    pub async fn inventory_count(&self) -> CoreResult<usize> {
        let filter = ItemFilter {
            is_active: Some(true),
            ..ItemFilter::default()
        };
        Ok(self.items.list(&filter).await?.len())
    }

    /// Submodels with at least one fitting item.
    pub async fn vehicle_count(&self) -> CoreResult<usize> {
        Ok(self.compatibility.count_fitted_submodels().await?)
    }

    // -------------------------------------------------------------------------
    // Lists
    // -------------------------------------------------------------------------

    /// Lowest stock first, ties by part number.
    pub async fn low_stock_items(&self) -> CoreResult<Vec<LowStockItem>> {
        let mut items = self.items.list(&low_stock_filter()).await?;
        items.sort_by(|a, b| {
            a.current_stock
                .cmp(&b.current_stock)
                .then_with(|| a.part_number.cmp(&b.part_number))
        });

        Ok(items
            .into_iter()
            .take(DASHBOARD_LIST_LIMIT)
            .map(|i| LowStockItem {
                item_id: i.id,
                part_number: i.part_number,
                item_name: i.item_name,
                current_stock: i.current_stock,
                minimum_stock: i.minimum_stock,
            })
            .collect())
    }

    /// Newest sales by date.
    pub async fn recent_sales(&self) -> CoreResult<Vec<RecentSale>> {
        let sales = self.sales.list(&SaleFilter::default()).await?;
        let items = self.items_by_id().await?;

        Ok(sales
            .into_iter()
            .filter_map(|s| {
                let item = items.get(&s.item_id)?;
                Some(RecentSale {
                    sale_id: s.id,
                    date: s.date,
                    part_number: item.part_number.clone(),
                    item_name: item.item_name.clone(),
                    customer_name: s.customer_name,
                    total: s.total_price,
                })
            })
            .take(DASHBOARD_LIST_LIMIT)
            .collect())
    }

    pub async fn top_sellers(&self) -> CoreResult<Vec<TopSeller>> {
        self.top_sellers_at(Utc::now()).await
    }

    /// Items ranked by number of sales dated from the start of the window
    /// through `now`. Ties go to revenue, then part number.
    pub async fn top_sellers_at(&self, now: DateTime<Utc>) -> CoreResult<Vec<TopSeller>> {
        let filter = SaleFilter {
            start_date: Some(start_of_day(now) - Duration::days(TOP_SELLER_WINDOW_DAYS)),
            end_date: Some(now),
            ..SaleFilter::default()
        };
        let sales = self.sales.list(&filter).await?;
        let items = self.items_by_id().await?;

        let mut ranked: BTreeMap<i64, TopSeller> = BTreeMap::new();
        for sale in sales {
            let Some(item) = items.get(&sale.item_id) else {
                continue;
            };
            let entry = ranked.entry(item.id).or_insert_with(|| TopSeller {
                item_id: item.id,
                part_number: item.part_number.clone(),
                item_name: item.item_name.clone(),
                sales: 0,
                units: 0,
                revenue: Money::zero(),
            });
            entry.sales += 1;
            entry.units = entry.units.saturating_add(sale.quantity);
            entry.revenue = entry
                .revenue
                .checked_add(sale.total_price)
                .ok_or_else(|| overflow("revenue"))?;
        }

        let mut ranked: Vec<TopSeller> = ranked.into_values().collect();
        ranked.sort_by(|a, b| {
            b.sales
                .cmp(&a.sales)
                .then_with(|| b.revenue.cmp(&a.revenue))
                .then_with(|| a.part_number.cmp(&b.part_number))
        });
        ranked.truncate(DASHBOARD_LIST_LIMIT);
        Ok(ranked)
    }

    /// Newest purchases by date.
    pub async fn recent_purchases(&self) -> CoreResult<Vec<RecentPurchase>> {
        let purchases = self.purchases.list(&PurchaseFilter::default()).await?;
        let items = self.items_by_id().await?;
        let suppliers: BTreeMap<i64, String> = self
            .suppliers
            .list(&SupplierFilter::default())
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();

        Ok(purchases
            .into_iter()
            .filter_map(|p| {
                let item = items.get(&p.item_id)?;
                let supplier_name = suppliers.get(&p.supplier_id)?;
                Some(RecentPurchase {
                    purchase_id: p.id,
                    date: p.date,
                    part_number: item.part_number.clone(),
                    supplier_name: supplier_name.clone(),
                    cost: p.total_cost,
                })
            })
            .take(DASHBOARD_LIST_LIMIT)
            .collect())
    }

    async fn items_by_id(&self) -> CoreResult<BTreeMap<i64, Item>> {
        Ok(self
            .items
            .list(&ItemFilter::default())
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect())
    }
}

fn low_stock_filter() -> ItemFilter {
    ItemFilter {
        low_stock: Some(true),
        ..ItemFilter::default()
    }
}

fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_time(NaiveTime::MIN).and_utc()
}

fn sum(mut amounts: impl Iterator<Item = Money>, field: &str) -> CoreResult<Money> {
    amounts.try_fold(Money::zero(), |acc, m| {
        acc.checked_add(m).ok_or_else(|| overflow(field))
    })
}

fn overflow(field: &str) -> CoreError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        reason: "sum exceeds the representable amount".to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::TimeZone;
    use fixparts_core::error::ErrorKind;
    use fixparts_core::ledger::{LedgerEntry, PurchaseDraft, SaleDraft};
    use fixparts_core::storage::{MakeStore, ModelStore, SubmodelStore};
    use fixparts_core::types::{ItemDraft, SupplierDraft};
    use fixparts_core::vehicle::{MakeDraft, ModelDraft, SubmodelDraft};

    fn dashboard(store: &Arc<MemoryStore>) -> DashboardService {
        DashboardService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        )
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    async fn item(store: &MemoryStore, part: &str, current: i64, minimum: i64) -> Item {
        let mut draft = ItemDraft::new(
            part,
            format!("Part {part}"),
            Money::from_cents(100),
            Money::from_cents(250),
        );
        draft.current_stock = current;
        draft.minimum_stock = minimum;
        ItemStore::insert(store, &draft).await.unwrap()
    }

    async fn sell(
        store: &MemoryStore,
        item_id: i64,
        quantity: i64,
        cents: i64,
        date: DateTime<Utc>,
    ) {
        let draft = SaleDraft::new(item_id, quantity, Money::from_cents(cents));
        let entry = LedgerEntry {
            draft,
            reference: None,
            date,
            total: Money::from_cents(cents * quantity),
        };
        LedgerStore::<Sales>::insert(store, &entry).await.unwrap();
    }

    #[tokio::test]
    async fn test_today_sales_cover_one_utc_day() {
        let store = Arc::new(MemoryStore::new());
        let pads = item(&store, "BP-1", 10, 2).await;

        sell(&store, pads.id, 2, 4999, at(10, 0)).await;
        sell(&store, pads.id, 1, 1001, at(10, 23)).await;
        sell(&store, pads.id, 1, 700, at(9, 23)).await;
        sell(&store, pads.id, 1, 300, at(11, 0)).await;

        let total = dashboard(&store).today_sales_at(at(10, 12)).await.unwrap();
        assert_eq!(total, Money::from_cents(2 * 4999 + 1001));

        let quiet = dashboard(&store).today_sales_at(at(20, 12)).await.unwrap();
        assert_eq!(quiet, Money::zero());
    }

    #[tokio::test]
    async fn test_summary_counters() {
        let store = Arc::new(MemoryStore::new());
        item(&store, "A", 1, 5).await;
        item(&store, "B", 5, 5).await;
        let plenty = item(&store, "C", 9, 2).await;

        let mut retired = ItemDraft::new("D", "Old", Money::zero(), Money::zero());
        retired.current_stock = 50;
        retired.is_active = false;
        ItemStore::insert(store.as_ref(), &retired).await.unwrap();

        let make = MakeStore::insert(store.as_ref(), &MakeDraft::new("Toyota")).await.unwrap();
        let model = ModelStore::insert(store.as_ref(), &ModelDraft::new(make.id, "Corolla"))
            .await
            .unwrap();
        let submodel = SubmodelStore::insert(
            store.as_ref(),
            &SubmodelDraft {
                model_id: model.id,
                name: "LE".into(),
                year_from: 2014,
                year_to: Some(2019),
                engine_type: "I4".into(),
                engine_displacement: 1.8,
                fuel_type: "Petrol".into(),
                transmission_type: "CVT".into(),
                body_type: "Sedan".into(),
            },
        )
        .await
        .unwrap();
        CompatibilityStore::insert(store.as_ref(), plenty.id, submodel.id, None)
            .await
            .unwrap();
        CompatibilityStore::insert(store.as_ref(), 1, submodel.id, None)
            .await
            .unwrap();

        sell(&store, plenty.id, 3, 250, at(10, 9)).await;

        let summary = dashboard(&store).summary_at(at(10, 18)).await.unwrap();
        assert_eq!(
            summary,
            DashboardSummary {
                low_stock_count: 2,
                today_sales: Money::from_cents(750),
                inventory_count: 3,
                vehicle_count: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_low_stock_items_ordered_and_capped() {
        let store = Arc::new(MemoryStore::new());
        for n in 0..12 {
            item(&store, &format!("LS-{n:02}"), 12 - n, 20).await;
        }
        item(&store, "OK", 30, 20).await;

        let rows = dashboard(&store).low_stock_items().await.unwrap();
        assert_eq!(rows.len(), DASHBOARD_LIST_LIMIT);
        assert_eq!(rows[0].part_number, "LS-11");
        assert_eq!(rows[0].current_stock, 1);
        assert!(rows.windows(2).all(|w| w[0].current_stock <= w[1].current_stock));
        assert!(rows.iter().all(|r| r.part_number != "OK"));
    }

    #[tokio::test]
    async fn test_recent_sales_newest_first_with_item() {
        let store = Arc::new(MemoryStore::new());
        let pads = item(&store, "BP-1", 10, 2).await;

        for day in 1..=12 {
            sell(&store, pads.id, 1, 100 * i64::from(day), at(day, 8)).await;
        }

        let rows = dashboard(&store).recent_sales().await.unwrap();
        assert_eq!(rows.len(), DASHBOARD_LIST_LIMIT);
        assert_eq!(rows[0].date, at(12, 8));
        assert_eq!(rows[0].total, Money::from_cents(1200));
        assert_eq!(rows[0].part_number, "BP-1");
        assert_eq!(rows[0].item_name, "Part BP-1");
        assert_eq!(rows[9].date, at(3, 8));
    }

    #[tokio::test]
    async fn test_top_sellers_rank_by_sales_in_window() {
        let store = Arc::new(MemoryStore::new());
        let pads = item(&store, "BP-1", 10, 2).await;
        let filter = item(&store, "OF-1", 10, 2).await;
        let wiper = item(&store, "WB-1", 10, 2).await;

        // Three small sales outrank one large one.
        for day in [5, 6, 7] {
            sell(&store, filter.id, 1, 899, at(day, 10)).await;
        }
        sell(&store, pads.id, 4, 4999, at(8, 10)).await;
        sell(&store, pads.id, 1, 4999, at(8, 11)).await;
        // Outside the 30-day window.
        let stale = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        for _ in 0..5 {
            sell(&store, wiper.id, 1, 1500, stale).await;
        }

        let top = dashboard(&store).top_sellers_at(at(10, 12)).await.unwrap();
        assert_eq!(top.len(), 2);

        assert_eq!(top[0].part_number, "OF-1");
        assert_eq!(top[0].sales, 3);
        assert_eq!(top[0].units, 3);
        assert_eq!(top[0].revenue, Money::from_cents(3 * 899));

        assert_eq!(top[1].part_number, "BP-1");
        assert_eq!(top[1].sales, 2);
        assert_eq!(top[1].units, 5);
        assert_eq!(top[1].revenue, Money::from_cents(5 * 4999));
    }

    #[tokio::test]
    async fn test_revenue_overflow_is_reported() {
        let store = Arc::new(MemoryStore::new());
        let part = item(&store, "BIG", 10, 2).await;
        sell(&store, part.id, 1, i64::MAX, at(9, 10)).await;
        sell(&store, part.id, 1, 1, at(9, 11)).await;

        let dash = dashboard(&store);
        let err = dash.top_sellers_at(at(9, 12)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);

        let err = dash.today_sales_at(at(9, 12)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    }

    #[tokio::test]
    async fn test_recent_purchases_name_the_supplier() {
        let store = Arc::new(MemoryStore::new());
        let pads = item(&store, "BP-1", 10, 2).await;
        let bosch = SupplierStore::insert(store.as_ref(), &SupplierDraft::new("Bosch"))
            .await
            .unwrap();

        for day in [3, 5, 4] {
            let draft = PurchaseDraft::new(bosch.id, pads.id, 10, Money::from_cents(2000));
            let entry = LedgerEntry {
                draft,
                reference: None,
                date: at(day, 9),
                total: Money::from_cents(20_000),
            };
            LedgerStore::<Purchases>::insert(store.as_ref(), &entry).await.unwrap();
        }

        let rows = dashboard(&store).recent_purchases().await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].date, at(5, 9));
        assert_eq!(rows[0].supplier_name, "Bosch");
        assert_eq!(rows[0].part_number, "BP-1");
        assert_eq!(rows[0].cost, Money::from_cents(20_000));
        assert_eq!(rows[2].date, at(3, 9));
    }

    #[tokio::test]
    async fn test_empty_inventory() {
        let store = Arc::new(MemoryStore::new());
        let dash = dashboard(&store);

        assert_eq!(dash.low_stock_count().await.unwrap(), 0);
        assert_eq!(dash.vehicle_count().await.unwrap(), 0);
        assert!(dash.low_stock_items().await.unwrap().is_empty());
        assert!(dash.recent_sales().await.unwrap().is_empty());
        assert!(dash.top_sellers().await.unwrap().is_empty());
        assert!(dash.recent_purchases().await.unwrap().is_empty());
    }
}
