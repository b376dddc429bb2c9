//! # Ledger Types
//!
//! Sales and purchases share one recording pipeline. The differences between
//! them (supplier reference, customer fields, which reference number is
//! unique) are captured by the [`TransactionKind`] trait.
//!
//! ## Recording Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   SaleDraft / PurchaseDraft        (caller input, date optional)        │
//! │          │                                                              │
//! │          ▼  validate line: ids > 0, qty > 0, unit price > 0,            │
//! │          │                 date not in the future                       │
//! │          ▼  reference (transaction / invoice number) unique if set      │
//! │          │                                                              │
//! │   LedgerEntry<Draft>               (date resolved, total = qty × price) │
//! │          │                                                              │
//! │          ▼  LedgerStore::insert / update                                │
//! │   Sale / Purchase                  (stored record)                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::Entity;
use crate::money::Money;

// =============================================================================
// Shared Line Fields
// =============================================================================

/// The fields every ledger line is validated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionLine {
    pub item_id: i64,

    /// Only purchases reference a supplier.
    pub supplier_id: Option<i64>,

    pub quantity: i64,
    pub unit_price: Money,
    pub date: Option<DateTime<Utc>>,
}

/// A draft with its write-time values resolved.
///
/// `reference` is the draft's reference number with blank text treated as
/// absent; stores persist this field, not the one on the draft.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry<D> {
    pub draft: D,
    pub reference: Option<String>,
    pub date: DateTime<Utc>,
    pub total: Money,
}

// =============================================================================
// Transaction Kind
// =============================================================================

/// Describes one family of ledger records.
///
/// Implemented by the marker types [`Sales`] and [`Purchases`].
pub trait TransactionKind: Send + Sync + 'static {
    /// Caller-supplied fields.
    type Draft: Debug + Clone + Send + Sync + Serialize + DeserializeOwned;

    /// Stored record.
    type Record: Debug + Clone + Send + Sync + Serialize + DeserializeOwned;

    /// Search criteria.
    type Filter: Debug + Clone + Default + Send + Sync;

    /// Entity used in errors and logs.
    const ENTITY: Entity;

    /// Name of the unique external reference column.
    const REFERENCE_FIELD: &'static str;

    fn line(draft: &Self::Draft) -> TransactionLine;

    /// The draft's reference number, blank treated as absent.
    fn reference(draft: &Self::Draft) -> Option<&str>;

    fn record_id(record: &Self::Record) -> i64;

    fn record_reference(record: &Self::Record) -> Option<&str>;

    fn record_item_id(record: &Self::Record) -> i64;

    /// Filter selecting every record for one item.
    fn item_filter(item_id: i64) -> Self::Filter;

    /// Evaluates the filter against a record.
    fn matches(filter: &Self::Filter, record: &Self::Record) -> bool;
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn in_range(
    date: DateTime<Utc>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> bool {
    start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
}

fn contains_ci(value: &Option<String>, needle: &Option<String>) -> bool {
    match needle {
        None => true,
        Some(n) => value
            .as_deref()
            .is_some_and(|v| v.to_lowercase().contains(&n.to_lowercase())),
    }
}

// =============================================================================
// Sales
// =============================================================================

/// Marker for the sales ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sales;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub item_id: i64,
    pub quantity: i64,
    pub price_per_unit: Money,

    /// Always `quantity × price_per_unit`.
    pub total_price: Money,

    /// Unique among sales when present.
    pub transaction_number: Option<String>,

    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub sold_by: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleDraft {
    /// Defaults to the write time.
    pub date: Option<DateTime<Utc>>,
    pub item_id: i64,
    pub quantity: i64,
    pub price_per_unit: Money,
    pub transaction_number: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub sold_by: Option<String>,
    pub notes: Option<String>,
}

impl SaleDraft {
    pub fn new(item_id: i64, quantity: i64, price_per_unit: Money) -> Self {
        SaleDraft {
            item_id,
            quantity,
            price_per_unit,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleFilter {
    pub item_id: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub transaction_number: Option<String>,
    pub sold_by: Option<String>,
}

impl TransactionKind for Sales {
    type Draft = SaleDraft;
    type Record = Sale;
    type Filter = SaleFilter;

    const ENTITY: Entity = Entity::Sale;
    const REFERENCE_FIELD: &'static str = "transaction_number";

    fn line(draft: &SaleDraft) -> TransactionLine {
        TransactionLine {
            item_id: draft.item_id,
            supplier_id: None,
            quantity: draft.quantity,
            unit_price: draft.price_per_unit,
            date: draft.date,
        }
    }

    fn reference(draft: &SaleDraft) -> Option<&str> {
        non_blank(&draft.transaction_number)
    }

    fn record_id(record: &Sale) -> i64 {
        record.id
    }

    fn record_reference(record: &Sale) -> Option<&str> {
        record.transaction_number.as_deref()
    }

    fn record_item_id(record: &Sale) -> i64 {
        record.item_id
    }

    fn item_filter(item_id: i64) -> SaleFilter {
        SaleFilter {
            item_id: Some(item_id),
            ..Default::default()
        }
    }

    fn matches(filter: &SaleFilter, sale: &Sale) -> bool {
        filter.item_id.map_or(true, |id| sale.item_id == id)
            && in_range(sale.date, filter.start_date, filter.end_date)
            && contains_ci(&sale.customer_name, &filter.customer_name)
            && contains_ci(&sale.customer_phone, &filter.customer_phone)
            && filter
                .customer_email
                .as_deref()
                .map_or(true, |e| sale.customer_email.as_deref() == Some(e))
            && filter
                .transaction_number
                .as_deref()
                .map_or(true, |t| sale.transaction_number.as_deref() == Some(t))
            && contains_ci(&sale.sold_by, &filter.sold_by)
    }
}

// =============================================================================
// Purchases
// =============================================================================

/// Marker for the purchases ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct Purchases;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Purchase {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub supplier_id: i64,
    pub item_id: i64,
    pub quantity: i64,
    pub cost_per_unit: Money,

    /// Always `quantity × cost_per_unit`.
    pub total_cost: Money,

    /// Unique among purchases when present.
    pub invoice_number: Option<String>,

    pub received_by: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseDraft {
    pub date: Option<DateTime<Utc>>,
    pub supplier_id: i64,
    pub item_id: i64,
    pub quantity: i64,
    pub cost_per_unit: Money,
    pub invoice_number: Option<String>,
    pub received_by: Option<String>,
    pub notes: Option<String>,
}

impl PurchaseDraft {
    pub fn new(supplier_id: i64, item_id: i64, quantity: i64, cost_per_unit: Money) -> Self {
        PurchaseDraft {
            supplier_id,
            item_id,
            quantity,
            cost_per_unit,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseFilter {
    pub supplier_id: Option<i64>,
    pub item_id: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub invoice_number: Option<String>,
}

impl TransactionKind for Purchases {
    type Draft = PurchaseDraft;
    type Record = Purchase;
    type Filter = PurchaseFilter;

    const ENTITY: Entity = Entity::Purchase;
    const REFERENCE_FIELD: &'static str = "invoice_number";

    fn line(draft: &PurchaseDraft) -> TransactionLine {
        TransactionLine {
            item_id: draft.item_id,
            supplier_id: Some(draft.supplier_id),
            quantity: draft.quantity,
            unit_price: draft.cost_per_unit,
            date: draft.date,
        }
    }

    fn reference(draft: &PurchaseDraft) -> Option<&str> {
        non_blank(&draft.invoice_number)
    }

    fn record_id(record: &Purchase) -> i64 {
        record.id
    }

    fn record_reference(record: &Purchase) -> Option<&str> {
        record.invoice_number.as_deref()
    }

    fn record_item_id(record: &Purchase) -> i64 {
        record.item_id
    }

    fn item_filter(item_id: i64) -> PurchaseFilter {
        PurchaseFilter {
            item_id: Some(item_id),
            ..Default::default()
        }
    }

    fn matches(filter: &PurchaseFilter, purchase: &Purchase) -> bool {
        filter.supplier_id.map_or(true, |id| purchase.supplier_id == id)
            && filter.item_id.map_or(true, |id| purchase.item_id == id)
            && in_range(purchase.date, filter.start_date, filter.end_date)
            && filter
                .invoice_number
                .as_deref()
                .map_or(true, |i| purchase.invoice_number.as_deref() == Some(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sale(id: i64, date: DateTime<Utc>) -> Sale {
        Sale {
            id,
            date,
            item_id: 5,
            quantity: 3,
            price_per_unit: Money::from_cents(4999),
            total_price: Money::from_cents(14997),
            transaction_number: Some(format!("TX-{id}")),
            customer_name: Some("Dana Ortiz".into()),
            customer_phone: None,
            customer_email: Some("dana@example.com".into()),
            sold_by: Some("counter-2".into()),
            notes: None,
            created_at: date,
            updated_at: date,
        }
    }

    #[test]
    fn test_blank_reference_is_absent() {
        let mut draft = SaleDraft::new(5, 1, Money::from_cents(100));
        assert_eq!(Sales::reference(&draft), None);
        draft.transaction_number = Some("  ".into());
        assert_eq!(Sales::reference(&draft), None);
        draft.transaction_number = Some("TX-9".into());
        assert_eq!(Sales::reference(&draft), Some("TX-9"));

        let mut draft = PurchaseDraft::new(2, 5, 1, Money::from_cents(100));
        draft.invoice_number = Some(" INV-1 ".into());
        assert_eq!(Purchases::reference(&draft), Some("INV-1"));
    }

    #[test]
    fn test_line_extraction() {
        let draft = PurchaseDraft::new(2, 5, 10, Money::from_cents(1250));
        let line = Purchases::line(&draft);
        assert_eq!(line.supplier_id, Some(2));
        assert_eq!(line.item_id, 5);
        assert_eq!(line.quantity, 10);
        assert_eq!(line.unit_price.cents(), 1250);

        let line = Sales::line(&SaleDraft::new(5, 3, Money::from_cents(4999)));
        assert_eq!(line.supplier_id, None);
    }

    #[test]
    fn test_sale_filter() {
        let now = Utc::now();
        let record = sale(1, now - Duration::days(2));

        assert!(Sales::matches(&SaleFilter::default(), &record));
        assert!(Sales::matches(&Sales::item_filter(5), &record));
        assert!(!Sales::matches(&Sales::item_filter(6), &record));
        assert!(Sales::matches(
            &SaleFilter {
                customer_name: Some("ortiz".into()),
                start_date: Some(now - Duration::days(3)),
                end_date: Some(now),
                ..Default::default()
            },
            &record
        ));
        assert!(!Sales::matches(
            &SaleFilter {
                start_date: Some(now - Duration::days(1)),
                ..Default::default()
            },
            &record
        ));
        assert!(!Sales::matches(
            &SaleFilter {
                transaction_number: Some("TX-2".into()),
                ..Default::default()
            },
            &record
        ));
    }
}
