//! # Purchase Repository
//!
//! Purchases reference both a supplier and an item. Both foreign keys are
//! `ON DELETE RESTRICT`, so a supplier or item with purchase history stays.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use fixparts_core::error::{Entity, StorageResult};
use fixparts_core::ledger::{LedgerEntry, Purchase, PurchaseDraft, PurchaseFilter, Purchases};
use fixparts_core::storage::LedgerStore;

use crate::error::DbError;

#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }
}

#[async_trait]
impl LedgerStore<Purchases> for PurchaseRepository {
    async fn get(&self, id: i64) -> StorageResult<Option<Purchase>> {
        let purchase = sqlx::query_as::<_, Purchase>("SELECT * FROM purchases WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(purchase)
    }

    async fn get_by_reference(&self, reference: &str) -> StorageResult<Option<Purchase>> {
        let purchase =
            sqlx::query_as::<_, Purchase>("SELECT * FROM purchases WHERE invoice_number = ?1")
                .bind(reference)
                .fetch_optional(&self.pool)
                .await
                .map_err(DbError::from)?;

        Ok(purchase)
    }

    async fn list(&self, filter: &PurchaseFilter) -> StorageResult<Vec<Purchase>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM purchases WHERE 1=1");

        if let Some(supplier_id) = filter.supplier_id {
            query.push(" AND supplier_id = ");
            query.push_bind(supplier_id);
        }
        if let Some(item_id) = filter.item_id {
            query.push(" AND item_id = ");
            query.push_bind(item_id);
        }
        if let Some(start) = filter.start_date {
            query.push(" AND date >= ");
            query.push_bind(start);
        }
        if let Some(end) = filter.end_date {
            query.push(" AND date <= ");
            query.push_bind(end);
        }
        if let Some(invoice) = &filter.invoice_number {
            query.push(" AND invoice_number = ");
            query.push_bind(invoice.clone());
        }
        query.push(" ORDER BY date DESC, id DESC");

        let purchases = query
            .build_query_as::<Purchase>()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(purchases)
    }

    async fn insert(&self, entry: &LedgerEntry<PurchaseDraft>) -> StorageResult<Purchase> {
        let draft = &entry.draft;
        debug!(
            supplier_id = draft.supplier_id,
            item_id = draft.item_id,
            total = %entry.total,
            "Inserting purchase"
        );

        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            INSERT INTO purchases (
                date, supplier_id, item_id, quantity, cost_per_unit, total_cost,
                invoice_number, received_by, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            RETURNING *
            "#,
        )
        .bind(entry.date)
        .bind(draft.supplier_id)
        .bind(draft.item_id)
        .bind(draft.quantity)
        .bind(draft.cost_per_unit)
        .bind(entry.total)
        .bind(&entry.reference)
        .bind(&draft.received_by)
        .bind(&draft.notes)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(purchase)
    }

    async fn update(&self, id: i64, entry: &LedgerEntry<PurchaseDraft>) -> StorageResult<Purchase> {
        let draft = &entry.draft;
        debug!(id, total = %entry.total, "Updating purchase");

        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            UPDATE purchases SET
                date = ?2,
                supplier_id = ?3,
                item_id = ?4,
                quantity = ?5,
                cost_per_unit = ?6,
                total_cost = ?7,
                invoice_number = ?8,
                received_by = ?9,
                notes = ?10,
                updated_at = ?11
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(entry.date)
        .bind(draft.supplier_id)
        .bind(draft.item_id)
        .bind(draft.quantity)
        .bind(draft.cost_per_unit)
        .bind(entry.total)
        .bind(&entry.reference)
        .bind(&draft.received_by)
        .bind(&draft.notes)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(purchase.ok_or(DbError::not_found(Entity::Purchase, id))?)
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        debug!(id, "Deleting purchase");

        let result = sqlx::query("DELETE FROM purchases WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Entity::Purchase, id).into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Database;
    use crate::repository::test_support::database;
    use chrono::Duration;
    use fixparts_core::error::StorageError;
    use fixparts_core::money::Money;
    use fixparts_core::storage::{ItemStore, SupplierStore};
    use fixparts_core::types::{ItemDraft, SupplierDraft};

    /// Supplier 1 "Bosch" and item 1 "OF-20".
    async fn seeded() -> Database {
        let db = database().await;
        db.suppliers()
            .insert(&SupplierDraft::new("Bosch"))
            .await
            .unwrap();
        db.items()
            .insert(&ItemDraft::new(
                "OF-20",
                "Oil filter",
                Money::from_cents(350),
                Money::from_cents(899),
            ))
            .await
            .unwrap();
        db
    }

    fn entry(quantity: i64, invoice: Option<&str>) -> LedgerEntry<PurchaseDraft> {
        LedgerEntry {
            draft: PurchaseDraft::new(1, 1, quantity, Money::from_cents(350)),
            reference: invoice.map(str::to_string),
            date: Utc::now() - Duration::minutes(quantity),
            total: Money::from_cents(350 * quantity),
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup_by_invoice() {
        let db = seeded().await;
        let repo = db.purchases();

        let purchase = repo.insert(&entry(12, Some("INV-7"))).await.unwrap();
        assert_eq!(purchase.total_cost, Money::from_cents(4200));
        assert_eq!(purchase.supplier_id, 1);

        let found = repo.get_by_reference("INV-7").await.unwrap().unwrap();
        assert_eq!(found.id, purchase.id);
        assert!(repo.get_by_reference("INV-8").await.unwrap().is_none());

        let err = repo.insert(&entry(1, Some("INV-7"))).await.unwrap_err();
        assert!(err.violates("invoice_number"));
    }

    #[tokio::test]
    async fn test_filters() {
        let db = seeded().await;
        let repo = db.purchases();
        repo.insert(&entry(1, Some("A"))).await.unwrap();
        repo.insert(&entry(2, Some("B"))).await.unwrap();

        let for_supplier = repo
            .list(&PurchaseFilter {
                supplier_id: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        // Newest first: quantity 1 was dated one minute ago, quantity 2 two minutes ago.
        let invoices: Vec<_> = for_supplier
            .iter()
            .filter_map(|p| p.invoice_number.as_deref())
            .collect();
        assert_eq!(invoices, vec!["A", "B"]);

        let by_invoice = repo
            .list(&PurchaseFilter {
                invoice_number: Some("B".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_invoice.len(), 1);

        let other_item = repo
            .list(&PurchaseFilter {
                item_id: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(other_item.is_empty());
    }

    #[tokio::test]
    async fn test_history_restricts_deletes() {
        let db = seeded().await;
        let repo = db.purchases();
        let purchase = repo.insert(&entry(3, None)).await.unwrap();

        let err = db.items().delete(1).await.unwrap_err();
        assert!(matches!(err, StorageError::ForeignKeyViolation { .. }));
        let err = db.suppliers().delete(1).await.unwrap_err();
        assert!(matches!(err, StorageError::ForeignKeyViolation { .. }));

        repo.delete(purchase.id).await.unwrap();
        db.items().delete(1).await.unwrap();
        db.suppliers().delete(1).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_purchase() {
        let db = seeded().await;
        let err = db.purchases().update(42, &entry(1, None)).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::NotFound {
                entity: Entity::Purchase,
                id: 42
            }
        ));
    }
}
