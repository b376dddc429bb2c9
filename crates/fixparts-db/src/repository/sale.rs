//! # Sale Repository
//!
//! ## Recording a Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    ├── item still present?        no → ForeignKeyViolation(sales.item)  │
//! │    ├── INSERT INTO sales ... RETURNING *                                │
//! │    │     transaction_number UNIQUE → UniqueViolation                    │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `total_price` and `date` come from the resolved [`LedgerEntry`]; the
//! repository never derives them itself.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use fixparts_core::error::{Entity, StorageResult};
use fixparts_core::ledger::{LedgerEntry, Sale, SaleDraft, SaleFilter, Sales};
use fixparts_core::storage::LedgerStore;

use crate::error::DbError;

/// Repository for the sales ledger.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }
}

fn push_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &SaleFilter) {
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

    for (column, value) in [
        ("customer_name", &filter.customer_name),
        ("customer_phone", &filter.customer_phone),
        ("sold_by", &filter.sold_by),
    ] {
        if let Some(value) = value {
            query.push(format!(" AND LOWER({column}) LIKE "));
            query.push_bind(format!("%{}%", value.to_lowercase()));
        }
    }

    if let Some(email) = &filter.customer_email {
        query.push(" AND customer_email = ");
        query.push_bind(email.clone());
    }
    if let Some(number) = &filter.transaction_number {
        query.push(" AND transaction_number = ");
        query.push_bind(number.clone());
    }
}

#[async_trait]
impl LedgerStore<Sales> for SaleRepository {
    async fn get(&self, id: i64) -> StorageResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(sale)
    }

    async fn get_by_reference(&self, reference: &str) -> StorageResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE transaction_number = ?1")
            .bind(reference)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(sale)
    }

    async fn list(&self, filter: &SaleFilter) -> StorageResult<Vec<Sale>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM sales WHERE 1=1");
        push_filter(&mut query, filter);
        query.push(" ORDER BY date DESC, id DESC");

        let sales = query
            .build_query_as::<Sale>()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        debug!(count = sales.len(), "Listed sales");
        Ok(sales)
    }

    async fn insert(&self, entry: &LedgerEntry<SaleDraft>) -> StorageResult<Sale> {
        let draft = &entry.draft;
        debug!(item_id = draft.item_id, total = %entry.total, "Inserting sale");

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let item_present: Option<i64> = sqlx::query_scalar("SELECT id FROM items WHERE id = ?1")
            .bind(draft.item_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DbError::from)?;
        if item_present.is_none() {
            return Err(DbError::ForeignKeyViolation {
                message: "sales.item_id".to_string(),
            }
            .into());
        }

        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (
                date, item_id, quantity, price_per_unit, total_price,
                transaction_number, customer_name, customer_phone, customer_email,
                sold_by, notes, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                ?10, ?11, ?12, ?12
            )
            RETURNING *
            "#,
        )
        .bind(entry.date)
        .bind(draft.item_id)
        .bind(draft.quantity)
        .bind(draft.price_per_unit)
        .bind(entry.total)
        .bind(&entry.reference)
        .bind(&draft.customer_name)
        .bind(&draft.customer_phone)
        .bind(&draft.customer_email)
        .bind(&draft.sold_by)
        .bind(&draft.notes)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(DbError::from)?;

        tx.commit().await.map_err(DbError::from)?;

        Ok(sale)
    }

    async fn update(&self, id: i64, entry: &LedgerEntry<SaleDraft>) -> StorageResult<Sale> {
        let draft = &entry.draft;
        debug!(id, total = %entry.total, "Updating sale");

        let sale = sqlx::query_as::<_, Sale>(
            r#"
            UPDATE sales SET
                date = ?2,
                item_id = ?3,
                quantity = ?4,
                price_per_unit = ?5,
                total_price = ?6,
                transaction_number = ?7,
                customer_name = ?8,
                customer_phone = ?9,
                customer_email = ?10,
                sold_by = ?11,
                notes = ?12,
                updated_at = ?13
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(entry.date)
        .bind(draft.item_id)
        .bind(draft.quantity)
        .bind(draft.price_per_unit)
        .bind(entry.total)
        .bind(&entry.reference)
        .bind(&draft.customer_name)
        .bind(&draft.customer_phone)
        .bind(&draft.customer_email)
        .bind(&draft.sold_by)
        .bind(&draft.notes)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(sale.ok_or(DbError::not_found(Entity::Sale, id))?)
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        debug!(id, "Deleting sale");

        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Entity::Sale, id).into());
        }

        Ok(())
    }
}
