//! # Item Repository
//!
//! ## Filtering
//! ```text
//! ItemFilter field     SQL
//! ────────────────     ──────────────────────────────────────────────────
//! category_id          category_id = ?
//! supplier_id          supplier_id = ?
//! part_number          part_number LIKE %?%
//! search               LOWER(item_name | part_number | description) LIKE
//! low_stock            current_stock <= minimum_stock (or >)
//! is_active            is_active = ?
//! make/model/submodel  EXISTS (compatibility ⋈ submodels ⋈ models)
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use fixparts_core::error::{Entity, StorageResult};
use fixparts_core::storage::ItemStore;
use fixparts_core::types::{Item, ItemDraft, ItemFilter};

use crate::error::DbError;

#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }
}

fn push_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &ItemFilter) {
    if let Some(category_id) = filter.category_id {
        query.push(" AND i.category_id = ");
        query.push_bind(category_id);
    }
    if let Some(supplier_id) = filter.supplier_id {
        query.push(" AND i.supplier_id = ");
        query.push_bind(supplier_id);
    }
    if let Some(part) = &filter.part_number {
        query.push(" AND i.part_number LIKE ");
        query.push_bind(format!("%{part}%"));
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search.to_lowercase());
        query.push(" AND (LOWER(i.item_name) LIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR LOWER(i.part_number) LIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR LOWER(i.description) LIKE ");
        query.push_bind(pattern);
        query.push(")");
    }
    match filter.low_stock {
        Some(true) => {
            query.push(" AND i.current_stock <= i.minimum_stock");
        }
        Some(false) => {
            query.push(" AND i.current_stock > i.minimum_stock");
        }
        None => {}
    }
    if let Some(active) = filter.is_active {
        query.push(" AND i.is_active = ");
        query.push_bind(active);
    }

    if filter.has_fitment() {
        query.push(
            " AND EXISTS (SELECT 1 FROM compatibility c \
             JOIN vehicle_submodels s ON s.id = c.submodel_id \
             JOIN vehicle_models m ON m.id = s.model_id \
             WHERE c.item_id = i.id",
        );
        if let Some(make_id) = filter.make_id {
            query.push(" AND m.make_id = ");
            query.push_bind(make_id);
        }
        if let Some(model_id) = filter.model_id {
            query.push(" AND s.model_id = ");
            query.push_bind(model_id);
        }
        if let Some(submodel_id) = filter.submodel_id {
            query.push(" AND c.submodel_id = ");
            query.push_bind(submodel_id);
        }
        query.push(")");
    }
}

#[async_trait]
impl ItemStore for ItemRepository {
    async fn get(&self, id: i64) -> StorageResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(item)
    }

    async fn list(&self, filter: &ItemFilter) -> StorageResult<Vec<Item>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT i.* FROM items i WHERE 1=1");
        push_filter(&mut query, filter);
        query.push(" ORDER BY i.part_number");

        debug!(sql = %query.sql(), "Listing items");
        let items = query
            .build_query_as::<Item>()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(items)
    }

    async fn get_by_part_number(&self, part_number: &str) -> StorageResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE part_number = ?1")
            .bind(part_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(item)
    }

    async fn get_by_barcode(&self, barcode: &str) -> StorageResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE barcode = ?1")
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(item)
    }

    async fn count_for_supplier(&self, supplier_id: i64) -> StorageResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE supplier_id = ?1")
            .bind(supplier_id)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(count as usize)
    }

    async fn insert(&self, draft: &ItemDraft) -> StorageResult<Item> {
        debug!(part_number = %draft.part_number, "Inserting item");
        let now = Utc::now();

        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (
                item_name, part_number, description, category_id,
                buy_price, sell_price, current_stock, minimum_stock,
                barcode, supplier_id,
                location_aisle, location_shelf, location_bin,
                weight_kg, dimensions_cm, warranty_period, image_url,
                is_active, notes, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8,
                ?9, ?10,
                ?11, ?12, ?13,
                ?14, ?15, ?16, ?17,
                ?18, ?19, ?20, ?20
            )
            RETURNING *
            "#,
        )
        .bind(&draft.item_name)
        .bind(&draft.part_number)
        .bind(&draft.description)
        .bind(draft.category_id)
        .bind(draft.buy_price)
        .bind(draft.sell_price)
        .bind(draft.current_stock)
        .bind(draft.minimum_stock)
        .bind(draft.supplied_barcode())
        .bind(draft.supplier_id)
        .bind(&draft.location_aisle)
        .bind(&draft.location_shelf)
        .bind(&draft.location_bin)
        .bind(draft.weight_kg)
        .bind(&draft.dimensions_cm)
        .bind(&draft.warranty_period)
        .bind(&draft.image_url)
        .bind(draft.is_active)
        .bind(&draft.notes)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(item)
    }

    async fn update(&self, id: i64, draft: &ItemDraft) -> StorageResult<Item> {
        debug!(id, "Updating item");

        let item = sqlx::query_as::<_, Item>(
            r#"
            UPDATE items SET
                item_name = ?2,
                part_number = ?3,
                description = ?4,
                category_id = ?5,
                buy_price = ?6,
                sell_price = ?7,
                current_stock = ?8,
                minimum_stock = ?9,
                barcode = ?10,
                supplier_id = ?11,
                location_aisle = ?12,
                location_shelf = ?13,
                location_bin = ?14,
                weight_kg = ?15,
                dimensions_cm = ?16,
                warranty_period = ?17,
                image_url = ?18,
                is_active = ?19,
                notes = ?20,
                updated_at = ?21
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&draft.item_name)
        .bind(&draft.part_number)
        .bind(&draft.description)
        .bind(draft.category_id)
        .bind(draft.buy_price)
        .bind(draft.sell_price)
        .bind(draft.current_stock)
        .bind(draft.minimum_stock)
        .bind(draft.supplied_barcode())
        .bind(draft.supplier_id)
        .bind(&draft.location_aisle)
        .bind(&draft.location_shelf)
        .bind(&draft.location_bin)
        .bind(draft.weight_kg)
        .bind(&draft.dimensions_cm)
        .bind(&draft.warranty_period)
        .bind(&draft.image_url)
        .bind(draft.is_active)
        .bind(&draft.notes)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(item.ok_or(DbError::not_found(Entity::Item, id))?)
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        debug!(id, "Deleting item");

        let result = sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Entity::Item, id).into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::database;
    use fixparts_core::error::StorageError;
    use fixparts_core::money::Money;

    fn draft(part_number: &str, barcode: Option<&str>) -> ItemDraft {
        let mut draft = ItemDraft::new(
            part_number,
            "Oil filter",
            Money::from_cents(350),
            Money::from_cents(899),
        );
        draft.barcode = barcode.map(str::to_string);
        draft
    }

    #[tokio::test]
    async fn test_insert_round_trips_money_and_flags() {
        let repo = database().await.items();
        let mut d = draft("OF-1", Some("BC-1"));
        d.weight_kg = Some(0.35);
        d.current_stock = 12;

        let item = repo.insert(&d).await.unwrap();
        assert_eq!(item.buy_price, Money::from_cents(350));
        assert_eq!(item.sell_price.to_string(), "$8.99");
        assert_eq!(item.weight_kg, Some(0.35));
        assert!(item.is_active);

        let fetched = repo.get_by_barcode("BC-1").await.unwrap().unwrap();
        assert_eq!(fetched, item);
    }

    #[tokio::test]
    async fn test_unique_constraints_are_classified() {
        let repo = database().await.items();
        repo.insert(&draft("OF-1", Some("BC-1"))).await.unwrap();

        let err = repo.insert(&draft("OF-1", Some("BC-2"))).await.unwrap_err();
        assert!(err.violates("part_number"));

        let err = repo.insert(&draft("OF-2", Some("BC-1"))).await.unwrap_err();
        assert!(err.violates("barcode"));
        assert!(!err.violates("part_number"));
    }

    #[tokio::test]
    async fn test_blank_barcodes_do_not_collide() {
        let repo = database().await.items();
        let a = repo.insert(&draft("OF-1", Some("  "))).await.unwrap();
        let b = repo.insert(&draft("OF-2", None)).await.unwrap();
        assert_eq!(a.barcode, None);
        assert_eq!(b.barcode, None);
    }

    #[tokio::test]
    async fn test_filter_search_and_low_stock() {
        let repo = database().await.items();
        let mut low = draft("BP-100", Some("BC-1"));
        low.description = "Brake pad set".into();
        low.item_name = "Brake pad set".into();
        low.current_stock = 2;
        low.minimum_stock = 5;
        repo.insert(&low).await.unwrap();

        let mut stocked = draft("OF-200", Some("BC-2"));
        stocked.current_stock = 40;
        stocked.minimum_stock = 5;
        repo.insert(&stocked).await.unwrap();

        let found = repo
            .list(&ItemFilter {
                search: Some("BRAKE".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].part_number, "BP-100");

        let low_stock = repo
            .list(&ItemFilter {
                low_stock: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(low_stock.len(), 1);
        assert!(low_stock[0].is_low_stock());

        let all = repo.list(&ItemFilter::default()).await.unwrap();
        let parts: Vec<_> = all.iter().map(|i| i.part_number.as_str()).collect();
        assert_eq!(parts, vec!["BP-100", "OF-200"]);
    }

    #[tokio::test]
    async fn test_count_for_supplier_and_delete() {
        let db = database().await;
        let repo = db.items();
        assert_eq!(repo.count_for_supplier(1).await.unwrap(), 0);

        let item = repo.insert(&draft("OF-1", None)).await.unwrap();
        repo.delete(item.id).await.unwrap();
        assert!(repo.get(item.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(item.id).await.unwrap_err(),
            StorageError::NotFound {
                entity: Entity::Item,
                ..
            }
        ));
    }
}
