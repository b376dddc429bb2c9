//! # Supplier Repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use fixparts_core::error::{Entity, StorageResult};
use fixparts_core::storage::SupplierStore;
use fixparts_core::types::{Supplier, SupplierDraft, SupplierFilter};

use crate::error::DbError;

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }
}

#[async_trait]
impl SupplierStore for SupplierRepository {
    async fn get(&self, id: i64) -> StorageResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(supplier)
    }

    async fn list(&self, filter: &SupplierFilter) -> StorageResult<Vec<Supplier>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM suppliers WHERE 1=1");

        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search.to_lowercase());
            query.push(" AND (LOWER(name) LIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR LOWER(COALESCE(contact_person, '')) LIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR LOWER(COALESCE(email, '')) LIKE ");
            query.push_bind(pattern);
            query.push(")");
        }
        query.push(" ORDER BY name");

        let suppliers = query
            .build_query_as::<Supplier>()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(suppliers)
    }

    async fn get_by_name(&self, name: &str) -> StorageResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(supplier)
    }

    async fn insert(&self, draft: &SupplierDraft) -> StorageResult<Supplier> {
        debug!(name = %draft.name, "Inserting supplier");

        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            INSERT INTO suppliers (
                name, contact_person, phone, email, address,
                tax_id, payment_terms, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            RETURNING *
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.contact_person)
        .bind(&draft.phone)
        .bind(&draft.email)
        .bind(&draft.address)
        .bind(&draft.tax_id)
        .bind(&draft.payment_terms)
        .bind(&draft.notes)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(supplier)
    }

    async fn update(&self, id: i64, draft: &SupplierDraft) -> StorageResult<Supplier> {
        debug!(id, "Updating supplier");

        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            UPDATE suppliers SET
                name = ?2,
                contact_person = ?3,
                phone = ?4,
                email = ?5,
                address = ?6,
                tax_id = ?7,
                payment_terms = ?8,
                notes = ?9,
                updated_at = ?10
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.contact_person)
        .bind(&draft.phone)
        .bind(&draft.email)
        .bind(&draft.address)
        .bind(&draft.tax_id)
        .bind(&draft.payment_terms)
        .bind(&draft.notes)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(supplier.ok_or(DbError::not_found(Entity::Supplier, id))?)
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        debug!(id, "Deleting supplier");

        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Entity::Supplier, id).into());
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
    use fixparts_core::storage::ItemStore;
    use fixparts_core::types::ItemDraft;

    #[tokio::test]
    async fn test_name_is_unique() {
        let repo = database().await.suppliers();
        repo.insert(&SupplierDraft::new("Bosch")).await.unwrap();

        let err = repo.insert(&SupplierDraft::new("Bosch")).await.unwrap_err();
        assert!(err.violates("name"));
        assert!(repo.get_by_name("Bosch").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_search_matches_contact_and_email() {
        let repo = database().await.suppliers();
        let mut bosch = SupplierDraft::new("Bosch");
        bosch.contact_person = Some("Anke Weber".into());
        repo.insert(&bosch).await.unwrap();
        let mut denso = SupplierDraft::new("Denso");
        denso.email = Some("orders@denso.example".into());
        repo.insert(&denso).await.unwrap();

        let by_contact = repo
            .list(&SupplierFilter {
                search: Some("WEBER".into()),
            })
            .await
            .unwrap();
        assert_eq!(by_contact.len(), 1);
        assert_eq!(by_contact[0].name, "Bosch");

        let by_email = repo
            .list(&SupplierFilter {
                search: Some("orders@".into()),
            })
            .await
            .unwrap();
        assert_eq!(by_email[0].name, "Denso");
        assert_eq!(repo.list(&SupplierFilter::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_referenced_supplier() {
        let db = database().await;
        let repo = db.suppliers();
        let supplier = repo.insert(&SupplierDraft::new("Bosch")).await.unwrap();

        let mut item = ItemDraft::new(
            "BP-100",
            "Brake pad set",
            Money::from_cents(1500),
            Money::from_cents(2500),
        );
        item.supplier_id = Some(supplier.id);
        db.items().insert(&item).await.unwrap();
        assert_eq!(db.items().count_for_supplier(supplier.id).await.unwrap(), 1);

        let err = repo.delete(supplier.id).await.unwrap_err();
        assert!(matches!(err, StorageError::ForeignKeyViolation { .. }));
    }
}
