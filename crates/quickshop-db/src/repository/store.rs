//! # Store Repository
//!
//! Tenants of the storefront. Pricing only needs to know whether a store
//! exists and is active.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;

/// A merchant's store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Store {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub currency: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    /// A new active USD store with a fresh id.
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        let now = Utc::now();
        Store {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            slug: slug.into(),
            currency: "USD".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Repository for store rows.
#[derive(Debug, Clone)]
pub struct StoreRepository {
    pool: SqlitePool,
}

impl StoreRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StoreRepository { pool }
    }

    /// Whether an active store with this id exists.
    pub async fn exists(&self, id: &str) -> DbResult<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM stores WHERE id = ?1 AND is_active = 1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        debug!(store_id = %id, exists = found.is_some(), "Checked store");
        Ok(found.is_some())
    }

    /// Gets a store by id, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Store>> {
        let store = sqlx::query_as::<_, Store>(
            r#"
            SELECT id, name, slug, currency, is_active, created_at, updated_at
            FROM stores
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(store)
    }

    /// Inserts a store.
    pub async fn insert(&self, store: &Store) -> DbResult<()> {
        debug!(store_id = %store.id, slug = %store.slug, "Inserting store");

        sqlx::query(
            r#"
            INSERT INTO stores (id, name, slug, currency, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&store.id)
        .bind(&store.name)
        .bind(&store.slug)
        .bind(&store.currency)
        .bind(store.is_active)
        .bind(store.created_at)
        .bind(store.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::{Database, DbConfig};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = setup().await;
        let store = Store::new("Corner Shop", "corner-shop");
        db.stores().insert(&store).await.unwrap();

        let loaded = db.stores().get_by_id(&store.id).await.unwrap().unwrap();
        assert_eq!(loaded.slug, "corner-shop");
        assert!(loaded.is_active);
        assert!(db.stores().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exists_only_for_active_stores() {
        let db = setup().await;
        let store = Store::new("Corner Shop", "corner-shop");
        let mut suspended = Store::new("Closed Shop", "closed-shop");
        suspended.is_active = false;
        db.stores().insert(&store).await.unwrap();
        db.stores().insert(&suspended).await.unwrap();

        assert!(db.stores().exists(&store.id).await.unwrap());
        assert!(!db.stores().exists("missing").await.unwrap());
        assert!(!db.stores().exists(&suspended.id).await.unwrap());
        assert!(db.stores().get_by_id(&suspended.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let db = setup().await;
        db.stores().insert(&Store::new("A", "same")).await.unwrap();

        let err = db.stores().insert(&Store::new("B", "same")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
