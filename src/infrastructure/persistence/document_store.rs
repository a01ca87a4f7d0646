use crate::domain::errors::StoreError;
use crate::domain::ports::{DocumentStore, WriteMode};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use tracing::debug;

/// `DocumentStore` backed by the `documents` table, one JSON body per
/// `(collection, id)`.
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn backend(collection: &str, id: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend {
        collection: collection.to_string(),
        id: id.to_string(),
        reason: e.to_string(),
    }
}

fn decode(collection: &str, id: &str, body: &str) -> Result<Value, StoreError> {
    serde_json::from_str(body).map_err(|source| StoreError::Serialization {
        collection: collection.to_string(),
        id: id.to_string(),
        source,
    })
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| backend(collection, id, e))?;

        match row {
            None => Ok(None),
            Some(row) => {
                let body: String = row.try_get("body").map_err(|e| backend(collection, id, e))?;
                decode(collection, id, &body).map(Some)
            }
        }
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        document: Value,
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| backend(collection, id, e))?;

        let existing = match mode {
            WriteMode::Replace => None,
            WriteMode::Merge => {
                let row = sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
                    .bind(collection)
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| backend(collection, id, e))?;
                match row {
                    Some(row) => {
                        let body: String =
                            row.try_get("body").map_err(|e| backend(collection, id, e))?;
                        Some(decode(collection, id, &body)?)
                    }
                    None => None,
                }
            }
        };

        let body = mode.apply(existing, document).to_string();
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(collection, id) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(&body)
        .bind(Utc::now().timestamp_millis())
        .execute(&mut *tx)
        .await
        .map_err(|e| backend(collection, id, e))?;

        tx.commit().await.map_err(|e| backend(collection, id, e))?;

        debug!(
            "SqliteDocumentStore: wrote {}/{} ({} bytes, {:?})",
            collection,
            id,
            body.len(),
            mode
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::database::Database;
    use serde_json::json;

    async fn store() -> (SqliteDocumentStore, SqlitePool) {
        let db = Database::new("sqlite::memory:").await.unwrap();
        (SqliteDocumentStore::new(db.pool.clone()), db.pool)
    }

    #[tokio::test]
    async fn test_missing_document() {
        let (store, _) = store().await;
        assert!(store.get_document("predictions", "AAPL").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_overwrites_whole_document() {
        let (store, _) = store().await;
        store
            .set_document("c", "1", json!({"a": 1, "b": 2}), WriteMode::Replace)
            .await
            .unwrap();
        store
            .set_document("c", "1", json!({"b": 3}), WriteMode::Replace)
            .await
            .unwrap();
        assert_eq!(store.get_document("c", "1").await.unwrap(), Some(json!({"b": 3})));
    }

    #[tokio::test]
    async fn test_merge_patches_top_level_fields() {
        let (store, _) = store().await;
        store
            .set_document("c", "1", json!({"b": 3}), WriteMode::Merge)
            .await
            .unwrap();
        store
            .set_document("c", "1", json!({"a": 1}), WriteMode::Merge)
            .await
            .unwrap();
        assert_eq!(
            store.get_document("c", "1").await.unwrap(),
            Some(json!({"a": 1, "b": 3}))
        );
    }

    #[tokio::test]
    async fn test_one_row_per_key() {
        let (store, pool) = store().await;
        for i in 0..3 {
            store
                .set_document("stockData", "AAPL-combined", json!({ "n": i }), WriteMode::Replace)
                .await
                .unwrap();
        }
        store
            .set_document("predictions", "AAPL-combined", json!({}), WriteMode::Replace)
            .await
            .unwrap();

        let row = sqlx::query("SELECT COUNT(*) AS count FROM documents")
            .fetch_one(&pool)
            .await
            .unwrap();
        let count: i64 = row.try_get("count").unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_corrupt_body_is_serialization_error() {
        let (store, pool) = store().await;
        sqlx::query(
            "INSERT INTO documents (collection, id, body, updated_at) \
             VALUES ('c', '1', 'not json', 0)",
        )
            .execute(&pool)
            .await
            .unwrap();

        assert!(matches!(
            store.get_document("c", "1").await,
            Err(StoreError::Serialization { .. })
        ));
    }
}
