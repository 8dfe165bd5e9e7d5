//! In-process document store.

use crate::error::StoreError;
use crate::store::{Document, DocumentStore, Query, merge_update, new_document, new_id};
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<String, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    async fn create(&self, data: Value) -> Result<String, StoreError> {
        let id = new_id();
        self.create_with_id(&id, data).await?;
        Ok(id)
    }

    async fn create_with_id(&self, id: &str, data: Value) -> Result<(), StoreError> {
        let doc = new_document(id, data)?;
        self.docs.write().await.insert(id.to_string(), doc);
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.docs.read().await.get(id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Document>, StoreError> {
        Ok(self.docs.read().await.values().cloned().collect())
    }

    async fn update(&self, id: &str, data: Value) -> Result<(), StoreError> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        merge_update(doc, data)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.docs.write().await.remove(id);
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let docs = self.docs.read().await;
        Ok(query.apply(docs.values().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Direction, Operator};
    use serde_json::json;

    #[tokio::test]
    async fn test_crud_cycle() {
        let store = MemoryStore::new();
        let id = store.create(json!({"title": "Fed holds", "views": 0})).await.unwrap();
        assert_eq!(id.len(), 20);

        let doc = store.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(doc["title"], "Fed holds");
        assert_eq!(doc["id"], id.as_str());

        store.update(&id, json!({"views": 3})).await.unwrap();
        let doc = store.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(doc["views"], 3);
        assert_eq!(doc["title"], "Fed holds");

        store.delete(&id).await.unwrap();
        assert!(store.get_by_id(&id).await.unwrap().is_none());
        store.delete(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.update("nope", json!({"a": 1})).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn test_rejects_non_object() {
        let store = MemoryStore::new();
        let err = store.create(json!("just text")).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument(_)));
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query() {
        let store = MemoryStore::new();
        store.create_with_id("a", json!({"tags": ["tsla"], "views": 4})).await.unwrap();
        store.create_with_id("b", json!({"tags": ["aapl"], "views": 9})).await.unwrap();
        store.create_with_id("c", json!({"tags": ["tsla", "aapl"], "views": 1})).await.unwrap();

        let docs = store
            .query(
                &Query::new()
                    .filter("tags", Operator::ArrayContains, "tsla")
                    .order_by("views", Direction::Desc),
            )
            .await
            .unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        assert_eq!(store.get_all().await.unwrap().len(), 3);
    }
}
