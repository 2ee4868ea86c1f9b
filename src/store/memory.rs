// src/store/memory.rs

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Collection, Document, Filter, RecordStore, StoreError};

/// In-memory record store.
///
/// Holds every collection as a map of id to fields. Selected when no
/// `DATABASE_URL` is configured; also backs the integration test suite so
/// tests need no external services. Contents are lost on shutdown.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<&'static str, BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(fields: &Value, filters: &[Filter]) -> bool {
    filters
        .iter()
        .all(|f| fields.get(&f.field) == Some(&f.value))
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, collection: Collection, fields: Value) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.as_str())
            .or_default()
            .insert(id.clone(), fields);
        Ok(id)
    }

    async fn read(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection.as_str())
            .and_then(|records| records.get(id))
            .map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            }))
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Value,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let record = collections
            .get_mut(collection.as_str())
            .and_then(|records| records.get_mut(id))
            .ok_or_else(|| {
                StoreError::Backend(format!("no record {} in {}", id, collection))
            })?;

        match (record, fields) {
            (Value::Object(existing), Value::Object(incoming)) => {
                for (key, value) in incoming {
                    existing.insert(key, value);
                }
                Ok(())
            }
            _ => Err(StoreError::Backend(
                "records and updates must be JSON objects".to_string(),
            )),
        }
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        if let Some(records) = collections.get_mut(collection.as_str()) {
            records.remove(id);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection.as_str())
            .map(|records| {
                records
                    .iter()
                    .filter(|(_, fields)| matches(fields, filters))
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_all(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        self.query(collection, &[]).await
    }
}
