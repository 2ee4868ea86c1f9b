// src/store/mod.rs

pub mod memory;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// The named collections of the record space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Exams,
    ExamUsers,
    OnReview,
    ExamResults,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Exams => "exams",
            Collection::ExamUsers => "examUsers",
            Collection::OnReview => "onReview",
            Collection::ExamResults => "examResults",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equality filter on a top-level record field.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// A record as returned by the store: its identifier plus its fields.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub fields: Value,
}

impl Document {
    /// Deserializes the record into a typed model, injecting the record id
    /// into the struct's `id` field.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, StoreError> {
        let mut fields = self.fields;
        if let Value::Object(map) = &mut fields {
            map.insert("id".to_string(), Value::String(self.id));
        }
        serde_json::from_value(fields).map_err(|e| StoreError::Corrupt(e.to_string()))
    }
}

/// Serializes a model into store fields, stripping the `id` field (the id
/// lives in the record key, not in the record body).
pub fn encode<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    let mut fields =
        serde_json::to_value(value).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    if let Value::Object(map) = &mut fields {
        map.remove("id");
    }
    Ok(fields)
}

/// Errors raised by a record store backend.
#[derive(Debug)]
pub enum StoreError {
    /// The backend rejected or failed the operation (network, permission).
    Backend(String),

    /// A stored record does not deserialize into its expected shape.
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Backend(msg) => write!(f, "store backend error: {}", msg),
            StoreError::Corrupt(msg) => write!(f, "corrupt record: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// The document store the portal runs against.
///
/// Collections hold schema-less records keyed by a generated identifier and
/// are queryable by equality on top-level fields. Backends provide no
/// transactional guarantees across calls; multi-step sequences
/// (check-then-insert, insert-then-delete) are inherently racy and the
/// workflows treat them as such.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts a new record and returns its generated id.
    async fn create(&self, collection: Collection, fields: Value) -> Result<String, StoreError>;

    /// Reads a record by id. Absent records are `Ok(None)`, not an error.
    async fn read(&self, collection: Collection, id: &str)
    -> Result<Option<Document>, StoreError>;

    /// Merges the given fields into an existing record (top-level keys
    /// overwrite; unspecified keys are preserved).
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Value,
    ) -> Result<(), StoreError>;

    /// Removes a record. Deleting an absent record is not an error.
    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError>;

    /// Returns every record matching all equality filters.
    async fn query(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError>;

    /// Returns every record in the collection.
    async fn list_all(&self, collection: Collection) -> Result<Vec<Document>, StoreError>;
}
