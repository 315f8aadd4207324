//! Document store boundary.
//!
//! The core only talks to [`DocumentStore`]: partition reads, atomic batch
//! upserts, filtered/ordered queries and appends with a server-assigned
//! timestamp. Partitions used by the application:
//!
//! ```text
//! owners/{identifier}/{category}   → one document per question, keyed by question id
//! scores                           → append-only score records
//! ```

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{Category, Identifier};

pub type Fields = serde_json::Map<String, Value>;

pub const SCORES_COLLECTION: &str = "scores";

/// Field filled in by the store on `add`.
pub const SERVER_TIMESTAMP_FIELD: &str = "createdAt";

pub fn owner_partition(identifier: &Identifier, category: &Category) -> String {
    format!("owners/{}/{}", identifier, category)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Equality filters, ordering and an optional cap. Documents missing an
/// `order_by` field are excluded from the result.
#[derive(Clone, Debug, Default)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_by: Vec<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, dir: Direction) -> Self {
        self.order_by.push((field.to_string(), dir));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store rejected the write: {0}")]
    Unavailable(String),

    #[error("snapshot I/O failed: {0}")]
    Snapshot(#[from] std::io::Error),

    #[error("snapshot encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents in a partition, ordered by id.
    async fn get(&self, partition: &str) -> Result<Vec<Document>, StoreError>;

    /// Create-or-replace every document; all of them are applied or none is.
    async fn batch_write(&self, partition: &str, docs: Vec<Document>) -> Result<(), StoreError>;

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Appends a document with a store-assigned id and [`SERVER_TIMESTAMP_FIELD`].
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;
}
