//! In-memory document store with optional JSON snapshot persistence.
//!
//! Writes stage their changes, persist the snapshot (when configured) and only
//! then commit in memory, so a failed write leaves nothing behind.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    path::PathBuf,
    sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering},
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use super::{Direction, Document, DocumentStore, Fields, Query, StoreError, SERVER_TIMESTAMP_FIELD};
use crate::util::unix_millis;

type Partitions = HashMap<String, BTreeMap<String, Fields>>;

pub struct MemoryStore {
    partitions: RwLock<Partitions>,
    last_timestamp: AtomicU64,
    snapshot_path: Option<PathBuf>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            partitions: RwLock::new(HashMap::new()),
            last_timestamp: AtomicU64::new(0),
            snapshot_path: None,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Opens a store persisted at `path`, loading the previous snapshot if one exists.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn open(path: PathBuf) -> Result<Self, StoreError> {
        let partitions: Partitions = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        let docs: usize = partitions.values().map(BTreeMap::len).sum();
        info!(target: "quizbank", partitions = partitions.len(), docs, "Document store snapshot loaded");
        Ok(Self {
            partitions: RwLock::new(partitions),
            last_timestamp: AtomicU64::new(0),
            snapshot_path: Some(path),
            unavailable: AtomicBool::new(false),
        })
    }

    /// Simulates a backend outage: every read and write fails until reset.
    #[cfg(test)]
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, AtomicOrdering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Unavailable("backend offline".into()));
        }
        Ok(())
    }

    /// Strictly increasing, even when several adds land in the same millisecond.
    fn next_timestamp(&self) -> u64 {
        let now = unix_millis();
        let prev = self
            .last_timestamp
            .fetch_update(AtomicOrdering::SeqCst, AtomicOrdering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(prev + 1)
    }

    async fn commit(
        &self,
        guard: &mut Partitions,
        partition: &str,
        staged: BTreeMap<String, Fields>,
    ) -> Result<(), StoreError> {
        if let Some(path) = &self.snapshot_path {
            let mut view = guard.clone();
            view.insert(partition.to_string(), staged.clone());
            let bytes = serde_json::to_vec(&view)?;
            if let Err(e) = tokio::fs::write(path, bytes).await {
                error!(target: "quizbank", path = %path.display(), error = %e, "Snapshot write failed");
                return Err(e.into());
            }
        }
        guard.insert(partition.to_string(), staged);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, partition: &str) -> Result<Vec<Document>, StoreError> {
        self.check_available()?;
        let guard = self.partitions.read().await;
        Ok(guard
            .get(partition)
            .map(|docs| to_documents(docs.iter()))
            .unwrap_or_default())
    }

    #[instrument(level = "debug", skip(self, docs), fields(%partition, docs = docs.len()))]
    async fn batch_write(&self, partition: &str, docs: Vec<Document>) -> Result<(), StoreError> {
        self.check_available()?;
        let mut guard = self.partitions.write().await;
        let mut staged = guard.get(partition).cloned().unwrap_or_default();
        for doc in docs {
            staged.insert(doc.id, doc.fields);
        }
        self.commit(&mut guard, partition, staged).await
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.check_available()?;
        let guard = self.partitions.read().await;
        let Some(docs) = guard.get(collection) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<(&String, &Fields)> = docs
            .iter()
            .filter(|(_, f)| query.filters.iter().all(|(k, v)| f.get(k) == Some(v)))
            .filter(|(_, f)| query.order_by.iter().all(|(k, _)| f.contains_key(k)))
            .collect();

        hits.sort_by(|(_, a), (_, b)| {
            for (field, dir) in &query.order_by {
                let ord = compare_values(&a[field], &b[field]);
                let ord = if *dir == Direction::Desc { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        if let Some(limit) = query.limit {
            hits.truncate(limit);
        }
        debug!(target: "quizbank", %collection, hits = hits.len(), "Query evaluated");
        Ok(to_documents(hits.into_iter()))
    }

    async fn add(&self, collection: &str, mut fields: Fields) -> Result<String, StoreError> {
        self.check_available()?;
        let id = Uuid::new_v4().simple().to_string();
        fields.insert(SERVER_TIMESTAMP_FIELD.into(), Value::from(self.next_timestamp()));

        let mut guard = self.partitions.write().await;
        let mut staged = guard.get(collection).cloned().unwrap_or_default();
        staged.insert(id.clone(), fields);
        self.commit(&mut guard, collection, staged).await?;
        Ok(id)
    }
}

fn to_documents<'a>(docs: impl Iterator<Item = (&'a String, &'a Fields)>) -> Vec<Document> {
    docs.map(|(id, fields)| Document { id: id.clone(), fields: fields.clone() })
        .collect()
}

/// Numbers compare numerically, strings lexically; mixed types fall back to type rank.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> Fields {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn batch_write_replaces_documents_by_id() {
        let store = MemoryStore::new();
        let p = "owners/u1/Git";
        store
            .batch_write(p, vec![Document { id: "g1".into(), fields: fields(json!({"question": "old"})) }])
            .await
            .unwrap();
        store
            .batch_write(
                p,
                vec![
                    Document { id: "g1".into(), fields: fields(json!({"question": "new"})) },
                    Document { id: "g2".into(), fields: fields(json!({"question": "two"})) },
                ],
            )
            .await
            .unwrap();

        let docs = store.get(p).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].fields["question"], "new");
        assert!(store.get("owners/u1/Other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn query_filters_orders_and_limits() {
        let store = MemoryStore::new();
        for (cat, score) in [("A", 5), ("A", 8), ("B", 9), ("A", 3)] {
            store.add("scores", fields(json!({"category": cat, "score": score}))).await.unwrap();
        }
        let q = Query::new()
            .where_eq("category", "A")
            .order_by("score", Direction::Desc)
            .order_by(SERVER_TIMESTAMP_FIELD, Direction::Desc)
            .limit(2);
        let docs = store.query("scores", &q).await.unwrap();
        let scores: Vec<i64> = docs.iter().map(|d| d.fields["score"].as_i64().unwrap()).collect();
        assert_eq!(scores, vec![8, 5]);
    }

    #[tokio::test]
    async fn add_assigns_increasing_timestamps() {
        let store = MemoryStore::new();
        let mut stamps = Vec::new();
        for _ in 0..20 {
            let id = store.add("scores", Fields::new()).await.unwrap();
            let docs = store.get("scores").await.unwrap();
            let doc = docs.iter().find(|d| d.id == id).unwrap();
            stamps.push(doc.fields[SERVER_TIMESTAMP_FIELD].as_u64().unwrap());
        }
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn outage_fails_without_partial_writes() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = store
            .batch_write("owners/u1/Git", vec![Document { id: "g1".into(), fields: Fields::new() }])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        store.set_unavailable(false);
        assert!(store.get("owners/u1/Git").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let path = std::env::temp_dir().join(format!("quizbank_store_{}.json", Uuid::new_v4().simple()));
        {
            let store = MemoryStore::open(path.clone()).await.unwrap();
            store
                .batch_write("owners/u1/Git", vec![Document { id: "g1".into(), fields: fields(json!({"answer": "x"})) }])
                .await
                .unwrap();
        }
        let reopened = MemoryStore::open(path.clone()).await.unwrap();
        let docs = reopened.get("owners/u1/Git").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].fields["answer"], "x");
        let _ = std::fs::remove_file(&path);
    }
}
