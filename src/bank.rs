//! Question bank synchronizer.
//!
//! Guarantees a user-owned question set per category, lazily seeded from the
//! default dataset the first time the partition is found empty, and writes
//! edits back as atomic upsert batches. Once a partition holds any document the
//! defaults are never consulted again for it.

use std::{collections::HashMap, sync::Arc};

use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::defaults::DefaultQuestions;
use crate::domain::{Category, Identifier, Question};
use crate::error::QuizError;
use crate::store::{owner_partition, Document, DocumentStore};
use crate::util::trunc_for_log;

#[derive(Clone)]
pub struct QuestionBank {
    store: Arc<dyn DocumentStore>,
    defaults: Arc<dyn DefaultQuestions>,
}

impl QuestionBank {
    pub fn new(store: Arc<dyn DocumentStore>, defaults: Arc<dyn DefaultQuestions>) -> Self {
        Self { store, defaults }
    }

    /// Stored questions for the owner+category partition, seeding it from the
    /// defaults when it is empty.
    #[instrument(level = "info", skip(self), fields(%identifier, %category))]
    pub async fn fetch_questions(
        &self,
        identifier: &Identifier,
        category: &Category,
    ) -> Result<Vec<Question>, QuizError> {
        let partition = owner_partition(identifier, category);
        let docs = self.store.get(&partition).await.map_err(|e| {
            error!(target: "bank", %partition, error = %e, "Reading questions failed");
            QuizError::from(e)
        })?;

        if !docs.is_empty() {
            let questions: Vec<Question> = docs.into_iter().filter_map(stored_question).collect();
            info!(target: "bank", %partition, count = questions.len(), "Questions loaded from store");
            return Ok(questions);
        }

        info!(target: "bank", %partition, "Partition empty; seeding from defaults");
        self.seed(identifier, category).await
    }

    async fn seed(&self, identifier: &Identifier, category: &Category) -> Result<Vec<Question>, QuizError> {
        let dataset = self.defaults.load().await.map_err(|e| {
            error!(target: "bank", %category, error = %e, "Loading default questions failed");
            QuizError::SeedDataMissing { category: category.to_string(), reason: e.to_string() }
        })?;

        let Some(entries) = dataset.get(category.as_str()).and_then(Value::as_array) else {
            error!(target: "bank", %category, "No default question list for category");
            return Err(QuizError::SeedDataMissing {
                category: category.to_string(),
                reason: "missing or not a list".into(),
            });
        };
        if entries.is_empty() {
            warn!(target: "bank", %category, "Default question list is empty; nothing to seed");
            return Ok(Vec::new());
        }

        // One bad entry means the dataset itself is broken; seed nothing.
        let seed = entries
            .iter()
            .map(|entry| {
                serde_json::from_value::<Question>(entry.clone()).map_err(|e| {
                    error!(target: "bank", %category, error = %e, entry = %trunc_for_log(&entry.to_string(), 120), "Undecodable default entry");
                    QuizError::SeedDataMissing {
                        category: category.to_string(),
                        reason: format!("undecodable entry: {}", e),
                    }
                })
            })
            .collect::<Result<Vec<Question>, QuizError>>()?;

        match self.upsert_questions(identifier, category, &seed).await {
            Ok(written) => {
                info!(target: "bank", %category, written, "Seeded questions from defaults");
                Ok(seed)
            }
            Err(e) => {
                error!(target: "bank", %category, error = %e, "Saving seeded questions failed");
                Err(QuizError::SeedWriteFailed(e.to_string()))
            }
        }
    }

    /// Create-or-replace every question that has an id, in one atomic batch.
    /// Entries without an id are skipped; returns how many distinct documents were written.
    #[instrument(level = "info", skip(self, questions), fields(%identifier, %category, input = questions.len()))]
    pub async fn upsert_questions(
        &self,
        identifier: &Identifier,
        category: &Category,
        questions: &[Question],
    ) -> Result<usize, QuizError> {
        if questions.is_empty() {
            debug!(target: "bank", "No questions provided; nothing to write");
            return Ok(0);
        }

        // Repeated ids collapse into one document; the last entry wins.
        let mut docs: Vec<Document> = Vec::with_capacity(questions.len());
        let mut position: HashMap<&str, usize> = HashMap::new();
        for q in questions {
            if !q.has_id() {
                warn!(target: "bank", question = %trunc_for_log(&q.question, 80), "Skipping question without id");
                continue;
            }
            match position.get(q.id.as_str()) {
                Some(&i) => {
                    debug!(target: "bank", id = %q.id, "Duplicate id in batch; keeping the later entry");
                    docs[i] = to_document(q);
                }
                None => {
                    position.insert(q.id.as_str(), docs.len());
                    docs.push(to_document(q));
                }
            }
        }
        if docs.is_empty() {
            return Err(QuizError::NoValidEntries);
        }

        let count = docs.len();
        let partition = owner_partition(identifier, category);
        self.store.batch_write(&partition, docs).await.map_err(|e| {
            error!(target: "bank", %partition, error = %e, "Batch write failed");
            QuizError::from(e)
        })?;
        info!(target: "bank", %partition, count, "Questions upserted");
        Ok(count)
    }
}

/// Stored fields annotated with the storage id. Documents that cannot be
/// decoded at all are skipped rather than failing the whole read.
fn stored_question(doc: Document) -> Option<Question> {
    match serde_json::from_value::<Question>(Value::Object(doc.fields)) {
        Ok(mut q) => {
            q.id = doc.id;
            Some(q)
        }
        Err(e) => {
            warn!(target: "bank", id = %doc.id, error = %e, "Skipping undecodable stored question");
            None
        }
    }
}

fn to_document(q: &Question) -> Document {
    let fields = match serde_json::to_value(q) {
        Ok(Value::Object(map)) => map,
        _ => Default::default(),
    };
    Document { id: q.id.clone(), fields }
}
