//! Score repository: append-only score records plus top-score and leaderboard queries.

use std::{collections::BTreeSet, sync::Arc};

use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::domain::{Category, Identifier, ScoreRecord};
use crate::error::QuizError;
use crate::store::{Direction, Document, DocumentStore, Fields, Query, SCORES_COLLECTION, SERVER_TIMESTAMP_FIELD};

#[derive(Clone, Debug)]
pub struct ScoreFilter {
    pub category: Option<Category>,
    pub limit: usize,
}

impl Default for ScoreFilter {
    fn default() -> Self {
        Self { category: None, limit: 20 }
    }
}

#[derive(Clone)]
pub struct ScoreRepository {
    store: Arc<dyn DocumentStore>,
}

impl ScoreRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Appends one record. Not idempotent: callers must not blindly retry.
    #[instrument(level = "info", skip(self), fields(%identifier, %category))]
    pub async fn record_score(
        &self,
        identifier: &Identifier,
        score: i64,
        category: &Category,
    ) -> Result<String, QuizError> {
        if score < 0 {
            return Err(QuizError::InvalidArgument("Invalid score value provided.".into()));
        }
        let mut fields = Fields::new();
        fields.insert("identifier".into(), identifier.as_str().into());
        fields.insert("score".into(), score.into());
        fields.insert("category".into(), category.as_str().into());
        let id = self.store.add(SCORES_COLLECTION, fields).await.map_err(|e| {
            error!(target: "scores", error = %e, "Saving score failed");
            QuizError::from(e)
        })?;
        info!(target: "scores", %id, score, "Score recorded");
        Ok(id)
    }

    /// Highest score of one identifier in one category; `None` when nothing was recorded.
    #[instrument(level = "info", skip(self), fields(%identifier, %category))]
    pub async fn top_score_for(
        &self,
        identifier: &Identifier,
        category: &Category,
    ) -> Result<Option<ScoreRecord>, QuizError> {
        let query = Query::new()
            .where_eq("identifier", identifier.as_str())
            .where_eq("category", category.as_str())
            .order_by("score", Direction::Desc)
            .limit(1);
        let docs = self.store.query(SCORES_COLLECTION, &query).await?;
        Ok(docs.into_iter().find_map(score_record))
    }

    /// Distinct categories seen in the score history (not the catalog of all categories).
    #[instrument(level = "info", skip(self))]
    pub async fn list_categories(&self) -> Result<BTreeSet<String>, QuizError> {
        let docs = self.store.query(SCORES_COLLECTION, &Query::new()).await?;
        Ok(docs
            .iter()
            .filter_map(|d| d.fields.get("category").and_then(Value::as_str))
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Leaderboard: score descending, then most recent first.
    #[instrument(level = "info", skip(self), fields(category = ?filter.category, limit = filter.limit))]
    pub async fn top_scores(&self, filter: &ScoreFilter) -> Result<Vec<ScoreRecord>, QuizError> {
        if filter.limit == 0 {
            return Err(QuizError::InvalidArgument("Leaderboard limit must be at least 1.".into()));
        }
        let mut query = Query::new();
        if let Some(category) = &filter.category {
            query = query.where_eq("category", category.as_str());
        }
        let query = query
            .order_by("score", Direction::Desc)
            .order_by(SERVER_TIMESTAMP_FIELD, Direction::Desc)
            .limit(filter.limit);
        let docs = self.store.query(SCORES_COLLECTION, &query).await?;
        Ok(docs.into_iter().filter_map(score_record).collect())
    }
}

fn score_record(doc: Document) -> Option<ScoreRecord> {
    match serde_json::from_value::<ScoreRecord>(Value::Object(doc.fields)) {
        Ok(mut rec) => {
            rec.id = doc.id;
            Some(rec)
        }
        Err(e) => {
            warn!(target: "scores", id = %doc.id, error = %e, "Skipping malformed score record");
            None
        }
    }
}
