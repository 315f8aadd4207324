//! HTTP endpoint handlers. These are thin wrappers over the bank, the score
//! repository and quiz preparation. Every handler resolves the caller's
//! identifier first and attaches the identity cookie when one was just issued.

use std::sync::Arc;

use axum::{
  extract::{Path, Query, State},
  http::HeaderMap,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument};

use crate::domain::{Category, Question, QuestionDraft};
use crate::error::QuizError;
use crate::identity::{with_cookie, Resolved};
use crate::logic::prepare_quiz;
use crate::protocol::*;
use crate::scores::ScoreFilter;
use crate::state::AppState;
use crate::util::unix_millis;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip_all)]
pub async fn http_get_identity(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
  let Resolved { identifier, issued } = state.identity.resolve(&headers);
  with_cookie(issued, Json(IdentityOut { uid: identifier.to_string() }))
}

#[instrument(level = "info", skip(state, headers))]
pub async fn http_get_questions(
  State(state): State<Arc<AppState>>,
  Path(category): Path<String>,
  headers: HeaderMap,
) -> Response {
  let Resolved { identifier, issued } = state.identity.resolve(&headers);
  let result = async {
    let category = Category::parse(&category)?;
    let questions = state.bank.fetch_questions(&identifier, &category).await?;
    Ok::<_, QuizError>(Json(QuestionsOut { category: category.to_string(), questions }))
  }
  .await;
  with_cookie(issued, result)
}

/// Saves the editor's list. Drafts are validated as a whole before anything is
/// written; new entries get a `new_{millis}_{index}` id.
#[instrument(level = "info", skip(state, headers, drafts), fields(count = drafts.len()))]
pub async fn http_put_questions(
  State(state): State<Arc<AppState>>,
  Path(category): Path<String>,
  headers: HeaderMap,
  Json(drafts): Json<Vec<QuestionDraft>>,
) -> Response {
  let Resolved { identifier, issued } = state.identity.resolve(&headers);
  let result = async {
    let category = Category::parse(&category)?;
    for (i, draft) in drafts.iter().enumerate() {
      draft.validate(i + 1)?;
    }
    let stamp = unix_millis();
    let questions: Vec<Question> = drafts
      .into_iter()
      .enumerate()
      .map(|(i, d)| d.into_question(format!("new_{}_{}", stamp, i)))
      .collect();
    let saved = state.bank.upsert_questions(&identifier, &category, &questions).await?;
    info!(target: "bank", %category, saved, "Questions saved from editor");
    Ok::<_, QuizError>(Json(SavedOut { saved, message: "Questions saved successfully!".into() }))
  }
  .await;
  with_cookie(issued, result)
}

/// A playable quiz: up to `questions_per_quiz` questions in random order.
#[instrument(level = "info", skip(state, headers))]
pub async fn http_get_quiz(
  State(state): State<Arc<AppState>>,
  Path(category): Path<String>,
  headers: HeaderMap,
) -> Response {
  let Resolved { identifier, issued } = state.identity.resolve(&headers);
  let result = async {
    let category = Category::parse(&category)?;
    let questions = prepare_quiz(&state.bank, &identifier, &category, state.config.quiz.questions_per_quiz).await?;
    if questions.is_empty() {
      return Err(QuizError::LoadError);
    }
    Ok::<_, QuizError>(Json(QuestionsOut { category: category.to_string(), questions }))
  }
  .await;
  with_cookie(issued, result)
}

#[instrument(level = "info", skip(state, headers, body), fields(score = body.score, category = %body.category))]
pub async fn http_post_score(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(body): Json<ScoreIn>,
) -> Response {
  let Resolved { identifier, issued } = state.identity.resolve(&headers);
  let result = async {
    let category = Category::parse(&body.category)?;
    let id = state.scores.record_score(&identifier, body.score, &category).await?;
    Ok::<_, QuizError>(Json(ScoreIdOut { id }))
  }
  .await;
  with_cookie(issued, result)
}

#[instrument(level = "info", skip(state, headers), fields(category = %q.category))]
pub async fn http_get_top_score(
  State(state): State<Arc<AppState>>,
  Query(q): Query<TopScoreQuery>,
  headers: HeaderMap,
) -> Response {
  let Resolved { identifier, issued } = state.identity.resolve(&headers);
  let result = async {
    let category = Category::parse(&q.category)?;
    let score = state.scores.top_score_for(&identifier, &category).await?;
    Ok::<_, QuizError>(Json(TopScoreOut { score }))
  }
  .await;
  with_cookie(issued, result)
}

#[instrument(level = "info", skip(state, headers))]
pub async fn http_get_leaderboard(
  State(state): State<Arc<AppState>>,
  Query(q): Query<LeaderboardQuery>,
  headers: HeaderMap,
) -> Response {
  let Resolved { issued, .. } = state.identity.resolve(&headers);
  let result = async {
    let category = q.category.as_deref().map(Category::parse).transpose()?;
    let filter = ScoreFilter { category, limit: q.limit.unwrap_or(state.config.quiz.leaderboard_limit) };
    let scores = state.scores.top_scores(&filter).await?;
    Ok::<_, QuizError>(Json(LeaderboardOut { scores }))
  }
  .await;
  with_cookie(issued, result)
}

#[instrument(level = "info", skip_all)]
pub async fn http_get_categories(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
  let Resolved { issued, .. } = state.identity.resolve(&headers);
  let result = state
    .scores
    .list_categories()
    .await
    .map(|set| Json(CategoriesOut { categories: set.into_iter().collect() }));
  with_cookie(issued, result)
}
