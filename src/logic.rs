//! Core behaviors shared by the HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Preparing a quiz (fetch the owner's questions, sample a subset)
//!   - Driving one quiz session: countdown, answers, advancing, score recording

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::bank::QuestionBank;
use crate::domain::{Category, Identifier, Question};
use crate::error::QuizError;
use crate::protocol::{to_out, ServerWsMessage};
use crate::scores::ScoreRepository;
use crate::select::select_subset;
use crate::session::{Advance, FinalScore, Phase, QuizSession, Tick};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Fetch (seeding if needed) the owner's questions and sample `count` of them.
#[instrument(level = "info", skip(bank), fields(%identifier, %category))]
pub async fn prepare_quiz(
    bank: &QuestionBank,
    identifier: &Identifier,
    category: &Category,
    count: usize,
) -> Result<Vec<Question>, QuizError> {
    let pool = bank.fetch_questions(identifier, category).await?;
    let picked = select_subset(&pool, count);
    debug!(target: "session", pool = pool.len(), picked = picked.len(), "Quiz questions sampled");
    Ok(picked)
}

/// Countdown armed for one question.
struct Countdown {
    index: usize,
    interval: Interval,
}

impl Countdown {
    fn arm(index: usize) -> Self {
        let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { index, interval }
    }
}

/// Owns one player's quiz session and its countdown. Commands and ticks are
/// fed in one at a time by the connection task.
///
/// The countdown only exists while the session is `InQuestion`: it is dropped
/// on answer, on timeout, on quit and when the driver itself is dropped.
pub struct SessionDriver {
    identifier: Identifier,
    scores: ScoreRepository,
    budget: u32,
    session: Option<QuizSession>,
    countdown: Option<Countdown>,
}

impl SessionDriver {
    pub fn new(identifier: Identifier, scores: ScoreRepository, budget: u32) -> Self {
        Self { identifier, scores, budget, session: None, countdown: None }
    }

    /// Replace any running session with a new one over `questions`.
    pub fn start(&mut self, category: Category, questions: Vec<Question>) -> Vec<ServerWsMessage> {
        self.countdown = None;
        let mut session = QuizSession::new(category, questions, self.budget);
        let reply = match session.begin() {
            Ok(index) => {
                self.countdown = Some(Countdown::arm(index));
                question_message(&session)
            }
            Err(e) => {
                warn!(target: "session", error = %e, "Quiz could not start");
                error_message(QuizError::LoadError.user_message())
            }
        };
        self.session = Some(session);
        vec![reply]
    }

    pub fn answer(&mut self, index: usize, choice: &str) -> Vec<ServerWsMessage> {
        let Some(session) = self.session.as_mut() else {
            return vec![no_session()];
        };
        match session.answer(index, choice) {
            Ok(r) => {
                self.countdown = None;
                vec![ServerWsMessage::AnswerResult { index: r.index, correct: r.correct, answer: r.answer, score: r.score }]
            }
            Err(e) => vec![error_message(e.to_string())],
        }
    }

    /// Resolves on the next countdown tick and yields the question it was armed
    /// for. Never resolves while no countdown is armed.
    pub async fn next_tick(&mut self) -> usize {
        match self.countdown.as_mut() {
            Some(c) => {
                c.interval.tick().await;
                c.index
            }
            None => std::future::pending().await,
        }
    }

    pub fn on_tick(&mut self, index: usize) -> Vec<ServerWsMessage> {
        let Some(session) = self.session.as_mut() else {
            self.countdown = None;
            return Vec::new();
        };
        match session.tick(index) {
            Tick::Remaining(remaining) => vec![ServerWsMessage::Tick { index, remaining }],
            Tick::TimedOut => {
                self.countdown = None;
                let answer = session.current_question().map(|q| q.answer.clone()).unwrap_or_default();
                vec![ServerWsMessage::TimedOut { index, answer, score: session.score() }]
            }
            Tick::Ignored => {
                debug!(target: "session", index, "Stale countdown tick ignored");
                self.countdown = None;
                Vec::new()
            }
        }
    }

    /// Advance past a resolved question. Entering `Completed` records the score once.
    pub async fn next(&mut self) -> Vec<ServerWsMessage> {
        let Some(session) = self.session.as_mut() else {
            return vec![no_session()];
        };
        match session.advance() {
            Ok(Advance::Next { index }) => {
                self.countdown = Some(Countdown::arm(index));
                vec![question_message(session)]
            }
            Ok(Advance::Completed(result)) => {
                self.countdown = None;
                let completed = ServerWsMessage::Completed {
                    category: result.category.to_string(),
                    score: result.score,
                    total: result.total,
                };
                vec![completed, self.record(&result).await]
            }
            Err(e) => vec![error_message(e.to_string())],
        }
    }

    pub fn quit(&mut self) {
        if let Some(session) = self.session.take() {
            if !matches!(session.phase(), Phase::Completed) {
                info!(target: "session", identifier = %self.identifier, category = %session.category(), score = session.score(), "Quiz abandoned");
            }
        }
        self.countdown = None;
    }

    /// Failures are reported, not retried; the session stays completed.
    async fn record(&self, result: &FinalScore) -> ServerWsMessage {
        match self.scores.record_score(&self.identifier, i64::from(result.score), &result.category).await {
            Ok(id) => ServerWsMessage::ScoreSaved { id },
            Err(e) => {
                warn!(target: "session", error = %e, "Final score not saved");
                ServerWsMessage::ScoreNotSaved { message: "Your score could not be saved. Please try again later.".into() }
            }
        }
    }

    #[cfg(test)]
    fn countdown_armed(&self) -> bool {
        self.countdown.is_some()
    }
}

fn question_message(session: &QuizSession) -> ServerWsMessage {
    match session.current_question() {
        Some(q) => ServerWsMessage::Question {
            index: session.current_index(),
            total: session.total(),
            remaining: session.budget(),
            question: to_out(q),
        },
        None => error_message("No question is active.".into()),
    }
}

fn no_session() -> ServerWsMessage {
    error_message("No quiz in progress. Start one first.".into())
}

fn error_message(message: String) -> ServerWsMessage {
    ServerWsMessage::Error { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, MemoryStore, SCORES_COLLECTION};
    use std::sync::Arc;

    fn questions(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| Question {
                id: format!("g{i}"),
                question: format!("q{i}"),
                choices: vec![format!("ok{i}"), "x".into(), "y".into(), "z".into()],
                answer: format!("ok{i}"),
            })
            .collect()
    }

    fn driver(budget: u32) -> (Arc<MemoryStore>, SessionDriver) {
        let store = Arc::new(MemoryStore::new());
        let scores = ScoreRepository::new(store.clone());
        let d = SessionDriver::new(Identifier::parse("u1").unwrap(), scores, budget);
        (store, d)
    }

    fn git() -> Category {
        Category::parse("Git").unwrap()
    }

    async fn saved_scores(store: &MemoryStore) -> Vec<i64> {
        store
            .get(SCORES_COLLECTION)
            .await
            .unwrap()
            .iter()
            .map(|d| d.fields["score"].as_i64().unwrap())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn perfect_run_records_once() {
        let (store, mut d) = driver(15);
        let first = d.start(git(), questions(3));
        assert!(matches!(first[0], ServerWsMessage::Question { index: 0, total: 3, remaining: 15, .. }));

        for i in 0..3 {
            let out = d.answer(i, &format!("ok{i}"));
            assert!(matches!(out[0], ServerWsMessage::AnswerResult { correct: true, .. }));
            assert!(!d.countdown_armed());
            d.next().await;
        }
        assert_eq!(saved_scores(&store).await, vec![3]);

        let again = d.next().await;
        assert!(matches!(again[0], ServerWsMessage::Error { .. }));
        assert_eq!(saved_scores(&store).await, vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_reports_score_and_save() {
        let (_, mut d) = driver(15);
        d.start(git(), questions(1));
        d.answer(0, "x");
        let out = d.next().await;
        assert_eq!(out[0], ServerWsMessage::Completed { category: "Git".into(), score: 0, total: 1 });
        assert!(matches!(out[1], ServerWsMessage::ScoreSaved { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_times_out_and_session_still_completes() {
        let (store, mut d) = driver(3);
        d.start(git(), questions(2));

        let mut seen = Vec::new();
        loop {
            let index = d.next_tick().await;
            let out = d.on_tick(index);
            let done = matches!(out[0], ServerWsMessage::TimedOut { .. });
            seen.extend(out);
            if done {
                break;
            }
        }
        assert_eq!(
            seen,
            vec![
                ServerWsMessage::Tick { index: 0, remaining: 2 },
                ServerWsMessage::Tick { index: 0, remaining: 1 },
                ServerWsMessage::TimedOut { index: 0, answer: "ok0".into(), score: 0 },
            ]
        );
        assert!(!d.countdown_armed());
        assert!(matches!(d.answer(0, "ok0")[0], ServerWsMessage::Error { .. }));

        d.next().await;
        assert!(d.countdown_armed());
        d.answer(1, "ok1");
        d.next().await;
        assert_eq!(saved_scores(&store).await, vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_after_answer_never_double_counts() {
        let (_, mut d) = driver(15);
        d.start(git(), questions(2));
        d.answer(0, "ok0");
        assert!(d.on_tick(0).is_empty());
        assert!(d.on_tick(0).is_empty());
        let out = d.next().await;
        assert!(matches!(out[0], ServerWsMessage::Question { index: 1, .. }));
        let out = d.answer(1, "ok1");
        assert!(matches!(out[0], ServerWsMessage::AnswerResult { score: 2, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_quiz_is_a_load_error() {
        let (store, mut d) = driver(15);
        let out = d.start(git(), Vec::new());
        assert!(matches!(out[0], ServerWsMessage::Error { .. }));
        assert!(!d.countdown_armed());
        assert!(matches!(d.next().await[0], ServerWsMessage::Error { .. }));
        assert!(saved_scores(&store).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_keeps_session_completed() {
        let (store, mut d) = driver(15);
        d.start(git(), questions(1));
        d.answer(0, "ok0");
        store.set_unavailable(true);
        let out = d.next().await;
        assert!(matches!(out[0], ServerWsMessage::Completed { score: 1, .. }));
        assert!(matches!(out[1], ServerWsMessage::ScoreNotSaved { .. }));
        store.set_unavailable(false);
        assert!(matches!(d.next().await[0], ServerWsMessage::Error { .. }));
        assert!(saved_scores(&store).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn quit_disarms_and_forgets_the_session() {
        let (_, mut d) = driver(15);
        d.start(git(), questions(2));
        assert!(d.countdown_armed());
        d.quit();
        assert!(!d.countdown_armed());
        assert!(matches!(d.answer(0, "ok0")[0], ServerWsMessage::Error { .. }));
    }

    #[tokio::test]
    async fn prepare_quiz_samples_from_seeded_pool() {
        use crate::defaults::DefaultsSource;
        let store = Arc::new(MemoryStore::new());
        let bank = QuestionBank::new(store, Arc::new(DefaultsSource::Embedded));
        let uid = Identifier::parse("u1").unwrap();
        let picked = prepare_quiz(&bank, &uid, &Category::parse("Web Development").unwrap(), 3).await.unwrap();
        assert_eq!(picked.len(), 3);
        let all = prepare_quiz(&bank, &uid, &git(), 10).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
