//! Quiz session state machine.
//!
//! `AwaitingQuestions → InQuestion → AnswerLocked → InQuestion → … → Completed`,
//! with `LoadError` as the terminal state for a quiz that has nothing to play.
//!
//! A session is a plain value: every transition is a method call, and nothing
//! here knows about timers or sockets. The owner feeds it countdown ticks
//! tagged with the question they were armed for; a tick for a question that has
//! already been resolved is a no-op, so an answer and a timeout can never both
//! be accepted for the same question.
//!
//! Timeout policy: when the countdown runs out the question locks as
//! `TimedOut` (no score) and waits for the same explicit `advance` as an
//! answered question.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{Category, Question};

/// Upper bound on questions per session.
pub const MAX_QUESTIONS: usize = 10;

/// Default countdown budget per question.
pub const QUESTION_SECONDS: u32 = 15;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
  Correct,
  Incorrect,
  TimedOut,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Phase {
  AwaitingQuestions,
  InQuestion { remaining: u32 },
  AnswerLocked { outcome: Outcome },
  Completed,
  LoadError,
}

/// What a countdown tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
  /// Stale tick (question already resolved or not current). Nothing changed.
  Ignored,
  Remaining(u32),
  /// The question just locked as unanswered.
  TimedOut,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerResult {
  pub index: usize,
  pub correct: bool,
  pub answer: String,
  pub score: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalScore {
  pub category: Category,
  pub score: u32,
  pub total: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Advance {
  Next { index: usize },
  /// Returned exactly once per session, on the transition into `Completed`.
  Completed(FinalScore),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
  #[error("quiz has no questions to play")]
  LoadError,
  #[error("quiz has not started")]
  NotStarted,
  #[error("question {got} is not the current question ({current})")]
  StaleQuestion { current: usize, got: usize },
  #[error("question {0} has already been answered")]
  AlreadyResolved(usize),
  #[error("'{0}' is not one of the offered choices")]
  UnknownChoice(String),
  #[error("answer the current question before moving on")]
  NotResolved,
  #[error("quiz is already finished")]
  Finished,
}

#[derive(Clone, Debug)]
pub struct QuizSession {
  category: Category,
  questions: Vec<Question>,
  current: usize,
  score: u32,
  budget: u32,
  phase: Phase,
}

impl QuizSession {
  /// New session in `AwaitingQuestions`; lists longer than [`MAX_QUESTIONS`] are cut.
  pub fn new(category: Category, mut questions: Vec<Question>, budget: u32) -> Self {
    if questions.len() > MAX_QUESTIONS {
      warn!(target: "session", given = questions.len(), "Truncating quiz to {} questions", MAX_QUESTIONS);
      questions.truncate(MAX_QUESTIONS);
    }
    Self { category, questions, current: 0, score: 0, budget: budget.max(1), phase: Phase::AwaitingQuestions }
  }

  /// Enter the first question, or `LoadError` when there is nothing to play.
  pub fn begin(&mut self) -> Result<usize, SessionError> {
    match self.phase {
      Phase::AwaitingQuestions => {}
      Phase::LoadError => return Err(SessionError::LoadError),
      _ => return Ok(self.current),
    }
    if self.questions.is_empty() {
      warn!(target: "session", category = %self.category, "No questions; session cannot start");
      self.phase = Phase::LoadError;
      return Err(SessionError::LoadError);
    }
    info!(target: "session", category = %self.category, total = self.questions.len(), "Quiz started");
    self.phase = Phase::InQuestion { remaining: self.budget };
    Ok(self.current)
  }

  /// Accept the player's choice for question `index`. Only the first
  /// resolution of a question counts.
  pub fn answer(&mut self, index: usize, choice: &str) -> Result<AnswerResult, SessionError> {
    self.check_current(index)?;
    let question = &self.questions[self.current];
    if !question.offers(choice) {
      return Err(SessionError::UnknownChoice(choice.to_string()));
    }
    let correct = question.is_correct(choice);
    let answer = question.answer.clone();
    if correct {
      self.score += 1;
    }
    self.phase = Phase::AnswerLocked { outcome: if correct { Outcome::Correct } else { Outcome::Incorrect } };
    debug!(target: "session", index, correct, score = self.score, "Answer accepted");
    Ok(AnswerResult { index, correct, answer, score: self.score })
  }

  /// One elapsed second of the countdown armed for question `index`.
  pub fn tick(&mut self, index: usize) -> Tick {
    if index != self.current {
      return Tick::Ignored;
    }
    let Phase::InQuestion { remaining } = self.phase else {
      return Tick::Ignored;
    };
    let remaining = remaining.saturating_sub(1);
    if remaining > 0 {
      self.phase = Phase::InQuestion { remaining };
      return Tick::Remaining(remaining);
    }
    self.phase = Phase::AnswerLocked { outcome: Outcome::TimedOut };
    debug!(target: "session", index, "Question timed out");
    Tick::TimedOut
  }

  /// Move past a resolved question: the next question, or `Completed` after the last one.
  pub fn advance(&mut self) -> Result<Advance, SessionError> {
    match self.phase {
      Phase::AnswerLocked { .. } => {}
      Phase::InQuestion { .. } => return Err(SessionError::NotResolved),
      Phase::Completed => return Err(SessionError::Finished),
      Phase::AwaitingQuestions => return Err(SessionError::NotStarted),
      Phase::LoadError => return Err(SessionError::LoadError),
    }
    if self.current + 1 < self.questions.len() {
      self.current += 1;
      self.phase = Phase::InQuestion { remaining: self.budget };
      return Ok(Advance::Next { index: self.current });
    }
    self.phase = Phase::Completed;
    info!(target: "session", category = %self.category, score = self.score, total = self.questions.len(), "Quiz completed");
    Ok(Advance::Completed(FinalScore {
      category: self.category.clone(),
      score: self.score,
      total: self.questions.len(),
    }))
  }

  fn check_current(&self, index: usize) -> Result<(), SessionError> {
    match self.phase {
      Phase::InQuestion { .. } if index == self.current => Ok(()),
      Phase::InQuestion { .. } => Err(SessionError::StaleQuestion { current: self.current, got: index }),
      Phase::AnswerLocked { .. } if index == self.current => Err(SessionError::AlreadyResolved(index)),
      Phase::AnswerLocked { .. } => Err(SessionError::StaleQuestion { current: self.current, got: index }),
      Phase::Completed => Err(SessionError::Finished),
      Phase::AwaitingQuestions => Err(SessionError::NotStarted),
      Phase::LoadError => Err(SessionError::LoadError),
    }
  }

  pub fn phase(&self) -> &Phase { &self.phase }
  pub fn category(&self) -> &Category { &self.category }
  pub fn score(&self) -> u32 { self.score }
  pub fn total(&self) -> usize { self.questions.len() }
  pub fn current_index(&self) -> usize { self.current }
  pub fn budget(&self) -> u32 { self.budget }

  /// The question currently on screen (also while locked).
  pub fn current_question(&self) -> Option<&Question> {
    match self.phase {
      Phase::InQuestion { .. } | Phase::AnswerLocked { .. } => self.questions.get(self.current),
      _ => None,
    }
  }
}
