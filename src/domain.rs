//! Domain models: the per-browser identifier, the category key shared by
//! question partitions / default data / score tagging, questions and score records.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::QuizError;

/// Number of choices a well-formed authored question carries.
pub const CHOICES_PER_QUESTION: usize = 4;

/// Opaque per-browser user handle (not a verified identity).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
  /// Accepts any non-blank value that can be used as a single storage path
  /// segment. Surrounding whitespace is dropped.
  pub fn parse(raw: &str) -> Result<Self, QuizError> {
    check_segment(raw, "User identification is missing.").map(Self)
  }

  pub fn from_uuid(id: Uuid) -> Self { Self(id.to_string()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Identifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Category key. The only place category spelling is validated; the same value
/// is used for the default-data lookup, the storage partition and score tagging.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
  /// `"Git"` and `" Git "` are the same category.
  pub fn parse(raw: &str) -> Result<Self, QuizError> {
    check_segment(raw, "Quiz category is missing.").map(Self)
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// The trimmed segment, or why it cannot key a storage path.
fn check_segment(raw: &str, blank_msg: &str) -> Result<String, QuizError> {
  let value = raw.trim();
  if value.is_empty() {
    return Err(QuizError::InvalidArgument(blank_msg.into()));
  }
  if value.contains('/') {
    return Err(QuizError::InvalidArgument(format!("'{}' must not contain '/'.", value)));
  }
  Ok(value.to_string())
}

/// A multiple-choice question as stored under `owners/{identifier}/{category}`.
///
/// Every field defaults so that stored documents are returned as-is, without
/// shape validation; authored input goes through [`QuestionDraft`] instead.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
  #[serde(default)] pub id: String,
  #[serde(default)] pub question: String,
  #[serde(default)] pub choices: Vec<String>,
  #[serde(default)] pub answer: String,
}

impl Question {
  pub fn has_id(&self) -> bool { !self.id.trim().is_empty() }

  /// Exact string equality, no normalization.
  pub fn is_correct(&self, choice: &str) -> bool { self.answer == choice }

  pub fn offers(&self, choice: &str) -> bool { self.choices.iter().any(|c| c == choice) }
}

/// A question as sent by the admin editor. `id` is absent for newly added entries.
#[derive(Clone, Debug, Deserialize)]
pub struct QuestionDraft {
  #[serde(default)] pub id: Option<String>,
  #[serde(default)] pub question: String,
  #[serde(default)] pub choices: Vec<String>,
  #[serde(default)] pub answer: String,
}

impl QuestionDraft {
  /// Authoring-boundary validation. `position` is 1-based for user-facing messages.
  pub fn validate(&self, position: usize) -> Result<(), QuizError> {
    let reject = |msg: String| Err(QuizError::InvalidArgument(msg));
    if self.question.trim().is_empty() {
      return reject(format!("Question {} text cannot be empty.", position));
    }
    if self.choices.len() != CHOICES_PER_QUESTION || self.choices.iter().any(|c| c.trim().is_empty()) {
      return reject(format!("All {} options for question {} must be filled.", CHOICES_PER_QUESTION, position));
    }
    if self.answer.trim().is_empty() {
      return reject(format!("Please select an answer for question {}.", position));
    }
    let trimmed: Vec<&str> = self.choices.iter().map(|c| c.trim()).collect();
    if trimmed.iter().enumerate().any(|(i, c)| trimmed[..i].contains(c)) {
      return reject(format!("The options for question {} must all be different.", position));
    }
    if !trimmed.contains(&self.answer.trim()) {
      return reject(format!(
        "The selected answer for question {} (\"{}\") is not among its options.",
        position, self.answer
      ));
    }
    Ok(())
  }

  /// Trimmed question; `fallback_id` is used when the draft has no usable id.
  pub fn into_question(self, fallback_id: String) -> Question {
    let id = match self.id {
      Some(id) if !id.trim().is_empty() => id,
      _ => fallback_id,
    };
    Question {
      id,
      question: self.question.trim().to_string(),
      choices: self.choices.iter().map(|c| c.trim().to_string()).collect(),
      answer: self.answer.trim().to_string(),
    }
  }
}

/// Append-only score entry in the flat `scores` collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
  #[serde(default)] pub id: String,
  pub identifier: String,
  pub score: u64,
  pub category: String,
  /// Server-assigned, strictly increasing milliseconds since the Unix epoch.
  #[serde(default)] pub created_at: u64,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn draft(choices: &[&str], answer: &str) -> QuestionDraft {
    QuestionDraft {
      id: None,
      question: "What does HTML stand for?".into(),
      choices: choices.iter().map(|c| c.to_string()).collect(),
      answer: answer.into(),
    }
  }

  #[test]
  fn blank_or_nested_keys_are_rejected() {
    assert!(Identifier::parse("  ").is_err());
    assert!(Category::parse("").is_err());
    assert!(Category::parse("a/b").is_err());
    assert_eq!(Category::parse("Web Development").unwrap().as_str(), "Web Development");
  }

  #[test]
  fn surrounding_whitespace_does_not_split_keys() {
    assert_eq!(Category::parse("Git").unwrap(), Category::parse("Git ").unwrap());
    assert_eq!(Category::parse("  Git").unwrap().as_str(), "Git");
    assert_eq!(Identifier::parse(" u1 ").unwrap().as_str(), "u1");
  }

  #[test]
  fn draft_answer_must_be_one_of_the_choices() {
    let ok = draft(&["a", "b", "c", "d"], "c");
    assert!(ok.validate(1).is_ok());

    let err = draft(&["a", "b", "c", "d"], "e").validate(2).unwrap_err();
    assert!(err.to_string().contains("question 2"));
    assert!(draft(&["a", "b", "c"], "a").validate(1).is_err());
    assert!(draft(&["a", "b", "", "d"], "a").validate(1).is_err());
    assert!(draft(&["a", "b", "c", "d"], "").validate(1).is_err());

    let err = draft(&["a", "a", "c", "d"], "a").validate(3).unwrap_err();
    assert!(err.to_string().contains("must all be different"));
    assert!(draft(&["a", "b ", " b", "d"], "a").validate(1).is_err());
  }

  #[test]
  fn draft_keeps_existing_id_and_trims() {
    let mut d = draft(&[" a ", "b", "c", "d"], "a ");
    d.id = Some("g3".into());
    let q = d.into_question("new_1_0".into());
    assert_eq!(q.id, "g3");
    assert_eq!(q.choices[0], "a");
    assert!(q.is_correct("a"));

    let q = draft(&["a", "b", "c", "d"], "a").into_question("new_1_0".into());
    assert_eq!(q.id, "new_1_0");
  }
}
