//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Question, ScoreRecord};

/// Messages the client can send over the quiz WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Start {
        category: String,
    },
    Answer {
        index: usize,
        choice: String,
    },
    Next,
    Quit,
}

/// Messages the server sends back over the quiz WebSocket.
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Question {
        index: usize,
        total: usize,
        remaining: u32,
        question: QuestionOut,
    },
    Tick {
        index: usize,
        remaining: u32,
    },
    AnswerResult {
        index: usize,
        correct: bool,
        answer: String,
        score: u32,
    },
    /// Countdown ran out; `answer` is revealed and `next` is unlocked.
    TimedOut {
        index: usize,
        answer: String,
        score: u32,
    },
    Completed {
        category: String,
        score: u32,
        total: usize,
    },
    ScoreSaved {
        id: String,
    },
    ScoreNotSaved {
        message: String,
    },
    Error {
        message: String,
    },
}

/// A question as shown while it is being played (no answer).
#[derive(Debug, Serialize, PartialEq)]
pub struct QuestionOut {
    pub id: String,
    pub question: String,
    pub choices: Vec<String>,
}

pub fn to_out(q: &Question) -> QuestionOut {
    QuestionOut {
        id: q.id.clone(),
        question: q.question.clone(),
        choices: q.choices.clone(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct IdentityOut {
    pub uid: String,
}

#[derive(Serialize)]
pub struct QuestionsOut {
    pub category: String,
    pub questions: Vec<Question>,
}

#[derive(Serialize)]
pub struct SavedOut {
    pub saved: usize,
    pub message: String,
}

#[derive(Deserialize)]
pub struct ScoreIn {
    pub score: i64,
    pub category: String,
}

#[derive(Serialize)]
pub struct ScoreIdOut {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct TopScoreQuery {
    pub category: String,
}

#[derive(Serialize)]
pub struct TopScoreOut {
    pub score: Option<ScoreRecord>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub category: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct LeaderboardOut {
    pub scores: Vec<ScoreRecord>,
}

#[derive(Serialize)]
pub struct CategoriesOut {
    pub categories: Vec<String>,
}
