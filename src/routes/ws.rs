//! WebSocket upgrade + quiz play loop.
//!
//! One connection owns one [`SessionDriver`]. Client commands and countdown
//! ticks are multiplexed with `select!`, so they are handled strictly one at a
//! time and every resulting message is sent before the next event is looked at.

use std::sync::Arc;

use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  http::HeaderMap,
  response::Response,
};
use tracing::{debug, error, info, instrument};

use crate::domain::{Category, Identifier, Question};
use crate::error::QuizError;
use crate::identity::{with_cookie, Resolved};
use crate::logic::{prepare_quiz, SessionDriver};
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
  let Resolved { identifier, issued } = state.identity.resolve(&headers);
  info!(target: "session", %identifier, "WebSocket upgrade requested");
  with_cookie(issued, ws.on_upgrade(move |socket| handle_ws(socket, state, identifier)))
}

#[instrument(level = "info", skip(socket, state), fields(%identifier))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>, identifier: Identifier) {
  info!(target: "session", "WebSocket connected");
  let mut driver = SessionDriver::new(identifier.clone(), state.scores.clone(), state.config.quiz.question_seconds);

  loop {
    let replies = tokio::select! {
      incoming = socket.recv() => match incoming {
        Some(Ok(Message::Text(txt))) => match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(msg) => {
            debug!(target: "session", "WS received: {:?}", &msg);
            handle_client_ws(msg, &state, &identifier, &mut driver).await
          }
          Err(e) => vec![ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }],
        },
        Some(Ok(Message::Ping(payload))) => {
          let _ = socket.send(Message::Pong(payload)).await;
          continue;
        }
        Some(Ok(Message::Close(_))) | None => break,
        Some(Ok(_)) => continue,
        Some(Err(e)) => {
          error!(target: "session", error = %e, "WS receive error");
          break;
        }
      },
      index = driver.next_tick() => driver.on_tick(index),
    };

    if send_all(&mut socket, replies).await.is_err() {
      break;
    }
  }

  driver.quit();
  info!(target: "session", "WebSocket disconnected");
}

/// `quit` abandons the running quiz but keeps the connection open.
async fn handle_client_ws(
  msg: ClientWsMessage,
  state: &AppState,
  identifier: &Identifier,
  driver: &mut SessionDriver,
) -> Vec<ServerWsMessage> {
  match msg {
    ClientWsMessage::Ping => vec![ServerWsMessage::Pong],

    ClientWsMessage::Start { category } => match load_quiz(state, identifier, &category).await {
      Ok((category, questions)) => {
        info!(target: "session", %category, count = questions.len(), "Quiz started");
        driver.start(category, questions)
      }
      Err(e) => vec![ServerWsMessage::Error { message: e.user_message() }],
    },

    ClientWsMessage::Answer { index, choice } => driver.answer(index, &choice),

    ClientWsMessage::Next => driver.next().await,

    ClientWsMessage::Quit => {
      driver.quit();
      Vec::new()
    }
  }
}

async fn load_quiz(
  state: &AppState,
  identifier: &Identifier,
  category: &str,
) -> Result<(Category, Vec<Question>), QuizError> {
  let category = Category::parse(category)?;
  let questions = prepare_quiz(&state.bank, identifier, &category, state.config.quiz.questions_per_quiz).await?;
  Ok((category, questions))
}

async fn send_all(socket: &mut WebSocket, replies: Vec<ServerWsMessage>) -> Result<(), axum::Error> {
  for reply in replies {
    let out = serde_json::to_string(&reply).unwrap_or_else(|e| {
      serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
    });
    if let Err(e) = socket.send(Message::Text(out)).await {
      error!(target: "session", error = %e, "WS send error");
      return Err(e);
    }
  }
  Ok(())
}
