//! Interview loop: user turn exchange with streamed replies.
//!
//! DESIGN
//! ======
//! Each accepted submission appends the user turn, increments the counter,
//! and applies the cap transition in one critical section, then (for the
//! first four turns only) streams a model reply through an event channel
//! consumed by the SSE handler. The session lock is never held across a
//! provider call: the exchange snapshots the history, streams, then
//! re-locks to commit the assistant turn.
//!
//! The fifth turn is stored and displayed but never sent to the model; the
//! count reaching the cap flips the session to `Capped` before the
//! exchange task runs, so rapid submissions cannot overrun the cap. The
//! counter increments even when the provider call fails, so the cap stays
//! reachable through errors.

use std::sync::{Arc, OnceLock};

use futures::StreamExt;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::llm::LlmChat;
use crate::llm::types::{LlmError, Message};
use crate::services::session::SessionError;
use crate::state::{ANSWERED_TURN_COUNT, AppState, Phase, Role, Turn, USER_TURN_CAP};

pub const MESSAGE_MAX_CHARS: usize = 1000;

const DEFAULT_INTERVIEW_MAX_TOKENS: u32 = 1024;
const EVENT_CHANNEL_CAPACITY: usize = 32;

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn interview_max_tokens() -> u32 {
    static VALUE: OnceLock<u32> = OnceLock::new();
    *VALUE.get_or_init(|| env_parse("INTERVIEW_MAX_TOKENS", DEFAULT_INTERVIEW_MAX_TOKENS))
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum InterviewError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("interview not accepting messages in phase {0}")]
    NotAccepting(Phase),
    #[error("message is empty")]
    EmptyMessage,
    #[error("message exceeds {MESSAGE_MAX_CHARS} characters")]
    MessageTooLong,
    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl ErrorCode for InterviewError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Session(e) => e.error_code(),
            Self::NotAccepting(_) => "E_NOT_ACCEPTING",
            Self::EmptyMessage => "E_EMPTY_MESSAGE",
            Self::MessageTooLong => "E_MESSAGE_TOO_LONG",
            Self::Llm(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Session(e) => e.retryable(),
            Self::Llm(e) => e.retryable(),
            _ => false,
        }
    }
}

/// One event in the exchange stream forwarded to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeEvent {
    /// One incremental chunk of the streamed reply.
    Delta { text: String },
    /// The assistant turn was committed with the full accumulated text.
    Completed { text: String },
    /// The cap was reached; the session is now `Capped`.
    Capped,
    /// The provider call failed; the user turn stays in the log but no
    /// assistant turn was committed.
    Failed { code: &'static str, message: String, retryable: bool },
}

impl ExchangeEvent {
    /// SSE event name for this variant.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Delta { .. } => "delta",
            Self::Completed { .. } => "completed",
            Self::Capped => "capped",
            Self::Failed { .. } => "error",
        }
    }
}

// =============================================================================
// SUBMIT
// =============================================================================

/// Accept a user submission and start the exchange.
///
/// Validates, then appends the user turn, increments the count, and flips
/// the phase to `Capped` on the fifth acceptance, all synchronously; a
/// rejection (wrong phase, empty or over-long text) commits nothing. The
/// streamed part of the exchange runs in a spawned task and reports
/// through the returned receiver. The channel closes after the terminal
/// event.
///
/// # Errors
///
/// Returns `NotFound`, `NotAccepting`, `EmptyMessage`, or `MessageTooLong`
/// before any state is mutated.
pub async fn submit_message(
    state: &AppState,
    session_id: Uuid,
    text: &str,
) -> Result<mpsc::Receiver<ExchangeEvent>, InterviewError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(InterviewError::EmptyMessage);
    }
    if text.chars().count() > MESSAGE_MAX_CHARS {
        return Err(InterviewError::MessageTooLong);
    }

    let (system, history, answered, capped) = {
        let mut sessions = state.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;
        if session.phase != Phase::Interviewing {
            return Err(InterviewError::NotAccepting(session.phase));
        }

        session.messages.push(Turn { role: Role::User, text: text.to_string() });

        // Pre-increment count decides the model call: turns 1..=4 get a
        // reply, the final turn is stored only.
        let answered = session.user_message_count < ANSWERED_TURN_COUNT;

        // The count and the cap transition commit here, inside the same
        // critical section that accepted the turn. A back-to-back
        // submission then sees `Capped` and is rejected instead of
        // overrunning the cap while the exchange task is still pending.
        session.user_message_count += 1;
        let capped = session.user_message_count >= USER_TURN_CAP;
        if capped {
            session.phase = Phase::Capped;
            tracing::info!(session_id = %session_id, "turn cap reached, interview complete");
        }

        let system = session.system_instruction.clone().unwrap_or_default();
        let history: Vec<Message> = session
            .messages
            .iter()
            .map(|turn| Message { role: turn.role.as_str().to_string(), content: turn.text.clone() })
            .collect();
        (system, history, answered, capped)
    };

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(run_exchange(state.clone(), session_id, system, history, answered, capped, tx));
    Ok(rx)
}

// =============================================================================
// EXCHANGE
// =============================================================================

async fn run_exchange(
    state: AppState,
    session_id: Uuid,
    system: String,
    history: Vec<Message>,
    answered: bool,
    capped: bool,
    tx: mpsc::Sender<ExchangeEvent>,
) {
    if answered {
        match stream_reply(state.llm.clone(), &system, &history, &tx).await {
            Ok(text) => {
                commit_assistant_turn(&state, session_id, text.clone()).await;
                let _ = tx.send(ExchangeEvent::Completed { text }).await;
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "interview reply failed");
                let _ = tx
                    .send(ExchangeEvent::Failed {
                        code: e.error_code(),
                        message: e.to_string(),
                        retryable: e.retryable(),
                    })
                    .await;
            }
        }
    }

    if capped {
        let _ = tx.send(ExchangeEvent::Capped).await;
    }
}

async fn stream_reply(
    llm: Option<Arc<dyn LlmChat>>,
    system: &str,
    history: &[Message],
    tx: &mpsc::Sender<ExchangeEvent>,
) -> Result<String, InterviewError> {
    let llm = llm.ok_or(SessionError::LlmNotConfigured)?;
    let mut stream = llm.stream_chat(interview_max_tokens(), system, history).await?;

    let mut full = String::new();
    let mut forwarding = true;
    while let Some(item) = stream.next().await {
        let chunk = item?;
        full.push_str(&chunk);
        if forwarding && tx.send(ExchangeEvent::Delta { text: chunk }).await.is_err() {
            // Client disconnected; stop forwarding but keep consuming so
            // the committed turn holds the complete reply, not a
            // truncation.
            forwarding = false;
        }
    }
    Ok(full)
}

async fn commit_assistant_turn(state: &AppState, session_id: Uuid, text: String) {
    let mut sessions = state.sessions.write().await;
    if let Some(session) = sessions.get_mut(&session_id) {
        session.messages.push(Turn { role: Role::Assistant, text });
    }
}

#[cfg(test)]
#[path = "interview_test.rs"]
mod tests;
