//! Feedback generation: transcript serialization and scored evaluation.
//!
//! DESIGN
//! ======
//! The evaluation never reuses the interview's conversational context: the
//! transcript is embedded in a fresh, stateless prompt so the evaluator
//! sees the exchange as data, not as a conversation to join. The first
//! result is cached on the session; a regenerate request re-rolls it
//! explicitly instead of paying for a new non-deterministic call on every
//! re-display.

use std::sync::OnceLock;

use uuid::Uuid;

use crate::llm::types::LlmError;
use crate::services::session::SessionError;
use crate::state::{AppState, Phase, Turn};

/// Evaluator persona. The two-line format contract matters: the client
/// renders the result verbatim.
pub const FEEDBACK_SYSTEM_INSTRUCTION: &str = "You are a helpful tool that provides feedback on an interviewee's performance.\n\
Before the Feedback, give a score from 1 to 10.\n\
Follow this exact format:\n\
Overall Score: //Your score\n\
Feedback: //Here you put your feedback\n\
Give only the score and feedback; do not ask any additional questions.\n";

const DEFAULT_FEEDBACK_MAX_TOKENS: u32 = 1024;

fn feedback_max_tokens() -> u32 {
    static VALUE: OnceLock<u32> = OnceLock::new();
    *VALUE.get_or_init(|| {
        std::env::var("FEEDBACK_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_FEEDBACK_MAX_TOKENS)
    })
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("interview is not complete in phase {0}")]
    NotComplete(Phase),
    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl crate::error::ErrorCode for FeedbackError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Session(e) => e.error_code(),
            Self::NotComplete(_) => "E_NOT_COMPLETE",
            Self::Llm(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Session(e) => e.retryable(),
            Self::Llm(e) => e.retryable(),
            Self::NotComplete(_) => false,
        }
    }
}

// =============================================================================
// TRANSCRIPT
// =============================================================================

/// Render every turn as `"<role>: <text>"` joined by newlines, in original
/// order.
#[must_use]
pub fn transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|turn| format!("{}: {}", turn.role.as_str(), turn.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Embed the transcript in the stateless evaluation prompt.
#[must_use]
pub fn evaluation_prompt(transcript: &str) -> String {
    format!(
        "This is the interview you need to evaluate. Keep in mind that you are only a tool \
         and you shouldn't engage in any conversation:\n\n{transcript}"
    )
}

// =============================================================================
// GENERATION
// =============================================================================

/// Return the scored evaluation for a completed interview.
///
/// The first successful call moves the session to `Feedback` and caches
/// the result; later calls return the cache unless `regenerate` is set.
///
/// # Errors
///
/// Returns `NotComplete` before the cap is reached, `LlmNotConfigured`
/// without a provider client, and any provider failure as `Llm`.
pub async fn get_feedback(state: &AppState, id: Uuid, regenerate: bool) -> Result<String, FeedbackError> {
    let turns = {
        let mut sessions = state.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        match session.phase {
            Phase::Capped | Phase::Feedback => {}
            phase => return Err(FeedbackError::NotComplete(phase)),
        }
        session.phase = Phase::Feedback;
        if !regenerate {
            if let Some(cached) = &session.feedback {
                return Ok(cached.clone());
            }
        }
        session.messages.clone()
    };

    let llm = state.llm.clone().ok_or(SessionError::LlmNotConfigured)?;
    let prompt = evaluation_prompt(&transcript(&turns));
    let text = llm
        .generate(feedback_max_tokens(), FEEDBACK_SYSTEM_INSTRUCTION, &prompt)
        .await?;
    tracing::info!(session_id = %id, chars = text.len(), "feedback generated");

    let mut sessions = state.sessions.write().await;
    if let Some(session) = sessions.get_mut(&id) {
        session.feedback = Some(text.clone());
    }
    Ok(text)
}

#[cfg(test)]
#[path = "feedback_test.rs"]
mod tests;
