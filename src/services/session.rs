//! Session lifecycle: create, setup, snapshot, reset.
//!
//! DESIGN
//! ======
//! A session moves `Setup -> Interviewing` here and never back; the only
//! way out of any later phase is a reset, which removes the session from
//! the map entirely. Completing setup is what the original called "opening
//! the conversational session": the interviewer persona instruction is
//! built once from the profile and replayed on every model call.

use uuid::Uuid;

use crate::state::{AppState, InterviewSession, Phase, Profile, Turn};

pub const NAME_MAX_CHARS: usize = 40;
pub const EXPERIENCE_MAX_CHARS: usize = 200;
pub const SKILLS_MAX_CHARS: usize = 200;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(Uuid),
    #[error("{field} exceeds {max} characters")]
    FieldTooLong { field: &'static str, max: usize },
    #[error("interview already started; profile is immutable")]
    AlreadyStarted,
    #[error("LLM not configured")]
    LlmNotConfigured,
}

impl crate::error::ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_SESSION_NOT_FOUND",
            Self::FieldTooLong { .. } => "E_FIELD_TOO_LONG",
            Self::AlreadyStarted => "E_ALREADY_STARTED",
            Self::LlmNotConfigured => "E_LLM_NOT_CONFIGURED",
        }
    }
}

/// Read-only view of a session returned to the client.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub phase: Phase,
    pub setup_complete: bool,
    pub chat_complete: bool,
    pub feedback_shown: bool,
    pub user_message_count: u32,
    pub messages: Vec<Turn>,
}

impl SessionSnapshot {
    fn of(session: &InterviewSession) -> Self {
        Self {
            id: session.id,
            phase: session.phase,
            setup_complete: session.phase != Phase::Setup,
            chat_complete: matches!(session.phase, Phase::Capped | Phase::Feedback),
            feedback_shown: session.phase == Phase::Feedback,
            user_message_count: session.user_message_count,
            messages: session.messages.clone(),
        }
    }
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Create a fresh session in `Setup` phase, returning its id.
pub async fn create_session(state: &AppState) -> Uuid {
    let id = Uuid::new_v4();
    state.sessions.write().await.insert(id, InterviewSession::new(id));
    id
}

/// Return a snapshot of the session.
///
/// # Errors
///
/// Returns `NotFound` if the id is unknown.
pub async fn snapshot(state: &AppState, id: Uuid) -> Result<SessionSnapshot, SessionError> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or(SessionError::NotFound(id))?;
    Ok(SessionSnapshot::of(session))
}

/// Discard the entire session. Idempotent: resetting an unknown id is a
/// no-op, since the end state (no session) is the same.
pub async fn reset(state: &AppState, id: Uuid) {
    state.sessions.write().await.remove(&id);
}

// =============================================================================
// SETUP
// =============================================================================

/// Build the interviewer persona instruction. Interpolates all six profile
/// fields verbatim; wording is load-bearing for the interview register.
#[must_use]
pub fn system_instruction(profile: &Profile) -> String {
    format!(
        "You are an HR executive that interviews an interviewee called {} \
         with experience {} and skills {}. \
         You should interview him for the position {} {} \
         at the company {}. \
         Start the interview by greeting the candidate and asking them to introduce themselves.",
        profile.name,
        profile.experience,
        profile.skills,
        profile.level.as_str(),
        profile.position.as_str(),
        profile.company.as_str(),
    )
}

fn validate_profile(profile: &Profile) -> Result<(), SessionError> {
    let caps = [
        ("name", profile.name.as_str(), NAME_MAX_CHARS),
        ("experience", profile.experience.as_str(), EXPERIENCE_MAX_CHARS),
        ("skills", profile.skills.as_str(), SKILLS_MAX_CHARS),
    ];
    for (field, value, max) in caps {
        if value.chars().count() > max {
            return Err(SessionError::FieldTooLong { field, max });
        }
    }
    Ok(())
}

/// Complete setup: validate the profile, store it, build the system
/// instruction, and move the session to `Interviewing`.
///
/// On any error the phase stays `Setup` and the submission may be retried.
///
/// # Errors
///
/// Returns `FieldTooLong` on cap violations, `AlreadyStarted` outside the
/// `Setup` phase, and `LlmNotConfigured` when no provider client exists
/// (missing or invalid credentials at boot).
pub async fn complete_setup(state: &AppState, id: Uuid, profile: Profile) -> Result<SessionSnapshot, SessionError> {
    validate_profile(&profile)?;

    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
    if session.phase != Phase::Setup {
        return Err(SessionError::AlreadyStarted);
    }
    if state.llm.is_none() {
        return Err(SessionError::LlmNotConfigured);
    }

    session.system_instruction = Some(system_instruction(&profile));
    session.profile = Some(profile);
    session.messages.clear();
    session.phase = Phase::Interviewing;
    tracing::info!(session_id = %id, "interview setup complete");

    Ok(SessionSnapshot::of(session))
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
