//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the in-memory session map and the optional LLM client. Each
//! interview session is a self-contained `InterviewSession` keyed by UUID;
//! nothing is persisted, so a reset is just a map removal.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::llm::LlmChat;

/// Fixed limit of accepted user turns per interview.
pub const USER_TURN_CAP: u32 = 5;

/// Number of user turns that receive a generated reply. The final turn is
/// stored and displayed but never sent to the model (cost cap).
pub const ANSWERED_TURN_COUNT: u32 = USER_TURN_CAP - 1;

// =============================================================================
// PROFILE
// =============================================================================

/// Seniority level selected on the setup form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Junior,
    #[serde(rename = "Mid-level")]
    MidLevel,
    Senior,
}

impl Level {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Junior => "Junior",
            Self::MidLevel => "Mid-level",
            Self::Senior => "Senior",
        }
    }
}

/// Target position selected on the setup form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "Data Scientist")]
    DataScientist,
    #[serde(rename = "Data Engineer")]
    DataEngineer,
    #[serde(rename = "ML Engineer")]
    MlEngineer,
    #[serde(rename = "BI Analyst")]
    BiAnalyst,
    #[serde(rename = "Financial Analyst")]
    FinancialAnalyst,
}

impl Position {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataScientist => "Data Scientist",
            Self::DataEngineer => "Data Engineer",
            Self::MlEngineer => "ML Engineer",
            Self::BiAnalyst => "BI Analyst",
            Self::FinancialAnalyst => "Financial Analyst",
        }
    }
}

/// Target company selected on the setup form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Company {
    Amazon,
    Meta,
    Udemy,
    #[serde(rename = "365 Company")]
    Company365,
    Nestle,
    LinkedIn,
    Spotify,
}

impl Company {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Amazon => "Amazon",
            Self::Meta => "Meta",
            Self::Udemy => "Udemy",
            Self::Company365 => "365 Company",
            Self::Nestle => "Nestle",
            Self::LinkedIn => "LinkedIn",
            Self::Spotify => "Spotify",
        }
    }
}

/// Candidate profile captured by the setup form. Immutable once the
/// interview starts; destroyed on reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub experience: String,
    pub skills: String,
    pub level: Level,
    pub position: Position,
    pub company: Company,
}

// =============================================================================
// TURNS AND PHASES
// =============================================================================

/// Speaker of a single interview turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message in the interview log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// Lifecycle position of a session. Transitions only move forward:
/// `Setup -> Interviewing -> Capped -> Feedback`. Reset removes the
/// session entirely rather than rewinding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Setup,
    Interviewing,
    Capped,
    Feedback,
}

impl Phase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Interviewing => "interviewing",
            Self::Capped => "capped",
            Self::Feedback => "feedback",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// All mutable state for one interview session.
#[derive(Debug, Clone)]
pub struct InterviewSession {
    pub id: Uuid,
    pub phase: Phase,
    pub profile: Option<Profile>,
    /// Interviewer persona instruction, set when setup completes. This is
    /// the whole "provider conversational context": every model call replays
    /// it together with the full turn log.
    pub system_instruction: Option<String>,
    pub messages: Vec<Turn>,
    /// Accepted user submissions so far, 0..=USER_TURN_CAP.
    pub user_message_count: u32,
    /// Cached evaluation text. Regenerated only on explicit request.
    pub feedback: Option<String>,
}

impl InterviewSession {
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            phase: Phase::Setup,
            profile: None,
            system_instruction: None,
            messages: Vec::new(),
            user_message_count: 0,
            feedback: None,
        }
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<Uuid, InterviewSession>>>,
    /// Optional LLM client. `None` if LLM env vars are not configured;
    /// setup fails until credentials are provided.
    pub llm: Option<Arc<dyn LlmChat>>,
}

impl AppState {
    #[must_use]
    pub fn new(llm: Option<Arc<dyn LlmChat>>) -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())), llm }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;

    /// Create a test `AppState` without an LLM client.
    #[must_use]
    pub fn test_app_state() -> AppState {
        AppState::new(None)
    }

    /// Create a test `AppState` with a mock LLM.
    #[must_use]
    pub fn test_app_state_with_llm(llm: Arc<dyn LlmChat>) -> AppState {
        AppState::new(Some(llm))
    }

    #[must_use]
    pub fn dummy_profile() -> Profile {
        Profile {
            name: "Ana".into(),
            experience: "3y backend".into(),
            skills: "Go,SQL".into(),
            level: Level::MidLevel,
            position: Position::DataEngineer,
            company: Company::Spotify,
        }
    }

    /// Seed a fresh session in `Setup` phase, returning its id.
    pub async fn seed_session(state: &AppState) -> Uuid {
        let id = Uuid::new_v4();
        state.sessions.write().await.insert(id, InterviewSession::new(id));
        id
    }

    /// Seed a session that already completed setup with [`dummy_profile`].
    pub async fn seed_interviewing(state: &AppState) -> Uuid {
        let id = Uuid::new_v4();
        let mut session = InterviewSession::new(id);
        let profile = dummy_profile();
        session.system_instruction = Some(crate::services::session::system_instruction(&profile));
        session.profile = Some(profile);
        session.phase = Phase::Interviewing;
        state.sessions.write().await.insert(id, session);
        id
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
