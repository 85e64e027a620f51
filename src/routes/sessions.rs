//! Interview session routes.
//!
//! The turn exchange responds as SSE so the client can render the reply
//! incrementally; everything else is plain JSON. Error-to-status mapping
//! lives in pure functions so the tests can hit it directly.

use std::convert::Infallible;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use futures::Stream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::error::ApiError;
use crate::services::feedback::{self, FeedbackError};
use crate::services::interview::{self, ExchangeEvent, InterviewError};
use crate::services::session::{self, SessionError, SessionSnapshot};
use crate::state::{AppState, Profile};

// =============================================================================
// BODIES
// =============================================================================

#[derive(Serialize)]
pub struct CreatedSession {
    pub id: Uuid,
}

#[derive(Deserialize)]
pub struct MessageBody {
    pub text: String,
}

#[derive(Deserialize)]
pub struct FeedbackQuery {
    #[serde(default)]
    pub regenerate: bool,
}

#[derive(Serialize)]
pub struct FeedbackResponse {
    pub feedback: String,
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

fn session_error_status(err: &SessionError) -> StatusCode {
    match err {
        SessionError::NotFound(_) => StatusCode::NOT_FOUND,
        SessionError::FieldTooLong { .. } => StatusCode::BAD_REQUEST,
        SessionError::AlreadyStarted => StatusCode::CONFLICT,
        SessionError::LlmNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn interview_error_status(err: &InterviewError) -> StatusCode {
    match err {
        InterviewError::Session(e) => session_error_status(e),
        InterviewError::NotAccepting(_) => StatusCode::CONFLICT,
        InterviewError::EmptyMessage | InterviewError::MessageTooLong => StatusCode::BAD_REQUEST,
        InterviewError::Llm(_) => StatusCode::BAD_GATEWAY,
    }
}

fn feedback_error_status(err: &FeedbackError) -> StatusCode {
    match err {
        FeedbackError::Session(e) => session_error_status(e),
        FeedbackError::NotComplete(_) => StatusCode::CONFLICT,
        FeedbackError::Llm(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Hint shown with feedback failures, mirroring the original UI copy.
const FEEDBACK_FAILURE_HINT: &str = "The API key may be invalid or a provider error occurred";

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/sessions` — create a fresh session in `Setup` phase.
pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<CreatedSession>) {
    let id = session::create_session(&state).await;
    (StatusCode::CREATED, Json(CreatedSession { id }))
}

/// `GET /api/sessions/:id` — snapshot phase, flags, count, and messages.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = session::snapshot(&state, id)
        .await
        .map_err(|e| ApiError::new(session_error_status(&e), &e))?;
    Ok(Json(snapshot))
}

/// `POST /api/sessions/:id/setup` — submit the profile and start the
/// interview. Enum fields are validated by deserialization of their
/// display strings.
pub async fn complete_setup(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(profile): Json<Profile>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = session::complete_setup(&state, id, profile)
        .await
        .map_err(|e| ApiError::new(session_error_status(&e), &e))?;
    Ok(Json(snapshot))
}

/// `POST /api/sessions/:id/messages` — accept a user turn and stream the
/// exchange as SSE (`delta`, `completed`, `capped`, `error` events).
pub async fn submit_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<MessageBody>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let rx = interview::submit_message(&state, id, &body.text)
        .await
        .map_err(|e| ApiError::new(interview_error_status(&e), &e))?;

    let stream = ReceiverStream::new(rx).map(|event| Ok(sse_event(&event)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// `POST /api/sessions/:id/feedback` — return the scored evaluation,
/// regenerating when `?regenerate=true`.
pub async fn get_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<FeedbackQuery>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let text = feedback::get_feedback(&state, id, query.regenerate)
        .await
        .map_err(|e| match &e {
            FeedbackError::Llm(_) => ApiError::with_hint(feedback_error_status(&e), &e, FEEDBACK_FAILURE_HINT),
            _ => ApiError::new(feedback_error_status(&e), &e),
        })?;
    Ok(Json(FeedbackResponse { feedback: text }))
}

/// `DELETE /api/sessions/:id` — Reset Control: discard the session.
pub async fn reset_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    session::reset(&state, id).await;
    StatusCode::NO_CONTENT
}

// =============================================================================
// SSE
// =============================================================================

/// Render an exchange event as a named SSE event with a JSON payload.
fn sse_event(event: &ExchangeEvent) -> Event {
    let data = match event {
        ExchangeEvent::Delta { text } | ExchangeEvent::Completed { text } => json!({ "text": text }),
        ExchangeEvent::Capped => json!({}),
        ExchangeEvent::Failed { code, message, retryable } => {
            json!({ "code": code, "message": message, "retryable": retryable })
        }
    };
    Event::default().event(event.name()).data(data.to_string())
}

#[cfg(test)]
#[path = "sessions_test.rs"]
mod tests;
