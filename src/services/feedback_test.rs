use super::*;
use crate::llm::LlmChat;
use crate::llm::types::{Message, ReplyStream};
use crate::state::test_helpers;
use crate::state::Role;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

// =============================================================================
// MockEvaluator
// =============================================================================

struct MockEvaluator {
    results: Mutex<Vec<Result<String, LlmError>>>,
    generate_calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockEvaluator {
    fn new(results: Vec<Result<String, LlmError>>) -> Self {
        Self { results: Mutex::new(results), generate_calls: AtomicUsize::new(0), last_prompt: Mutex::new(None) }
    }

    fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LlmChat for MockEvaluator {
    async fn stream_chat(&self, _: u32, _: &str, _: &[Message]) -> Result<ReplyStream, LlmError> {
        Err(LlmError::ApiRequest("stream not scripted".into()))
    }

    async fn generate(&self, _: u32, _system: &str, prompt: &str) -> Result<String, LlmError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        let mut results = self.results.lock().unwrap();
        if results.is_empty() {
            Ok("Overall Score: 7\nFeedback: fine".into())
        } else {
            results.remove(0)
        }
    }
}

async fn capped_state(llm: Arc<MockEvaluator>) -> (AppState, Uuid) {
    let state = test_helpers::test_app_state_with_llm(llm);
    let id = test_helpers::seed_interviewing(&state).await;
    {
        let mut sessions = state.sessions.write().await;
        let session = sessions.get_mut(&id).unwrap();
        session.messages = vec![
            Turn { role: Role::User, text: "Hi".into() },
            Turn { role: Role::Assistant, text: "Hello".into() },
        ];
        session.user_message_count = crate::state::USER_TURN_CAP;
        session.phase = Phase::Capped;
    }
    (state, id)
}

// =============================================================================
// Transcript serialization
// =============================================================================

#[test]
fn transcript_serializes_role_prefixed_lines() {
    let turns = vec![
        Turn { role: Role::User, text: "Hi".into() },
        Turn { role: Role::Assistant, text: "Hello".into() },
    ];
    assert_eq!(transcript(&turns), "user: Hi\nassistant: Hello");
}

#[test]
fn transcript_of_empty_log_is_empty() {
    assert_eq!(transcript(&[]), "");
}

#[test]
fn transcript_preserves_original_order() {
    let turns = vec![
        Turn { role: Role::User, text: "one".into() },
        Turn { role: Role::Assistant, text: "two".into() },
        Turn { role: Role::User, text: "three".into() },
    ];
    assert_eq!(transcript(&turns), "user: one\nassistant: two\nuser: three");
}

#[test]
fn evaluation_prompt_embeds_transcript() {
    let prompt = evaluation_prompt("user: Hi");
    assert!(prompt.starts_with("This is the interview you need to evaluate."));
    assert!(prompt.ends_with("\n\nuser: Hi"));
}

// =============================================================================
// get_feedback
// =============================================================================

#[tokio::test]
async fn feedback_moves_to_feedback_phase_and_returns_text() {
    let llm = Arc::new(MockEvaluator::new(vec![Ok("Overall Score: 9\nFeedback: strong".into())]));
    let (state, id) = capped_state(llm.clone()).await;

    let text = get_feedback(&state, id, false).await.unwrap();
    assert_eq!(text, "Overall Score: 9\nFeedback: strong");
    assert_eq!(llm.generate_calls(), 1);

    let sessions = state.sessions.read().await;
    assert_eq!(sessions.get(&id).unwrap().phase, Phase::Feedback);
}

#[tokio::test]
async fn feedback_prompt_contains_the_transcript() {
    let llm = Arc::new(MockEvaluator::new(vec![]));
    let (state, id) = capped_state(llm.clone()).await;

    get_feedback(&state, id, false).await.unwrap();
    let prompt = llm.last_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("user: Hi\nassistant: Hello"));
}

#[tokio::test]
async fn second_call_returns_cached_result_without_new_llm_call() {
    let llm = Arc::new(MockEvaluator::new(vec![Ok("first".into()), Ok("second".into())]));
    let (state, id) = capped_state(llm.clone()).await;

    assert_eq!(get_feedback(&state, id, false).await.unwrap(), "first");
    assert_eq!(get_feedback(&state, id, false).await.unwrap(), "first");
    assert_eq!(llm.generate_calls(), 1);
}

#[tokio::test]
async fn regenerate_reissues_the_call_and_replaces_the_cache() {
    let llm = Arc::new(MockEvaluator::new(vec![Ok("first".into()), Ok("second".into())]));
    let (state, id) = capped_state(llm.clone()).await;

    assert_eq!(get_feedback(&state, id, false).await.unwrap(), "first");
    assert_eq!(get_feedback(&state, id, true).await.unwrap(), "second");
    assert_eq!(llm.generate_calls(), 2);
    // The re-roll becomes the new cached result.
    assert_eq!(get_feedback(&state, id, false).await.unwrap(), "second");
}

#[tokio::test]
async fn feedback_before_cap_is_rejected() {
    let llm = Arc::new(MockEvaluator::new(vec![]));
    let state = test_helpers::test_app_state_with_llm(llm);
    let id = test_helpers::seed_interviewing(&state).await;

    let err = get_feedback(&state, id, false).await.unwrap_err();
    assert!(matches!(err, FeedbackError::NotComplete(Phase::Interviewing)));
}

#[tokio::test]
async fn feedback_unknown_session_is_not_found() {
    let llm = Arc::new(MockEvaluator::new(vec![]));
    let (state, _) = capped_state(llm).await;
    let err = get_feedback(&state, Uuid::new_v4(), false).await.unwrap_err();
    assert!(matches!(err, FeedbackError::Session(SessionError::NotFound(_))));
}

#[tokio::test]
async fn provider_failure_is_surfaced_and_not_cached() {
    let llm = Arc::new(MockEvaluator::new(vec![
        Err(LlmError::ApiResponse { status: 401, body: "bad key".into() }),
        Ok("after retry".into()),
    ]));
    let (state, id) = capped_state(llm.clone()).await;

    let err = get_feedback(&state, id, false).await.unwrap_err();
    assert!(matches!(err, FeedbackError::Llm(LlmError::ApiResponse { status: 401, .. })));

    // The failure left no cache; a resubmission generates fresh.
    assert_eq!(get_feedback(&state, id, false).await.unwrap(), "after retry");
    assert_eq!(llm.generate_calls(), 2);
}

#[tokio::test]
async fn evaluator_system_instruction_fixes_the_format() {
    assert!(FEEDBACK_SYSTEM_INSTRUCTION.contains("score from 1 to 10"));
    assert!(FEEDBACK_SYSTEM_INSTRUCTION.contains("Overall Score:"));
    assert!(FEEDBACK_SYSTEM_INSTRUCTION.contains("Feedback:"));
    assert!(FEEDBACK_SYSTEM_INSTRUCTION.contains("do not ask any additional questions"));
}
