use super::*;

// =============================================================================
// build_messages
// =============================================================================

#[test]
fn build_messages_prepends_system() {
    let history = [Message::user("hi"), Message::assistant("hello")];
    let msgs = build_messages("be brief", &history);
    assert_eq!(msgs.len(), 3);
    assert_eq!(msgs[0].role, "system");
    assert_eq!(msgs[0].content, "be brief");
    assert_eq!(msgs[1].role, "user");
    assert_eq!(msgs[2].role, "assistant");
}

#[test]
fn build_messages_skips_blank_system() {
    let history = [Message::user("hi")];
    let msgs = build_messages("   ", &history);
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].role, "user");
}

// =============================================================================
// parse_stream_data
// =============================================================================

#[test]
fn stream_done_marker_terminates() {
    assert_eq!(parse_stream_data("[DONE]").unwrap(), StreamUpdate::Done);
}

#[test]
fn stream_delta_content_yields_text() {
    let data = r#"{"choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}"#;
    assert_eq!(parse_stream_data(data).unwrap(), StreamUpdate::Delta("Hel".into()));
}

#[test]
fn stream_role_only_delta_is_not_text() {
    let data = r#"{"choices":[{"delta":{"role":"assistant"},"finish_reason":null}]}"#;
    assert_eq!(parse_stream_data(data).unwrap(), StreamUpdate::Finished { reason: None });
}

#[test]
fn stream_stop_carries_finish_reason() {
    let data = r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
    assert_eq!(
        parse_stream_data(data).unwrap(),
        StreamUpdate::Finished { reason: Some("stop".into()) }
    );
}

#[test]
fn stream_content_filter_is_reported() {
    let data = r#"{"choices":[{"delta":{},"finish_reason":"content_filter"}]}"#;
    assert_eq!(
        parse_stream_data(data).unwrap(),
        StreamUpdate::Finished { reason: Some("content_filter".into()) }
    );
}

#[test]
fn stream_empty_choices_is_harmless() {
    let data = r#"{"choices":[]}"#;
    assert_eq!(parse_stream_data(data).unwrap(), StreamUpdate::Finished { reason: None });
}

#[test]
fn stream_invalid_json_is_a_parse_error() {
    assert!(matches!(parse_stream_data("nope"), Err(LlmError::ApiParse(_))));
}

// =============================================================================
// parse_generate_response
// =============================================================================

#[test]
fn generate_returns_message_content() {
    let json = r#"{
        "choices": [
            {"message": {"role": "assistant", "content": "Overall Score: 8"}, "finish_reason": "stop"}
        ]
    }"#;
    assert_eq!(parse_generate_response(json).unwrap(), "Overall Score: 8");
}

#[test]
fn generate_content_filter_maps_to_content_blocked() {
    let json = r#"{"choices":[{"message":{"content":null},"finish_reason":"content_filter"}]}"#;
    let err = parse_generate_response(json).unwrap_err();
    assert!(matches!(err, LlmError::ContentBlocked { .. }));
}

#[test]
fn generate_without_choices_is_a_parse_error() {
    assert!(matches!(parse_generate_response(r#"{"choices":[]}"#), Err(LlmError::ApiParse(_))));
}

#[test]
fn generate_without_content_is_a_parse_error() {
    let json = r#"{"choices":[{"message":{"content":null},"finish_reason":"stop"}]}"#;
    assert!(matches!(parse_generate_response(json), Err(LlmError::ApiParse(_))));
}
