//! Anthropic Messages API client.
//!
//! Thin HTTP wrapper for `/v1/messages`, in both streamed and single-shot
//! form. Pure parsing in `parse_stream_data` / `parse_generate_response`
//! for testability; the stream adapter only moves bytes through the SSE
//! decoder.

use std::time::Duration;

use async_stream::try_stream;
use futures::StreamExt;

use super::config::LlmTimeouts;
use super::sse::SseDecoder;
use super::types::{LlmError, Message, ReplyStream};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Stop reason reported when the model declines for policy reasons.
const REFUSAL_STOP_REASON: &str = "refusal";

// =============================================================================
// CLIENT
// =============================================================================

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key })
    }

    async fn send(
        &self,
        model: &str,
        max_tokens: u32,
        system: &str,
        messages: &[Message],
        stream: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let body = ApiRequest { model, max_tokens, system, messages, stream };

        let response = self
            .http
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response
                .text()
                .await
                .map_err(|e| LlmError::ApiRequest(e.to_string()))?;
            return Err(LlmError::ApiResponse { status, body: text });
        }
        Ok(response)
    }

    pub async fn stream_chat(
        &self,
        model: &str,
        max_tokens: u32,
        system: &str,
        messages: &[Message],
    ) -> Result<ReplyStream, LlmError> {
        let response = self.send(model, max_tokens, system, messages, true).await?;
        let mut bytes = response.bytes_stream();

        let stream = try_stream! {
            let mut decoder = SseDecoder::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|e| LlmError::ApiRequest(e.to_string()))?;
                for data in decoder.push(&chunk) {
                    match parse_stream_data(&data)? {
                        StreamUpdate::Delta(text) => yield text,
                        StreamUpdate::Stop { reason: Some(reason) } if reason == REFUSAL_STOP_REASON => {
                            Err(LlmError::ContentBlocked { reason })?;
                        }
                        StreamUpdate::Stop { .. } | StreamUpdate::Ignore => {}
                    }
                }
            }
            if let Some(data) = decoder.finish() {
                if let StreamUpdate::Delta(text) = parse_stream_data(&data)? {
                    yield text;
                }
            }
        };
        Ok(Box::pin(stream))
    }

    pub async fn generate(
        &self,
        model: &str,
        max_tokens: u32,
        system: &str,
        prompt: &str,
    ) -> Result<String, LlmError> {
        let messages = [Message::user(prompt)];
        let response = self.send(model, max_tokens, system, &messages, false).await?;
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;
        parse_generate_response(&text)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(serde::Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(serde::Deserialize)]
struct ApiResponse {
    content: Vec<ApiContentBlock>,
    stop_reason: Option<String>,
}

#[derive(serde::Deserialize)]
struct ApiContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

/// One decoded SSE payload from the Messages stream.
#[derive(Debug, PartialEq)]
enum StreamUpdate {
    Delta(String),
    Stop { reason: Option<String> },
    Ignore,
}

// =============================================================================
// PARSING
// =============================================================================

/// Decode one `data:` payload from a streamed Messages response.
///
/// Event dispatch uses the embedded `type` field: `content_block_delta`
/// carries text, `message_delta` carries the stop reason, `error` aborts,
/// and everything else (`message_start`, `ping`, block boundaries) is
/// ignored.
fn parse_stream_data(data: &str) -> Result<StreamUpdate, LlmError> {
    let value: serde_json::Value = serde_json::from_str(data).map_err(|e| LlmError::ApiParse(e.to_string()))?;

    match value.get("type").and_then(|t| t.as_str()) {
        Some("content_block_delta") => {
            let text = value
                .pointer("/delta/text")
                .and_then(|t| t.as_str())
                .unwrap_or_default();
            Ok(StreamUpdate::Delta(text.to_string()))
        }
        Some("message_delta") => {
            let reason = value
                .pointer("/delta/stop_reason")
                .and_then(|r| r.as_str())
                .map(str::to_string);
            Ok(StreamUpdate::Stop { reason })
        }
        Some("error") => {
            let message = value
                .pointer("/error/message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown stream error");
            Err(LlmError::ApiRequest(message.to_string()))
        }
        _ => Ok(StreamUpdate::Ignore),
    }
}

fn parse_generate_response(json: &str) -> Result<String, LlmError> {
    let api: ApiResponse = serde_json::from_str(json).map_err(|e| LlmError::ApiParse(e.to_string()))?;

    if api.stop_reason.as_deref() == Some(REFUSAL_STOP_REASON) {
        return Err(LlmError::ContentBlocked { reason: REFUSAL_STOP_REASON.to_string() });
    }

    let text: String = api
        .content
        .iter()
        .filter(|block| block.block_type == "text")
        .filter_map(|block| block.text.as_deref())
        .collect();

    if text.is_empty() {
        return Err(LlmError::ApiParse("response contained no text content".into()));
    }
    Ok(text)
}

#[cfg(test)]
#[path = "anthropic_test.rs"]
mod tests;
