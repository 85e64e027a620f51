//! OpenAI-compatible API client.
//!
//! Talks to `/v1/chat/completions` on any OpenAI-compatible base URL, in
//! both streamed and single-shot form. The `responses` endpoint is not
//! used; chat completions is the one surface every compatible vendor
//! implements with the same streamed-delta shape.

use std::time::Duration;

use async_stream::try_stream;
use futures::StreamExt;
use serde::Serialize;

use super::config::LlmTimeouts;
use super::sse::SseDecoder;
use super::types::{LlmError, Message, ReplyStream};

/// Finish reason reported when the provider filtered the content.
const CONTENT_FILTER_FINISH_REASON: &str = "content_filter";

const STREAM_DONE_MARKER: &str = "[DONE]";

// =============================================================================
// CLIENT
// =============================================================================

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, base_url: String, timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key, base_url: base_url.trim_end_matches('/').to_string() })
    }

    async fn send(
        &self,
        model: &str,
        max_tokens: u32,
        system: &str,
        messages: &[Message],
        stream: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let msgs = build_messages(system, messages);
        let body = CcRequest { model, max_tokens, messages: &msgs, stream };
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
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
            'body: while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|e| LlmError::ApiRequest(e.to_string()))?;
                for data in decoder.push(&chunk) {
                    match parse_stream_data(&data)? {
                        StreamUpdate::Delta(text) => yield text,
                        StreamUpdate::Finished { reason: Some(reason) }
                            if reason == CONTENT_FILTER_FINISH_REASON =>
                        {
                            Err(LlmError::ContentBlocked { reason })?;
                        }
                        StreamUpdate::Finished { .. } => {}
                        StreamUpdate::Done => break 'body,
                    }
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

#[derive(Serialize)]
struct CcRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [CcMessage<'a>],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct CcMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(serde::Deserialize)]
struct CcResponse {
    choices: Vec<CcChoice>,
}

#[derive(serde::Deserialize)]
struct CcChoice {
    message: CcResponseMessage,
    finish_reason: Option<String>,
}

#[derive(serde::Deserialize)]
struct CcResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// One decoded SSE payload from a streamed chat completion.
#[derive(Debug, PartialEq)]
enum StreamUpdate {
    Delta(String),
    Finished { reason: Option<String> },
    Done,
}

fn build_messages<'a>(system: &'a str, messages: &'a [Message]) -> Vec<CcMessage<'a>> {
    let mut out = Vec::with_capacity(messages.len() + 1);
    if !system.trim().is_empty() {
        out.push(CcMessage { role: "system", content: system });
    }
    out.extend(messages.iter().map(|m| CcMessage { role: &m.role, content: &m.content }));
    out
}

// =============================================================================
// PARSING
// =============================================================================

/// Decode one `data:` payload from a streamed chat completion. A chunk
/// carries either a content delta, a finish reason, or the terminal
/// `[DONE]` marker.
fn parse_stream_data(data: &str) -> Result<StreamUpdate, LlmError> {
    if data == STREAM_DONE_MARKER {
        return Ok(StreamUpdate::Done);
    }

    let value: serde_json::Value = serde_json::from_str(data).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    let Some(choice) = value.get("choices").and_then(|c| c.as_array()).and_then(|c| c.first()) else {
        return Ok(StreamUpdate::Finished { reason: None });
    };

    if let Some(text) = choice.pointer("/delta/content").and_then(|t| t.as_str()) {
        if !text.is_empty() {
            return Ok(StreamUpdate::Delta(text.to_string()));
        }
    }

    let reason = choice
        .get("finish_reason")
        .and_then(|r| r.as_str())
        .map(str::to_string);
    Ok(StreamUpdate::Finished { reason })
}

fn parse_generate_response(json: &str) -> Result<String, LlmError> {
    let api: CcResponse = serde_json::from_str(json).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    let choice = api
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::ApiParse("response contained no choices".into()))?;

    if choice.finish_reason.as_deref() == Some(CONTENT_FILTER_FINISH_REASON) {
        return Err(LlmError::ContentBlocked { reason: CONTENT_FILTER_FINISH_REASON.to_string() });
    }

    choice
        .message
        .content
        .filter(|c| !c.is_empty())
        .ok_or_else(|| LlmError::ApiParse("response contained no text content".into()))
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
