//! LLM — provider adapter for the interview and feedback calls.
//!
//! DESIGN
//! ======
//! The `LlmClient` enum dispatches to Anthropic or an OpenAI-compatible
//! endpoint based on `LLM_PROVIDER`. Services depend only on the
//! [`LlmChat`] trait, so tests swap in a mock; the dispatcher owns the
//! configured model name so call sites never pass it around.

pub mod anthropic;
pub mod config;
pub mod openai;
pub mod sse;
pub mod types;

use config::{LlmConfig, LlmProviderKind};
pub use types::LlmChat;
use types::{LlmError, Message, ReplyStream};

// =============================================================================
// CLIENT DISPATCH
// =============================================================================

/// Concrete LLM client that dispatches to either Anthropic or OpenAI.
///
/// Configured from environment variables by [`LlmClient::from_env`].
pub struct LlmClient {
    inner: LlmProvider,
    model: String,
}

enum LlmProvider {
    Anthropic(anthropic::AnthropicClient),
    OpenAi(openai::OpenAiClient),
}

impl LlmClient {
    /// Build an LLM client from environment variables.
    ///
    /// - `LLM_PROVIDER`: "anthropic" (default) or "openai"
    /// - `LLM_API_KEY_ENV`: name of env var holding the API key (e.g. `ANTHROPIC_API_KEY`)
    /// - `LLM_MODEL`: model name
    /// - `LLM_OPENAI_BASE_URL`: custom base URL for OpenAI-compatible APIs
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client fails.
    pub fn from_env() -> Result<Self, LlmError> {
        let config = LlmConfig::from_env()?;
        Self::from_config(config)
    }

    /// Build an LLM client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider HTTP client fails to build.
    pub fn from_config(config: LlmConfig) -> Result<Self, LlmError> {
        let model = config.model.clone();
        let inner = match config.provider {
            LlmProviderKind::Anthropic => {
                LlmProvider::Anthropic(anthropic::AnthropicClient::new(config.api_key, config.timeouts)?)
            }
            LlmProviderKind::OpenAi => LlmProvider::OpenAi(openai::OpenAiClient::new(
                config.api_key,
                config.openai_base_url,
                config.timeouts,
            )?),
        };
        Ok(Self { inner, model })
    }

    /// Return the configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl LlmChat for LlmClient {
    async fn stream_chat(
        &self,
        max_tokens: u32,
        system: &str,
        messages: &[Message],
    ) -> Result<ReplyStream, LlmError> {
        match &self.inner {
            LlmProvider::Anthropic(c) => c.stream_chat(&self.model, max_tokens, system, messages).await,
            LlmProvider::OpenAi(c) => c.stream_chat(&self.model, max_tokens, system, messages).await,
        }
    }

    async fn generate(&self, max_tokens: u32, system: &str, prompt: &str) -> Result<String, LlmError> {
        match &self.inner {
            LlmProvider::Anthropic(c) => c.generate(&self.model, max_tokens, system, prompt).await,
            LlmProvider::OpenAi(c) => c.generate(&self.model, max_tokens, system, prompt).await,
        }
    }
}
