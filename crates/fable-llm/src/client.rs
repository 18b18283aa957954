//! LLM client abstraction and implementations.
//!
//! Enum-based dispatch instead of trait objects because async methods are
//! not dyn-compatible. The [`OpenAiClient`] talks to any OpenAI-compatible
//! chat-completions endpoint over `reqwest`; the [`ScriptedClient`] replays
//! queued outputs for offline tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, warn};

use fable_types::TurnOutput;

use crate::error::LlmError;
use crate::parse::{parse_turn_output, truncate_preview};
use crate::prompt::RenderedPrompt;

const REPAIR_SYSTEM: &str =
    "You are a JSON repair tool. Return ONLY valid JSON. No markdown. No commentary.";

/// An LLM client that can complete prompts.
pub enum LlmClient {
    /// OpenAI-compatible chat completions endpoint.
    OpenAi(OpenAiClient),
    /// Scripted outputs for tests.
    Scripted(ScriptedClient),
}

impl LlmClient {
    /// Send a system/user prompt pair and return the raw response text.
    ///
    /// `json_mode` requests a JSON-object response format from endpoints
    /// that support it; scripted clients ignore it.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        json_mode: bool,
    ) -> Result<String, LlmError> {
        match self {
            Self::OpenAi(client) => client.complete(system, user, json_mode).await,
            Self::Scripted(client) => client.next_output(),
        }
    }

    /// Generate a structured turn, repairing malformed JSON at most once.
    ///
    /// If the first response fails every parse strategy, the raw text is
    /// sent back through a dedicated repair prompt exactly once. A second
    /// failure is fatal for the turn.
    pub async fn generate_turn(&self, prompt: &RenderedPrompt) -> Result<TurnOutput, LlmError> {
        let text = self.complete(&prompt.system, &prompt.user, true).await?;
        match parse_turn_output(&text) {
            Ok(output) => Ok(output),
            Err(parse_err) => {
                warn!(error = %parse_err, "turn output malformed, attempting one-shot repair");
                let repair_user = format!("Original text:\n{text}");
                let repaired_text = self.complete(REPAIR_SYSTEM, &repair_user, true).await?;
                parse_turn_output(&repaired_text).map_err(|_| {
                    LlmError::InvalidJsonAfterRepair {
                        preview: truncate_preview(&text, 500),
                    }
                })
            }
        }
    }

    /// Run a guard rewrite: plain text in, corrected plain text out.
    pub async fn rewrite_text(&self, system: &str, text: &str) -> Result<String, LlmError> {
        let rewritten = self.complete(system, text, false).await?;
        Ok(rewritten.trim().to_owned())
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Scripted(_) => "scripted",
        }
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible client
// ---------------------------------------------------------------------------

/// Client for OpenAI-compatible chat completions endpoints.
///
/// Sends requests to `{base_url}/chat/completions`. Works with OpenAI,
/// DeepSeek, Qwen, and local vLLM/Ollama endpoints.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl OpenAiClient {
    /// Create a new client.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
            max_tokens,
        })
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        json_mode: bool,
    ) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        if json_mode {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }

        debug!(model = %self.model, json_mode, "sending chat completion request");
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unable to read error body"));
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: truncate_preview(&error_body, 500),
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("response body parse failed: {e}")))?;

        extract_content(&json)
    }
}

/// Extract `choices[0].message.content` from a chat completions response.
fn extract_content(json: &serde_json::Value) -> Result<String, LlmError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            LlmError::Transport(String::from(
                "response missing choices[0].message.content",
            ))
        })
}

// ---------------------------------------------------------------------------
// Scripted client (tests)
// ---------------------------------------------------------------------------

/// Replays a fixed sequence of outputs. Offline; for tests.
pub struct ScriptedClient {
    outputs: Mutex<VecDeque<String>>,
    calls: Mutex<usize>,
}

impl ScriptedClient {
    /// Queue up the outputs to replay, in order.
    pub fn new<I, S>(outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            outputs: Mutex::new(outputs.into_iter().map(Into::into).collect()),
            calls: Mutex::new(0),
        }
    }

    /// How many completions have been served.
    pub fn calls(&self) -> usize {
        self.calls.lock().map(|calls| *calls).unwrap_or(0)
    }

    fn next_output(&self) -> Result<String, LlmError> {
        let mut calls = self
            .calls
            .lock()
            .map_err(|_| LlmError::Transport(String::from("scripted client lock poisoned")))?;
        let mut outputs = self
            .outputs
            .lock()
            .map_err(|_| LlmError::Transport(String::from("scripted client lock poisoned")))?;
        match outputs.pop_front() {
            Some(output) => {
                *calls += 1;
                Ok(output)
            }
            None => Err(LlmError::ScriptExhausted { calls: *calls }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{"narration":"OK","npc_dialogue":[],"world_updates":{},"memory_summary":"","safety":false}"#;

    fn prompt() -> RenderedPrompt {
        RenderedPrompt {
            system: String::from("sys"),
            user: String::from("user"),
        }
    }

    #[tokio::test]
    async fn scripted_client_replays_outputs() {
        let client = LlmClient::Scripted(ScriptedClient::new([MINIMAL]));
        let output = client.generate_turn(&prompt()).await.unwrap();
        assert_eq!(output.narration, "OK");
    }

    #[tokio::test]
    async fn malformed_output_repaired_once() {
        let client = LlmClient::Scripted(ScriptedClient::new(["{{{not json", MINIMAL]));
        let output = client.generate_turn(&prompt()).await.unwrap();
        assert_eq!(output.narration, "OK");
        if let LlmClient::Scripted(scripted) = &client {
            assert_eq!(scripted.calls(), 2);
        }
    }

    #[tokio::test]
    async fn repair_failure_is_fatal() {
        let client = LlmClient::Scripted(ScriptedClient::new(["{{{not json", "still not json"]));
        let err = client.generate_turn(&prompt()).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidJsonAfterRepair { .. }));
    }

    #[tokio::test]
    async fn exhausted_script_errors() {
        let client = LlmClient::Scripted(ScriptedClient::new(Vec::<String>::new()));
        let err = client.complete("s", "u", false).await.unwrap_err();
        assert!(matches!(err, LlmError::ScriptExhausted { .. }));
    }

    #[test]
    fn extract_content_reads_chat_shape() {
        let json = serde_json::json!({
            "choices": [{"message": {"content": "hello"}}]
        });
        assert_eq!(extract_content(&json).unwrap(), "hello");
        assert!(extract_content(&serde_json::json!({})).is_err());
    }
}
