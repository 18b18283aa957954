//! Error types for the LLM layer.
//!
//! Parse failures are a distinct class from transport failures: the turn
//! pipeline treats a malformed response as repairable (once) while an HTTP
//! failure propagates directly.

/// Errors that can occur while rendering prompts or talking to a model.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Failed to render a prompt template.
    #[error("template render error: {0}")]
    Template(String),

    /// The HTTP request failed or the endpoint was unreachable.
    #[error("LLM transport error: {0}")]
    Transport(String),

    /// The endpoint returned a non-success status.
    #[error("LLM endpoint returned {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// The response text could not be parsed as the expected JSON shape.
    #[error("response parse error: {0}")]
    Parse(String),

    /// The response was still malformed after the one-shot repair call.
    #[error("invalid JSON after repair attempt. Preview: {preview}")]
    InvalidJsonAfterRepair {
        /// Truncated original response text.
        preview: String,
    },

    /// A scripted client ran out of queued outputs.
    #[error("scripted client has no more outputs (after {calls} calls)")]
    ScriptExhausted {
        /// How many calls were served before exhaustion.
        calls: usize,
    },
}
