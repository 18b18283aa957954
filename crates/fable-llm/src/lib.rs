//! Prompt rendering and LLM transport.
//!
//! The rest of the workspace treats the model as a collaborator that takes a
//! `(system, user)` prompt pair and returns best-effort JSON text. This crate
//! owns that boundary: template rendering, the HTTP transport, multi-strategy
//! JSON recovery, and the one-shot repair protocol for malformed output.

pub mod client;
pub mod error;
pub mod parse;
pub mod prompt;

pub use client::{LlmClient, OpenAiClient, ScriptedClient};
pub use error::LlmError;
pub use parse::parse_turn_output;
pub use prompt::{PromptEngine, RenderedPrompt};
