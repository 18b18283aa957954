//! Engine error taxonomy.
//!
//! Schema failures and exhausted repairs come up from the LLM layer;
//! invariant violations come up from state validation and abort the turn
//! before any commit; guard and store failures keep their own types.

use std::path::PathBuf;

use thiserror::Error;

use fable_guards::GuardError;
use fable_llm::LlmError;
use fable_store::StoreError;
use fable_types::{InvalidSessionId, NpcId, ValidationError};

/// Anything that can fail while running the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// LLM transport, template, or parse failure.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// A fatal-policy guard could not be satisfied.
    #[error(transparent)]
    Guard(#[from] GuardError),

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A state or world invariant was violated; the turn was not committed.
    #[error("invariant violation: {0}")]
    Invariant(#[from] ValidationError),

    /// Session id generation or validation failed.
    #[error(transparent)]
    Session(#[from] InvalidSessionId),

    /// Configuration file could not be read or parsed.
    #[error("config error at {path}: {message}")]
    Config {
        /// The config file involved.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// The addressed NPC is not on the world roster.
    #[error("unknown npc {npc}")]
    UnknownNpc {
        /// The offending id.
        npc: NpcId,
    },
}
