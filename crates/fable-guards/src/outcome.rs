//! Guard policies, outcomes, and errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fable_llm::LlmError;

/// What to do when a guard's single rewrite attempt does not resolve the
/// violations it found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardPolicy {
    /// Keep the original output and surface a visible notice.
    #[default]
    Degrade,
    /// Fail the turn.
    Fatal,
}

/// Result of running one guard over a turn output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// No violations found.
    Clean,
    /// Violations found; the rewrite resolved them.
    Repaired {
        /// What was found in the original output.
        violations: Vec<String>,
    },
    /// Violations found and the rewrite did not resolve them; the original
    /// output was kept and the turn carries a visible notice.
    Degraded {
        /// Player-visible notice.
        notice: String,
        /// What was found.
        violations: Vec<String>,
    },
}

impl GuardOutcome {
    /// The visible notice, when the guard degraded.
    pub fn notice(&self) -> Option<&str> {
        match self {
            Self::Degraded { notice, .. } => Some(notice),
            Self::Clean | Self::Repaired { .. } => None,
        }
    }
}

/// Errors raised while running a guard.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The rewrite call failed in the LLM layer.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The turn output could not be serialized for the rewrite call.
    #[error("failed to serialize turn output for rewrite: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A fatal-policy guard could not resolve its violations.
    #[error("{guard} guard unresolved after rewrite: {}", violations.join(", "))]
    Unresolved {
        /// Which guard failed.
        guard: &'static str,
        /// The unresolved violations.
        violations: Vec<String>,
    },
}
