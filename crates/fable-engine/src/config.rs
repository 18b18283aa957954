//! Engine configuration.
//!
//! Loaded from a YAML file with per-field defaults; a handful of `FABLE_*`
//! environment variables override the file so deployments can keep secrets
//! out of it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use fable_guards::GuardPolicy;
use fable_quests::DeliveryLocationPolicy;
use fable_retrieval::RetrievalConfig;

use crate::error::EngineError;

/// LLM endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token. Usually supplied via `FABLE_API_KEY`.
    #[serde(default)]
    pub api_key: String,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Completion token cap.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_base_url() -> String {
    String::from("https://api.openai.com/v1")
}

fn default_model() -> String {
    String::from("gpt-4o-mini")
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Per-guard failure policies.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GuardsConfig {
    /// Anachronism guard policy.
    #[serde(default)]
    pub anachronism: GuardPolicy,
    /// Roster guard policy.
    #[serde(default)]
    pub roster: GuardPolicy,
    /// Quest-item guard policy.
    #[serde(default)]
    pub quest_items: GuardPolicy,
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// LLM endpoint settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Retrieval tuning.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Guard policies.
    #[serde(default)]
    pub guards: GuardsConfig,
    /// Where deliveries may happen relative to pinned quest locations.
    #[serde(default)]
    pub delivery_policy: DeliveryLocationPolicy,
    /// Root directory for session persistence.
    #[serde(default = "default_store_root")]
    pub store_root: PathBuf,
    /// How many rolling summaries the state keeps.
    #[serde(default = "default_summary_history")]
    pub summary_history: usize,
}

fn default_store_root() -> PathBuf {
    PathBuf::from("sessions")
}

fn default_summary_history() -> usize {
    20
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig::default(),
            guards: GuardsConfig::default(),
            delivery_policy: DeliveryLocationPolicy::default(),
            store_root: default_store_root(),
            summary_history: default_summary_history(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let raw = std::fs::read_to_string(path).map_err(|e| EngineError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut config: Self = serde_yml::from_str(&raw).map_err(|e| EngineError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override file settings from `FABLE_*` environment variables.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("FABLE_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Ok(value) = std::env::var("FABLE_API_KEY") {
            self.llm.api_key = value;
        }
        if let Ok(value) = std::env::var("FABLE_MODEL") {
            self.llm.model = value;
        }
        if let Ok(value) = std::env::var("FABLE_STORE_ROOT") {
            self.store_root = PathBuf::from(value);
        }
        debug!(model = %self.llm.model, "engine configuration resolved");
    }
}
