//! Turn orchestration.
//!
//! Ties the workspace together: configuration, session bootstrap, and the
//! per-turn pipeline that runs retrieval, generation, the consistency
//! guards, the agency gate, and the all-or-nothing state commit.

pub mod apply;
pub mod config;
pub mod error;
pub mod session;
pub mod turn;

pub use apply::apply_world_updates;
pub use config::{EngineConfig, GuardsConfig, LlmConfig};
pub use error::EngineError;
pub use session::new_session;
pub use turn::TurnPipeline;
