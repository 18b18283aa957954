//! Prompt template rendering via `minijinja`.
//!
//! Templates are compiled into the binary with `include_str!` so the engine
//! has no runtime file dependency. Context arrives as a `serde_json::Value`
//! assembled by the turn pipeline.

use minijinja::Environment;

use crate::error::LlmError;

const TURN_SYSTEM: &str = include_str!("../templates/turn_system.j2");
const TURN_USER: &str = include_str!("../templates/turn_user.j2");
const REWRITE_SYSTEM: &str = include_str!("../templates/rewrite_system.j2");

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message establishing the narrator's rules.
    pub system: String,
    /// User message carrying scene, context, and the player's input.
    pub user: String,
}

/// Manages prompt template rendering.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    /// Create a new prompt engine with the bundled templates.
    pub fn new() -> Result<Self, LlmError> {
        let mut env = Environment::new();
        env.add_template("turn_system", TURN_SYSTEM)
            .map_err(|e| LlmError::Template(format!("failed to add turn_system template: {e}")))?;
        env.add_template("turn_user", TURN_USER)
            .map_err(|e| LlmError::Template(format!("failed to add turn_user template: {e}")))?;
        env.add_template("rewrite_system", REWRITE_SYSTEM).map_err(|e| {
            LlmError::Template(format!("failed to add rewrite_system template: {e}"))
        })?;
        Ok(Self { env })
    }

    /// Render the system and user prompt for one turn.
    pub fn render_turn(&self, context: &serde_json::Value) -> Result<RenderedPrompt, LlmError> {
        let system = self
            .env
            .get_template("turn_system")
            .map_err(|e| LlmError::Template(format!("missing turn_system template: {e}")))?
            .render(context)
            .map_err(|e| LlmError::Template(format!("turn_system render failed: {e}")))?;

        let user = self
            .env
            .get_template("turn_user")
            .map_err(|e| LlmError::Template(format!("missing turn_user template: {e}")))?
            .render(context)
            .map_err(|e| LlmError::Template(format!("turn_user render failed: {e}")))?;

        Ok(RenderedPrompt { system, user })
    }

    /// Render the system prompt for a guard rewrite call.
    pub fn render_rewrite(
        &self,
        instruction: &str,
        narrative_language: &str,
    ) -> Result<String, LlmError> {
        self.env
            .get_template("rewrite_system")
            .map_err(|e| LlmError::Template(format!("missing rewrite_system template: {e}")))?
            .render(minijinja::context! {
                instruction => instruction,
                narrative_language => narrative_language,
            })
            .map_err(|e| LlmError::Template(format!("rewrite_system render failed: {e}")))
    }
}
