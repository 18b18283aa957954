//! Shared enforcement loop: detect, rewrite once, re-check.

use std::collections::BTreeMap;

use tracing::{info, warn};

use fable_llm::{parse_turn_output, LlmClient, PromptEngine};
use fable_types::{NpcId, QuestId, QuestProgress, TurnOutput, WorldSpec};

use crate::outcome::{GuardError, GuardOutcome, GuardPolicy};

/// Read-only view of the session a guard judges against.
pub struct GuardContext<'a> {
    /// Immutable world definition.
    pub world: &'a WorldSpec,
    /// Current quest journal.
    pub quests: &'a BTreeMap<QuestId, QuestProgress>,
    /// The NPC the player is addressing this turn.
    pub npc_id: &'a NpcId,
    /// What the player typed this turn.
    pub player_text: &'a str,
}

impl GuardContext<'_> {
    /// Language the rewrite must stay in.
    pub fn narrative_language(&self) -> &str {
        self.world
            .world_bible
            .narrative_language
            .as_deref()
            .unwrap_or("en")
    }
}

/// One deterministic consistency check over a turn output.
pub trait ConsistencyCheck {
    /// Guard name used in logs and notices.
    fn name(&self) -> &'static str;

    /// Scan the output and return every violation found, as human-readable
    /// descriptions. Empty means clean.
    fn detect(&self, output: &TurnOutput, ctx: &GuardContext<'_>) -> Vec<String>;

    /// Build the rewrite instruction for the violations found.
    fn instruction(&self, violations: &[String], ctx: &GuardContext<'_>) -> String;
}

/// Run one guard: detect violations, attempt a single rewrite, re-check.
///
/// On a successful repair `output` is replaced with the rewritten turn.
/// When the rewrite fails to resolve the violations the original output is
/// kept and the outcome follows `policy`.
///
/// # Errors
///
/// Returns an error when the rewrite transport fails, or when `policy` is
/// [`GuardPolicy::Fatal`] and the violations remain after the rewrite.
pub async fn enforce<C: ConsistencyCheck>(
    check: &C,
    policy: GuardPolicy,
    client: &LlmClient,
    prompts: &PromptEngine,
    output: &mut TurnOutput,
    ctx: &GuardContext<'_>,
) -> Result<GuardOutcome, GuardError> {
    let violations = check.detect(output, ctx);
    if violations.is_empty() {
        return Ok(GuardOutcome::Clean);
    }
    warn!(guard = check.name(), ?violations, "consistency violations detected");

    let instruction = check.instruction(&violations, ctx);
    let system = prompts.render_rewrite(&instruction, ctx.narrative_language())?;
    let payload = serde_json::to_string(output)?;
    let rewritten = client.rewrite_text(&system, &payload).await?;

    if let Ok(candidate) = parse_turn_output(&rewritten) {
        if check.detect(&candidate, ctx).is_empty() {
            info!(guard = check.name(), "rewrite resolved violations");
            *output = candidate;
            return Ok(GuardOutcome::Repaired { violations });
        }
    }

    match policy {
        GuardPolicy::Degrade => {
            let notice = format!(
                "[consistency: {}] unresolved after rewrite: {}",
                check.name(),
                violations.join("; ")
            );
            warn!(guard = check.name(), "rewrite did not resolve violations, degrading");
            Ok(GuardOutcome::Degraded { notice, violations })
        }
        GuardPolicy::Fatal => Err(GuardError::Unresolved {
            guard: check.name(),
            violations,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fable_llm::ScriptedClient;
    use fable_types::{
        DialogueLine, Location, LocationId, SafetyFlag, WorldBible, WorldId, WorldSpec,
        WorldUpdates,
    };

    use crate::anachronism::AnachronismGuard;

    use super::*;

    fn world() -> WorldSpec {
        WorldSpec {
            world_id: WorldId::new("w1"),
            title: String::from("Test World"),
            world_bible: WorldBible {
                tech_level: String::from("medieval"),
                narrative_language: Some(String::from("en")),
                magic_rules: String::from("low"),
                tone: String::from("grounded"),
                taboos: Vec::new(),
                do_not_mention: Vec::new(),
                anachronism_blocklist: Vec::new(),
            },
            locations: vec![Location {
                location_id: LocationId::new("shop"),
                name: String::from("Shop"),
                kind: String::from("shop"),
                description: String::from("A small shop."),
                connected_to: Vec::new(),
                tags: Vec::new(),
            }],
            npcs: Vec::new(),
            main_quest: None,
            side_quests: Vec::new(),
            starting_location: LocationId::new("shop"),
            starting_hook: String::new(),
            initial_quest: String::new(),
            map_layout: Vec::new(),
        }
    }

    fn tainted_output() -> TurnOutput {
        TurnOutput {
            narration: String::from("The keeper grumbles about the wifi."),
            npc_dialogue: vec![DialogueLine {
                npc_id: NpcId::new("npc_a"),
                text: String::from("It has been down all week."),
            }],
            world_updates: WorldUpdates::default(),
            memory_summary: String::new(),
            safety: SafetyFlag::default(),
        }
    }

    const CLEAN_JSON: &str = r#"{"narration":"The keeper grumbles about the courier.","npc_dialogue":[{"npc_id":"npc_a","text":"He has been late all week."}],"world_updates":{},"memory_summary":"","safety":false}"#;

    #[tokio::test]
    async fn successful_rewrite_replaces_output() {
        let world = world();
        let guard = AnachronismGuard::for_world(&world);
        let client = LlmClient::Scripted(ScriptedClient::new([CLEAN_JSON]));
        let prompts = PromptEngine::new().unwrap();
        let quests = BTreeMap::new();
        let npc = NpcId::new("npc_a");
        let ctx = GuardContext {
            world: &world,
            quests: &quests,
            npc_id: &npc,
            player_text: "Hello.",
        };

        let mut output = tainted_output();
        let outcome = enforce(&guard, GuardPolicy::Degrade, &client, &prompts, &mut output, &ctx)
            .await
            .unwrap();
        assert!(matches!(outcome, GuardOutcome::Repaired { .. }));
        assert!(output.narration.contains("courier"));
    }

    #[tokio::test]
    async fn failed_rewrite_degrades_and_keeps_original() {
        let world = world();
        let guard = AnachronismGuard::for_world(&world);
        // Rewrite comes back still tainted.
        let still_tainted = serde_json::to_string(&tainted_output()).unwrap();
        let client = LlmClient::Scripted(ScriptedClient::new([still_tainted]));
        let prompts = PromptEngine::new().unwrap();
        let quests = BTreeMap::new();
        let npc = NpcId::new("npc_a");
        let ctx = GuardContext {
            world: &world,
            quests: &quests,
            npc_id: &npc,
            player_text: "Hello.",
        };

        let mut output = tainted_output();
        let outcome = enforce(&guard, GuardPolicy::Degrade, &client, &prompts, &mut output, &ctx)
            .await
            .unwrap();
        let notice = outcome.notice().unwrap();
        assert!(notice.contains("anachronism"));
        assert!(notice.contains("wifi"));
        assert!(output.narration.contains("wifi"));
    }

    #[tokio::test]
    async fn fatal_policy_errors_when_unresolved() {
        let world = world();
        let guard = AnachronismGuard::for_world(&world);
        let still_tainted = serde_json::to_string(&tainted_output()).unwrap();
        let client = LlmClient::Scripted(ScriptedClient::new([still_tainted]));
        let prompts = PromptEngine::new().unwrap();
        let quests = BTreeMap::new();
        let npc = NpcId::new("npc_a");
        let ctx = GuardContext {
            world: &world,
            quests: &quests,
            npc_id: &npc,
            player_text: "Hello.",
        };

        let mut output = tainted_output();
        let err = enforce(&guard, GuardPolicy::Fatal, &client, &prompts, &mut output, &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::Unresolved { guard: "anachronism", .. }));
    }

    #[tokio::test]
    async fn clean_output_makes_no_llm_calls() {
        let world = world();
        let guard = AnachronismGuard::for_world(&world);
        let scripted = ScriptedClient::new(Vec::<String>::new());
        let client = LlmClient::Scripted(scripted);
        let prompts = PromptEngine::new().unwrap();
        let quests = BTreeMap::new();
        let npc = NpcId::new("npc_a");
        let ctx = GuardContext {
            world: &world,
            quests: &quests,
            npc_id: &npc,
            player_text: "Hello.",
        };

        let mut output = tainted_output();
        output.narration = String::from("The keeper grumbles about the rain.");
        let outcome = enforce(&guard, GuardPolicy::Degrade, &client, &prompts, &mut output, &ctx)
            .await
            .unwrap();
        assert_eq!(outcome, GuardOutcome::Clean);
        if let LlmClient::Scripted(scripted) = &client {
            assert_eq!(scripted.calls(), 0);
        }
    }
}
