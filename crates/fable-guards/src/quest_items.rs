//! Quest-item guard: requirements are grounded in the journal.
//!
//! NPC dialogue may only ask for materials that some quest in this world
//! actually defines, may not poach items from another giver's active quest,
//! and, when making a material request, must name at least one item its own
//! quest requires. An explicit "no requirement" phrase suppresses the
//! request-based checks: the NPC is declining to ask, not asking badly.

use std::collections::BTreeMap;

use fable_types::{ItemId, QuestProgress, TurnOutput};

use crate::runner::{ConsistencyCheck, GuardContext};
use crate::text::contains_term;

/// Phrases signalling the NPC is asking the player to obtain something.
const REQUEST_CUES: &[&str] = &[
    "bring me",
    "bring back",
    "fetch",
    "collect",
    "gather",
    "i need",
    "we need",
    "find me",
    "带来",
    "带给我",
    "需要",
    "收集",
    "采集",
    "找来",
    "拿来",
];

/// Phrases denying that anything is required.
const NO_REQUIREMENT_PHRASES: &[&str] = &[
    "no requirement",
    "nothing needed",
    "nothing is needed",
    "don't need anything",
    "need nothing",
    "不需要任何",
    "什么都不需要",
    "没有要求",
    "无需",
];

/// Guards quest-item talk against the journal.
///
/// The alias map carries every surface form an item may be mentioned by
/// (both languages) keyed to its canonical id.
pub struct QuestItemGuard {
    aliases: BTreeMap<String, ItemId>,
}

impl QuestItemGuard {
    /// Build from a surface-form-to-canonical-id alias map.
    pub fn new(aliases: BTreeMap<String, ItemId>) -> Self {
        Self { aliases }
    }

    /// Items the text mentions, as `(surface form, canonical id)` pairs.
    fn mentioned_items<'a>(&'a self, text: &str) -> Vec<(&'a str, &'a ItemId)> {
        self.aliases
            .iter()
            .filter(|(surface, _)| contains_term(text, surface))
            .map(|(surface, canonical)| (surface.as_str(), canonical))
            .collect()
    }
}

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    phrases.iter().any(|p| lowered.contains(p))
}

impl ConsistencyCheck for QuestItemGuard {
    fn name(&self) -> &'static str {
        "quest_items"
    }

    fn detect(&self, output: &TurnOutput, ctx: &GuardContext<'_>) -> Vec<String> {
        let mut violations = Vec::new();
        let npc_text = output.npc_authored_text();
        // "Nothing is needed" means the NPC is declining to ask; the
        // request-based checks do not apply to that turn.
        let requesting = !contains_any(&npc_text, NO_REQUIREMENT_PHRASES)
            && contains_any(&npc_text, REQUEST_CUES);
        let known = ctx.world.known_items();

        let mentioned = self.mentioned_items(&npc_text);
        for (surface, canonical) in &mentioned {
            if contains_term(ctx.player_text, surface) {
                continue;
            }
            if !known.contains(canonical) {
                violations.push(format!(
                    "mentions {surface}, an item no quest in this world uses"
                ));
                continue;
            }
            if !requesting {
                continue;
            }
            // Asking for an item that belongs to another giver's open quest.
            let poached = ctx.quests.values().any(|quest| {
                quest.status.is_open()
                    && quest.required_items.contains_key(*canonical)
                    && quest.giver_npc_id.as_ref() != Some(ctx.npc_id)
            });
            let own = ctx.quests.values().any(|quest| {
                quest.status.is_open()
                    && quest.required_items.contains_key(*canonical)
                    && quest.giver_npc_id.as_ref() == Some(ctx.npc_id)
            });
            if poached && !own {
                violations.push(format!(
                    "asks for {surface}, which belongs to another character's quest"
                ));
            }
        }

        // A material request that names none of the speaker's own required
        // items is ungrounded even when every named item checks out.
        if requesting {
            let own_open: Vec<&QuestProgress> = ctx
                .quests
                .values()
                .filter(|quest| {
                    quest.status.is_open()
                        && !quest.required_items.is_empty()
                        && quest.giver_npc_id.as_ref() == Some(ctx.npc_id)
                })
                .collect();
            let names_own = mentioned.iter().any(|(_, canonical)| {
                own_open
                    .iter()
                    .any(|quest| quest.required_items.contains_key(*canonical))
            });
            if !own_open.is_empty() && !names_own {
                let titles: Vec<&str> = own_open.iter().map(|q| q.title.as_str()).collect();
                violations.push(format!(
                    "makes a material request naming none of the items \"{}\" requires",
                    titles.join("\", \"")
                ));
            }
        }

        violations
    }

    fn instruction(&self, violations: &[String], ctx: &GuardContext<'_>) -> String {
        let requirements: Vec<String> = ctx
            .quests
            .values()
            .filter(|quest| quest.status.is_open() && !quest.required_items.is_empty())
            .map(|quest| {
                let items: Vec<String> = quest
                    .required_items
                    .iter()
                    .map(|(item, count)| format!("{item} x{count}"))
                    .collect();
                format!("\"{}\" needs {}", quest.title, items.join(", "))
            })
            .collect();
        format!(
            "The open quests and their requirements are: {}. Rewrite the JSON \
             turn output to fix these problems: {}. Dialogue may only ask for \
             items its own quest requires. Keep every other field unchanged and \
             return ONLY the corrected JSON.",
            if requirements.is_empty() {
                String::from("none")
            } else {
                requirements.join("; ")
            },
            violations.join("; ")
        )
    }
}
