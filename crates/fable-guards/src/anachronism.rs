//! Anachronism guard: out-of-era technology must not enter the fiction.
//!
//! Only first mentions by the NPC side are violations. If the player types
//! "wifi" the narrator may acknowledge the word; it may never introduce it.

use fable_types::TurnOutput;

use crate::runner::{ConsistencyCheck, GuardContext};
use crate::text::{first_mentions, normalize_term};

/// Terms banned in low-tech worlds regardless of world-file configuration.
const DEFAULT_BANNED_TERMS: &[&str] = &[
    "smartphone",
    "phone",
    "internet",
    "wifi",
    "wi-fi",
    "email",
    "app",
    "credit card",
    "gun",
    "ak-47",
    "gps",
    "browser",
    "website",
    "electricity",
    "手机",
    "电话",
    "互联网",
    "网络",
    "电脑",
    "电子邮件",
    "枪",
];

/// Guards against modern technology leaking into a low-tech world.
pub struct AnachronismGuard {
    terms: Vec<String>,
    active: bool,
}

impl AnachronismGuard {
    /// Build the banned-term list for a world.
    ///
    /// The defaults are merged with the world bible's `do_not_mention` and
    /// `anachronism_blocklist` entries. The guard only fires in worlds whose
    /// tech level is medieval or ancient.
    pub fn for_world(world: &fable_types::WorldSpec) -> Self {
        let bible = &world.world_bible;
        let mut terms: std::collections::BTreeSet<String> = DEFAULT_BANNED_TERMS
            .iter()
            .map(|t| normalize_term(t))
            .collect();
        for extra in bible.do_not_mention.iter().chain(&bible.anachronism_blocklist) {
            let normalized = normalize_term(extra);
            if !normalized.is_empty() {
                terms.insert(normalized);
            }
        }
        let terms = terms.into_iter().collect();
        let tech = bible.tech_level.to_lowercase();
        let active = tech.contains("medieval") || tech.contains("ancient");
        Self { terms, active }
    }
}

impl ConsistencyCheck for AnachronismGuard {
    fn name(&self) -> &'static str {
        "anachronism"
    }

    fn detect(&self, output: &TurnOutput, ctx: &GuardContext<'_>) -> Vec<String> {
        if !self.active {
            return Vec::new();
        }
        let npc_text = output.npc_authored_text();
        first_mentions(
            &npc_text,
            ctx.player_text,
            self.terms.iter().map(String::as_str),
        )
        .into_iter()
        .collect()
    }

    fn instruction(&self, violations: &[String], ctx: &GuardContext<'_>) -> String {
        format!(
            "The story is set in a {} world. Rewrite the JSON turn output so the \
             narration and dialogue no longer mention: {}. Replace each with an \
             era-appropriate equivalent or drop it. Keep every other field \
             unchanged and return ONLY the corrected JSON.",
            ctx.world.world_bible.tech_level,
            violations.join(", ")
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use fable_types::{
        DialogueLine, Location, LocationId, NpcId, NpcProfile, SafetyFlag, TurnOutput, WorldBible,
        WorldId, WorldSpec, WorldUpdates,
    };

    use super::*;

    fn world(tech_level: &str) -> WorldSpec {
        WorldSpec {
            world_id: WorldId::new("w1"),
            title: String::from("Test World"),
            world_bible: WorldBible {
                tech_level: String::from(tech_level),
                narrative_language: None,
                magic_rules: String::from("low"),
                tone: String::from("grounded"),
                taboos: Vec::new(),
                do_not_mention: vec![String::from("dragon airline")],
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
            npcs: vec![NpcProfile {
                npc_id: NpcId::new("npc_a"),
                name: String::from("Bran"),
                profession: String::from("Shopkeeper"),
                traits: Vec::new(),
                goals: Vec::new(),
                starting_location: LocationId::new("shop"),
                obedience_level: 0.5,
                stubbornness: 0.5,
                risk_tolerance: 0.5,
                disposition_to_player: 0,
                refusal_style: String::from("blunt"),
            }],
            main_quest: None,
            side_quests: Vec::new(),
            starting_location: LocationId::new("shop"),
            starting_hook: String::new(),
            initial_quest: String::new(),
            map_layout: Vec::new(),
        }
    }

    fn output_saying(text: &str) -> TurnOutput {
        TurnOutput {
            narration: String::from("The shop is quiet."),
            npc_dialogue: vec![DialogueLine {
                npc_id: NpcId::new("npc_a"),
                text: String::from(text),
            }],
            world_updates: WorldUpdates::default(),
            memory_summary: String::new(),
            safety: SafetyFlag::default(),
        }
    }

    fn ctx<'a>(
        world: &'a WorldSpec,
        quests: &'a BTreeMap<fable_types::QuestId, fable_types::QuestProgress>,
        npc_id: &'a NpcId,
        player_text: &'a str,
    ) -> GuardContext<'a> {
        GuardContext {
            world,
            quests,
            npc_id,
            player_text,
        }
    }

    #[test]
    fn flags_npc_first_mention_only() {
        let world = world("medieval");
        let guard = AnachronismGuard::for_world(&world);
        let quests = BTreeMap::new();
        let npc = NpcId::new("npc_a");

        let output = output_saying("Have you checked the wifi by the mill?");
        let violations = guard.detect(&output, &ctx(&world, &quests, &npc, "Hello."));
        assert_eq!(violations, vec![String::from("wifi")]);

        // Player brought it up first; the echo passes.
        let violations = guard.detect(
            &output,
            &ctx(&world, &quests, &npc, "Is the wi-fi broken again?"),
        );
        assert!(violations.is_empty());
    }

    #[test]
    fn world_blocklist_is_merged() {
        let world = world("medieval");
        let guard = AnachronismGuard::for_world(&world);
        let quests = BTreeMap::new();
        let npc = NpcId::new("npc_a");
        let output = output_saying("Take the dragon airline south.");
        let violations = guard.detect(&output, &ctx(&world, &quests, &npc, "Hello."));
        assert_eq!(violations, vec![String::from("dragon airline")]);
    }

    #[test]
    fn inactive_outside_low_tech_worlds() {
        let world = world("modern");
        let guard = AnachronismGuard::for_world(&world);
        let quests = BTreeMap::new();
        let npc = NpcId::new("npc_a");
        let output = output_saying("Check your phone.");
        assert!(guard
            .detect(&output, &ctx(&world, &quests, &npc, "Hello."))
            .is_empty());
    }
}
