//! Roster guard: the cast is closed.
//!
//! The model may not invent named characters or staff the world with
//! professions nobody on the roster holds, and an NPC may not claim to be a
//! different roster NPC.

use fable_types::TurnOutput;

use crate::runner::{ConsistencyCheck, GuardContext};
use crate::text::contains_term;

/// Profession nouns the guard recognizes. A mention is fine as long as some
/// roster NPC actually holds the profession.
const PROFESSION_NOUNS: &[&str] = &[
    "blacksmith",
    "innkeeper",
    "shopkeeper",
    "healer",
    "merchant",
    "hunter",
    "farmer",
    "priest",
    "mage",
    "wizard",
    "铁匠",
    "店主",
    "掌柜",
    "治疗师",
    "郎中",
    "商人",
    "猎人",
    "农夫",
    "祭司",
    "法师",
];

/// Phrases that introduce a self-identification by name.
const NAME_CLAIM_CUES: &[&str] = &["my name is ", "i am called ", "they call me ", "我叫", "我名叫"];

/// Guards dialogue against off-roster identities.
pub struct RosterGuard;

impl RosterGuard {
    /// Names claimed via self-identification cues in `text`.
    fn claimed_names(text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let mut claims = Vec::new();
        for cue in NAME_CLAIM_CUES {
            let mut search = 0;
            while let Some(pos) = lowered[search..].find(cue) {
                let start = search + pos + cue.len();
                if let Some(name) = extract_name(&lowered[start..]) {
                    claims.push(name);
                }
                search = start;
            }
        }
        claims
    }
}

/// Take the leading name token after a claim cue. ASCII names run until the
/// first non-letter; CJK names take up to three characters.
fn extract_name(rest: &str) -> Option<String> {
    let rest = rest.trim_start();
    let first = rest.chars().next()?;
    let name: String = if first.is_ascii_alphabetic() {
        rest.chars().take_while(char::is_ascii_alphabetic).collect()
    } else {
        rest.chars()
            .take_while(|c| !c.is_ascii() && !is_cjk_punct(*c))
            .take(3)
            .collect()
    };
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn is_cjk_punct(c: char) -> bool {
    matches!(c, '，' | '。' | '！' | '？' | '、' | '：' | '；' | '"' | '"')
}

impl ConsistencyCheck for RosterGuard {
    fn name(&self) -> &'static str {
        "roster"
    }

    fn detect(&self, output: &TurnOutput, ctx: &GuardContext<'_>) -> Vec<String> {
        let mut violations = Vec::new();
        let npc_text = output.npc_authored_text();

        // Professions nobody on the roster holds.
        let professions: Vec<String> = ctx
            .world
            .npcs
            .iter()
            .map(|npc| npc.profession.to_lowercase())
            .collect();
        for noun in PROFESSION_NOUNS {
            if !contains_term(&npc_text, noun) || contains_term(ctx.player_text, noun) {
                continue;
            }
            let held = professions.iter().any(|p| p.contains(noun));
            if !held {
                violations.push(format!("mentions a {noun}, a profession nobody here holds"));
            }
        }

        // Name claims in the acting NPC's own dialogue.
        let speaker_name = ctx
            .world
            .npc(ctx.npc_id)
            .map(|npc| npc.name.to_lowercase());
        for line in output.dialogue_for(ctx.npc_id) {
            for claimed in Self::claimed_names(line) {
                let claimed_lower = claimed.to_lowercase();
                if speaker_name.as_deref() == Some(claimed_lower.as_str()) {
                    continue;
                }
                let roster_match = ctx
                    .world
                    .npcs
                    .iter()
                    .find(|npc| npc.name.to_lowercase() == claimed_lower);
                if let Some(other) = roster_match {
                    violations.push(format!(
                        "claims to be {}, who is a different character",
                        other.name
                    ));
                } else {
                    violations.push(format!("claims the unknown name {claimed}"));
                }
            }
        }

        violations
    }

    fn instruction(&self, violations: &[String], ctx: &GuardContext<'_>) -> String {
        let roster: Vec<String> = ctx
            .world
            .npcs
            .iter()
            .map(|npc| format!("{} ({})", npc.name, npc.profession))
            .collect();
        format!(
            "The only characters in this story are: {}. Rewrite the JSON turn \
             output to fix these problems: {}. Do not invent characters or \
             professions. Keep every other field unchanged and return ONLY the \
             corrected JSON.",
            roster.join(", "),
            violations.join("; ")
        )
    }
}
