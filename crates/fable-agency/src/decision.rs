//! The deterministic agency gate.
//!
//! Whether an NPC *chooses* to comply with a move request is a pure function
//! of their compliance scalars and the request text. Nothing here is
//! randomized: identical inputs always produce identical decisions, which is
//! a tested contract. Legality of the move is the graph validator's concern.

use std::collections::BTreeMap;

use tracing::debug;

use fable_types::{GameState, MoveRefusal, NpcId, NpcMove, NpcProfile, WorldSpec};

use crate::lexicon::{AgencyLexicon, CueClassifier, KeywordClassifier, TextCue};

const BASE_SCORE: f64 = 0.5;
const OBEDIENCE_WEIGHT: f64 = 0.35;
const STUBBORNNESS_WEIGHT: f64 = 0.35;
const DISPOSITION_WEIGHT: f64 = 0.05;
const ROLE_PENALTY: f64 = -0.25;
const BASE_THRESHOLD: f64 = 0.55;
const COMMAND_THRESHOLD_BUMP: f64 = 0.05;

/// Outcome of one agency decision.
#[derive(Debug, Clone, PartialEq)]
pub struct AgencyDecision {
    /// Whether the NPC goes along with the move.
    pub allowed: bool,
    /// Short reason; `"ok"` when allowed.
    pub reason: String,
    /// Decision factor tags collected on refusal.
    pub tags: Vec<String>,
}

/// The agency decision engine.
///
/// Holds the vocabulary-backed classifier; all per-decision inputs arrive
/// through [`decide`](Self::decide) so the engine itself is stateless.
#[derive(Debug, Clone, Default)]
pub struct AgencyEngine {
    classifier: KeywordClassifier,
}

impl AgencyEngine {
    /// Build an engine over a custom lexicon.
    pub const fn new(lexicon: AgencyLexicon) -> Self {
        Self {
            classifier: KeywordClassifier::new(lexicon),
        }
    }

    /// Decide whether `npc` complies with the proposed move.
    ///
    /// Scoring: base 0.5, plus obedience, minus stubbornness, plus a small
    /// disposition term, plus risk alignment against the destination's
    /// descriptive text, minus a fixed penalty when a duty-anchored NPC is
    /// asked to leave their post. The clamped score is compared against a
    /// threshold that rises slightly when the request is phrased as a
    /// command.
    pub fn decide(
        &self,
        proposed: &NpcMove,
        state: &GameState,
        world: &WorldSpec,
        player_text: &str,
    ) -> AgencyDecision {
        let Some(npc) = world.npc(&proposed.npc_id) else {
            return AgencyDecision {
                allowed: false,
                reason: String::from("unknown npc"),
                tags: vec![String::from("unknown_npc")],
            };
        };

        let mut score = BASE_SCORE;
        score += OBEDIENCE_WEIGHT * npc.obedience_level;
        score -= STUBBORNNESS_WEIGHT * npc.stubbornness;
        score += DISPOSITION_WEIGHT * (f64::from(npc.disposition_to_player) / 5.0);

        let (risk_term, risk_tags) = self.risk_alignment(npc, world, proposed);
        score += risk_term;

        let (role_term, role_tags) = self.role_anchoring(npc, state, proposed);
        score += role_term;

        let score = score.clamp(0.0, 1.0);
        let threshold = self.threshold(player_text);

        if score >= threshold {
            return AgencyDecision {
                allowed: true,
                reason: String::from("ok"),
                tags: Vec::new(),
            };
        }

        let mut tags = Vec::new();
        if npc.stubbornness >= 0.7 {
            tags.push(String::from("stubbornness"));
        }
        tags.extend(risk_tags.iter().cloned());
        tags.extend(role_tags.iter().cloned());
        if npc.disposition_to_player <= -2 {
            tags.push(String::from("disposition"));
        }
        if tags.is_empty() {
            tags.push(String::from("low_compliance"));
        }

        let reason = refusal_reason(npc, &risk_tags, &role_tags);
        debug!(npc = %proposed.npc_id, score, threshold, %reason, "move refused");
        AgencyDecision {
            allowed: false,
            reason,
            tags,
        }
    }

    /// Apply the gate to a batch of structurally-valid moves.
    ///
    /// Two overrides run before scoring. If the NPC's own recent dialogue
    /// explicitly agrees to the move, the move is allowed without scoring --
    /// unless the same dialogue also refuses, in which case refusal wins and
    /// scoring proceeds. If the player's text carries coercion cues, the move
    /// is forced through regardless of score: duress overrides free will.
    pub fn apply_gate(
        &self,
        moves: &[NpcMove],
        state: &GameState,
        world: &WorldSpec,
        player_text: &str,
        npc_dialogue_by_id: &BTreeMap<NpcId, Vec<String>>,
    ) -> (Vec<NpcMove>, Vec<MoveRefusal>) {
        let player_cues = self.classifier.classify(player_text);
        let coerced = player_cues.contains(&TextCue::Coercion);

        let mut allowed = Vec::new();
        let mut refusals = Vec::new();

        for proposed in moves {
            if coerced {
                debug!(npc = %proposed.npc_id, "move forced under duress");
                allowed.push(proposed.clone());
                continue;
            }

            let npc_lines = npc_dialogue_by_id
                .get(&proposed.npc_id)
                .map(|lines| lines.join(" "))
                .unwrap_or_default();
            if self.npc_accepts_in_dialogue(proposed, world, player_text, &npc_lines) {
                allowed.push(proposed.clone());
                continue;
            }

            let decision = self.decide(proposed, state, world, player_text);
            if decision.allowed {
                allowed.push(proposed.clone());
            } else {
                refusals.push(MoveRefusal {
                    npc_id: proposed.npc_id.clone(),
                    from_location: proposed.from_location.clone(),
                    to_location: proposed.to_location.clone(),
                    reason: decision.reason,
                    tags: decision.tags,
                });
            }
        }

        (allowed, refusals)
    }

    fn threshold(&self, player_text: &str) -> f64 {
        let mut threshold = BASE_THRESHOLD;
        if self.classifier.classify(player_text).contains(&TextCue::Command) {
            threshold += COMMAND_THRESHOLD_BUMP;
        }
        threshold
    }

    fn risk_alignment(
        &self,
        npc: &NpcProfile,
        world: &WorldSpec,
        proposed: &NpcMove,
    ) -> (f64, Vec<String>) {
        let Some(loc) = world.location(&proposed.to_location) else {
            return (0.0, Vec::new());
        };
        let text = format!(
            "{} {} {} {}",
            loc.name,
            loc.kind,
            loc.description,
            loc.tags.join(" ")
        );
        let risky = self.classifier.classify(&text).contains(&TextCue::Risky);
        if !risky {
            return (0.05, vec![String::from("risk_safe")]);
        }
        if npc.risk_tolerance >= 0.7 {
            (0.05, vec![String::from("risk_tolerant")])
        } else if npc.risk_tolerance <= 0.3 {
            (-0.2, vec![String::from("risk")])
        } else {
            (-0.1, vec![String::from("risk")])
        }
    }

    fn role_anchoring(
        &self,
        npc: &NpcProfile,
        state: &GameState,
        proposed: &NpcMove,
    ) -> (f64, Vec<String>) {
        let lexicon = self.classifier.lexicon();
        let mut tags = Vec::new();

        let profession = npc.profession.to_lowercase();
        let goals = npc.goals.join(" ").to_lowercase();
        let traits = npc.traits.join(" ").to_lowercase();

        let mut anchored = lexicon
            .anchored_roles
            .iter()
            .any(|role| profession.contains(role.as_str()))
            || lexicon
                .anchored_goals
                .iter()
                .any(|goal| goals.contains(goal.as_str()));
        if lexicon
            .risk_averse_traits
            .iter()
            .any(|t| traits.contains(t.as_str()))
        {
            anchored = true;
            tags.push(String::from("risk"));
        }

        let leaving_post = state
            .npc_locations
            .get(&proposed.npc_id)
            .is_none_or(|current| current != &proposed.to_location);
        if anchored && leaving_post {
            tags.push(String::from("role"));
            return (ROLE_PENALTY, tags);
        }
        (0.0, tags)
    }

    /// Does the NPC's own dialogue explicitly accept this move?
    ///
    /// A refusal cue in the same lines always wins. A strong accept phrase
    /// ("I'll go with you") counts by itself; a bare agreement word ("okay")
    /// counts only when the destination is referenced in the NPC's lines or
    /// the player's request.
    fn npc_accepts_in_dialogue(
        &self,
        proposed: &NpcMove,
        world: &WorldSpec,
        player_text: &str,
        npc_lines: &str,
    ) -> bool {
        let combined = npc_lines.trim();
        if combined.is_empty() {
            return false;
        }
        let cues = self.classifier.classify(combined);
        if cues.contains(&TextCue::Refuse) {
            return false;
        }
        if cues.contains(&TextCue::StrongAccept) {
            return true;
        }
        if !cues.contains(&TextCue::WeakAccept) {
            return false;
        }

        let mut dest_names = vec![proposed.to_location.as_str().to_owned()];
        if let Some(loc) = world.location(&proposed.to_location) {
            dest_names.push(loc.name.clone());
        }
        dest_names.iter().any(|name| {
            !name.is_empty() && (combined.contains(name.as_str()) || player_text.contains(name.as_str()))
        })
    }
}

fn refusal_reason(npc: &NpcProfile, risk_tags: &[String], role_tags: &[String]) -> String {
    if role_tags.iter().any(|t| t == "role") {
        return String::from("Refused: guarding their post");
    }
    if risk_tags.iter().any(|t| t == "risk") {
        return String::from("Refused: too risky");
    }
    if npc.disposition_to_player <= -2 {
        return String::from("Refused: doesn't trust the player");
    }
    if npc.stubbornness >= 0.7 {
        return String::from("Refused: too stubborn");
    }
    String::from("Refused: unwilling to comply")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fable_types::{
        Location, LocationId, SessionId, WorldBible, WorldId,
    };

    fn loc(id: &str, name: &str, kind: &str, desc: &str, connected: &[&str]) -> Location {
        Location {
            location_id: LocationId::new(id),
            name: name.to_owned(),
            kind: kind.to_owned(),
            description: desc.to_owned(),
            connected_to: connected.iter().map(|c| LocationId::new(*c)).collect(),
            tags: Vec::new(),
        }
    }

    fn npc(
        id: &str,
        profession: &str,
        traits: &[&str],
        goals: &[&str],
        obedience: f64,
        stubbornness: f64,
        risk_tolerance: f64,
        disposition: i32,
    ) -> NpcProfile {
        NpcProfile {
            npc_id: NpcId::new(id),
            name: id.to_uppercase(),
            profession: profession.to_owned(),
            traits: traits.iter().map(|t| (*t).to_owned()).collect(),
            goals: goals.iter().map(|g| (*g).to_owned()).collect(),
            starting_location: LocationId::new("shop"),
            obedience_level: obedience,
            stubbornness,
            risk_tolerance,
            disposition_to_player: disposition,
            refusal_style: String::from("blunt"),
        }
    }

    fn world() -> WorldSpec {
        WorldSpec {
            world_id: WorldId::new("world_agency"),
            title: String::from("Agency World"),
            world_bible: WorldBible {
                tech_level: String::from("medieval"),
                narrative_language: None,
                magic_rules: String::from("low"),
                tone: String::from("grounded"),
                taboos: Vec::new(),
                do_not_mention: Vec::new(),
                anachronism_blocklist: Vec::new(),
            },
            locations: vec![
                loc("shop", "Shop", "shop", "A small shop.", &["bridge"]),
                loc(
                    "bridge",
                    "Old Bridge",
                    "bridge",
                    "A dark bridge over a forest.",
                    &[],
                ),
            ],
            npcs: vec![
                npc(
                    "npc_stubborn",
                    "Shopkeeper",
                    &["cautious"],
                    &["keep shop"],
                    0.1,
                    0.9,
                    0.2,
                    0,
                ),
                npc(
                    "npc_obedient",
                    "Assistant",
                    &["helpful"],
                    &["help"],
                    0.9,
                    0.1,
                    0.8,
                    2,
                ),
            ],
            main_quest: None,
            side_quests: Vec::new(),
            starting_location: LocationId::new("shop"),
            starting_hook: String::from("A rumor spreads."),
            initial_quest: String::from("Deliver a message."),
            map_layout: Vec::new(),
        }
    }

    fn state(world: &WorldSpec) -> GameState {
        let mut npc_locations = BTreeMap::new();
        npc_locations.insert(NpcId::new("npc_stubborn"), LocationId::new("shop"));
        npc_locations.insert(NpcId::new("npc_obedient"), LocationId::new("shop"));
        GameState {
            session_id: SessionId::parse("sess_agency").unwrap(),
            created_at: Utc::now(),
            world: world.clone(),
            player_location: LocationId::new("shop"),
            npc_locations,
            flags: BTreeMap::new(),
            inventory: BTreeMap::new(),
            quests: BTreeMap::new(),
            main_quest_id: None,
            location_stocks: BTreeMap::new(),
            recent_summaries: Vec::new(),
            turn_counter: 0,
        }
    }

    fn mv(npc: &str) -> NpcMove {
        NpcMove {
            npc_id: NpcId::new(npc),
            from_location: LocationId::new("shop"),
            to_location: LocationId::new("bridge"),
            trigger: String::from("player_instruction"),
            reason: String::from("request"),
            permanence: String::from("temporary"),
            confidence: 0.9,
        }
    }

    #[test]
    fn decision_is_deterministic() {
        let world = world();
        let state = state(&world);
        let engine = AgencyEngine::default();
        let first = engine.decide(&mv("npc_obedient"), &state, &world, "Meet me at the bridge");
        let second = engine.decide(&mv("npc_obedient"), &state, &world, "Meet me at the bridge");
        assert_eq!(first, second);
    }

    #[test]
    fn stubborn_refuses_obedient_accepts() {
        let world = world();
        let state = state(&world);
        let engine = AgencyEngine::default();
        let stubborn = engine.decide(&mv("npc_stubborn"), &state, &world, "Meet me at the bridge");
        let obedient = engine.decide(&mv("npc_obedient"), &state, &world, "Meet me at the bridge");
        assert!(!stubborn.allowed);
        assert!(obedient.allowed);
    }

    #[test]
    fn risky_destination_refusal_carries_tags() {
        let world = world();
        let state = state(&world);
        let engine = AgencyEngine::default();
        let decision = engine.decide(&mv("npc_stubborn"), &state, &world, "Go to the bridge");
        assert!(!decision.allowed);
        assert!(
            decision.tags.iter().any(|t| t == "risk") || decision.tags.iter().any(|t| t == "role")
        );
    }

    #[test]
    fn more_compliant_npc_never_scores_lower() {
        // Two NPCs identical except obedience/stubbornness; the compliant
        // one must be allowed whenever the other is.
        let mut world = world();
        world.npcs = vec![
            npc("low", "farmer", &[], &[], 0.3, 0.7, 0.5, 0),
            npc("high", "farmer", &[], &[], 0.8, 0.2, 0.5, 0),
        ];
        let mut state = state(&world);
        state.npc_locations.clear();
        state
            .npc_locations
            .insert(NpcId::new("low"), LocationId::new("shop"));
        state
            .npc_locations
            .insert(NpcId::new("high"), LocationId::new("shop"));

        let engine = AgencyEngine::default();
        let low = engine.decide(&mv("low"), &state, &world, "please come");
        let high = engine.decide(&mv("high"), &state, &world, "please come");
        assert!(high.allowed || !low.allowed);
    }

    #[test]
    fn explicit_npc_yes_short_circuits_refusal() {
        let world = world();
        let state = state(&world);
        let engine = AgencyEngine::default();
        let mut dialogue = BTreeMap::new();
        dialogue.insert(
            NpcId::new("npc_stubborn"),
            vec![String::from("好，我跟你去断桥。")],
        );
        let (allowed, refusals) = engine.apply_gate(
            &[mv("npc_stubborn")],
            &state,
            &world,
            "请和我去断桥。",
            &dialogue,
        );
        assert_eq!(allowed.len(), 1);
        assert!(refusals.is_empty());
    }

    #[test]
    fn refusal_cue_beats_weak_accept() {
        let world = world();
        let state = state(&world);
        let engine = AgencyEngine::default();
        let mut dialogue = BTreeMap::new();
        dialogue.insert(
            NpcId::new("npc_stubborn"),
            vec![String::from("Sure... but I can't leave the shop.")],
        );
        let (allowed, refusals) = engine.apply_gate(
            &[mv("npc_stubborn")],
            &state,
            &world,
            "Come to the bridge",
            &dialogue,
        );
        assert!(allowed.is_empty());
        assert_eq!(refusals.len(), 1);
        assert_eq!(refusals[0].npc_id, NpcId::new("npc_stubborn"));
    }

    #[test]
    fn coercion_forces_move_despite_refusing_text() {
        let world = world();
        let state = state(&world);
        let engine = AgencyEngine::default();
        let mut dialogue = BTreeMap::new();
        dialogue.insert(
            NpcId::new("npc_stubborn"),
            vec![String::from("不要...我害怕。")],
        );
        let (allowed, refusals) = engine.apply_gate(
            &[mv("npc_stubborn")],
            &state,
            &world,
            "要么跟我去桥边，要么我杀了你。",
            &dialogue,
        );
        assert_eq!(allowed.len(), 1);
        assert!(refusals.is_empty());
    }

    #[test]
    fn refusal_event_carries_reason_and_route() {
        let world = world();
        let state = state(&world);
        let engine = AgencyEngine::default();
        let (allowed, refusals) = engine.apply_gate(
            &[mv("npc_stubborn"), mv("npc_obedient")],
            &state,
            &world,
            "Meet me at the bridge",
            &BTreeMap::new(),
        );
        assert_eq!(allowed.len(), 1);
        assert_eq!(allowed[0].npc_id, NpcId::new("npc_obedient"));
        assert_eq!(refusals.len(), 1);
        assert_eq!(refusals[0].npc_id, NpcId::new("npc_stubborn"));
        assert_eq!(refusals[0].to_location, LocationId::new("bridge"));
        assert!(refusals[0].reason.starts_with("Refused:"));
    }
}
