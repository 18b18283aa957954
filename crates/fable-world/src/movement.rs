//! Structural validation of proposed NPC moves.
//!
//! Validation here answers "is this move legal on the map", nothing more;
//! whether the NPC is *willing* is the agency engine's concern. The checks
//! are purely structural and side-effect free.

use std::collections::BTreeMap;

use tracing::debug;

use fable_types::{
    GameState, LocationId, MoveRejectReason, MoveRejection, NpcId, NpcMove, WorldSpec,
};

use crate::graph::LocationGraph;

/// Validate one proposed move against the world graph and an NPC-location map.
///
/// Checks run in a fixed order and the first failure wins:
/// roster membership, location-map membership, `from_location` agreement,
/// target validity, then BFS reachability.
pub fn validate_move(
    graph: &LocationGraph,
    world: &WorldSpec,
    npc_locations: &BTreeMap<NpcId, LocationId>,
    proposed: &NpcMove,
) -> Result<(), MoveRejectReason> {
    if world.npc(&proposed.npc_id).is_none() {
        return Err(MoveRejectReason::UnknownNpc);
    }
    let Some(current) = npc_locations.get(&proposed.npc_id) else {
        return Err(MoveRejectReason::MissingLocationEntry);
    };
    if current != &proposed.from_location {
        return Err(MoveRejectReason::FromLocationMismatch);
    }
    if !graph.contains(&proposed.to_location) {
        return Err(MoveRejectReason::UnknownTarget);
    }
    if !graph.is_reachable(&proposed.from_location, &proposed.to_location) {
        return Err(MoveRejectReason::Unreachable);
    }
    Ok(())
}

/// Apply a batch of moves against a working copy of the NPC-location map.
///
/// Moves are validated one at a time against the *working* map, so a later
/// move in the same batch sees the effect of earlier accepted moves (an NPC
/// moved to `bridge` can then be moved onward from `bridge`). Returns the
/// accepted moves and one rejection event per failure; the caller owns
/// committing the mutated map.
pub fn apply_validated_moves(
    state: &GameState,
    npc_locations: &mut BTreeMap<NpcId, LocationId>,
    moves: &[NpcMove],
) -> (Vec<NpcMove>, Vec<MoveRejection>) {
    let graph = LocationGraph::build(&state.world.locations);
    let mut applied = Vec::new();
    let mut rejections = Vec::new();

    for proposed in moves {
        match validate_move(&graph, &state.world, npc_locations, proposed) {
            Ok(()) => {
                npc_locations
                    .insert(proposed.npc_id.clone(), proposed.to_location.clone());
                applied.push(proposed.clone());
            }
            Err(reason) => {
                debug!(
                    npc = %proposed.npc_id,
                    from = %proposed.from_location,
                    to = %proposed.to_location,
                    %reason,
                    "move rejected"
                );
                rejections.push(MoveRejection {
                    npc_id: proposed.npc_id.clone(),
                    from_location: proposed.from_location.clone(),
                    to_location: proposed.to_location.clone(),
                    reason,
                });
            }
        }
    }

    (applied, rejections)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fable_types::{Location, NpcProfile, SessionId, WorldBible, WorldId};

    fn loc(id: &str, connected: &[&str]) -> Location {
        Location {
            location_id: LocationId::new(id),
            name: id.to_uppercase(),
            kind: String::from("town"),
            description: format!("The {id}."),
            connected_to: connected.iter().map(|c| LocationId::new(*c)).collect(),
            tags: Vec::new(),
        }
    }

    fn npc(id: &str, start: &str) -> NpcProfile {
        NpcProfile {
            npc_id: NpcId::new(id),
            name: id.to_uppercase(),
            profession: String::from("villager"),
            traits: Vec::new(),
            goals: Vec::new(),
            starting_location: LocationId::new(start),
            obedience_level: 0.5,
            stubbornness: 0.5,
            risk_tolerance: 0.5,
            disposition_to_player: 0,
            refusal_style: String::from("polite"),
        }
    }

    fn state() -> GameState {
        let world = WorldSpec {
            world_id: WorldId::new("w"),
            title: String::from("W"),
            world_bible: WorldBible {
                tech_level: String::from("medieval"),
                narrative_language: None,
                magic_rules: String::from("low"),
                tone: String::from("grounded"),
                taboos: Vec::new(),
                do_not_mention: Vec::new(),
                anachronism_blocklist: Vec::new(),
            },
            locations: vec![loc("a", &["b"]), loc("b", &["c"]), loc("c", &[])],
            npcs: vec![npc("n1", "a"), npc("n2", "a")],
            main_quest: None,
            side_quests: Vec::new(),
            starting_location: LocationId::new("a"),
            starting_hook: String::new(),
            initial_quest: String::new(),
            map_layout: Vec::new(),
        };
        let mut npc_locations = BTreeMap::new();
        npc_locations.insert(NpcId::new("n1"), LocationId::new("a"));
        npc_locations.insert(NpcId::new("n2"), LocationId::new("a"));
        GameState {
            session_id: SessionId::parse("sess_world").unwrap(),
            created_at: Utc::now(),
            world,
            player_location: LocationId::new("a"),
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

    fn mv(npc: &str, from: &str, to: &str) -> NpcMove {
        NpcMove {
            npc_id: NpcId::new(npc),
            from_location: LocationId::new(from),
            to_location: LocationId::new(to),
            trigger: String::from("player_instruction"),
            reason: String::from("request"),
            permanence: String::from("temporary"),
            confidence: 0.9,
        }
    }

    #[test]
    fn approves_transitive_path_rejects_reverse() {
        let s = state();
        let graph = LocationGraph::build(&s.world.locations);
        assert!(validate_move(&graph, &s.world, &s.npc_locations, &mv("n1", "a", "c")).is_ok());

        let mut back = s.npc_locations.clone();
        back.insert(NpcId::new("n1"), LocationId::new("c"));
        assert_eq!(
            validate_move(&graph, &s.world, &back, &mv("n1", "c", "a")),
            Err(MoveRejectReason::Unreachable)
        );
    }

    #[test]
    fn check_order_matches_contract() {
        let s = state();
        let graph = LocationGraph::build(&s.world.locations);
        assert_eq!(
            validate_move(&graph, &s.world, &s.npc_locations, &mv("ghost", "a", "b")),
            Err(MoveRejectReason::UnknownNpc)
        );
        assert_eq!(
            validate_move(&graph, &s.world, &s.npc_locations, &mv("n1", "b", "c")),
            Err(MoveRejectReason::FromLocationMismatch)
        );
        assert_eq!(
            validate_move(&graph, &s.world, &s.npc_locations, &mv("n1", "a", "void")),
            Err(MoveRejectReason::UnknownTarget)
        );

        let mut missing = s.npc_locations.clone();
        missing.remove(&NpcId::new("n1"));
        assert_eq!(
            validate_move(&graph, &s.world, &missing, &mv("n1", "a", "b")),
            Err(MoveRejectReason::MissingLocationEntry)
        );
    }

    #[test]
    fn batch_sees_effect_of_earlier_moves() {
        let s = state();
        let mut working = s.npc_locations.clone();
        let (applied, rejections) = apply_validated_moves(
            &s,
            &mut working,
            &[mv("n1", "a", "b"), mv("n1", "b", "c")],
        );
        assert_eq!(applied.len(), 2);
        assert!(rejections.is_empty());
        assert_eq!(working.get(&NpcId::new("n1")), Some(&LocationId::new("c")));
    }

    #[test]
    fn batch_collects_one_rejection_per_failure() {
        let s = state();
        let mut working = s.npc_locations.clone();
        let (applied, rejections) = apply_validated_moves(
            &s,
            &mut working,
            &[mv("n1", "b", "c"), mv("n2", "a", "b"), mv("ghost", "a", "b")],
        );
        assert_eq!(applied.len(), 1);
        assert_eq!(rejections.len(), 2);
        assert_eq!(rejections[0].reason, MoveRejectReason::FromLocationMismatch);
        assert_eq!(rejections[1].reason, MoveRejectReason::UnknownNpc);
        // n1 never moved.
        assert_eq!(working.get(&NpcId::new("n1")), Some(&LocationId::new("a")));
    }
}
