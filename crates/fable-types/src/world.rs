//! Immutable world definitions.
//!
//! A [`WorldSpec`] is created once (typically by a world-generation step) and
//! never mutated afterwards. Game state copies the spec in and treats it as
//! read-only reference data for the rest of the session.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::{ItemId, LocationId, NpcId, QuestId, WorldId};

/// World rules and taboos driving the consistency guards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldBible {
    /// Technology era, e.g. `"medieval"` or `"modern"`.
    pub tech_level: String,
    /// Language the narration must stay in (`"en"` or `"zh"`).
    #[serde(default)]
    pub narrative_language: Option<String>,
    /// How magic behaves in this world.
    pub magic_rules: String,
    /// Narrative tone, e.g. `"grounded"`.
    pub tone: String,
    /// Subjects the narration must avoid.
    #[serde(default)]
    pub taboos: Vec<String>,
    /// Entities that must never be mentioned.
    #[serde(default)]
    pub do_not_mention: Vec<String>,
    /// Extra banned terms merged into the anachronism guard's list.
    #[serde(default)]
    pub anachronism_blocklist: Vec<String>,
}

/// Location definition used for map connectivity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Stable id like `loc_001` or `shop`.
    pub location_id: LocationId,
    /// Display name.
    pub name: String,
    /// Broad kind: town, dungeon, forest, castle, bridge, ...
    pub kind: String,
    /// Prose description shown to the LLM and the player.
    pub description: String,
    /// Directed adjacency list. Edges are not required to be bidirectional.
    #[serde(default)]
    pub connected_to: Vec<LocationId>,
    /// Free-form tags (`"risky"`, `"market"`, ...).
    #[serde(default)]
    pub tags: Vec<String>,
}

/// NPC personality and agency controls.
///
/// The four compliance scalars feed the agency decision engine; all are
/// deterministic inputs, none are sampled at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcProfile {
    /// Stable NPC id.
    pub npc_id: NpcId,
    /// Display name.
    pub name: String,
    /// Profession, used for role anchoring.
    pub profession: String,
    /// Personality traits.
    #[serde(default)]
    pub traits: Vec<String>,
    /// Personal goals.
    #[serde(default)]
    pub goals: Vec<String>,
    /// Location the NPC starts the session at.
    pub starting_location: LocationId,
    /// Willingness to follow player instructions, in [0, 1].
    pub obedience_level: f64,
    /// Resistance to being moved, in [0, 1].
    pub stubbornness: f64,
    /// Comfort with dangerous destinations, in [0, 1].
    pub risk_tolerance: f64,
    /// Attitude towards the player, integer in [-5, 5].
    pub disposition_to_player: i32,
    /// How refusals are phrased, e.g. `"blunt"` or `"polite"`.
    pub refusal_style: String,
}

/// Quest category distinguishing the single main storyline from side work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestCategory {
    /// The main storyline quest, completed only through its trial.
    Main,
    /// A side quest, completed through item delivery.
    Side,
}

impl QuestCategory {
    /// Stable string form used in logs and guidance text.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Side => "side",
        }
    }
}

/// Static quest definition authored in the world file.
///
/// Required and reward item maps here are the source of truth; runtime
/// journal entries derived from a spec may never redefine them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestSpec {
    /// Stable quest id.
    pub quest_id: QuestId,
    /// Display title.
    pub title: String,
    /// Quest category.
    pub category: QuestCategory,
    /// What the player is asked to do.
    pub objective: String,
    /// NPC who hands out (and receives deliveries for) this quest.
    #[serde(default)]
    pub giver_npc_id: Option<NpcId>,
    /// Where handovers are expected to happen, when pinned.
    #[serde(default)]
    pub suggested_location: Option<LocationId>,
    /// Items and amounts needed to fulfil the quest.
    #[serde(default)]
    pub required_items: BTreeMap<ItemId, u32>,
    /// Items granted exactly once on completion.
    #[serde(default)]
    pub reward_items: BTreeMap<ItemId, u32>,
}

/// Relative 2-D position of a location on the session map sketch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapNode {
    /// The location this node places.
    pub location_id: LocationId,
    /// Horizontal position, arbitrary units.
    pub x: f64,
    /// Vertical position, arbitrary units.
    pub y: f64,
}

/// World spec produced by world generation. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSpec {
    /// Stable world id.
    pub world_id: WorldId,
    /// Display title.
    pub title: String,
    /// Rules and taboos.
    pub world_bible: WorldBible,
    /// Ordered location list.
    pub locations: Vec<Location>,
    /// NPC roster.
    pub npcs: Vec<NpcProfile>,
    /// The main storyline quest, when the world has one.
    #[serde(default)]
    pub main_quest: Option<QuestSpec>,
    /// Side quest definitions.
    #[serde(default)]
    pub side_quests: Vec<QuestSpec>,
    /// Where the player starts.
    pub starting_location: LocationId,
    /// Opening narrative hook.
    pub starting_hook: String,
    /// One-line initial quest text shown before the journal exists.
    pub initial_quest: String,
    /// Relative map sketch, when generated.
    #[serde(default)]
    pub map_layout: Vec<MapNode>,
}

impl WorldSpec {
    /// The set of valid location ids.
    pub fn location_ids(&self) -> BTreeSet<&LocationId> {
        self.locations.iter().map(|loc| &loc.location_id).collect()
    }

    /// Look up a location by id.
    pub fn location(&self, location_id: &LocationId) -> Option<&Location> {
        self.locations
            .iter()
            .find(|loc| &loc.location_id == location_id)
    }

    /// Look up an NPC profile by id.
    pub fn npc(&self, npc_id: &NpcId) -> Option<&NpcProfile> {
        self.npcs.iter().find(|npc| &npc.npc_id == npc_id)
    }

    /// Iterate every static quest definition, main first.
    pub fn quest_specs(&self) -> impl Iterator<Item = &QuestSpec> {
        self.main_quest.iter().chain(self.side_quests.iter())
    }

    /// Look up a static quest definition by id.
    pub fn quest_spec(&self, quest_id: &QuestId) -> Option<&QuestSpec> {
        self.quest_specs().find(|q| &q.quest_id == quest_id)
    }

    /// Union of every item name the world knows about (required + rewards).
    pub fn known_items(&self) -> BTreeSet<&ItemId> {
        self.quest_specs()
            .flat_map(|q| q.required_items.keys().chain(q.reward_items.keys()))
            .collect()
    }

    /// Check structural integrity of the spec.
    ///
    /// Every referenced id (starting location, NPC starts, adjacency targets,
    /// quest giver and location) must exist, and ids must be unique within
    /// their namespace.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let loc_ids = self.location_ids();
        if loc_ids.len() != self.locations.len() {
            let mut seen = BTreeSet::new();
            for loc in &self.locations {
                if !seen.insert(&loc.location_id) {
                    return Err(ValidationError::DuplicateId {
                        kind: "location",
                        id: loc.location_id.to_string(),
                    });
                }
            }
        }

        let mut npc_seen = BTreeSet::new();
        for npc in &self.npcs {
            if !npc_seen.insert(&npc.npc_id) {
                return Err(ValidationError::DuplicateId {
                    kind: "npc",
                    id: npc.npc_id.to_string(),
                });
            }
        }

        let mut quest_seen = BTreeSet::new();
        for quest in self.quest_specs() {
            if !quest_seen.insert(&quest.quest_id) {
                return Err(ValidationError::DuplicateId {
                    kind: "quest",
                    id: quest.quest_id.to_string(),
                });
            }
        }

        if !loc_ids.contains(&self.starting_location) {
            return Err(ValidationError::UnknownStartingLocation {
                location: self.starting_location.clone(),
            });
        }

        for npc in &self.npcs {
            if !loc_ids.contains(&npc.starting_location) {
                return Err(ValidationError::UnknownNpcStart {
                    npc: npc.npc_id.clone(),
                    location: npc.starting_location.clone(),
                });
            }
        }

        // Adjacency targets must exist. (The runtime graph additionally drops
        // dangling edges defensively, but an authored spec must not have any.)
        for loc in &self.locations {
            for target in &loc.connected_to {
                if !loc_ids.contains(target) {
                    return Err(ValidationError::DanglingEdge {
                        location: loc.location_id.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        let npc_ids: BTreeSet<&NpcId> = self.npcs.iter().map(|n| &n.npc_id).collect();
        for quest in self.quest_specs() {
            if let Some(giver) = &quest.giver_npc_id {
                if !npc_ids.contains(giver) {
                    return Err(ValidationError::UnknownQuestGiver {
                        quest: quest.quest_id.clone(),
                        npc: giver.clone(),
                    });
                }
            }
            if let Some(location) = &quest.suggested_location {
                if !loc_ids.contains(location) {
                    return Err(ValidationError::UnknownQuestLocation {
                        quest: quest.quest_id.clone(),
                        location: location.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
