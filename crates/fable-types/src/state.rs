//! Mutable per-session game state.
//!
//! [`GameState`] is the single source of truth for one session. It is owned
//! exclusively by the turn orchestrator for the duration of a turn: all
//! mutation happens on a working copy which is validated and then swapped in,
//! never in place.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::{ItemId, LocationId, NpcId, QuestId, SessionId};
use crate::world::{QuestCategory, WorldSpec};

/// Lifecycle status of a journal entry.
///
/// Progression is `available -> active -> completed`; `failed` is reached
/// only through an explicit main-trial resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    /// Known but not yet taken up.
    Available,
    /// In progress.
    Active,
    /// Finished successfully. Terminal.
    Completed,
    /// Failed (main trial only). Terminal.
    Failed,
}

impl QuestStatus {
    /// Whether the quest can still make progress.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Available | Self::Active)
    }

    /// Stable string form used in guidance text and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Live progress for one quest in the journal.
///
/// Entries materialized from a [`WorldSpec`] quest keep their definition
/// fields (`required_items`, `reward_items`, giver, location) frozen; only
/// `status`, `guidance`, and `collected_items` change at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestProgress {
    /// Quest id, matching the spec id when world-originated.
    pub quest_id: QuestId,
    /// Display title.
    pub title: String,
    /// Main or side.
    pub category: QuestCategory,
    /// Current lifecycle status.
    pub status: QuestStatus,
    /// What the player is asked to do.
    pub objective: String,
    /// Derived human-readable next-step text.
    #[serde(default)]
    pub guidance: String,
    /// NPC who owns the quest, when known.
    #[serde(default)]
    pub giver_npc_id: Option<NpcId>,
    /// Pinned handover location, when set.
    #[serde(default)]
    pub suggested_location: Option<LocationId>,
    /// Items and amounts needed.
    #[serde(default)]
    pub required_items: BTreeMap<ItemId, u32>,
    /// Items handed over so far. Each entry stays `<=` its required amount.
    #[serde(default)]
    pub collected_items: BTreeMap<ItemId, u32>,
    /// Items granted exactly once on completion.
    #[serde(default)]
    pub reward_items: BTreeMap<ItemId, u32>,
}

impl QuestProgress {
    /// Whether every required item has been collected in full.
    pub fn requirements_met(&self) -> bool {
        self.required_items
            .iter()
            .all(|(item, need)| self.collected_items.get(item).copied().unwrap_or(0) >= *need)
    }
}

/// Global game state for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Validated filesystem-safe session id.
    pub session_id: SessionId,
    /// Session creation time.
    pub created_at: DateTime<Utc>,
    /// The immutable world definition, copied in at session start.
    pub world: WorldSpec,
    /// Where the player currently is.
    pub player_location: LocationId,
    /// Current location of every roster NPC. Total over the roster.
    pub npc_locations: BTreeMap<NpcId, LocationId>,
    /// Boolean story flags.
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
    /// Player inventory. Items are removed when their count reaches zero.
    #[serde(default)]
    pub inventory: BTreeMap<ItemId, u32>,
    /// Quest journal keyed by quest id.
    #[serde(default)]
    pub quests: BTreeMap<QuestId, QuestProgress>,
    /// Journal key of the main quest, when the world defines one.
    #[serde(default)]
    pub main_quest_id: Option<QuestId>,
    /// Per-location item stocks available for gathering.
    #[serde(default)]
    pub location_stocks: BTreeMap<LocationId, BTreeMap<ItemId, u32>>,
    /// Rolling narrative summaries, oldest first.
    #[serde(default)]
    pub recent_summaries: Vec<String>,
    /// Monotonically increasing turn counter.
    #[serde(default)]
    pub turn_counter: u64,
}

impl GameState {
    /// NPCs currently at the given location.
    pub fn npcs_at(&self, location_id: &LocationId) -> Vec<&NpcId> {
        self.npc_locations
            .iter()
            .filter(|(_, loc)| *loc == location_id)
            .map(|(npc, _)| npc)
            .collect()
    }

    /// Validate every cross-reference in the state.
    ///
    /// The player location and every NPC location must be valid location ids,
    /// the NPC-location map must be a total function over the roster,
    /// `main_quest_id` must key into the journal, and no journal entry may
    /// have collected more of an item than it requires.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let loc_ids = self.world.location_ids();
        if !loc_ids.contains(&self.player_location) {
            return Err(ValidationError::InvalidPlayerLocation {
                location: self.player_location.clone(),
            });
        }

        let roster: BTreeSet<&NpcId> = self.world.npcs.iter().map(|n| &n.npc_id).collect();
        for npc_id in self.npc_locations.keys() {
            if !roster.contains(npc_id) {
                return Err(ValidationError::UnknownNpcInState {
                    npc: npc_id.clone(),
                });
            }
        }
        for npc_id in &roster {
            if !self.npc_locations.contains_key(*npc_id) {
                return Err(ValidationError::MissingNpcLocation {
                    npc: (*npc_id).clone(),
                });
            }
        }
        for (npc_id, loc_id) in &self.npc_locations {
            if !loc_ids.contains(loc_id) {
                return Err(ValidationError::InvalidNpcLocation {
                    npc: npc_id.clone(),
                    location: loc_id.clone(),
                });
            }
        }

        if let Some(main_id) = &self.main_quest_id {
            if !self.quests.contains_key(main_id) {
                return Err(ValidationError::MissingMainQuest {
                    quest: main_id.clone(),
                });
            }
        }

        for quest in self.quests.values() {
            for (item, collected) in &quest.collected_items {
                let required = quest.required_items.get(item).copied().unwrap_or(0);
                if *collected > required {
                    return Err(ValidationError::CollectedExceedsRequired {
                        quest: quest.quest_id.clone(),
                        collected: *collected,
                        required,
                    });
                }
            }
        }

        Ok(())
    }
}
