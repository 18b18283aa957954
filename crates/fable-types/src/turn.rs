//! LLM-produced turn content.
//!
//! These types deserialize the structured JSON the model returns for one
//! turn. They are ephemeral inputs to the resolution core and are never
//! persisted except inside audit records. Deserialization is deliberately
//! lenient where models are known to drift: `safety` accepts a bare boolean,
//! and the legacy `quest_updates` map accepts an empty list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{ItemId, LocationId, NpcId, QuestId};
use crate::state::QuestStatus;

/// One line of NPC dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueLine {
    /// The speaking NPC.
    pub npc_id: NpcId,
    /// What they said.
    pub text: String,
}

/// A proposed NPC relocation. Ephemeral; never persisted beyond one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcMove {
    /// The NPC being moved.
    pub npc_id: NpcId,
    /// Where the model believes the NPC currently is.
    pub from_location: LocationId,
    /// Where the NPC should end up.
    pub to_location: LocationId,
    /// What prompted the move: player_instruction, story_event, system.
    pub trigger: String,
    /// Free-text reason given by the model.
    pub reason: String,
    /// temporary or permanent.
    pub permanence: String,
    /// Model confidence in [0, 1].
    pub confidence: f64,
}

/// Structured per-quest progress update proposed by the model.
///
/// Definition fields on world-originated quests are ignored at apply time;
/// they exist here because models emit them anyway.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuestProgressUpdate {
    /// Target quest.
    pub quest_id: QuestId,
    /// Proposed status change.
    #[serde(default)]
    pub status: Option<QuestStatus>,
    /// Proposed title (ignored for world quests).
    #[serde(default)]
    pub title: Option<String>,
    /// Proposed objective (ignored for world quests).
    #[serde(default)]
    pub objective: Option<String>,
    /// Proposed guidance text.
    #[serde(default)]
    pub guidance: Option<String>,
    /// Proposed giver (ignored for world quests).
    #[serde(default)]
    pub giver_npc_id: Option<NpcId>,
    /// Proposed handover location (ignored for world quests).
    #[serde(default)]
    pub suggested_location: Option<LocationId>,
    /// Proposed requirement map (ignored for world quests).
    #[serde(default)]
    pub required_items: BTreeMap<ItemId, u32>,
    /// Proposed reward map (ignored for world quests).
    #[serde(default)]
    pub reward_items: BTreeMap<ItemId, u32>,
    /// Proposed collection progress. Rejected whenever the quest has
    /// non-empty required items; delivery is the only progress path.
    #[serde(default)]
    pub collected_items_delta: BTreeMap<ItemId, u32>,
}

/// World-state delta proposed by the model for one turn.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldUpdates {
    /// New player location, when the player moved.
    #[serde(default)]
    pub player_location: Option<LocationId>,
    /// Proposed NPC relocations.
    #[serde(default)]
    pub npc_moves: Vec<NpcMove>,
    /// Boolean flag changes.
    #[serde(default)]
    pub flags_delta: BTreeMap<String, bool>,
    /// Legacy quest status map (`quest id -> status word`). Models sometimes
    /// emit `[]` instead of `{}`; both deserialize to empty.
    #[serde(default, deserialize_with = "de_lenient_string_map")]
    pub quest_updates: BTreeMap<QuestId, String>,
    /// Structured quest progress updates.
    #[serde(default)]
    pub quest_progress_updates: Vec<QuestProgressUpdate>,
    /// Inventory changes (positive grants, negative consumption).
    #[serde(default)]
    pub inventory_delta: BTreeMap<ItemId, i64>,
}

/// Refusal flag attached to every turn.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SafetyFlag {
    /// Whether the model declined to narrate the request.
    pub refuse: bool,
    /// Why, when refused.
    pub reason: Option<String>,
}

impl<'de> Deserialize<'de> for SafetyFlag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Full {
            #[serde(default)]
            refuse: bool,
            #[serde(default)]
            reason: Option<String>,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Lenient {
            Bool(bool),
            Full(Full),
        }

        match Lenient::deserialize(deserializer)? {
            Lenient::Bool(refuse) => Ok(Self {
                refuse,
                reason: None,
            }),
            Lenient::Full(full) => Ok(Self {
                refuse: full.refuse,
                reason: full.reason,
            }),
        }
    }
}

/// The complete structured turn content produced by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutput {
    /// Narration shown to the player.
    pub narration: String,
    /// NPC dialogue lines.
    #[serde(default)]
    pub npc_dialogue: Vec<DialogueLine>,
    /// Proposed world-state delta.
    #[serde(default)]
    pub world_updates: WorldUpdates,
    /// One-line summary for the rolling memory window.
    #[serde(default)]
    pub memory_summary: String,
    /// Refusal flag.
    #[serde(default)]
    pub safety: SafetyFlag,
}

impl TurnOutput {
    /// Dialogue lines spoken by the given NPC, in order.
    pub fn dialogue_for(&self, npc_id: &NpcId) -> Vec<&str> {
        self.npc_dialogue
            .iter()
            .filter(|line| &line.npc_id == npc_id)
            .map(|line| line.text.as_str())
            .collect()
    }

    /// All NPC-authored text (narration + dialogue) joined for guard scans.
    pub fn npc_authored_text(&self) -> String {
        let mut text = self.narration.clone();
        for line in &self.npc_dialogue {
            text.push('\n');
            text.push_str(&line.text);
        }
        text
    }
}

/// Accept either a map or an empty list for a string-valued map field.
fn de_lenient_string_map<'de, D>(deserializer: D) -> Result<BTreeMap<QuestId, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MapOrList {
        Map(BTreeMap<QuestId, String>),
        List(Vec<serde_json::Value>),
    }

    match MapOrList::deserialize(deserializer)? {
        MapOrList::Map(map) => Ok(map),
        MapOrList::List(_) => Ok(BTreeMap::new()),
    }
}
