//! Validation errors for world definitions and game state.

use thiserror::Error;

use crate::ids::{LocationId, NpcId, QuestId};

/// Errors raised when a world definition or game state fails validation.
///
/// These indicate a data-integrity defect in authored or persisted data,
/// not a recoverable narrative anomaly.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Two entities in the same namespace share an id.
    #[error("duplicate {kind} id: {id}")]
    DuplicateId {
        /// Namespace of the clash (location, npc, quest).
        kind: &'static str,
        /// The duplicated id.
        id: String,
    },

    /// The world's starting location is not in the location set.
    #[error("starting location {location} does not exist")]
    UnknownStartingLocation {
        /// The missing location id.
        location: LocationId,
    },

    /// An NPC's starting location is not in the location set.
    #[error("npc {npc} starts at unknown location {location}")]
    UnknownNpcStart {
        /// The NPC whose start is invalid.
        npc: NpcId,
        /// The missing location id.
        location: LocationId,
    },

    /// A location's adjacency list points at a location that does not exist.
    #[error("location {location} connects to unknown location {target}")]
    DanglingEdge {
        /// The location carrying the edge.
        location: LocationId,
        /// The missing edge target.
        target: LocationId,
    },

    /// A quest references a giver NPC not in the roster.
    #[error("quest {quest} references unknown giver npc {npc}")]
    UnknownQuestGiver {
        /// The quest carrying the reference.
        quest: QuestId,
        /// The missing NPC id.
        npc: NpcId,
    },

    /// A quest's suggested location is not in the location set.
    #[error("quest {quest} references unknown location {location}")]
    UnknownQuestLocation {
        /// The quest carrying the reference.
        quest: QuestId,
        /// The missing location id.
        location: LocationId,
    },

    /// The player's recorded location is not in the location set.
    #[error("player location {location} does not exist")]
    InvalidPlayerLocation {
        /// The missing location id.
        location: LocationId,
    },

    /// The NPC-location map is missing an entry for a roster NPC.
    #[error("npc {npc} has no location entry")]
    MissingNpcLocation {
        /// The unmapped NPC.
        npc: NpcId,
    },

    /// The NPC-location map contains an entry for an NPC not in the roster.
    #[error("location map references npc {npc} not in the roster")]
    UnknownNpcInState {
        /// The extraneous NPC id.
        npc: NpcId,
    },

    /// An NPC's recorded location is not in the location set.
    #[error("npc {npc} is recorded at unknown location {location}")]
    InvalidNpcLocation {
        /// The NPC whose location is invalid.
        npc: NpcId,
        /// The missing location id.
        location: LocationId,
    },

    /// `main_quest_id` is set but absent from the quest journal.
    #[error("main quest {quest} is not present in the journal")]
    MissingMainQuest {
        /// The dangling main quest id.
        quest: QuestId,
    },

    /// A journal entry's collected count exceeds its required count.
    #[error("quest {quest} collected {collected} of an item requiring only {required}")]
    CollectedExceedsRequired {
        /// The offending quest.
        quest: QuestId,
        /// Collected amount found.
        collected: u32,
        /// Required amount defined.
        required: u32,
    },
}
