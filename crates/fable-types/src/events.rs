//! Structured per-turn events and the audit record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{LocationId, NpcId, SessionId};
use crate::turn::TurnOutput;

/// Why a proposed move failed structural validation.
///
/// Checks run in this order; the first failure wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveRejectReason {
    /// NPC id not in the world roster.
    UnknownNpc,
    /// NPC has no entry in the state's location map.
    MissingLocationEntry,
    /// `from_location` disagrees with the NPC's recorded location.
    FromLocationMismatch,
    /// `to_location` is not a valid location id.
    UnknownTarget,
    /// No path from `from_location` to `to_location`.
    Unreachable,
}

impl MoveRejectReason {
    /// Stable string form used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownNpc => "unknown_npc",
            Self::MissingLocationEntry => "missing_location_entry",
            Self::FromLocationMismatch => "from_location_mismatch",
            Self::UnknownTarget => "unknown_target",
            Self::Unreachable => "unreachable",
        }
    }
}

impl core::fmt::Display for MoveRejectReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A move that failed graph validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRejection {
    /// The NPC whose move was rejected.
    pub npc_id: NpcId,
    /// Claimed origin.
    pub from_location: LocationId,
    /// Requested destination.
    pub to_location: LocationId,
    /// Which check failed.
    pub reason: MoveRejectReason,
}

/// A legal move the NPC declined to make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRefusal {
    /// The refusing NPC.
    pub npc_id: NpcId,
    /// Origin.
    pub from_location: LocationId,
    /// Requested destination.
    pub to_location: LocationId,
    /// Short human-readable refusal reason.
    pub reason: String,
    /// Decision factor tags (stubbornness, risk, role, disposition, ...).
    pub tags: Vec<String>,
}

/// Document ids that accompanied the turn's prompt, per tier.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetrievalDebug {
    /// Mandatory-context document ids.
    pub always_include: Vec<String>,
    /// Ranked-retrieval document ids, best first.
    pub retrieved: Vec<String>,
}

/// The audit record emitted for every committed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    /// Session the turn belongs to.
    pub session_id: SessionId,
    /// Turn index after the commit.
    pub turn_id: u64,
    /// When the turn was resolved.
    pub timestamp: DateTime<Utc>,
    /// The player's raw input.
    pub player_text: String,
    /// The NPC the player addressed, when one was selected.
    pub selected_npc_id: Option<NpcId>,
    /// Player location after the turn.
    pub location_id: LocationId,
    /// The sanitized turn output as committed.
    pub output: TurnOutput,
    /// Moves that failed structural validation.
    #[serde(default)]
    pub move_rejections: Vec<MoveRejection>,
    /// Legal moves the NPC declined.
    #[serde(default)]
    pub move_refusals: Vec<MoveRefusal>,
    /// Moves actually applied.
    pub applied_moves: usize,
    /// Guard fallback notices appended to the narration, if any.
    #[serde(default)]
    pub guard_notices: Vec<String>,
    /// Context documents that accompanied the prompt.
    #[serde(default)]
    pub retrieval: RetrievalDebug,
}
