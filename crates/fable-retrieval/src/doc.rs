//! Long-term memory documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fable_types::{LocationId, NpcId, SessionId};

/// What a document describes. Drives scoping during retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocKind {
    /// World-bible summary.
    WorldBible,
    /// A location description.
    Location,
    /// An NPC's profile card.
    NpcProfile,
    /// A private memory of one NPC.
    NpcMemory,
    /// A per-turn narrative summary.
    Summary,
}

impl DocKind {
    /// Stable string form used inside document ids.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WorldBible => "world_bible",
            Self::Location => "location",
            Self::NpcProfile => "npc_profile",
            Self::NpcMemory => "npc_memory",
            Self::Summary => "summary",
        }
    }
}

/// One retrievable document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Deterministic id, unique within a session.
    pub doc_id: String,
    /// Document kind.
    pub kind: DocKind,
    /// Owning NPC, when scoped to one.
    #[serde(default)]
    pub npc_id: Option<NpcId>,
    /// Owning location, when scoped to one.
    #[serde(default)]
    pub location_id: Option<LocationId>,
    /// Turn the document was written on.
    pub turn_id: u64,
    /// Creation time, used for tie-breaking.
    pub created_at: DateTime<Utc>,
    /// Document body.
    pub text: String,
}

impl Document {
    /// Create a document with a deterministic id derived from its scope and
    /// a short content hash.
    pub fn new(
        session_id: &SessionId,
        kind: DocKind,
        npc_id: Option<NpcId>,
        location_id: Option<LocationId>,
        turn_id: u64,
        created_at: DateTime<Utc>,
        text: String,
    ) -> Self {
        let npc_part = npc_id.as_ref().map_or("-", NpcId::as_str);
        let loc_part = location_id.as_ref().map_or("-", LocationId::as_str);
        let doc_id = format!(
            "{}:{}:{}:{}:{}:{:08x}",
            session_id.as_str(),
            kind.as_str(),
            npc_part,
            loc_part,
            turn_id,
            content_hash(&text)
        );
        Self {
            doc_id,
            kind,
            npc_id,
            location_id,
            turn_id,
            created_at,
            text,
        }
    }
}

/// FNV-1a over the text, folded to 32 bits for a compact id suffix.
fn content_hash(text: &str) -> u32 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for byte in text.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    #[allow(clippy::cast_possible_truncation)]
    let folded = (hash ^ (hash >> 32)) as u32;
    folded
}
