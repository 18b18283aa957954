//! Shared type definitions for the Fable narrative engine.
//!
//! This crate is the single source of truth for the data model used across
//! the workspace: world definitions, per-session game state, LLM turn
//! payloads, and the structured events the engine emits per turn.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe string wrappers for entity identifiers
//! - [`world`] -- Immutable world definitions ([`WorldSpec`])
//! - [`state`] -- Mutable per-session state ([`GameState`], quest journal)
//! - [`turn`] -- LLM-produced turn content ([`TurnOutput`])
//! - [`events`] -- Move rejection/refusal events and the audit record
//! - [`normalize`] -- Coercion helpers for loosely-shaped LLM payloads
//! - [`error`] -- Validation errors

pub mod error;
pub mod events;
pub mod ids;
pub mod normalize;
pub mod state;
pub mod turn;
pub mod world;

// Re-export all public types at crate root for convenience.
pub use error::ValidationError;
pub use events::{MoveRefusal, MoveRejectReason, MoveRejection, RetrievalDebug, TurnRecord};
pub use ids::{InvalidSessionId, ItemId, LocationId, NpcId, QuestId, SessionId, WorldId};
pub use state::{GameState, QuestProgress, QuestStatus};
pub use turn::{
    DialogueLine, NpcMove, QuestProgressUpdate, SafetyFlag, TurnOutput, WorldUpdates,
};
pub use world::{
    Location, MapNode, NpcProfile, QuestCategory, QuestSpec, WorldBible, WorldSpec,
};
