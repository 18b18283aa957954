//! Post-generation consistency guards.
//!
//! Each guard scans the model's turn output for a class of world-consistency
//! violations, asks the model to rewrite the output at most once, and
//! re-checks the result. An unresolved violation either degrades the turn
//! with a visible notice or fails it, per policy. Detection is fully
//! deterministic; only the rewrite goes through the model.

pub mod anachronism;
pub mod outcome;
pub mod quest_items;
pub mod roster;
pub mod runner;
pub mod text;

pub use anachronism::AnachronismGuard;
pub use outcome::{GuardError, GuardOutcome, GuardPolicy};
pub use quest_items::QuestItemGuard;
pub use roster::RosterGuard;
pub use runner::{enforce, ConsistencyCheck, GuardContext};
