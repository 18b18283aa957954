//! Location graph and movement validation.
//!
//! Answers the structural half of the movement question: whether a proposed
//! NPC relocation is legal on the world's location graph. Willingness is a
//! separate concern handled by the agency engine.

pub mod graph;
pub mod movement;

pub use graph::LocationGraph;
pub use movement::{apply_validated_moves, validate_move};
