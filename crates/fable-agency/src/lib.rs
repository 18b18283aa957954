//! Deterministic NPC compliance decisions.
//!
//! Separates "the NPC is willing" from "the move is legal": the graph
//! validator owns legality, this crate owns willingness. Decisions are pure
//! functions of the NPC's compliance scalars and the request text, driven by
//! injected keyword vocabularies rather than global tables.

pub mod decision;
pub mod lexicon;

pub use decision::{AgencyDecision, AgencyEngine};
pub use lexicon::{AgencyLexicon, CueClassifier, KeywordClassifier, TextCue};
