//! Retrieval context assembly.
//!
//! Selects the documents accompanying each turn request: an always-include
//! tier rebuilt from state every turn, plus a ranked tier scored by token
//! overlap with a scoped fallback chain.

pub mod assemble;
pub mod doc;
pub mod score;
pub mod store;

pub use assemble::{assemble, ContextBundle, RetrievalConfig};
pub use doc::{DocKind, Document};
pub use score::{overlap_score, tokenize};
pub use store::{DocumentStore, MemoryDocumentStore};
