//! Session persistence.
//!
//! One directory per session holding an atomically-replaced state snapshot
//! plus append-only turn and story logs in JSON lines.

pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::{generate_session_id, session_path, SessionStore, StoryEntry};
