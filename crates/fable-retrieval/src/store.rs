//! Document storage.

use tracing::debug;

use crate::doc::Document;

/// Where session documents live between turns.
///
/// The engine only needs append and full scan; ranking happens in the
/// assembler over whatever the store returns.
pub trait DocumentStore {
    /// Append one document. Re-appending an existing id is a no-op.
    fn append(&mut self, doc: Document);

    /// Every stored document, in insertion order.
    fn documents(&self) -> &[Document];
}

/// In-memory store, one per session.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    docs: Vec<Document>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn append(&mut self, doc: Document) {
        if self.docs.iter().any(|d| d.doc_id == doc.doc_id) {
            debug!(doc_id = %doc.doc_id, "duplicate document ignored");
            return;
        }
        self.docs.push(doc);
    }

    fn documents(&self) -> &[Document] {
        &self.docs
    }
}
