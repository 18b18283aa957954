//! Two-tier context assembly.
//!
//! The always-include tier is synthesized fresh from state each turn; the
//! ranked tier pulls from the document store with a scoped fallback chain
//! (NPC, then location, then the whole session) that stops as soon as
//! `top_k` documents are found. A document id never appears twice across
//! the two tiers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use fable_types::{GameState, NpcId, RetrievalDebug};

use crate::doc::{DocKind, Document};
use crate::score::{overlap_score, tokenize};
use crate::store::DocumentStore;

/// Retrieval tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// How many ranked documents to retrieve per turn.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// How many recent narrative summaries to always include.
    #[serde(default = "default_summary_window")]
    pub summary_window: usize,
    /// How many recent private memories of the acting NPC to always include.
    #[serde(default = "default_memory_slice")]
    pub memory_slice: usize,
}

fn default_top_k() -> usize {
    4
}

fn default_summary_window() -> usize {
    5
}

fn default_memory_slice() -> usize {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            summary_window: default_summary_window(),
            memory_slice: default_memory_slice(),
        }
    }
}

/// The assembled context for one turn.
#[derive(Debug, Clone)]
pub struct ContextBundle {
    /// Unconditionally included documents.
    pub always_include: Vec<Document>,
    /// Ranked-retrieval documents, best first.
    pub retrieved: Vec<Document>,
}

impl ContextBundle {
    /// Document ids for the audit record.
    pub fn debug_block(&self) -> RetrievalDebug {
        RetrievalDebug {
            always_include: self
                .always_include
                .iter()
                .map(|d| d.doc_id.clone())
                .collect(),
            retrieved: self.retrieved.iter().map(|d| d.doc_id.clone()).collect(),
        }
    }
}

/// Assemble the context bundle for one turn.
pub fn assemble<S: DocumentStore>(
    store: &S,
    state: &GameState,
    npc_id: &NpcId,
    player_text: &str,
    config: &RetrievalConfig,
) -> ContextBundle {
    let always_include = build_always_include(store, state, npc_id, config);
    let included: BTreeSet<&str> = always_include
        .iter()
        .map(|d| d.doc_id.as_str())
        .collect();

    let query = format!("{player_text} {}", state.player_location);
    let query_tokens = tokenize(&query);

    let candidates: Vec<&Document> = store
        .documents()
        .iter()
        .filter(|d| !included.contains(d.doc_id.as_str()))
        .collect();

    // Scoped fallback chain; each tier widens the candidate pool.
    let mut retrieved: Vec<Document> = Vec::new();
    let mut chosen: BTreeSet<String> = BTreeSet::new();
    let tiers: [&dyn Fn(&Document) -> bool; 3] = [
        &|d: &Document| d.npc_id.as_ref() == Some(npc_id),
        &|d: &Document| d.location_id.as_ref() == Some(&state.player_location),
        &|_: &Document| true,
    ];
    for tier in tiers {
        if retrieved.len() >= config.top_k {
            break;
        }
        let mut scored: Vec<(usize, &Document)> = candidates
            .iter()
            .filter(|d| !chosen.contains(&d.doc_id) && tier(d))
            .filter_map(|d| {
                let score = overlap_score(&query_tokens, &d.text);
                (score > 0).then_some((score, *d))
            })
            .collect();
        scored.sort_by(|(score_a, a), (score_b, b)| {
            score_b
                .cmp(score_a)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.doc_id.cmp(&b.doc_id))
        });
        for (_, doc) in scored {
            if retrieved.len() >= config.top_k {
                break;
            }
            chosen.insert(doc.doc_id.clone());
            retrieved.push(doc.clone());
        }
    }
    debug!(
        always = always_include.len(),
        retrieved = retrieved.len(),
        "context assembled"
    );
    ContextBundle {
        always_include,
        retrieved,
    }
}

fn build_always_include<S: DocumentStore>(
    store: &S,
    state: &GameState,
    npc_id: &NpcId,
    config: &RetrievalConfig,
) -> Vec<Document> {
    let mut docs = Vec::new();
    let now = state.created_at;
    let bible = &state.world.world_bible;
    let bible_text = format!(
        "World: {}. Tech level: {}. Magic: {}. Tone: {}. Taboos: {}.",
        state.world.title,
        bible.tech_level,
        bible.magic_rules,
        bible.tone,
        bible.taboos.join(", ")
    );
    docs.push(Document::new(
        &state.session_id,
        DocKind::WorldBible,
        None,
        None,
        state.turn_counter,
        now,
        bible_text,
    ));

    if let Some(location) = state.world.location(&state.player_location) {
        docs.push(Document::new(
            &state.session_id,
            DocKind::Location,
            None,
            Some(location.location_id.clone()),
            state.turn_counter,
            now,
            format!("{}: {}", location.name, location.description),
        ));
    }

    if let Some(npc) = state.world.npc(npc_id) {
        let profile_text = format!(
            "{} ({}). Traits: {}. Goals: {}.",
            npc.name,
            npc.profession,
            npc.traits.join(", "),
            npc.goals.join(", ")
        );
        docs.push(Document::new(
            &state.session_id,
            DocKind::NpcProfile,
            Some(npc.npc_id.clone()),
            None,
            state.turn_counter,
            now,
            profile_text,
        ));
    }

    // The acting NPC's most recent private memories.
    let mut memories: Vec<&Document> = store
        .documents()
        .iter()
        .filter(|d| d.kind == DocKind::NpcMemory && d.npc_id.as_ref() == Some(npc_id))
        .collect();
    memories.sort_by_key(|d| d.turn_id);
    for memory in memories.iter().rev().take(config.memory_slice).rev() {
        docs.push((*memory).clone());
    }

    // The last few narrative summaries, oldest first.
    let start = state
        .recent_summaries
        .len()
        .saturating_sub(config.summary_window);
    for summary in &state.recent_summaries[start..] {
        docs.push(Document::new(
            &state.session_id,
            DocKind::Summary,
            None,
            None,
            state.turn_counter,
            now,
            summary.clone(),
        ));
    }

    // Dedupe by id while keeping order.
    let mut seen = BTreeSet::new();
    docs.retain(|d| seen.insert(d.doc_id.clone()));
    docs
}
