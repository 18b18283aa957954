//! The turn pipeline.
//!
//! One `run_turn` call is one resolved turn: assemble context, generate the
//! structured output, run the consistency guards, then commit the proposed
//! deltas onto a working copy of the state. The live state is only replaced
//! after the working copy validates, so a failed turn leaves the session
//! exactly where it was.

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use fable_agency::AgencyEngine;
use fable_guards::{
    enforce, AnachronismGuard, GuardContext, QuestItemGuard, RosterGuard,
};
use fable_llm::{LlmClient, OpenAiClient, PromptEngine};
use fable_quests::{
    deliver_items_to_npc, resolve_main_trial, sync_quest_journal, DeliveryReceipt, ItemCatalog,
    TrialOutcome,
};
use fable_retrieval::{assemble, ContextBundle, DocKind, Document, DocumentStore, MemoryDocumentStore};
use fable_store::{SessionStore, StoryEntry};
use fable_types::{
    GameState, ItemId, NpcId, SessionId, TurnRecord, WorldSpec,
};
use fable_world::apply_validated_moves;

use crate::apply::apply_world_updates;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::session::new_session;

/// The orchestrator that owns everything a session needs across turns.
pub struct TurnPipeline {
    client: LlmClient,
    prompts: PromptEngine,
    agency: AgencyEngine,
    catalog: ItemCatalog,
    docs: MemoryDocumentStore,
    store: SessionStore,
    config: EngineConfig,
}

impl TurnPipeline {
    /// Build a pipeline around an existing client.
    pub fn new(config: EngineConfig, client: LlmClient) -> Result<Self, EngineError> {
        let prompts = PromptEngine::new()?;
        let store = SessionStore::open(&config.store_root)?;
        Ok(Self {
            client,
            prompts,
            agency: AgencyEngine::default(),
            catalog: ItemCatalog::default(),
            docs: MemoryDocumentStore::new(),
            store,
            config,
        })
    }

    /// Build a pipeline with an OpenAI-compatible client from the config.
    pub fn from_config(config: EngineConfig) -> Result<Self, EngineError> {
        let llm = &config.llm;
        let client = OpenAiClient::new(
            llm.base_url.clone(),
            llm.api_key.clone(),
            llm.model.clone(),
            llm.timeout_secs,
            llm.temperature,
            llm.max_tokens,
        )?;
        Self::new(config, LlmClient::OpenAi(client))
    }

    /// Create and persist a fresh session for a world.
    pub fn start_session(&self, world: WorldSpec) -> Result<GameState, EngineError> {
        let state = new_session(world, Utc::now(), &self.catalog)?;
        self.store.save_state(&state)?;
        Ok(state)
    }

    /// Load a previously saved session.
    pub fn load_session(&self, session_id: &SessionId) -> Result<GameState, EngineError> {
        Ok(self.store.load_state(session_id)?)
    }

    /// Resolve one turn of the player addressing `npc_id`.
    ///
    /// The commit is all-or-nothing. Refused turns (safety flag set) keep
    /// their narration but apply no world deltas and no moves; they still
    /// advance the turn counter and are recorded.
    ///
    /// # Errors
    ///
    /// Fails when the NPC is off the roster, the LLM cannot produce valid
    /// output even after the one-shot repair, a fatal-policy guard stays
    /// violated, the committed state would break an invariant, or
    /// persistence fails.
    pub async fn run_turn(
        &mut self,
        state: &mut GameState,
        npc_id: &NpcId,
        player_text: &str,
    ) -> Result<TurnRecord, EngineError> {
        if state.world.npc(npc_id).is_none() {
            return Err(EngineError::UnknownNpc {
                npc: npc_id.clone(),
            });
        }

        let bundle = assemble(&self.docs, state, npc_id, player_text, &self.config.retrieval);
        let context = turn_context(state, npc_id, player_text, &bundle, &self.config);
        let prompt = self.prompts.render_turn(&context)?;
        let mut output = self.client.generate_turn(&prompt).await?;

        let mut guard_notices: Vec<String> = Vec::new();
        {
            let ctx = GuardContext {
                world: &state.world,
                quests: &state.quests,
                npc_id,
                player_text,
            };
            let anachronism = AnachronismGuard::for_world(&state.world);
            let outcome = enforce(
                &anachronism,
                self.config.guards.anachronism,
                &self.client,
                &self.prompts,
                &mut output,
                &ctx,
            )
            .await?;
            if let Some(notice) = outcome.notice() {
                guard_notices.push(notice.to_owned());
            }

            let outcome = enforce(
                &RosterGuard,
                self.config.guards.roster,
                &self.client,
                &self.prompts,
                &mut output,
                &ctx,
            )
            .await?;
            if let Some(notice) = outcome.notice() {
                guard_notices.push(notice.to_owned());
            }

            let quest_items = QuestItemGuard::new(self.catalog.surface_forms());
            let outcome = enforce(
                &quest_items,
                self.config.guards.quest_items,
                &self.client,
                &self.prompts,
                &mut output,
                &ctx,
            )
            .await?;
            if let Some(notice) = outcome.notice() {
                guard_notices.push(notice.to_owned());
            }
        }

        let mut working = state.clone();
        let mut move_rejections = Vec::new();
        let mut move_refusals = Vec::new();
        let mut applied_moves = 0;

        if output.safety.refuse {
            warn!(
                reason = output.safety.reason.as_deref().unwrap_or("unspecified"),
                "turn refused, world deltas skipped"
            );
        } else {
            apply_world_updates(&mut working, &output.world_updates, &self.catalog)?;

            let mut dialogue_by_id: BTreeMap<NpcId, Vec<String>> = BTreeMap::new();
            for line in &output.npc_dialogue {
                dialogue_by_id
                    .entry(line.npc_id.clone())
                    .or_default()
                    .push(line.text.clone());
            }
            let (gated, refusals) = self.agency.apply_gate(
                &output.world_updates.npc_moves,
                &working,
                &working.world,
                player_text,
                &dialogue_by_id,
            );
            move_refusals = refusals;

            let mut npc_locations = working.npc_locations.clone();
            let (applied, rejections) =
                apply_validated_moves(&working, &mut npc_locations, &gated);
            working.npc_locations = npc_locations;
            move_rejections = rejections;
            applied_moves = applied.len();
        }

        sync_quest_journal(&mut working, &self.catalog);

        let summary = output.memory_summary.trim();
        if !summary.is_empty() {
            working.recent_summaries.push(summary.to_owned());
            let overflow = working
                .recent_summaries
                .len()
                .saturating_sub(self.config.summary_history);
            if overflow > 0 {
                working.recent_summaries.drain(..overflow);
            }
        }
        working.turn_counter += 1;

        for notice in &guard_notices {
            output.narration.push('\n');
            output.narration.push_str(notice);
        }

        working.validate()?;

        let now = Utc::now();
        if !summary.is_empty() {
            self.docs.append(Document::new(
                &working.session_id,
                DocKind::NpcMemory,
                Some(npc_id.clone()),
                Some(working.player_location.clone()),
                working.turn_counter,
                now,
                summary.to_owned(),
            ));
            self.docs.append(Document::new(
                &working.session_id,
                DocKind::Summary,
                None,
                None,
                working.turn_counter,
                now,
                summary.to_owned(),
            ));
        }

        *state = working;

        let record = TurnRecord {
            session_id: state.session_id.clone(),
            turn_id: state.turn_counter,
            timestamp: now,
            player_text: player_text.to_owned(),
            selected_npc_id: Some(npc_id.clone()),
            location_id: state.player_location.clone(),
            output,
            move_rejections,
            move_refusals,
            applied_moves,
            guard_notices,
            retrieval: bundle.debug_block(),
        };

        self.store.append_turn(&record)?;
        self.store.append_story(
            &state.session_id,
            &StoryEntry {
                turn_id: record.turn_id,
                timestamp: record.timestamp,
                player_text: record.player_text.clone(),
                narration: record.output.narration.clone(),
            },
        )?;
        self.store.save_state(state)?;

        info!(
            session = state.session_id.as_str(),
            turn = record.turn_id,
            applied_moves = record.applied_moves,
            refusals = record.move_refusals.len(),
            "turn committed"
        );
        Ok(record)
    }

    /// Hand items to an NPC at the player's current location.
    ///
    /// Runs the delivery transaction, re-syncs the journal, and persists the
    /// result.
    pub fn deliver(
        &self,
        state: &mut GameState,
        npc_id: &NpcId,
        handover: &BTreeMap<ItemId, u32>,
    ) -> Result<DeliveryReceipt, EngineError> {
        let location = state.player_location.clone();
        let receipt = deliver_items_to_npc(
            state,
            &self.catalog,
            npc_id,
            &location,
            handover,
            self.config.delivery_policy,
        );
        sync_quest_journal(state, &self.catalog);
        state.validate()?;
        self.store.save_state(state)?;
        Ok(receipt)
    }

    /// Resolve the main trial and persist the result.
    pub fn resolve_trial(
        &self,
        state: &mut GameState,
        passed: bool,
    ) -> Result<TrialOutcome, EngineError> {
        let outcome = resolve_main_trial(state, passed, &self.catalog);
        sync_quest_journal(state, &self.catalog);
        state.validate()?;
        self.store.save_state(state)?;
        Ok(outcome)
    }

    /// The item catalog in use.
    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }
}

/// Build the template context for one turn.
///
/// Narrative summaries travel under their own key; the always-include tier
/// therefore contributes only its non-summary documents here, although the
/// audit record lists all of them.
fn turn_context(
    state: &GameState,
    npc_id: &NpcId,
    player_text: &str,
    bundle: &ContextBundle,
    config: &EngineConfig,
) -> serde_json::Value {
    let bible = &state.world.world_bible;
    let location = state.world.location(&state.player_location);
    let npc = state.world.npc(npc_id);

    let npcs_present: Vec<&str> = state
        .npc_locations
        .iter()
        .filter(|(_, loc)| **loc == state.player_location)
        .filter_map(|(id, _)| state.world.npc(id))
        .map(|profile| profile.name.as_str())
        .collect();

    let doc_entry = |doc: &Document| json!({"id": doc.doc_id, "text": doc.text});
    let always_include: Vec<serde_json::Value> = bundle
        .always_include
        .iter()
        .filter(|doc| doc.kind != DocKind::Summary)
        .map(doc_entry)
        .collect();
    let retrieved: Vec<serde_json::Value> = bundle.retrieved.iter().map(doc_entry).collect();

    let start = state
        .recent_summaries
        .len()
        .saturating_sub(config.retrieval.summary_window);
    let recent_summaries = &state.recent_summaries[start..];

    json!({
        "world_title": state.world.title,
        "tone": bible.tone,
        "tech_level": bible.tech_level,
        "magic_rules": bible.magic_rules,
        "narrative_language": bible.narrative_language.as_deref().unwrap_or("en"),
        "taboos": bible.taboos,
        "location_name": location.map_or("", |loc| loc.name.as_str()),
        "location_id": state.player_location,
        "location_description": location.map_or("", |loc| loc.description.as_str()),
        "npc_name": npc.map_or("", |profile| profile.name.as_str()),
        "npc_id": npc_id,
        "npc_profession": npc.map_or("", |profile| profile.profession.as_str()),
        "npcs_present": npcs_present,
        "always_include": always_include,
        "retrieved": retrieved,
        "recent_summaries": recent_summaries,
        "player_text": player_text,
    })
}
