//! Session bootstrap.

use chrono::{DateTime, Utc};
use tracing::info;

use fable_quests::{sync_quest_journal, ItemCatalog};
use fable_store::generate_session_id;
use fable_types::{GameState, WorldSpec};

use crate::error::EngineError;

/// Create a fresh session state for a world.
///
/// Validates the world, seeds NPC locations from their starting positions,
/// materializes the quest journal, and runs one journal sync so guidance
/// text exists from turn zero.
pub fn new_session(
    world: WorldSpec,
    now: DateTime<Utc>,
    catalog: &ItemCatalog,
) -> Result<GameState, EngineError> {
    world.validate()?;
    let session_id = generate_session_id(now)?;
    let npc_locations = world
        .npcs
        .iter()
        .map(|npc| (npc.npc_id.clone(), npc.starting_location.clone()))
        .collect();
    let (quests, main_quest_id) = fable_quests::materialize_journal(&world, catalog);
    let player_location = world.starting_location.clone();

    let mut state = GameState {
        session_id,
        created_at: now,
        world,
        player_location,
        npc_locations,
        flags: std::collections::BTreeMap::new(),
        inventory: std::collections::BTreeMap::new(),
        quests,
        main_quest_id,
        location_stocks: std::collections::BTreeMap::new(),
        recent_summaries: Vec::new(),
        turn_counter: 0,
    };
    sync_quest_journal(&mut state, catalog);
    state.validate()?;
    info!(session = state.session_id.as_str(), world = state.world.world_id.as_str(), "session created");
    Ok(state)
}
