//! Application of non-movement world updates to a working state copy.

use tracing::debug;

use fable_quests::{inventory, journal, ItemCatalog};
use fable_types::{GameState, ValidationError, WorldUpdates};

/// Apply the non-movement parts of a turn's world updates.
///
/// A player-location update naming a location that does not exist is an
/// invariant violation, not a narrative anomaly; it aborts the turn before
/// commit. NPC moves are deliberately not handled here; they go through the
/// graph validator and the agency gate.
pub fn apply_world_updates(
    working: &mut GameState,
    updates: &WorldUpdates,
    catalog: &ItemCatalog,
) -> Result<(), ValidationError> {
    if let Some(destination) = &updates.player_location {
        if working.world.location(destination).is_none() {
            return Err(ValidationError::InvalidPlayerLocation {
                location: destination.clone(),
            });
        }
        debug!(to = %destination, "player moved");
        working.player_location = destination.clone();
    }

    for (flag, value) in &updates.flags_delta {
        working.flags.insert(flag.clone(), *value);
    }

    inventory::apply_delta(&mut working.inventory, &updates.inventory_delta, catalog);
    journal::apply_legacy_updates(
        &mut working.quests,
        &working.world,
        &updates.quest_updates,
        catalog,
    );
    journal::apply_progress_updates(
        &mut working.quests,
        &working.world,
        &updates.quest_progress_updates,
        catalog,
    );
    Ok(())
}
