//! Flat inventory mutation.
//!
//! Counts never go negative; a delta that would underflow clamps to zero
//! with a warning. Entries are removed when they reach zero so the map only
//! ever holds items the player actually has.

use std::collections::BTreeMap;

use tracing::warn;

use fable_types::ItemId;

use crate::items::ItemCatalog;

/// Apply a signed inventory delta in place.
pub fn apply_delta(
    inventory: &mut BTreeMap<ItemId, u32>,
    delta: &BTreeMap<ItemId, i64>,
    catalog: &ItemCatalog,
) {
    for (item, change) in catalog.canonicalize_deltas(delta) {
        if change == 0 {
            continue;
        }
        let current = i64::from(inventory.get(&item).copied().unwrap_or(0));
        let next = current + change;
        if next < 0 {
            warn!(item = item.as_str(), current, change, "inventory delta clamped to zero");
        }
        set_count(inventory, &item, next.max(0));
    }
}

/// Grant items (e.g. quest rewards).
pub fn grant(
    inventory: &mut BTreeMap<ItemId, u32>,
    items: &BTreeMap<ItemId, u32>,
    catalog: &ItemCatalog,
) {
    for (item, count) in catalog.canonicalize_counts(items) {
        if count > 0 {
            *inventory.entry(item).or_insert(0) += count;
        }
    }
}

/// Remove up to `count` of an item, returning how many were actually taken.
pub fn take(inventory: &mut BTreeMap<ItemId, u32>, item: &ItemId, count: u32) -> u32 {
    let have = inventory.get(item).copied().unwrap_or(0);
    let taken = have.min(count);
    set_count(inventory, item, i64::from(have - taken));
    taken
}

/// Current count of an item.
pub fn count_of(inventory: &BTreeMap<ItemId, u32>, item: &ItemId) -> u32 {
    inventory.get(item).copied().unwrap_or(0)
}

fn set_count(inventory: &mut BTreeMap<ItemId, u32>, item: &ItemId, count: i64) {
    if count <= 0 {
        inventory.remove(item);
    } else {
        let clamped = u32::try_from(count).unwrap_or(u32::MAX);
        inventory.insert(item.clone(), clamped);
    }
}
