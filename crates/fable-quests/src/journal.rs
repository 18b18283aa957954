//! Quest journal lifecycle.
//!
//! The journal is materialized from the world's static quest definitions at
//! session start and afterwards updated from three directions: legacy
//! status-word maps, structured per-turn updates, and the idempotent sync
//! pass that re-derives status and guidance from inventory and collection
//! state. World-originated definitions are immutable at runtime; only
//! status, guidance, and collected items move.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use fable_types::{
    GameState, QuestCategory, QuestId, QuestProgress, QuestProgressUpdate, QuestStatus, WorldSpec,
};

use crate::items::ItemCatalog;
use crate::trial;

/// Build the initial journal from the world's quest definitions.
///
/// The main quest starts `active`; side quests start `available`. Item maps
/// are canonicalized on the way in. Returns the journal and the main quest's
/// journal key.
pub fn materialize_journal(
    world: &WorldSpec,
    catalog: &ItemCatalog,
) -> (BTreeMap<QuestId, QuestProgress>, Option<QuestId>) {
    let mut journal = BTreeMap::new();
    for spec in world.quest_specs() {
        let status = match spec.category {
            QuestCategory::Main => QuestStatus::Active,
            QuestCategory::Side => QuestStatus::Available,
        };
        journal.insert(
            spec.quest_id.clone(),
            QuestProgress {
                quest_id: spec.quest_id.clone(),
                title: spec.title.clone(),
                category: spec.category,
                status,
                objective: spec.objective.clone(),
                guidance: String::new(),
                giver_npc_id: spec.giver_npc_id.clone(),
                suggested_location: spec.suggested_location.clone(),
                required_items: catalog.canonicalize_counts(&spec.required_items),
                collected_items: BTreeMap::new(),
                reward_items: catalog.canonicalize_counts(&spec.reward_items),
            },
        );
    }
    let main_quest_id = world.main_quest.as_ref().map(|q| q.quest_id.clone());
    (journal, main_quest_id)
}

/// Map a legacy free-form status word onto a [`QuestStatus`].
pub fn normalize_status_word(word: &str) -> Option<QuestStatus> {
    match word.trim().to_lowercase().as_str() {
        "accepted" | "accept" | "active" | "started" | "start" | "in_progress" | "进行中"
        | "已接受" => Some(QuestStatus::Active),
        "available" | "open" | "可接" => Some(QuestStatus::Available),
        "completed" | "complete" | "done" | "finished" | "完成" | "已完成" => {
            Some(QuestStatus::Completed)
        }
        "failed" | "fail" | "失败" => Some(QuestStatus::Failed),
        _ => None,
    }
}

/// Apply a legacy `quest id -> status word` map.
///
/// Unknown ids create a minimal side-quest entry so older model outputs can
/// still open ad-hoc quests; unknown status words are dropped. Terminal
/// entries are never reopened.
pub fn apply_legacy_updates(
    journal: &mut BTreeMap<QuestId, QuestProgress>,
    world: &WorldSpec,
    updates: &BTreeMap<QuestId, String>,
    catalog: &ItemCatalog,
) {
    for (quest_id, word) in updates {
        let Some(status) = normalize_status_word(word) else {
            warn!(quest = quest_id.as_str(), word, "unrecognized quest status word");
            continue;
        };
        if let Some(entry) = journal.get_mut(quest_id) {
            if entry.status.is_open() {
                entry.status = status;
            }
            continue;
        }
        if let Some(spec) = world.quest_spec(quest_id) {
            // Defined but not yet materialized; seed from the definition.
            let (mut seeded, _) = materialize_journal(world, catalog);
            if let Some(mut entry) = seeded.remove(&spec.quest_id) {
                entry.status = status;
                journal.insert(quest_id.clone(), entry);
            }
            continue;
        }
        debug!(quest = quest_id.as_str(), "creating ad-hoc quest from legacy update");
        journal.insert(
            quest_id.clone(),
            QuestProgress {
                quest_id: quest_id.clone(),
                title: quest_id.as_str().replace('_', " "),
                category: QuestCategory::Side,
                status,
                objective: String::new(),
                guidance: String::new(),
                giver_npc_id: None,
                suggested_location: None,
                required_items: BTreeMap::new(),
                collected_items: BTreeMap::new(),
                reward_items: BTreeMap::new(),
            },
        );
    }
}

/// Apply structured per-turn quest updates.
///
/// World-originated quests accept only status and guidance; their item
/// definitions are frozen. Ad-hoc ids that are neither defined by the world
/// nor already materialized are silently ignored. Collected-item deltas are
/// rejected whenever the quest has required items; delivery is the only way
/// to advance collection.
pub fn apply_progress_updates(
    journal: &mut BTreeMap<QuestId, QuestProgress>,
    world: &WorldSpec,
    updates: &[QuestProgressUpdate],
    catalog: &ItemCatalog,
) {
    for update in updates {
        let world_originated = world.quest_spec(&update.quest_id).is_some();
        if !world_originated && !journal.contains_key(&update.quest_id) {
            debug!(quest = update.quest_id.as_str(), "ignoring ad-hoc quest update");
            continue;
        }
        let Some(entry) = journal.get_mut(&update.quest_id) else {
            continue;
        };

        if let Some(status) = update.status {
            // Main quests resolve only through the trial; terminal states are
            // never reopened by a model suggestion.
            let main_terminal = entry.category == QuestCategory::Main
                && matches!(status, QuestStatus::Completed | QuestStatus::Failed);
            if entry.status.is_open() && !main_terminal {
                entry.status = status;
            }
        }
        if let Some(guidance) = &update.guidance {
            entry.guidance = guidance.clone();
        }

        if !world_originated {
            if let Some(title) = &update.title {
                entry.title = title.clone();
            }
            if let Some(objective) = &update.objective {
                entry.objective = objective.clone();
            }
            if let Some(giver) = &update.giver_npc_id {
                entry.giver_npc_id = Some(giver.clone());
            }
            if let Some(location) = &update.suggested_location {
                entry.suggested_location = Some(location.clone());
            }
            if !update.required_items.is_empty() {
                entry.required_items = catalog.canonicalize_counts(&update.required_items);
            }
            if !update.reward_items.is_empty() {
                entry.reward_items = catalog.canonicalize_counts(&update.reward_items);
            }
        }

        if !update.collected_items_delta.is_empty() && !entry.required_items.is_empty() {
            warn!(
                quest = update.quest_id.as_str(),
                "collection delta rejected; progress requires an explicit delivery"
            );
        }
    }
}

/// Re-derive status and guidance for every journal entry.
///
/// Pure recomputation from inventory and collected/required maps; calling
/// it any number of times yields the same journal.
pub fn sync_quest_journal(state: &mut GameState, catalog: &ItemCatalog) {
    let language = state
        .world
        .world_bible
        .narrative_language
        .clone()
        .unwrap_or_else(|| String::from("en"));
    sync_main_quest(state, catalog, &language);
    sync_side_quests(state, catalog, &language);
}

fn sync_main_quest(state: &mut GameState, catalog: &ItemCatalog, language: &str) {
    let Some(main_id) = state.main_quest_id.clone() else {
        return;
    };
    let ready = trial::evaluate_main_trial_readiness(state, catalog);
    let target = trial::main_trial_target(state);
    let inventory = catalog.canonicalize_counts(&state.inventory);

    let (target_name, giver_name) = {
        let main = match state.quests.get(&main_id) {
            Some(main) => main,
            None => return,
        };
        let target_name = target
            .as_ref()
            .and_then(|loc| state.world.location(loc))
            .map_or_else(
                || target.as_ref().map_or_else(String::new, ToString::to_string),
                |loc| loc.name.clone(),
            );
        let giver_name = main
            .giver_npc_id
            .as_ref()
            .and_then(|npc| state.world.npc(npc))
            .map_or_else(|| String::from("the quest giver"), |npc| npc.name.clone());
        (target_name, giver_name)
    };

    let Some(main) = state.quests.get_mut(&main_id) else {
        return;
    };
    // The main quest tracks collection straight from inventory.
    let mut collected = BTreeMap::new();
    for (item, need) in &main.required_items {
        let have = inventory.get(item).copied().unwrap_or(0).min(*need);
        if have > 0 {
            collected.insert(item.clone(), have);
        }
    }
    main.collected_items = collected;
    if main.status == QuestStatus::Available {
        main.status = QuestStatus::Active;
    }
    if !main.status.is_open() {
        return;
    }

    main.guidance = if ready {
        if language.starts_with("zh") {
            format!("主线物品已备齐。把它们带给{giver_name}（{target_name}）。")
        } else {
            format!("Main items ready. Bring them to {giver_name} at {target_name}.")
        }
    } else {
        let progress: Vec<String> = main
            .required_items
            .iter()
            .map(|(item, need)| {
                let have = inventory.get(item).copied().unwrap_or(0).min(*need);
                format!("{} {have}/{need}", catalog.display_name(item, language))
            })
            .collect();
        if language.starts_with("zh") {
            format!("收集试炼所需物品：{}。", progress.join("，"))
        } else {
            format!("Collect items for the trial: {}.", progress.join(", "))
        }
    };
}

fn sync_side_quests(state: &mut GameState, catalog: &ItemCatalog, language: &str) {
    let side_ids: Vec<QuestId> = state
        .quests
        .values()
        .filter(|q| q.category == QuestCategory::Side)
        .map(|q| q.quest_id.clone())
        .collect();

    for quest_id in side_ids {
        let giver_name = state
            .quests
            .get(&quest_id)
            .and_then(|q| q.giver_npc_id.as_ref())
            .and_then(|npc| state.world.npc(npc))
            .map(|npc| npc.name.clone());
        let Some(entry) = state.quests.get_mut(&quest_id) else {
            continue;
        };
        if entry.status == QuestStatus::Failed {
            continue;
        }

        // Clamp collection to requirements.
        let clamped: BTreeMap<_, _> = entry
            .collected_items
            .iter()
            .filter_map(|(item, have)| {
                let need = entry.required_items.get(item).copied().unwrap_or(0);
                let kept = (*have).min(need);
                (kept > 0).then(|| (item.clone(), kept))
            })
            .collect();
        entry.collected_items = clamped;

        if !entry.required_items.is_empty() {
            if entry.requirements_met() {
                entry.status = QuestStatus::Completed;
            } else {
                // A status claim without the deliveries to back it up.
                if entry.status == QuestStatus::Completed {
                    entry.status = QuestStatus::Active;
                }
                if entry.status == QuestStatus::Available
                    && entry.collected_items.values().any(|c| *c > 0)
                {
                    entry.status = QuestStatus::Active;
                }
            }
        }

        entry.guidance = side_guidance(entry, giver_name.as_deref(), catalog, language);
        repair_objective(entry, giver_name.as_deref(), catalog, language);
    }
}

fn side_guidance(
    entry: &QuestProgress,
    giver_name: Option<&str>,
    catalog: &ItemCatalog,
    language: &str,
) -> String {
    let zh = language.starts_with("zh");
    if entry.status == QuestStatus::Completed {
        return if zh {
            String::from("已完成交付。")
        } else {
            String::from("Delivered.")
        };
    }
    if entry.required_items.is_empty() {
        return entry.objective.clone();
    }
    let remaining: Vec<String> = entry
        .required_items
        .iter()
        .filter_map(|(item, need)| {
            let have = entry.collected_items.get(item).copied().unwrap_or(0);
            let left = need.saturating_sub(have);
            (left > 0).then(|| {
                let name = catalog.display_name(item, language);
                if zh {
                    format!("{name}×{left}")
                } else {
                    format!("{name} x{left}")
                }
            })
        })
        .collect();
    let giver = giver_name.unwrap_or("the quest giver");
    if zh {
        format!("寻找{}，交给{giver}。", remaining.join("、"))
    } else {
        format!("Find {} and deliver to {giver}.", remaining.join(", "))
    }
}

/// Regenerate objective text that names none of the quest's required items.
/// Deterministic, so repeated syncs settle on the same text.
fn repair_objective(
    entry: &mut QuestProgress,
    giver_name: Option<&str>,
    catalog: &ItemCatalog,
    language: &str,
) {
    if entry.required_items.is_empty() {
        return;
    }
    let haystack = format!("{} {}", entry.title, entry.objective).to_lowercase();
    let mentions_any = entry.required_items.keys().any(|item| {
        let id_form = item.as_str().to_lowercase();
        let spaced = id_form.replace('_', " ");
        let display = catalog.display_name(item, language).to_lowercase();
        haystack.contains(&id_form) || haystack.contains(&spaced) || haystack.contains(&display)
    });
    if mentions_any {
        return;
    }
    let items: Vec<String> = entry
        .required_items
        .keys()
        .map(|item| catalog.display_name(item, language))
        .collect();
    let giver = giver_name.unwrap_or("the quest giver");
    entry.objective = if language.starts_with("zh") {
        format!("寻找{}并交给{giver}。", items.join("、"))
    } else {
        format!("Find {} and deliver them to {giver}.", items.join(", "))
    };
}
