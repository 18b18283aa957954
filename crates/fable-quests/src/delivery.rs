//! The explicit delivery transaction.
//!
//! Delivery is the only path that advances side-quest collection. Edge
//! cases (nobody there, nothing to hand over, quest already done) are
//! no-op receipts with a human-readable notice, never errors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use fable_types::{GameState, ItemId, LocationId, NpcId, QuestCategory, QuestId, QuestStatus};

use crate::inventory;
use crate::items::ItemCatalog;

/// Where a delivery may happen relative to a quest's pinned location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryLocationPolicy {
    /// A pinned location is advisory; handing over wherever the giver
    /// currently stands is accepted.
    #[default]
    AllowCurrentLocation,
    /// A pinned location is binding.
    SuggestedOnly,
}

/// What one delivery call accomplished.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Items actually transferred into quest collection.
    pub delivered: BTreeMap<ItemId, u32>,
    /// Rewards granted by quests completed in this call.
    pub rewards: BTreeMap<ItemId, u32>,
    /// Quests completed in this call.
    pub completed_quests: Vec<QuestId>,
    /// Human-readable result lines.
    pub notices: Vec<String>,
}

impl DeliveryReceipt {
    /// Whether anything was handed over.
    pub fn progressed(&self) -> bool {
        !self.delivered.is_empty()
    }

    fn notice(&mut self, line: String) {
        self.notices.push(line);
    }
}

/// Hand items to an NPC at a location.
///
/// Each handover amount is clamped to current inventory. Eligible quests
/// are the side quests given by that NPC which are still open and whose
/// pinned location (if any) matches per `policy`. Transferred items move
/// from inventory into `collected_items` up to the required amount; a quest
/// whose requirements are now met completes and grants its rewards exactly
/// once. Main quests are never completed by delivery.
pub fn deliver_items_to_npc(
    state: &mut GameState,
    catalog: &ItemCatalog,
    npc_id: &NpcId,
    location_id: &LocationId,
    handover: &BTreeMap<ItemId, u32>,
    policy: DeliveryLocationPolicy,
) -> DeliveryReceipt {
    let mut receipt = DeliveryReceipt::default();
    let zh = state
        .world
        .world_bible
        .narrative_language
        .as_deref()
        .is_some_and(|lang| lang.starts_with("zh"));

    let Some(npc) = state.world.npc(npc_id) else {
        receipt.notice(if zh {
            String::from("这里没有这个人。")
        } else {
            String::from("No one by that name is here.")
        });
        return receipt;
    };
    let npc_name = npc.name.clone();

    if state.npc_locations.get(npc_id) != Some(location_id) {
        let location_name = state
            .world
            .location(location_id)
            .map_or_else(|| location_id.to_string(), |loc| loc.name.clone());
        receipt.notice(if zh {
            format!("{npc_name}不在{location_name}。")
        } else {
            format!("{npc_name} is not at {location_name}.")
        });
        return receipt;
    }

    // Clamp the request to what the player actually carries.
    let mut remaining: BTreeMap<ItemId, u32> = BTreeMap::new();
    for (item, count) in catalog.canonicalize_counts(handover) {
        let have = inventory::count_of(&state.inventory, &item);
        let offered = count.min(have);
        if offered > 0 {
            remaining.insert(item, offered);
        }
    }

    let eligible: Vec<QuestId> = state
        .quests
        .values()
        .filter(|quest| {
            quest.category == QuestCategory::Side
                && quest.status.is_open()
                && quest.giver_npc_id.as_ref() == Some(npc_id)
        })
        .map(|quest| quest.quest_id.clone())
        .collect();

    for quest_id in eligible {
        let Some(entry) = state.quests.get_mut(&quest_id) else {
            continue;
        };
        if let Some(suggested) = &entry.suggested_location {
            if suggested != location_id && policy == DeliveryLocationPolicy::SuggestedOnly {
                let suggested_name = state
                    .world
                    .location(suggested)
                    .map_or_else(|| suggested.to_string(), |loc| loc.name.clone());
                receipt.notice(if zh {
                    format!("「{}」需要送到{suggested_name}。", entry.title)
                } else {
                    format!("\"{}\" must be delivered at {suggested_name}.", entry.title)
                });
                continue;
            }
        }

        for (item, need) in entry.required_items.clone() {
            let collected = entry.collected_items.get(&item).copied().unwrap_or(0);
            let wanted = need.saturating_sub(collected);
            let offered = remaining.get(&item).copied().unwrap_or(0);
            let transfer = wanted.min(offered);
            if transfer == 0 {
                continue;
            }
            entry
                .collected_items
                .entry(item.clone())
                .and_modify(|c| *c += transfer)
                .or_insert(transfer);
            inventory::take(&mut state.inventory, &item, transfer);
            if let Some(left) = remaining.get_mut(&item) {
                *left -= transfer;
                if *left == 0 {
                    remaining.remove(&item);
                }
            }
            *receipt.delivered.entry(item.clone()).or_insert(0) += transfer;
            let display = catalog.display_name(&item, if zh { "zh" } else { "en" });
            receipt.notice(if zh {
                format!("已将{display}×{transfer}交给{npc_name}。")
            } else {
                format!("Handed {display} x{transfer} to {npc_name}.")
            });
            debug!(
                quest = quest_id.as_str(),
                item = item.as_str(),
                transfer,
                "delivery transfer"
            );
        }

        if entry.requirements_met() && entry.status != QuestStatus::Completed {
            entry.status = QuestStatus::Completed;
            let title = entry.title.clone();
            let rewards = entry.reward_items.clone();
            inventory::grant(&mut state.inventory, &rewards, catalog);
            for (item, count) in catalog.canonicalize_counts(&rewards) {
                *receipt.rewards.entry(item).or_insert(0) += count;
            }
            receipt.completed_quests.push(quest_id.clone());
            receipt.notice(if zh {
                format!("「{title}」已完成。")
            } else {
                format!("\"{title}\" completed.")
            });
            info!(quest = quest_id.as_str(), "side quest completed by delivery");
        }
    }

    if !receipt.progressed() && receipt.notices.is_empty() {
        receipt.notice(if zh {
            String::from("没有可交付的物品，任务没有进展。")
        } else {
            String::from("No progress made; nothing could be handed over.")
        });
    }
    receipt
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use fable_types::{
        Location, NpcProfile, QuestSpec, SessionId, WorldBible, WorldId, WorldSpec,
    };

    use crate::journal::materialize_journal;

    use super::*;

    fn world(language: Option<&str>) -> WorldSpec {
        let mut side_required = BTreeMap::new();
        side_required.insert(ItemId::new("moon_herb"), 2);
        let mut side_rewards = BTreeMap::new();
        side_rewards.insert(ItemId::new("healer_token"), 1);
        let mut main_required = BTreeMap::new();
        main_required.insert(ItemId::new("healer_token"), 1);
        WorldSpec {
            world_id: WorldId::new("w1"),
            title: String::from("Test World"),
            world_bible: WorldBible {
                tech_level: String::from("medieval"),
                narrative_language: language.map(String::from),
                magic_rules: String::from("low"),
                tone: String::from("grounded"),
                taboos: Vec::new(),
                do_not_mention: Vec::new(),
                anachronism_blocklist: Vec::new(),
            },
            locations: vec![
                Location {
                    location_id: LocationId::new("village"),
                    name: String::from("Village"),
                    kind: String::from("town"),
                    description: String::from("A quiet village."),
                    connected_to: vec![LocationId::new("clinic")],
                    tags: Vec::new(),
                },
                Location {
                    location_id: LocationId::new("clinic"),
                    name: String::from("Herb Clinic"),
                    kind: String::from("shop"),
                    description: String::from("Shelves of dried herbs."),
                    connected_to: Vec::new(),
                    tags: Vec::new(),
                },
            ],
            npcs: vec![NpcProfile {
                npc_id: NpcId::new("npc_healer"),
                name: String::from("Mira"),
                profession: String::from("Healer"),
                traits: Vec::new(),
                goals: Vec::new(),
                starting_location: LocationId::new("clinic"),
                obedience_level: 0.5,
                stubbornness: 0.5,
                risk_tolerance: 0.5,
                disposition_to_player: 0,
                refusal_style: String::from("polite"),
            }],
            main_quest: Some(QuestSpec {
                quest_id: QuestId::new("main_trial"),
                title: String::from("The Trial"),
                category: QuestCategory::Main,
                objective: String::from("Earn the healer_token."),
                giver_npc_id: Some(NpcId::new("npc_healer")),
                suggested_location: None,
                required_items: main_required,
                reward_items: BTreeMap::new(),
            }),
            side_quests: vec![QuestSpec {
                quest_id: QuestId::new("side_herbs"),
                title: String::from("Herbs for Mira"),
                category: QuestCategory::Side,
                objective: String::from("Bring moon_herb to the clinic."),
                giver_npc_id: Some(NpcId::new("npc_healer")),
                suggested_location: Some(LocationId::new("clinic")),
                required_items: side_required,
                reward_items: side_rewards,
            }],
            starting_location: LocationId::new("village"),
            starting_hook: String::new(),
            initial_quest: String::new(),
            map_layout: Vec::new(),
        }
    }

    fn state(language: Option<&str>) -> GameState {
        let world = world(language);
        let catalog = ItemCatalog::default();
        let (quests, main_quest_id) = materialize_journal(&world, &catalog);
        let mut npc_locations = BTreeMap::new();
        npc_locations.insert(NpcId::new("npc_healer"), LocationId::new("clinic"));
        GameState {
            session_id: SessionId::parse("sess_delivery").unwrap(),
            created_at: Utc::now(),
            world,
            player_location: LocationId::new("clinic"),
            npc_locations,
            flags: BTreeMap::new(),
            inventory: BTreeMap::new(),
            quests,
            main_quest_id,
            location_stocks: BTreeMap::new(),
            recent_summaries: Vec::new(),
            turn_counter: 0,
        }
    }

    fn handover(item: &str, count: u32) -> BTreeMap<ItemId, u32> {
        let mut map = BTreeMap::new();
        map.insert(ItemId::new(item), count);
        map
    }

    #[test]
    fn full_delivery_completes_and_rewards_once() {
        let catalog = ItemCatalog::default();
        let mut s = state(None);
        s.inventory.insert(ItemId::new("moon_herb"), 2);

        let receipt = deliver_items_to_npc(
            &mut s,
            &catalog,
            &NpcId::new("npc_healer"),
            &LocationId::new("clinic"),
            &handover("moon_herb", 2),
            DeliveryLocationPolicy::default(),
        );
        assert_eq!(receipt.delivered.get(&ItemId::new("moon_herb")), Some(&2));
        assert_eq!(receipt.rewards.get(&ItemId::new("healer_token")), Some(&1));
        assert_eq!(s.quests[&QuestId::new("side_herbs")].status, QuestStatus::Completed);
        assert!(!s.inventory.contains_key(&ItemId::new("moon_herb")));
        assert_eq!(s.inventory.get(&ItemId::new("healer_token")), Some(&1));

        // Repeating the delivery is a no-op; rewards are not duplicated.
        s.inventory.insert(ItemId::new("moon_herb"), 2);
        let receipt = deliver_items_to_npc(
            &mut s,
            &catalog,
            &NpcId::new("npc_healer"),
            &LocationId::new("clinic"),
            &handover("moon_herb", 2),
            DeliveryLocationPolicy::default(),
        );
        assert!(!receipt.progressed());
        assert_eq!(s.inventory.get(&ItemId::new("healer_token")), Some(&1));
        assert_eq!(s.inventory.get(&ItemId::new("moon_herb")), Some(&2));
    }

    #[test]
    fn handover_clamped_to_inventory() {
        let catalog = ItemCatalog::default();
        let mut s = state(None);
        s.inventory.insert(ItemId::new("moon_herb"), 1);
        let receipt = deliver_items_to_npc(
            &mut s,
            &catalog,
            &NpcId::new("npc_healer"),
            &LocationId::new("clinic"),
            &handover("moon_herb", 5),
            DeliveryLocationPolicy::default(),
        );
        assert_eq!(receipt.delivered.get(&ItemId::new("moon_herb")), Some(&1));
        let entry = &s.quests[&QuestId::new("side_herbs")];
        assert_eq!(entry.collected_items.get(&ItemId::new("moon_herb")), Some(&1));
        assert!(entry.status.is_open());
    }

    #[test]
    fn aliased_handover_matches() {
        let catalog = ItemCatalog::default();
        let mut s = state(Some("zh"));
        s.inventory.insert(ItemId::new("moon_herb"), 2);
        let receipt = deliver_items_to_npc(
            &mut s,
            &catalog,
            &NpcId::new("npc_healer"),
            &LocationId::new("clinic"),
            &handover("月光草", 2),
            DeliveryLocationPolicy::default(),
        );
        assert!(receipt.progressed());
        assert_eq!(s.quests[&QuestId::new("side_herbs")].status, QuestStatus::Completed);
    }

    #[test]
    fn npc_absent_is_noop_with_notice() {
        let catalog = ItemCatalog::default();
        let mut s = state(None);
        s.inventory.insert(ItemId::new("moon_herb"), 2);
        let receipt = deliver_items_to_npc(
            &mut s,
            &catalog,
            &NpcId::new("npc_healer"),
            &LocationId::new("village"),
            &handover("moon_herb", 2),
            DeliveryLocationPolicy::default(),
        );
        assert!(!receipt.progressed());
        assert!(receipt.notices[0].contains("Mira"));
        assert_eq!(s.inventory.get(&ItemId::new("moon_herb")), Some(&2));
    }

    #[test]
    fn delivery_allowed_where_npc_stands_despite_pin() {
        let catalog = ItemCatalog::default();
        let mut s = state(None);
        // The healer wandered to the village; the quest pins the clinic.
        s.npc_locations
            .insert(NpcId::new("npc_healer"), LocationId::new("village"));
        s.inventory.insert(ItemId::new("moon_herb"), 2);
        let receipt = deliver_items_to_npc(
            &mut s,
            &catalog,
            &NpcId::new("npc_healer"),
            &LocationId::new("village"),
            &handover("moon_herb", 2),
            DeliveryLocationPolicy::AllowCurrentLocation,
        );
        assert!(receipt.progressed());
        assert_eq!(s.quests[&QuestId::new("side_herbs")].status, QuestStatus::Completed);
    }

    #[test]
    fn strict_policy_redirects_to_pinned_location() {
        let catalog = ItemCatalog::default();
        let mut s = state(None);
        s.npc_locations
            .insert(NpcId::new("npc_healer"), LocationId::new("village"));
        s.inventory.insert(ItemId::new("moon_herb"), 2);
        let receipt = deliver_items_to_npc(
            &mut s,
            &catalog,
            &NpcId::new("npc_healer"),
            &LocationId::new("village"),
            &handover("moon_herb", 2),
            DeliveryLocationPolicy::SuggestedOnly,
        );
        assert!(!receipt.progressed());
        assert!(receipt.notices[0].contains("Herb Clinic"));
        assert_eq!(s.inventory.get(&ItemId::new("moon_herb")), Some(&2));
    }

    #[test]
    fn delivering_reward_item_never_completes_main() {
        let catalog = ItemCatalog::default();
        let mut s = state(None);
        s.inventory.insert(ItemId::new("healer_token"), 1);
        let receipt = deliver_items_to_npc(
            &mut s,
            &catalog,
            &NpcId::new("npc_healer"),
            &LocationId::new("clinic"),
            &handover("healer_token", 1),
            DeliveryLocationPolicy::default(),
        );
        assert!(!receipt.progressed());
        assert_eq!(s.quests[&QuestId::new("main_trial")].status, QuestStatus::Active);
        assert_eq!(s.inventory.get(&ItemId::new("healer_token")), Some(&1));
    }
}
