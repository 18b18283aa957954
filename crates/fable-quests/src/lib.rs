//! Quest journal, inventory, and delivery transactions.
//!
//! Owns the quest lifecycle (`available -> active -> completed`, with
//! `failed` reserved for the main trial), the flat inventory map, the
//! bilingual item catalog, the explicit delivery transaction, and the
//! idempotent journal sync that re-derives status and guidance each turn.

pub mod delivery;
pub mod inventory;
pub mod items;
pub mod journal;
pub mod trial;

pub use delivery::{deliver_items_to_npc, DeliveryLocationPolicy, DeliveryReceipt};
pub use items::ItemCatalog;
pub use journal::{
    apply_legacy_updates, apply_progress_updates, materialize_journal, sync_quest_journal,
};
pub use trial::{
    all_side_quests_completed, evaluate_main_trial_readiness, main_trial_target,
    resolve_main_trial, TrialOutcome,
};
