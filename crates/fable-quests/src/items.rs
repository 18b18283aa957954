//! Item name canonicalization.
//!
//! Players and models refer to the same item as `moon_herb`, `Moon Herb`, or
//! `月光草` within one session. Every item name entering the quest machinery
//! passes through the catalog first so that synonyms and translations land on
//! one canonical id.

use std::collections::BTreeMap;

use fable_types::normalize::normalize_item_name;
use fable_types::ItemId;

/// Built-in bilingual alias pairs, `(surface form, canonical id)`.
const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("月光草", "moon_herb"),
    ("疗伤草", "healing_herb"),
    ("口粮", "ration"),
    ("delivery ration", "ration"),
    ("干粮", "ration"),
    ("绷带", "bandage"),
    ("铁矿", "iron_ore"),
    ("铁矿石", "iron_ore"),
    ("治疗师信物", "healer_token"),
    ("医者信物", "healer_token"),
];

/// Maps item surface forms to canonical ids.
#[derive(Debug, Clone)]
pub struct ItemCatalog {
    aliases: BTreeMap<String, ItemId>,
}

impl Default for ItemCatalog {
    fn default() -> Self {
        let mut catalog = Self {
            aliases: BTreeMap::new(),
        };
        for (surface, canonical) in DEFAULT_ALIASES {
            catalog.add_alias(surface, ItemId::new(*canonical));
        }
        catalog
    }
}

impl ItemCatalog {
    /// Register one extra surface form for a canonical id.
    pub fn add_alias(&mut self, surface: &str, canonical: ItemId) {
        self.aliases
            .insert(normalize_item_name(surface), canonical);
    }

    /// Resolve any spelling of an item name to its canonical id.
    ///
    /// Unknown names canonicalize to their normalized form, so the catalog
    /// never rejects an item; it only merges spellings.
    pub fn canonical(&self, name: &str) -> ItemId {
        let normalized = normalize_item_name(name);
        self.aliases
            .get(&normalized)
            .cloned()
            .unwrap_or_else(|| ItemId::new(normalized))
    }

    /// Canonicalize every key of an item map, merging counts that collapse
    /// onto the same id.
    pub fn canonicalize_counts(&self, map: &BTreeMap<ItemId, u32>) -> BTreeMap<ItemId, u32> {
        let mut out: BTreeMap<ItemId, u32> = BTreeMap::new();
        for (item, count) in map {
            let canonical = self.canonical(item.as_str());
            *out.entry(canonical).or_insert(0) += count;
        }
        out
    }

    /// Same as [`Self::canonicalize_counts`] for signed deltas.
    pub fn canonicalize_deltas(&self, map: &BTreeMap<ItemId, i64>) -> BTreeMap<ItemId, i64> {
        let mut out: BTreeMap<ItemId, i64> = BTreeMap::new();
        for (item, delta) in map {
            let canonical = self.canonical(item.as_str());
            *out.entry(canonical).or_insert(0) += delta;
        }
        out
    }

    /// Display form of an item for guidance text. Chinese guidance prefers a
    /// CJK alias when the catalog has one.
    pub fn display_name(&self, item: &ItemId, language: &str) -> String {
        if language.starts_with("zh") {
            for (surface, canonical) in &self.aliases {
                if canonical == item && !surface.is_ascii() {
                    return surface.clone();
                }
            }
        }
        item.as_str().replace('_', " ")
    }

    /// Every surface form the catalog knows, including canonical ids
    /// themselves. Used by the quest-item consistency guard.
    pub fn surface_forms(&self) -> BTreeMap<String, ItemId> {
        let mut forms = self.aliases.clone();
        for canonical in self.aliases.values() {
            forms.insert(canonical.as_str().to_owned(), canonical.clone());
            forms.insert(canonical.as_str().replace('_', " "), canonical.clone());
        }
        forms
    }
}
