//! Term matching shared by the guards.
//!
//! Pure-ASCII terms are matched on word boundaries so that `"app"` does not
//! fire inside `"apple"`; anything containing CJK or punctuation falls back
//! to substring matching, which is the only sensible boundary rule for
//! unsegmented Chinese text.

use std::collections::BTreeSet;

/// Canonical form of a banned term. `wi-fi` and `wi fi` collapse to `wifi`.
pub fn normalize_term(term: &str) -> String {
    let lowered = term.trim().to_lowercase();
    if lowered == "wi-fi" || lowered == "wi fi" {
        String::from("wifi")
    } else {
        lowered
    }
}

/// Does `text` contain `term`?
///
/// `term` must already be normalized and lowercase. The text is lowercased
/// internally.
pub fn contains_term(text: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    let haystack = text.to_lowercase();
    if term == "wifi" {
        // Spelled three ways in the wild.
        return ["wifi", "wi-fi", "wi fi"]
            .iter()
            .any(|variant| find_bounded(&haystack, variant));
    }
    if term.chars().all(|c| c.is_ascii_alphanumeric()) {
        find_bounded(&haystack, term)
    } else {
        haystack.contains(term)
    }
}

/// Word-boundary search: neither neighbour of the match may be ASCII
/// alphanumeric.
fn find_bounded(haystack: &str, needle: &str) -> bool {
    let bytes = haystack.as_bytes();
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(needle) {
        let at = start + pos;
        let end = at + needle.len();
        let before_ok = at == 0 || !bytes[at - 1].is_ascii_alphanumeric();
        let after_ok = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if before_ok && after_ok {
            return true;
        }
        start = at + 1;
    }
    false
}

/// Which of `terms` (already normalized) appear in `text`.
pub fn extract_terms<'a, I>(text: &str, terms: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    terms
        .into_iter()
        .filter(|term| contains_term(text, term))
        .map(ToOwned::to_owned)
        .collect()
}

/// Terms the NPC-authored text introduces that the player did not bring up
/// first. Echoing the player is tolerated; inventing is not.
pub fn first_mentions<'a, I>(npc_text: &str, player_text: &str, terms: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    let npc_terms = extract_terms(npc_text, terms.clone());
    let player_terms = extract_terms(player_text, terms);
    npc_terms.difference(&player_terms).cloned().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_wifi_spellings() {
        assert_eq!(normalize_term("Wi-Fi"), "wifi");
        assert_eq!(normalize_term("wi fi"), "wifi");
        assert_eq!(normalize_term("GPS"), "gps");
    }

    #[test]
    fn ascii_terms_respect_word_boundaries() {
        assert!(contains_term("check the app now", "app"));
        assert!(!contains_term("an apple a day", "app"));
        assert!(contains_term("App store", "app"));
    }

    #[test]
    fn wifi_matches_all_spellings() {
        assert!(contains_term("the wifi is down", "wifi"));
        assert!(contains_term("no Wi-Fi here", "wifi"));
        assert!(contains_term("wi fi signal", "wifi"));
        assert!(!contains_term("swift river", "wifi"));
    }

    #[test]
    fn cjk_terms_match_as_substrings() {
        assert!(contains_term("他掏出了手机。", "手机"));
        assert!(!contains_term("他掏出了短刀。", "手机"));
    }

    #[test]
    fn first_mention_is_asymmetric() {
        let terms = ["wifi", "phone"];
        let hits = first_mentions(
            "The keeper mentions the wifi going out.",
            "Is the wifi still broken? What about the phone?",
            terms,
        );
        assert!(hits.is_empty());

        let hits = first_mentions(
            "The keeper complains about the wifi.",
            "Hello there.",
            terms,
        );
        assert_eq!(hits.into_iter().collect::<Vec<_>>(), vec!["wifi"]);
    }
}
