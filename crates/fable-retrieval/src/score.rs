//! Token-overlap scoring.
//!
//! Tokenization handles mixed English/Chinese text: ASCII alphanumeric runs
//! become lowercase word tokens, and CJK spans contribute both single
//! characters and bigrams so that two-character Chinese words still overlap.

use std::collections::BTreeSet;

/// Tokenize a text into the overlap vocabulary.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    let mut word = String::new();
    let mut prev_cjk: Option<char> = None;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            word.push(c.to_ascii_lowercase());
            prev_cjk = None;
            continue;
        }
        if !word.is_empty() {
            tokens.insert(std::mem::take(&mut word));
        }
        if is_cjk(c) {
            tokens.insert(c.to_string());
            if let Some(prev) = prev_cjk {
                tokens.insert(format!("{prev}{c}"));
            }
            prev_cjk = Some(c);
        } else {
            prev_cjk = None;
        }
    }
    if !word.is_empty() {
        tokens.insert(word);
    }
    tokens
}

/// Shared-token count between a query's token set and a document text.
pub fn overlap_score(query_tokens: &BTreeSet<String>, text: &str) -> usize {
    tokenize(text)
        .intersection(query_tokens)
        .count()
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4e00}'..='\u{9fff}'
        | '\u{3400}'..='\u{4dbf}'
        | '\u{f900}'..='\u{faff}'
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ascii_words_lowercase() {
        let tokens = tokenize("The Old Bridge");
        assert!(tokens.contains("the"));
        assert!(tokens.contains("old"));
        assert!(tokens.contains("bridge"));
    }

    #[test]
    fn cjk_chars_and_bigrams() {
        let tokens = tokenize("月光草");
        assert!(tokens.contains("月"));
        assert!(tokens.contains("光"));
        assert!(tokens.contains("月光"));
        assert!(tokens.contains("光草"));
    }

    #[test]
    fn mixed_text_overlaps_across_scripts() {
        let query = tokenize("带月光草去 clinic");
        assert!(overlap_score(&query, "Mira waits at the clinic for 月光草") >= 3);
        assert_eq!(overlap_score(&query, "nothing relevant here"), 0);
    }
}
