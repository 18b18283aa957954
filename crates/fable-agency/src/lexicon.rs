//! Keyword vocabularies and text cue classification.
//!
//! All "text understanding" in the agency engine is keyword matching over
//! injected vocabularies. The lexicon is plain configuration data handed to
//! the engine at construction, never a process-wide table, so tests and
//! locales can swap vocabularies freely. The [`CueClassifier`] trait is the
//! seam where a smarter classifier could be substituted without touching the
//! decision logic.

use std::collections::BTreeSet;

/// Cues a classifier can find in a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TextCue {
    /// The destination reads dangerous.
    Risky,
    /// The text phrases the request as a command.
    Command,
    /// The speaker agrees to go along; implies the move by itself.
    StrongAccept,
    /// The speaker agrees, but only in a bare "okay" sense; needs the
    /// destination referenced somewhere to count as accepting the move.
    WeakAccept,
    /// The speaker declines.
    Refuse,
    /// The text threatens the listener; duress overrides free will.
    Coercion,
}

/// Classifies free text into [`TextCue`]s.
pub trait CueClassifier {
    /// Return every cue present in `text`.
    fn classify(&self, text: &str) -> BTreeSet<TextCue>;
}

/// Keyword vocabularies backing the default classifier. Bilingual (en/zh).
#[derive(Debug, Clone)]
pub struct AgencyLexicon {
    /// Terms marking a destination as dangerous.
    pub risky_terms: Vec<String>,
    /// Command/urgency words that raise the compliance threshold.
    pub command_cues: Vec<String>,
    /// Agreement phrases that imply going along by themselves.
    pub strong_accept_cues: Vec<String>,
    /// Bare agreement words that need a destination reference.
    pub weak_accept_cues: Vec<String>,
    /// Refusal phrases.
    pub refuse_cues: Vec<String>,
    /// Threat phrases that force compliance under duress.
    pub coercion_cues: Vec<String>,
    /// Professions anchored to their post.
    pub anchored_roles: Vec<String>,
    /// Goal phrases anchoring an NPC to their post.
    pub anchored_goals: Vec<String>,
    /// Traits marking an NPC as risk-averse.
    pub risk_averse_traits: Vec<String>,
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_owned()).collect()
}

impl Default for AgencyLexicon {
    fn default() -> Self {
        Self {
            risky_terms: owned(&[
                "forest", "ruins", "bandit", "dark", "cave", "dungeon", "bridge", "swamp",
                "森林", "废墟", "强盗", "黑暗", "洞穴", "地牢", "断桥", "沼泽",
            ]),
            command_cues: owned(&[
                "must", "order", "now", "command", "immediately", "必须", "命令", "马上", "立刻",
            ]),
            strong_accept_cues: owned(&[
                "我愿意", "我跟你去", "我会去", "我去", "我马上去", "我现在就去", "跟你走",
                "一起去", "let's go", "i will go", "i'll go", "i can go", "i'll come",
            ]),
            weak_accept_cues: owned(&[
                "好的", "可以", "没问题", "行", "当然", "sure", "okay", "alright",
            ]),
            refuse_cues: owned(&[
                "不去", "不能", "不行", "不愿意", "没空", "拒绝", "做不到", "改天",
                "not going", "can't", "cannot", "won't", "refuse", "decline",
            ]),
            coercion_cues: owned(&[
                "杀了你", "宰了你", "绑架", "要挟", "威胁你", "kill you", "kidnap",
                "or else", "at knifepoint",
            ]),
            anchored_roles: owned(&[
                "merchant", "shopkeeper", "innkeeper", "guard", "priest", "healer",
                "商人", "店主", "掌柜", "守卫", "祭司", "医师",
            ]),
            anchored_goals: owned(&[
                "protect", "guard", "keep shop", "keep", "watch", "avoid trouble",
                "守护", "看守", "守店",
            ]),
            risk_averse_traits: owned(&["coward", "cautious", "timid", "胆小", "谨慎"]),
        }
    }
}

impl AgencyLexicon {
    /// Whether any term from `terms` occurs in `text`.
    ///
    /// ASCII terms match case-insensitively against the lowercased text;
    /// CJK terms match as raw substrings.
    pub fn any_match(terms: &[String], text: &str) -> bool {
        let lower = text.to_lowercase();
        terms.iter().any(|term| {
            if term.is_ascii() {
                lower.contains(term.as_str())
            } else {
                text.contains(term.as_str())
            }
        })
    }
}

/// The default keyword-backed classifier.
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier {
    lexicon: AgencyLexicon,
}

impl KeywordClassifier {
    /// Build a classifier over the given lexicon.
    pub const fn new(lexicon: AgencyLexicon) -> Self {
        Self { lexicon }
    }

    /// The lexicon backing this classifier.
    pub const fn lexicon(&self) -> &AgencyLexicon {
        &self.lexicon
    }
}

impl CueClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> BTreeSet<TextCue> {
        let mut cues = BTreeSet::new();
        if AgencyLexicon::any_match(&self.lexicon.risky_terms, text) {
            cues.insert(TextCue::Risky);
        }
        if AgencyLexicon::any_match(&self.lexicon.command_cues, text) {
            cues.insert(TextCue::Command);
        }
        if AgencyLexicon::any_match(&self.lexicon.strong_accept_cues, text) {
            cues.insert(TextCue::StrongAccept);
        }
        if AgencyLexicon::any_match(&self.lexicon.weak_accept_cues, text) {
            cues.insert(TextCue::WeakAccept);
        }
        if AgencyLexicon::any_match(&self.lexicon.refuse_cues, text) {
            cues.insert(TextCue::Refuse);
        }
        if AgencyLexicon::any_match(&self.lexicon.coercion_cues, text) {
            cues.insert(TextCue::Coercion);
        }
        cues
    }
}
