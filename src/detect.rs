//! Entity mention detection shared by context loading and card generation.
//!
//! Entities that already have a file are detected through the trigger matcher.
//! Names without a file yet are picked up by a capitalized-word heuristic so
//! they can accumulate mentions until a card is due.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::matcher::{TriggerMatch, TriggerType};

static CAPITALIZED_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\p{Lu}\p{Ll}{2,}\b").expect("capitalized word pattern is valid")
});

/// Capitalized words that are almost never entity names.
const STOPWORDS: &[&str] = &[
    "about", "after", "again", "all", "also", "and", "any", "are", "because", "before", "but",
    "can", "could", "did", "does", "each", "even", "every", "for", "from", "had", "has", "have",
    "her", "here", "hers", "him", "his", "how", "into", "its", "just", "let", "maybe", "more",
    "most", "not", "now", "once", "only", "our", "perhaps", "she", "should", "some", "still",
    "such", "than", "that", "the", "their", "them", "then", "there", "these", "they", "this",
    "those", "though", "through", "too", "until", "very", "was", "were", "what", "when",
    "where", "which", "while", "who", "whom", "why", "will", "with", "would", "yes", "yet",
    "you", "your", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
];

/// How a mention was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionSource {
    /// An entity file matched the message.
    Trigger,
    /// A capitalized word with no matching entity file.
    Capitalized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub name: String,
    pub source: MentionSource,
}

/// Case-folded form used to compare entity names.
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

/// Capitalized words in `message`, stopwords removed, first occurrence order.
pub fn capitalized_names(message: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    CAPITALIZED_WORD
        .find_iter(message)
        .map(|m| m.as_str())
        .filter(|word| !STOPWORDS.contains(&fold_name(word).as_str()))
        .filter(|word| seen.insert(fold_name(word)))
        .map(str::to_string)
        .collect()
}

/// All entity mentions in a message, each name at most once.
///
/// Trigger matches come first. A capitalized word is dropped when it names a
/// matched entity or is one of the words a keyword or regex trigger matched,
/// in any case, so `Marc` does not become a second entity when it triggered
/// `marcus.md`.
pub fn detect_mentions(message: &str, matches: &[TriggerMatch]) -> Vec<Mention> {
    let mut claimed: BTreeSet<String> = BTreeSet::new();
    let mut mentions = Vec::new();

    for m in matches {
        if claimed.insert(fold_name(&m.entity)) {
            mentions.push(Mention {
                name: m.entity.clone(),
                source: MentionSource::Trigger,
            });
        }
        if m.trigger_type != TriggerType::Semantic {
            for word in m
                .matched_text
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| !w.is_empty())
            {
                claimed.insert(fold_name(word));
            }
        }
    }

    for name in capitalized_names(message) {
        if claimed.insert(fold_name(&name)) {
            mentions.push(Mention {
                name,
                source: MentionSource::Capitalized,
            });
        }
    }

    mentions
}
