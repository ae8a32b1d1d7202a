//! Whole-word keyword matching.

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::config::KeywordMatchingConfig;

/// A keyword that occurs in the message, with the text it matched there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordHit<'k> {
    pub keyword: &'k str,
    pub matched_text: String,
}

/// Matches keyword lists against message text.
///
/// One regex per distinct keyword is compiled on first use and kept for the
/// life of the matcher.
#[derive(Debug)]
pub struct KeywordMatcher {
    case_sensitive: bool,
    use_word_boundaries: bool,
    cache: HashMap<String, Regex>,
}

impl KeywordMatcher {
    pub fn new(config: &KeywordMatchingConfig) -> Self {
        Self {
            case_sensitive: config.case_sensitive,
            use_word_boundaries: config.use_word_boundaries,
            cache: HashMap::new(),
        }
    }

    /// Returns the keywords that occur in `message`, in list order.
    pub fn find<'k>(&mut self, message: &str, keywords: &'k [String]) -> Vec<KeywordHit<'k>> {
        let mut hits = Vec::new();

        for keyword in keywords.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
            let Some(re) = self.keyword_regex(keyword) else {
                continue;
            };
            if let Some(m) = re.find(message) {
                hits.push(KeywordHit {
                    keyword,
                    matched_text: m.as_str().to_string(),
                });
            }
        }

        hits
    }

    fn keyword_regex(&mut self, keyword: &str) -> Option<&Regex> {
        if !self.cache.contains_key(keyword) {
            let pattern = if self.use_word_boundaries {
                word_pattern(keyword)
            } else {
                regex::escape(keyword)
            };
            match RegexBuilder::new(&pattern)
                .case_insensitive(!self.case_sensitive)
                .build()
            {
                Ok(re) => {
                    self.cache.insert(keyword.to_string(), re);
                }
                Err(e) => {
                    // Escaped input should always compile; only the size limit can trip this.
                    warn!(keyword = %keyword, error = %e, "keyword_regex_failed");
                    return None;
                }
            }
        }
        self.cache.get(keyword)
    }
}

/// `\b` is only added on a side where the keyword starts or ends with a word
/// character, otherwise `Dr.` or `@home` could never match.
fn word_pattern(keyword: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let starts_word = keyword.chars().next().is_some_and(is_word);
    let ends_word = keyword.chars().last().is_some_and(is_word);

    format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        regex::escape(keyword),
        if ends_word { r"\b" } else { "" }
    )
}
