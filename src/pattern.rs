//! Regex trigger matching with a per-file pattern cap.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::config::RegexMatchingConfig;

/// Upper bound on compiled program size for a single trigger pattern.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// A pattern that matched, with the text it matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternHit {
    pub pattern: String,
    pub matched_text: String,
}

/// Compiles and caches regex triggers keyed by (file, pattern).
///
/// Patterns that fail to compile are cached as failures so each one is only
/// reported once.
#[derive(Debug)]
pub struct RegexMatcher {
    max_patterns_per_file: usize,
    cache: HashMap<(PathBuf, String), Option<Regex>>,
}

impl RegexMatcher {
    pub fn new(config: &RegexMatchingConfig) -> Self {
        Self {
            max_patterns_per_file: config.max_patterns_per_file,
            cache: HashMap::new(),
        }
    }

    /// Test the first `max_patterns_per_file` patterns against the raw message.
    pub fn find(&mut self, file: &Path, message: &str, patterns: &[String]) -> Vec<PatternHit> {
        let mut hits = Vec::new();

        for pattern in patterns.iter().take(self.max_patterns_per_file) {
            let Some(re) = self.compiled(file, pattern) else {
                continue;
            };
            if let Some(m) = re.find(message) {
                hits.push(PatternHit {
                    pattern: pattern.clone(),
                    matched_text: m.as_str().to_string(),
                });
            }
        }

        hits
    }

    fn compiled(&mut self, file: &Path, pattern: &str) -> Option<&Regex> {
        self.cache
            .entry((file.to_path_buf(), pattern.to_string()))
            .or_insert_with(|| {
                match RegexBuilder::new(pattern)
                    .size_limit(PATTERN_SIZE_LIMIT)
                    .build()
                {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!(file = ?file, pattern = %pattern, error = %e, "regex_trigger_invalid");
                        None
                    }
                }
            })
            .as_ref()
    }

    /// Number of cached (file, pattern) entries, including failures.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
