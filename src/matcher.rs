//! Trigger matching across all tiers.
//!
//! Each entity file is tried against the keyword tier, then the regex tier,
//! then the semantic tier. The first tier that matches decides the result for
//! that file.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Config;
use crate::entity::EntityFile;
use crate::keyword::KeywordMatcher;
use crate::pattern::RegexMatcher;
use crate::semantic::{ConceptMatcher, concept_matcher_for};

/// Which tier produced a match. Ordered cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    Keyword,
    Regex,
    Semantic,
}

impl TriggerType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Regex => "regex",
            Self::Semantic => "semantic",
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A successful match of one entity file against a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerMatch {
    pub entity: String,
    pub path: PathBuf,
    pub trigger_type: TriggerType,
    /// The keyword, regex or concept phrase that matched.
    pub pattern: String,
    /// Text in the message that matched, as spelled there; the whole message
    /// for semantic hits.
    pub matched_text: String,
    /// 1.0 for keyword and regex hits, similarity for semantic hits.
    pub confidence: f32,
}

pub struct TriggerMatcher {
    keyword_enabled: bool,
    regex_enabled: bool,
    semantic_enabled: bool,
    keywords: KeywordMatcher,
    regexes: RegexMatcher,
    concepts: Box<dyn ConceptMatcher>,
}

impl TriggerMatcher {
    pub fn new(config: &Config) -> Self {
        Self {
            keyword_enabled: config.keyword_matching.enabled,
            regex_enabled: config.regex_matching.enabled,
            semantic_enabled: config.semantic_matching.enabled,
            keywords: KeywordMatcher::new(&config.keyword_matching),
            regexes: RegexMatcher::new(&config.regex_matching),
            concepts: concept_matcher_for(&config.semantic_matching),
        }
    }

    /// Swap in a different semantic backend.
    pub fn with_concept_matcher(mut self, concepts: Box<dyn ConceptMatcher>) -> Self {
        self.concepts = concepts;
        self
    }

    /// Whether the semantic tier will be consulted at all.
    pub fn semantic_active(&self) -> bool {
        self.semantic_enabled && self.concepts.is_active()
    }

    /// Match a single entity file, trying tiers cheapest first.
    pub fn match_entity(&mut self, message: &str, entity: &EntityFile) -> Option<TriggerMatch> {
        let build = |trigger_type, pattern: String, matched_text: String, confidence| TriggerMatch {
            entity: entity.name.clone(),
            path: entity.path.clone(),
            trigger_type,
            pattern,
            matched_text,
            confidence,
        };

        if self.keyword_enabled
            && let Some(hit) = self
                .keywords
                .find(message, &entity.keywords)
                .into_iter()
                .next()
        {
            return Some(build(
                TriggerType::Keyword,
                hit.keyword.to_string(),
                hit.matched_text,
                1.0,
            ));
        }

        if self.regex_enabled
            && let Some(hit) = self
                .regexes
                .find(&entity.path, message, &entity.regex_patterns)
                .into_iter()
                .next()
        {
            return Some(build(TriggerType::Regex, hit.pattern, hit.matched_text, 1.0));
        }

        if self.semantic_active()
            && !entity.concepts.is_empty()
            && let Some(hit) = self.concepts.find(message, &entity.concepts).into_iter().next()
        {
            return Some(build(
                TriggerType::Semantic,
                hit.phrase,
                message.to_string(),
                hit.similarity,
            ));
        }

        None
    }

    /// Match every entity and rank the results: confidence first, then tier,
    /// then entity name.
    pub fn match_message<'a>(
        &mut self,
        message: &str,
        entities: impl IntoIterator<Item = &'a EntityFile>,
    ) -> Vec<TriggerMatch> {
        let mut matches: Vec<TriggerMatch> = entities
            .into_iter()
            .filter_map(|entity| self.match_entity(message, entity))
            .collect();

        matches.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.trigger_type.cmp(&b.trigger_type))
                .then_with(|| a.entity.cmp(&b.entity))
        });

        for m in &matches {
            info!(
                entity = %m.entity,
                trigger_type = %m.trigger_type,
                pattern = %m.pattern,
                confidence = m.confidence,
                "trigger_matched"
            );
        }

        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::{EmbedError, Embedder, EmbeddingConceptMatcher};
    use std::cell::Cell;
    use std::path::Path;
    use std::rc::Rc;

    fn entity(name: &str, contents: &str) -> EntityFile {
        EntityFile::parse(Path::new(&format!("characters/{}.md", name)), contents)
    }

    /// Counts calls; "sword" text lands on one axis, everything else on another.
    struct CountingEmbedder {
        calls: Rc<Cell<usize>>,
    }

    impl Embedder for CountingEmbedder {
        fn model(&self) -> &str {
            "counting"
        }

        fn embed(&mut self, text: &str) -> Result<Vec<f32>, EmbedError> {
            self.calls.set(self.calls.get() + 1);
            Ok(if text.contains("sword") {
                vec![1.0, 0.0]
            } else {
                vec![0.0, 1.0]
            })
        }
    }

    fn semantic_config() -> Config {
        let mut config = Config::default();
        config.semantic_matching.enabled = true;
        config
    }

    #[test]
    fn test_keyword_short_circuits_regex() {
        let mut m = TriggerMatcher::new(&Config::default());
        let marcus = entity("marcus", "[Triggers:Marcus]\n[RegexTriggers:\\bMarcus'?s?\\b]");
        let result = m.match_entity("Marcus's jacket is here", &marcus).unwrap();
        assert_eq!(result.trigger_type, TriggerType::Keyword);
        assert_eq!(result.pattern, "Marcus");
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_keyword_match_keeps_message_spelling() {
        let mut m = TriggerMatcher::new(&Config::default());
        let marc = entity("marc", "[Triggers:marc]");
        let result = m.match_entity("Marc waves", &marc).unwrap();
        assert_eq!(result.pattern, "marc");
        assert_eq!(result.matched_text, "Marc");
    }

    #[test]
    fn test_regex_only_possessive() {
        let mut m = TriggerMatcher::new(&Config::default());
        let marcus = entity("marcus", "[RegexTriggers:\\bMarcus'?s?\\b]");
        let result = m.match_entity("Marcus's jacket is here", &marcus).unwrap();
        assert_eq!(result.trigger_type, TriggerType::Regex);
        assert_eq!(result.matched_text, "Marcus's");
    }

    #[test]
    fn test_disabled_keyword_tier_falls_through() {
        let mut config = Config::default();
        config.keyword_matching.enabled = false;
        let mut m = TriggerMatcher::new(&config);
        let marcus = entity("marcus", "[Triggers:Marcus]\n[RegexTriggers:Marc]");
        let result = m.match_entity("Marcus waves", &marcus).unwrap();
        assert_eq!(result.trigger_type, TriggerType::Regex);
    }

    #[test]
    fn test_disabled_regex_tier() {
        let mut config = Config::default();
        config.regex_matching.enabled = false;
        let mut m = TriggerMatcher::new(&config);
        let marcus = entity("marcus", "[RegexTriggers:Marc]");
        assert!(m.match_entity("Marcus waves", &marcus).is_none());
    }

    #[test]
    fn test_no_match() {
        let mut m = TriggerMatcher::new(&Config::default());
        let marcus = entity("marc", "[Triggers:Marc]");
        assert!(m.match_entity("Marcusian empire arrived", &marcus).is_none());
    }

    #[test]
    fn test_semantic_tier_used_last() {
        let calls = Rc::new(Cell::new(0));
        let mut m = TriggerMatcher::new(&semantic_config()).with_concept_matcher(Box::new(
            EmbeddingConceptMatcher::new(
                CountingEmbedder {
                    calls: calls.clone(),
                },
                0.7,
            ),
        ));
        let blade = entity("blade", "[Triggers:Moonblade]\n[SemanticTriggers:a sword]");

        let keyword = m.match_entity("The Moonblade glows", &blade).unwrap();
        assert_eq!(keyword.trigger_type, TriggerType::Keyword);
        assert_eq!(calls.get(), 0);

        let semantic = m.match_entity("I raise my sword", &blade).unwrap();
        assert_eq!(semantic.trigger_type, TriggerType::Semantic);
        assert_eq!(semantic.pattern, "a sword");
        assert!((semantic.confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_disabled_semantic_never_embeds() {
        let calls = Rc::new(Cell::new(0));
        let mut m = TriggerMatcher::new(&Config::default()).with_concept_matcher(Box::new(
            EmbeddingConceptMatcher::new(
                CountingEmbedder {
                    calls: calls.clone(),
                },
                0.7,
            ),
        ));
        let blade = entity("blade", "[SemanticTriggers:a sword]");
        assert!(!m.semantic_active());
        assert!(m.match_entity("I raise my sword", &blade).is_none());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_match_message_ranking() {
        let calls = Rc::new(Cell::new(0));
        let mut m = TriggerMatcher::new(&semantic_config()).with_concept_matcher(Box::new(
            EmbeddingConceptMatcher::new(CountingEmbedder { calls }, 0.5),
        ));
        let entities = vec![
            entity("zed", "[Triggers:Zed]"),
            entity("blade", "[SemanticTriggers:sword play]"),
            entity("anna", "[RegexTriggers:\\bAnn(a|ie)\\b]"),
            entity("tom", "[Triggers:Tom]"),
            entity("quiet", "[Triggers:Nobody]"),
        ];

        let matches = m.match_message("Zed hands Annie a sword while Tom watches", &entities);
        let order: Vec<_> = matches
            .iter()
            .map(|m| (m.entity.as_str(), m.trigger_type))
            .collect();
        assert_eq!(
            order,
            vec![
                ("tom", TriggerType::Keyword),
                ("zed", TriggerType::Keyword),
                ("anna", TriggerType::Regex),
                ("blade", TriggerType::Semantic),
            ]
        );
    }

    #[test]
    fn test_trigger_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TriggerType::Semantic).unwrap(),
            "\"semantic\""
        );
        assert_eq!(TriggerType::Regex.to_string(), "regex");
    }
}
