//! Optional semantic tier: concept phrases matched by embedding similarity.
//!
//! The orchestrator only sees the [`ConceptMatcher`] capability. Sessions get
//! [`NoConceptMatcher`] unless semantic matching is enabled and the configured
//! model can be loaded.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::SemanticMatchingConfig;

/// Model name of the built-in [`HashingEmbedder`].
pub const HASHING_MODEL: &str = "hashing";

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding model '{0}' is not available")]
    Unavailable(String),

    #[error("embedding failed: {0}")]
    Failed(String),
}

/// Turns text into a fixed-length vector.
pub trait Embedder {
    fn model(&self) -> &str;
    fn embed(&mut self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// A concept phrase that cleared the similarity threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptHit {
    pub phrase: String,
    /// Cosine similarity clamped to [0, 1].
    pub similarity: f32,
}

/// Capability used by the trigger matcher for its last tier.
pub trait ConceptMatcher {
    /// False when the matcher can never produce hits.
    fn is_active(&self) -> bool;

    /// Concepts similar enough to `message`, best first.
    fn find(&mut self, message: &str, concepts: &[String]) -> Vec<ConceptHit>;
}

/// Default matcher: never matches and never embeds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoConceptMatcher;

impl ConceptMatcher for NoConceptMatcher {
    fn is_active(&self) -> bool {
        false
    }

    fn find(&mut self, _message: &str, _concepts: &[String]) -> Vec<ConceptHit> {
        Vec::new()
    }
}

/// Embedding-backed concept matcher.
///
/// The message is embedded once per distinct message; phrase embeddings are
/// cached for the life of the matcher. The first embedding failure switches the
/// matcher off for the rest of the run.
pub struct EmbeddingConceptMatcher<E> {
    embedder: E,
    threshold: f32,
    phrase_cache: HashMap<String, Vec<f32>>,
    message_cache: Option<(String, Vec<f32>)>,
    disabled: bool,
}

impl<E: Embedder> EmbeddingConceptMatcher<E> {
    pub fn new(embedder: E, threshold: f32) -> Self {
        Self {
            embedder,
            threshold,
            phrase_cache: HashMap::new(),
            message_cache: None,
            disabled: false,
        }
    }

    fn disable(&mut self, error: &EmbedError) {
        warn!(model = %self.embedder.model(), error = %error, "semantic_tier_disabled");
        self.disabled = true;
    }

    fn message_embedding(&mut self, message: &str) -> Option<Vec<f32>> {
        if let Some((cached, vector)) = &self.message_cache
            && cached == message
        {
            return Some(vector.clone());
        }
        match self.embedder.embed(message) {
            Ok(vector) => {
                self.message_cache = Some((message.to_string(), vector.clone()));
                Some(vector)
            }
            Err(e) => {
                self.disable(&e);
                None
            }
        }
    }
}

impl<E: Embedder> ConceptMatcher for EmbeddingConceptMatcher<E> {
    fn is_active(&self) -> bool {
        !self.disabled
    }

    fn find(&mut self, message: &str, concepts: &[String]) -> Vec<ConceptHit> {
        if self.disabled || concepts.is_empty() {
            return Vec::new();
        }
        let Some(message_vector) = self.message_embedding(message) else {
            return Vec::new();
        };

        let mut hits = Vec::new();
        for phrase in concepts {
            if !self.phrase_cache.contains_key(phrase) {
                match self.embedder.embed(phrase) {
                    Ok(vector) => {
                        self.phrase_cache.insert(phrase.clone(), vector);
                    }
                    Err(e) => {
                        self.disable(&e);
                        return Vec::new();
                    }
                }
            }
            let Some(phrase_vector) = self.phrase_cache.get(phrase) else {
                continue;
            };

            let similarity = cosine_similarity(&message_vector, phrase_vector);
            debug!(phrase = %phrase, similarity, "concept_similarity");
            if similarity >= self.threshold {
                hits.push(ConceptHit {
                    phrase: phrase.clone(),
                    similarity,
                });
            }
        }

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits
    }
}

/// Cosine similarity clamped to [0, 1]. Mismatched or zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

/// Dependency-free bag-of-words embedder using feature hashing.
///
/// Tokens are lower-cased alphanumeric runs with a trailing plural `s`
/// dropped; each token and each adjacent token pair is hashed into a bucket.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dims: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self { dims: 512 }
    }
}

impl HashingEmbedder {
    pub fn with_dims(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    fn bucket(&self, token: &str) -> usize {
        // FNV-1a, stable across runs and platforms.
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in token.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        (hash % self.dims as u64) as usize
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(|t| {
            let lower = t.to_lowercase();
            match lower.strip_suffix('s') {
                Some(stem) if stem.len() > 2 && !stem.ends_with('s') => stem.to_string(),
                _ => lower,
            }
        })
        .collect()
}

impl Embedder for HashingEmbedder {
    fn model(&self) -> &str {
        HASHING_MODEL
    }

    fn embed(&mut self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vector = vec![0.0f32; self.dims];
        let tokens = tokens(text);
        for token in &tokens {
            vector[self.bucket(token)] += 1.0;
        }
        for pair in tokens.windows(2) {
            vector[self.bucket(&format!("{} {}", pair[0], pair[1]))] += 0.5;
        }
        Ok(vector)
    }
}

/// Build the concept matcher a session should use.
///
/// Disabled config, or a model this build cannot load, yields [`NoConceptMatcher`].
pub fn concept_matcher_for(config: &SemanticMatchingConfig) -> Box<dyn ConceptMatcher> {
    if !config.enabled {
        return Box::new(NoConceptMatcher);
    }
    match config.model.as_str() {
        HASHING_MODEL => Box::new(EmbeddingConceptMatcher::new(
            HashingEmbedder::default(),
            config.similarity_threshold as f32,
        )),
        other => {
            warn!(
                error = %EmbedError::Unavailable(other.to_string()),
                "semantic_model_unavailable"
            );
            Box::new(NoConceptMatcher)
        }
    }
}
