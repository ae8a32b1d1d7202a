//! One roleplay session: config, persisted state and the per-turn pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::assembler::{AssembledPrompt, LoadPlan, PromptAssembler};
use crate::config::Config;
use crate::detect::detect_mentions;
use crate::entity::{EntityStore, RefreshSummary, markdown_files};
use crate::matcher::{TriggerMatch, TriggerMatcher};
use crate::persist::{StateError, WriteQueue};
use crate::semantic::ConceptMatcher;
use crate::state::{SessionState, is_every};

/// Everything one turn produced.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub response_number: u64,
    /// The periodic tier was loaded this turn.
    pub periodic: bool,
    /// Story arc regeneration is due this turn.
    pub arc_regeneration_due: bool,
    pub matches: Vec<TriggerMatch>,
    pub escalated: Vec<PathBuf>,
    /// Entities whose card became due this turn.
    pub cards_due: Vec<String>,
    pub prompt: AssembledPrompt,
}

pub struct Session {
    root: PathBuf,
    config: Config,
    state: SessionState,
    store: EntityStore,
    matcher: TriggerMatcher,
    assembler: PromptAssembler,
    queue: WriteQueue,
}

impl Session {
    /// Open the session rooted at `root`. Broken state files fall back to
    /// defaults; nothing here fails.
    pub fn open(root: impl Into<PathBuf>, config: Config) -> Self {
        let root = root.into();
        let (state, problems) = SessionState::load(&root, config.escalation.window);
        if !problems.is_empty() {
            warn!(count = problems.len(), "session_state_partially_reset");
        }

        let entity_dirs = config
            .tiers
            .entity_dirs
            .iter()
            .map(|entry| Config::resolve(&root, entry))
            .collect();

        let session = Self {
            store: EntityStore::new(entity_dirs),
            matcher: TriggerMatcher::new(&config),
            assembler: PromptAssembler::new(&root),
            queue: WriteQueue::new(Duration::from_millis(config.persistence.flush_interval_ms)),
            root,
            config,
            state,
        };

        info!(
            root = ?session.root,
            responses = session.state.response_count,
            semantic = session.matcher.semantic_active(),
            "session_opened"
        );
        session
    }

    /// Replace the semantic backend, e.g. with an external embedding model.
    pub fn with_concept_matcher(mut self, concepts: Box<dyn ConceptMatcher>) -> Self {
        self.matcher = self.matcher.with_concept_matcher(concepts);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Set the current chapter used for entity bookkeeping.
    pub fn set_chapter(&mut self, chapter: u32) {
        self.state.chapter = chapter.max(1);
        self.stage();
    }

    /// Re-scan the entity directories.
    pub fn refresh_entities(&mut self) -> RefreshSummary {
        self.store.refresh()
    }

    /// Match a message without touching counters, history or the tracker.
    pub fn preview(&mut self, message: &str) -> Vec<TriggerMatch> {
        self.store.refresh();
        self.matcher.match_message(message, self.store.entities())
    }

    /// Run the full pipeline for one user message.
    pub fn run_turn(&mut self, message: &str) -> TurnOutcome {
        let refreshed = self.store.refresh();
        let response_number = self.state.next_response();
        let periodic = is_every(response_number, self.config.tiers.periodic_interval);
        let arc_regeneration_due = is_every(response_number, self.config.tiers.arc_frequency);

        let matches = self
            .matcher
            .match_message(message, self.store.entities());

        self.state
            .history
            .record(matches.iter().map(|m| m.path.clone()));
        let escalated = self.state.history.escalated(self.config.escalation.threshold);

        let mentions = detect_mentions(message, &matches);
        let cards_due = self.state.tracker.observe_all(
            &mentions,
            self.state.chapter,
            self.config.cards.entity_mention_threshold,
        );

        let plan = LoadPlan {
            always: self.expand(&self.config.tiers.always),
            periodic: if periodic {
                self.expand(&self.config.tiers.periodic)
            } else {
                Vec::new()
            },
            escalated: escalated.clone(),
            triggered: matches.iter().map(|m| m.path.clone()).collect(),
        };
        let prompt = self.assembler.assemble(&plan, message);

        self.stage();

        info!(
            response = response_number,
            entities = self.store.len(),
            reparsed = refreshed.parsed,
            matches = matches.len(),
            escalated = escalated.len(),
            cards_due = cards_due.len(),
            periodic,
            arc_regeneration_due,
            "turn_complete"
        );

        TurnOutcome {
            response_number,
            periodic,
            arc_regeneration_due,
            matches,
            escalated,
            cards_due,
            prompt,
        }
    }

    /// Tier entries resolved to files; directories expand to their `*.md` files.
    fn expand(&self, entries: &[String]) -> Vec<PathBuf> {
        entries
            .iter()
            .map(|entry| Config::resolve(&self.root, entry))
            .flat_map(|path| {
                if path.is_dir() {
                    markdown_files(&path)
                } else {
                    vec![path]
                }
            })
            .collect()
    }

    /// Queue state for writing and flush if the debounce interval allows.
    fn stage(&mut self) {
        if let Err(e) = self.state.stage(&self.root, &mut self.queue) {
            warn!(error = %e, "session_state_stage_failed");
            return;
        }
        if let Err(e) = self.queue.flush_if_due() {
            warn!(error = %e, "session_state_flush_failed");
        }
    }

    /// Write any pending state now.
    pub fn flush(&mut self) -> Result<(), StateError> {
        self.queue.flush().map(|_| ())
    }
}
