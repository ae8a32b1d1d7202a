//! Persisted per-session state: counters, trigger history and entity tracker.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::escalation::TriggerHistory;
use crate::persist::{StateError, WriteQueue, write_atomic};
use crate::tracker::EntityTracker;

/// Locations of the state files under a session root.
#[derive(Debug, Clone)]
pub struct StatePaths {
    pub dir: PathBuf,
    pub response_counter: PathBuf,
    pub chapter: PathBuf,
    pub trigger_history: PathBuf,
    pub entity_tracker: PathBuf,
}

impl StatePaths {
    pub fn new(session_root: &Path) -> Self {
        let dir = session_root.join("state");
        Self {
            response_counter: dir.join("response_counter.txt"),
            chapter: dir.join("current_chapter.txt"),
            trigger_history: dir.join("trigger_history.json"),
            entity_tracker: dir.join("entity_tracker.json"),
            dir,
        }
    }
}

/// True on every `interval`th count. An interval of 0 never fires.
pub fn is_every(count: u64, interval: u64) -> bool {
    interval != 0 && count != 0 && count % interval == 0
}

/// Everything a session persists between turns.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub response_count: u64,
    pub chapter: u32,
    pub history: TriggerHistory,
    pub tracker: EntityTracker,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            response_count: 0,
            chapter: 1,
            history: TriggerHistory::default(),
            tracker: EntityTracker::default(),
        }
    }
}

/// Read and parse one state file. `None` for a missing file; anything else
/// that goes wrong is logged and recorded in `problems`.
fn read_state_file<T>(
    path: &Path,
    parse: impl FnOnce(&str) -> Result<T, String>,
    problems: &mut Vec<String>,
) -> Option<T> {
    let problem = match fs::read_to_string(path) {
        Ok(contents) => match parse(&contents) {
            Ok(value) => return Some(value),
            Err(e) => format!("{}: {}", path.display(), e),
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => format!("{}: {}", path.display(), e),
    };
    warn!(problem = %problem, "state_file_ignored");
    problems.push(problem);
    None
}

fn parse_integer<T: std::str::FromStr>(contents: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    contents.trim().parse::<T>().map_err(|e| e.to_string())
}

fn parse_json<T: DeserializeOwned>(contents: &str) -> Result<T, String> {
    serde_json::from_str(contents).map_err(|e| e.to_string())
}

impl SessionState {
    /// Load state from `session_root`, falling back to defaults per file.
    ///
    /// Missing files are normal for a new session. Unreadable or malformed
    /// files are logged and reported in the returned list.
    pub fn load(session_root: &Path, window: usize) -> (Self, Vec<String>) {
        let paths = StatePaths::new(session_root);
        let mut state = Self::default();
        let mut problems = Vec::new();

        if let Some(count) =
            read_state_file(&paths.response_counter, parse_integer::<u64>, &mut problems)
        {
            state.response_count = count;
        }
        if let Some(chapter) = read_state_file(&paths.chapter, parse_integer::<u32>, &mut problems)
        {
            state.chapter = chapter.max(1);
        }
        if let Some(history) = read_state_file(
            &paths.trigger_history,
            parse_json::<TriggerHistory>,
            &mut problems,
        ) {
            state.history = history;
        }
        if let Some(tracker) = read_state_file(
            &paths.entity_tracker,
            parse_json::<EntityTracker>,
            &mut problems,
        ) {
            state.tracker = tracker;
        }

        state.history.set_window(window);
        debug!(
            responses = state.response_count,
            chapter = state.chapter,
            history = state.history.len(),
            entities = state.tracker.len(),
            "state_loaded"
        );

        (state, problems)
    }

    fn serialized(&self, paths: &StatePaths) -> Result<Vec<(PathBuf, String)>, StateError> {
        Ok(vec![
            (
                paths.response_counter.clone(),
                format!("{}\n", self.response_count),
            ),
            (paths.chapter.clone(), format!("{}\n", self.chapter)),
            (
                paths.trigger_history.clone(),
                serde_json::to_string_pretty(&self.history)?,
            ),
            (
                paths.entity_tracker.clone(),
                serde_json::to_string_pretty(&self.tracker)?,
            ),
        ])
    }

    /// Write every state file now.
    pub fn save(&self, session_root: &Path) -> Result<(), StateError> {
        for (path, contents) in self.serialized(&StatePaths::new(session_root))? {
            write_atomic(&path, &contents)?;
        }
        Ok(())
    }

    /// Queue every state file for the next flush.
    pub fn stage(&self, session_root: &Path, queue: &mut WriteQueue) -> Result<(), StateError> {
        for (path, contents) in self.serialized(&StatePaths::new(session_root))? {
            queue.enqueue(path, contents);
        }
        Ok(())
    }

    /// Advance the response counter for a new turn and return it.
    pub fn next_response(&mut self) -> u64 {
        self.response_count += 1;
        self.response_count
    }
}
