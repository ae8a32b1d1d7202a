//! Sliding-window escalation of frequently triggered files.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Rolling record of which files were triggered on each recent response.
///
/// Serializes as `{"trigger_history": [[path, ...], ...]}`, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerHistory {
    #[serde(rename = "trigger_history")]
    snapshots: VecDeque<Vec<PathBuf>>,
    #[serde(skip, default = "default_window")]
    window: usize,
}

fn default_window() -> usize {
    10
}

impl Default for TriggerHistory {
    fn default() -> Self {
        Self::with_window(default_window())
    }
}

impl TriggerHistory {
    pub fn with_window(window: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            window: window.max(1),
        }
    }

    /// Change the window size, dropping the oldest snapshots if it shrank.
    pub fn set_window(&mut self, window: usize) {
        self.window = window.max(1);
        self.trim();
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Append one response's triggered files and drop snapshots past the window.
    /// A file listed twice in the same response counts once.
    pub fn record<I>(&mut self, triggered: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut snapshot: Vec<PathBuf> = Vec::new();
        for path in triggered {
            if !snapshot.contains(&path) {
                snapshot.push(path);
            }
        }
        self.snapshots.push_back(snapshot);
        self.trim();
    }

    fn trim(&mut self) {
        while self.snapshots.len() > self.window {
            self.snapshots.pop_front();
        }
    }

    /// Number of snapshots in the window that contain each file.
    pub fn counts(&self) -> BTreeMap<PathBuf, usize> {
        let mut counts = BTreeMap::new();
        for snapshot in &self.snapshots {
            let unique: BTreeSet<&PathBuf> = snapshot.iter().collect();
            for path in unique {
                *counts.entry(path.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Files triggered in at least `threshold` snapshots of the current window,
    /// most frequent first. Recomputed on every call.
    pub fn escalated(&self, threshold: usize) -> Vec<PathBuf> {
        let threshold = threshold.max(1);
        let mut escalated: Vec<(PathBuf, usize)> = self
            .counts()
            .into_iter()
            .filter(|(_, count)| *count >= threshold)
            .collect();
        escalated.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        escalated.into_iter().map(|(path, _)| path).collect()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &[PathBuf]> {
        self.snapshots.iter().map(Vec::as_slice)
    }
}
