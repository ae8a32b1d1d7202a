//! Debounced, atomic writes of tracking state.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write `contents` to `path` through a sibling temp file and a rename, so a
/// crash mid-write never leaves a truncated state file behind.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), StateError> {
    let io_err = |source| StateError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("state");
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    fs::write(&tmp, contents).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        io_err(e)
    })
}

/// Pending file writes, flushed at most once per interval.
///
/// Later writes to the same path replace earlier ones. Whatever is still
/// pending when the queue is dropped is flushed then.
#[derive(Debug)]
pub struct WriteQueue {
    pending: BTreeMap<PathBuf, String>,
    interval: Duration,
    last_flush: Option<Instant>,
}

impl WriteQueue {
    pub fn new(interval: Duration) -> Self {
        Self {
            pending: BTreeMap::new(),
            interval,
            last_flush: None,
        }
    }

    pub fn enqueue(&mut self, path: PathBuf, contents: String) {
        self.pending.insert(path, contents);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Whether enough time has passed since the last flush.
    pub fn is_due(&self) -> bool {
        match self.last_flush {
            Some(at) => at.elapsed() >= self.interval,
            None => true,
        }
    }

    /// Flush if the interval has elapsed. Returns the number of files written.
    pub fn flush_if_due(&mut self) -> Result<usize, StateError> {
        if self.pending.is_empty() || !self.is_due() {
            return Ok(0);
        }
        self.flush()
    }

    /// Write everything pending. Failed writes stay queued; the first error is returned.
    pub fn flush(&mut self) -> Result<usize, StateError> {
        let mut written = 0;
        let mut first_error = None;

        for (path, contents) in std::mem::take(&mut self.pending) {
            match write_atomic(&path, &contents) {
                Ok(()) => written += 1,
                Err(e) => {
                    warn!(path = ?path, error = %e, "state_write_failed");
                    first_error.get_or_insert(e);
                    self.pending.insert(path, contents);
                }
            }
        }

        self.last_flush = Some(Instant::now());
        debug!(written, "state_flushed");

        match first_error {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }
}

impl Drop for WriteQueue {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            // Errors were already logged by flush.
            let _ = self.flush();
        }
    }
}
