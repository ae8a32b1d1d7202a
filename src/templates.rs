//! File templates for session initialization.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

/// Session README describing the directory layout.
pub const SESSION_README_MD: &str = r#"# Session

Context files for one roleplay session. Every user message is routed through
the tiers below before it reaches the model.

## Layout

| Directory     | Loaded                                              |
| ------------- | --------------------------------------------------- |
| `core/`       | Every turn                                          |
| `guidelines/` | Every 4th turn (`tiers.periodic_interval`)          |
| `characters/` | When a trigger in the file matches the message      |
| `entities/`   | Same as `characters/`                               |
| `state/`      | Counters and tracking, written by lorekeeper        |

A character or entity file that triggers on 3 of the last 10 turns is
escalated and loaded every turn until it falls out of the window.

## Triggers

Declare triggers in a `+++` front-matter block:

```
+++
triggers = ["Marcus", "Marc"]
regex_triggers = ["\\bMarcus'?s?\\b"]
semantic_triggers = ["the mercenary captain"]
+++
```

or with markers on their own line:

```
[Triggers:Marcus,Marc]
[RegexTriggers:\b(Marc|Mark)us\b]
[SemanticTriggers:the mercenary captain]
```

Keywords match whole words, ignoring case. Regex triggers use Rust `regex`
syntax; a pattern that fails to compile is skipped. Semantic triggers are only
used when `semantic_matching.enabled` is set.

## Entity cards

Capitalized names without a file are counted in `state/entity_tracker.json`.
On the 2nd mention (`cards.entity_mention_threshold`) a card is reported as due.
"#;

/// Example character file with both trigger forms.
pub const EXAMPLE_CHARACTER_MD: &str = r#"+++
triggers = ["Marcus"]
regex_triggers = ["\\bMarcus'?s?\\b"]
semantic_triggers = ["the mercenary captain"]
+++

[Triggers:Marc]

# Marcus

Captain of a small mercenary company. Scar across the left brow. Loyal to
coin first and to his crew a close second.
"#;

/// Placeholder for the always-loaded tier.
pub const CORE_WORLD_MD: &str = r#"# World

Describe the setting here. Everything in `core/` is loaded on every turn, so
keep it short.
"#;

/// Placeholder for the periodic tier.
pub const GUIDELINES_STYLE_MD: &str = r#"# Style

Narration guidelines reloaded every few turns: tone, tense, point of view,
content boundaries.
"#;

/// Session override file. Every key is optional and falls back to the global config.
pub const AUTOMATION_CONFIG_JSON: &str = r#"{
  "tiers": {
    "periodic_interval": 4,
    "arc_frequency": 50
  },
  "escalation": {
    "window": 10,
    "threshold": 3
  },
  "cards": {
    "entity_mention_threshold": 2
  }
}
"#;

/// Files written by `init`, relative to the session root.
pub const SESSION_FILES: &[(&str, &str)] = &[
    ("README.md", SESSION_README_MD),
    ("core/world.md", CORE_WORLD_MD),
    ("guidelines/style.md", GUIDELINES_STYLE_MD),
    ("characters/marcus.md", EXAMPLE_CHARACTER_MD),
    ("state/automation_config.json", AUTOMATION_CONFIG_JSON),
];

/// Whether `init` may write a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitFileStatus {
    /// File will be created (doesn't exist).
    WillCreate,
    /// File already exists and is left alone.
    Conflict,
}

#[derive(Debug, Clone)]
pub struct InitFileEntry {
    /// Path relative to the session root.
    pub display_path: &'static str,
    pub full_path: PathBuf,
    pub contents: &'static str,
    pub status: InitFileStatus,
}

/// Check which session files already exist under `root`.
pub fn plan_init(root: &Path) -> Vec<InitFileEntry> {
    SESSION_FILES
        .iter()
        .map(|&(display_path, contents)| {
            let full_path = root.join(display_path);
            let status = if full_path.exists() {
                InitFileStatus::Conflict
            } else {
                InitFileStatus::WillCreate
            };
            InitFileEntry {
                display_path,
                full_path,
                contents,
                status,
            }
        })
        .collect()
}

/// Write every planned file that doesn't exist yet, plus the empty
/// `entities/` directory. Returns the number of files created.
pub fn create_files(root: &Path, files: &[InitFileEntry]) -> Result<usize, String> {
    let entities = root.join("entities");
    fs::create_dir_all(&entities)
        .map_err(|e| format!("Failed to create directory {}: {}", entities.display(), e))?;

    let mut created = 0;
    for file in files {
        if file.status == InitFileStatus::Conflict {
            debug!(path = file.display_path, "init_file_exists");
            continue;
        }

        if let Some(parent) = file.full_path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                format!("Failed to create directory {}: {}", parent.display(), e)
            })?;
        }

        fs::write(&file.full_path, file.contents)
            .map_err(|e| format!("Failed to write {}: {}", file.display_path, e))?;
        created += 1;
    }

    info!(root = ?root, created, "session_initialized");
    Ok(created)
}
