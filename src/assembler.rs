//! Prompt assembly from tiered context files.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

/// Load tier of a context file, in prompt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Always,
    Periodic,
    Escalated,
    Triggered,
}

impl Tier {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Always => "Core",
            Self::Periodic => "Periodic",
            Self::Escalated => "Escalated",
            Self::Triggered => "Triggered",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Files to load for one turn, per tier.
#[derive(Debug, Clone, Default)]
pub struct LoadPlan {
    pub always: Vec<PathBuf>,
    pub periodic: Vec<PathBuf>,
    pub escalated: Vec<PathBuf>,
    pub triggered: Vec<PathBuf>,
}

impl LoadPlan {
    fn tiers(&self) -> [(Tier, &[PathBuf]); 4] {
        [
            (Tier::Always, self.always.as_slice()),
            (Tier::Periodic, self.periodic.as_slice()),
            (Tier::Escalated, self.escalated.as_slice()),
            (Tier::Triggered, self.triggered.as_slice()),
        ]
    }
}

/// One file included in the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub tier: Tier,
    pub path: PathBuf,
    pub bytes: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AssembledPrompt {
    pub text: String,
    pub sections: Vec<Section>,
}

impl AssembledPrompt {
    pub fn tier_paths(&self, tier: Tier) -> Vec<&Path> {
        self.sections
            .iter()
            .filter(|s| s.tier == tier)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Builds the prompt text. Paths are shown relative to `root` when possible.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    root: PathBuf,
}

impl PromptAssembler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn display_path<'a>(&self, path: &'a Path) -> std::path::Display<'a> {
        path.strip_prefix(&self.root).unwrap_or(path).display()
    }

    /// Layer every tier's files, then the user message. A file is included once,
    /// in the first tier that lists it. Unreadable files are skipped.
    pub fn assemble(&self, plan: &LoadPlan, message: &str) -> AssembledPrompt {
        let mut seen: BTreeSet<&Path> = BTreeSet::new();
        let mut sections = Vec::new();
        let mut text = String::new();

        for (tier, paths) in plan.tiers() {
            for path in paths {
                if !seen.insert(path.as_path()) {
                    continue;
                }
                let contents = match fs::read_to_string(path) {
                    Ok(c) => c,
                    Err(e) => {
                        warn!(path = ?path, tier = %tier, error = %e, "context_file_skipped");
                        continue;
                    }
                };
                let contents = contents.trim();

                if text.is_empty() {
                    text.push_str("# Context\n");
                }
                text.push_str(&format!(
                    "\n## {}: {}\n\n{}\n",
                    tier,
                    self.display_path(path),
                    contents
                ));
                sections.push(Section {
                    tier,
                    path: path.clone(),
                    bytes: contents.len(),
                });
            }
        }

        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str("# User Message\n\n");
        text.push_str(message.trim());
        text.push('\n');

        AssembledPrompt { text, sections }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, contents: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_layers_in_tier_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let plan = LoadPlan {
            always: vec![write(root, "core/rules.md", "Rules.")],
            periodic: vec![write(root, "guidelines/style.md", "Style.")],
            escalated: vec![write(root, "characters/marcus.md", "Marcus.")],
            triggered: vec![write(root, "characters/sarah.md", "Sarah.")],
        };

        let prompt = PromptAssembler::new(root).assemble(&plan, "  Hello there  ");
        assert_eq!(
            prompt.text,
            "# Context\n\
             \n## Core: core/rules.md\n\nRules.\n\
             \n## Periodic: guidelines/style.md\n\nStyle.\n\
             \n## Escalated: characters/marcus.md\n\nMarcus.\n\
             \n## Triggered: characters/sarah.md\n\nSarah.\n\
             \n# User Message\n\nHello there\n"
        );
        assert_eq!(prompt.sections.len(), 4);
        assert_eq!(prompt.sections[0].bytes, 6);
    }

    #[test]
    fn test_file_appears_once_in_first_tier() {
        let dir = tempfile::tempdir().unwrap();
        let marcus = write(dir.path(), "characters/marcus.md", "Marcus.");
        let plan = LoadPlan {
            escalated: vec![marcus.clone()],
            triggered: vec![marcus.clone()],
            ..Default::default()
        };

        let prompt = PromptAssembler::new(dir.path()).assemble(&plan, "hi");
        assert_eq!(prompt.sections.len(), 1);
        assert_eq!(prompt.tier_paths(Tier::Escalated), vec![marcus.as_path()]);
        assert!(prompt.tier_paths(Tier::Triggered).is_empty());
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let plan = LoadPlan {
            always: vec![dir.path().join("core/missing.md")],
            ..Default::default()
        };
        let prompt = PromptAssembler::new(dir.path()).assemble(&plan, "hi");
        assert!(prompt.sections.is_empty());
        assert_eq!(prompt.text, "# User Message\n\nhi\n");
    }
}
