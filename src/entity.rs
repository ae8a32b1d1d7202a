//! Entity file parsing and the on-disk entity store.
//!
//! An entity file is a Markdown document describing a character, location or
//! item. Its triggers are declared either in a TOML front-matter block:
//!
//! ```text
//! +++
//! triggers = ["Marcus", "Marc"]
//! regex_triggers = ["\\bMarcus'?s?\\b"]
//! semantic_triggers = ["the old mercenary"]
//! +++
//! ```
//!
//! or with bracket markers on their own line:
//!
//! ```text
//! [Triggers:Marcus,Marc]
//! [RegexTriggers:\bMarcus'?s?\b]
//! [SemanticTriggers:the old mercenary]
//! ```
//!
//! Both forms may be mixed. Lists are merged in order and deduplicated.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Deserialize;
use tracing::{debug, warn};

const FRONT_MATTER_FENCE: &str = "+++";

/// A parsed entity file.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityFile {
    pub path: PathBuf,
    /// Derived from the file stem.
    pub name: String,
    pub keywords: Vec<String>,
    pub regex_patterns: Vec<String>,
    pub concepts: Vec<String>,
    /// File contents with front matter and trigger markers removed.
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FrontMatter {
    triggers: Vec<String>,
    regex_triggers: Vec<String>,
    semantic_triggers: Vec<String>,
}

/// Which trigger list a bracket marker feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Keywords,
    Regex,
    Semantic,
}

impl Marker {
    fn parse_line(line: &str) -> Option<(Self, &str)> {
        let line = line.trim();
        let inner = line.strip_prefix('[')?.strip_suffix(']')?;
        let (label, rest) = inner.split_once(':')?;
        let marker = match label.trim() {
            "Triggers" => Self::Keywords,
            "RegexTriggers" => Self::Regex,
            "SemanticTriggers" => Self::Semantic,
            _ => return None,
        };
        Some((marker, rest))
    }
}

impl EntityFile {
    /// Read and parse an entity file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Ok(Self::parse(path, &contents))
    }

    /// Parse entity file contents. Never fails: a broken front-matter block is
    /// logged and ignored, and the rest of the file is still scanned for markers.
    pub fn parse(path: &Path, contents: &str) -> Self {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        let mut entity = Self {
            path: path.to_path_buf(),
            name,
            keywords: Vec::new(),
            regex_patterns: Vec::new(),
            concepts: Vec::new(),
            body: String::new(),
        };

        let (front_matter, rest) = split_front_matter(contents);
        if let Some(block) = front_matter {
            match toml::from_str::<FrontMatter>(block) {
                Ok(fm) => {
                    extend_unique(&mut entity.keywords, fm.triggers);
                    extend_unique(&mut entity.regex_patterns, fm.regex_triggers);
                    extend_unique(&mut entity.concepts, fm.semantic_triggers);
                }
                Err(e) => {
                    warn!(path = ?path, error = %e, "entity_front_matter_invalid");
                }
            }
        }

        let mut body_lines = Vec::new();
        for line in rest.lines() {
            match Marker::parse_line(line) {
                Some((Marker::Keywords, list)) => {
                    extend_unique(&mut entity.keywords, split_list(list));
                }
                Some((Marker::Regex, list)) => {
                    extend_unique(&mut entity.regex_patterns, split_patterns(list));
                }
                Some((Marker::Semantic, list)) => {
                    extend_unique(&mut entity.concepts, split_list(list));
                }
                None => body_lines.push(line),
            }
        }
        entity.body = body_lines.join("\n").trim().to_string();

        entity
    }

    /// Whether the file declares any trigger at all.
    pub fn has_triggers(&self) -> bool {
        !self.keywords.is_empty() || !self.regex_patterns.is_empty() || !self.concepts.is_empty()
    }
}

/// Split a leading `+++` fenced block from the rest of the file.
fn split_front_matter(contents: &str) -> (Option<&str>, &str) {
    let trimmed = contents.trim_start_matches('\u{feff}');
    let Some(after_open) = trimmed.strip_prefix(FRONT_MATTER_FENCE) else {
        return (None, contents);
    };
    let Some(after_open) = after_open
        .strip_prefix("\r\n")
        .or_else(|| after_open.strip_prefix('\n'))
    else {
        return (None, contents);
    };

    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end() == FRONT_MATTER_FENCE {
            let block = &after_open[..offset];
            let rest = &after_open[offset + line.len()..];
            return (Some(block), rest);
        }
        offset += line.len();
    }

    // Unterminated fence: treat the whole file as body.
    (None, contents)
}

/// Split a comma-separated keyword or phrase list.
fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a comma-separated regex list. Commas inside `()`, `[]`, `{}` or after
/// a backslash belong to the pattern.
fn split_patterns(list: &str) -> Vec<String> {
    let mut patterns = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_class = false;
    let mut escaped = false;

    for c in list.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                current.push(c);
            }
            '[' if !in_class => {
                in_class = true;
                current.push(c);
            }
            ']' if in_class => {
                in_class = false;
                current.push(c);
            }
            '(' | '{' if !in_class => {
                depth += 1;
                current.push(c);
            }
            ')' | '}' if !in_class => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 && !in_class => {
                patterns.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    patterns.push(current);

    patterns
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn extend_unique(target: &mut Vec<String>, items: impl IntoIterator<Item = String>) {
    for item in items {
        let item = item.trim().to_string();
        if !item.is_empty() && !target.contains(&item) {
            target.push(item);
        }
    }
}

/// Cache key for deciding whether a file needs re-parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

#[derive(Debug)]
struct CachedEntity {
    fingerprint: Fingerprint,
    entity: EntityFile,
}

/// Counts from one `EntityStore::refresh` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub parsed: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub skipped: usize,
}

/// Parsed entity files for a set of directories, re-parsed only when a file changes.
#[derive(Debug, Default)]
pub struct EntityStore {
    dirs: Vec<PathBuf>,
    entries: BTreeMap<PathBuf, CachedEntity>,
}

impl EntityStore {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self {
            dirs,
            entries: BTreeMap::new(),
        }
    }

    /// Rescan the entity directories. Unreadable files and missing
    /// directories are skipped.
    pub fn refresh(&mut self) -> RefreshSummary {
        let mut summary = RefreshSummary::default();
        let mut seen = Vec::new();

        for dir in &self.dirs {
            for path in markdown_files(dir) {
                let fingerprint = match std::fs::metadata(&path) {
                    Ok(m) => Fingerprint {
                        modified: m.modified().ok(),
                        len: m.len(),
                    },
                    Err(e) => {
                        warn!(path = ?path, error = %e, "entity_metadata_failed");
                        summary.skipped += 1;
                        continue;
                    }
                };

                if let Some(cached) = self.entries.get(&path)
                    && cached.fingerprint == fingerprint
                {
                    summary.unchanged += 1;
                    seen.push(path);
                    continue;
                }

                match EntityFile::load(&path) {
                    Ok(entity) => {
                        debug!(
                            entity = %entity.name,
                            keywords = entity.keywords.len(),
                            patterns = entity.regex_patterns.len(),
                            concepts = entity.concepts.len(),
                            "entity_parsed"
                        );
                        self.entries.insert(
                            path.clone(),
                            CachedEntity {
                                fingerprint,
                                entity,
                            },
                        );
                        summary.parsed += 1;
                        seen.push(path);
                    }
                    Err(e) => {
                        warn!(path = ?path, error = %e, "entity_read_failed");
                        self.entries.remove(&path);
                        summary.skipped += 1;
                    }
                }
            }
        }

        let before = self.entries.len();
        self.entries.retain(|path, _| seen.contains(path));
        summary.removed = before - self.entries.len();

        summary
    }

    /// Entities in path order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityFile> {
        self.entries.values().map(|c| &c.entity)
    }

    /// Look up an entity by name (first in path order).
    pub fn get(&self, name: &str) -> Option<&EntityFile> {
        self.entities().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `*.md` files directly inside `dir`, sorted by path. A missing directory yields nothing.
pub fn markdown_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = ?dir, error = %e, "markdown_dir_unreadable");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "md"))
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn parse(contents: &str) -> EntityFile {
        EntityFile::parse(Path::new("characters/marcus.md"), contents)
    }

    // Bracket marker parsing

    #[test]
    fn test_parse_bracket_markers() {
        let entity = parse(
            "# Marcus\n[Triggers:Marcus, Marc ,]\n[RegexTriggers:\\bMarcus'?s?\\b]\n[SemanticTriggers:old mercenary, sellsword]\nA scarred veteran.",
        );
        assert_eq!(entity.name, "marcus");
        assert_eq!(entity.keywords, vec!["Marcus", "Marc"]);
        assert_eq!(entity.regex_patterns, vec![r"\bMarcus'?s?\b"]);
        assert_eq!(entity.concepts, vec!["old mercenary", "sellsword"]);
        assert_eq!(entity.body, "# Marcus\nA scarred veteran.");
        assert!(entity.has_triggers());
    }

    #[test]
    fn test_parse_no_triggers() {
        let entity = parse("# Nobody\nJust prose.");
        assert!(!entity.has_triggers());
        assert_eq!(entity.body, "# Nobody\nJust prose.");
    }

    #[test]
    fn test_unknown_marker_stays_in_body() {
        let entity = parse("[Mood:grim]\n[Triggers:Marcus]");
        assert_eq!(entity.keywords, vec!["Marcus"]);
        assert_eq!(entity.body, "[Mood:grim]");
    }

    #[test]
    fn test_regex_list_respects_groups_and_quantifiers() {
        let entity = parse(r"[RegexTriggers:\b(Marc|Mark)\b, x{1,2}y, [a,b]z, a\,b]");
        assert_eq!(
            entity.regex_patterns,
            vec![r"\b(Marc|Mark)\b", "x{1,2}y", "[a,b]z", r"a\,b"]
        );
    }

    // Front matter parsing

    #[test]
    fn test_parse_front_matter() {
        let entity = parse(
            "+++\ntriggers = [\"Marcus\"]\nregex_triggers = ['\\bMarc(us)?\\b']\n+++\n# Marcus\n[Triggers:Marcus,Marco]\n",
        );
        assert_eq!(entity.keywords, vec!["Marcus", "Marco"]);
        assert_eq!(entity.regex_patterns, vec![r"\bMarc(us)?\b"]);
        assert!(entity.concepts.is_empty());
        assert_eq!(entity.body, "# Marcus");
    }

    #[test]
    fn test_invalid_front_matter_is_ignored() {
        let entity = parse("+++\ntriggers = [\n+++\n[Triggers:Marcus]\n");
        assert_eq!(entity.keywords, vec!["Marcus"]);
    }

    #[test]
    fn test_unterminated_front_matter_is_body() {
        let entity = parse("+++\ntriggers = [\"A\"]\n[Triggers:B]");
        assert_eq!(entity.keywords, vec!["B"]);
    }

    // EntityStore

    #[test]
    fn test_store_loads_only_markdown() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sarah.md"), "[Triggers:Sarah]").unwrap();
        fs::write(dir.path().join("notes.txt"), "[Triggers:Nope]").unwrap();

        let mut store = EntityStore::new(vec![dir.path().to_path_buf()]);
        let summary = store.refresh();

        assert_eq!(summary.parsed, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("sarah").unwrap().keywords, vec!["Sarah"]);
    }

    #[test]
    fn test_store_reparses_only_changed_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sarah.md");
        fs::write(&path, "[Triggers:Sarah]").unwrap();
        fs::write(dir.path().join("tom.md"), "[Triggers:Tom]").unwrap();

        let mut store = EntityStore::new(vec![dir.path().to_path_buf()]);
        store.refresh();

        fs::write(&path, "[Triggers:Sarah,Sally]").unwrap();
        let summary = store.refresh();

        assert_eq!(summary.parsed, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(store.get("sarah").unwrap().keywords, vec!["Sarah", "Sally"]);
    }

    #[test]
    fn test_store_drops_deleted_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sarah.md");
        fs::write(&path, "[Triggers:Sarah]").unwrap();

        let mut store = EntityStore::new(vec![dir.path().to_path_buf()]);
        store.refresh();
        fs::remove_file(&path).unwrap();
        let summary = store.refresh();

        assert_eq!(summary.removed, 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_skips_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sarah.md"), "[Triggers:Sarah]").unwrap();
        fs::write(dir.path().join("tom.md"), [0xff, 0xfe, 0xfd]).unwrap();

        let mut store = EntityStore::new(vec![dir.path().to_path_buf()]);
        let summary = store.refresh();

        assert_eq!(summary.parsed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("tom").is_none());
        assert_eq!(store.get("sarah").unwrap().keywords, vec!["Sarah"]);
    }

    #[test]
    fn test_store_drops_cached_file_that_becomes_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let tom = dir.path().join("tom.md");
        fs::write(dir.path().join("sarah.md"), "[Triggers:Sarah]").unwrap();
        fs::write(&tom, "[Triggers:Tom]").unwrap();

        let mut store = EntityStore::new(vec![dir.path().to_path_buf()]);
        store.refresh();
        assert!(store.get("tom").is_some());

        fs::write(&tom, [0xff, 0xfe, 0xfd]).unwrap();
        let summary = store.refresh();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.unchanged, 1);
        assert!(store.get("tom").is_none());
        assert!(store.get("sarah").is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = EntityStore::new(vec![dir.path().join("missing")]);
        assert_eq!(store.refresh(), RefreshSummary::default());
        assert!(store.is_empty());
    }
}
