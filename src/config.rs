use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the per-session override file inside `state/`.
pub const SESSION_CONFIG_FILE: &str = "automation_config.json";

/// Status of config file loading
#[derive(Debug, Clone)]
pub enum ConfigLoadStatus {
    /// Config loaded successfully from existing file
    Loaded,
    /// Created default config file (first run)
    Created,
    /// Error occurred during loading, using defaults.
    Error(String),
}

/// Keyword tier configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordMatchingConfig {
    pub enabled: bool,
    pub case_sensitive: bool,
    pub use_word_boundaries: bool,
}

impl Default for KeywordMatchingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            case_sensitive: false,
            use_word_boundaries: true,
        }
    }
}

/// Regex tier configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegexMatchingConfig {
    pub enabled: bool,
    /// Patterns past this count in a single entity file are ignored.
    pub max_patterns_per_file: usize,
}

impl Default for RegexMatchingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_patterns_per_file: 10,
        }
    }
}

/// Semantic tier configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticMatchingConfig {
    pub enabled: bool,
    /// Embedding model name. Only models the build knows how to load are usable;
    /// anything else disables the tier at session start.
    pub model: String,
    pub similarity_threshold: f64,
}

impl Default for SemanticMatchingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "hashing".to_string(),
            similarity_threshold: 0.7,
        }
    }
}

/// Escalation window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Number of most recent responses kept in the trigger history.
    pub window: usize,
    /// Minimum number of responses in the window a file must be triggered in.
    pub threshold: usize,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            window: 10,
            threshold: 3,
        }
    }
}

/// Tier layout and gating configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TiersConfig {
    /// Periodic tier loads every Nth response. 0 disables the tier.
    pub periodic_interval: u64,
    /// Arc regeneration is signalled every Nth response. 0 disables the signal.
    pub arc_frequency: u64,
    /// Files or directories (relative to the session root) loaded every turn.
    pub always: Vec<String>,
    /// Files or directories loaded on periodic turns.
    pub periodic: Vec<String>,
    /// Directories scanned for entity files.
    pub entity_dirs: Vec<String>,
}

impl Default for TiersConfig {
    fn default() -> Self {
        Self {
            periodic_interval: 4,
            arc_frequency: 50,
            always: vec!["core".to_string()],
            periodic: vec!["guidelines".to_string()],
            entity_dirs: vec!["characters".to_string(), "entities".to_string()],
        }
    }
}

/// Entity card generation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardsConfig {
    /// Mentions needed before an entity card is due.
    pub entity_mention_threshold: u32,
}

impl Default for CardsConfig {
    fn default() -> Self {
        Self {
            entity_mention_threshold: 2,
        }
    }
}

/// State persistence configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Minimum delay between flushes of tracking state to disk.
    pub flush_interval_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: 0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub keyword_matching: KeywordMatchingConfig,
    #[serde(default)]
    pub regex_matching: RegexMatchingConfig,
    #[serde(default)]
    pub semantic_matching: SemanticMatchingConfig,
    #[serde(default)]
    pub escalation: EscalationConfig,
    #[serde(default)]
    pub tiers: TiersConfig,
    #[serde(default)]
    pub cards: CardsConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Expand `~` to home directory in a path string
    pub fn expand_tilde(path: &str) -> PathBuf {
        if let Some(stripped) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(stripped);
        }
        PathBuf::from(path)
    }

    /// Resolve a tier entry against the session root.
    /// Absolute and `~` paths are used as-is.
    pub fn resolve(root: &Path, entry: &str) -> PathBuf {
        let expanded = Self::expand_tilde(entry);
        if expanded.is_absolute() {
            expanded
        } else {
            root.join(expanded)
        }
    }
}

/// Partial keyword configuration for session overrides.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialKeywordMatchingConfig {
    pub enabled: Option<bool>,
    pub case_sensitive: Option<bool>,
    pub use_word_boundaries: Option<bool>,
}

/// Partial regex configuration for session overrides.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialRegexMatchingConfig {
    pub enabled: Option<bool>,
    pub max_patterns_per_file: Option<usize>,
}

/// Partial semantic configuration for session overrides.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialSemanticMatchingConfig {
    pub enabled: Option<bool>,
    pub model: Option<String>,
    pub similarity_threshold: Option<f64>,
}

/// Partial escalation configuration for session overrides.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialEscalationConfig {
    pub window: Option<usize>,
    pub threshold: Option<usize>,
}

/// Partial tier configuration for session overrides.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialTiersConfig {
    pub periodic_interval: Option<u64>,
    pub arc_frequency: Option<u64>,
    pub always: Option<Vec<String>>,
    pub periodic: Option<Vec<String>>,
    pub entity_dirs: Option<Vec<String>>,
}

/// Partial card configuration for session overrides.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialCardsConfig {
    pub entity_mention_threshold: Option<u32>,
}

/// Partial persistence configuration for session overrides.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialPersistenceConfig {
    pub flush_interval_ms: Option<u64>,
}

/// Session-specific configuration where every field is optional.
/// Parsed from `state/automation_config.json`. Fields that are `None` inherit
/// from the global config.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialConfig {
    pub keyword_matching: PartialKeywordMatchingConfig,
    pub regex_matching: PartialRegexMatchingConfig,
    pub semantic_matching: PartialSemanticMatchingConfig,
    pub escalation: PartialEscalationConfig,
    pub tiers: PartialTiersConfig,
    pub cards: PartialCardsConfig,
    pub persistence: PartialPersistenceConfig,
    /// Legacy flat key, folded into `cards` by `normalize`.
    entity_mention_threshold: Option<u32>,
    /// Legacy flat key, folded into `tiers` by `normalize`.
    arc_frequency: Option<u64>,
}

impl PartialConfig {
    /// Fold legacy top-level keys into their sections.
    /// Sectioned values take precedence when both are present.
    pub fn normalize(&mut self) {
        if let Some(threshold) = self.entity_mention_threshold.take() {
            self.cards.entity_mention_threshold.get_or_insert(threshold);
        }
        if let Some(frequency) = self.arc_frequency.take() {
            self.tiers.arc_frequency.get_or_insert(frequency);
        }
    }
}

/// Merge a global config with a session-level partial config.
/// Session values override global values where present.
pub fn merge_config(global: &Config, session: &PartialConfig) -> Config {
    Config {
        keyword_matching: KeywordMatchingConfig {
            enabled: session
                .keyword_matching
                .enabled
                .unwrap_or(global.keyword_matching.enabled),
            case_sensitive: session
                .keyword_matching
                .case_sensitive
                .unwrap_or(global.keyword_matching.case_sensitive),
            use_word_boundaries: session
                .keyword_matching
                .use_word_boundaries
                .unwrap_or(global.keyword_matching.use_word_boundaries),
        },
        regex_matching: RegexMatchingConfig {
            enabled: session
                .regex_matching
                .enabled
                .unwrap_or(global.regex_matching.enabled),
            max_patterns_per_file: session
                .regex_matching
                .max_patterns_per_file
                .unwrap_or(global.regex_matching.max_patterns_per_file),
        },
        semantic_matching: SemanticMatchingConfig {
            enabled: session
                .semantic_matching
                .enabled
                .unwrap_or(global.semantic_matching.enabled),
            model: session
                .semantic_matching
                .model
                .clone()
                .unwrap_or_else(|| global.semantic_matching.model.clone()),
            similarity_threshold: session
                .semantic_matching
                .similarity_threshold
                .unwrap_or(global.semantic_matching.similarity_threshold),
        },
        escalation: EscalationConfig {
            window: session.escalation.window.unwrap_or(global.escalation.window),
            threshold: session
                .escalation
                .threshold
                .unwrap_or(global.escalation.threshold),
        },
        tiers: TiersConfig {
            periodic_interval: session
                .tiers
                .periodic_interval
                .unwrap_or(global.tiers.periodic_interval),
            arc_frequency: session
                .tiers
                .arc_frequency
                .unwrap_or(global.tiers.arc_frequency),
            always: session
                .tiers
                .always
                .clone()
                .unwrap_or_else(|| global.tiers.always.clone()),
            periodic: session
                .tiers
                .periodic
                .clone()
                .unwrap_or_else(|| global.tiers.periodic.clone()),
            entity_dirs: session
                .tiers
                .entity_dirs
                .clone()
                .unwrap_or_else(|| global.tiers.entity_dirs.clone()),
        },
        cards: CardsConfig {
            entity_mention_threshold: session
                .cards
                .entity_mention_threshold
                .unwrap_or(global.cards.entity_mention_threshold),
        },
        persistence: PersistenceConfig {
            flush_interval_ms: session
                .persistence
                .flush_interval_ms
                .unwrap_or(global.persistence.flush_interval_ms),
        },
        logging: global.logging.clone(),
    }
}

/// Loaded configuration with metadata
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub config_path: PathBuf,
    pub session_config_path: Option<PathBuf>,
    pub status: ConfigLoadStatus,
}

/// Get the platform-appropriate config directory
fn get_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("dev", "lorekeeper", "lorekeeper")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the full path to the config file
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Path of the session override file for a session root.
pub fn session_config_path(session_root: &Path) -> PathBuf {
    session_root.join("state").join(SESSION_CONFIG_FILE)
}

/// Load a session config from the given path.
/// Returns Ok(PartialConfig) on success, Err(String) on parse/read failure.
fn load_session_config(path: &Path) -> Result<PartialConfig, String> {
    let contents = fs::read_to_string(path).map_err(|e| {
        warn!(path = ?path, error = %e, "session_config_read_failed");
        format!("Failed to read {}: {}", SESSION_CONFIG_FILE, e)
    })?;

    let mut partial = serde_json::from_str::<PartialConfig>(&contents).map_err(|e| {
        warn!(path = ?path, error = %e, "session_config_parse_failed");
        format!("Invalid {}: {}", SESSION_CONFIG_FILE, e)
    })?;
    partial.normalize();
    Ok(partial)
}

/// Load configuration from the global file, the session override, the
/// environment, and defaults.
pub fn load_config(session_root: Option<&Path>) -> LoadedConfig {
    let (config, config_path, status) = match get_config_path() {
        Some(path) => {
            debug!("Config path: {:?}", path);
            let (config, status) = load_or_create_config(&path);
            (config, path, status)
        }
        None => {
            warn!("Could not determine config directory, using defaults");
            (
                Config::default(),
                PathBuf::from("config.toml"),
                ConfigLoadStatus::Error("Could not determine config directory".to_string()),
            )
        }
    };

    let (config, session_config_path) = layer_session_config(config, session_root);

    LoadedConfig {
        config: apply_env_overrides(config),
        config_path,
        session_config_path,
        status,
    }
}

/// Merge the session override over `global` when the session has one.
/// A broken override is logged and ignored; the global config stays in effect.
pub fn layer_session_config(
    global: Config,
    session_root: Option<&Path>,
) -> (Config, Option<PathBuf>) {
    let Some(root) = session_root else {
        return (global, None);
    };
    let path = session_config_path(root);
    if !path.exists() {
        return (global, None);
    }

    match load_session_config(&path) {
        Ok(partial) => {
            info!(path = ?path, "session_config_loaded");
            (merge_config(&global, &partial), Some(path))
        }
        Err(e) => {
            warn!(path = ?path, error = %e, "session_config_error");
            (global, Some(path))
        }
    }
}

/// Load config from file, or create default if not exists
fn load_or_create_config(config_path: &PathBuf) -> (Config, ConfigLoadStatus) {
    match fs::read_to_string(config_path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(config) => {
                info!("Loaded config from {:?}", config_path);
                (config, ConfigLoadStatus::Loaded)
            }
            Err(e) => {
                warn!(
                    "Config file malformed at {:?}: {}. Using defaults.",
                    config_path, e
                );
                (
                    Config::default(),
                    ConfigLoadStatus::Error(format!("Malformed TOML: {}", e)),
                )
            }
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => create_default_config(config_path),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            warn!(
                "Permission denied reading config at {:?}. Using defaults.",
                config_path
            );
            (
                Config::default(),
                ConfigLoadStatus::Error("Permission denied reading config".to_string()),
            )
        }
        Err(e) => {
            warn!(
                "Error reading config at {:?}: {}. Using defaults.",
                config_path, e
            );
            (
                Config::default(),
                ConfigLoadStatus::Error(format!("Read error: {}", e)),
            )
        }
    }
}

/// Create the default config file
fn create_default_config(config_path: &PathBuf) -> (Config, ConfigLoadStatus) {
    let config = Config::default();

    if let Some(parent) = config_path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!(
            "Could not create config directory {:?}: {}. Continuing without file.",
            parent, e
        );
        return (
            config,
            ConfigLoadStatus::Error(format!("Could not create config directory: {}", e)),
        );
    }

    let toml_content = match toml::to_string_pretty(&config) {
        Ok(s) => s,
        Err(e) => {
            warn!("Could not serialize default config: {}", e);
            return (
                config,
                ConfigLoadStatus::Error(format!("Serialization error: {}", e)),
            );
        }
    };

    match fs::write(config_path, &toml_content) {
        Ok(()) => {
            info!("Created default config at {:?}", config_path);
            (config, ConfigLoadStatus::Created)
        }
        Err(e) => {
            warn!(
                "Could not write default config to {:?}: {}. Continuing without file.",
                config_path, e
            );
            (
                config,
                ConfigLoadStatus::Error(format!("Write error: {}", e)),
            )
        }
    }
}

/// Apply environment variable overrides to config
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(level) = env::var("LOREKEEPER_LOG") {
        debug!("Overriding logging.level from LOREKEEPER_LOG");
        config.logging.level = level;
    }

    if let Ok(flag) = env::var("LOREKEEPER_SEMANTIC") {
        match flag.trim() {
            "1" | "true" | "on" => config.semantic_matching.enabled = true,
            "0" | "false" | "off" => config.semantic_matching.enabled = false,
            other => warn!(value = %other, "semantic_env_override_ignored"),
        }
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_writes_exact_threshold() {
        let toml = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(toml.contains("similarity_threshold = 0.7\n"));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.keyword_matching.enabled);
        assert!(!config.keyword_matching.case_sensitive);
        assert!(config.keyword_matching.use_word_boundaries);
        assert!(config.regex_matching.enabled);
        assert_eq!(config.regex_matching.max_patterns_per_file, 10);
        assert!(!config.semantic_matching.enabled);
        assert!((config.semantic_matching.similarity_threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.escalation.window, 10);
        assert_eq!(config.escalation.threshold, 3);
        assert_eq!(config.tiers.periodic_interval, 4);
        assert_eq!(config.tiers.arc_frequency, 50);
        assert_eq!(config.cards.entity_mention_threshold, 2);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = Config::expand_tilde("~/.config/test");
        assert!(!expanded.to_string_lossy().starts_with('~'));

        let no_tilde = Config::expand_tilde("/absolute/path");
        assert_eq!(no_tilde, PathBuf::from("/absolute/path"));

        let relative = Config::expand_tilde("./relative/path");
        assert_eq!(relative, PathBuf::from("./relative/path"));
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let root = Path::new("/sessions/rp1");
        assert_eq!(
            Config::resolve(root, "characters"),
            PathBuf::from("/sessions/rp1/characters")
        );
        assert_eq!(
            Config::resolve(root, "/shared/core"),
            PathBuf::from("/shared/core")
        );
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
[keyword_matching]
case_sensitive = true

[regex_matching]
max_patterns_per_file = 4

[semantic_matching]
enabled = true
similarity_threshold = 0.55

[logging]
level = "debug"
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.keyword_matching.enabled);
        assert!(config.keyword_matching.case_sensitive);
        assert_eq!(config.regex_matching.max_patterns_per_file, 4);
        assert!(config.semantic_matching.enabled);
        assert_eq!(config.semantic_matching.model, "hashing");
        assert!((config.semantic_matching.similarity_threshold - 0.55).abs() < 1e-6);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let toml_str = r#"
[tiers]
periodic_interval = 6
unknown_key = "should be ignored"

[unknown_section]
foo = "bar"
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.tiers.periodic_interval, 6);
        assert_eq!(config.tiers.arc_frequency, 50);
    }

    #[test]
    fn test_default_config_roundtrips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_config_empty() {
        let partial: PartialConfig = serde_json::from_str("{}").unwrap();
        assert!(partial.keyword_matching.enabled.is_none());
        assert!(partial.regex_matching.max_patterns_per_file.is_none());
        assert!(partial.semantic_matching.model.is_none());
        assert!(partial.tiers.always.is_none());
        assert!(partial.cards.entity_mention_threshold.is_none());
    }

    #[test]
    fn test_partial_config_legacy_flat_keys() {
        let mut partial: PartialConfig = serde_json::from_str(
            r#"{"auto_entity_cards": true, "entity_mention_threshold": 5, "arc_frequency": 25}"#,
        )
        .unwrap();
        partial.normalize();
        assert_eq!(partial.cards.entity_mention_threshold, Some(5));
        assert_eq!(partial.tiers.arc_frequency, Some(25));
    }

    #[test]
    fn test_partial_config_section_beats_legacy_key() {
        let mut partial: PartialConfig = serde_json::from_str(
            r#"{"entity_mention_threshold": 5, "cards": {"entity_mention_threshold": 3}}"#,
        )
        .unwrap();
        partial.normalize();
        assert_eq!(partial.cards.entity_mention_threshold, Some(3));
    }

    #[test]
    fn test_merge_config_no_overrides() {
        let global = Config::default();
        let merged = merge_config(&global, &PartialConfig::default());
        assert_eq!(merged, global);
    }

    #[test]
    fn test_merge_config_partial_overrides() {
        let global = Config::default();
        let partial: PartialConfig = serde_json::from_str(
            r#"{
                "keyword_matching": {"use_word_boundaries": false},
                "semantic_matching": {"enabled": true, "model": "hashing"},
                "tiers": {"entity_dirs": ["npcs"]}
            }"#,
        )
        .unwrap();
        let merged = merge_config(&global, &partial);

        // Overridden fields
        assert!(!merged.keyword_matching.use_word_boundaries);
        assert!(merged.semantic_matching.enabled);
        assert_eq!(merged.tiers.entity_dirs, vec!["npcs".to_string()]);

        // Inherited fields
        assert!(merged.keyword_matching.enabled);
        assert_eq!(merged.tiers.always, global.tiers.always);
        assert_eq!(merged.escalation, global.escalation);
    }

    #[test]
    fn test_layer_session_config_reads_override() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("state")).unwrap();
        fs::write(
            session_config_path(dir.path()),
            r#"{"regex_matching": {"enabled": false}}"#,
        )
        .unwrap();

        let (config, path) = layer_session_config(Config::default(), Some(dir.path()));
        assert!(!config.regex_matching.enabled);
        assert_eq!(path, Some(session_config_path(dir.path())));
    }

    #[test]
    fn test_layer_session_config_malformed_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("state")).unwrap();
        fs::write(session_config_path(dir.path()), "{not json").unwrap();

        let (config, _) = layer_session_config(Config::default(), Some(dir.path()));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_layer_session_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let (config, path) = layer_session_config(Config::default(), Some(dir.path()));
        assert_eq!(config, Config::default());
        assert!(path.is_none());
    }

    #[test]
    fn test_load_or_create_config_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let (config, status) = load_or_create_config(&path);
        assert!(matches!(status, ConfigLoadStatus::Created));
        assert_eq!(config, Config::default());
        assert!(path.exists());

        let (_, status) = load_or_create_config(&path);
        assert!(matches!(status, ConfigLoadStatus::Loaded));
    }

    #[test]
    fn test_load_or_create_config_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[keyword_matching\nenabled = ").unwrap();

        let (config, status) = load_or_create_config(&path);
        assert!(matches!(status, ConfigLoadStatus::Error(_)));
        assert_eq!(config, Config::default());
    }
}
