//! Configuration loading, validation, and management for Vea.
//!
//! Loads configuration from `~/.vea/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vea_core::{Budget, KindCaps};

/// The root configuration structure.
///
/// Maps directly to `~/.vea/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// IANA timezone provider timestamps are converted into
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Token that marks a journal line as a directive
    #[serde(default = "default_trigger")]
    pub trigger: String,

    /// Where raw records come from
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Text normalization settings
    #[serde(default)]
    pub normalize: NormalizeConfig,

    /// Relevance ranking and budget
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Directive handling
    #[serde(default)]
    pub directives: DirectivesConfig,

    /// External summarizer
    #[serde(default)]
    pub summarizer: SummarizerConfig,
}

fn default_timezone() -> String {
    "Europe/Amsterdam".into()
}
fn default_trigger() -> String {
    "Vea".into()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Directory of dated journal pages (`YYYY_MM_DD.md`)
    #[serde(default = "default_journal_dir")]
    pub journal_dir: PathBuf,

    /// Directory of free-form notes (`<name>.md`)
    #[serde(default = "default_notes_dir")]
    pub notes_dir: PathBuf,

    /// Directory of provider dumps (`*.jsonl`, one raw record per line)
    #[serde(default = "default_records_dir")]
    pub records_dir: PathBuf,

    /// How many days of journals to load, counting back from the latest
    #[serde(default = "default_journal_days")]
    pub journal_days: u32,

    /// Files larger than this are skipped
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Note names (file stems, case-insensitive) never loaded
    #[serde(default = "default_excluded_notes")]
    pub excluded_notes: Vec<String>,

    /// Your own calendar address; events you declined are left out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub my_email: Option<String>,

    /// Calendar events whose title contains any of these (case-insensitive)
    /// are left out
    #[serde(default)]
    pub event_blacklist: Vec<String>,

    /// Leave out timed events that already started when briefing today
    #[serde(default)]
    pub skip_past_events: bool,
}

fn default_journal_dir() -> PathBuf {
    AppConfig::config_dir().join("wiki").join("journals")
}
fn default_notes_dir() -> PathBuf {
    AppConfig::config_dir().join("wiki").join("pages")
}
fn default_records_dir() -> PathBuf {
    AppConfig::config_dir().join("records")
}
fn default_journal_days() -> u32 {
    21
}
fn default_max_file_bytes() -> u64 {
    100_000
}
fn default_excluded_notes() -> Vec<String> {
    vec!["templates".into(), "file".into(), "file-path".into()]
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            journal_dir: default_journal_dir(),
            notes_dir: default_notes_dir(),
            records_dir: default_records_dir(),
            journal_days: default_journal_days(),
            max_file_bytes: default_max_file_bytes(),
            excluded_notes: default_excluded_notes(),
            my_email: None,
            event_blacklist: Vec::new(),
            skip_past_events: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Urgency/importance marker vocabulary (matched case-insensitively)
    #[serde(default = "default_markers")]
    pub markers: Vec<String>,

    /// E-mail bodies are truncated to this many characters
    #[serde(default = "default_email_body_limit")]
    pub email_body_limit: usize,
}

fn default_markers() -> Vec<String> {
    ["urgent", "important", "asap", "deadline", "blocked", "todo", "waiting"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_email_body_limit() -> usize {
    2000
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            markers: default_markers(),
            email_body_limit: default_email_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Skip scoring and truncation entirely
    #[serde(default)]
    pub full_context: bool,

    #[serde(default)]
    pub caps: KindCaps,

    #[serde(default)]
    pub weights: WeightsConfig,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            full_context: false,
            caps: KindCaps::default(),
            weights: WeightsConfig::default(),
        }
    }
}

/// Score increments used by the relevance ranker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightsConfig {
    /// Timestamp inside the task window
    #[serde(default = "default_containment")]
    pub containment: f32,

    /// Timestamp outside the window, divided by (1 + distance in days)
    #[serde(default = "default_proximity")]
    pub proximity: f32,

    /// Any marker tag present
    #[serde(default = "default_marker")]
    pub marker: f32,

    /// Per distinct shared term
    #[serde(default = "default_overlap_per_term")]
    pub overlap_per_term: f32,

    /// Maximum lexical overlap contribution
    #[serde(default = "default_overlap_cap")]
    pub overlap_cap: f32,
}

fn default_containment() -> f32 {
    10.0
}
fn default_proximity() -> f32 {
    5.0
}
fn default_marker() -> f32 {
    3.0
}
fn default_overlap_per_term() -> f32 {
    1.0
}
fn default_overlap_cap() -> f32 {
    5.0
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            containment: default_containment(),
            proximity: default_proximity(),
            marker: default_marker(),
            overlap_per_term: default_overlap_per_term(),
            overlap_cap: default_overlap_cap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectivesConfig {
    /// Remove trigger lines from journals not dated today
    #[serde(default = "default_true")]
    pub strip_stale: bool,
}

impl Default for DirectivesConfig {
    fn default() -> Self {
        Self { strip_stale: true }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// Shell command that reads the context document JSON on stdin and
    /// writes the brief to stdout. Unset: print the document instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.vea/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `VEA_TIMEZONE`, `VEA_TRIGGER`
    /// - `VEA_FULL_CONTEXT` (`1`/`true`/`yes`)
    /// - `VEA_JOURNAL_DIR`, `VEA_NOTES_DIR`, `VEA_RECORDS_DIR`
    /// - `VEA_MY_EMAIL`, `VEA_EVENT_BLACKLIST` (comma-separated, added to
    ///   the configured list)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path`, then apply environment overrides and validate.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in
    /// production, a map in tests).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(tz) = lookup("VEA_TIMEZONE") {
            self.timezone = tz;
        }
        if let Some(trigger) = lookup("VEA_TRIGGER") {
            self.trigger = trigger;
        }
        if let Some(flag) = lookup("VEA_FULL_CONTEXT") {
            self.ranking.full_context =
                matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(dir) = lookup("VEA_JOURNAL_DIR") {
            self.sources.journal_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("VEA_NOTES_DIR") {
            self.sources.notes_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("VEA_RECORDS_DIR") {
            self.sources.records_dir = PathBuf::from(dir);
        }
        if let Some(email) = lookup("VEA_MY_EMAIL") {
            self.sources.my_email = Some(email);
        }
        if let Some(list) = lookup("VEA_EVENT_BLACKLIST") {
            self.sources.event_blacklist.extend(
                list.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(String::from),
            );
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".vea")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tz()?;

        let trigger = self.trigger.trim();
        if trigger.is_empty() || trigger.split_whitespace().count() != 1 {
            return Err(ConfigError::ValidationError(
                "trigger must be a single non-empty token".into(),
            ));
        }

        let w = &self.ranking.weights;
        if [w.containment, w.proximity, w.marker, w.overlap_per_term, w.overlap_cap]
            .iter()
            .any(|v| *v < 0.0)
        {
            return Err(ConfigError::ValidationError(
                "ranking weights must be non-negative".into(),
            ));
        }
        if w.containment <= w.proximity {
            return Err(ConfigError::ValidationError(
                "ranking.weights.containment must be greater than proximity".into(),
            ));
        }

        Ok(())
    }

    /// The configured timezone.
    pub fn tz(&self) -> Result<chrono_tz::Tz, ConfigError> {
        self.timezone.parse::<chrono_tz::Tz>().map_err(|_| {
            ConfigError::ValidationError(format!("unknown timezone '{}'", self.timezone))
        })
    }

    /// The run budget implied by `[ranking]`.
    pub fn budget(&self) -> Budget {
        if self.ranking.full_context {
            Budget::Unbounded
        } else {
            Budget::Ranked(self.ranking.caps)
        }
    }

    /// Generate a default config TOML string (for `vea config --init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            trigger: default_trigger(),
            sources: SourcesConfig::default(),
            normalize: NormalizeConfig::default(),
            ranking: RankingConfig::default(),
            directives: DirectivesConfig::default(),
            summarizer: SummarizerConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for vea_core::Error {
    fn from(err: ConfigError) -> Self {
        vea_core::Error::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.timezone, "Europe/Amsterdam");
        assert_eq!(config.trigger, "Vea");
        assert_eq!(config.sources.journal_days, 21);
        assert!(config.directives.strip_stale);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.timezone, config.timezone);
        assert_eq!(parsed.ranking.caps, config.ranking.caps);
    }

    #[test]
    fn unknown_timezone_rejected() {
        let config = AppConfig {
            timezone: "Mars/Olympus_Mons".into(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn multi_word_trigger_rejected() {
        let config = AppConfig {
            trigger: "hey vea".into(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn containment_must_outrank_proximity() {
        let mut config = AppConfig::default();
        config.ranking.weights.proximity = 20.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("containment"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.trigger, "Vea");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "trigger = \"Jarvis\"\n\n[ranking]\nfull_context = true\n\n[ranking.caps]\nevents = 3\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.trigger, "Jarvis");
        assert_eq!(config.ranking.caps.events, 3);
        assert_eq!(config.ranking.caps.emails, 20);
        assert_eq!(config.budget(), Budget::Unbounded);
    }

    #[test]
    fn event_filters_and_token_ceiling_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[sources]\nmy_email = \"me@example.com\"\nevent_blacklist = [\"Focus time\"]\nskip_past_events = true\n\n[ranking.caps]\ntokens = 8000\ntoken_scope = \"group\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.sources.my_email.as_deref(), Some("me@example.com"));
        assert_eq!(config.sources.event_blacklist, vec!["Focus time"]);
        assert!(config.sources.skip_past_events);
        assert_eq!(config.ranking.caps.tokens, Some(8000));
        assert_eq!(config.ranking.caps.token_scope, vea_core::BudgetScope::Group);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "trigger = [").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn overrides_apply_from_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("VEA_TIMEZONE", "UTC"),
            ("VEA_FULL_CONTEXT", "yes"),
            ("VEA_JOURNAL_DIR", "/tmp/journals"),
            ("VEA_MY_EMAIL", "me@example.com"),
            ("VEA_EVENT_BLACKLIST", "Focus time, ,Gym"),
        ]);
        let mut config = AppConfig::default();
        config.sources.event_blacklist = vec!["Lunch".into()];
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.sources.my_email.as_deref(), Some("me@example.com"));
        assert_eq!(config.sources.event_blacklist, vec!["Lunch", "Focus time", "Gym"]);

        assert_eq!(config.timezone, "UTC");
        assert!(config.ranking.full_context);
        assert_eq!(config.sources.journal_dir, PathBuf::from("/tmp/journals"));
        assert_eq!(config.trigger, "Vea");
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("Europe/Amsterdam"));
        assert!(toml_str.contains("[ranking.weights]"));
    }
}
