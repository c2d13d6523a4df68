use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a marcut redaction run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Author recorded on tracked insertions and deletions
    #[serde(default = "default_author")]
    pub author: String,

    /// Emit tracked changes; `false` rewrites text in place
    #[serde(default = "default_true")]
    pub track_changes: bool,

    /// Font color forced on inserted tags (hex RGB); empty keeps the source color
    #[serde(default = "default_tag_color")]
    pub tag_color: String,

    #[serde(default)]
    pub consolidate: ConsolidateConfig,

    #[serde(default)]
    pub cluster: ClusterConfig,

    #[serde(default)]
    pub exclusions: ExclusionConfig,

    #[serde(default)]
    pub providers: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidateConfig {
    /// Byte ceiling for organization spans
    #[serde(default = "default_org_max_len")]
    pub org_max_len: usize,

    /// Relaxed ceiling for organization spans anchored by a legal suffix
    #[serde(default = "default_org_relaxed_max_len")]
    pub org_relaxed_max_len: usize,

    /// Lookahead window for `(the "X")` defined terms
    #[serde(default = "default_alias_window")]
    pub alias_window: usize,

    /// Fraction of a line an address must cover to claim the whole line
    #[serde(default = "default_address_dominance")]
    pub address_dominance: f64,

    #[serde(default = "default_true")]
    pub consistency_pass: bool,

    /// Minimum byte length of an entity propagated by the consistency pass
    #[serde(default = "default_consistency_min_len")]
    pub consistency_min_len: usize,

    /// Maximum separator run tolerated between tokens by the fuzzy matcher
    #[serde(default = "default_fuzzy_gap")]
    pub fuzzy_gap: usize,

    /// Words never propagated by the consistency pass
    #[serde(default = "default_stop_words")]
    pub stop_words: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Token-set similarity at or above which a mention joins a cluster
    #[serde(default = "default_cluster_threshold")]
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExclusionConfig {
    /// Optional user exclusion file (one word, phrase or regex per line)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Extra literal exclusions
    #[serde(default)]
    pub words: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Seconds to wait for a provider before treating it as empty
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,

    /// Enable the built-in identifier patterns
    #[serde(default = "default_true")]
    pub builtin_patterns: bool,

    /// Extra `LABEL = "regex"` patterns for the pattern provider
    #[serde(default)]
    pub custom_patterns: Vec<CustomPattern>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomPattern {
    pub label: String,
    pub pattern: String,
    #[serde(default = "default_pattern_confidence")]
    pub confidence: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            author: default_author(),
            track_changes: true,
            tag_color: default_tag_color(),
            consolidate: ConsolidateConfig::default(),
            cluster: ClusterConfig::default(),
            exclusions: ExclusionConfig::default(),
            providers: ProviderConfig::default(),
        }
    }
}

impl Default for ConsolidateConfig {
    fn default() -> Self {
        Self {
            org_max_len: default_org_max_len(),
            org_relaxed_max_len: default_org_relaxed_max_len(),
            alias_window: default_alias_window(),
            address_dominance: default_address_dominance(),
            consistency_pass: true,
            consistency_min_len: default_consistency_min_len(),
            fuzzy_gap: default_fuzzy_gap(),
            stop_words: default_stop_words(),
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            threshold: default_cluster_threshold(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_provider_timeout(),
            builtin_patterns: true,
            custom_patterns: Vec::new(),
        }
    }
}

fn default_author() -> String {
    "Marcut".to_string()
}

fn default_true() -> bool {
    true
}

fn default_tag_color() -> String {
    "FF0000".to_string()
}

fn default_org_max_len() -> usize {
    60
}

fn default_org_relaxed_max_len() -> usize {
    120
}

fn default_alias_window() -> usize {
    48
}

fn default_address_dominance() -> f64 {
    0.6
}

fn default_consistency_min_len() -> usize {
    4
}

fn default_fuzzy_gap() -> usize {
    8
}

fn default_cluster_threshold() -> f64 {
    0.82
}

fn default_provider_timeout() -> u64 {
    300
}

fn default_pattern_confidence() -> f64 {
    0.9
}

fn default_stop_words() -> Vec<String> {
    [
        "the", "and", "for", "with", "from", "that", "this", "inc", "llc", "corp", "ltd",
        "company", "mr", "mrs", "ms", "dr", "esq", "dept",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Config {
    /// Load config from default location or create default if not found
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path();

        if path.exists() {
            Self::load_from(&path)
        } else {
            // Create default config file
            let config = Config::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(&config)?;
            std::fs::write(&path, content)?;
            Ok(config)
        }
    }

    /// Load config from an explicit file
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get config file path
    pub fn config_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("com", "marcut", "marcut") {
            dirs.config_dir().join("config.toml")
        } else {
            PathBuf::from("~/.marcut/config.toml")
        }
    }
}
