//! Configuration management for archgraph.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `archgraph.toml` file
//! 3. User config `~/.config/archgraph/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File discovery configuration.
    pub discovery: DiscoveryConfig,

    /// TypeScript/JavaScript engine configuration.
    pub typescript: TypeScriptConfig,

    /// Go toolchain configuration.
    pub go: GoConfig,

    /// Storage configuration.
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./archgraph.toml` (project local)
    /// 2. `~/.config/archgraph/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_for(Path::new("."))
    }

    /// Load configuration for a specific project directory.
    pub fn load_for(project_root: &Path) -> Result<Self, ConfigError> {
        let local = project_root.join(PROJECT_CONFIG_FILE);
        if local.exists() {
            return Self::from_file(&local);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("archgraph").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(size) = std::env::var("ARCHGRAPH_MAX_FILE_SIZE") {
            if let Ok(n) = size.parse() {
                self.discovery.max_file_size = n;
            }
        }

        if let Ok(strategy) = std::env::var("ARCHGRAPH_TS_STRATEGY") {
            self.typescript.strategy = strategy;
        }

        if let Ok(binary) = std::env::var(GO_ANALYZER_ENV) {
            self.go.analyzer_binary = Some(PathBuf::from(binary));
        }
        if let Ok(dir) = std::env::var("ARCHGRAPH_GO_ANALYZER_SOURCE") {
            self.go.analyzer_source = Some(PathBuf::from(dir));
        }
        if let Ok(secs) = std::env::var("ARCHGRAPH_GO_TIMEOUT") {
            if let Ok(n) = secs.parse() {
                self.go.timeout_secs = n;
            }
        }

        if let Ok(dir) = std::env::var("ARCHGRAPH_DATA_DIR") {
            self.storage.data_dir = dir;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.go.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "go.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if ScriptStrategyKind::parse(&self.typescript.strategy).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown typescript.strategy '{}' (expected 'heuristic' or 'syntax-tree')",
                self.typescript.strategy
            )));
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// File discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Maximum size of a single source file (in bytes).
    pub max_file_size: u64,

    /// Directories to exclude from scanning.
    pub exclude_dirs: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DiscoveryConfig {
    /// Whether a directory name is excluded.
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.exclude_dirs.iter().any(|d| d == name)
    }
}

/// Which TypeScript analysis strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStrategyKind {
    Heuristic,
    SyntaxTree,
}

impl ScriptStrategyKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "heuristic" | "regex" => Some(Self::Heuristic),
            "syntax-tree" | "syntax_tree" | "ast" => Some(Self::SyntaxTree),
            _ => None,
        }
    }
}

/// TypeScript/JavaScript engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeScriptConfig {
    /// `heuristic` or `syntax-tree`.
    pub strategy: String,
}

impl Default for TypeScriptConfig {
    fn default() -> Self {
        Self {
            strategy: DEFAULT_SCRIPT_STRATEGY.to_string(),
        }
    }
}

impl TypeScriptConfig {
    pub fn strategy_kind(&self) -> ScriptStrategyKind {
        ScriptStrategyKind::parse(&self.strategy).unwrap_or(ScriptStrategyKind::SyntaxTree)
    }
}

/// Go toolchain configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoConfig {
    /// Explicit path to a pre-built analyzer binary.
    pub analyzer_binary: Option<PathBuf>,

    /// Analyzer crate directory used for the `cargo run` fallback.
    pub analyzer_source: Option<PathBuf>,

    /// Seconds before the analyzer is killed.
    pub timeout_secs: u64,
}

impl Default for GoConfig {
    fn default() -> Self {
        Self {
            analyzer_binary: None,
            analyzer_source: None,
            timeout_secs: DEFAULT_GO_TIMEOUT_SECS,
        }
    }
}

impl GoConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory for archgraph data (default: ".archgraph").
    pub data_dir: String,

    /// Project records subdirectory name.
    pub projects_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_DATA_DIR.to_string(),
            projects_dir: DEFAULT_PROJECTS_DIR.to_string(),
        }
    }
}

impl StorageConfig {
    /// Get the full path to the project records directory.
    pub fn projects_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.projects_dir)
    }
}
