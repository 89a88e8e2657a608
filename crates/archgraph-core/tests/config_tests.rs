use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use archgraph_core::config::{
    ScriptStrategyKind, DEFAULT_GO_TIMEOUT_SECS, DEFAULT_MAX_FILE_SIZE, PROJECT_CONFIG_FILE,
};
use archgraph_core::{Config, ConfigError};
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.discovery.max_file_size, DEFAULT_MAX_FILE_SIZE);
    assert_eq!(config.go.timeout_secs, DEFAULT_GO_TIMEOUT_SECS);
    assert!(config.go.analyzer_binary.is_none());
    assert!(config.discovery.is_excluded_dir("dist"));
}

#[test]
fn test_config_to_toml() {
    let config = Config::default();
    let toml_str = toml::to_string_pretty(&config).unwrap();
    assert!(toml_str.contains("[discovery]"));
    assert!(toml_str.contains("[typescript]"));
    assert!(toml_str.contains("[go]"));
    assert!(toml_str.contains("[storage]"));
}

#[test]
fn test_config_from_toml() {
    let toml_str = r#"
[discovery]
max_file_size = 200000
exclude_dirs = ["generated"]

[typescript]
strategy = "heuristic"

[go]
analyzer_binary = "/opt/bin/archgraph-go-analyzer"
timeout_secs = 30
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.discovery.max_file_size, 200000);
    assert!(config.discovery.is_excluded_dir("generated"));
    assert!(!config.discovery.is_excluded_dir("node_modules"));
    assert_eq!(
        config.typescript.strategy_kind(),
        ScriptStrategyKind::Heuristic
    );
    assert_eq!(
        config.go.analyzer_binary,
        Some(PathBuf::from("/opt/bin/archgraph-go-analyzer"))
    );
    assert_eq!(config.go.timeout(), Duration::from_secs(30));
}

#[test]
fn test_project_file_is_loaded() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join(PROJECT_CONFIG_FILE),
        "[typescript]\nstrategy = \"regex\"\n",
    )
    .unwrap();

    let config = Config::load_for(temp.path()).unwrap();
    assert_eq!(
        config.typescript.strategy_kind(),
        ScriptStrategyKind::Heuristic
    );
}

#[test]
fn test_invalid_values_are_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(PROJECT_CONFIG_FILE);

    fs::write(&path, "[typescript]\nstrategy = \"magic\"\n").unwrap();
    assert!(matches!(
        Config::from_file(&path),
        Err(ConfigError::Invalid(_))
    ));

    fs::write(&path, "[go]\ntimeout_secs = 0\n").unwrap();
    assert!(matches!(
        Config::from_file(&path),
        Err(ConfigError::Invalid(_))
    ));

    fs::write(&path, "[go\n").unwrap();
    assert!(matches!(
        Config::from_file(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_environment_overrides_data_dir() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(PROJECT_CONFIG_FILE);
    fs::write(&path, "[storage]\ndata_dir = \".from-file\"\n").unwrap();

    std::env::set_var("ARCHGRAPH_DATA_DIR", "/var/lib/archgraph");
    let config = Config::from_file(&path).unwrap();
    std::env::remove_var("ARCHGRAPH_DATA_DIR");

    assert_eq!(config.storage.data_dir, "/var/lib/archgraph");
    assert_eq!(
        config.storage.projects_path(),
        PathBuf::from("/var/lib/archgraph/projects")
    );
}
