//! Default values for archgraph configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Discovery Defaults
// ============================================================================

/// Files larger than this are skipped during discovery (1 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Directories never descended into, for every ecosystem.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    // Version control
    ".git",
    ".svn",
    ".hg",
    // Dependencies
    "node_modules",
    "vendor",
    "bower_components",
    // Build outputs
    "target",
    "build",
    "dist",
    "out",
    "bin",
    "obj",
    ".gradle",
    ".mvn",
    // IDE/Editor
    ".idea",
    ".vscode",
    // Framework caches
    "coverage",
    ".nyc_output",
    ".next",
    ".nuxt",
    ".cache",
    ".turbo",
];

// ============================================================================
// Ecosystem Defaults
// ============================================================================

/// Conventional Java source root, relative to the project root.
pub const JAVA_SOURCE_ROOT: &str = "src/main/java";

/// Conventional TypeScript/JavaScript source root, relative to the project root.
pub const SCRIPT_SOURCE_ROOT: &str = "src";

/// Default TypeScript analysis strategy.
pub const DEFAULT_SCRIPT_STRATEGY: &str = "syntax-tree";

// ============================================================================
// Go Toolchain Defaults
// ============================================================================

/// Name of the Go analysis toolchain binary.
pub const GO_ANALYZER_BINARY: &str = "archgraph-go-analyzer";

/// Environment variable pointing at a toolchain binary.
pub const GO_ANALYZER_ENV: &str = "ARCHGRAPH_GO_ANALYZER";

/// Default toolchain timeout in seconds.
pub const DEFAULT_GO_TIMEOUT_SECS: u64 = 120;

// ============================================================================
// Storage Defaults
// ============================================================================

/// Default data directory.
pub const DEFAULT_DATA_DIR: &str = ".archgraph";

/// Subdirectory holding project records.
pub const DEFAULT_PROJECTS_DIR: &str = "projects";

/// Project-local config file name.
pub const PROJECT_CONFIG_FILE: &str = "archgraph.toml";
