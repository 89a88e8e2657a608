//! Source file discovery shared by the in-process engines.

use std::fs;
use std::path::{Component, Path, PathBuf};

use ignore::WalkBuilder;
use tracing::debug;

use super::error::AnalysisError;
use crate::config::DiscoveryConfig;

/// Walk `source_root` and collect files accepted by `accept`, sorted by path.
///
/// Hidden files, gitignored paths, excluded directories and files over the size limit
/// are skipped.
pub fn walk_sources(
    source_root: &Path,
    config: &DiscoveryConfig,
    accept: impl Fn(&Path) -> bool,
) -> Result<Vec<PathBuf>, AnalysisError> {
    if !source_root.is_dir() {
        return Err(AnalysisError::Validation(format!(
            "source root {} is not a directory",
            source_root.display()
        )));
    }

    let filter = config.clone();
    let walker = WalkBuilder::new(source_root)
        .hidden(true)
        .git_ignore(true)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            !(is_dir && filter.is_excluded_dir(&entry.file_name().to_string_lossy()))
        })
        .build();

    let mut files = Vec::new();
    for entry in walker.flatten() {
        let path = entry.path();
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        if !accept(path) {
            continue;
        }

        let metadata = fs::metadata(path).map_err(|e| AnalysisError::io(path, e))?;
        if metadata.len() > config.max_file_size {
            debug!(file = %path.display(), size = metadata.len(), "Skipping oversized file");
            continue;
        }

        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

/// Lower-cased file extension, empty when absent.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Path of `file` relative to `root`, with `/` separators.
pub fn relative_path(file: &Path, root: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Lexically normalize `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Whether any directory between `root` and `file` has one of `names`.
pub fn has_dir_component(file: &Path, root: &Path, names: &[&str]) -> bool {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let Some(parent) = relative.parent() else {
        return false;
    };
    parent.components().any(|c| match c {
        Component::Normal(part) => names.iter().any(|n| part == *n),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_walk_skips_excluded_dirs() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src/app")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("src/app/a.ts"), "export {}").unwrap();
        fs::write(root.join("node_modules/pkg/b.ts"), "export {}").unwrap();
        fs::write(root.join("src/readme.md"), "#").unwrap();

        let files = walk_sources(root, &DiscoveryConfig::default(), |p| {
            extension_of(p) == "ts"
        })
        .unwrap();

        assert_eq!(files, vec![root.join("src/app/a.ts")]);
    }

    #[test]
    fn test_walk_honours_configured_exclusions() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("generated")).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("generated/api.ts"), "export {}").unwrap();
        fs::write(root.join("src/main.ts"), "export {}").unwrap();

        let config = DiscoveryConfig {
            exclude_dirs: vec!["generated".to_string()],
            ..DiscoveryConfig::default()
        };
        let files = walk_sources(root, &config, |p| extension_of(p) == "ts").unwrap();

        assert_eq!(files, vec![root.join("src/main.ts")]);
    }

    #[test]
    fn test_walk_skips_oversized_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("big.ts"), "x".repeat(64)).unwrap();
        let config = DiscoveryConfig {
            max_file_size: 16,
            ..DiscoveryConfig::default()
        };

        let files = walk_sources(temp.path(), &config, |_| true).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_relative_and_normalize() {
        let root = Path::new("/work/app");
        assert_eq!(
            relative_path(Path::new("/work/app/src/main.ts"), root),
            "src/main.ts"
        );
        assert_eq!(
            normalize(Path::new("/work/app/src/a/../b/./c")),
            PathBuf::from("/work/app/src/b/c")
        );
        assert!(has_dir_component(
            Path::new("/work/app/src/test/X.java"),
            root,
            &["test"]
        ));
        assert!(!has_dir_component(
            Path::new("/work/app/src/test.java"),
            root,
            &["test"]
        ));
    }
}
