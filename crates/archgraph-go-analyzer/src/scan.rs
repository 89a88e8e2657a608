//! Module discovery: `go.mod` and the package directories under it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::AnalyzerError;

const SKIPPED_DIRS: &[&str] = &["vendor", "testdata", "node_modules"];

/// Module path declared in `<root>/go.mod`.
pub fn read_module_path(root: &Path) -> Result<String, AnalyzerError> {
    let manifest = root.join("go.mod");
    if !manifest.is_file() {
        return Err(AnalyzerError::MissingModule(root.to_path_buf()));
    }
    let content = fs::read_to_string(&manifest).map_err(|e| AnalyzerError::io(&manifest, e))?;
    parse_module_directive(&content).ok_or(AnalyzerError::NoModulePath(manifest))
}

fn parse_module_directive(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or_default().trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let path = rest.trim().trim_matches('"');
        (!path.is_empty()).then(|| path.to_string())
    })
}

/// Import path of the package in `dir` (module-relative, `.` for the root).
pub fn package_path(module: &str, dir: &str) -> String {
    if dir == "." {
        module.to_string()
    } else {
        format!("{}/{}", module, dir)
    }
}

/// `/`-separated path of `path` relative to `root`.
pub fn relative_slash_path(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.')
        || name.starts_with('_')
        || SKIPPED_DIRS.contains(&name.as_ref())
        // nested module
        || entry.path().join("go.mod").is_file()
}

fn is_package_source(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    entry.file_type().is_file() && name.ends_with(".go") && !name.ends_with("_test.go")
}

/// Non-test `.go` files grouped by module-relative directory, both sorted.
pub fn collect_packages(root: &Path) -> Result<BTreeMap<String, Vec<PathBuf>>, AnalyzerError> {
    let mut packages: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e));

    for entry in walker {
        let entry = entry.map_err(|source| AnalyzerError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if !is_package_source(&entry) {
            continue;
        }
        let dir = entry
            .path()
            .parent()
            .map(|p| relative_slash_path(p, root))
            .unwrap_or_else(|| ".".to_string());
        packages.entry(dir).or_default().push(entry.into_path());
    }

    debug!(root = %root.display(), packages = packages.len(), "Collected Go packages");
    Ok(packages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "package x\n").unwrap();
    }

    #[test]
    fn test_module_directive() {
        assert_eq!(
            parse_module_directive("// header\nmodule example.com/shop // trailing\n\ngo 1.22\n"),
            Some("example.com/shop".to_string())
        );
        assert_eq!(
            parse_module_directive("module \"example.com/quoted\"\n"),
            Some("example.com/quoted".to_string())
        );
        assert_eq!(parse_module_directive("modulex foo\ngo 1.21\n"), None);
    }

    #[test]
    fn test_missing_go_mod() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            read_module_path(tmp.path()),
            Err(AnalyzerError::MissingModule(_))
        ));
    }

    #[test]
    fn test_collect_skips_tests_vendor_and_hidden() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "main.go");
        touch(root, "main_test.go");
        touch(root, "internal/orders/handler.go");
        touch(root, "internal/orders/routes.go");
        touch(root, "internal/orders/testdata/fixture.go");
        touch(root, "vendor/github.com/x/y.go");
        touch(root, ".git/hooks/z.go");
        touch(root, "tools/go.mod");
        touch(root, "tools/gen.go");
        touch(root, "README.md");

        let packages = collect_packages(root).unwrap();
        let dirs: Vec<&str> = packages.keys().map(String::as_str).collect();
        assert_eq!(dirs, vec![".", "internal/orders"]);

        let files: Vec<String> = packages["internal/orders"]
            .iter()
            .map(|p| relative_slash_path(p, root))
            .collect();
        assert_eq!(files, vec!["internal/orders/handler.go", "internal/orders/routes.go"]);
    }

    #[test]
    fn test_package_path() {
        assert_eq!(package_path("example.com/shop", "."), "example.com/shop");
        assert_eq!(
            package_path("example.com/shop", "internal/orders"),
            "example.com/shop/internal/orders"
        );
    }
}
