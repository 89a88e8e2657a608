//! Identifier derivation and import-specifier resolution for script files.

use std::path::Path;

use crate::parser::contract::KnownIds;
use crate::parser::discovery::{normalize, relative_path};

/// Extensions of script sources, in discovery order.
pub const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

fn strip_script_extension(path: &str) -> &str {
    SCRIPT_EXTENSIONS
        .iter()
        .find_map(|ext| {
            path.strip_suffix(ext)
                .and_then(|rest| rest.strip_suffix('.'))
        })
        .unwrap_or(path)
}

/// Project-relative path without extension, `/`-separated.
pub fn script_identifier(file: &Path, root: &Path) -> Option<String> {
    let relative = relative_path(file, root);
    let id = strip_script_extension(&relative);
    (!id.is_empty()).then(|| id.to_string())
}

/// Resolve an import specifier written in `file` to a known identifier.
///
/// Relative specifiers resolve against the importing file's directory, `@/` and `~/`
/// against `source_root`. Bare package specifiers never resolve.
pub fn resolve_specifier(
    specifier: &str,
    file: &Path,
    root: &Path,
    source_root: &Path,
    known: &KnownIds,
) -> Option<String> {
    let target = if specifier == "." || specifier == ".." || specifier.starts_with("./") || specifier.starts_with("../") {
        file.parent()?.join(specifier)
    } else if let Some(rest) = specifier
        .strip_prefix("@/")
        .or_else(|| specifier.strip_prefix("~/"))
    {
        source_root.join(rest)
    } else {
        return None;
    };

    let relative = relative_path(&normalize(&target), &normalize(root));
    let id = strip_script_extension(relative.trim_end_matches('/'));

    if known.contains(id) {
        return Some(id.to_string());
    }
    let index = if id.is_empty() {
        "index".to_string()
    } else {
        format!("{}/index", id)
    };
    known.contains(&index).then_some(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_strips_extension() {
        let root = Path::new("/p");
        assert_eq!(
            script_identifier(Path::new("/p/src/users/users.service.ts"), root),
            Some("src/users/users.service".to_string())
        );
        assert_eq!(
            script_identifier(Path::new("/p/lib/api.mjs"), root),
            Some("lib/api".to_string())
        );
    }

    #[test]
    fn test_relative_and_alias_resolution() {
        let root = Path::new("/p");
        let src = Path::new("/p/src");
        let known = KnownIds::new(["src/users/users.service", "src/shared/index", "src/config"]);
        let file = Path::new("/p/src/users/users.controller.ts");

        assert_eq!(
            resolve_specifier("./users.service", file, root, src, &known),
            Some("src/users/users.service".to_string())
        );
        assert_eq!(
            resolve_specifier("./users.service.js", file, root, src, &known),
            Some("src/users/users.service".to_string())
        );
        assert_eq!(
            resolve_specifier("../shared", file, root, src, &known),
            Some("src/shared/index".to_string())
        );
        assert_eq!(
            resolve_specifier("@/config", file, root, src, &known),
            Some("src/config".to_string())
        );
        assert_eq!(resolve_specifier("express", file, root, src, &known), None);
        assert_eq!(resolve_specifier("./missing", file, root, src, &known), None);
    }
}
