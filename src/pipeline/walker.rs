//! Source file discovery.
//!
//! Walks the given roots honoring .gitignore, keeps `.swift` files, and
//! applies the configured file-name suffix exclusions. Output order is
//! sorted so downstream stages are independent of directory iteration order.

use crate::config::GenerationConfig;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Collect the Swift files to scan under `roots`.
pub fn discover_sources(roots: &[PathBuf], config: &GenerationConfig) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let Some((first, rest)) = roots.split_first() else {
        return paths;
    };

    let mut builder = WalkBuilder::new(first);
    for root in rest {
        builder.add(root);
    }
    builder
        .follow_links(false)
        .git_ignore(true)
        .git_global(false)
        .hidden(true);

    for entry in builder.build().flatten() {
        let path = entry.path();
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        if !is_swift_source(path) {
            continue;
        }
        if !config.should_scan(path) {
            debug!(target: "walker", "excluded by suffix: {}", path.display());
            continue;
        }
        paths.push(path.to_path_buf());
    }

    paths.sort();
    paths
}

fn is_swift_source(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("swift")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, rel: &str) -> PathBuf {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, "// swift\n").unwrap();
        path
    }

    #[test]
    fn finds_only_swift_files() {
        let dir = TempDir::new().unwrap();
        let keep = touch(&dir, "Sources/Session.swift");
        touch(&dir, "Sources/README.md");
        touch(&dir, "Sources/build.log");

        let found = discover_sources(
            &[dir.path().to_path_buf()],
            &GenerationConfig::default(),
        );
        assert_eq!(found, vec![keep]);
    }

    #[test]
    fn suffix_exclusions_apply() {
        let dir = TempDir::new().unwrap();
        let keep = touch(&dir, "Session.swift");
        touch(&dir, "SessionMocks.swift");
        touch(&dir, "SessionTests.swift");

        let found = discover_sources(
            &[dir.path().to_path_buf()],
            &GenerationConfig::default(),
        );
        assert_eq!(found, vec![keep]);
    }

    #[test]
    fn output_is_sorted_across_roots() {
        let dir = TempDir::new().unwrap();
        let b = touch(&dir, "b/Beta.swift");
        let a = touch(&dir, "a/Alpha.swift");

        let found = discover_sources(
            &[dir.path().join("b"), dir.path().join("a")],
            &GenerationConfig::default(),
        );
        assert_eq!(found, vec![a, b]);
    }

    #[test]
    fn empty_roots_yield_nothing() {
        let found = discover_sources(&[], &GenerationConfig::default());
        assert!(found.is_empty());
    }
}
