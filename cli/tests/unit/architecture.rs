//! Structural tests for architectural boundary enforcement.
//!
//! These tests scan source files to verify that the layer boundaries hold:
//! domain is pure, application depends only on domain.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Non-comment lines of a file, so doc references do not count as imports.
fn code_lines(path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .filter(|l| {
            let trimmed = l.trim();
            !trimmed.starts_with("//") && !trimmed.starts_with("/*") && !trimmed.starts_with('*')
        })
        .map(String::from)
        .collect()
}

fn layer(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src").join(name)
}

/// Every `(file, line)` in `layer` that mentions one of `forbidden`.
fn violations(layer_name: &str, forbidden: &[&str]) -> Vec<String> {
    let files = collect_rs_files(&layer(layer_name));
    assert!(!files.is_empty(), "no sources found for layer {layer_name}");
    files
        .iter()
        .flat_map(|file| {
            code_lines(file)
                .into_iter()
                .filter(|line| forbidden.iter().any(|f| line.contains(f)))
                .map(move |line| format!("{}: {}", file.display(), line.trim()))
        })
        .collect()
}

#[test]
fn test_domain_has_no_io_or_outer_layer_imports() {
    let found = violations(
        "domain",
        &[
            "crate::infra",
            "crate::application",
            "crate::commands",
            "crate::output",
            "tokio",
            "std::fs",
            "std::process",
        ],
    );
    assert!(found.is_empty(), "domain layer violations:\n{}", found.join("\n"));
}

#[test]
fn test_application_does_not_import_infra_or_presentation() {
    let found = violations(
        "application",
        &["crate::infra", "crate::commands", "crate::output", "crate::app::"],
    );
    assert!(found.is_empty(), "application layer violations:\n{}", found.join("\n"));
}

#[test]
fn test_infra_does_not_import_presentation() {
    let found = violations("infra", &["crate::commands", "crate::output", "crate::app::"]);
    assert!(found.is_empty(), "infra layer violations:\n{}", found.join("\n"));
}
