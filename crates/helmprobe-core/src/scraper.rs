//! Best-effort extraction of `.Values` references from template sources
//!
//! This is a regex heuristic, not a template parser. Parentheses are stripped
//! before matching so `(((.Values.a).b).c)` reads as `.Values.a.b.c`.
//!
//! Known limitations:
//! - variables assigned from `.Values...` are not followed
//! - helpers receiving a `.Values` subtree are not followed into the helper body
//! - `with`/`range` blocks that rebind `.` to a `.Values` subtree are not expanded

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

static VALUES_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.Values\.([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)")
        .expect("valid regex")
});

const TEMPLATE_EXTENSIONS: &[&str] = &["yaml", "yml", "tpl"];

/// Collect every dotted value path referenced by the templates under `templates_dir`
///
/// A missing directory yields an empty set. A directory that cannot be fully
/// traversed fails with [`CoreError::ReadTemplates`].
pub fn scan(templates_dir: impl AsRef<Path>) -> Result<BTreeSet<String>> {
    let templates_dir = templates_dir.as_ref();
    let mut paths = BTreeSet::new();

    for file in template_files(templates_dir)? {
        let source = std::fs::read_to_string(&file).map_err(|source| CoreError::ReadFile {
            path: file.clone(),
            source,
        })?;
        let found = scan_source(&source);
        tracing::debug!("{}: {} value reference(s)", file.display(), found.len());
        paths.extend(found);
    }

    Ok(paths)
}

/// Value paths referenced by a single template source
pub fn scan_source(source: &str) -> BTreeSet<String> {
    let flattened: String = source.chars().filter(|c| !matches!(c, '(' | ')')).collect();
    VALUES_REFERENCE
        .captures_iter(&flattened)
        .map(|captures| captures[1].to_string())
        .collect()
}

/// Template sources under `templates_dir`, sorted; symlinks are followed
fn template_files(templates_dir: &Path) -> Result<Vec<PathBuf>> {
    if !templates_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(templates_dir).follow_links(true) {
        let entry = entry.map_err(|e| CoreError::ReadTemplates {
            path: e.path().unwrap_or(templates_dir).to_path_buf(),
            source: e.into(),
        })?;

        let path = entry.path();
        let is_template = path
            .extension()
            .map(|ext| TEMPLATE_EXTENSIONS.contains(&ext.to_string_lossy().as_ref()))
            .unwrap_or(false);
        if entry.file_type().is_file() && is_template {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}
