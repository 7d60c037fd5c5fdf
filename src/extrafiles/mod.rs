//! Extra-file resolution
//!
//! Resolves configured globs to concrete files for the checksum manifest.
//! Patterns are resolved in declaration order; matches inside one pattern
//! are sorted. A later file with the same base name replaces the earlier
//! entry in place, since manifest lines carry base names only.

use std::path::{Path, PathBuf};

use globset::GlobBuilder;
use walkdir::WalkDir;

use crate::config::ExtraFile;

/// Extra-file resolution errors
#[derive(Debug, thiserror::Error)]
pub enum ExtraFilesError {
    #[error("invalid extra-file glob {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("no files match extra-file glob: {pattern}")]
    NoMatch { pattern: String },

    #[error("failed to walk {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// One resolved file: base name plus the path it was found at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraFileEntry {
    pub name: String,
    pub path: PathBuf,
}

/// Resolve every configured glob, failing on the first pattern with no match
pub fn resolve(globs: &[ExtraFile]) -> Result<Vec<ExtraFileEntry>, ExtraFilesError> {
    let mut entries: Vec<ExtraFileEntry> = Vec::new();

    for extra in globs {
        let pattern = extra.glob.trim_start_matches("./");
        let matched = resolve_pattern(pattern)?;
        if matched.is_empty() {
            return Err(ExtraFilesError::NoMatch {
                pattern: extra.glob.clone(),
            });
        }

        for path in matched {
            let name = match path.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => continue,
            };
            if let Some(existing) = entries.iter_mut().find(|e| e.name == name) {
                tracing::warn!(
                    name = %name,
                    path = %path.display(),
                    "duplicate extra file name, replacing previous entry"
                );
                existing.path = path;
            } else {
                entries.push(ExtraFileEntry { name, path });
            }
        }
    }

    Ok(entries)
}

fn has_meta(text: &str) -> bool {
    text.contains(['*', '?', '[', '{'])
}

/// Directory to walk: the pattern's leading literal components
fn literal_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    for component in Path::new(pattern).components() {
        let text = component.as_os_str().to_string_lossy();
        if has_meta(&text) {
            break;
        }
        prefix.push(component);
    }
    if prefix.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        prefix
    }
}

fn resolve_pattern(pattern: &str) -> Result<Vec<PathBuf>, ExtraFilesError> {
    if !has_meta(pattern) {
        let path = PathBuf::from(pattern);
        if path.is_file() {
            return Ok(vec![path]);
        }
        return Ok(Vec::new());
    }

    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| ExtraFilesError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?
        .compile_matcher();

    let root = literal_prefix(pattern);
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut matched = Vec::new();
    for entry in WalkDir::new(&root) {
        let entry = entry.map_err(|source| ExtraFilesError::Walk {
            root: root.clone(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let candidate = entry.path().strip_prefix("./").unwrap_or(entry.path());
        if matcher.is_match(candidate) {
            matched.push(candidate.to_path_buf());
        }
    }

    matched.sort();
    Ok(matched)
}
