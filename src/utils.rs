//! Utility functions for file naming and path manipulation

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Longest file stem written to disk, in characters
const MAX_STEM_CHARS: usize = 200;

/// Turn a release name into a safe file stem
///
/// Path separators, control characters and characters reserved on common
/// filesystems become `_`; leading dots are removed so the result is never
/// hidden, and the stem is capped at a fixed length.
///
/// # Examples
///
/// ```
/// use usenet_indexer::utils::sanitize_file_stem;
///
/// assert_eq!(sanitize_file_stem("Show/S01E01: \"Pilot\""), "Show_S01E01_ _Pilot_");
/// assert_eq!(sanitize_file_stem("..hidden"), "hidden");
/// assert_eq!(sanitize_file_stem(""), "release");
/// ```
#[must_use]
pub fn sanitize_file_stem(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(MAX_STEM_CHARS)
        .collect();

    let trimmed = cleaned.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        "release".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Get a path that does not exist yet by adding ` (1)`, ` (2)`, ... to the stem
///
/// # Arguments
///
/// * `path` - The desired file path
///
/// # Returns
///
/// The original path if it is free, otherwise the first free numbered variant.
///
/// # Examples
///
/// ```
/// use usenet_indexer::utils::unique_path;
/// use std::path::Path;
///
/// let path = Path::new("/tmp/usenet-indexer-doc/does-not-exist.nzb");
/// assert_eq!(unique_path(path).unwrap(), path);
/// ```
pub fn unique_path(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Ok(path.to_path_buf());
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Artifact(format!("cannot extract file stem of {}", path.display())))?;
    let extension = path.extension().and_then(|e| e.to_str());
    let parent = path.parent().ok_or_else(|| {
        Error::Artifact(format!("cannot extract parent directory of {}", path.display()))
    })?;

    // Try adding (1), (2), (3), ... until we find a unique name
    for i in 1..=MAX_RENAME_ATTEMPTS {
        let new_name = match extension {
            Some(ext) => format!("{} ({}).{}", stem, i, ext),
            None => format!("{} ({})", stem, i),
        };
        let new_path = parent.join(new_name);
        if !new_path.exists() {
            return Ok(new_path);
        }
    }

    Err(Error::Artifact(format!(
        "could not find a free name for {} after {} attempts",
        path.display(),
        MAX_RENAME_ATTEMPTS
    )))
}
