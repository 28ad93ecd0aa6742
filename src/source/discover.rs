//! Input discovery: expand paths and file-name globs into an ordered file list

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Whether an input contains glob metacharacters
pub fn is_glob(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

/// Expand inputs into a de-duplicated, ordered list of paths
///
/// Plain paths are passed through untouched (a missing file surfaces later as
/// a per-file read error). Globs may use `*`, `?` and `[...]` in the final
/// path component; their matches are sorted by name.
pub fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut paths = Vec::new();

    for input in inputs {
        let matched = if is_glob(input) {
            expand_glob(input)?
        } else {
            vec![PathBuf::from(input)]
        };

        for path in matched {
            if seen.insert(path.clone()) {
                paths.push(path);
            }
        }
    }

    Ok(paths)
}

fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(pattern);
    let file_pattern = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| Error::config(format!("Invalid input pattern: {pattern}")))?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if is_glob(&dir.to_string_lossy()) {
        return Err(Error::config(format!(
            "Wildcards are only supported in the file name: {pattern}"
        )));
    }

    let entries = fs::read_dir(&dir)
        .map_err(|e| Error::config(format!("Failed to list '{}': {e}", dir.display())))?;

    let mut matches: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter(|entry| matches_glob(&file_pattern, &entry.file_name().to_string_lossy()))
        .map(|entry| dir.join(entry.file_name()))
        .collect();
    matches.sort();

    tracing::debug!(pattern, matched = matches.len(), "Expanded input glob");
    Ok(matches)
}

/// Match a file name against a glob (`*`, `?`, `[...]`, `[!...]`)
pub fn matches_glob(pattern: &str, name: &str) -> bool {
    glob_match::glob_match(pattern, name)
}
