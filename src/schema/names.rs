//! Identifier sanitation for header names and table names

use std::collections::HashSet;

/// Turn arbitrary header text into a warehouse-friendly identifier
///
/// Spaces, `/` and `-` become `_`; every other character outside
/// `[A-Za-z0-9_]` is dropped. A leading digit gets a `_` prefix and an
/// empty result falls back to `column_<ordinal>`.
pub fn sanitize_identifier(raw: &str, ordinal: usize) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        match ch {
            ' ' | '/' | '-' | '\t' => out.push('_'),
            c if c.is_ascii_alphanumeric() || c == '_' => out.push(c),
            _ => {}
        }
    }

    if out.is_empty() {
        return format!("column_{}", ordinal + 1);
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Sanitize a full header row, suffixing duplicates with `_2`, `_3`, ...
pub fn unique_column_names(headers: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(headers.len());

    for (ordinal, header) in headers.iter().enumerate() {
        let base = sanitize_identifier(header, ordinal);
        let mut candidate = base.clone();
        let mut suffix = 2;
        while !seen.insert(candidate.to_ascii_lowercase()) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        names.push(candidate);
    }

    names
}
