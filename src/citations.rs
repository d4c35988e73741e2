//! Citation-order extraction from LaTeX `.aux` files.
//!
//! Each `\citation{a,b,c}` line lists the keys cited by one `\cite` command,
//! in the order the compiler emitted them. Concatenating the lists in file
//! order and dropping repeats reproduces the order BibTeX assigns to the
//! reference list.

use std::collections::HashSet;
use std::path::Path;

use crate::Result;

/// Marker beginning every citation line of an `.aux` file.
pub const CITATION_MARKER: &str = "\\citation";

/// Control keys injected by REVTeX style files. A line whose first key is a
/// control key carries no real citations and is dropped whole.
pub const CONTROL_KEYS: &[&str] = &["REVTEX41Control", "apsrev41Control"];

/// Extract the ordered, deduplicated citation keys from `.aux` text,
/// filtering the default [`CONTROL_KEYS`].
pub fn extract_citations(aux_text: &str) -> Vec<String> {
    extract_citations_with(aux_text, CONTROL_KEYS)
}

/// Extract citation keys, dropping any citation line whose first key is in
/// `control_keys`. First occurrence order is preserved; duplicates removed.
pub fn extract_citations_with(aux_text: &str, control_keys: &[&str]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();

    for line in aux_text.lines() {
        let Some(rest) = line.strip_prefix(CITATION_MARKER) else {
            continue;
        };
        let Some(open) = rest.find('{') else {
            continue;
        };
        let Some(close) = rest[open..].find('}') else {
            continue;
        };
        let list = &rest[open + 1..open + close];

        if let Some(first) = list.split(',').next()
            && control_keys.contains(&first)
        {
            continue;
        }

        for key in list.split(',') {
            if key.is_empty() {
                continue;
            }
            if seen.insert(key.to_string()) {
                keys.push(key.to_string());
            }
        }
    }

    keys
}

/// Read an `.aux` file and extract its citation keys.
pub fn extract_citations_file(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(extract_citations(&text))
}
