//! BibTeX `.blg` log filtering.
//!
//! The interesting part of the log is everything except the entry/usage
//! statistics block BibTeX prints between its "You've used N entries" line
//! and its closing warning count.

use once_cell::sync::Lazy;

use crate::regex::Regex;

static STATS_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^You've used [0-9]+ entries").unwrap());
static STATS_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\(There were [0-9]+ warnings\)").unwrap());

/// Drop the statistics block from a BibTeX log, keeping everything else in
/// order. The closing warning-count line itself is kept.
pub fn filter_log(text: &str) -> String {
    let mut keep = true;
    let mut out = String::new();
    for line in text.lines() {
        if keep {
            keep = !STATS_START.is_match(line);
        } else {
            keep = STATS_END.is_match(line);
        }
        if keep {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}
