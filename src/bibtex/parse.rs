//! Low-level entry and field parsing.
//!
//! The parser advances an explicit cursor through the input: find the next
//! entry header, hand the brace-delimited body to the scanner, split the
//! body into a tag and `NAME = VALUE` pairs, repeat. Recursion-free, so
//! large machine-generated bibliographies cannot overflow the stack.

use once_cell::sync::Lazy;

use crate::bibtex::ParseOutcome;
use crate::bibtex::scan::{ScanError, scan};
use crate::bibtex::structure::{BibEntry, Bibliography};
use crate::regex::Regex;
use crate::{BibError, Diagnostic, Result, Severity};

/// How many characters of context a missing-tag error carries.
const TAG_CONTEXT_CHARS: usize = 25;

/// Entry header: optional leading whitespace, `@`, a type token, `{`.
static ENTRY_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*@([^\s{]+)\s*\{").unwrap());

/// Entry tag: first token of the body, terminated by a comma.
static ENTRY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([^\s,]+)\s*,").unwrap());

/// Start of a field assignment: name, `=`, and the value's first character,
/// which selects the value delimiter.
static FIELD_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"([^\s=,{}]+)\s*=\s*(\S)").unwrap());

/// Whitespace runs (and any newline) collapse to a single space inside values.
static SQUEEZE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}|[\n\r]").unwrap());

pub(crate) fn parse_entries(text: &str) -> Result<ParseOutcome> {
    let mut bibliography = Bibliography::new();
    let mut diagnostics = Vec::new();

    let mut pos = 0;
    while let Some(caps) = ENTRY_HEADER.captures(&text[pos..]) {
        let entry_type = caps[1].to_uppercase();
        // The header pattern ends with the opening brace, so the scanner
        // anchors exactly there.
        let brace = pos + caps.get(0).expect("full match").end() - 1;

        match scan(&text[brace..], '{') {
            Ok(span) => {
                if entry_type != "COMMENT" {
                    parse_body(&entry_type, span.content, &mut bibliography, &mut diagnostics)?;
                }
                pos = brace + span.end;
            }
            Err(ScanError::Unterminated { context, .. }) => {
                diagnostics.push(Diagnostic::general(
                    Severity::Warning,
                    format!(
                        "unterminated body for @{entry_type} entry near: {context}; entry skipped"
                    ),
                ));
                pos = brace + 1;
            }
            // The brace is known to be present at the anchor.
            Err(ScanError::DelimiterNotFound { .. }) => pos = brace + 1,
        }
    }

    Ok(ParseOutcome {
        bibliography,
        diagnostics,
    })
}

/// Split one entry body into tag and fields and add it to the bibliography.
fn parse_body(
    entry_type: &str,
    body: &str,
    bibliography: &mut Bibliography,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<()> {
    let caps = ENTRY_TAG.captures(body).ok_or_else(|| BibError::MissingTag {
        context: body.trim().chars().take(TAG_CONTEXT_CHARS).collect(),
    })?;
    let key = caps[1].to_string();
    let rest = &body[caps.get(0).expect("full match").end()..];

    let mut entry = BibEntry::new(entry_type, key.clone());
    parse_fields(&key, rest, &mut entry, diagnostics);

    if !bibliography.insert(entry) {
        diagnostics.push(Diagnostic::for_entry(
            Severity::Warning,
            key.clone(),
            format!("duplicate entry for {key} discarded"),
        ));
    }
    Ok(())
}

/// Parse `NAME = VALUE` pairs, delegating value extraction to the scanner.
fn parse_fields(key: &str, body: &str, entry: &mut BibEntry, diagnostics: &mut Vec<Diagnostic>) {
    let mut pos = 0;
    while let Some(caps) = FIELD_START.captures(&body[pos..]) {
        let name = caps[1].to_uppercase();
        let delim_match = caps.get(2).expect("delimiter capture");
        let delim = caps[2].chars().next().expect("non-empty capture");
        // In bare mode the delimiter character is the first value character,
        // so the scan starts on it either way.
        let anchor = pos + delim_match.start();

        match scan(&body[anchor..], delim) {
            Ok(span) => {
                let value = SQUEEZE_WS.replace_all(span.content, " ");
                entry.fields.insert(&name, value.trim());
                pos = anchor + span.end;
            }
            Err(err) => {
                let context = match err {
                    ScanError::Unterminated { context, .. } => context,
                    ScanError::DelimiterNotFound { .. } => String::new(),
                };
                diagnostics.push(Diagnostic::for_field(
                    Severity::Warning,
                    key,
                    name,
                    format!("unterminated value near: {context}; remaining fields skipped"),
                ));
                return;
            }
        }
    }
}
