//! BibTeX bibliography parsing.
//!
//! The grammar handled here is the subset emitted by the reference
//! management toolchain: `@TYPE{tag, NAME = VALUE, ...}` where `VALUE` is
//! brace-, quote-, or bare-until-comma delimited. Full BibTeX grammar
//! compliance (string macros, preambles, concatenation) is out of scope.

use std::path::Path;

use crate::{Diagnostic, Result, Severity};

pub(crate) mod parse;
pub mod scan;
pub mod structure;

use structure::Bibliography;

/// How many bytes of context a decode diagnostic carries.
const DECODE_CONTEXT_BYTES: usize = 25;

/// Result of one bibliography parse pass.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub bibliography: Bibliography,
    /// Recoverable problems found while parsing, in input order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse bibliography text into typed entries plus a diagnostic stream.
///
/// Recoverable problems (duplicate keys, an unterminated span inside one
/// entry) become diagnostics; an entry body with no parsable tag is fatal.
pub fn parse_bibliography(text: &str) -> Result<ParseOutcome> {
    parse::parse_entries(text)
}

/// Parse bibliography bytes that may not be UTF-8 clean.
///
/// Strict UTF-8 decoding is attempted first. On failure every 8-bit byte is
/// reported with its offset and surrounding context (these typically come
/// from quote marks or ligatures pasted in from a word processor), then the
/// parse is retried on a permissive decode that replaces invalid sequences.
pub fn parse_bibliography_bytes(bytes: &[u8]) -> Result<ParseOutcome> {
    match std::str::from_utf8(bytes) {
        Ok(text) => parse_bibliography(text),
        Err(_) => {
            let mut decode_diagnostics = Vec::new();
            for (offset, &byte) in bytes.iter().enumerate() {
                if byte >= 0x80 {
                    let end = (offset + DECODE_CONTEXT_BYTES).min(bytes.len());
                    let context = String::from_utf8_lossy(&bytes[offset..end]);
                    decode_diagnostics.push(Diagnostic::general(
                        Severity::Warning,
                        format!("non-UTF8 byte 0x{byte:02X} at offset {offset}: {context}"),
                    ));
                }
            }
            let text = String::from_utf8_lossy(bytes);
            let mut outcome = parse_bibliography(&text)?;
            decode_diagnostics.append(&mut outcome.diagnostics);
            outcome.diagnostics = decode_diagnostics;
            Ok(outcome)
        }
    }
}

/// Read and parse a bibliography file.
pub fn parse_bibliography_file(path: impl AsRef<Path>) -> Result<ParseOutcome> {
    let bytes = std::fs::read(path)?;
    parse_bibliography_bytes(&bytes)
}
