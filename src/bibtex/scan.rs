//! Escape-aware extraction of balanced delimiter spans.
//!
//! This is the lowest layer of the bibliography parser: given a position in
//! text and an opening delimiter, find the matching closer and hand back the
//! content strictly between the two.

use thiserror::Error;

/// How many characters of context an [`ScanError::Unterminated`] carries.
const CONTEXT_CHARS: usize = 15;

/// Errors produced while scanning for a balanced span.
///
/// Both variants are recoverable: the caller skips the malformed span and
/// resumes scanning after it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("opening delimiter `{delim}` not found")]
    DelimiterNotFound { delim: char },

    #[error("unterminated `{delim}` span near: {context}")]
    Unterminated { delim: char, context: String },
}

/// A successfully extracted span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span<'a> {
    /// Byte offset just past the closing delimiter (or past the terminating
    /// comma in bare mode), relative to the scanned text.
    pub end: usize,
    /// Content strictly between the delimiters.
    pub content: &'a str,
}

/// Matching closer for a recognized opening delimiter.
fn closing(delim: char) -> Option<char> {
    match delim {
        '{' => Some('}'),
        '"' => Some('"'),
        '<' => Some('>'),
        _ => None,
    }
}

/// Extract one balanced span from `text`.
///
/// For `{`, `"`, and `<` the scan starts at the first occurrence of the
/// opening delimiter and maintains a depth counter; a backslash followed by
/// the opening or closing delimiter is an escaped literal and never affects
/// depth. Any other `delim` selects bare-token mode: content runs up to the
/// first comma (or the end of text) and the returned offset points just past
/// it.
///
/// Only the active delimiter pair affects depth; other delimiter characters
/// inside the span are ordinary content.
pub fn scan(text: &str, delim: char) -> Result<Span<'_>, ScanError> {
    let Some(close) = closing(delim) else {
        return Ok(match text.find(',') {
            Some(i) => Span {
                end: i + 1,
                content: &text[..i],
            },
            None => Span {
                end: text.len(),
                content: text,
            },
        });
    };

    let open_at = text
        .find(delim)
        .ok_or(ScanError::DelimiterNotFound { delim })?;
    let start = open_at + delim.len_utf8();

    let bytes = text.as_bytes();
    let (open, close) = (delim as u8, close as u8);
    let mut depth = 1usize;
    let mut pos = start;
    while depth > 0 {
        if pos >= bytes.len() {
            return Err(ScanError::Unterminated {
                delim,
                context: text[start..].chars().take(CONTEXT_CHARS).collect(),
            });
        }
        if bytes[pos] == b'\\'
            && pos + 1 < bytes.len()
            && (bytes[pos + 1] == open || bytes[pos + 1] == close)
        {
            pos += 2;
            continue;
        }
        // Closer first: in quote mode the opener and closer are the same
        // character and must terminate, not nest.
        if bytes[pos] == close {
            depth -= 1;
        } else if bytes[pos] == open {
            depth += 1;
        }
        pos += 1;
    }

    Ok(Span {
        end: pos,
        content: &text[start..pos - 1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("{abc{def}ghi}jkl", '{', "abc{def}ghi", 13)]
    #[case("{simple}", '{', "simple", 8)]
    #[case("{}", '{', "", 2)]
    #[case("\"quoted\",", '"', "quoted", 8)]
    #[case("<1234.5678>", '<', "1234.5678", 11)]
    #[case("{a{b{c}b}a}", '{', "a{b{c}b}a", 11)]
    fn test_scan_balanced(
        #[case] text: &str,
        #[case] delim: char,
        #[case] content: &str,
        #[case] end: usize,
    ) {
        let span = scan(text, delim).unwrap();
        assert_eq!(span.content, content);
        assert_eq!(span.end, end);
    }

    #[test]
    fn test_scan_escaped_closer() {
        let span = scan(r"{a\}b}", '{').unwrap();
        assert_eq!(span.content, r"a\}b");
        assert_eq!(span.end, 6);
    }

    #[test]
    fn test_scan_escaped_opener() {
        let span = scan(r"{a\{b}", '{').unwrap();
        assert_eq!(span.content, r"a\{b");
    }

    #[test]
    fn test_scan_escaped_quote_inside_quotes() {
        let span = scan(r#""{\"o}rsted","#, '"').unwrap();
        assert_eq!(span.content, r#"{\"o}rsted"#);
    }

    #[test]
    fn test_scan_unterminated_carries_context() {
        let err = scan("{abc", '{').unwrap_err();
        assert_eq!(
            err,
            ScanError::Unterminated {
                delim: '{',
                context: "abc".to_string(),
            }
        );
    }

    #[test]
    fn test_scan_unterminated_context_is_truncated() {
        let err = scan("{0123456789abcdefghij", '{').unwrap_err();
        match err {
            ScanError::Unterminated { context, .. } => {
                assert_eq!(context, "0123456789abcde");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_scan_opener_not_found() {
        assert_eq!(
            scan("no braces here", '{').unwrap_err(),
            ScanError::DelimiterNotFound { delim: '{' }
        );
    }

    #[test]
    fn test_scan_mismatched_other_delimiters_ignored() {
        // Angle brackets and quotes inside a brace span are ordinary content.
        let span = scan(r#"{a "b> c}"#, '{').unwrap();
        assert_eq!(span.content, r#"a "b> c"#);
    }

    #[rstest]
    #[case("bare value, rest", "bare value", 11)]
    #[case("no comma at all", "no comma at all", 15)]
    #[case(",", "", 1)]
    fn test_scan_bare_until_comma(#[case] text: &str, #[case] content: &str, #[case] end: usize) {
        let span = scan(text, 'x').unwrap();
        assert_eq!(span.content, content);
        assert_eq!(span.end, end);
    }

    #[test]
    fn test_scan_starts_at_first_opener() {
        let span = scan("  pad {body} tail", '{').unwrap();
        assert_eq!(span.content, "body");
        assert_eq!(span.end, 12);
    }

    #[test]
    fn test_scan_trailing_backslash() {
        assert!(matches!(
            scan("{abc\\", '{'),
            Err(ScanError::Unterminated { .. })
        ));
    }
}
