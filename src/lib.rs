//! A library for checking, validating, and normalizing BibTeX bibliographies.
//!
//! `bibcheck` correlates the citations actually used in a compiled document
//! (taken from its `.aux` file) with the entries of a BibTeX bibliography,
//! validates each cited entry against a declarative house style rule table
//! plus a set of structural checks, and can rewrite the bibliography into a
//! normalized form suitable for journal submission.
//!
//! # Key Features
//!
//! - **Escape-aware parsing**: balanced brace/quote/angle-bracket scanning
//!   with support for escaped and nested delimiters.
//! - **Citation correlation**: ordered, deduplicated citation keys extracted
//!   from `\citation` lines, matched against the bibliography.
//! - **Table-driven validation**: rules are plain `(field, pattern, message,
//!   severity)` records; house style evolves by editing data, not code.
//! - **Structural checks**: required fields per entry type, author-count
//!   heuristics, duplicate DOI/EPRINT detection, required-reference presence.
//! - **Normalization**: collaboration author rewriting, SISSA-style journal
//!   field remapping, optional arXiv suppression, faithful re-serialization.
//!
//! # Basic Usage
//!
//! ```rust
//! use bibcheck::{parse_bibliography, extract_citations, Checker};
//!
//! let bib = r#"@ARTICLE{Smith:2020,
//!     author = "J. Smith and others",
//!     journal = "JHEP",
//!     volume = "04",
//!     year = "2020",
//!     doi = "10.1000/example",
//!     eprint = "2001.00001",
//! }"#;
//!
//! let citations = extract_citations("\\citation{Smith:2020}");
//! let parsed = parse_bibliography(bib).unwrap();
//!
//! let checker = Checker::new();
//! for diagnostic in checker.check(&parsed.bibliography, &citations) {
//!     println!("{}", diagnostic);
//! }
//! ```
//!
//! # Rewriting
//!
//! ```rust
//! use bibcheck::{parse_bibliography, Rewriter};
//!
//! let bib = r#"@ARTICLE{Smith:2020,
//!     author = "J. Smith",
//!     journal = "JHEP",
//!     volume = "04",
//!     year = "2020",
//! }"#;
//!
//! let mut parsed = parse_bibliography(bib).unwrap();
//! let rewriter = Rewriter::new();
//! let outcome = rewriter.rewrite(
//!     &mut parsed.bibliography,
//!     &["Smith:2020".to_string()],
//!     false,
//! );
//! assert!(outcome.text.contains("J. High Energy Phys."));
//! ```
//!
//! # Error Handling
//!
//! Recoverable problems (missing entries, duplicate keys, style violations,
//! an unterminated span inside one entry) surface as ordered [`Diagnostic`]
//! values and never abort a run. Fatal conditions (an entry body with no
//! parsable tag) surface as [`BibError`] through the crate [`Result`] type.

use std::fmt;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod bibtex;
pub mod blg;
pub mod check;
pub mod citations;
mod regex;
pub mod rewrite;
pub mod rules;

// Reexports
pub use bibtex::structure::{BibEntry, Bibliography, Field, FieldMap};
pub use bibtex::{
    ParseOutcome, parse_bibliography, parse_bibliography_bytes, parse_bibliography_file,
};
pub use check::{CheckConfig, Checker, RequiredRef};
pub use citations::{extract_citations, extract_citations_file, extract_citations_with};
pub use rewrite::{JournalFamily, RewriteConfig, RewriteOutcome, Rewriter};
pub use rules::{Rule, default_rules};

/// A specialized Result type for bibliography operations.
pub type Result<T> = std::result::Result<T, BibError>;

/// Represents fatal errors that abort a validation run.
#[derive(Error, Debug)]
pub enum BibError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not find a tag in entry body starting with: {context}")]
    MissingTag { context: String },

    #[error("invalid pattern for field {field}: {message}")]
    InvalidPattern { field: String, message: String },
}

/// Classification of a validation finding.
///
/// Severities are ordered `Info < Warning < Error`, so a diagnostic stream
/// can be filtered with a plain comparison.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Severity {
    /// Advisory finding that never needs action.
    Info,
    /// Finding that should be reviewed but does not block acceptance.
    #[default]
    Warning,
    /// Finding that must be fixed before acceptance.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// A single validation finding.
///
/// Diagnostics are produced in a deterministic order (entries in citation
/// order, rules in table order) and are never retracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Citation key the finding refers to, if any.
    pub key: Option<String>,
    /// Field within the entry, if the finding is field-specific.
    pub field: Option<CompactString>,
    /// Human-readable description of the finding.
    pub message: String,
    pub severity: Severity,
}

impl Diagnostic {
    /// A finding scoped to one field of one entry.
    pub fn for_field(
        severity: Severity,
        key: impl Into<String>,
        field: impl Into<CompactString>,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            key: Some(key.into()),
            field: Some(field.into()),
            message: message.into(),
            severity,
        }
    }

    /// A finding scoped to one entry as a whole.
    pub fn for_entry(
        severity: Severity,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            key: Some(key.into()),
            field: None,
            message: message.into(),
            severity,
        }
    }

    /// A finding about the bibliography as a whole.
    pub fn general(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            key: None,
            field: None,
            message: message.into(),
            severity,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: ",
            self.severity,
            self.key.as_deref().unwrap_or("-")
        )?;
        if let Some(field) = &self.field {
            write!(f, "{}: ", field)?;
        }
        f.write_str(&self.message)
    }
}
