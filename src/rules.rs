//! Declarative house style rules.
//!
//! A rule is plain data: a field name, a pattern, a message, and a severity.
//! The evaluation loop in [`crate::check`] is a single generic dispatcher,
//! so the house style evolves by editing this table, not engine code.

use compact_str::{CompactString, ToCompactString};
use once_cell::sync::Lazy;

use crate::regex::Regex;
use crate::{BibError, Result, Severity};

/// One house style rule, applied to a single field of every cited entry.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Canonical uppercase name of the field this rule inspects.
    pub field: CompactString,
    pattern: Regex,
    /// Message emitted when the pattern matches.
    pub message: String,
    pub severity: Severity,
}

impl Rule {
    /// Build a rule, validating the pattern.
    pub fn new(
        field: &str,
        pattern: &str,
        message: impl Into<String>,
        severity: Severity,
    ) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| BibError::InvalidPattern {
            field: field.to_string(),
            message: e.to_string(),
        })?;
        Ok(Rule {
            field: field.to_uppercase().to_compact_string(),
            pattern,
            message: message.into(),
            severity,
        })
    }

    /// Whether the rule fires for the given field value.
    pub fn matches(&self, value: &str) -> bool {
        self.pattern.is_match(value)
    }
}

/// The default house style rule table, in evaluation order.
pub fn default_rules() -> Vec<Rule> {
    DEFAULT_RULES.clone()
}

static DEFAULT_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    use Severity::*;
    vec![
        rule("VOLUME", r"[A-G]\s*\d", "Volume with serial number", Error),
        rule("VOLUME", r"\\bf", r"Volume with \bf", Error),
        rule("VOLUME", "CMS", "PAS as article? Please use TECHREPORT", Error),
        rule(
            "AUTHOR",
            "~",
            "Found author string with explicit spacing...normally not good!",
            Warning,
        ),
        rule("AUTHOR", r"[A-Z]\.[A-Z]", "Author with adjacent initials", Error),
        rule("AUTHOR", r"et al\.", "Author with explicit et al", Error),
        rule("AUTHOR", r"\\etal", "Author with explicit etal", Error),
        rule(
            "AUTHOR",
            "Adolphi",
            "Adolphi: this may be an error in attribution for the detector paper. Please check",
            Warning,
        ),
        rule(
            "AUTHOR",
            r#"(?:^|[^{])\\["`'~=cuvHaoO]"#,
            r#"Special characters must be protected with {}, e.g. \"o -> {\"o}"#,
            Error,
        ),
        rule("JOURNAL", "CMS", "PAS as article? Please use TECHREPORT", Error),
        rule(
            "JOURNAL",
            r"[A-Za-z]\.[A-Za-z].",
            "Missing spaces in journal name",
            Error,
        ),
        rule(
            "JOURNAL",
            "~",
            "Found ~ in a journal name--don't override BibTeX",
            Error,
        ),
        rule("ISSUE", ".*", "Don't normally use the ISSUE field", Info),
        rule(
            "EPRINT",
            r"(?:^|[^/])[0-9]{7}",
            "Old style arXiv ref requires the archive class (see http://arxiv.org/help/arxiv_identifier)",
            Error,
        ),
        rule(
            "EPRINT",
            r"1101\.0536",
            "Check you've followed the publication guidelines for citing PDFs, including specific sets",
            Warning,
        ),
        rule(
            "EPRINT",
            r"1101\.0538",
            "Check you've followed the publication guidelines for citing PDFs, including specific sets",
            Warning,
        ),
        rule(
            "TITLE",
            "(?i)MadGraph.*v4",
            "MadGraph v5 references are preferred over v4 (unless v4 was what was actually used)",
            Warning,
        ),
        rule(
            "TITLE",
            "(?i)MadGraph.*5",
            "Consider using doi:10.1007/JHEP07(2014)079, MadGraph5_aMC@NLO?",
            Warning,
        ),
        rule(
            "TITLE",
            "POWHEG",
            "Is POWHEG (BOX) correctly referenced? See http://powhegbox.mib.infn.it",
            Warning,
        ),
        rule(
            "DOI",
            r"10\.1088/1126-6708/2002/06/029|10\.1088/1126-6708/2003/08/007|10\.1088/1126-6708/2006/03/092|10\.1088/1126-6708/2008/07/029|10\.1007/JHEP01\(2011\)053",
            "MC@NLO citation found. Did you get them all?",
            Warning,
        ),
        rule(
            "DOI",
            r"10\.1007/JHEP05\(2014\)146|10\.1007/JHEP09\(2013\)029",
            "Soft drop or modified mass drop tagger found. If you are using soft drop with beta=0, please also cite the MMDT",
            Warning,
        ),
        rule(
            "DOI",
            r"10\.1088/1126-6708/2008/04/063|10\.1140/epjc/s10052-012-1896-2",
            "You are using anti-kt or fastjet. Did you cite both properly?",
            Warning,
        ),
        rule("DOI", "doi|DOI", "Do not include dx.doi.org", Error),
        rule("DOI", ",", "Only one doi in the DOI field", Error),
        rule("DOI", " ", "No spaces in the DOI field", Error),
        rule(
            "COLLABORATION",
            "Collaboration",
            "Should not normally use Collaboration: already in the format",
            Error,
        ),
        rule(
            "LANGUAGE",
            ".*",
            "Language entry requires loading the babel package, which is not used",
            Warning,
        ),
        rule("PAGES", "-", "Range in page field: we only use first page", Warning),
    ]
});

/// Default rule patterns are known-valid literals.
fn rule(field: &str, pattern: &str, message: &str, severity: Severity) -> Rule {
    Rule::new(field, pattern, message, severity).unwrap()
}
