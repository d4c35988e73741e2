//! Rule evaluation and structural validation of cited entries.
//!
//! [`Checker::check`] is a pure function of (citations, bibliography, rules):
//! entries are processed in citation order and rules in table order, so the
//! diagnostic stream is deterministic for a given input.

use std::collections::{HashMap, HashSet};

use compact_str::CompactString;
use itertools::Itertools;
use once_cell::sync::Lazy;

use crate::bibtex::structure::{BibEntry, Bibliography};
use crate::regex::Regex;
use crate::rules::{Rule, default_rules};
use crate::{Diagnostic, Severity};

static BLANK_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s+$").unwrap());
static TWO_DIGIT_VOLUME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{2}$").unwrap());

/// A reference that must be present among the cited entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredRef {
    /// Exact DOI to look for.
    pub doi: Option<String>,
    /// Substring to look for in URL fields (allows matching by record id).
    pub url_fragment: Option<String>,
    /// Message emitted when no cited entry matches.
    pub message: String,
}

impl RequiredRef {
    pub fn doi(doi: impl Into<String>, message: impl Into<String>) -> Self {
        RequiredRef {
            doi: Some(doi.into()),
            url_fragment: None,
            message: message.into(),
        }
    }

    pub fn url_fragment(fragment: impl Into<String>, message: impl Into<String>) -> Self {
        RequiredRef {
            doi: None,
            url_fragment: Some(fragment.into()),
            message: message.into(),
        }
    }
}

/// Configuration for the structural checks.
///
/// The defaults encode the house style; every knob is explicit so a
/// different style can inject its own sets.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Journal names whose VOLUME must be exactly two digits.
    pub two_digit_volume_journals: Vec<String>,
    /// Author lists longer than this must be truncated to one author plus
    /// "and others"; shorter lists must be complete.
    pub author_list_limit: usize,
    /// Fields whose values must be unique across entries.
    pub duplicate_fields: Vec<CompactString>,
    /// References that must be cited.
    pub required_refs: Vec<RequiredRef>,
    /// Entry key that must exist somewhere in the bibliography
    /// (case-insensitive), or `None` to skip the check.
    pub hepdata_key: Option<String>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        CheckConfig {
            two_digit_volume_journals: vec![
                "JHEP".to_string(),
                "J. High Energy Phys.".to_string(),
            ],
            author_list_limit: 15,
            duplicate_fields: vec!["DOI".into(), "EPRINT".into()],
            required_refs: vec![
                RequiredRef::doi(
                    "10.1088/1748-0221/12/01/P01020",
                    "Run 1 trigger citation (10.1088/1748-0221/12/01/P01020) was not cited. \
                     Should be included for both Run 1 and Run 2.",
                ),
                RequiredRef::doi(
                    "10.1140/epjc/s10052-021-09538-2",
                    "Luminosity reference (LUM-17-003) missing",
                ),
                RequiredRef::url_fragment("2621960", "LUM-17-004 reference missing"),
                RequiredRef::url_fragment("2676164", "LUM-18-002 reference missing"),
            ],
            hepdata_key: Some("HEPData".to_string()),
        }
    }
}

/// Validates cited entries against the rule table and structural checks.
pub struct Checker {
    rules: Vec<Rule>,
    config: CheckConfig,
}

impl Default for Checker {
    fn default() -> Self {
        Checker::new()
    }
}

impl Checker {
    /// A checker with the default rule table and configuration.
    pub fn new() -> Self {
        Checker {
            rules: default_rules(),
            config: CheckConfig::default(),
        }
    }

    /// A checker with custom rules and configuration.
    pub fn with_config(rules: Vec<Rule>, config: CheckConfig) -> Self {
        Checker { rules, config }
    }

    /// Correlate citations against the bibliography and report every rule
    /// and structural violation, in citation order.
    pub fn check(&self, bibliography: &Bibliography, citations: &[String]) -> Vec<Diagnostic> {
        let mut out = Vec::new();

        for key in citations {
            match bibliography.get(key) {
                None => out.push(Diagnostic::for_entry(
                    Severity::Warning,
                    key.clone(),
                    "missing bibliography entry for citation; may be an upper/lower case problem",
                )),
                Some(entry) => {
                    self.check_rules(entry, &mut out);
                    self.check_structure(entry, &mut out);
                }
            }
        }

        let cited: HashSet<&str> = citations.iter().map(String::as_str).collect();
        for required in &self.config.required_refs {
            self.check_required_ref(bibliography, &cited, required, &mut out);
        }
        if let Some(hepdata_key) = &self.config.hepdata_key {
            self.check_hepdata(bibliography, hepdata_key, &mut out);
        }
        for field in &self.config.duplicate_fields {
            self.check_duplicates(bibliography, &cited, field, &mut out);
        }

        out
    }

    /// Apply every rule in table order; at most one diagnostic per rule.
    fn check_rules(&self, entry: &BibEntry, out: &mut Vec<Diagnostic>) {
        for rule in &self.rules {
            if let Some(value) = entry.fields.get(&rule.field)
                && rule.matches(value)
            {
                out.push(Diagnostic::for_field(
                    rule.severity,
                    entry.key.clone(),
                    rule.field.clone(),
                    rule.message.clone(),
                ));
            }
        }
    }

    fn check_structure(&self, entry: &BibEntry, out: &mut Vec<Diagnostic>) {
        match entry.entry_type.as_str() {
            // Some techreports have DOIs, so a missing URL is fine then.
            "TECHREPORT" => {
                if !entry.fields.contains("URL") && !entry.fields.contains("DOI") {
                    out.push(Diagnostic::for_entry(
                        Severity::Error,
                        entry.key.clone(),
                        "missing URL or DOI for TECHREPORT",
                    ));
                }
            }
            "ARTICLE" => self.check_article(entry, out),
            _ => {}
        }

        self.check_author_count(entry, out);

        if entry.fields.contains("DOI") && entry.fields.contains("URL") {
            out.push(Diagnostic::for_entry(
                Severity::Warning,
                entry.key.clone(),
                "both DOI and URL present. DOI only is preferred",
            ));
        }

        for field in entry.fields.iter() {
            if field.value.is_empty() {
                out.push(Diagnostic::for_field(
                    Severity::Warning,
                    entry.key.clone(),
                    field.name.clone(),
                    "empty value",
                ));
            } else if BLANK_VALUE.is_match(&field.value) {
                out.push(Diagnostic::for_field(
                    Severity::Warning,
                    entry.key.clone(),
                    field.name.clone(),
                    "blank value",
                ));
            }
        }
    }

    fn check_article(&self, entry: &BibEntry, out: &mut Vec<Diagnostic>) {
        match entry.fields.get("AUTHOR") {
            None => out.push(Diagnostic::for_field(
                Severity::Error,
                entry.key.clone(),
                "AUTHOR",
                "missing AUTHOR",
            )),
            Some(author) => {
                // A collaboration as author is not generally okay for papers.
                if author.contains("Collaboration") {
                    out.push(Diagnostic::for_field(
                        Severity::Warning,
                        entry.key.clone(),
                        "AUTHOR",
                        format!("{author} listed as author. Please check this is correct"),
                    ));
                }
            }
        }
        if !entry.fields.contains("DOI") {
            out.push(Diagnostic::for_field(
                Severity::Error,
                entry.key.clone(),
                "DOI",
                "missing DOI",
            ));
        }
        if !entry.fields.contains("EPRINT") {
            out.push(Diagnostic::for_field(
                Severity::Error,
                entry.key.clone(),
                "EPRINT",
                "missing EPRINT",
            ));
        }
        match entry.fields.get("JOURNAL") {
            None => out.push(Diagnostic::for_field(
                Severity::Error,
                entry.key.clone(),
                "JOURNAL",
                "missing JOURNAL. Reformat as UNPUBLISHED?",
            )),
            Some(journal) => {
                if self
                    .config
                    .two_digit_volume_journals
                    .iter()
                    .any(|j| j == journal)
                {
                    let volume = entry.fields.get("VOLUME");
                    if !volume.is_some_and(|v| TWO_DIGIT_VOLUME.is_match(v)) {
                        out.push(Diagnostic::for_field(
                            Severity::Error,
                            entry.key.clone(),
                            "VOLUME",
                            format!(
                                "{journal} volume given as {}: should always be exactly two \
                                 digits (0 left padded)",
                                volume.unwrap_or("<missing>")
                            ),
                        ));
                    }
                }
            }
        }
    }

    /// Author-count heuristic: `" and "` separators plus one, minus one when
    /// the list ends in "and others".
    fn check_author_count(&self, entry: &BibEntry, out: &mut Vec<Diagnostic>) {
        let Some(author) = entry.fields.get("AUTHOR") else {
            return;
        };
        let limit = self.config.author_list_limit;
        let etal = author.trim_end().ends_with("and others");
        let mut nauthors = author.matches(" and ").count() + 1;
        if etal {
            nauthors -= 1;
        }
        let collab = entry.fields.contains("COLLABORATION");

        let message = if nauthors > 1 && etal && collab {
            Some(
                "author count: more authors than necessary for a paper with a collaboration. \
                 List only the first plus \"and others\""
                    .to_string(),
            )
        } else if nauthors > 1 && nauthors < limit && etal && !collab {
            Some(format!(
                "author count: incomplete author list. Include all authors for lists as long \
                 as {limit}"
            ))
        } else if nauthors > limit && !collab {
            Some(format!(
                "author count: more authors than necessary. Include only the first author plus \
                 \"and others\" for lists longer than {limit}"
            ))
        } else if nauthors == 1 && etal && !collab {
            Some(format!(
                "author count query: are there really more than {limit} authors for this \
                 reference?"
            ))
        } else {
            None
        };

        if let Some(message) = message {
            out.push(Diagnostic::for_field(
                Severity::Warning,
                entry.key.clone(),
                "AUTHOR",
                message,
            ));
        }
    }

    fn check_required_ref(
        &self,
        bibliography: &Bibliography,
        cited: &HashSet<&str>,
        required: &RequiredRef,
        out: &mut Vec<Diagnostic>,
    ) {
        let mut cited_entries = bibliography.iter().filter(|e| cited.contains(e.key.as_str()));
        let found = cited_entries.any(|entry| {
            let doi_match = required
                .doi
                .as_deref()
                .is_some_and(|doi| entry.fields.get("DOI") == Some(doi));
            let url_match = required
                .url_fragment
                .as_deref()
                .is_some_and(|frag| entry.fields.get("URL").is_some_and(|url| url.contains(frag)));
            doi_match || url_match
        });
        if !found {
            out.push(Diagnostic::general(
                Severity::Warning,
                required.message.clone(),
            ));
        }
    }

    fn check_hepdata(&self, bibliography: &Bibliography, key: &str, out: &mut Vec<Diagnostic>) {
        let present = bibliography
            .iter()
            .any(|e| e.key.eq_ignore_ascii_case(key));
        if !present {
            out.push(Diagnostic::general(
                Severity::Warning,
                format!("no HEPData entry found. Looked for key '{key}'"),
            ));
        }
    }

    /// Report each value of `field` shared by more than one entry: an error
    /// when shared among cited entries, otherwise a warning for the
    /// bibliography at large.
    fn check_duplicates(
        &self,
        bibliography: &Bibliography,
        cited: &HashSet<&str>,
        field: &CompactString,
        out: &mut Vec<Diagnostic>,
    ) {
        let mut order: Vec<&str> = Vec::new();
        let mut groups: HashMap<&str, Vec<&str>> = HashMap::new();
        for entry in bibliography.iter() {
            if let Some(value) = entry.fields.get(field) {
                groups
                    .entry(value)
                    .or_insert_with(|| {
                        order.push(value);
                        Vec::new()
                    })
                    .push(entry.key.as_str());
            }
        }

        for value in order {
            let keys = &groups[value];
            let cited_keys: Vec<&&str> =
                keys.iter().filter(|k| cited.contains(*k)).collect();
            if cited_keys.len() > 1 {
                out.push(Diagnostic {
                    key: None,
                    field: Some(field.clone()),
                    message: format!(
                        "duplicate {field} {value} used by cited entries: {}",
                        cited_keys.iter().join(", ")
                    ),
                    severity: Severity::Error,
                });
            } else if keys.len() > 1 {
                out.push(Diagnostic {
                    key: None,
                    field: Some(field.clone()),
                    message: format!(
                        "duplicate {field} {value} in bibliography entries: {}",
                        keys.iter().join(", ")
                    ),
                    severity: Severity::Warning,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_bibliography;
    use rstest::*;

    fn bib(text: &str) -> Bibliography {
        parse_bibliography(text).unwrap().bibliography
    }

    fn keys(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    /// A checker without the bibliography-wide presence checks, for tests
    /// focused on per-entry behavior.
    fn entry_checker() -> Checker {
        Checker::with_config(
            default_rules(),
            CheckConfig {
                required_refs: Vec::new(),
                hepdata_key: None,
                ..CheckConfig::default()
            },
        )
    }

    #[test]
    fn test_missing_entry_for_citation() {
        let diagnostics = entry_checker().check(&bib(""), &keys(&["Ghost:1999"]));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].key.as_deref(), Some("Ghost:1999"));
        assert!(diagnostics[0].message.contains("missing bibliography entry"));
    }

    #[test]
    fn test_et_al_rule_fires_exactly_once_for_entry() {
        let bib = bib("@MISC{a,\n author = \"J. Smith et al.\",\n}");
        let diagnostics = entry_checker().check(&bib, &keys(&["a"]));
        let et_al: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.message == "Author with explicit et al")
            .collect();
        assert_eq!(et_al.len(), 1);
        assert_eq!(et_al[0].field.as_deref(), Some("AUTHOR"));
        assert_eq!(et_al[0].severity, Severity::Error);
    }

    #[test]
    fn test_rules_run_in_table_order() {
        let bib = bib("@MISC{a,\n volume = \"CMS B 1\",\n pages = \"1-10\",\n}");
        let diagnostics = entry_checker().check(&bib, &keys(&["a"]));
        let messages: Vec<_> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        let serial = messages
            .iter()
            .position(|m| *m == "Volume with serial number")
            .unwrap();
        let pas = messages
            .iter()
            .position(|m| *m == "PAS as article? Please use TECHREPORT")
            .unwrap();
        let pages = messages
            .iter()
            .position(|m| m.starts_with("Range in page field"))
            .unwrap();
        assert!(serial < pas && pas < pages);
    }

    #[test]
    fn test_techreport_requires_url_or_doi() {
        let bib = bib(concat!(
            "@TECHREPORT{bare,\n title = {A report},\n}\n",
            "@TECHREPORT{with_doi,\n title = {B},\n doi = \"10.1/x\",\n}\n",
        ));
        let diagnostics = entry_checker().check(&bib, &keys(&["bare", "with_doi"]));
        let missing: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.message.contains("missing URL or DOI"))
            .collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].key.as_deref(), Some("bare"));
    }

    #[test]
    fn test_article_missing_fields_each_get_a_diagnostic() {
        let bib = bib("@ARTICLE{a,\n title = {T},\n}");
        let diagnostics = entry_checker().check(&bib, &keys(&["a"]));
        for field in ["AUTHOR", "DOI", "EPRINT", "JOURNAL"] {
            assert!(
                diagnostics
                    .iter()
                    .any(|d| d.field.as_deref() == Some(field)
                        && d.message.starts_with("missing")),
                "no missing-{field} diagnostic"
            );
        }
    }

    #[test]
    fn test_article_collaboration_as_author_flagged() {
        let bib = bib(
            "@ARTICLE{a,\n author = \"{CMS Collaboration}\",\n doi = \"10.1/x\",\n eprint = \"2001.00001\",\n journal = \"Phys. Rev. D\",\n}",
        );
        let diagnostics = entry_checker().check(&bib, &keys(&["a"]));
        assert!(
            diagnostics
                .iter()
                .any(|d| d.message.contains("listed as author"))
        );
    }

    #[rstest]
    #[case("04", false)]
    #[case("2020", true)]
    #[case("4", true)]
    fn test_jhep_volume_must_be_two_digits(#[case] volume: &str, #[case] flagged: bool) {
        let source = format!(
            "@ARTICLE{{a,\n author = \"J. Smith\",\n doi = \"10.1/x\",\n eprint = \"2001.00001\",\n journal = \"JHEP\",\n volume = \"{volume}\",\n}}"
        );
        let diagnostics = entry_checker().check(&bib(&source), &keys(&["a"]));
        assert_eq!(
            diagnostics
                .iter()
                .any(|d| d.message.contains("exactly two digits")),
            flagged
        );
    }

    #[rstest]
    // Two named authors plus "and others" with a collaboration: redundant.
    #[case("A. One and B. Two and others", true, "more authors than necessary for a paper")]
    // Short incomplete list without a collaboration.
    #[case("A. One and B. Two and others", false, "incomplete author list")]
    // One author plus "and others" without a collaboration: query.
    #[case("A. One and others", false, "author count query")]
    fn test_author_count_branches(
        #[case] author: &str,
        #[case] collab: bool,
        #[case] expected: &str,
    ) {
        let collab_field = if collab {
            " collaboration = \"CMS\",\n"
        } else {
            ""
        };
        let source = format!("@MISC{{a,\n author = \"{author}\",\n{collab_field}}}");
        let diagnostics = entry_checker().check(&bib(&source), &keys(&["a"]));
        assert!(
            diagnostics.iter().any(|d| d.message.contains(expected)),
            "expected {expected:?} in {diagnostics:?}"
        );
    }

    #[test]
    fn test_author_count_long_list_without_collaboration() {
        let author = (1..=16).map(|i| format!("A. N{i}")).join(" and ");
        let source = format!("@MISC{{a,\n author = \"{author}\",\n}}");
        let diagnostics = entry_checker().check(&bib(&source), &keys(&["a"]));
        assert!(
            diagnostics
                .iter()
                .any(|d| d.message.contains("lists longer than 15"))
        );
    }

    #[test]
    fn test_author_count_long_list_with_collaboration_accepted() {
        // The `~collab` branch of the source tool fired here regardless of
        // the flag; the intended logical negation suppresses it.
        let author = (1..=16).map(|i| format!("A. N{i}")).join(" and ");
        let source =
            format!("@MISC{{a,\n author = \"{author}\",\n collaboration = \"CMS\",\n}}");
        let diagnostics = entry_checker().check(&bib(&source), &keys(&["a"]));
        assert!(
            !diagnostics
                .iter()
                .any(|d| d.message.contains("lists longer than"))
        );
    }

    #[test]
    fn test_both_doi_and_url_flagged() {
        let bib = bib("@MISC{a,\n doi = \"10.1/x\",\n url = \"http://x\",\n}");
        let diagnostics = entry_checker().check(&bib, &keys(&["a"]));
        assert!(
            diagnostics
                .iter()
                .any(|d| d.message.contains("DOI only is preferred"))
        );
    }

    #[test]
    fn test_empty_field_value_flagged() {
        let bib = bib("@MISC{a,\n note = \"\",\n}");
        let diagnostics = entry_checker().check(&bib, &keys(&["a"]));
        assert!(
            diagnostics
                .iter()
                .any(|d| d.field.as_deref() == Some("NOTE") && d.message == "empty value")
        );
    }

    #[test]
    fn test_duplicate_doi_among_cited_entries() {
        let bib = bib(concat!(
            "@MISC{a,\n doi = \"10.1/x\",\n}\n",
            "@MISC{b,\n doi = \"10.1/x\",\n}\n",
        ));
        let diagnostics = entry_checker().check(&bib, &keys(&["a", "b"]));
        let dups: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.message.contains("duplicate DOI"))
            .collect();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].severity, Severity::Error);
        assert!(dups[0].message.contains("10.1/x"));
        assert!(dups[0].message.contains('a') && dups[0].message.contains('b'));
    }

    #[test]
    fn test_duplicate_doi_only_in_bibliography_is_a_warning() {
        let bib = bib(concat!(
            "@MISC{a,\n doi = \"10.1/x\",\n}\n",
            "@MISC{b,\n doi = \"10.1/x\",\n}\n",
        ));
        let diagnostics = entry_checker().check(&bib, &keys(&["a"]));
        let dups: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.message.contains("duplicate DOI"))
            .collect();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].severity, Severity::Warning);
        assert!(dups[0].message.contains("in bibliography"));
    }

    #[test]
    fn test_required_reference_by_doi() {
        let config = CheckConfig {
            required_refs: vec![RequiredRef::doi(
                "10.1088/1748-0221/12/01/P01020",
                "trigger reference missing",
            )],
            hepdata_key: None,
            ..CheckConfig::default()
        };
        let checker = Checker::with_config(Vec::new(), config);

        let without = bib("@MISC{a,\n doi = \"10.1/other\",\n}");
        let diagnostics = checker.check(&without, &keys(&["a"]));
        assert!(diagnostics.iter().any(|d| d.message == "trigger reference missing"));

        let with = bib(concat!(
            "@MISC{a,\n doi = \"10.1/other\",\n}\n",
            "@MISC{trig,\n doi = \"10.1088/1748-0221/12/01/P01020\",\n}\n",
        ));
        let diagnostics = checker.check(&with, &keys(&["a", "trig"]));
        assert!(!diagnostics.iter().any(|d| d.message == "trigger reference missing"));
    }

    #[test]
    fn test_required_reference_must_be_cited_not_just_present() {
        let config = CheckConfig {
            required_refs: vec![RequiredRef::doi("10.1/req", "required missing")],
            hepdata_key: None,
            ..CheckConfig::default()
        };
        let checker = Checker::with_config(Vec::new(), config);
        let bib = bib("@MISC{uncited,\n doi = \"10.1/req\",\n}");
        let diagnostics = checker.check(&bib, &keys(&[]));
        assert!(diagnostics.iter().any(|d| d.message == "required missing"));
    }

    #[test]
    fn test_required_reference_by_url_fragment() {
        let config = CheckConfig {
            required_refs: vec![RequiredRef::url_fragment("2621960", "lumi record missing")],
            hepdata_key: None,
            ..CheckConfig::default()
        };
        let checker = Checker::with_config(Vec::new(), config);
        let bib = bib("@TECHREPORT{lumi,\n url = \"https://cds.cern.ch/record/2621960\",\n}");
        let diagnostics = checker.check(&bib, &keys(&["lumi"]));
        assert!(!diagnostics.iter().any(|d| d.message == "lumi record missing"));
    }

    #[test]
    fn test_hepdata_presence_check() {
        let checker = Checker::with_config(
            Vec::new(),
            CheckConfig {
                required_refs: Vec::new(),
                ..CheckConfig::default()
            },
        );

        let without = bib("@MISC{a,\n doi = \"10.1/x\",\n}");
        assert!(
            checker
                .check(&without, &keys(&["a"]))
                .iter()
                .any(|d| d.message.contains("no HEPData entry"))
        );

        // Key matching is case-insensitive and does not require citation.
        let with = bib("@MISC{hepdata,\n url = \"https://hepdata.net/record/1\",\n}");
        assert!(
            !checker
                .check(&with, &keys(&[]))
                .iter()
                .any(|d| d.message.contains("no HEPData entry"))
        );
    }
}
