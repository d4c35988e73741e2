//! Normalization and re-serialization of cited entries.
//!
//! The rewriter mutates entries in place (collaboration author rewrite,
//! SISSA-style journal remapping, optional arXiv suppression) and emits them
//! in citation order using the `@TYPE{tag, NAME=\t"value", ...}` shape the
//! downstream formatting toolchain expects.

use std::fmt::Write as _;

use crate::bibtex::structure::{BibEntry, Bibliography};
use crate::{Diagnostic, Severity};

/// A journal family whose volume/year semantics differ from the norm.
///
/// The APS formats the year as the volume and the volume as the issue number
/// for SISSA journals, which use volume and year interchangeably; entries
/// must be remapped before output or the year is lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalFamily {
    /// Names under which the journal appears in bibliographies.
    pub aliases: Vec<String>,
    /// Abbreviation emitted after remapping.
    pub preferred: String,
}

impl JournalFamily {
    pub fn new(aliases: &[&str], preferred: &str) -> Self {
        JournalFamily {
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            preferred: preferred.to_string(),
        }
    }
}

/// Configuration for the rewriter.
#[derive(Debug, Clone)]
pub struct RewriteConfig {
    /// Collaboration names rewritten into a single author string.
    pub collaborations: Vec<String>,
    /// Composite collaboration names with a fixed combined author string.
    pub composite_collaborations: Vec<(String, String)>,
    /// SISSA-style journal families requiring the volume/year remap.
    pub journal_families: Vec<JournalFamily>,
    /// Entry key whose HOWPUBLISHED value is promoted into TITLE
    /// (case-insensitive match), keeping the DOI link in APS output.
    pub howpublished_title_key: String,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        RewriteConfig {
            collaborations: ["CMS", "ATLAS", "LHCb", "ALICE"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            composite_collaborations: vec![(
                "CMS-TOTEM".to_string(),
                "{CMS-TOTEM Collaboration}".to_string(),
            )],
            journal_families: vec![
                JournalFamily::new(
                    &["JHEP", "J. High Energy Phys.", "J. High Energy Physics"],
                    "J. High Energy Phys.",
                ),
                JournalFamily::new(
                    &["JINST", "J. Instrum.", "J. Instrumentation"],
                    "J. Instrum.",
                ),
            ],
            howpublished_title_key: "HEPDATA".to_string(),
        }
    }
}

/// Result of one rewrite pass.
#[derive(Debug, Clone, Default)]
pub struct RewriteOutcome {
    /// Serialized bibliography, entries in citation order.
    pub text: String,
    /// Cited keys that had no entry, and remaps that could not be applied.
    pub diagnostics: Vec<Diagnostic>,
}

/// Rewrites entries into normalized form and serializes them.
pub struct Rewriter {
    config: RewriteConfig,
}

impl Default for Rewriter {
    fn default() -> Self {
        Rewriter::new()
    }
}

impl Rewriter {
    pub fn new() -> Self {
        Rewriter {
            config: RewriteConfig::default(),
        }
    }

    pub fn with_config(config: RewriteConfig) -> Self {
        Rewriter { config }
    }

    /// Normalize every cited entry in place and serialize the result in
    /// citation order. Keys with no entry are skipped with a diagnostic.
    ///
    /// With `suppress_arxiv` set, the EPRINT field is dropped from entries
    /// that also carry a DOI (published articles keep the DOI only).
    pub fn rewrite(
        &self,
        bibliography: &mut Bibliography,
        citations: &[String],
        suppress_arxiv: bool,
    ) -> RewriteOutcome {
        let mut outcome = RewriteOutcome::default();

        for key in citations {
            let Some(entry) = bibliography.get_mut(key) else {
                outcome.diagnostics.push(Diagnostic::for_entry(
                    Severity::Warning,
                    key.clone(),
                    "skipping citation with no bibliography entry",
                ));
                continue;
            };

            self.rewrite_collaboration(entry);
            if suppress_arxiv && entry.fields.contains("EPRINT") && entry.fields.contains("DOI") {
                entry.fields.remove("EPRINT");
            }
            self.remap_sissa_journal(entry, &mut outcome.diagnostics);
            self.promote_howpublished(entry);

            serialize_entry(entry, &mut outcome.text);
        }

        outcome
    }

    /// Replace a known COLLABORATION value with the canonical author string.
    fn rewrite_collaboration(&self, entry: &mut BibEntry) {
        let Some(collaboration) = entry.fields.get("COLLABORATION") else {
            return;
        };
        let name = collaboration
            .trim_start_matches('{')
            .trim_end_matches('}')
            .to_string();

        let author = if let Some((_, combined)) = self
            .config
            .composite_collaborations
            .iter()
            .find(|(composite, _)| *composite == name)
        {
            combined.clone()
        } else if self.config.collaborations.contains(&name) {
            format!("{{{name} Collaboration}}")
        } else {
            return;
        };

        entry.fields.insert("AUTHOR", author);
        entry.fields.remove("COLLABORATION");
    }

    /// Swap YEAR into VOLUME and VOLUME into NUMBER for SISSA journals and
    /// canonicalize the journal name. Articles only.
    fn remap_sissa_journal(&self, entry: &mut BibEntry, diagnostics: &mut Vec<Diagnostic>) {
        if entry.entry_type != "ARTICLE" {
            return;
        }
        let Some(journal) = entry.fields.get("JOURNAL") else {
            return;
        };
        let Some(family) = self
            .config
            .journal_families
            .iter()
            .find(|f| f.aliases.iter().any(|a| a == journal))
        else {
            return;
        };

        let (Some(year), Some(volume)) = (
            entry.fields.get("YEAR").map(str::to_string),
            entry.fields.get("VOLUME").map(str::to_string),
        ) else {
            diagnostics.push(Diagnostic::for_entry(
                Severity::Warning,
                entry.key.clone(),
                format!("cannot remap {journal} fields: YEAR or VOLUME missing"),
            ));
            return;
        };

        entry.fields.insert("NUMBER", volume);
        entry.fields.insert("VOLUME", year);
        let preferred = family.preferred.clone();
        entry.fields.insert("JOURNAL", preferred);
    }

    /// For the HEPData entry, promote HOWPUBLISHED into TITLE so the APS
    /// style keeps the DOI link.
    fn promote_howpublished(&self, entry: &mut BibEntry) {
        if !entry
            .key
            .eq_ignore_ascii_case(&self.config.howpublished_title_key)
        {
            return;
        }
        if let Some(howpublished) = entry.fields.remove("HOWPUBLISHED") {
            entry.fields.insert("TITLE", howpublished);
        }
    }
}

/// Serialize one entry, field order preserved.
pub fn serialize_entry(entry: &BibEntry, out: &mut String) {
    let _ = writeln!(out, "@{}{{{},", entry.entry_type, entry.key);
    for field in entry.fields.iter() {
        let _ = writeln!(out, "\t{}=\t\"{}\",", field.name, field.value);
    }
    out.push_str("}\n");
}
