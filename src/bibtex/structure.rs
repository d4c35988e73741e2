//! Core data model for parsed bibliographies.
//!
//! Field names and entry types are canonicalized to uppercase at
//! construction; per-entry field order and bibliography entry order are
//! preserved for faithful rewriting.

use std::collections::HashMap;

use compact_str::{CompactString, ToCompactString};
use serde::{Deserialize, Serialize};

/// One `NAME = value` pair of a bibliography entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Canonical uppercase field name, e.g. `AUTHOR`.
    pub name: CompactString,
    pub value: String,
}

/// An insertion-ordered field mapping with canonical-uppercase lookup.
///
/// Entries carry few fields, so lookup is a linear scan over the field list
/// rather than a separate index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    fields: Vec<Field>,
}

impl FieldMap {
    pub fn new() -> Self {
        FieldMap::default()
    }

    /// Value of the named field, if present. Lookup is case-insensitive.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set a field's value. An existing field keeps its position; a new
    /// field is appended. The name is canonicalized to uppercase.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .fields
            .iter_mut()
            .find(|f| f.name.eq_ignore_ascii_case(name))
        {
            Some(field) => field.value = value,
            None => self.fields.push(Field {
                name: name.to_uppercase().to_compact_string(),
                value,
            }),
        }
    }

    /// Remove a field, returning its value if it was present.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self
            .fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))?;
        Some(self.fields.remove(pos).value)
    }

    /// Fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A single bibliographic record: type, tag, and ordered fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibEntry {
    /// Canonical uppercase entry type, e.g. `ARTICLE` or `TECHREPORT`.
    pub entry_type: CompactString,
    /// Citation key used to reference the entry from the document.
    pub key: String,
    pub fields: FieldMap,
}

impl BibEntry {
    pub fn new(entry_type: &str, key: impl Into<String>) -> Self {
        BibEntry {
            entry_type: entry_type.to_uppercase().to_compact_string(),
            key: key.into(),
            fields: FieldMap::new(),
        }
    }
}

/// All entries of one bibliography, in file order, indexed by key.
///
/// Keys are unique: the first occurrence wins and later duplicates are
/// refused by [`Bibliography::insert`] so the parser can report them.
#[derive(Debug, Clone, Default)]
pub struct Bibliography {
    entries: Vec<BibEntry>,
    index: HashMap<String, usize>,
}

impl Bibliography {
    pub fn new() -> Self {
        Bibliography::default()
    }

    /// Add an entry. Returns `false` without modifying anything if an entry
    /// with the same key is already present.
    pub fn insert(&mut self, entry: BibEntry) -> bool {
        if self.index.contains_key(&entry.key) {
            return false;
        }
        self.index.insert(entry.key.clone(), self.entries.len());
        self.entries.push(entry);
        true
    }

    pub fn get(&self, key: &str) -> Option<&BibEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut BibEntry> {
        self.index.get(key).map(|&i| &mut self.entries[i])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Entries in bibliography file order.
    pub fn iter(&self) -> impl Iterator<Item = &BibEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
