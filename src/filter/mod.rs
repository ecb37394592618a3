//! Visible-subset computation for the results view.
//!
//! Free-text search always scans every field of an entry. Which field the
//! type filter compares against is configurable, since deployments disagree
//! on whether the category lives in `message_type` or `type`.

use regex::{Regex, RegexBuilder};

use crate::model::{Field, LogEntry};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TypeField {
    #[default]
    MessageType,
    Type,
}

impl TypeField {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "message_type" | "messagetype" | "message-type" => Some(Self::MessageType),
            "type" => Some(Self::Type),
            _ => None,
        }
    }

    pub fn field(self) -> Field {
        match self {
            TypeField::MessageType => Field::MessageType,
            TypeField::Type => Field::Type,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TypeFilter {
    #[default]
    All,
    Only(String),
}

impl TypeFilter {
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Only(trimmed.to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TypeFilter::All => "all",
            TypeFilter::Only(t) => t,
        }
    }
}

/// A trimmed, case-insensitive literal search term.
#[derive(Clone, Debug, Default)]
pub struct SearchTerm {
    raw: String,
    lowered: String,
    pattern: Option<Regex>,
}

impl SearchTerm {
    pub fn new(value: &str) -> Self {
        let raw = value.trim().to_string();
        if raw.is_empty() {
            return Self::default();
        }
        let pattern = RegexBuilder::new(&regex::escape(&raw))
            .case_insensitive(true)
            .build()
            .ok();
        Self {
            lowered: raw.to_lowercase(),
            raw,
            pattern,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn is_match(&self, text: &str) -> bool {
        if self.raw.is_empty() {
            return true;
        }
        match &self.pattern {
            Some(re) => re.is_match(text),
            None => text.to_lowercase().contains(&self.lowered),
        }
    }

    /// Compiled matcher used for highlighting; `None` for an empty term.
    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }
}

impl PartialEq for SearchTerm {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for SearchTerm {}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FilterEngine {
    type_field: TypeField,
}

impl FilterEngine {
    pub fn new(type_field: TypeField) -> Self {
        Self { type_field }
    }

    pub fn type_field(&self) -> TypeField {
        self.type_field
    }

    pub fn matches_type(&self, entry: &LogEntry, filter: &TypeFilter) -> bool {
        match filter {
            TypeFilter::All => true,
            TypeFilter::Only(wanted) => entry
                .get(self.type_field.field())
                .map(|v| v.to_lowercase() == wanted.to_lowercase())
                .unwrap_or(false),
        }
    }

    pub fn matches_search(&self, entry: &LogEntry, term: &SearchTerm) -> bool {
        term.is_empty() || entry.text_values().any(|v| term.is_match(&v))
    }

    pub fn matches(&self, entry: &LogEntry, filter: &TypeFilter, term: &SearchTerm) -> bool {
        self.matches_type(entry, filter) && self.matches_search(entry, term)
    }

    /// Positions of the kept entries, in input order.
    pub fn select(&self, entries: &[LogEntry], filter: &TypeFilter, term: &SearchTerm) -> Vec<usize> {
        entries
            .iter()
            .enumerate()
            .filter(|(_, e)| self.matches(e, filter, term))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn compute<'a>(
        &self,
        entries: &'a [LogEntry],
        filter: &TypeFilter,
        term: &SearchTerm,
    ) -> Vec<&'a LogEntry> {
        entries
            .iter()
            .filter(|e| self.matches(e, filter, term))
            .collect()
    }
}
