use crate::model::{ContinuationToken, LogEntry};

/// Accumulated log records plus the token for the next page.
///
/// Entries are kept in arrival order and are never removed, reordered or
/// edited once stored; only `reset` replaces the collection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogStore {
    entries: Vec<LogEntry>,
    token: Option<ContinuationToken>,
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self, entries: Vec<LogEntry>, token: Option<ContinuationToken>) {
        self.entries = entries;
        self.token = token;
    }

    /// Adds a later page; the previous token is superseded.
    pub fn append(&mut self, entries: Vec<LogEntry>, token: Option<ContinuationToken>) {
        self.entries.extend(entries);
        self.token = token;
    }

    pub fn all(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn token(&self) -> Option<&ContinuationToken> {
        self.token.as_ref()
    }

    pub fn has_more(&self) -> bool {
        self.token.is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
