pub mod criteria;

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use criteria::{FieldError, FormField, Instances, SearchCriteria, SearchForm, ValidationError};

/// Rendered in place of a field that is missing, null or empty.
pub const PLACEHOLDER: &str = "N/A";

/// The well-known fields of a log record.
///
/// The live API sends snake_case keys while older deployments use
/// camelCase, so each field resolves through a list of accepted keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    ClientId,
    Repcode,
    Module,
    Type,
    MessageType,
    Timestamp,
    InsertTimestamp,
    Message,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::ClientId,
        Field::Repcode,
        Field::Module,
        Field::Type,
        Field::MessageType,
        Field::Timestamp,
        Field::InsertTimestamp,
        Field::Message,
    ];

    pub fn keys(self) -> &'static [&'static str] {
        match self {
            Field::ClientId => &["client_id", "clientId"],
            Field::Repcode => &["repcode", "rep_code", "repCode"],
            Field::Module => &["module"],
            Field::Type => &["type"],
            Field::MessageType => &["message_type", "messageType"],
            Field::Timestamp => &["timestamp"],
            Field::InsertTimestamp => &["insert_timestamp", "insertTimestamp"],
            Field::Message => &["message"],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::ClientId => "Client ID",
            Field::Repcode => "Rep Code",
            Field::Module => "Module",
            Field::Type => "Type",
            Field::MessageType => "Message Type",
            Field::Timestamp => "Timestamp",
            Field::InsertTimestamp => "Insert Timestamp",
            Field::Message => "Message",
        }
    }
}

/// One record returned by the search API, kept exactly as the server sent it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogEntry(Map<String, Value>);

impl LogEntry {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Text of a known field, or `None` when it is absent.
    pub fn get(&self, field: Field) -> Option<Cow<'_, str>> {
        field
            .keys()
            .iter()
            .filter_map(|key| self.0.get(*key))
            .find_map(value_text)
    }

    pub fn get_or_placeholder(&self, field: Field) -> Cow<'_, str> {
        self.get(field).unwrap_or(Cow::Borrowed(PLACEHOLDER))
    }

    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Every present field value coerced to text, in key order.
    pub fn text_values(&self) -> impl Iterator<Item = Cow<'_, str>> {
        self.0.values().filter_map(value_text)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for LogEntry {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

pub(crate) fn value_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        other => Some(Cow::Owned(other.to_string())),
    }
}

/// Opaque pagination cursor issued by the server as `searchAfter`.
///
/// Never inspected; its presence is the only signal that more pages exist.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(Value);

impl ContinuationToken {
    /// Wraps a raw value, treating JSON `null` as "no token".
    pub fn new(value: Value) -> Option<Self> {
        if value.is_null() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<&str> for ContinuationToken {
    fn from(value: &str) -> Self {
        Self(Value::String(value.to_string()))
    }
}
