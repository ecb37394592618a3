use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde_json::Value;
use thiserror::Error;

use crate::model::{Field, LogEntry, SearchCriteria, PLACEHOLDER};
use crate::utils::sanitize_filename_component;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Txt,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "txt" | "text" => Some(Self::Txt),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Txt => "txt",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
            ExportFormat::Txt => "text/plain",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::Json => "JSON",
            ExportFormat::Txt => "TXT",
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<ExportFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".csv") {
        return Some(ExportFormat::Csv);
    }
    if lower.ends_with(".json") {
        return Some(ExportFormat::Json);
    }
    if lower.ends_with(".txt") {
        return Some(ExportFormat::Txt);
    }
    None
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportFile {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: &'static str,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExportError {
    #[error("No logs to export.")]
    NothingToExport,

    #[error("failed to serialize logs: {message}")]
    Serialize { message: String },
}

/// Serializes `entries` for download.
pub fn export(
    entries: &[&LogEntry],
    format: ExportFormat,
    criteria: Option<&SearchCriteria>,
    now: DateTime<Utc>,
) -> Result<ExportFile, ExportError> {
    if entries.is_empty() {
        return Err(ExportError::NothingToExport);
    }
    let bytes = match format {
        ExportFormat::Csv => render_csv(entries),
        ExportFormat::Json => render_json(entries).map_err(|e| ExportError::Serialize {
            message: e.to_string(),
        })?,
        ExportFormat::Txt => render_txt(entries),
    };
    Ok(ExportFile {
        bytes,
        filename: export_filename(format, criteria, now),
        mime_type: format.mime_type(),
    })
}

/// `logs_<client>_<rep>_<start>_<type>_<stamp>.<ext>`, or `logs_<stamp>.<ext>`
/// when no search is known.
pub fn export_filename(
    format: ExportFormat,
    criteria: Option<&SearchCriteria>,
    now: DateTime<Utc>,
) -> String {
    let stamp = now.format("%Y-%m-%dT%H-%M-%S");
    match criteria {
        Some(c) => format!(
            "logs_{}_{}_{}_{}_{stamp}.{}",
            sanitize_filename_component(&c.client_id),
            sanitize_filename_component(&c.repcode),
            sanitize_filename_component(&c.start_date),
            sanitize_filename_component(&c.log_type),
            format.extension()
        ),
        None => format!("logs_{stamp}.{}", format.extension()),
    }
}

fn csv_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn csv_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Header from the first entry's keys; every field quoted.
pub fn render_csv(entries: &[&LogEntry]) -> Vec<u8> {
    let Some(first) = entries.first() else {
        return Vec::new();
    };
    let headers: Vec<&str> = first.keys().collect();
    let mut rows = Vec::with_capacity(entries.len() + 1);
    rows.push(headers.iter().map(|h| csv_quote(h)).join(","));
    for entry in entries {
        rows.push(
            headers
                .iter()
                .map(|h| csv_quote(&csv_value(entry.raw(h))))
                .join(","),
        );
    }
    rows.join("\n").into_bytes()
}

pub fn render_json(entries: &[&LogEntry]) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec_pretty(entries)
}

pub fn render_txt(entries: &[&LogEntry]) -> Vec<u8> {
    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("=== Log Entry {} ===\n", i + 1));
        for field in Field::ALL {
            let value = entry.get(field);
            out.push_str(&format!(
                "{}: {}\n",
                field.label(),
                value.as_deref().unwrap_or(PLACEHOLDER)
            ));
        }
    }
    out.into_bytes()
}
