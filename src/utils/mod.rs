use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use tokio::sync::mpsc;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y"];

/// Normalizes a user supplied date to `YYYY-MM-DD`.
pub fn normalize_date(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("date is empty".to_string());
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date.format("%Y-%m-%d").to_string());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.date_naive().format("%Y-%m-%d").to_string());
    }
    Err(format!("unrecognized date '{trimmed}'"))
}

/// Replaces anything outside `[A-Za-z0-9._-]` so a value is safe inside a filename.
pub fn sanitize_filename_component(value: &str) -> String {
    let out: String = value
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    if out.is_empty() {
        "none".to_string()
    } else {
        out
    }
}

/// Forwards only the last value of every burst: a value is emitted once no
/// newer one has arrived for `quiet`. Pending input is flushed when the
/// sender side closes.
pub fn debounce<T: Send + 'static>(mut input: mpsc::Receiver<T>, quiet: Duration) -> mpsc::Receiver<T> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut pending: Option<T> = None;
        loop {
            if pending.is_none() {
                match input.recv().await {
                    Some(value) => pending = Some(value),
                    None => break,
                }
                continue;
            }
            match tokio::time::timeout(quiet, input.recv()).await {
                Ok(Some(value)) => pending = Some(value),
                Ok(None) => {
                    if let Some(value) = pending.take() {
                        let _ = tx.send(value).await;
                    }
                    break;
                }
                Err(_) => {
                    if let Some(value) = pending.take() {
                        if tx.send(value).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    });
    rx
}
