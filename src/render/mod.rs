pub mod html;
pub mod terminal;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::filter::SearchTerm;
use crate::model::{Field, LogEntry, PLACEHOLDER};

pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Returns the next window of `filtered` starting at `cursor`, and the cursor
/// positioned after it.
pub fn render_next<T>(filtered: &[T], cursor: usize, page_size: usize) -> (&[T], usize) {
    let start = cursor.min(filtered.len());
    let end = start.saturating_add(page_size.max(1)).min(filtered.len());
    (&filtered[start..end], end)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub matched: bool,
}

/// Text split into plain and search-matched spans.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HighlightedText {
    spans: Vec<Span>,
}

impl HighlightedText {
    pub fn plain(text: &str) -> Self {
        let mut out = Self::default();
        out.push(text, false);
        out
    }

    pub fn new(text: &str, term: &SearchTerm) -> Self {
        let Some(re) = term.pattern() else {
            return Self::plain(text);
        };
        let mut out = Self::default();
        let mut last = 0;
        for m in re.find_iter(text) {
            out.push(&text[last..m.start()], false);
            out.push(m.as_str(), true);
            last = m.end();
        }
        out.push(&text[last..], false);
        out
    }

    fn push(&mut self, text: &str, matched: bool) {
        if !text.is_empty() {
            self.spans.push(Span {
                text: text.to_string(),
                matched,
            });
        }
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn has_match(&self) -> bool {
        self.spans.iter().any(|s| s.matched)
    }

    pub fn to_plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// Escaped markup with matches wrapped in a `search-highlight` span.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for span in &self.spans {
            if span.matched {
                out.push_str(r#"<span class="search-highlight">"#);
                out.push_str(&escape_html(&span.text));
                out.push_str("</span>");
            } else {
                out.push_str(&escape_html(&span.text));
            }
        }
        out
    }
}

pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}

const TIMESTAMP_LAYOUTS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// `MM/DD/YYYY, HH:MM:SS` when parseable, the raw value otherwise.
pub fn format_timestamp(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return PLACEHOLDER.to_string();
    };
    const DISPLAY: &str = "%m/%d/%Y, %H:%M:%S";
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(DISPLAY).to_string();
    }
    for layout in TIMESTAMP_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, layout) {
            return dt.format(DISPLAY).to_string();
        }
    }
    // date-only values are taken as midnight
    if let Some(dt) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return dt.format(DISPLAY).to_string();
    }
    raw.to_string()
}

/// Display form of one entry in the filtered view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedEntry {
    /// 1-based position within the filtered view.
    pub position: usize,
    pub message: HighlightedText,
    pub client_id: HighlightedText,
    pub repcode: HighlightedText,
    pub module: HighlightedText,
    pub log_type: HighlightedText,
    pub message_type: String,
    pub timestamp: String,
    pub insert_timestamp: String,
}

impl RenderedEntry {
    pub fn build(entry: &LogEntry, position: usize, term: &SearchTerm) -> Self {
        let message = entry
            .get(Field::Message)
            .map(|m| m.into_owned())
            .unwrap_or_else(|| format!("Log Entry {position}"));
        let field = |f: Field| HighlightedText::new(&entry.get_or_placeholder(f), term);
        Self {
            position,
            message: HighlightedText::new(&message, term),
            client_id: field(Field::ClientId),
            repcode: field(Field::Repcode),
            module: field(Field::Module),
            log_type: field(Field::Type),
            message_type: entry
                .get(Field::MessageType)
                .map(|t| t.to_uppercase())
                .unwrap_or_else(|| "INFO".to_string()),
            timestamp: format_timestamp(entry.get(Field::Timestamp).as_deref()),
            insert_timestamp: format_timestamp(entry.get(Field::InsertTimestamp).as_deref()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Control {
    LoadMoreLocal,
    FetchMoreRemote,
    Export,
    Filters,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placeholder {
    /// Nothing was ever fetched for the current search.
    NoData,
    /// Entries exist but none pass the active filter and search term.
    NoMatches,
}

impl Placeholder {
    pub fn title(self) -> &'static str {
        match self {
            Placeholder::NoData => "No log entries found",
            Placeholder::NoMatches => "No matching log entries",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            Placeholder::NoData => "Try adjusting your search criteria",
            Placeholder::NoMatches => "Try a different search term or clear filters",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A user-facing message raised at an operation boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewSummary {
    pub total: usize,
    pub filtered: usize,
    pub shown: usize,
}

/// Display capability the controller drives.
pub trait LogSurface {
    fn clear(&mut self);
    /// Appends entries below whatever is already displayed.
    fn render(&mut self, slice: &[RenderedEntry]);
    fn show_placeholder(&mut self, placeholder: Placeholder);
    fn set_control_visible(&mut self, control: Control, visible: bool);
    fn set_control_enabled(&mut self, control: Control, enabled: bool);
    fn set_summary(&mut self, summary: ViewSummary);
    fn notify(&mut self, notice: &Notice);
}

/// Fans every call out to both surfaces.
impl<A: LogSurface, B: LogSurface> LogSurface for (A, B) {
    fn clear(&mut self) {
        self.0.clear();
        self.1.clear();
    }

    fn render(&mut self, slice: &[RenderedEntry]) {
        self.0.render(slice);
        self.1.render(slice);
    }

    fn show_placeholder(&mut self, placeholder: Placeholder) {
        self.0.show_placeholder(placeholder);
        self.1.show_placeholder(placeholder);
    }

    fn set_control_visible(&mut self, control: Control, visible: bool) {
        self.0.set_control_visible(control, visible);
        self.1.set_control_visible(control, visible);
    }

    fn set_control_enabled(&mut self, control: Control, enabled: bool) {
        self.0.set_control_enabled(control, enabled);
        self.1.set_control_enabled(control, enabled);
    }

    fn set_summary(&mut self, summary: ViewSummary) {
        self.0.set_summary(summary);
        self.1.set_summary(summary);
    }

    fn notify(&mut self, notice: &Notice) {
        self.0.notify(notice);
        self.1.notify(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_next_walks_windows() {
        let items: Vec<u32> = (0..5).collect();
        let (first, cursor) = render_next(&items, 0, 2);
        assert_eq!(first, &[0, 1]);
        assert_eq!(cursor, 2);
        let (second, cursor) = render_next(&items, cursor, 2);
        assert_eq!(second, &[2, 3]);
        let (last, cursor) = render_next(&items, cursor, 2);
        assert_eq!(last, &[4]);
        assert_eq!(cursor, 5);
        let (none, cursor) = render_next(&items, cursor, 2);
        assert!(none.is_empty());
        assert_eq!(cursor, 5);
    }

    #[test]
    fn highlight_wraps_every_case_insensitive_match() {
        let text = HighlightedText::new("Error: error again", &SearchTerm::new("ERROR"));
        assert_eq!(
            text.to_html(),
            r#"<span class="search-highlight">Error</span>: <span class="search-highlight">error</span> again"#
        );
    }

    #[test]
    fn markup_in_log_text_is_escaped() {
        let text = HighlightedText::new("<script>alert('x')</script>", &SearchTerm::new("alert"));
        assert_eq!(
            text.to_html(),
            r#"&lt;script&gt;<span class="search-highlight">alert</span>(&#039;x&#039;)&lt;/script&gt;"#
        );
        assert!(!HighlightedText::plain("a & b").to_html().contains("& "));
    }

    #[test]
    fn empty_term_highlights_nothing() {
        let text = HighlightedText::new("anything", &SearchTerm::default());
        assert!(!text.has_match());
        assert_eq!(text.to_plain_text(), "anything");
    }

    #[test]
    fn format_timestamp_handles_parseable_raw_and_missing() {
        assert_eq!(
            format_timestamp(Some("2024-03-05T14:07:09Z")),
            "03/05/2024, 14:07:09"
        );
        assert_eq!(
            format_timestamp(Some("2024-03-05 14:07:09.123")),
            "03/05/2024, 14:07:09"
        );
        assert_eq!(format_timestamp(Some("2024-03-05")), "03/05/2024, 00:00:00");
        assert_eq!(format_timestamp(Some("yesterday-ish")), "yesterday-ish");
        assert_eq!(format_timestamp(None), PLACEHOLDER);
    }

    #[test]
    fn rendered_entry_falls_back_for_missing_fields() {
        let entry = LogEntry::from_pairs([("client_id", "ACME")]);
        let rendered = RenderedEntry::build(&entry, 7, &SearchTerm::new("acme"));
        assert_eq!(rendered.message.to_plain_text(), "Log Entry 7");
        assert_eq!(rendered.message_type, "INFO");
        assert_eq!(rendered.repcode.to_plain_text(), PLACEHOLDER);
        assert!(rendered.client_id.has_match());
        assert_eq!(rendered.timestamp, PLACEHOLDER);
    }
}
