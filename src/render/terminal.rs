use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use super::{
    Control, HighlightedText, LogSurface, Notice, NoticeLevel, Placeholder, RenderedEntry,
    ViewSummary,
};

/// Replaces control characters (other than newline and tab) with visible
/// escapes so log content cannot drive the terminal.
pub fn sanitize_terminal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_control() && c != '\n' && c != '\t' {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    out
}

fn colorize(text: &HighlightedText) -> String {
    text.spans()
        .iter()
        .map(|span| {
            let clean = sanitize_terminal(&span.text);
            if span.matched {
                clean.black().on_yellow().to_string()
            } else {
                clean
            }
        })
        .collect()
}

fn badge(message_type: &str) -> String {
    let label = format!("[{}]", sanitize_terminal(message_type));
    match message_type.to_lowercase().as_str() {
        "error" | "fatal" | "critical" => label.red().bold().to_string(),
        "warn" | "warning" => label.yellow().bold().to_string(),
        "debug" | "trace" => label.dimmed().to_string(),
        _ => label.green().bold().to_string(),
    }
}

/// Writes the results view as plain lines.
///
/// A deferred surface holds view lines until `flush`, so `clear` can drop
/// what a later refresh replaces. Notices are always written immediately.
pub struct TerminalSurface<W: Write> {
    out: W,
    summary: ViewSummary,
    visible: HashMap<Control, bool>,
    spinner: Option<ProgressBar>,
    show_hints: bool,
    pending: Option<Vec<String>>,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            summary: ViewSummary::default(),
            visible: HashMap::new(),
            spinner: None,
            show_hints: true,
            pending: None,
        }
    }

    pub fn deferred(out: W) -> Self {
        Self {
            pending: Some(Vec::new()),
            ..Self::new(out)
        }
    }

    /// Suppress "type `more`" style hints, for non-interactive runs.
    pub fn without_hints(mut self) -> Self {
        self.show_hints = false;
        self
    }

    pub fn is_visible(&self, control: Control) -> bool {
        self.visible.get(&control).copied().unwrap_or(false)
    }

    pub fn summary(&self) -> ViewSummary {
        self.summary
    }

    pub fn into_inner(mut self) -> W {
        self.flush();
        self.out
    }

    /// Writes any held view lines.
    pub fn flush(&mut self) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        let lines = std::mem::take(pending);
        for text in lines {
            self.emit(&text);
        }
        let _ = self.out.flush();
    }

    fn line(&mut self, text: &str) {
        match self.pending.as_mut() {
            Some(pending) => pending.push(text.to_string()),
            None => self.emit(text),
        }
    }

    fn emit(&mut self, text: &str) {
        if let Some(pb) = self.spinner.as_ref() {
            pb.suspend(|| {
                let _ = writeln!(self.out, "{text}");
            });
        } else {
            let _ = writeln!(self.out, "{text}");
        }
    }

    fn entry_lines(entry: &RenderedEntry) -> Vec<String> {
        let mut lines = Vec::with_capacity(3);
        lines.push(format!(
            "{} {} {}",
            format!("#{}", entry.position).dimmed(),
            entry.timestamp.cyan(),
            badge(&entry.message_type)
        ));
        for (i, text) in colorize(&entry.message).lines().enumerate() {
            if i == 0 {
                lines.push(format!("    {text}"));
            } else {
                lines.push(format!("      {text}"));
            }
        }
        lines.push(
            format!(
                "    client: {}  rep: {}  module: {}  type: {}  inserted: {}",
                colorize(&entry.client_id),
                colorize(&entry.repcode),
                colorize(&entry.module),
                colorize(&entry.log_type),
                entry.insert_timestamp
            )
            .dimmed()
            .to_string(),
        );
        lines
    }
}

impl<W: Write> LogSurface for TerminalSurface<W> {
    fn clear(&mut self) {
        match self.pending.as_mut() {
            Some(pending) => pending.clear(),
            None => self.emit(""),
        }
    }

    fn render(&mut self, slice: &[RenderedEntry]) {
        for entry in slice {
            for line in Self::entry_lines(entry) {
                self.line(&line);
            }
        }
    }

    fn show_placeholder(&mut self, placeholder: Placeholder) {
        let title = format!(":: {} ::", placeholder.title()).bold().to_string();
        self.line(&title);
        self.line(&format!("   {}", placeholder.hint()));
    }

    fn set_control_visible(&mut self, control: Control, visible: bool) {
        self.visible.insert(control, visible);
        if !visible || !self.show_hints {
            return;
        }
        let summary = self.summary;
        match control {
            Control::LoadMoreLocal => self.line(&format!(
                ":: {} of {} matching entries shown, type `more` for the next batch",
                summary.shown, summary.filtered
            )),
            Control::FetchMoreRemote => {
                self.line(":: more pages available on the server, type `fetch` to load them")
            }
            Control::Export | Control::Filters => {}
        }
    }

    fn set_control_enabled(&mut self, control: Control, enabled: bool) {
        if control != Control::FetchMoreRemote {
            return;
        }
        if enabled {
            if let Some(pb) = self.spinner.take() {
                pb.finish_and_clear();
            }
        } else if self.spinner.is_none() {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.blue} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message("fetching more logs from server...");
            pb.enable_steady_tick(Duration::from_millis(100));
            self.spinner = Some(pb);
        }
    }

    fn set_summary(&mut self, summary: ViewSummary) {
        self.summary = summary;
    }

    fn notify(&mut self, notice: &Notice) {
        let title = match notice.level {
            NoticeLevel::Success => notice.title.green().bold(),
            NoticeLevel::Info => notice.title.blue().bold(),
            NoticeLevel::Error => notice.title.red().bold(),
        };
        self.emit(&format!(":: {title} :: {}", sanitize_terminal(&notice.message)));
    }
}
