use super::{
    escape_html, Control, LogSurface, Notice, NoticeLevel, Placeholder, RenderedEntry,
    ViewSummary,
};

fn entry_html(entry: &RenderedEntry) -> String {
    let kind = escape_html(&entry.message_type.to_lowercase());
    format!(
        r#"    <div class="log-entry {kind} rounded-xl border border-slate-200 bg-white p-4 mb-3">
      <div class="flex items-start justify-between gap-4">
        <div class="log-message font-medium">{message}</div>
        <div class="log-meta flex items-center gap-2 text-xs text-slate-500">
          <span class="timestamp">{timestamp}</span>
          <span class="message-type-badge {kind} rounded px-2 py-0.5 font-bold">{badge}</span>
        </div>
      </div>
      <div class="log-details mt-2 grid grid-cols-5 gap-2 text-xs">
        <div><span class="detail-label text-slate-400">Client ID</span> <span class="detail-value">{client_id}</span></div>
        <div><span class="detail-label text-slate-400">Rep Code</span> <span class="detail-value">{repcode}</span></div>
        <div><span class="detail-label text-slate-400">Module</span> <span class="detail-value">{module}</span></div>
        <div><span class="detail-label text-slate-400">Type</span> <span class="detail-value">{log_type}</span></div>
        <div><span class="detail-label text-slate-400">Insert Time</span> <span class="detail-value">{inserted}</span></div>
      </div>
    </div>
"#,
        kind = kind,
        message = entry.message.to_html(),
        timestamp = escape_html(&entry.timestamp),
        badge = escape_html(&entry.message_type),
        client_id = entry.client_id.to_html(),
        repcode = entry.repcode.to_html(),
        module = entry.module.to_html(),
        log_type = entry.log_type.to_html(),
        inserted = escape_html(&entry.insert_timestamp),
    )
}

fn placeholder_html(placeholder: Placeholder) -> String {
    let class = match placeholder {
        Placeholder::NoData => "no-data",
        Placeholder::NoMatches => "no-search-results",
    };
    format!(
        r#"    <div class="{class} text-center py-16">
      <h3 class="text-lg font-bold">{}</h3>
      <p class="text-slate-500">{}</p>
    </div>
"#,
        escape_html(placeholder.title()),
        escape_html(placeholder.hint()),
    )
}

/// Accumulates the results view as markup for a standalone snapshot page.
#[derive(Clone, Debug, Default)]
pub struct HtmlSurface {
    body: String,
    summary: ViewSummary,
    load_more: bool,
    fetch_more: bool,
    notices: Vec<Notice>,
}

impl HtmlSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn document(&self, title: &str) -> String {
        let mut footer = String::new();
        if self.load_more {
            footer.push_str(r#"<p class="load-more">More matching entries are available locally.</p>"#);
        }
        if self.fetch_more {
            footer.push_str(r#"<p class="fetch-more">More pages are available on the server.</p>"#);
        }
        let notices: String = self
            .notices
            .iter()
            .map(|n| {
                let class = match n.level {
                    NoticeLevel::Success => "notice-success",
                    NoticeLevel::Info => "notice-info",
                    NoticeLevel::Error => "notice-error",
                };
                format!(
                    r#"<div class="{class} text-sm"><strong>{}</strong> {}</div>"#,
                    escape_html(&n.title),
                    escape_html(&n.message)
                )
            })
            .collect();

        format!(
            r####"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8"/>
  <meta content="width=device-width, initial-scale=1.0" name="viewport"/>
  <title>{title}</title>
  <script src="https://cdn.tailwindcss.com"></script>
  <style>
    body {{ font-family: 'Inter', sans-serif; }}
    .search-highlight {{ background: #fde047; border-radius: 2px; }}
    .message-type-badge.error {{ background: #fee2e2; color: #b91c1c; }}
    .message-type-badge.warn {{ background: #fef3c7; color: #b45309; }}
    .message-type-badge.info {{ background: #dbeafe; color: #1d4ed8; }}
  </style>
</head>
<body class="bg-slate-50 text-slate-900 min-h-screen">
  <main class="max-w-[1200px] mx-auto px-8 py-10">
    <h1 class="text-3xl font-bold mb-2">{title}</h1>
    <p id="results-total" class="text-sm text-slate-500 mb-6">{shown} shown of {filtered} matching ({total} total)</p>
    <div class="notices mb-4">{notices}</div>
    <div id="logsList">
{body}    </div>
    <div class="mt-6 text-sm text-slate-500">{footer}</div>
  </main>
</body>
</html>
"####,
            title = escape_html(title),
            shown = self.summary.shown,
            filtered = self.summary.filtered,
            total = self.summary.total,
            notices = notices,
            body = self.body,
            footer = footer,
        )
    }
}

impl LogSurface for HtmlSurface {
    fn clear(&mut self) {
        self.body.clear();
    }

    fn render(&mut self, slice: &[RenderedEntry]) {
        for entry in slice {
            self.body.push_str(&entry_html(entry));
        }
    }

    fn show_placeholder(&mut self, placeholder: Placeholder) {
        self.body.push_str(&placeholder_html(placeholder));
    }

    fn set_control_visible(&mut self, control: Control, visible: bool) {
        match control {
            Control::LoadMoreLocal => self.load_more = visible,
            Control::FetchMoreRemote => self.fetch_more = visible,
            Control::Export | Control::Filters => {}
        }
    }

    fn set_control_enabled(&mut self, _control: Control, _enabled: bool) {}

    fn set_summary(&mut self, summary: ViewSummary) {
        self.summary = summary;
    }

    fn notify(&mut self, notice: &Notice) {
        self.notices.push(notice.clone());
    }
}
