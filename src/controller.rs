use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::{FetchError, SearchApi, SearchRequest};
use crate::filter::{FilterEngine, SearchTerm, TypeField, TypeFilter};
use crate::model::{ContinuationToken, Instances, LogEntry, SearchCriteria, SearchForm, ValidationError};
use crate::output::{self, ExportError, ExportFile, ExportFormat};
use crate::render::{
    render_next, Control, LogSurface, Notice, Placeholder, RenderedEntry, ViewSummary,
    DEFAULT_PAGE_SIZE,
};
use crate::store::LogStore;

#[derive(Clone, Debug)]
pub struct ControllerOptions {
    pub instances: Instances,
    pub page_size: usize,
    pub type_field: TypeField,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            instances: Instances::default(),
            page_size: DEFAULT_PAGE_SIZE,
            type_field: TypeField::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("network error: {source}")]
    Transport {
        #[source]
        source: FetchError,
    },

    #[error("API error: {message}")]
    Api { status: Option<u16>, message: String },

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("no active search")]
    NoActiveSearch,

    #[error("unknown instance: {name}")]
    UnknownInstance { name: String },
}

impl From<FetchError> for ControllerError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Transport { .. } => ControllerError::Transport { source: err },
            FetchError::Status { status, message } => ControllerError::Api {
                status: Some(status),
                message,
            },
            FetchError::Rejected { message } => ControllerError::Api {
                status: None,
                message,
            },
            FetchError::Decode { .. } => ControllerError::Api {
                status: None,
                message: "Invalid response format from server".to_string(),
            },
        }
    }
}

impl ControllerError {
    pub fn notice(&self) -> Notice {
        match self {
            ControllerError::Validation(e) => Notice::error("Validation Error", e.to_string()),
            ControllerError::Transport { source } => Notice::error(
                "Network Error",
                format!("Failed to reach the log service. Please check your connection. ({source})"),
            ),
            ControllerError::Api { status, message } => {
                let message = if message.trim().is_empty() {
                    "Something went wrong".to_string()
                } else {
                    message.clone()
                };
                match status {
                    Some(code) => Notice::error("API Error", format!("HTTP {code}: {message}")),
                    None => Notice::error("API Error", message),
                }
            }
            ControllerError::Export(e) => Notice::error("Export Error", e.to_string()),
            ControllerError::NoActiveSearch => {
                Notice::error("Error", "No search is active. Please search again.")
            }
            ControllerError::UnknownInstance { name } => {
                Notice::error("Error", format!("Invalid API configuration for instance '{name}'"))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No results view is open.
    Closed,
    /// The last search succeeded with zero entries.
    NoData,
    Results,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FetchState {
    #[default]
    Idle,
    InFlight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Results { total: usize },
    NoData,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewState {
    pub filter: TypeFilter,
    pub term: SearchTerm,
    /// How many filtered entries have been rendered so far.
    pub cursor: usize,
}

/// Owns the fetched logs and the view over them, and drives a `LogSurface`.
///
/// Every handler catches its own failures, reports them through
/// `LogSurface::notify`, and returns them to the caller for inspection. A
/// failed request never touches the stored entries.
pub struct ViewController<A, S> {
    api: A,
    surface: S,
    options: ControllerOptions,
    engine: FilterEngine,
    store: LogStore,
    criteria: Option<SearchCriteria>,
    view: ViewState,
    filtered: Vec<usize>,
    phase: Phase,
    fetch: FetchState,
}

impl<A: SearchApi, S: LogSurface> ViewController<A, S> {
    pub fn new(api: A, surface: S, options: ControllerOptions) -> Self {
        Self {
            api,
            surface,
            engine: FilterEngine::new(options.type_field),
            options,
            store: LogStore::new(),
            criteria: None,
            view: ViewState::default(),
            filtered: Vec::new(),
            phase: Phase::Closed,
            fetch: FetchState::Idle,
        }
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    pub fn criteria(&self) -> Option<&SearchCriteria> {
        self.criteria.as_ref()
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.fetch == FetchState::InFlight
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn filtered(&self) -> Vec<&LogEntry> {
        let all = self.store.all();
        self.filtered.iter().map(|&i| &all[i]).collect()
    }

    pub fn summary(&self) -> ViewSummary {
        ViewSummary {
            total: self.store.len(),
            filtered: self.filtered.len(),
            shown: self.view.cursor,
        }
    }

    /// Validates the form and runs a fresh search.
    pub async fn submit(&mut self, form: &SearchForm) -> Result<SubmitOutcome, ControllerError> {
        let result = self.try_submit(form).await;
        if let Err(err) = &result {
            warn!(error = %err, "search failed");
            self.surface.notify(&err.notice());
        }
        result
    }

    async fn try_submit(&mut self, form: &SearchForm) -> Result<SubmitOutcome, ControllerError> {
        let criteria = form.validate(&self.options.instances)?;
        let endpoint = self.endpoint(&criteria)?;
        let request = SearchRequest::new(&criteria, None);
        let page = self.api.search(&endpoint, &request).await?;
        info!(
            entries = page.entries.len(),
            has_more = page.token.is_some(),
            message = %page.message,
            "search completed"
        );
        Ok(self.open(page.entries, page.token, Some(criteria)))
    }

    /// Opens the results view on an already fetched first page.
    pub fn open(
        &mut self,
        entries: Vec<LogEntry>,
        token: Option<ContinuationToken>,
        criteria: Option<SearchCriteria>,
    ) -> SubmitOutcome {
        self.store.reset(entries, token);
        self.criteria = criteria;
        self.view = ViewState::default();
        self.filtered.clear();
        self.fetch = FetchState::Idle;

        if self.store.is_empty() {
            self.phase = Phase::NoData;
            self.surface.clear();
            self.surface.show_placeholder(Placeholder::NoData);
            self.surface.set_summary(self.summary());
            for control in [
                Control::Filters,
                Control::Export,
                Control::LoadMoreLocal,
                Control::FetchMoreRemote,
            ] {
                self.surface.set_control_visible(control, false);
            }
            self.surface.notify(&Notice::info(
                "No Data",
                "No log entries found. Please try a different search.",
            ));
            return SubmitOutcome::NoData;
        }

        self.phase = Phase::Results;
        self.surface.set_control_visible(Control::Filters, true);
        self.surface.set_control_visible(Control::Export, true);
        self.refresh();
        SubmitOutcome::Results {
            total: self.store.len(),
        }
    }

    pub fn set_search_term(&mut self, raw: &str) {
        let term = SearchTerm::new(raw);
        if self.phase != Phase::Results || term == self.view.term {
            return;
        }
        self.view.term = term;
        self.refresh();
    }

    pub fn set_filter(&mut self, filter: TypeFilter) {
        if self.phase != Phase::Results || filter == self.view.filter {
            return;
        }
        self.view.filter = filter;
        self.refresh();
    }

    pub fn clear_filters(&mut self) {
        if self.phase != Phase::Results {
            return;
        }
        self.view.filter = TypeFilter::All;
        self.view.term = SearchTerm::default();
        self.refresh();
    }

    /// Reveals the next window of already fetched entries. Returns how many
    /// were rendered.
    pub fn load_more_local(&mut self) -> usize {
        if self.phase != Phase::Results || self.view.cursor >= self.filtered.len() {
            return 0;
        }
        let rendered = self.render_window();
        self.update_controls();
        rendered
    }

    /// Requests the next server page and appends it. Returns how many entries
    /// arrived; 0 when there is nothing to fetch or a fetch is already running.
    pub async fn fetch_more(&mut self) -> Result<usize, ControllerError> {
        if self.phase != Phase::Results || !self.store.has_more() || self.is_busy() {
            return Ok(0);
        }
        let result = self.try_fetch_more().await;
        self.fetch = FetchState::Idle;
        self.update_controls();
        match result {
            Ok(count) => {
                self.surface.notify(&Notice::success(
                    "Success",
                    format!("Loaded {count} more log entries"),
                ));
                Ok(count)
            }
            Err(err) => {
                warn!(error = %err, "fetch more failed");
                self.surface.notify(&err.notice());
                Err(err)
            }
        }
    }

    async fn try_fetch_more(&mut self) -> Result<usize, ControllerError> {
        let criteria = self.criteria.clone().ok_or(ControllerError::NoActiveSearch)?;
        let endpoint = self.endpoint(&criteria)?;
        let request = SearchRequest::new(&criteria, self.store.token());

        self.fetch = FetchState::InFlight;
        self.update_controls();
        let page = self.api.search(&endpoint, &request).await?;

        let count = page.entries.len();
        self.absorb(page.entries, page.token);
        info!(
            appended = count,
            total = self.store.len(),
            has_more = self.store.has_more(),
            "appended log page"
        );
        Ok(count)
    }

    /// Exports the current filtered view.
    pub fn export(
        &mut self,
        format: ExportFormat,
        now: DateTime<Utc>,
    ) -> Result<ExportFile, ControllerError> {
        let result = output::export(&self.filtered(), format, self.criteria.as_ref(), now)
            .map_err(ControllerError::from);
        match &result {
            Ok(file) => {
                debug!(filename = %file.filename, bytes = file.bytes.len(), "export ready");
                self.surface.notify(&Notice::success(
                    "Export Success",
                    format!("Data exported successfully as {}", format.label()),
                ));
            }
            Err(err) => self.surface.notify(&err.notice()),
        }
        result
    }

    /// Discards everything held for the results view.
    pub fn close(&mut self) {
        self.store.reset(Vec::new(), None);
        self.criteria = None;
        self.view = ViewState::default();
        self.filtered.clear();
        self.phase = Phase::Closed;
        self.fetch = FetchState::Idle;
        self.surface.clear();
        for control in [
            Control::Filters,
            Control::Export,
            Control::LoadMoreLocal,
            Control::FetchMoreRemote,
        ] {
            self.surface.set_control_visible(control, false);
        }
    }

    fn endpoint(&self, criteria: &SearchCriteria) -> Result<String, ControllerError> {
        self.options
            .instances
            .endpoint(&criteria.instance)
            .map(str::to_string)
            .ok_or_else(|| ControllerError::UnknownInstance {
                name: criteria.instance.clone(),
            })
    }

    /// Recomputes the filtered view and rebuilds the display from the top.
    fn refresh(&mut self) {
        self.filtered = self
            .engine
            .select(self.store.all(), &self.view.filter, &self.view.term);
        self.view.cursor = 0;
        debug!(
            filter = self.view.filter.label(),
            term = self.view.term.as_str(),
            matched = self.filtered.len(),
            "recomputed view"
        );
        self.surface.clear();
        if self.filtered.is_empty() {
            self.surface.show_placeholder(Placeholder::NoMatches);
        } else {
            self.render_window();
        }
        self.update_controls();
    }

    fn render_window(&mut self) -> usize {
        let (slice, next) = render_next(&self.filtered, self.view.cursor, self.options.page_size);
        let all = self.store.all();
        let start = self.view.cursor;
        let rendered: Vec<RenderedEntry> = slice
            .iter()
            .enumerate()
            .map(|(i, &pos)| RenderedEntry::build(&all[pos], start + i + 1, &self.view.term))
            .collect();
        self.view.cursor = next;
        self.surface.render(&rendered);
        rendered.len()
    }

    /// Appends a fetched page without re-rendering what is already shown.
    fn absorb(&mut self, entries: Vec<LogEntry>, token: Option<ContinuationToken>) {
        let offset = self.store.len();
        let was_empty = self.filtered.is_empty();
        let all_shown = self.view.cursor >= self.filtered.len();

        self.store.append(entries, token);
        let added = self
            .engine
            .select(&self.store.all()[offset..], &self.view.filter, &self.view.term);
        self.filtered.extend(added.into_iter().map(|i| i + offset));

        if was_empty && !self.filtered.is_empty() {
            self.surface.clear();
        }
        if all_shown && self.view.cursor < self.filtered.len() {
            self.render_window();
        }
    }

    fn update_controls(&mut self) {
        self.surface.set_summary(self.summary());
        if self.phase != Phase::Results {
            return;
        }
        self.surface.set_control_visible(
            Control::LoadMoreLocal,
            self.view.cursor < self.filtered.len(),
        );
        self.surface
            .set_control_visible(Control::FetchMoreRemote, self.store.has_more());
        self.surface
            .set_control_enabled(Control::FetchMoreRemote, !self.is_busy());
    }
}
