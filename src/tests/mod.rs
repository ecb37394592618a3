use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::client::{FetchError, SearchApi, SearchPage, SearchRequest, SUCCESS_MESSAGE};
use crate::controller::{ControllerError, ControllerOptions, Phase, SubmitOutcome, ViewController};
use crate::filter::TypeFilter;
use crate::model::{ContinuationToken, FormField, LogEntry, SearchForm};
use crate::output::{ExportError, ExportFormat};
use crate::render::{
    Control, LogSurface, Notice, NoticeLevel, Placeholder, RenderedEntry, ViewSummary,
};

type Script = VecDeque<Result<SearchPage, FetchError>>;

#[derive(Clone, Default)]
pub(crate) struct ScriptedApi {
    pages: Arc<Mutex<Script>>,
    requests: Arc<Mutex<Vec<(String, SearchRequest)>>>,
}

impl ScriptedApi {
    pub(crate) fn push(&self, result: Result<SearchPage, FetchError>) -> &Self {
        self.pages.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn requests(&self) -> Vec<(String, SearchRequest)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchApi for ScriptedApi {
    async fn search(
        &self,
        endpoint: &str,
        request: &SearchRequest,
    ) -> Result<SearchPage, FetchError> {
        self.requests
            .lock()
            .unwrap()
            .push((endpoint.to_string(), request.clone()));
        let next = self.pages.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Err(FetchError::Rejected {
                message: "script exhausted".to_string(),
            })
        })
    }
}

#[derive(Default)]
pub(crate) struct RecordingSurface {
    shown: Vec<RenderedEntry>,
    placeholder: Option<Placeholder>,
    visible: HashMap<Control, bool>,
    enabled: Vec<(Control, bool)>,
    summary: ViewSummary,
    notices: Vec<Notice>,
    clears: usize,
}

impl RecordingSurface {
    pub(crate) fn messages(&self) -> Vec<String> {
        self.shown.iter().map(|e| e.message.to_plain_text()).collect()
    }

    pub(crate) fn is_visible(&self, control: Control) -> bool {
        self.visible.get(&control).copied().unwrap_or(false)
    }

    pub(crate) fn last_notice(&self) -> &Notice {
        self.notices.last().unwrap()
    }
}

impl LogSurface for RecordingSurface {
    fn clear(&mut self) {
        self.shown.clear();
        self.placeholder = None;
        self.clears += 1;
    }

    fn render(&mut self, slice: &[RenderedEntry]) {
        self.shown.extend_from_slice(slice);
    }

    fn show_placeholder(&mut self, placeholder: Placeholder) {
        self.placeholder = Some(placeholder);
    }

    fn set_control_visible(&mut self, control: Control, visible: bool) {
        self.visible.insert(control, visible);
    }

    fn set_control_enabled(&mut self, control: Control, enabled: bool) {
        self.enabled.push((control, enabled));
    }

    fn set_summary(&mut self, summary: ViewSummary) {
        self.summary = summary;
    }

    fn notify(&mut self, notice: &Notice) {
        self.notices.push(notice.clone());
    }
}

const LIVE: &str = "https://nodenativelive.cirrius.in/api/v1/searchLog";

pub(crate) fn form() -> SearchForm {
    SearchForm {
        client_id: "C1".to_string(),
        repcode: "R1".to_string(),
        log_type: "order".to_string(),
        date: "2024-03-05".to_string(),
        instance: "live".to_string(),
        ..SearchForm::default()
    }
}

pub(crate) fn log(message: &str, kind: &str) -> LogEntry {
    LogEntry::from_pairs([("message", message), ("message_type", kind)])
}

pub(crate) fn page(entries: Vec<LogEntry>, token: Option<&str>) -> Result<SearchPage, FetchError> {
    Ok(SearchPage {
        message: SUCCESS_MESSAGE.to_string(),
        entries,
        token: token.map(ContinuationToken::from),
    })
}

fn controller(api: &ScriptedApi, page_size: usize) -> ViewController<ScriptedApi, RecordingSurface> {
    ViewController::new(
        api.clone(),
        RecordingSurface::default(),
        ControllerOptions {
            page_size,
            ..ControllerOptions::default()
        },
    )
}

#[tokio::test]
async fn submit_renders_first_window_and_sends_null_token() {
    let api = ScriptedApi::default();
    api.push(page(
        vec![log("a", "INFO"), log("b", "ERROR"), log("c", "INFO")],
        Some("tok1"),
    ));
    let mut view = controller(&api, 2);

    let outcome = view.submit(&form()).await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Results { total: 3 });
    assert_eq!(view.phase(), Phase::Results);
    assert_eq!(view.surface().messages(), ["a", "b"]);
    assert_eq!(
        view.surface().summary,
        ViewSummary {
            total: 3,
            filtered: 3,
            shown: 2
        }
    );
    assert!(view.surface().is_visible(Control::LoadMoreLocal));
    assert!(view.surface().is_visible(Control::FetchMoreRemote));
    assert!(view.surface().is_visible(Control::Export));

    let requests = api.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, LIVE);
    let body = serde_json::to_value(&requests[0].1).unwrap();
    assert_eq!(
        body,
        json!({
            "clientId": "C1",
            "repcode": "R1",
            "startDate": "2024-03-05",
            "endDate": "2024-03-05",
            "type": "order",
            "search_after": null
        })
    );
}

#[tokio::test]
async fn load_more_local_appends_until_exhausted() {
    let api = ScriptedApi::default();
    api.push(page(
        vec![log("a", "INFO"), log("b", "ERROR"), log("c", "INFO")],
        None,
    ));
    let mut view = controller(&api, 2);
    view.submit(&form()).await.unwrap();

    assert_eq!(view.load_more_local(), 1);
    assert_eq!(view.surface().messages(), ["a", "b", "c"]);
    assert_eq!(view.surface().shown[2].position, 3);
    assert!(!view.surface().is_visible(Control::LoadMoreLocal));
    assert!(!view.surface().is_visible(Control::FetchMoreRemote));

    assert_eq!(view.load_more_local(), 0);
    assert_eq!(view.surface().shown.len(), 3);
}

#[tokio::test]
async fn filter_and_search_rebuild_the_view() {
    let api = ScriptedApi::default();
    api.push(page(
        vec![
            log("boot ok", "INFO"),
            log("disk full", "ERROR"),
            log("disk check", "INFO"),
        ],
        None,
    ));
    let mut view = controller(&api, 100);
    view.submit(&form()).await.unwrap();

    view.set_filter(TypeFilter::parse("error"));
    assert_eq!(view.surface().messages(), ["disk full"]);

    view.set_filter(TypeFilter::All);
    view.set_search_term("DISK");
    assert_eq!(view.surface().messages(), ["disk full", "disk check"]);
    assert!(view.surface().shown[0].message.has_match());

    view.set_search_term("nothing like this");
    assert!(view.surface().shown.is_empty());
    assert_eq!(view.surface().placeholder, Some(Placeholder::NoMatches));
    assert_eq!(view.view().cursor, 0);

    view.clear_filters();
    assert_eq!(view.surface().messages().len(), 3);
    assert_eq!(view.surface().placeholder, None);
}

#[tokio::test]
async fn unchanged_term_does_not_rebuild() {
    let api = ScriptedApi::default();
    api.push(page(vec![log("a", "INFO")], None));
    let mut view = controller(&api, 100);
    view.submit(&form()).await.unwrap();
    view.set_search_term("a");
    let clears = view.surface().clears;
    view.set_search_term("  a ");
    assert_eq!(view.surface().clears, clears);
}

#[tokio::test]
async fn empty_result_shows_no_data_instead_of_no_matches() {
    let api = ScriptedApi::default();
    api.push(page(Vec::new(), None));
    let mut view = controller(&api, 100);

    assert_eq!(view.submit(&form()).await.unwrap(), SubmitOutcome::NoData);
    assert_eq!(view.phase(), Phase::NoData);
    assert_eq!(view.surface().placeholder, Some(Placeholder::NoData));
    assert_eq!(view.surface().last_notice().title, "No Data");
    assert!(!view.surface().is_visible(Control::Export));
    assert!(!view.surface().is_visible(Control::Filters));

    let now = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
    let err = view.export(ExportFormat::Csv, now).unwrap_err();
    assert!(matches!(err, ControllerError::Export(ExportError::NothingToExport)));
    assert_eq!(view.surface().last_notice().message, "No logs to export.");
}

#[tokio::test]
async fn invalid_form_never_reaches_the_api_or_the_store() {
    let api = ScriptedApi::default();
    api.push(page(vec![log("kept", "INFO")], Some("tok1")));
    let mut view = controller(&api, 100);
    view.submit(&form()).await.unwrap();

    let bad = SearchForm {
        client_id: "  ".to_string(),
        log_type: String::new(),
        ..form()
    };
    let err = view.submit(&bad).await.unwrap_err();
    match &err {
        ControllerError::Validation(v) => {
            assert_eq!(v.for_field(FormField::ClientId), Some("Client ID is required"));
            assert_eq!(v.for_field(FormField::Type), Some("Please select a type"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(api.requests().len(), 1);
    assert_eq!(view.store().len(), 1);
    assert!(view.store().has_more());
    assert_eq!(view.phase(), Phase::Results);
    let notice = view.surface().last_notice();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.title, "Validation Error");
}

#[tokio::test]
async fn fetch_more_appends_pages_and_drops_the_token() {
    let api = ScriptedApi::default();
    api.push(page(vec![log("p1-a", "INFO"), log("p1-b", "INFO")], Some("tok1")))
        .push(page(vec![log("p2-a", "INFO"), log("p2-b", "ERROR")], None));
    let mut view = controller(&api, 100);
    view.submit(&form()).await.unwrap();
    let clears = view.surface().clears;

    assert_eq!(view.fetch_more().await.unwrap(), 2);
    assert_eq!(view.store().len(), 4);
    assert!(!view.store().has_more());
    assert_eq!(view.surface().messages(), ["p1-a", "p1-b", "p2-a", "p2-b"]);
    assert_eq!(view.surface().clears, clears);
    assert_eq!(view.surface().shown[3].position, 4);
    assert!(!view.surface().is_visible(Control::FetchMoreRemote));
    assert_eq!(
        view.surface().last_notice().message,
        "Loaded 2 more log entries"
    );

    let requests = api.requests();
    assert_eq!(
        requests[1].1.search_after,
        Some(ContinuationToken::from("tok1"))
    );

    let fetch_toggles: Vec<bool> = view
        .surface()
        .enabled
        .iter()
        .filter(|(c, _)| *c == Control::FetchMoreRemote)
        .map(|(_, e)| *e)
        .collect();
    assert_eq!(&fetch_toggles[fetch_toggles.len() - 2..], &[false, true]);
    assert!(!view.is_busy());

    assert_eq!(view.fetch_more().await.unwrap(), 0);
    assert_eq!(api.requests().len(), 2);
}

#[tokio::test]
async fn fetch_more_keeps_unshown_matches_behind_load_more() {
    let api = ScriptedApi::default();
    api.push(page(vec![log("a", "INFO"), log("b", "INFO"), log("c", "INFO")], Some("t")))
        .push(page(vec![log("d", "INFO")], None));
    let mut view = controller(&api, 2);
    view.submit(&form()).await.unwrap();

    view.fetch_more().await.unwrap();
    assert_eq!(view.surface().messages(), ["a", "b"]);
    assert_eq!(view.filtered().len(), 4);
    assert!(view.surface().is_visible(Control::LoadMoreLocal));

    assert_eq!(view.load_more_local(), 2);
    assert_eq!(view.surface().messages(), ["a", "b", "c", "d"]);
}

#[tokio::test]
async fn fetched_matches_replace_the_no_matches_placeholder() {
    let api = ScriptedApi::default();
    api.push(page(vec![log("boot", "INFO")], Some("t")))
        .push(page(vec![log("disk full", "ERROR")], None));
    let mut view = controller(&api, 100);
    view.submit(&form()).await.unwrap();
    view.set_search_term("disk");
    assert_eq!(view.surface().placeholder, Some(Placeholder::NoMatches));

    view.fetch_more().await.unwrap();
    assert_eq!(view.surface().placeholder, None);
    assert_eq!(view.surface().messages(), ["disk full"]);
}

#[tokio::test]
async fn failed_fetch_more_leaves_store_and_token_alone() {
    let api = ScriptedApi::default();
    api.push(page(vec![log("a", "INFO")], Some("tok1")))
        .push(Err(FetchError::Status {
            status: 500,
            message: "boom".to_string(),
        }))
        .push(Err(FetchError::Decode {
            source: serde_json::from_str::<Value>("{").unwrap_err(),
        }));
    let mut view = controller(&api, 100);
    view.submit(&form()).await.unwrap();

    let err = view.fetch_more().await.unwrap_err();
    assert!(matches!(err, ControllerError::Api { status: Some(500), .. }));
    assert_eq!(view.store().len(), 1);
    assert_eq!(view.store().token(), Some(&ContinuationToken::from("tok1")));
    assert_eq!(view.surface().last_notice().title, "API Error");
    assert_eq!(view.surface().last_notice().message, "HTTP 500: boom");
    assert!(view.surface().is_visible(Control::FetchMoreRemote));
    assert_eq!(
        view.surface().enabled.last(),
        Some(&(Control::FetchMoreRemote, true))
    );

    view.fetch_more().await.unwrap_err();
    assert_eq!(
        view.surface().last_notice().message,
        "Invalid response format from server"
    );
    assert_eq!(api.requests()[2].1.search_after, Some(ContinuationToken::from("tok1")));
}

#[tokio::test]
async fn failed_submit_keeps_the_previous_view() {
    let api = ScriptedApi::default();
    api.push(page(vec![log("old", "INFO")], None))
        .push(Err(FetchError::Rejected {
            message: "Something went wrong".to_string(),
        }));
    let mut view = controller(&api, 100);
    view.submit(&form()).await.unwrap();

    let err = view.submit(&form()).await.unwrap_err();
    assert!(matches!(err, ControllerError::Api { status: None, .. }));
    assert_eq!(view.surface().messages(), ["old"]);
    assert_eq!(view.store().len(), 1);
}

#[tokio::test]
async fn export_covers_only_the_filtered_view() {
    let api = ScriptedApi::default();
    api.push(page(
        vec![
            LogEntry::from_pairs([("message", "a"), ("message_type", "INFO")]),
            serde_json::from_value(json!({ "message": "b", "message_type": "ERROR", "n": 7 }))
                .unwrap(),
        ],
        None,
    ));
    let mut view = controller(&api, 100);
    view.submit(&form()).await.unwrap();
    view.set_filter(TypeFilter::parse("ERROR"));

    let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
    let file = view.export(ExportFormat::Json, now).unwrap();
    assert_eq!(
        file.filename,
        "logs_C1_R1_2024-03-05_order_2024-03-05T14-07-09.json"
    );
    let parsed: Vec<LogEntry> = serde_json::from_slice(&file.bytes).unwrap();
    assert_eq!(parsed, vec![view.store().all()[1].clone()]);
    assert_eq!(view.surface().last_notice().level, NoticeLevel::Success);

    let csv = view.export(ExportFormat::Csv, now).unwrap();
    assert_eq!(
        String::from_utf8(csv.bytes).unwrap(),
        "\"message\",\"message_type\",\"n\"\n\"b\",\"ERROR\",\"7\""
    );
}

#[tokio::test]
async fn exporting_a_filtered_out_view_refuses_without_touching_the_store() {
    let api = ScriptedApi::default();
    api.push(page(vec![log("a", "INFO"), log("b", "INFO")], Some("tok1")));
    let mut view = controller(&api, 100);
    view.submit(&form()).await.unwrap();
    view.set_filter(TypeFilter::parse("WARN"));
    assert_eq!(view.surface().placeholder, Some(Placeholder::NoMatches));

    let now = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
    let err = view.export(ExportFormat::Txt, now).unwrap_err();
    assert!(matches!(err, ControllerError::Export(ExportError::NothingToExport)));
    assert_eq!(view.surface().last_notice().message, "No logs to export.");
    assert_eq!(view.store().len(), 2);
    assert_eq!(view.store().token(), Some(&ContinuationToken::from("tok1")));
    assert_eq!(view.phase(), Phase::Results);
}

#[tokio::test]
async fn open_hands_over_an_existing_page() {
    let api = ScriptedApi::default();
    let mut view = controller(&api, 100);
    let outcome = view.open(
        vec![log("handed", "INFO")],
        Some(ContinuationToken::from("t")),
        None,
    );
    assert_eq!(outcome, SubmitOutcome::Results { total: 1 });
    assert_eq!(view.surface().messages(), ["handed"]);

    let err = view.fetch_more().await.unwrap_err();
    assert!(matches!(err, ControllerError::NoActiveSearch));
    assert!(api.requests().is_empty());
    assert!(view.store().has_more());
}

#[tokio::test]
async fn close_discards_everything() {
    let api = ScriptedApi::default();
    api.push(page(vec![log("a", "INFO")], Some("tok1")));
    let mut view = controller(&api, 100);
    view.submit(&form()).await.unwrap();
    view.set_search_term("a");

    view.close();
    assert_eq!(view.phase(), Phase::Closed);
    assert!(view.store().is_empty());
    assert!(!view.store().has_more());
    assert!(view.criteria().is_none());
    assert!(view.view().term.is_empty());
    assert!(view.surface().shown.is_empty());
    assert!(!view.surface().is_visible(Control::FetchMoreRemote));

    assert_eq!(view.fetch_more().await.unwrap(), 0);
    assert_eq!(view.load_more_local(), 0);
    assert_eq!(api.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn debounced_typing_applies_only_the_last_term() {
    let api = ScriptedApi::default();
    api.push(page(
        vec![log("disk full", "ERROR"), log("dial tone", "INFO")],
        None,
    ));
    let mut view = controller(&api, 100);
    view.submit(&form()).await.unwrap();

    let (tx, rx) = mpsc::channel(8);
    let mut terms = crate::utils::debounce(rx, Duration::from_millis(300));
    for partial in ["d", "di", "dis", "disk"] {
        tx.send(partial.to_string()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    let clears = view.surface().clears;
    let term = terms.recv().await.unwrap();
    view.set_search_term(&term);

    assert_eq!(term, "disk");
    assert_eq!(view.surface().clears, clears + 1);
    assert_eq!(view.surface().messages(), ["disk full"]);
}
