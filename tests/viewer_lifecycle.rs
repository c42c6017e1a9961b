use std::cell::Cell;
use std::rc::Rc;

use scrollpages::host::Stage;
use scrollpages::pdf::{CMapOptions, Failure, LoadParams, Phase, Viewer};
use scrollpages::settings::ViewerConfig;
use scrollpages::test_utils::test_helpers::{
    CallbackLog, FAIL_DOCUMENT, JournalEntry, Notification, ScriptedEngine, TIMEOUT,
};

fn stage_with(containers: &[&str]) -> Stage {
    let mut stage = Stage::default();
    for id in containers {
        stage.add_container(id);
    }
    stage
}

fn open_viewer(
    config: ViewerConfig,
    stage: Stage,
    engine: ScriptedEngine,
    with_invalid_location: bool,
) -> (Viewer<Stage>, CallbackLog) {
    let mut viewer = Viewer::new(config, stage, engine);
    let log = CallbackLog::attach(&mut viewer, with_invalid_location);
    (viewer, log)
}

#[test]
fn basic_document_loads_once() {
    let (mut viewer, log) = open_viewer(
        ViewerConfig::new("basic.pdf"),
        stage_with(&["pdfdoc"]),
        ScriptedEngine::new(),
        true,
    );

    assert!(viewer.wait_idle(TIMEOUT));

    assert_eq!(
        log.notifications(),
        vec![Notification::Loaded {
            locator: "basic.pdf".to_string(),
            page_count: 3
        }]
    );
    assert_eq!(viewer.document().map(|d| d.page_count), Some(3));
    assert_eq!(viewer.host().surfaces("pdfdoc").len(), 3);
    assert_eq!(viewer.phase(), Phase::Rendered);
}

#[test]
fn failing_document_reports_failure_only() {
    let (mut viewer, log) = open_viewer(
        ViewerConfig::new(FAIL_DOCUMENT),
        stage_with(&["pdfdoc"]),
        ScriptedEngine::new(),
        true,
    );

    assert!(viewer.wait_idle(TIMEOUT));

    assert_eq!(log.notifications(), vec![Notification::Failed]);
    assert!(viewer.document().is_none());
    assert!(viewer.pages().is_none());
    assert!(viewer.host().surfaces("pdfdoc").is_empty());
    assert_eq!(viewer.phase(), Phase::Failed(Failure::DocumentLoad));
}

#[test]
fn empty_locator_fails_without_reaching_the_engine() {
    let engine = ScriptedEngine::new();
    let journal = engine.journal();
    let (mut viewer, log) = open_viewer(
        ViewerConfig::new(""),
        stage_with(&["pdfdoc"]),
        engine,
        false,
    );

    assert!(viewer.wait_idle(TIMEOUT));

    assert_eq!(log.failed(), 1);
    assert!(journal.opens().is_empty());
}

#[test]
fn missing_container_with_handler_halts_before_rendering() {
    let engine = ScriptedEngine::new();
    let journal = engine.journal();
    let (mut viewer, log) = open_viewer(
        ViewerConfig::new("basic.pdf"),
        stage_with(&["elsewhere"]),
        engine,
        true,
    );

    assert!(viewer.wait_idle(TIMEOUT));

    assert_eq!(log.loaded(), 1);
    assert_eq!(log.invalid_location(), 1);
    assert_eq!(log.failed(), 0);
    assert!(viewer.host().surfaces("elsewhere").is_empty());
    assert_eq!(viewer.phase(), Phase::Failed(Failure::InvalidLocation));
    assert!(
        !journal
            .entries()
            .iter()
            .any(|e| matches!(e, JournalEntry::FetchPage(_)))
    );
}

#[test]
fn missing_container_without_handler_is_rejected_by_the_pipeline() {
    let engine = ScriptedEngine::new();
    let journal = engine.journal();
    let (mut viewer, log) = open_viewer(
        ViewerConfig::new("basic.pdf"),
        stage_with(&["elsewhere"]),
        engine,
        false,
    );

    assert!(viewer.wait_idle(TIMEOUT));

    assert_eq!(log.loaded(), 1);
    assert_eq!(log.invalid_location(), 0);
    assert!(viewer.host().surfaces("elsewhere").is_empty());
    assert!(viewer.pages().is_none());
    assert!(
        !journal
            .entries()
            .iter()
            .any(|e| matches!(e, JournalEntry::FetchPage(_) | JournalEntry::Draw { .. }))
    );
    assert_eq!(viewer.phase(), Phase::Failed(Failure::InvalidLocation));
}

#[test]
fn cleared_invalid_location_handler_is_not_called() {
    let (mut viewer, log) = open_viewer(
        ViewerConfig::new("basic.pdf"),
        Stage::default(),
        ScriptedEngine::new(),
        true,
    );
    assert!(viewer.wait_idle(TIMEOUT));
    assert_eq!(log.invalid_location(), 1);

    viewer.clear_invalid_location();
    viewer.refresh();
    assert!(viewer.wait_idle(TIMEOUT));

    assert_eq!(log.invalid_location(), 1);
    assert_eq!(viewer.phase(), Phase::Failed(Failure::InvalidLocation));
}

#[test]
fn container_appearing_later_is_found_on_refresh() {
    let (mut viewer, log) = open_viewer(
        ViewerConfig::new("basic.pdf"),
        Stage::default(),
        ScriptedEngine::new(),
        true,
    );
    assert!(viewer.wait_idle(TIMEOUT));
    assert_eq!(log.invalid_location(), 1);

    viewer.host_mut().add_container("pdfdoc");
    viewer.refresh();
    assert!(viewer.wait_idle(TIMEOUT));

    assert_eq!(viewer.host().surfaces("pdfdoc").len(), 3);
    assert_eq!(log.invalid_location(), 1);
    assert_eq!(log.loaded(), 1);
}

#[test]
fn superseded_resolution_is_discarded_and_released() {
    let engine = ScriptedEngine::new();
    let journal = engine.journal();
    let (mut viewer, log) = open_viewer(
        ViewerConfig::new("first.pdf"),
        stage_with(&["pdfdoc"]),
        engine,
        true,
    );

    viewer.set_source(LoadParams::new("second.pdf"));
    assert!(viewer.wait_idle(TIMEOUT));

    assert_eq!(
        log.notifications(),
        vec![Notification::Loaded {
            locator: "second.pdf".to_string(),
            page_count: 3
        }]
    );
    assert_eq!(
        viewer.document().map(|d| d.locator.as_str()),
        Some("second.pdf")
    );
    assert_eq!(journal.opens(), vec!["first.pdf", "second.pdf"]);

    // Round trip so the worker has handled the release
    viewer.refresh();
    assert!(viewer.wait_idle(TIMEOUT));
    assert_eq!(journal.releases(), vec!["first.pdf"]);
}

#[test]
fn new_document_releases_the_previous_one() {
    let engine = ScriptedEngine::new();
    let journal = engine.journal();
    let (mut viewer, log) = open_viewer(
        ViewerConfig::new("first.pdf"),
        stage_with(&["pdfdoc"]),
        engine,
        true,
    );
    assert!(viewer.wait_idle(TIMEOUT));

    viewer.set_source(LoadParams::new("second.pdf"));
    assert!(viewer.wait_idle(TIMEOUT));
    viewer.refresh();
    assert!(viewer.wait_idle(TIMEOUT));

    assert_eq!(log.loaded(), 2);
    assert_eq!(journal.releases(), vec!["first.pdf"]);
    assert_eq!(viewer.host().surfaces("pdfdoc").len(), 3);
}

#[test]
fn recovering_from_a_failed_load() {
    let (mut viewer, log) = open_viewer(
        ViewerConfig::new(FAIL_DOCUMENT),
        stage_with(&["pdfdoc"]),
        ScriptedEngine::new(),
        true,
    );
    assert!(viewer.wait_idle(TIMEOUT));

    viewer.set_source(LoadParams::new("basic.pdf"));
    assert!(viewer.wait_idle(TIMEOUT));

    assert_eq!(log.failed(), 1);
    assert_eq!(log.loaded(), 1);
    assert_eq!(viewer.host().surfaces("pdfdoc").len(), 3);
    assert_eq!(viewer.phase(), Phase::Rendered);
}

#[test]
fn view_change_during_a_failed_resolution_applies_to_the_current_document() {
    let (mut viewer, log) = open_viewer(
        ViewerConfig::new("basic.pdf"),
        stage_with(&["pdfdoc"]),
        ScriptedEngine::new(),
        true,
    );
    assert!(viewer.wait_idle(TIMEOUT));

    viewer.set_source(LoadParams::new(FAIL_DOCUMENT));
    viewer.set_scale(1.8);
    assert!(viewer.wait_idle(TIMEOUT));

    assert_eq!(log.loaded(), 1);
    assert_eq!(log.failed(), 1);
    assert_eq!(
        viewer.document().map(|d| d.locator.as_str()),
        Some("basic.pdf")
    );
    let sizes: Vec<_> = viewer
        .host()
        .surfaces("pdfdoc")
        .iter()
        .map(|s| (s.width, s.height, s.drawn))
        .collect();
    assert_eq!(sizes, vec![(1101, 1425, true); 3]);
    assert_eq!(viewer.phase(), Phase::Rendered);
}

#[test]
fn latest_callback_receives_late_completion() {
    let first = Rc::new(Cell::new(0));
    let second = Rc::new(Cell::new(0));
    let mut viewer = Viewer::new(
        ViewerConfig::new("basic.pdf"),
        stage_with(&["pdfdoc"]),
        ScriptedEngine::new(),
    );

    let counter = Rc::clone(&first);
    viewer.on_document_load_success(move |_| counter.set(counter.get() + 1));
    // Replaced while the resolution is still in flight
    let counter = Rc::clone(&second);
    viewer.on_document_load_success(move |_| counter.set(counter.get() + 1));

    assert!(viewer.wait_idle(TIMEOUT));
    assert_eq!(first.get(), 0);
    assert_eq!(second.get(), 1);
}

#[test]
fn view_changes_do_not_reload() {
    let engine = ScriptedEngine::new();
    let journal = engine.journal();
    let (mut viewer, log) = open_viewer(
        ViewerConfig::new("basic.pdf"),
        stage_with(&["pdfdoc"]),
        engine,
        true,
    );
    assert!(viewer.wait_idle(TIMEOUT));

    viewer.set_scale(1.5);
    assert!(viewer.wait_idle(TIMEOUT));
    viewer.set_rotation(90);
    assert!(viewer.wait_idle(TIMEOUT));
    viewer.set_class_name("page");
    assert!(viewer.wait_idle(TIMEOUT));

    assert_eq!(log.loaded(), 1);
    assert_eq!(journal.opens(), vec!["basic.pdf"]);
    assert_eq!(viewer.phase(), Phase::Rendered);
}

#[test]
fn worker_is_configured_before_the_first_open() {
    let engine = ScriptedEngine::new();
    let journal = engine.journal();
    let (mut viewer, _log) = open_viewer(
        ViewerConfig::new("basic.pdf"),
        stage_with(&["pdfdoc"]),
        engine,
        false,
    );
    assert!(viewer.wait_idle(TIMEOUT));

    let entries = journal.entries();
    assert_eq!(
        entries[0],
        JournalEntry::Configure(
            "//cdnjs.cloudflare.com/ajax/libs/pdf.js/3.11.174/pdf.worker.mjs".to_string()
        )
    );
    assert!(matches!(&entries[1], JournalEntry::Open(params) if params.locator == "basic.pdf"));

    journal.clear();
    viewer.set_worker_src("/static/{version}/worker.mjs");
    viewer.refresh();
    assert!(viewer.wait_idle(TIMEOUT));

    let entries = journal.entries();
    assert_eq!(
        entries[0],
        JournalEntry::Configure("/static/3.11.174/worker.mjs".to_string())
    );
    assert!(journal.opens().is_empty());
}

#[test]
fn credentials_and_cmap_form_the_resolution_key() {
    let engine = ScriptedEngine::new();
    let journal = engine.journal();
    let mut config = ViewerConfig::new("basic.pdf");
    config.cmap_url = Some("/cmaps/".to_string());
    config.cmap_packed = true;
    let (mut viewer, log) = open_viewer(config, stage_with(&["pdfdoc"]), engine, false);
    assert!(viewer.wait_idle(TIMEOUT));

    let mut config = viewer.config().clone();
    config.with_credentials = true;
    viewer.update(config);
    assert!(viewer.wait_idle(TIMEOUT));

    let opens: Vec<_> = journal
        .entries()
        .into_iter()
        .filter_map(|e| match e {
            JournalEntry::Open(params) => Some(params),
            _ => None,
        })
        .collect();
    assert_eq!(opens.len(), 2);
    assert_eq!(
        opens[0].cmap,
        Some(CMapOptions {
            url: "/cmaps/".to_string(),
            packed: true
        })
    );
    assert!(!opens[0].with_credentials);
    assert!(opens[1].with_credentials);
    assert_eq!(log.loaded(), 2);
}
