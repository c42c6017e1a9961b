use scrollpages::host::{DEFAULT_SURFACE_STYLE, Stage, StyleProperty, SurfaceId};
use scrollpages::pdf::{PageInfo, Phase, Viewer};
use scrollpages::settings::ViewerConfig;
use scrollpages::test_utils::test_helpers::{
    CallbackLog, FAIL_PAGE, FAIL_RENDER, JournalEntry, LETTER, ScriptedEngine, TIMEOUT,
    page_color,
};

fn stage() -> Stage {
    let mut stage = Stage::default();
    stage.add_container("pdfdoc");
    stage
}

fn rendered(config: ViewerConfig, stage: Stage, engine: ScriptedEngine) -> Viewer<Stage> {
    let mut viewer = Viewer::new(config, stage, engine);
    assert!(viewer.wait_idle(TIMEOUT));
    viewer
}

fn sizes(viewer: &Viewer<Stage>) -> Vec<(u32, u32)> {
    viewer
        .host()
        .surfaces("pdfdoc")
        .iter()
        .map(|s| (s.width, s.height))
        .collect()
}

#[test]
fn one_surface_per_page_in_page_order() {
    let viewer = rendered(ViewerConfig::new("basic.pdf"), stage(), ScriptedEngine::new());

    let surfaces = viewer.host().surfaces("pdfdoc");
    assert_eq!(surfaces.len(), 3);
    for (index, surface) in surfaces.iter().enumerate() {
        assert!(surface.drawn);
        assert_eq!(surface.pixel(0, 0), Some(page_color(index + 1)));
    }

    let numbers: Vec<_> = viewer
        .pages()
        .unwrap()
        .iter()
        .map(|p| p.number)
        .collect();
    assert_eq!(numbers, vec![1, 2, 3]);
}

#[test]
fn surfaces_are_sized_from_scale() {
    let viewer = rendered(ViewerConfig::new("basic.pdf"), stage(), ScriptedEngine::new());
    // 612 x 792 at the default scale of 0.9
    assert_eq!(sizes(&viewer), vec![(550, 712); 3]);
}

#[test]
fn density_scales_backing_raster_and_context() {
    let mut stage = Stage::new(2.0);
    stage.add_container("pdfdoc");
    let engine = ScriptedEngine::new();
    let journal = engine.journal();
    let viewer = rendered(ViewerConfig::new("basic.pdf"), stage, engine);

    assert_eq!(sizes(&viewer), vec![(1101, 1425); 3]);
    for surface in viewer.host().surfaces("pdfdoc") {
        assert_eq!(surface.context_scale, Some((2.0, 2.0)));
    }
    assert!(journal.entries().iter().any(|e| matches!(
        e,
        JournalEntry::Draw { density, .. } if (*density - 2.0).abs() < f32::EPSILON
    )));
}

#[test]
fn page_fetch_failure_leaves_no_pages() {
    let mut viewer = Viewer::new(ViewerConfig::new(FAIL_PAGE), stage(), ScriptedEngine::new());
    let log = CallbackLog::attach(&mut viewer, true);
    assert!(viewer.wait_idle(TIMEOUT));

    assert_eq!(log.loaded(), 1);
    assert_eq!(log.failed(), 0);
    assert!(viewer.pages().is_none());
    assert!(viewer.host().surfaces("pdfdoc").is_empty());
    assert_eq!(viewer.phase(), Phase::Rendered);
}

#[test]
fn page_render_failure_is_isolated() {
    let mut viewer = Viewer::new(
        ViewerConfig::new(FAIL_RENDER),
        stage(),
        ScriptedEngine::new(),
    );
    let log = CallbackLog::attach(&mut viewer, true);
    assert!(viewer.wait_idle(TIMEOUT));

    let drawn: Vec<_> = viewer
        .host()
        .surfaces("pdfdoc")
        .iter()
        .map(|s| s.drawn)
        .collect();
    assert_eq!(drawn, vec![true, false, true]);
    assert_eq!(log.failed(), 0);
    assert_eq!(log.invalid_location(), 0);
    assert_eq!(viewer.phase(), Phase::Rendered);
}

#[test]
fn unavailable_context_skips_only_that_page() {
    let mut stage = Stage::default().with_context_limit(2);
    stage.add_container("pdfdoc");
    let engine = ScriptedEngine::new();
    let journal = engine.journal();
    let viewer = rendered(ViewerConfig::new("basic.pdf"), stage, engine);

    let surfaces = viewer.host().surfaces("pdfdoc");
    assert_eq!(surfaces.len(), 3);
    assert!(surfaces[0].drawn && surfaces[1].drawn);
    assert!(!surfaces[2].drawn);
    assert_eq!(journal.draws(), vec![1, 2]);
    assert_eq!(viewer.phase(), Phase::Rendered);
}

#[test]
fn refresh_reproduces_the_same_surfaces() {
    let engine = ScriptedEngine::new();
    let journal = engine.journal();
    let mut viewer = rendered(ViewerConfig::new("basic.pdf"), stage(), engine);
    let before_sizes = sizes(&viewer);
    let before_ids: Vec<SurfaceId> = viewer
        .host()
        .surfaces("pdfdoc")
        .iter()
        .map(|s| s.id)
        .collect();

    journal.clear();
    viewer.refresh();
    assert!(viewer.wait_idle(TIMEOUT));

    let surfaces = viewer.host().surfaces("pdfdoc");
    assert_eq!(surfaces.len(), 3);
    assert_eq!(sizes(&viewer), before_sizes);
    assert!(surfaces.iter().all(|s| !before_ids.contains(&s.id)));
    assert!(surfaces.iter().all(|s| s.drawn));
    // Identical rasters come from the worker cache
    assert!(journal.draws().is_empty());
    assert_eq!(viewer.cached_rasters(), 3);
}

#[test]
fn scale_change_redraws_at_new_size() {
    let mut viewer = rendered(ViewerConfig::new("basic.pdf"), stage(), ScriptedEngine::new());

    viewer.set_scale(1.8);
    assert!(viewer.wait_idle(TIMEOUT));

    assert_eq!(sizes(&viewer), vec![(1101, 1425); 3]);
    assert!(viewer.host().surfaces("pdfdoc").iter().all(|s| s.drawn));
}

#[test]
fn rotation_swaps_dimensions() {
    let mut viewer = rendered(ViewerConfig::new("basic.pdf"), stage(), ScriptedEngine::new());

    viewer.set_rotation(90);
    assert!(viewer.wait_idle(TIMEOUT));
    assert_eq!(sizes(&viewer), vec![(712, 550); 3]);

    viewer.set_rotation(180);
    assert!(viewer.wait_idle(TIMEOUT));
    assert_eq!(sizes(&viewer), vec![(550, 712); 3]);
}

#[test]
fn intrinsic_rotation_applies_when_no_rotation_requested() {
    let sideways = PageInfo {
        rotation: 90,
        ..LETTER
    };
    let engine = ScriptedEngine::new().with_document("mixed.pdf", vec![LETTER, sideways]);
    let mut viewer = rendered(ViewerConfig::new("mixed.pdf"), stage(), engine);

    assert_eq!(sizes(&viewer), vec![(550, 712), (712, 550)]);

    // Extra rotation adds to the intrinsic one
    viewer.set_rotation(90);
    assert!(viewer.wait_idle(TIMEOUT));
    assert_eq!(sizes(&viewer), vec![(712, 550), (550, 712)]);
}

#[test]
fn default_style_and_class_name() {
    let mut config = ViewerConfig::new("basic.pdf");
    config.class_name = "pdf-page".to_string();
    let mut viewer = rendered(config, stage(), ScriptedEngine::new());

    for surface in viewer.host().surfaces("pdfdoc") {
        assert_eq!(surface.style.len(), DEFAULT_SURFACE_STYLE.len());
        assert_eq!(
            surface.style_value(StyleProperty::MarginLeft),
            Some("auto")
        );
        assert_eq!(surface.class_name.as_deref(), Some("pdf-page"));
    }

    viewer.set_use_default_style(false);
    assert!(viewer.wait_idle(TIMEOUT));

    for surface in viewer.host().surfaces("pdfdoc") {
        assert!(surface.style.is_empty());
        assert_eq!(surface.class_name.as_deref(), Some("pdf-page"));
    }
}

#[test]
fn container_change_renders_into_the_new_container() {
    let mut stage = stage();
    stage.add_container("sidebar");
    let mut viewer = rendered(ViewerConfig::new("basic.pdf"), stage, ScriptedEngine::new());

    viewer.set_container_id("sidebar");
    assert!(viewer.wait_idle(TIMEOUT));

    assert_eq!(viewer.host().surfaces("sidebar").len(), 3);
    assert!(viewer.host().surfaces("sidebar").iter().all(|s| s.drawn));
}

#[test]
fn empty_document_clears_the_container() {
    let engine = ScriptedEngine::new().with_document("empty.pdf", Vec::new());
    let mut viewer = rendered(ViewerConfig::new("basic.pdf"), stage(), engine);
    assert_eq!(viewer.host().surfaces("pdfdoc").len(), 3);

    let mut config = viewer.config().clone();
    config.source = "empty.pdf".to_string();
    viewer.update(config);
    assert!(viewer.wait_idle(TIMEOUT));

    assert!(viewer.host().surfaces("pdfdoc").is_empty());
    assert_eq!(viewer.pages(), Some(&[][..]));
    assert_eq!(viewer.phase(), Phase::Rendered);
}

#[test]
fn rapid_view_changes_settle_on_the_latest() {
    let mut viewer = Viewer::new(ViewerConfig::new("basic.pdf"), stage(), ScriptedEngine::new());
    assert!(viewer.wait_idle(TIMEOUT));

    // Each change supersedes the pass started by the previous one
    viewer.set_scale(1.0);
    viewer.set_scale(2.0);
    viewer.set_scale(0.5);
    assert!(viewer.wait_idle(TIMEOUT));

    assert_eq!(sizes(&viewer), vec![(306, 396); 3]);
    assert!(viewer.host().surfaces("pdfdoc").iter().all(|s| s.drawn));
}
