//! Viewer - drives document resolution and render passes against a host

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};

use super::cache::RasterCache;
use super::callbacks::CallbackRegistry;
use super::engine::DocumentEngine;
use super::error::ViewerError;
use super::pipeline::{self, PreparedSurface};
use super::request::{
    EngineFault, EngineRequest, EngineResponse, Generation, LoadParams, RequestId, WorkerOptions,
};
use super::state::{Command, Effect, Phase, ViewParams, ViewerState};
use super::types::{DocumentHandle, DocumentId, PageHandle, Raster};
use super::worker::engine_worker;
use crate::host::{ContainerId, Host};
use crate::settings::ViewerConfig;

#[derive(Debug)]
enum PendingRequest {
    Open(Generation),
    Page { pass: Generation, number: usize },
    Draw {
        pass: Generation,
        prepared: PreparedSurface,
    },
}

/// One render pass of the current document
#[derive(Debug)]
struct RenderPass {
    generation: Generation,
    document: DocumentId,
    page_count: usize,
    target: ContainerId,
    view: ViewParams,
    fetched: Vec<PageHandle>,
    outstanding_draws: usize,
}

/// Renders every page of a document into a host container.
///
/// Engine work happens on a worker thread; completions are applied when the host
/// calls [`Viewer::poll`] or [`Viewer::wait_idle`]. Callbacks run on the host's thread.
pub struct Viewer<H: Host> {
    state: ViewerState,
    host: H,
    callbacks: CallbackRegistry,
    request_tx: Sender<EngineRequest>,
    response_rx: Receiver<EngineResponse>,
    next_request_id: u64,
    pending_requests: HashMap<RequestId, PendingRequest>,
    cache: Arc<Mutex<RasterCache>>,
    resolution: Generation,
    pass_generation: Generation,
    pass: Option<RenderPass>,
    target: Option<ContainerId>,
    document: Option<DocumentHandle>,
    pages: Option<Vec<PageHandle>>,
}

impl<H: Host> Viewer<H> {
    /// Create a viewer, spawn its engine worker and start resolving `config.source`
    pub fn new<E>(config: ViewerConfig, host: H, engine: E) -> Self
    where
        E: DocumentEngine + Send + 'static,
    {
        let cache = Arc::new(Mutex::new(RasterCache::new(config.cache_size)));

        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        let cache_clone = Arc::clone(&cache);
        std::thread::spawn(move || {
            engine_worker(engine, request_rx, response_tx, cache_clone);
        });

        let mut viewer = Self {
            state: ViewerState::new(config),
            host,
            callbacks: CallbackRegistry::default(),
            request_tx,
            response_rx,
            next_request_id: 1,
            pending_requests: HashMap::new(),
            cache,
            resolution: Generation::default(),
            pass_generation: Generation::default(),
            pass: None,
            target: None,
            document: None,
            pages: None,
        };
        viewer.apply_command(Command::Start);
        viewer
    }

    /// Called with the document each time a resolution succeeds
    pub fn on_document_load_success(&mut self, callback: impl FnMut(&DocumentHandle) + 'static) {
        self.callbacks.on_document_load_success.set(Box::new(callback));
    }

    /// Called each time a resolution fails
    pub fn on_document_load_fail(&mut self, callback: impl FnMut() + 'static) {
        self.callbacks.on_document_load_fail.set(Box::new(callback));
    }

    /// Called when the target container is missing. While set, rendering into a
    /// missing container is not attempted.
    pub fn on_invalid_location(&mut self, callback: impl FnMut() + 'static) {
        self.callbacks.on_invalid_location.set(Box::new(callback));
    }

    /// Remove the invalid-location callback; a missing container is then left to the
    /// render pipeline to reject
    pub fn clear_invalid_location(&mut self) {
        self.callbacks.on_invalid_location.clear();
    }

    /// Replace the whole configuration
    pub fn update(&mut self, config: ViewerConfig) {
        if config.cache_size != self.state.config().cache_size {
            self.cache
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .resize(config.cache_size);
        }
        self.apply_command(Command::Configure(config));
    }

    pub fn set_source(&mut self, params: LoadParams) {
        self.apply_command(Command::SetSource(params));
    }

    pub fn set_worker_src(&mut self, src: impl Into<String>) {
        self.apply_command(Command::SetWorkerSrc(src.into()));
    }

    pub fn set_container_id(&mut self, id: impl Into<String>) {
        self.apply_command(Command::SetContainerId(id.into()));
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.apply_command(Command::SetScale(scale));
    }

    pub fn set_rotation(&mut self, rotation: i32) {
        self.apply_command(Command::SetRotation(rotation));
    }

    pub fn set_use_default_style(&mut self, enabled: bool) {
        self.apply_command(Command::SetUseDefaultStyle(enabled));
    }

    pub fn set_class_name(&mut self, class_name: impl Into<String>) {
        self.apply_command(Command::SetClassName(class_name.into()));
    }

    /// Render the current document again with unchanged configuration
    pub fn refresh(&mut self) {
        self.apply_command(Command::Refresh);
    }

    /// The current document, once one has resolved
    #[must_use]
    pub fn document(&self) -> Option<&DocumentHandle> {
        self.document.as_ref()
    }

    /// Pages of the last completed enumeration, in page order
    #[must_use]
    pub fn pages(&self) -> Option<&[PageHandle]> {
        self.pages.as_deref()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    #[must_use]
    pub fn config(&self) -> &ViewerConfig {
        self.state.config()
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Whether no engine request is outstanding
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending_requests.is_empty()
    }

    /// Number of rasters held by the worker cache
    #[must_use]
    pub fn cached_rasters(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Apply every completion that has arrived, without blocking.
    /// Returns the number of responses processed.
    pub fn poll(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(response) = self.response_rx.try_recv() {
            self.handle_response(response);
            processed += 1;
        }
        processed
    }

    /// Apply completions until no request is outstanding or `timeout` elapses.
    /// Returns true if the viewer is idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            self.poll();
            if self.is_idle() {
                return true;
            }

            let received = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return false;
                    }
                    self.response_rx.recv_timeout(remaining)
                }
                None => self
                    .response_rx
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(response) => self.handle_response(response),
                Err(RecvTimeoutError::Timeout) => return self.is_idle(),
                Err(RecvTimeoutError::Disconnected) => {
                    error!(
                        "Engine worker exited with {} requests outstanding",
                        self.pending_requests.len()
                    );
                    return false;
                }
            }
        }
    }

    /// Stop the engine worker
    pub fn shutdown(&self) {
        let _ = self.request_tx.send(EngineRequest::Shutdown);
    }

    fn apply_command(&mut self, cmd: Command) {
        let effects = self.state.apply(cmd);
        self.execute_effects(effects);
    }

    fn execute_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ConfigureWorker => {
                    let src = self.state.config().worker_src.clone();
                    let _ = self
                        .request_tx
                        .send(EngineRequest::Configure(WorkerOptions { src }));
                }

                Effect::ResolveDocument => self.resolve_document(),

                Effect::LookupTarget => {
                    let container_id = &self.state.config().container_id;
                    self.target = self.host.find_container(container_id);
                    if self.target.is_none() {
                        warn!("{}", ViewerError::InvalidLocation(container_id.clone()));
                    }
                    self.apply_command(Command::TargetResolved {
                        found: self.target.is_some(),
                        has_invalid_location_handler: self.callbacks.on_invalid_location.is_set(),
                    });
                }

                Effect::RenderPages => self.start_pass(),

                Effect::NotifyDocumentLoaded => {
                    if let Some(document) = &self.document {
                        self.callbacks.document_loaded(document);
                    }
                }

                Effect::NotifyDocumentFailed => self.callbacks.document_failed(),

                Effect::NotifyInvalidLocation => self.callbacks.invalid_location(),
            }
        }
    }

    fn resolve_document(&mut self) {
        let generation = self.resolution.bump();
        // A pass of the superseded document must not touch the host any more
        self.pass = None;

        let id = self.next_id();
        let params = self.state.config().load_params();
        debug!("Resolving {} (generation {})", params.locator, generation.0);
        let _ = self.request_tx.send(EngineRequest::Open { id, params });
        self.pending_requests
            .insert(id, PendingRequest::Open(generation));
    }

    fn start_pass(&mut self) {
        let Some(document) = &self.document else {
            warn!("Render requested without a document");
            return;
        };
        let (document, page_count) = (document.id, document.page_count);

        let generation = self.pass_generation.bump();
        let target = match pipeline::require_target(self.target) {
            Ok(target) => target,
            Err(e) => {
                warn!("Render pass {} rejected: {e}", generation.0);
                self.pass = None;
                self.apply_command(Command::PassRejected);
                return;
            }
        };

        let pass = RenderPass {
            generation,
            document,
            page_count,
            target,
            view: self.state.view_params(),
            fetched: Vec::with_capacity(page_count),
            outstanding_draws: 0,
        };
        debug!(
            "Starting render pass {} over {} pages",
            pass.generation.0, pass.page_count
        );

        let first_page = (pass.page_count > 0).then_some(1);
        self.pass = Some(pass);

        match first_page {
            Some(number) => self.request_page(generation, number),
            None => self.complete_enumeration(Some(Vec::new())),
        }
    }

    fn request_page(&mut self, pass: Generation, number: usize) {
        let Some(document) = self.pass.as_ref().map(|p| p.document) else {
            return;
        };
        let id = self.next_id();
        let _ = self.request_tx.send(EngineRequest::FetchPage {
            id,
            document,
            number,
        });
        self.pending_requests
            .insert(id, PendingRequest::Page { pass, number });
    }

    fn is_current_pass(&self, generation: Generation) -> bool {
        self.pass
            .as_ref()
            .is_some_and(|p| p.generation == generation)
    }

    fn handle_response(&mut self, response: EngineResponse) {
        let Some(pending) = self.pending_requests.remove(&response.id()) else {
            debug!("Dropping response to unknown request {:?}", response.id());
            return;
        };

        match pending {
            PendingRequest::Open(generation) => self.handle_opened(generation, response),
            PendingRequest::Page { pass, number } => self.handle_page(pass, number, response),
            PendingRequest::Draw { pass, prepared } => self.handle_drawn(pass, &prepared, response),
        }
    }

    fn handle_opened(&mut self, generation: Generation, response: EngineResponse) {
        if generation != self.resolution {
            debug!("Discarding resolution {} (superseded)", generation.0);
            if let EngineResponse::Opened { document, .. } = response {
                let _ = self.request_tx.send(EngineRequest::Release(document.id));
            }
            return;
        }

        match response {
            EngineResponse::Opened { document, .. } => {
                info!(
                    "Loaded {} ({} pages)",
                    document.locator, document.page_count
                );
                if let Some(previous) = self.document.replace(document) {
                    let _ = self.request_tx.send(EngineRequest::Release(previous.id));
                }
                self.pages = None;
                self.apply_command(Command::DocumentResolved);
            }
            EngineResponse::Error { error, .. } => {
                let error = ViewerError::DocumentLoad {
                    locator: self.state.config().source.clone(),
                    source: error,
                };
                warn!("{error}");
                self.apply_command(Command::DocumentFailed);
            }
            other => {
                warn!("Unexpected response to document resolution: {other:?}");
                self.apply_command(Command::DocumentFailed);
            }
        }
    }

    fn handle_page(&mut self, generation: Generation, number: usize, response: EngineResponse) {
        if !self.is_current_pass(generation) {
            debug!("Discarding page {number} of pass {} (superseded)", generation.0);
            return;
        }

        let page = match response {
            EngineResponse::Page { page, .. } => page,
            EngineResponse::Error { error, .. } => {
                warn!("{}", ViewerError::PageFetch {
                    page: number,
                    source: error,
                });
                self.complete_enumeration(None);
                return;
            }
            other => {
                warn!("Unexpected response to page fetch: {other:?}");
                self.complete_enumeration(None);
                return;
            }
        };

        let Some(pass) = self.pass.as_mut() else {
            return;
        };
        pass.fetched.push(page);
        if number < pass.page_count {
            self.request_page(generation, number + 1);
        } else {
            let pages = std::mem::take(&mut pass.fetched);
            self.complete_enumeration(Some(pages));
        }
    }

    /// Hand the enumerated pages to the render pipeline. `None` means enumeration
    /// failed and the pass draws nothing.
    fn complete_enumeration(&mut self, pages: Option<Vec<PageHandle>>) {
        let Some(pass) = self.pass.as_ref() else {
            return;
        };
        let generation = pass.generation;
        let target = pass.target;
        let view = pass.view.clone();
        let document = pass.document;

        self.pages = pages;
        pipeline::begin(&mut self.host, target);

        let pages = self.pages.as_deref().unwrap_or(&[]);
        let prepared = pipeline::present_pages(&mut self.host, target, pages, &view);

        for surface in &prepared {
            let id = self.next_id();
            let _ = self.request_tx.send(EngineRequest::Draw {
                id,
                document,
                number: surface.page_number,
                viewport: surface.viewport,
                density: surface.density,
            });
            self.pending_requests.insert(
                id,
                PendingRequest::Draw {
                    pass: generation,
                    prepared: *surface,
                },
            );
        }

        if let Some(pass) = self.pass.as_mut() {
            pass.outstanding_draws = prepared.len();
        }
        if prepared.is_empty() {
            self.finish_pass();
        }
    }

    fn handle_drawn(
        &mut self,
        generation: Generation,
        prepared: &PreparedSurface,
        response: EngineResponse,
    ) {
        if !self.is_current_pass(generation) {
            debug!(
                "Discarding page {} of pass {} (superseded)",
                prepared.page_number, generation.0
            );
            return;
        }

        match response {
            EngineResponse::Drawn { raster, .. } => self.draw(prepared, &raster),
            EngineResponse::Error { error, .. } => {
                warn!("{}", render_error(prepared.page_number, &error));
            }
            other => warn!("Unexpected response to page draw: {other:?}"),
        }

        let Some(pass) = self.pass.as_mut() else {
            return;
        };
        pass.outstanding_draws = pass.outstanding_draws.saturating_sub(1);
        if pass.outstanding_draws == 0 {
            self.finish_pass();
        }
    }

    fn draw(&mut self, prepared: &PreparedSurface, raster: &Raster) {
        if let Err(e) = pipeline::draw_page(&mut self.host, prepared, raster) {
            warn!("{e}");
        }
    }

    fn finish_pass(&mut self) {
        if let Some(pass) = self.pass.take() {
            debug!("Render pass {} finished", pass.generation.0);
        }
        self.apply_command(Command::PassFinished);
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

fn render_error(page: usize, error: &EngineFault) -> ViewerError {
    ViewerError::PageRender {
        page,
        detail: error.to_string(),
    }
}

impl<H: Host> Drop for Viewer<H> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
