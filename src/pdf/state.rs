//! Viewer lifecycle state management

use log::warn;

use super::request::LoadParams;
use crate::settings::{DEFAULT_SCALE, ViewerConfig};

/// Smallest accepted scale factor
pub const MIN_SCALE: f32 = 0.1;

/// Why the current generation stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
    DocumentLoad,
    InvalidLocation,
}

/// Lifecycle phase of the viewer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    /// No document requested yet
    #[default]
    Idle,
    /// Document resolution in flight
    Resolving,
    /// Document available, target lookup pending
    Resolved,
    /// Looking up the target container
    TargetLookup,
    /// Enumerating and drawing pages
    Rendering,
    /// Render pass complete
    Rendered,
    Failed(Failure),
}

/// Parameters of one render pass
#[derive(Clone, Debug, PartialEq)]
pub struct ViewParams {
    pub container_id: String,
    pub scale: f32,
    pub rotation: i32,
    pub use_default_style: bool,
    pub class_name: String,
}

/// Current lifecycle state of a viewer
#[derive(Clone, Debug)]
pub struct ViewerState {
    config: ViewerConfig,
    phase: Phase,
    started: bool,
    has_document: bool,
    /// View changed while a resolution was in flight over a current document
    view_pending: bool,
}

/// Clamp a requested scale into the accepted range
#[must_use]
pub fn sanitize_scale(scale: f32) -> f32 {
    if !scale.is_finite() {
        warn!("Scale {scale} is not finite, using {DEFAULT_SCALE}");
        return DEFAULT_SCALE;
    }
    scale.max(MIN_SCALE)
}

impl ViewerState {
    /// Create a new state holding `config`; nothing happens until [`Command::Start`]
    #[must_use]
    pub fn new(mut config: ViewerConfig) -> Self {
        config.scale = sanitize_scale(config.scale);
        Self {
            config,
            phase: Phase::Idle,
            started: false,
            has_document: false,
            view_pending: false,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether a document has resolved at least once
    #[must_use]
    pub fn has_document(&self) -> bool {
        self.has_document
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::Start => {
                if self.started {
                    return vec![];
                }
                self.started = true;
                self.phase = Phase::Resolving;
                vec![Effect::ConfigureWorker, Effect::ResolveDocument]
            }

            Command::Configure(config) => self.configure(config),

            Command::SetSource(params) => {
                if self.config.load_params() == params {
                    return vec![];
                }
                self.config.source = params.locator;
                self.config.with_credentials = params.with_credentials;
                self.config.cmap_packed = params.cmap.as_ref().is_some_and(|c| c.packed);
                self.config.cmap_url = params.cmap.map(|c| c.url);
                self.source_changed()
            }

            Command::SetWorkerSrc(src) => {
                if self.config.worker_src == src {
                    return vec![];
                }
                self.config.worker_src = src;
                if self.started {
                    vec![Effect::ConfigureWorker]
                } else {
                    vec![]
                }
            }

            Command::SetContainerId(id) => {
                if self.config.container_id == id {
                    return vec![];
                }
                self.config.container_id = id;
                self.view_changed()
            }

            Command::SetScale(scale) => {
                let clamped = sanitize_scale(scale);
                if (self.config.scale - clamped).abs() > f32::EPSILON {
                    self.config.scale = clamped;
                    self.view_changed()
                } else {
                    vec![]
                }
            }

            Command::SetRotation(rotation) => {
                if self.config.rotation == rotation {
                    return vec![];
                }
                self.config.rotation = rotation;
                self.view_changed()
            }

            Command::SetUseDefaultStyle(enabled) => {
                if self.config.use_default_style == enabled {
                    return vec![];
                }
                self.config.use_default_style = enabled;
                self.view_changed()
            }

            Command::SetClassName(class_name) => {
                if self.config.class_name == class_name {
                    return vec![];
                }
                self.config.class_name = class_name;
                self.view_changed()
            }

            Command::Refresh => self.view_changed(),

            Command::DocumentResolved => {
                self.has_document = true;
                self.view_pending = false;
                self.phase = Phase::Resolved;
                let mut effects = vec![Effect::NotifyDocumentLoaded];
                effects.extend(self.lookup_target());
                effects
            }

            Command::DocumentFailed => {
                self.phase = Phase::Failed(Failure::DocumentLoad);
                let mut effects = vec![Effect::NotifyDocumentFailed];
                if std::mem::take(&mut self.view_pending) && self.has_document {
                    // The previous document is still current and must show the new view
                    effects.extend(self.lookup_target());
                }
                effects
            }

            Command::TargetResolved {
                found,
                has_invalid_location_handler,
            } => {
                if self.phase != Phase::TargetLookup {
                    return vec![];
                }
                if !found && has_invalid_location_handler {
                    self.phase = Phase::Failed(Failure::InvalidLocation);
                    return vec![Effect::NotifyInvalidLocation];
                }
                // Without a handler the pipeline gets to reject the absent target itself
                self.phase = Phase::Rendering;
                vec![Effect::RenderPages]
            }

            Command::PassFinished => {
                if self.phase == Phase::Rendering {
                    self.phase = Phase::Rendered;
                }
                vec![]
            }

            Command::PassRejected => {
                if self.phase == Phase::Rendering {
                    self.phase = Phase::Failed(Failure::InvalidLocation);
                }
                vec![]
            }
        }
    }

    /// Get render parameters from current state
    #[must_use]
    pub fn view_params(&self) -> ViewParams {
        ViewParams {
            container_id: self.config.container_id.clone(),
            scale: self.config.scale,
            rotation: self.config.rotation,
            use_default_style: self.config.use_default_style,
            class_name: self.config.class_name.clone(),
        }
    }

    fn configure(&mut self, mut config: ViewerConfig) -> Vec<Effect> {
        config.scale = sanitize_scale(config.scale);
        let old = std::mem::replace(&mut self.config, config);

        let worker_changed = old.worker_src != self.config.worker_src;
        let source_changed = old.load_params() != self.config.load_params();
        let view_changed = old.container_id != self.config.container_id
            || (old.scale - self.config.scale).abs() > f32::EPSILON
            || old.rotation != self.config.rotation
            || old.use_default_style != self.config.use_default_style
            || old.class_name != self.config.class_name;

        if !self.started {
            return vec![];
        }

        let mut effects = Vec::new();
        if worker_changed {
            effects.push(Effect::ConfigureWorker);
        }
        if source_changed {
            effects.extend(self.source_changed());
            self.view_pending |= view_changed && self.has_document;
        } else if view_changed {
            effects.extend(self.view_changed());
        }
        effects
    }

    fn source_changed(&mut self) -> Vec<Effect> {
        if !self.started {
            return vec![];
        }
        self.phase = Phase::Resolving;
        vec![Effect::ResolveDocument]
    }

    /// Restart at target lookup when a document is current. While a resolution is in
    /// flight the new view is picked up when it completes, or applied to the current
    /// document if it fails.
    fn view_changed(&mut self) -> Vec<Effect> {
        if !self.started || !self.has_document {
            return vec![];
        }
        if self.phase == Phase::Resolving {
            self.view_pending = true;
            return vec![];
        }
        self.lookup_target()
    }

    fn lookup_target(&mut self) -> Vec<Effect> {
        self.phase = Phase::TargetLookup;
        vec![Effect::LookupTarget]
    }
}

/// Commands that modify viewer state
#[derive(Clone, Debug)]
pub enum Command {
    /// Begin the first resolution
    Start,
    /// Replace the whole configuration snapshot
    Configure(ViewerConfig),
    /// Change the document-resolution key
    SetSource(LoadParams),
    SetWorkerSrc(String),
    SetContainerId(String),
    SetScale(f32),
    SetRotation(i32),
    SetUseDefaultStyle(bool),
    SetClassName(String),
    /// Render again with identical configuration
    Refresh,
    /// The current resolution produced a document
    DocumentResolved,
    /// The current resolution failed
    DocumentFailed,
    /// Result of looking up the target container
    TargetResolved {
        found: bool,
        has_invalid_location_handler: bool,
    },
    /// The current render pass drew every page it could
    PassFinished,
    /// The render pipeline refused to run
    PassRejected,
}

/// Effects produced by state changes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Send the worker endpoint to the engine
    ConfigureWorker,
    /// Start a new document resolution, superseding any in flight
    ResolveDocument,
    /// Look up the target container by id
    LookupTarget,
    /// Start a new render pass, superseding any in flight
    RenderPages,
    NotifyDocumentLoaded,
    NotifyDocumentFailed,
    NotifyInvalidLocation,
}
