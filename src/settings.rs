use anyhow::Context;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::pdf::{CMapOptions, DEFAULT_WORKER_SRC, LoadParams};

const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "scrollpages";

pub const DEFAULT_CONTAINER_ID: &str = "pdfdoc";
pub const DEFAULT_SCALE: f32 = 0.9;
pub const DEFAULT_CACHE_SIZE: usize = 64;

/// Viewer configuration snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Path or URL of the document
    #[serde(default)]
    pub source: String,

    /// Id of the container pages are rendered into
    #[serde(default = "default_container_id")]
    pub container_id: String,

    #[serde(default = "default_scale")]
    pub scale: f32,

    /// Extra rotation in degrees, added to each page's intrinsic rotation unless zero
    #[serde(default)]
    pub rotation: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmap_url: Option<String>,

    #[serde(default)]
    pub cmap_packed: bool,

    #[serde(default = "default_worker_src")]
    pub worker_src: String,

    #[serde(default)]
    pub with_credentials: bool,

    #[serde(default = "default_true")]
    pub use_default_style: bool,

    #[serde(default)]
    pub class_name: String,

    /// Number of rasters kept by the worker
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

fn default_true() -> bool {
    true
}

fn default_container_id() -> String {
    DEFAULT_CONTAINER_ID.to_string()
}

fn default_scale() -> f32 {
    DEFAULT_SCALE
}

fn default_worker_src() -> String {
    DEFAULT_WORKER_SRC.to_string()
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            source: String::new(),
            container_id: default_container_id(),
            scale: default_scale(),
            rotation: 0,
            cmap_url: None,
            cmap_packed: false,
            worker_src: default_worker_src(),
            with_credentials: false,
            use_default_style: true,
            class_name: String::new(),
            cache_size: default_cache_size(),
        }
    }
}

impl ViewerConfig {
    /// Create a configuration for `source` with every other field at its default
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// The document-resolution key of this configuration.
    ///
    /// The cmap packing flag travels only together with a cmap url.
    #[must_use]
    pub fn load_params(&self) -> LoadParams {
        LoadParams {
            locator: self.source.clone(),
            with_credentials: self.with_credentials,
            cmap: self.cmap_url.as_ref().map(|url| CMapOptions {
                url: url.clone(),
                packed: self.cmap_packed,
            }),
        }
    }
}

fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load configuration from `path`, or from the user config directory when no path is
/// given. A missing file in the config directory yields defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ViewerConfig> {
    if let Some(path) = path {
        return load_config_from_path(path);
    }

    match preferred_config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        Some(path) => {
            debug!("No config file at {path:?}, using defaults");
            Ok(ViewerConfig::default())
        }
        None => {
            debug!("Could not determine config directory, using defaults");
            Ok(ViewerConfig::default())
        }
    }
}

fn load_config_from_path(path: &Path) -> anyhow::Result<ViewerConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {path:?}"))?;
    let config = serde_yaml::from_str::<ViewerConfig>(&content)
        .with_context(|| format!("Failed to parse config file {path:?}"))?;
    info!("Loaded config from {path:?}");
    Ok(config)
}

/// Write `config` as YAML, creating parent directories as needed
pub fn save_config(config: &ViewerConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {parent:?}"))?;
        }
    }

    let content = serde_yaml::to_string(config).context("Failed to serialize config")?;
    fs::write(path, content).with_context(|| format!("Failed to save config to {path:?}"))?;
    debug!("Saved config to {path:?}");
    Ok(())
}
