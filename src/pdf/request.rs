//! Engine request and response types

use std::sync::Arc;

use super::types::{DocumentHandle, DocumentId, PageHandle, Raster, Viewport};

/// Unique identifier for engine requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Monotonic tag distinguishing successive resolutions or render passes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl Generation {
    /// Advance to the next generation and return it
    pub fn bump(&mut self) -> Self {
        self.0 += 1;
        *self
    }
}

/// Character map options forwarded to the decoder
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CMapOptions {
    pub url: String,
    pub packed: bool,
}

/// Everything that identifies one document resolution
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadParams {
    /// Path or URL of the byte source
    pub locator: String,
    /// Send credentials along with cross-origin requests
    pub with_credentials: bool,
    /// Present only when a cmap url was supplied
    pub cmap: Option<CMapOptions>,
}

impl LoadParams {
    #[must_use]
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            with_credentials: false,
            cmap: None,
        }
    }
}

/// Worker-level engine configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerOptions {
    /// Worker endpoint URL
    pub src: String,
}

/// Request sent to the engine worker
#[derive(Debug)]
pub enum EngineRequest {
    /// Point the engine at a worker endpoint
    Configure(WorkerOptions),

    /// Resolve a document
    Open { id: RequestId, params: LoadParams },

    /// Fetch one page handle
    FetchPage {
        id: RequestId,
        document: DocumentId,
        number: usize,
    },

    /// Rasterize one page
    Draw {
        id: RequestId,
        document: DocumentId,
        number: usize,
        viewport: Viewport,
        density: f32,
    },

    /// Drop a document that is no longer current
    Release(DocumentId),

    /// Shutdown the worker
    Shutdown,
}

/// Errors from the engine worker
#[derive(Debug, thiserror::Error)]
pub enum EngineFault {
    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("failed to read {locator}: {source}")]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "http")]
    #[error("failed to fetch {locator}: {source}")]
    Http {
        locator: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unsupported locator: {0}")]
    UnsupportedLocator(String),

    #[error("document {0:?} is not open")]
    UnknownDocument(DocumentId),

    #[error("page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("{detail}")]
    Generic { detail: String },
}

impl EngineFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Response from the engine worker
#[derive(Debug)]
pub enum EngineResponse {
    /// Document resolved
    Opened { id: RequestId, document: DocumentHandle },

    /// Page handle fetched
    Page { id: RequestId, page: PageHandle },

    /// Page rasterized
    Drawn { id: RequestId, raster: Arc<Raster> },

    /// Error while serving a request
    Error { id: RequestId, error: EngineFault },
}

impl EngineResponse {
    #[must_use]
    pub fn id(&self) -> RequestId {
        match self {
            Self::Opened { id, .. }
            | Self::Page { id, .. }
            | Self::Drawn { id, .. }
            | Self::Error { id, .. } => *id,
        }
    }
}
