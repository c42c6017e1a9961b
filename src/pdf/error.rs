//! Viewer-level failures. None of these cross the viewer boundary; they are logged and
//! turned into callbacks or silently omitted pages.

use super::request::EngineFault;

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("failed to load document {locator}: {source}")]
    DocumentLoad {
        locator: String,
        #[source]
        source: EngineFault,
    },

    #[error("container `{0}` not found")]
    InvalidLocation(String),

    #[error("failed to fetch page {page}: {source}")]
    PageFetch {
        page: usize,
        #[source]
        source: EngineFault,
    },

    #[error("failed to render page {page}: {detail}")]
    PageRender { page: usize, detail: String },

    #[error("no drawing context for page {0}")]
    ContextUnavailable(usize),
}

/// Rejection of a whole render pass
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PassError {
    #[error("render target is missing")]
    MissingTarget,
}
