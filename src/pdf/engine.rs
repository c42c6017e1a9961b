//! Decoding service interface
//!
//! The viewer never decodes documents itself. It talks to a [`DocumentEngine`] that
//! lives on the worker thread, so implementations do not need to be `Send` once built.

use super::request::{EngineFault, LoadParams, WorkerOptions};
use super::types::{PageInfo, Raster, Viewport};

/// Worker release the default endpoint template is expanded with, unless an engine
/// reports its own
pub const WORKER_VERSION: &str = "3.11.174";

/// Default worker endpoint; `{version}` is replaced by [`DocumentEngine::version`]
pub const DEFAULT_WORKER_SRC: &str = "//cdnjs.cloudflare.com/ajax/libs/pdf.js/{version}/pdf.worker.mjs";

/// Expand the `{version}` placeholder of a worker endpoint template
#[must_use]
pub fn expand_worker_src(template: &str, version: &str) -> String {
    template.replace("{version}", version)
}

/// Resolves locators into decoded documents
pub trait DocumentEngine {
    /// Worker release, used to expand the worker endpoint template
    fn version(&self) -> String {
        WORKER_VERSION.to_string()
    }

    /// Apply worker-level configuration. Called before the first `open` and again
    /// whenever the endpoint changes.
    fn configure(&mut self, options: &WorkerOptions) {
        let _ = options;
    }

    /// Resolve a document
    fn open(&mut self, params: &LoadParams) -> Result<Box<dyn EngineDocument>, EngineFault>;
}

/// A decoded document
pub trait EngineDocument {
    fn page_count(&self) -> usize;

    /// Intrinsic properties of page `number` (1-indexed)
    fn page(&self, number: usize) -> Result<PageInfo, EngineFault>;

    /// Rasterize page `number` at `viewport.scale * density`
    fn draw(&self, number: usize, viewport: &Viewport, density: f32) -> Result<Raster, EngineFault>;
}

/// Reject page numbers outside `1..=page_count`
pub fn check_page_number(number: usize, page_count: usize) -> Result<(), EngineFault> {
    if number == 0 || number > page_count {
        return Err(EngineFault::PageOutOfRange {
            page: number,
            page_count,
        });
    }
    Ok(())
}
