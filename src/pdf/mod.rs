//! Document loading and page rendering

mod cache;
mod callbacks;
mod engine;
mod error;
#[cfg(feature = "pdf")]
mod mupdf_engine;
mod pipeline;
mod request;
mod service;
mod source;
mod state;
mod types;
mod worker;

pub use cache::{CacheKey, RasterCache};
pub use callbacks::{CallbackRegistry, CallbackSlot};
pub use engine::{
    DEFAULT_WORKER_SRC, DocumentEngine, EngineDocument, WORKER_VERSION, check_page_number,
    expand_worker_src,
};
pub use error::{PassError, ViewerError};
#[cfg(feature = "pdf")]
pub use mupdf_engine::MupdfEngine;
pub use pipeline::PreparedSurface;
pub use request::{
    CMapOptions, EngineFault, EngineRequest, EngineResponse, Generation, LoadParams, RequestId,
    WorkerOptions,
};
pub use service::Viewer;
pub use source::SourceKind;
pub use state::{Command, Effect, Failure, MIN_SCALE, Phase, ViewParams, ViewerState};
pub use types::*;
