// Export modules for use in tests
pub mod host;
pub mod pdf;
pub mod settings;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export main viewer components
pub use host::{Host, Stage};
pub use pdf::{DocumentHandle, PageHandle, Phase, Viewer};
pub use settings::ViewerConfig;
