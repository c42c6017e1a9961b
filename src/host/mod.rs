//! Host UI abstraction
//!
//! A host owns named containers; the render pipeline appends one raster surface per
//! page to a container and draws into it through a 2D context. [`Stage`] is the
//! in-memory host used by the command-line tool and the tests.

mod stage;

pub use stage::{Container, Stage, Surface};

use crate::pdf::Raster;

/// Handle to a container element
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContainerId(pub usize);

/// Handle to a surface element
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

/// Drawing context of one surface
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Context2d {
    pub surface: SurfaceId,
}

/// Errors from host operations
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("surface {0:?} is no longer attached")]
    DetachedSurface(SurfaceId),
    #[error("raster of {width}x{height} holds {actual} bytes")]
    ShortRaster { width: u32, height: u32, actual: usize },
    #[error("surface {0:?} backing store does not match its size")]
    ShortBackingStore(SurfaceId),
}

/// Presentation properties the pipeline may set on a surface
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StyleProperty {
    Display,
    MarginLeft,
    MarginRight,
    MarginBottom,
    BorderRadius,
    Border,
    AlignContent,
    AlignItems,
    BoxShadow,
    BorderColor,
}

impl StyleProperty {
    /// CSS property name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Display => "display",
            Self::MarginLeft => "margin-left",
            Self::MarginRight => "margin-right",
            Self::MarginBottom => "margin-bottom",
            Self::BorderRadius => "border-radius",
            Self::Border => "border",
            Self::AlignContent => "align-content",
            Self::AlignItems => "align-items",
            Self::BoxShadow => "box-shadow",
            Self::BorderColor => "border-color",
        }
    }
}

/// Default surface style: centered, bordered, rounded, with a drop shadow
pub const DEFAULT_SURFACE_STYLE: [(StyleProperty, &str); 10] = [
    (StyleProperty::Display, "block"),
    (StyleProperty::MarginLeft, "auto"),
    (StyleProperty::MarginRight, "auto"),
    (StyleProperty::MarginBottom, "1em"),
    (StyleProperty::BorderRadius, "10px"),
    (StyleProperty::Border, "2px solid"),
    (StyleProperty::AlignContent, "center"),
    (StyleProperty::AlignItems, "center"),
    (
        StyleProperty::BoxShadow,
        "rgba(22, 31, 39, 0.42) 0px 60px 123px -25px, rgba(19, 26, 32, 0.08) 0px 35px 75px -35px",
    ),
    (
        StyleProperty::BorderColor,
        "rgb(213, 220, 226) rgb(213, 220, 226) rgb(184, 194, 204)",
    ),
];

/// The element tree pages are rendered into
pub trait Host {
    /// Physical pixels per CSS pixel
    fn device_pixel_ratio(&self) -> f32;

    /// Look up a container by its id
    fn find_container(&self, id: &str) -> Option<ContainerId>;

    /// Remove every child of a container
    fn clear_container(&mut self, container: ContainerId);

    /// Create a surface and append it as the last child of `container`
    fn append_surface(&mut self, container: ContainerId) -> Option<SurfaceId>;

    fn set_style_property(&mut self, surface: SurfaceId, property: StyleProperty, value: &str);

    fn set_class_name(&mut self, surface: SurfaceId, class_name: &str);

    /// Obtain the 2D drawing context of a surface, if the host can provide one
    fn context_2d(&mut self, surface: SurfaceId) -> Option<Context2d>;

    /// Size the backing raster of a surface in physical pixels
    fn set_backing_size(&mut self, surface: SurfaceId, width: u32, height: u32);

    /// Scale subsequent drawing on `context`
    fn scale_context(&mut self, context: Context2d, x: f32, y: f32);

    /// Draw a raster at the context origin, clipped to the backing size
    fn draw_raster(&mut self, context: Context2d, raster: &Raster) -> Result<(), HostError>;
}
