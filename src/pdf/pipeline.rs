//! Render pipeline - turns page handles into surfaces of the target container

use log::{debug, warn};

use super::error::{PassError, ViewerError};
use super::state::ViewParams;
use super::types::{PageHandle, Raster, Viewport};
use crate::host::{ContainerId, Context2d, DEFAULT_SURFACE_STYLE, Host, SurfaceId};

/// A surface ready to receive the raster of one page
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreparedSurface {
    /// Page number (1-indexed)
    pub page_number: usize,
    pub surface: SurfaceId,
    pub context: Context2d,
    pub viewport: Viewport,
    pub density: f32,
}

/// Reject a pass whose target is absent, before any page is requested
pub fn require_target(target: Option<ContainerId>) -> Result<ContainerId, PassError> {
    target.ok_or(PassError::MissingTarget)
}

/// Start drawing: remove every existing child of the target
pub fn begin<H: Host>(host: &mut H, target: ContainerId) {
    host.clear_container(target);
}

/// Append one styled, sized surface per page in page order.
///
/// A surface without a drawing context keeps its place in the container but is left
/// blank; the remaining pages are still prepared.
pub fn present_pages<H: Host>(
    host: &mut H,
    target: ContainerId,
    pages: &[PageHandle],
    view: &ViewParams,
) -> Vec<PreparedSurface> {
    let density = host.device_pixel_ratio();
    let mut prepared = Vec::with_capacity(pages.len());

    for page in pages {
        let viewport = Viewport::for_page(page, view.scale, view.rotation);

        let Some(surface) = host.append_surface(target) else {
            warn!("Could not append a surface for page {}", page.number);
            continue;
        };
        apply_style(host, surface, view);

        let Some(context) = host.context_2d(surface) else {
            warn!("{}", ViewerError::ContextUnavailable(page.number));
            continue;
        };

        let (width, height) = viewport.raster_size(density);
        host.set_backing_size(surface, width, height);
        host.scale_context(context, density, density);
        debug!(
            "Prepared page {} at {width}x{height} (density {density})",
            page.number
        );

        prepared.push(PreparedSurface {
            page_number: page.number,
            surface,
            context,
            viewport,
            density,
        });
    }

    prepared
}

fn apply_style<H: Host>(host: &mut H, surface: SurfaceId, view: &ViewParams) {
    if view.use_default_style {
        for (property, value) in DEFAULT_SURFACE_STYLE {
            host.set_style_property(surface, property, value);
        }
    }
    if !view.class_name.is_empty() {
        host.set_class_name(surface, &view.class_name);
    }
}

/// Draw a finished raster into its prepared surface
pub fn draw_page<H: Host>(
    host: &mut H,
    prepared: &PreparedSurface,
    raster: &Raster,
) -> Result<(), ViewerError> {
    host.draw_raster(prepared.context, raster)
        .map_err(|e| ViewerError::PageRender {
            page: prepared.page_number,
            detail: e.to_string(),
        })
}
