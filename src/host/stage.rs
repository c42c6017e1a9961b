//! In-memory host

use std::collections::{BTreeMap, HashMap};

use super::{Context2d, ContainerId, Host, HostError, StyleProperty, SurfaceId};
use crate::pdf::Raster;

/// A raster surface attached to a container
#[derive(Clone, Debug)]
pub struct Surface {
    pub id: SurfaceId,
    pub style: BTreeMap<StyleProperty, String>,
    pub class_name: Option<String>,
    /// Backing raster width in physical pixels
    pub width: u32,
    /// Backing raster height in physical pixels
    pub height: u32,
    /// Context transform, present once a context was handed out
    pub context_scale: Option<(f32, f32)>,
    /// RGBA backing store, allocated when the surface is sized
    pub pixels: Vec<u8>,
    /// Whether any raster was drawn into the surface
    pub drawn: bool,
}

impl Surface {
    fn new(id: SurfaceId) -> Self {
        Self {
            id,
            style: BTreeMap::new(),
            class_name: None,
            width: 0,
            height: 0,
            context_scale: None,
            pixels: Vec::new(),
            drawn: false,
        }
    }

    #[must_use]
    pub fn style_value(&self, property: StyleProperty) -> Option<&str> {
        self.style.get(&property).map(String::as_str)
    }

    /// Pixel at `(x, y)` of the backing store
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.pixels.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// A named container and its surfaces, in insertion order
#[derive(Clone, Debug)]
pub struct Container {
    pub id: String,
    pub surfaces: Vec<Surface>,
}

/// Headless host keeping the element tree in memory
#[derive(Debug)]
pub struct Stage {
    device_pixel_ratio: f32,
    containers: Vec<Option<Container>>,
    by_id: HashMap<String, ContainerId>,
    next_surface_id: u64,
    context_limit: Option<usize>,
    live_contexts: usize,
}

impl Default for Stage {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Stage {
    #[must_use]
    pub fn new(device_pixel_ratio: f32) -> Self {
        let device_pixel_ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        Self {
            device_pixel_ratio,
            containers: Vec::new(),
            by_id: HashMap::new(),
            next_surface_id: 1,
            context_limit: None,
            live_contexts: 0,
        }
    }

    /// Refuse drawing contexts once `limit` surfaces hold one
    #[must_use]
    pub fn with_context_limit(mut self, limit: usize) -> Self {
        self.context_limit = Some(limit);
        self
    }

    /// Add a container, or return the existing one with the same id
    pub fn add_container(&mut self, id: &str) -> ContainerId {
        if let Some(existing) = self.by_id.get(id) {
            return *existing;
        }
        let handle = ContainerId(self.containers.len());
        self.containers.push(Some(Container {
            id: id.to_string(),
            surfaces: Vec::new(),
        }));
        self.by_id.insert(id.to_string(), handle);
        handle
    }

    /// Detach a container and everything in it
    pub fn remove_container(&mut self, id: &str) -> Option<Container> {
        let handle = self.by_id.remove(id)?;
        let removed = self.containers.get_mut(handle.0)?.take()?;
        self.live_contexts -= removed
            .surfaces
            .iter()
            .filter(|s| s.context_scale.is_some())
            .count();
        Some(removed)
    }

    #[must_use]
    pub fn container(&self, id: &str) -> Option<&Container> {
        let handle = self.by_id.get(id)?;
        self.containers.get(handle.0)?.as_ref()
    }

    /// Surfaces of a container, empty if the container does not exist
    #[must_use]
    pub fn surfaces(&self, id: &str) -> &[Surface] {
        self.container(id).map_or(&[], |c| c.surfaces.as_slice())
    }

    #[must_use]
    pub fn live_contexts(&self) -> usize {
        self.live_contexts
    }

    fn surface_mut(&mut self, surface: SurfaceId) -> Option<&mut Surface> {
        self.containers
            .iter_mut()
            .flatten()
            .flat_map(|c| c.surfaces.iter_mut())
            .find(|s| s.id == surface)
    }
}

impl Host for Stage {
    fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }

    fn find_container(&self, id: &str) -> Option<ContainerId> {
        self.by_id.get(id).copied()
    }

    fn clear_container(&mut self, container: ContainerId) {
        if let Some(Some(c)) = self.containers.get_mut(container.0) {
            let released = c
                .surfaces
                .iter()
                .filter(|s| s.context_scale.is_some())
                .count();
            c.surfaces.clear();
            self.live_contexts -= released;
        }
    }

    fn append_surface(&mut self, container: ContainerId) -> Option<SurfaceId> {
        let c = self.containers.get_mut(container.0)?.as_mut()?;
        let id = SurfaceId(self.next_surface_id);
        self.next_surface_id += 1;
        c.surfaces.push(Surface::new(id));
        Some(id)
    }

    fn set_style_property(&mut self, surface: SurfaceId, property: StyleProperty, value: &str) {
        if let Some(s) = self.surface_mut(surface) {
            s.style.insert(property, value.to_string());
        }
    }

    fn set_class_name(&mut self, surface: SurfaceId, class_name: &str) {
        if let Some(s) = self.surface_mut(surface) {
            s.class_name = Some(class_name.to_string());
        }
    }

    fn context_2d(&mut self, surface: SurfaceId) -> Option<Context2d> {
        let limit = self.context_limit;
        let live = self.live_contexts;
        let s = self.surface_mut(surface)?;
        if s.context_scale.is_none() {
            if limit.is_some_and(|limit| live >= limit) {
                return None;
            }
            s.context_scale = Some((1.0, 1.0));
            self.live_contexts += 1;
        }
        Some(Context2d { surface })
    }

    fn set_backing_size(&mut self, surface: SurfaceId, width: u32, height: u32) {
        if let Some(s) = self.surface_mut(surface) {
            s.width = width;
            s.height = height;
            s.pixels = vec![0; width as usize * height as usize * 4];
            // Resizing a canvas resets its context state
            if s.context_scale.is_some() {
                s.context_scale = Some((1.0, 1.0));
            }
        }
    }

    fn scale_context(&mut self, context: Context2d, x: f32, y: f32) {
        if let Some(s) = self.surface_mut(context.surface) {
            if let Some((sx, sy)) = s.context_scale {
                s.context_scale = Some((sx * x, sy * y));
            }
        }
    }

    fn draw_raster(&mut self, context: Context2d, raster: &Raster) -> Result<(), HostError> {
        let s = self
            .surface_mut(context.surface)
            .ok_or(HostError::DetachedSurface(context.surface))?;

        let rows = raster.height.min(s.height) as usize;
        let row_bytes = raster.width.min(s.width) as usize * 4;
        let src_stride = raster.width as usize * 4;
        let dst_stride = s.width as usize * 4;

        for y in 0..rows {
            let src = raster
                .pixels
                .get(y * src_stride..y * src_stride + row_bytes)
                .ok_or(HostError::ShortRaster {
                    width: raster.width,
                    height: raster.height,
                    actual: raster.pixels.len(),
                })?;
            let dst = s
                .pixels
                .get_mut(y * dst_stride..y * dst_stride + row_bytes)
                .ok_or(HostError::ShortBackingStore(context.surface))?;
            dst.copy_from_slice(src);
        }
        s.drawn = true;
        Ok(())
    }
}
