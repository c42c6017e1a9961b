//! Core types for document loading and page rendering

use log::warn;

/// Identifier of a document opened on the engine worker
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DocumentId(pub u64);

/// Resolved reference to a decoded document.
///
/// Handles are superseded, never mutated: a configuration change that resolves a new
/// document produces a new handle with a new id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentHandle {
    /// Worker-side identifier
    pub id: DocumentId,
    /// Total page count
    pub page_count: usize,
    /// Locator the document was resolved from
    pub locator: String,
}

/// Intrinsic page properties reported by an engine
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageInfo {
    /// Intrinsic rotation in degrees
    pub rotation: i32,
    /// Unrotated page width in points
    pub width: f32,
    /// Unrotated page height in points
    pub height: f32,
}

/// Resolved reference to one page of a document
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageHandle {
    pub document: DocumentId,
    /// Page number (1-indexed)
    pub number: usize,
    pub rotation: i32,
    pub width: f32,
    pub height: f32,
}

impl PageHandle {
    #[must_use]
    pub fn new(document: DocumentId, number: usize, info: PageInfo) -> Self {
        Self {
            document,
            number,
            rotation: info.rotation,
            width: info.width,
            height: info.height,
        }
    }
}

/// Quarter-turn rotation applied to a page
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Normalize an angle in degrees. Angles that are not quarter turns are drawn
    /// unrotated.
    #[must_use]
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            0 => Self::Deg0,
            90 => Self::Deg90,
            180 => Self::Deg180,
            270 => Self::Deg270,
            other => {
                warn!("Rotation of {other} degrees is not a quarter turn, drawing unrotated");
                Self::Deg0
            }
        }
    }

    #[must_use]
    pub const fn degrees(self) -> i32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Returns true if width and height swap under this rotation
    #[must_use]
    pub const fn is_sideways(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// Geometry used to rasterize one page.
///
/// Computed fresh for every render pass from the page's intrinsic size and rotation
/// plus the viewer's scale and rotation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub scale: f32,
    pub rotation: Rotation,
    /// Width in CSS pixels
    pub width: f32,
    /// Height in CSS pixels
    pub height: f32,
}

impl Viewport {
    /// Compute the viewport of `page` for the requested scale and extra rotation
    #[must_use]
    pub fn for_page(page: &PageHandle, scale: f32, rotation: i32) -> Self {
        let degrees = if rotation == 0 {
            page.rotation
        } else {
            page.rotation.rem_euclid(360) + rotation.rem_euclid(360)
        };
        let rotation = Rotation::from_degrees(degrees);

        let (width, height) = if rotation.is_sideways() {
            (page.height, page.width)
        } else {
            (page.width, page.height)
        };

        Self {
            scale,
            rotation,
            width: (width * scale).abs(),
            height: (height * scale).abs(),
        }
    }

    /// Backing raster size for a display with the given pixel density
    #[must_use]
    pub fn raster_size(&self, density: f32) -> (u32, u32) {
        (
            (self.width * density) as u32,
            (self.height * density) as u32,
        )
    }
}

/// Rasterized page pixels
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    /// Raw RGBA pixel data (4 bytes per pixel)
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Raster {
    /// Create a raster filled with one color
    #[must_use]
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let len = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(len * 4);
        for _ in 0..len {
            pixels.extend_from_slice(&rgba);
        }
        Self {
            pixels,
            width,
            height,
        }
    }

    /// Pixel at `(x, y)`, if inside the raster
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.pixels.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Size of the pixel buffer in bytes
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter_page(rotation: i32) -> PageHandle {
        PageHandle::new(
            DocumentId(1),
            1,
            PageInfo {
                rotation,
                width: 612.0,
                height: 792.0,
            },
        )
    }

    #[test]
    fn viewport_scales_intrinsic_size() {
        let viewport = Viewport::for_page(&letter_page(0), 0.5, 0);
        assert_eq!(viewport.rotation, Rotation::Deg0);
        assert!((viewport.width - 306.0).abs() < f32::EPSILON);
        assert!((viewport.height - 396.0).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_rotation_keeps_intrinsic_rotation() {
        let viewport = Viewport::for_page(&letter_page(90), 1.0, 0);
        assert_eq!(viewport.rotation, Rotation::Deg90);
        assert!((viewport.width - 792.0).abs() < f32::EPSILON);
        assert!((viewport.height - 612.0).abs() < f32::EPSILON);
    }

    #[test]
    fn extra_rotation_adds_to_intrinsic() {
        let viewport = Viewport::for_page(&letter_page(90), 1.0, 90);
        assert_eq!(viewport.rotation, Rotation::Deg180);
        assert!((viewport.width - 612.0).abs() < f32::EPSILON);

        let viewport = Viewport::for_page(&letter_page(270), 1.0, 180);
        assert_eq!(viewport.rotation, Rotation::Deg90);
    }

    #[test]
    fn negative_rotation_wraps() {
        assert_eq!(Rotation::from_degrees(-90), Rotation::Deg270);
        assert_eq!(Rotation::from_degrees(450), Rotation::Deg90);
    }

    #[test]
    fn extreme_rotations_do_not_overflow() {
        // i32::MAX - 37 is a whole number of turns plus 90 degrees
        let viewport = Viewport::for_page(&letter_page(90), 1.0, i32::MAX - 37);
        assert_eq!(viewport.rotation, Rotation::Deg180);

        let viewport = Viewport::for_page(&letter_page(90), 1.0, i32::MAX);
        assert_eq!(viewport.rotation, Rotation::Deg0);

        let viewport = Viewport::for_page(&letter_page(-90), 1.0, i32::MIN);
        assert_eq!(viewport.rotation, Rotation::Deg0);
    }

    #[test]
    fn non_quarter_turn_draws_unrotated() {
        assert_eq!(Rotation::from_degrees(45), Rotation::Deg0);
    }

    #[test]
    fn raster_size_truncates_like_canvas_dimensions() {
        let viewport = Viewport::for_page(&letter_page(0), 0.9, 0);
        // 612 * 0.9 = 550.8, 792 * 0.9 = 712.8
        assert_eq!(viewport.raster_size(1.0), (550, 712));
        assert_eq!(viewport.raster_size(2.0), (1101, 1425));
    }

    #[test]
    fn filled_raster_pixels() {
        let raster = Raster::filled(2, 3, [1, 2, 3, 255]);
        assert_eq!(raster.byte_len(), 24);
        assert_eq!(raster.pixel(1, 2), Some([1, 2, 3, 255]));
        assert_eq!(raster.pixel(2, 0), None);
    }
}
