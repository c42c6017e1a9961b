//! MuPDF-backed document engine

use log::debug;
use mupdf::{Colorspace, Document, Matrix, Pixmap};

use super::engine::{DocumentEngine, EngineDocument, check_page_number};
use super::request::{EngineFault, LoadParams, WorkerOptions};
use super::source;
use super::types::{PageInfo, Raster, Viewport};

const PDF_MIME: &str = "application/pdf";

/// Decodes documents in-process with MuPDF.
///
/// MuPDF needs no worker, so the endpoint is recorded but never loaded and the
/// default [`WORKER_VERSION`](super::engine::WORKER_VERSION) expands it.
#[derive(Debug, Default)]
pub struct MupdfEngine {
    worker_src: Option<String>,
}

impl MupdfEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last endpoint received through [`DocumentEngine::configure`]
    #[must_use]
    pub fn worker_src(&self) -> Option<&str> {
        self.worker_src.as_deref()
    }
}

impl DocumentEngine for MupdfEngine {
    fn configure(&mut self, options: &WorkerOptions) {
        // MuPDF decodes in-process; the endpoint is only recorded
        self.worker_src = Some(options.src.clone());
    }

    fn open(&mut self, params: &LoadParams) -> Result<Box<dyn EngineDocument>, EngineFault> {
        if let Some(cmap) = &params.cmap {
            debug!(
                "Ignoring cmap url {} (packed: {}), MuPDF ships its own CMaps",
                cmap.url, cmap.packed
            );
        }

        let bytes = source::fetch(params)?;
        let doc = Document::from_bytes(&bytes, PDF_MIME)?;
        let page_count = doc.page_count()? as usize;
        Ok(Box::new(MupdfDocument { doc, page_count }))
    }
}

struct MupdfDocument {
    doc: Document,
    page_count: usize,
}

impl EngineDocument for MupdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    /// MuPDF reports bounds with the page's own rotation already applied, so the
    /// intrinsic rotation is folded into the size.
    fn page(&self, number: usize) -> Result<PageInfo, EngineFault> {
        check_page_number(number, self.page_count)?;
        let page = self.doc.load_page((number - 1) as i32)?;
        let bounds = page.bounds()?;
        Ok(PageInfo {
            rotation: 0,
            width: bounds.x1 - bounds.x0,
            height: bounds.y1 - bounds.y0,
        })
    }

    fn draw(&self, number: usize, viewport: &Viewport, density: f32) -> Result<Raster, EngineFault> {
        check_page_number(number, self.page_count)?;
        let page = self.doc.load_page((number - 1) as i32)?;

        let mag = viewport.scale * density;
        let mut matrix = Matrix::new_scale(mag, mag);
        if viewport.rotation.degrees() != 0 {
            matrix.concat(Matrix::new_rotate(viewport.rotation.degrees() as f32));
        }

        let pixmap = page.to_pixmap(&matrix, &Colorspace::device_rgb(), false, false)?;
        pixmap_to_rgba(&pixmap)
    }
}

fn pixmap_to_rgba(pixmap: &Pixmap) -> Result<Raster, EngineFault> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(EngineFault::generic(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    let expected_min = stride.saturating_mul(height);
    if samples.len() < expected_min || row_bytes > stride {
        return Err(EngineFault::generic("Pixmap buffer size mismatch"));
    }

    let mut pixels = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        let row_start = y * stride;
        let row = &samples[row_start..row_start + row_bytes];
        for px in row.chunks_exact(n) {
            let alpha = if n >= 4 { px[3] } else { 255 };
            pixels.extend_from_slice(&[px[0], px[1], px[2], alpha]);
        }
    }

    Ok(Raster {
        pixels,
        width: width as u32,
        height: height as u32,
    })
}
