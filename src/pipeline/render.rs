//! PDF rasterisation for the in-process strategies.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated blocking
//! thread. The runner awaits it straight away, so the run stays sequential;
//! the CPU the blocking thread burns still counts towards the process clock.
//!
//! Rendering happens before the timed image stage starts: the benchmark times
//! recolouring and encoding, not page decoding.

use crate::error::BenchError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Produces one image per page of a PDF.
pub trait Rasterizer: Send + Sync {
    /// Render every page of `pdf` at `dpi`, in page order.
    fn rasterize(
        &self,
        pdf: &Path,
        dpi: u32,
    ) -> impl Future<Output = Result<Vec<DynamicImage>, BenchError>> + Send;
}

/// [`Rasterizer`] backed by the pdfium native library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library: Option<PathBuf>,
}

impl PdfiumRasterizer {
    /// `library` is a directory containing the platform pdfium library, or the
    /// library file itself. `None` uses the system search path.
    pub fn new(library: Option<PathBuf>) -> Self {
        Self { library }
    }

    /// Check the library can be bound without rendering anything.
    pub fn probe(&self) -> Result<(), BenchError> {
        bind_pdfium(self.library.as_deref()).map(|_| ())
    }
}

impl Rasterizer for PdfiumRasterizer {
    async fn rasterize(&self, pdf: &Path, dpi: u32) -> Result<Vec<DynamicImage>, BenchError> {
        let path = pdf.to_path_buf();
        let library = self.library.clone();

        tokio::task::spawn_blocking(move || rasterize_blocking(&path, dpi, library.as_deref()))
            .await
            .map_err(|e| BenchError::Internal(format!("Render task panicked: {}", e)))?
    }
}

fn bind_pdfium(library: Option<&Path>) -> Result<Pdfium, BenchError> {
    let bindings = match library {
        Some(p) if p.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(p))
        }
        Some(p) => Pdfium::bind_to_library(p),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| BenchError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of page rendering.
fn rasterize_blocking(
    pdf_path: &Path,
    dpi: u32,
    library: Option<&Path>,
) -> Result<Vec<DynamicImage>, BenchError> {
    let pdfium = bind_pdfium(library)?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| BenchError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    // PDF user space is 72 units per inch.
    let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

    let mut images = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            BenchError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        images.push(image);
    }

    Ok(images)
}
