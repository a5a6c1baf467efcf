//! PDF rasterisation: render every page to a `DynamicImage` via pdfium.
//!
//! pdfium is blocking and CPU-bound; [`crate::convert::Converter`] calls
//! [`Rasterizer::rasterize`] from `tokio::task::spawn_blocking` so Tokio
//! worker threads never stall on a large document.
//!
//! Pages are rendered at the configured DPI, capped at
//! `max_rendered_pixels` on either edge so a poster-sized page cannot exhaust
//! memory.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

/// Bytes pdfium tolerates before the `%PDF` header.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Turns PDF bytes into one raster image per page, in page order.
///
/// Implementations must fail the whole call if any page fails; partial
/// output is never returned.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<DynamicImage>, ConvertError>;
}

/// [`Rasterizer`] backed by pdfium.
pub struct PdfiumRasterizer {
    pdfium: Arc<Pdfium>,
    scale: f32,
    max_pixels: u32,
}

impl PdfiumRasterizer {
    pub fn new(pdfium: Arc<Pdfium>, config: &ConversionConfig) -> Self {
        Self {
            pdfium,
            scale: config.render_scale(),
            max_pixels: config.max_rendered_pixels,
        }
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<DynamicImage>, ConvertError> {
        if !looks_like_pdf(pdf) {
            return Err(ConvertError::RasterizationFailed {
                page: None,
                detail: "file is not a PDF document".into(),
            });
        }

        let document = self
            .pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| ConvertError::RasterizationFailed {
                page: None,
                detail: format!("{:?}", e),
            })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        if total_pages == 0 {
            return Err(ConvertError::RasterizationFailed {
                page: None,
                detail: "document has no pages".into(),
            });
        }
        info!("PDF loaded: {} pages", total_pages);

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(self.scale)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        let mut images = Vec::with_capacity(total_pages);
        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                ConvertError::RasterizationFailed {
                    page: Some(idx + 1),
                    detail: format!("page {}: {:?}", idx + 1, e),
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
}

/// `true` if a `%PDF` header appears where pdfium would look for it.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(4).any(|w| w == b"%PDF")
}
