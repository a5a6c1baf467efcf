//! PDF composition: one page per image via pdfium.
//!
//! Each page is sized so one PDF point equals one source pixel, and the image
//! is scaled to fill it. A 1200×800 photo becomes a 1200×800 pt page; a
//! viewer at 100 % shows it at its native pixel size on a 72 DPI display.

use crate::error::ConvertError;
use crate::pipeline::decode::PageImage;
use pdfium_render::prelude::*;
use std::sync::Arc;
use tracing::debug;

/// Turns an ordered sequence of images into PDF bytes, one page each.
pub trait Composer: Send + Sync {
    fn compose(&self, pages: &[PageImage]) -> Result<Vec<u8>, ConvertError>;
}

/// [`Composer`] backed by pdfium.
pub struct PdfiumComposer {
    pdfium: Arc<Pdfium>,
}

impl PdfiumComposer {
    pub fn new(pdfium: Arc<Pdfium>) -> Self {
        Self { pdfium }
    }
}

fn compose_failed(context: &str, e: impl std::fmt::Debug) -> ConvertError {
    ConvertError::PdfComposeFailed {
        detail: format!("{context}: {e:?}"),
    }
}

impl Composer for PdfiumComposer {
    fn compose(&self, pages: &[PageImage]) -> Result<Vec<u8>, ConvertError> {
        if pages.is_empty() {
            return Err(ConvertError::PdfComposeFailed {
                detail: "no images to compose".into(),
            });
        }

        let mut document = self
            .pdfium
            .create_new_pdf()
            .map_err(|e| compose_failed("create document", e))?;

        for (idx, page_image) in pages.iter().enumerate() {
            let image = image::load_from_memory_with_format(&page_image.bytes, page_image.format.into())
                .map_err(|e| compose_failed(&format!("decode page {}", idx + 1), e))?;

            let width = PdfPoints::new(page_image.width as f32);
            let height = PdfPoints::new(page_image.height as f32);

            let mut page = document
                .pages_mut()
                .create_page_at_end(PdfPagePaperSize::Custom(width, height))
                .map_err(|e| compose_failed(&format!("create page {}", idx + 1), e))?;

            let mut image_object = PdfPageImageObject::new(&document, &image)
                .map_err(|e| compose_failed(&format!("embed page {}", idx + 1), e))?;
            image_object
                .scale(width.value, height.value)
                .map_err(|e| compose_failed(&format!("scale page {}", idx + 1), e))?;

            page.objects_mut()
                .add_object(PdfPageObject::Image(image_object))
                .map_err(|e| compose_failed(&format!("place page {}", idx + 1), e))?;

            debug!(
                "Composed page {} ({}x{} pt)",
                idx + 1,
                page_image.width,
                page_image.height
            );
        }

        document
            .save_to_bytes()
            .map_err(|e| compose_failed("save document", e))
    }
}
