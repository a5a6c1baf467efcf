//! Upload decoding and normalisation for image → PDF jobs.
//!
//! The file extension only gates the upload; the actual encoding is sniffed
//! from the bytes. Decoding produces a [`DecodeOutcome`] value rather than an
//! error so the caller decides how a bad file fails the batch.
//!
//! Normalisation guarantees the composer only ever sees PNG or JPEG: those
//! pass through byte-for-byte, anything else (a GIF renamed to `.png`, a BMP
//! saved as `.jpg`) is re-encoded to PNG without touching its pixels.

use crate::error::ConvertError;
use crate::pipeline::encode::encode_png;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat};

/// Encodings the composer accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFormat {
    Png,
    Jpeg,
}

impl From<PageFormat> for ImageFormat {
    fn from(f: PageFormat) -> Self {
        match f {
            PageFormat::Png => ImageFormat::Png,
            PageFormat::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// A normalised page image, ready for composition.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub format: PageFormat,
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
}

/// A successfully decoded upload.
#[derive(Debug)]
pub struct DecodedImage {
    /// Encoding detected from the bytes, not from the filename.
    pub format: ImageFormat,
    pub image: DynamicImage,
    pub original: Bytes,
}

/// Result of trying to read an upload as a raster image.
#[derive(Debug)]
pub enum DecodeOutcome {
    Decoded(DecodedImage),
    Failed(String),
}

/// Sniff and decode `bytes` as an image.
pub fn decode_image(bytes: &Bytes) -> DecodeOutcome {
    let format = match image::guess_format(bytes) {
        Ok(f) => f,
        Err(e) => return DecodeOutcome::Failed(e.to_string()),
    };

    match image::load_from_memory_with_format(bytes, format) {
        Ok(image) => DecodeOutcome::Decoded(DecodedImage {
            format,
            image,
            original: bytes.clone(),
        }),
        Err(e) => DecodeOutcome::Failed(e.to_string()),
    }
}

/// Pass PNG and JPEG through untouched; re-encode anything else as PNG.
pub fn normalize(decoded: DecodedImage) -> Result<PageImage, ConvertError> {
    let (width, height) = (decoded.image.width(), decoded.image.height());

    let (format, bytes) = match decoded.format {
        ImageFormat::Png => (PageFormat::Png, decoded.original),
        ImageFormat::Jpeg => (PageFormat::Jpeg, decoded.original),
        other => {
            tracing::debug!("Re-encoding {:?} upload as PNG", other);
            let png = encode_png(&decoded.image).map_err(|e| ConvertError::PdfComposeFailed {
                detail: format!("could not re-encode {:?} image as PNG: {e}", other),
            })?;
            (PageFormat::Png, Bytes::from(png))
        }
    };

    Ok(PageImage {
        format,
        bytes,
        width,
        height,
    })
}
