//! Configuration types for conversion jobs.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`] and handed to
//! [`crate::convert::Converter`] at construction. Nothing is read from
//! process-wide state, so tests can run isolated converters side by side.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lowest accepted rendering DPI.
pub const MIN_DPI: u32 = 72;
/// Highest accepted rendering DPI.
pub const MAX_DPI: u32 = 600;

/// Configuration for PDF rasterisation and image composition.
///
/// # Example
/// ```rust
/// use pdfconv::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .dpi(150)
///     .max_rendered_pixels(4000)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 150);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Rendering DPI for PDF pages. Range: 72–600. Default: 200.
    ///
    /// 200 DPI matches what poppler-based tools produce by default, so page
    /// images look the same as users expect from desktop converters. At 72 DPI
    /// one PDF point maps to exactly one pixel.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 10 000.
    ///
    /// A safety cap independent of DPI: a 200-DPI render of an A0 poster would
    /// otherwise allocate hundreds of megabytes for a single page.
    pub max_rendered_pixels: u32,

    /// Explicit path to the pdfium shared library.
    ///
    /// When `None`, [`crate::engine::bind_pdfium`] falls back to
    /// `PDFIUM_LIB_PATH`, the working directory and the system library.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            max_rendered_pixels: 10_000,
            pdfium_lib_path: None,
        }
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Scale factor from PDF points (1/72 in) to rendered pixels.
    pub fn render_scale(&self) -> f32 {
        self.dpi as f32 / 72.0
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        if c.dpi < MIN_DPI || c.dpi > MAX_DPI {
            return Err(ConvertError::InvalidConfig(format!(
                "DPI must be {MIN_DPI}–{MAX_DPI}, got {}",
                c.dpi
            )));
        }
        Ok(self.config)
    }
}
