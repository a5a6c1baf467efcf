//! Error types for the pdfconv library.
//!
//! Two error types reflect two layers:
//!
//! * [`ConvertError`]: a conversion job failed. Most variants are expected
//!   user-input errors (wrong extension, corrupt image) whose message is safe
//!   to show to whoever uploaded the files. The remaining variants are
//!   internal and only ever surface as [`GENERIC_FAILURE_MESSAGE`].
//!
//! * [`StoreError`]: an [`crate::store::ArtifactStore`] operation failed.
//!   Returned directly by the store and wrapped in
//!   [`ConvertError::Storage`] when it happens mid-job.

use thiserror::Error;

/// Message shown to users for every error that is not their fault.
pub const GENERIC_FAILURE_MESSAGE: &str = "An internal error occurred while converting your files";

/// All errors a conversion job can end with.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The batch had no files, or the first file had no name.
    #[error("No file selected")]
    EmptyBatch,

    /// A file's extension is missing or not in the allow-list.
    #[error("Unsupported format: {filename}")]
    UnsupportedFormat { filename: String },

    /// An upload claimed to be an image but could not be decoded.
    #[error("Could not read image '{filename}': {detail}")]
    ImageDecodeFailed { filename: String, detail: String },

    // ── Codec errors ──────────────────────────────────────────────────────
    /// pdfium could not open the PDF or render one of its pages.
    ///
    /// `page` is 1-indexed; `None` when the document itself failed to load.
    #[error("Could not render the PDF: {detail}")]
    RasterizationFailed { page: Option<usize>, detail: String },

    /// Normalising or composing the images into a PDF failed.
    #[error("PDF conversion failed: {detail}")]
    PdfComposeFailed { detail: String },

    // ── Environment errors ────────────────────────────────────────────────
    /// The pdfium shared library could not be bound.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or pass --pdfium-lib to use a specific copy."
    )]
    EngineUnavailable(String),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Writing produced artifacts failed.
    #[error("Artifact storage failed: {0}")]
    Storage(#[from] StoreError),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (panicked codec task, broken invariant).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// `true` for errors caused by what was uploaded rather than by the server.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ConvertError::EmptyBatch
                | ConvertError::UnsupportedFormat { .. }
                | ConvertError::ImageDecodeFailed { .. }
                | ConvertError::RasterizationFailed { .. }
                | ConvertError::PdfComposeFailed { .. }
        )
    }

    /// The message that may be shown to the uploader.
    ///
    /// Internal variants collapse to [`GENERIC_FAILURE_MESSAGE`] so paths,
    /// library names and panic payloads never reach a response body.
    pub fn user_message(&self) -> String {
        if self.is_user_error() {
            self.to_string()
        } else {
            GENERIC_FAILURE_MESSAGE.to_string()
        }
    }
}

/// Errors returned by [`crate::store::ArtifactStore`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Invalid artifact key: {0}")]
    InvalidKey(String),

    #[error("Artifact I/O error: {0}")]
    Io(#[from] std::io::Error),
}
