//! # pdfconv
//!
//! Convert an uploaded PDF into one PNG per page, or a batch of images into a
//! single PDF. Ships as a library, a small web service and a CLI.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload batch
//!  │
//!  ├─ 1. Validate  every filename against {pdf, png, jpg, jpeg}
//!  ├─ 2. Classify  first file is a PDF → PdfToImages, else ImagesToPdf
//!  │
//!  ├─ PdfToImages  render via pdfium → PNG → artifact store → page names
//!  └─ ImagesToPdf  decode → normalise (PNG/JPEG) → compose via pdfium → PDF bytes
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfconv::{ConversionConfig, ConversionResult, Converter, MemoryStore, UploadBatch, UploadedFile};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::with_pdfium(ConversionConfig::default(), Arc::new(MemoryStore::new()))?;
//!     let photo = std::fs::read("photo.jpg")?;
//!     let batch = UploadBatch::new(vec![UploadedFile::new("photo.jpg", photo)]);
//!
//!     match converter.run(batch).await {
//!         ConversionResult::PdfArtifact(pdf) => std::fs::write(&pdf.download_name, &pdf.bytes)?,
//!         ConversionResult::ImageArtifacts(pages) => println!("{:?}", pages.names),
//!         ConversionResult::Failure { message } => eprintln!("{message}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | axum router and [`server::serve`] |
//! | `cli`    | on      | The `pdfconv` binary (clap + anyhow + tracing-subscriber) |
//!
//! ## PDFium
//!
//! Rendering and composition use the pdfium shared library, bound at runtime.
//! See [`engine`] for how the library is located.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
#[cfg(feature = "server")]
pub mod server;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{ConversionJob, JobKind, UploadBatch, UploadedFile, ALLOWED_EXTENSIONS};
pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::Converter;
pub use error::{ConvertError, StoreError};
pub use output::{ConversionOutput, ConversionResult, ImageArtifacts, PdfArtifact};
pub use pipeline::compose::{Composer, PdfiumComposer};
pub use pipeline::decode::{PageFormat, PageImage};
pub use pipeline::render::{PdfiumRasterizer, Rasterizer};
pub use store::{ArtifactStore, DiskStore, MemoryStore};
