//! Pipeline stages for PDF↔image conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the pdfium-backed stages can be swapped for fakes.
//!
//! ## Data Flow
//!
//! ```text
//! PDF    ──▶ render ──▶ encode ──▶ artifact store
//!            (pdfium)   (PNG)
//!
//! images ──▶ decode ──▶ normalise ──▶ compose ──▶ PDF bytes
//!            (image)    (PNG/JPEG)    (pdfium)
//! ```
//!
//! 1. [`render`]: rasterise every page; pdfium is blocking, callers run it
//!    on `spawn_blocking`
//! 2. [`encode`]: PNG-encode each rendered page
//! 3. [`decode`]: sniff and decode uploaded images into a result value, then
//!    normalise anything that is not PNG or JPEG to PNG
//! 4. [`compose`]: one PDF page per image, page size = pixel size

pub mod compose;
pub mod decode;
pub mod encode;
pub mod render;
