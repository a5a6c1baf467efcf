//! pdfium binding.
//!
//! pdfium is a C++ shared library loaded at runtime. Binding is done once per
//! process; the resulting [`Pdfium`] handle is shared through an [`Arc`] by
//! the rasteriser and the composer. `pdfium-render`'s `sync` feature makes
//! the handle `Send + Sync`; `thread_safe` serialises calls into the library.
//!
//! ## Library resolution (first match wins)
//!
//! 1. the path given in [`crate::ConversionConfig::pdfium_lib_path`]
//! 2. `PDFIUM_LIB_PATH` (a library file, or a directory containing one)
//! 3. the platform library name in the current working directory
//! 4. the system library search path

use crate::error::ConvertError;
use pdfium_render::prelude::Pdfium;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Environment variable naming an existing pdfium library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

// Binding twice in one process is rejected by pdfium-render, so the first
// successful handle is kept for every later caller.
static BOUND: Mutex<Option<Arc<Pdfium>>> = Mutex::new(None);

/// Bind to pdfium, or return the handle bound earlier in this process.
///
/// `explicit` takes priority over every other source. Once a library has been
/// bound, later calls return it regardless of `explicit`.
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Arc<Pdfium>, ConvertError> {
    let mut bound = BOUND
        .lock()
        .map_err(|_| ConvertError::Internal("pdfium binding lock poisoned".into()))?;

    if let Some(pdfium) = bound.as_ref() {
        return Ok(Arc::clone(pdfium));
    }

    let pdfium = Arc::new(resolve_and_bind(explicit)?);
    *bound = Some(Arc::clone(&pdfium));
    Ok(pdfium)
}

fn resolve_and_bind(explicit: Option<&Path>) -> Result<Pdfium, ConvertError> {
    if let Some(path) = explicit {
        return bind_from_path(&library_file(path));
    }

    if let Ok(p) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        if !p.is_empty() {
            return bind_from_path(&library_file(Path::new(&p)));
        }
    }

    let local = Pdfium::pdfium_platform_library_name_at_path("./");
    if local.exists() {
        return bind_from_path(&local);
    }

    debug!("No local pdfium library, trying system search path");
    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| ConvertError::EngineUnavailable(format!("system library: {e}")))
}

/// Accept either the library file itself or the directory that holds it.
fn library_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    }
}

fn bind_from_path(path: &Path) -> Result<Pdfium, ConvertError> {
    let pdfium = Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| ConvertError::EngineUnavailable(format!("'{}': {e}", path.display())))?;
    info!("Bound pdfium from {}", path.display());
    Ok(pdfium)
}
