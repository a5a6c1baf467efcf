//! Upload batches: validation, job classification and filename handling.
//!
//! A batch is whatever one form submission carried, in request order. Every
//! file is checked against [`ALLOWED_EXTENSIONS`] before any work starts, so
//! a single bad file rejects the whole batch without side effects.

use crate::error::ConvertError;
use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Lowercase extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["pdf", "png", "jpg", "jpeg"];

/// Stem used when sanitising leaves nothing of the original name.
const FALLBACK_STEM: &str = "upload";

/// One uploaded file: the name the client declared plus its bytes.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content: Bytes,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    /// Lower-cased extension after the last `.`, if any.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.filename)
    }
}

/// The files of one submission, in request order.
#[derive(Debug, Clone, Default)]
pub struct UploadBatch {
    files: Vec<UploadedFile>,
}

impl UploadBatch {
    pub fn new(files: Vec<UploadedFile>) -> Self {
        Self { files }
    }

    pub fn push(&mut self, file: UploadedFile) {
        self.files.push(file);
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Check the batch is non-empty and every file is allow-listed.
    ///
    /// Returns the first offending file as [`ConvertError::UnsupportedFormat`].
    pub fn validate(&self) -> Result<(), ConvertError> {
        match self.files.first() {
            None => return Err(ConvertError::EmptyBatch),
            Some(first) if first.filename.is_empty() => return Err(ConvertError::EmptyBatch),
            Some(_) => {}
        }

        for file in &self.files {
            if !is_allowed(&file.filename) {
                return Err(ConvertError::UnsupportedFormat {
                    filename: file.filename.clone(),
                });
            }
        }
        Ok(())
    }

    /// Which conversion this batch asks for, judged by the first file only.
    ///
    /// Returns `None` for an empty batch.
    pub fn job_kind(&self) -> Option<JobKind> {
        self.files.first().map(|f| {
            if f.extension().as_deref() == Some("pdf") {
                JobKind::PdfToImages
            } else {
                JobKind::ImagesToPdf
            }
        })
    }

    /// Validate and split the batch into the job it describes.
    ///
    /// A PDF-first batch converts only the first file; anything after it is
    /// dropped, even other PDFs or images.
    pub fn into_job(self) -> Result<ConversionJob, ConvertError> {
        self.validate()?;
        let kind = self.job_kind().ok_or(ConvertError::EmptyBatch)?;
        let mut files = self.files;

        match kind {
            JobKind::PdfToImages => {
                if files.len() > 1 {
                    tracing::debug!(
                        "Ignoring {} file(s) after leading PDF '{}'",
                        files.len() - 1,
                        files[0].filename
                    );
                }
                files.truncate(1);
                let source = files.pop().ok_or(ConvertError::EmptyBatch)?;
                Ok(ConversionJob::PdfToImages { source })
            }
            JobKind::ImagesToPdf => Ok(ConversionJob::ImagesToPdf { sources: files }),
        }
    }
}

impl From<Vec<UploadedFile>> for UploadBatch {
    fn from(files: Vec<UploadedFile>) -> Self {
        Self::new(files)
    }
}

/// The two conversion directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobKind {
    PdfToImages,
    ImagesToPdf,
}

/// A validated batch, ready to execute.
#[derive(Debug, Clone)]
pub enum ConversionJob {
    PdfToImages { source: UploadedFile },
    ImagesToPdf { sources: Vec<UploadedFile> },
}

impl ConversionJob {
    pub fn kind(&self) -> JobKind {
        match self {
            ConversionJob::PdfToImages { .. } => JobKind::PdfToImages,
            ConversionJob::ImagesToPdf { .. } => JobKind::ImagesToPdf,
        }
    }
}

/// Lower-cased substring after the last `.`; `None` when there is no dot.
pub fn extension_of(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// `true` if the filename has an allow-listed extension.
pub fn is_allowed(filename: &str) -> bool {
    extension_of(filename).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

static RE_UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

/// Reduce a client-supplied filename to something safe to embed in artifact
/// keys and `Content-Disposition` headers.
///
/// Directory components are dropped, runs of unsafe characters become `_`
/// and leading dots are removed.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();
    let cleaned = RE_UNSAFE_CHARS.replace_all(base, "_");
    cleaned.trim_start_matches('.').to_string()
}

/// Sanitised filename with its final extension removed.
pub fn file_stem(filename: &str) -> String {
    let safe = sanitize_filename(filename);
    let stem = match safe.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => safe.as_str(),
    };
    if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem.to_string()
    }
}

/// Artifact name of page `page` (1-indexed) of a rasterised PDF.
pub fn page_image_name(stem: &str, page: usize) -> String {
    format!("{stem}_page_{page}.png")
}
