//! The conversion orchestrator.
//!
//! [`Converter`] takes one [`UploadBatch`], validates it, picks the direction
//! from the first file and runs the matching pipeline:
//!
//! ```text
//! Received ─▶ Validated ─┬─▶ PdfToImages ─┬─▶ Succeeded
//!                        └─▶ ImagesToPdf ─┘─▶ Failed
//! ```
//!
//! Every job runs to completion or failure inside one call. pdfium and image
//! codec work happens on `spawn_blocking`, so a panicking codec surfaces as
//! [`ConvertError::Internal`] instead of unwinding through the server.

use crate::batch::{file_stem, page_image_name, ConversionJob, UploadBatch, UploadedFile};
use crate::config::ConversionConfig;
use crate::engine::bind_pdfium;
use crate::error::ConvertError;
use crate::output::{ConversionOutput, ConversionResult, ImageArtifacts, PdfArtifact};
use crate::pipeline::compose::{Composer, PdfiumComposer};
use crate::pipeline::decode::{decode_image, normalize, DecodeOutcome};
use crate::pipeline::encode::encode_png;
use crate::pipeline::render::{PdfiumRasterizer, Rasterizer};
use crate::store::{artifact_key, ArtifactStore};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Runs conversion jobs against injected codecs and an artifact store.
///
/// Cheap to share: wrap in an [`Arc`] and hand clones to request handlers.
pub struct Converter {
    config: ConversionConfig,
    rasterizer: Arc<dyn Rasterizer>,
    composer: Arc<dyn Composer>,
    store: Arc<dyn ArtifactStore>,
}

impl Converter {
    pub fn new(
        config: ConversionConfig,
        rasterizer: Arc<dyn Rasterizer>,
        composer: Arc<dyn Composer>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            config,
            rasterizer,
            composer,
            store,
        }
    }

    /// Bind pdfium and build a converter using it for both directions.
    pub fn with_pdfium(
        config: ConversionConfig,
        store: Arc<dyn ArtifactStore>,
    ) -> Result<Self, ConvertError> {
        let pdfium = bind_pdfium(config.pdfium_lib_path.as_deref())?;
        let rasterizer = Arc::new(PdfiumRasterizer::new(Arc::clone(&pdfium), &config));
        let composer = Arc::new(PdfiumComposer::new(pdfium));
        Ok(Self::new(config, rasterizer, composer, store))
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Run a batch, reducing any failure to a user-safe message.
    ///
    /// Input errors keep their message; internal errors are logged with full
    /// detail and replaced by a generic one.
    pub async fn run(&self, batch: UploadBatch) -> ConversionResult {
        match self.try_run(batch).await {
            Ok(output) => output.into(),
            Err(e) => {
                if e.is_user_error() {
                    info!("Conversion rejected: {}", e);
                } else {
                    error!(error = %e, detail = ?e, "Conversion failed");
                }
                ConversionResult::Failure {
                    message: e.user_message(),
                }
            }
        }
    }

    /// Run a batch, returning the typed error on failure.
    pub async fn try_run(&self, batch: UploadBatch) -> Result<ConversionOutput, ConvertError> {
        let start = Instant::now();
        let file_count = batch.len();
        let job = batch.into_job()?;
        info!("Starting {:?} job ({} file(s) uploaded)", job.kind(), file_count);

        let output = match job {
            ConversionJob::PdfToImages { source } => self.pdf_to_images(source).await?,
            ConversionJob::ImagesToPdf { sources } => self.images_to_pdf(sources).await?,
        };

        info!(
            "{:?} job complete in {}ms",
            output.kind(),
            start.elapsed().as_millis()
        );
        Ok(output)
    }

    async fn pdf_to_images(&self, source: UploadedFile) -> Result<ConversionOutput, ConvertError> {
        let stem = file_stem(&source.filename);
        let rasterizer = Arc::clone(&self.rasterizer);
        let pdf = source.content;

        let encoded = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<u8>>, ConvertError> {
            let pages = rasterizer.rasterize(&pdf)?;
            pages
                .iter()
                .enumerate()
                .map(|(idx, page)| {
                    encode_png(page).map_err(|e| ConvertError::RasterizationFailed {
                        page: Some(idx + 1),
                        detail: format!("PNG encoding of page {} failed: {e}", idx + 1),
                    })
                })
                .collect()
        })
        .await
        .map_err(|e| ConvertError::Internal(format!("Render task panicked: {e}")))??;

        let namespace = Uuid::new_v4().to_string();
        let names: Vec<String> = (1..=encoded.len())
            .map(|page| page_image_name(&stem, page))
            .collect();

        self.persist_pages(&namespace, &names, encoded).await?;
        debug!("Stored {} page(s) under {}", names.len(), namespace);

        Ok(ConversionOutput::Images(ImageArtifacts { namespace, names }))
    }

    /// Store every page or none: on the first failure, pages already
    /// written for this job are removed before the error is returned.
    async fn persist_pages(
        &self,
        namespace: &str,
        names: &[String],
        pages: Vec<Vec<u8>>,
    ) -> Result<(), ConvertError> {
        let mut written: Vec<String> = Vec::with_capacity(names.len());

        for (name, png) in names.iter().zip(pages) {
            let key = artifact_key(namespace, name);
            match self.store.put(&key, Bytes::from(png)).await {
                Ok(key) => written.push(key),
                Err(e) => {
                    for key in &written {
                        if let Err(cleanup) = self.store.delete(key).await {
                            warn!("Could not remove partial artifact {}: {}", key, cleanup);
                        }
                    }
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    async fn images_to_pdf(
        &self,
        sources: Vec<UploadedFile>,
    ) -> Result<ConversionOutput, ConvertError> {
        let download_name = sources
            .first()
            .map(|f| format!("{}.pdf", file_stem(&f.filename)))
            .ok_or(ConvertError::EmptyBatch)?;
        let composer = Arc::clone(&self.composer);

        let bytes = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, ConvertError> {
            let mut pages = Vec::with_capacity(sources.len());
            for file in &sources {
                let decoded = match decode_image(&file.content) {
                    DecodeOutcome::Decoded(decoded) => decoded,
                    DecodeOutcome::Failed(detail) => {
                        return Err(ConvertError::ImageDecodeFailed {
                            filename: file.filename.clone(),
                            detail,
                        })
                    }
                };
                pages.push(normalize(decoded)?);
            }
            composer.compose(&pages)
        })
        .await
        .map_err(|e| ConvertError::Internal(format!("Compose task panicked: {e}")))??;

        Ok(ConversionOutput::Pdf(PdfArtifact {
            bytes: Bytes::from(bytes),
            download_name,
        }))
    }
}
