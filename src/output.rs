//! Conversion results.

use crate::batch::JobKind;
use crate::store::artifact_key;
use bytes::Bytes;
use serde::Serialize;

/// Page images produced from a PDF, in page order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageArtifacts {
    /// Per-job token prefixing every storage key.
    pub namespace: String,
    /// `{stem}_page_{n}.png`, n from 1.
    pub names: Vec<String>,
}

impl ImageArtifacts {
    /// Storage keys of the pages, in page order.
    pub fn keys(&self) -> Vec<String> {
        self.names
            .iter()
            .map(|name| artifact_key(&self.namespace, name))
            .collect()
    }
}

/// A composed PDF, returned directly rather than stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfArtifact {
    pub bytes: Bytes,
    /// `{stem}.pdf`.
    pub download_name: String,
}

/// What a successful job produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutput {
    Images(ImageArtifacts),
    Pdf(PdfArtifact),
}

impl ConversionOutput {
    pub fn kind(&self) -> JobKind {
        match self {
            ConversionOutput::Images(_) => JobKind::PdfToImages,
            ConversionOutput::Pdf(_) => JobKind::ImagesToPdf,
        }
    }
}

/// Outcome of [`crate::convert::Converter::run`]: every failure already
/// reduced to a message that is safe to show the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionResult {
    ImageArtifacts(ImageArtifacts),
    PdfArtifact(PdfArtifact),
    Failure { message: String },
}

impl From<ConversionOutput> for ConversionResult {
    fn from(output: ConversionOutput) -> Self {
        match output {
            ConversionOutput::Images(images) => ConversionResult::ImageArtifacts(images),
            ConversionOutput::Pdf(pdf) => ConversionResult::PdfArtifact(pdf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_in_page_order() {
        let artifacts = ImageArtifacts {
            namespace: "abc".into(),
            names: vec!["doc_page_1.png".into(), "doc_page_2.png".into()],
        };
        assert_eq!(artifacts.keys(), ["abc/doc_page_1.png", "abc/doc_page_2.png"]);
    }
}
