//! Orchestration tests for `Converter`, run against fake codecs so they need
//! no pdfium library.

mod common;

use common::*;
use pdfconv::{
    ArtifactStore, Composer, ConversionConfig, ConversionOutput, ConversionResult, ConvertError,
    Converter, MemoryStore, PageFormat, Rasterizer, UploadBatch, UploadedFile,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn batch(files: Vec<(&str, bytes::Bytes)>) -> UploadBatch {
    UploadBatch::new(
        files
            .into_iter()
            .map(|(name, content)| UploadedFile::new(name, content))
            .collect(),
    )
}

// ── Validation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn unsupported_file_fails_before_any_work() {
    let h = harness(vec![(10, 10)]);

    let err = h
        .converter
        .try_run(batch(vec![("doc.pdf", fake_pdf()), ("notes.txt", png(4, 4))]))
        .await
        .unwrap_err();

    match err {
        ConvertError::UnsupportedFormat { filename } => assert_eq!(filename, "notes.txt"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(h.rasterizer.call_count(), 0);
    assert!(h.composer.calls().is_empty());
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn notes_txt_alone_is_unsupported() {
    let h = harness(vec![]);
    let result = h
        .converter
        .run(batch(vec![("notes.txt", bytes::Bytes::from_static(b"hello"))]))
        .await;
    assert_eq!(
        result,
        ConversionResult::Failure {
            message: "Unsupported format: notes.txt".into()
        }
    );
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn empty_batch_is_reported() {
    let h = harness(vec![]);
    let result = h.converter.run(UploadBatch::default()).await;
    assert_eq!(
        result,
        ConversionResult::Failure {
            message: "No file selected".into()
        }
    );
}

// ── PDF → images ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn pdf_pages_become_numbered_artifacts() {
    let h = harness(vec![(30, 40), (50, 20), (10, 10)]);

    let output = h
        .converter
        .try_run(batch(vec![("report.pdf", fake_pdf())]))
        .await
        .unwrap();

    let ConversionOutput::Images(images) = output else {
        panic!("expected images, got {output:?}");
    };
    assert_eq!(
        images.names,
        ["report_page_1.png", "report_page_2.png", "report_page_3.png"]
    );
    assert_eq!(h.store.len().await, 3);

    let expected_sizes = [(30, 40), (50, 20), (10, 10)];
    for (key, (w, h_px)) in images.keys().iter().zip(expected_sizes) {
        let bytes = h.store.get(key).await.unwrap();
        let page = image::load_from_memory(&bytes).unwrap();
        assert_eq!((page.width(), page.height()), (w, h_px), "{key}");
    }
}

#[tokio::test]
async fn files_after_a_leading_pdf_are_ignored() {
    let h = harness(vec![(8, 8)]);

    let output = h
        .converter
        .try_run(batch(vec![("doc.pdf", fake_pdf()), ("extra.png", png(5, 5))]))
        .await
        .unwrap();

    let ConversionOutput::Images(images) = output else {
        panic!("expected images");
    };
    assert_eq!(images.names, ["doc_page_1.png"]);
    assert_eq!(h.rasterizer.call_count(), 1);
    assert!(h.composer.calls().is_empty());
}

#[tokio::test]
async fn rasterisation_failure_stores_nothing() {
    let rasterizer = Arc::new(FakeRasterizer::failing_at(2, vec![(5, 5), (5, 5), (5, 5)]));
    let store = Arc::new(MemoryStore::new());
    let converter = Converter::new(
        ConversionConfig::default(),
        rasterizer as Arc<dyn Rasterizer>,
        Arc::new(RecordingComposer::default()) as Arc<dyn Composer>,
        Arc::clone(&store) as Arc<dyn ArtifactStore>,
    );

    let err = converter
        .try_run(batch(vec![("scan.pdf", fake_pdf())]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConvertError::RasterizationFailed { page: Some(2), .. }
    ));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn storage_failure_removes_pages_already_written() {
    let store = Arc::new(FlakyStore::new(2));
    let converter = Converter::new(
        ConversionConfig::default(),
        Arc::new(FakeRasterizer::with_pages(vec![(4, 4); 4])) as Arc<dyn Rasterizer>,
        Arc::new(RecordingComposer::default()) as Arc<dyn Composer>,
        Arc::clone(&store) as Arc<dyn ArtifactStore>,
    );

    let result = converter.run(batch(vec![("big.pdf", fake_pdf())])).await;

    assert_eq!(
        result,
        ConversionResult::Failure {
            message: pdfconv::error::GENERIC_FAILURE_MESSAGE.into()
        }
    );
    assert_eq!(store.len().await, 0);
    assert_eq!(store.deletes.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_jobs_with_the_same_name_do_not_collide() {
    let h = harness(vec![(6, 6)]);

    let (a, b) = tokio::join!(
        h.converter.try_run(batch(vec![("same.pdf", fake_pdf())])),
        h.converter.try_run(batch(vec![("same.pdf", fake_pdf())])),
    );
    let (ConversionOutput::Images(a), ConversionOutput::Images(b)) = (a.unwrap(), b.unwrap())
    else {
        panic!("expected images");
    };

    assert_eq!(a.names, b.names);
    assert_ne!(a.namespace, b.namespace);
    assert_eq!(h.store.len().await, 2);
}

// ── Images → PDF ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_photo_becomes_a_one_page_pdf() {
    let h = harness(vec![]);

    let result = h
        .converter
        .run(batch(vec![("photo.JPG", jpeg(64, 48))]))
        .await;

    let ConversionResult::PdfArtifact(pdf) = result else {
        panic!("expected a PDF, got {result:?}");
    };
    assert_eq!(pdf.download_name, "photo.pdf");
    assert_eq!(&pdf.bytes[..], b"%PDF-stub pages=1");
    assert_eq!(h.composer.calls(), vec![vec![(64, 48, PageFormat::Jpeg)]]);
}

#[tokio::test]
async fn images_keep_batch_order_and_dimensions() {
    let h = harness(vec![]);

    h.converter
        .try_run(batch(vec![
            ("b.png", png(10, 20)),
            ("a.jpg", jpeg(30, 15)),
            ("c.jpeg", png(7, 9)),
        ]))
        .await
        .unwrap();

    assert_eq!(
        h.composer.calls(),
        vec![vec![
            (10, 20, PageFormat::Png),
            (30, 15, PageFormat::Jpeg),
            (7, 9, PageFormat::Png),
        ]]
    );
}

#[tokio::test]
async fn mislabelled_image_is_normalised_to_png() {
    let h = harness(vec![]);

    h.converter
        .try_run(batch(vec![("scan.png", bmp(11, 13))]))
        .await
        .unwrap();

    assert_eq!(h.composer.calls(), vec![vec![(11, 13, PageFormat::Png)]]);
}

#[tokio::test]
async fn corrupt_image_names_the_file() {
    let h = harness(vec![]);

    let err = h
        .converter
        .try_run(batch(vec![
            ("good.png", png(4, 4)),
            ("fake.png", bytes::Bytes::from_static(b"not really a png")),
        ]))
        .await
        .unwrap_err();

    match err {
        ConvertError::ImageDecodeFailed { filename, .. } => assert_eq!(filename, "fake.png"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(h.composer.calls().is_empty());
}

#[tokio::test]
async fn panicking_codec_becomes_a_generic_failure() {
    let converter = Converter::new(
        ConversionConfig::default(),
        Arc::new(FakeRasterizer::with_pages(vec![])) as Arc<dyn Rasterizer>,
        Arc::new(PanickingComposer) as Arc<dyn Composer>,
        Arc::new(MemoryStore::new()) as Arc<dyn ArtifactStore>,
    );

    let result = converter.run(batch(vec![("photo.png", png(4, 4))])).await;

    let ConversionResult::Failure { message } = result else {
        panic!("expected failure");
    };
    assert_eq!(message, pdfconv::error::GENERIC_FAILURE_MESSAGE);
    assert!(!message.contains("libpdfium"));
}

#[tokio::test]
async fn download_name_uses_the_sanitised_stem() {
    let h = harness(vec![]);

    let output = h
        .converter
        .try_run(batch(vec![("../../My Scans/page one.png", png(3, 3))]))
        .await
        .unwrap();

    let ConversionOutput::Pdf(pdf) = output else {
        panic!("expected a PDF");
    };
    assert_eq!(pdf.download_name, "page_one.pdf");
}
