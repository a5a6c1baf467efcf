//! Shared fixtures: in-memory images and fake codecs for orchestration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use pdfconv::{
    ArtifactStore, Composer, ConversionConfig, ConvertError, Converter, MemoryStore, PageFormat,
    PageImage, Rasterizer, StoreError,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Images ──────────────────────────────────────────────────────────────────

pub fn solid(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 120, 40])))
}

pub fn encoded(width: u32, height: u32, format: ImageFormat) -> Bytes {
    let mut buf = Vec::new();
    solid(width, height)
        .write_to(&mut Cursor::new(&mut buf), format)
        .expect("encode fixture");
    Bytes::from(buf)
}

pub fn png(width: u32, height: u32) -> Bytes {
    encoded(width, height, ImageFormat::Png)
}

pub fn jpeg(width: u32, height: u32) -> Bytes {
    encoded(width, height, ImageFormat::Jpeg)
}

pub fn bmp(width: u32, height: u32) -> Bytes {
    encoded(width, height, ImageFormat::Bmp)
}

/// Bytes the fake rasteriser accepts as a PDF.
pub fn fake_pdf() -> Bytes {
    Bytes::from_static(b"%PDF-1.7\n% fake document\n")
}

// ── Fake rasteriser ─────────────────────────────────────────────────────────

/// Returns one solid image per configured page size.
pub struct FakeRasterizer {
    pages: Vec<(u32, u32)>,
    fail_at_page: Option<usize>,
    pub calls: AtomicUsize,
}

impl FakeRasterizer {
    pub fn with_pages(pages: Vec<(u32, u32)>) -> Self {
        Self {
            pages,
            fail_at_page: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_at(page: usize, pages: Vec<(u32, u32)>) -> Self {
        Self {
            fail_at_page: Some(page),
            ..Self::with_pages(pages)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Rasterizer for FakeRasterizer {
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<DynamicImage>, ConvertError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !pdf.starts_with(b"%PDF") {
            return Err(ConvertError::RasterizationFailed {
                page: None,
                detail: "file is not a PDF document".into(),
            });
        }
        let mut out = Vec::with_capacity(self.pages.len());
        for (idx, &(w, h)) in self.pages.iter().enumerate() {
            if self.fail_at_page == Some(idx + 1) {
                return Err(ConvertError::RasterizationFailed {
                    page: Some(idx + 1),
                    detail: format!("page {} is damaged", idx + 1),
                });
            }
            out.push(solid(w, h));
        }
        Ok(out)
    }
}

// ── Fake composer ───────────────────────────────────────────────────────────

/// Records what it was asked to compose and returns a recognisable stub.
#[derive(Default)]
pub struct RecordingComposer {
    pub jobs: Mutex<Vec<Vec<(u32, u32, PageFormat)>>>,
}

impl RecordingComposer {
    pub fn calls(&self) -> Vec<Vec<(u32, u32, PageFormat)>> {
        self.jobs.lock().unwrap().clone()
    }
}

impl Composer for RecordingComposer {
    fn compose(&self, pages: &[PageImage]) -> Result<Vec<u8>, ConvertError> {
        self.jobs.lock().unwrap().push(
            pages
                .iter()
                .map(|p| (p.width, p.height, p.format))
                .collect(),
        );
        Ok(format!("%PDF-stub pages={}", pages.len()).into_bytes())
    }
}

/// A composer that always panics, standing in for a crashing codec.
pub struct PanickingComposer;

impl Composer for PanickingComposer {
    fn compose(&self, _pages: &[PageImage]) -> Result<Vec<u8>, ConvertError> {
        panic!("codec blew up at /usr/lib/libpdfium.so");
    }
}

// ── Flaky store ─────────────────────────────────────────────────────────────

/// Accepts `succeed` puts, then fails every later one.
pub struct FlakyStore {
    inner: MemoryStore,
    succeed: usize,
    puts: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl FlakyStore {
    pub fn new(succeed: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            succeed,
            puts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }
}

#[async_trait]
impl ArtifactStore for FlakyStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<String, StoreError> {
        if self.puts.fetch_add(1, Ordering::SeqCst) >= self.succeed {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.inner.put(key, data).await
    }

    async fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key).await
    }
}

// ── Converter wiring ────────────────────────────────────────────────────────

pub struct Harness {
    pub converter: Arc<Converter>,
    pub rasterizer: Arc<FakeRasterizer>,
    pub composer: Arc<RecordingComposer>,
    pub store: Arc<MemoryStore>,
}

pub fn harness(pages: Vec<(u32, u32)>) -> Harness {
    let rasterizer = Arc::new(FakeRasterizer::with_pages(pages));
    let composer = Arc::new(RecordingComposer::default());
    let store = Arc::new(MemoryStore::new());
    let converter = Arc::new(Converter::new(
        ConversionConfig::default(),
        Arc::clone(&rasterizer) as Arc<dyn Rasterizer>,
        Arc::clone(&composer) as Arc<dyn Composer>,
        Arc::clone(&store) as Arc<dyn ArtifactStore>,
    ));
    Harness {
        converter,
        rasterizer,
        composer,
        store,
    }
}
