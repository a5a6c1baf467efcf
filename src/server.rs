//! HTTP surface.
//!
//! | Route | Behaviour |
//! |-------|-----------|
//! | `GET /` | Upload form, with an optional `?flash=` message |
//! | `POST /` | Multipart upload under field `file`; PDF → HTML list of page images, images → PDF download |
//! | `GET /outputs/{namespace}/{name}` | A page image produced earlier |
//!
//! Expected failures (bad extension, undecodable image) redirect back to the
//! form with a flash message and never produce a `500`, as does a POST that
//! is not multipart at all. Bodies larger than
//! [`ServerConfig::max_upload_bytes`] are refused with `413`.

use crate::batch::{UploadBatch, UploadedFile};
use crate::convert::Converter;
use crate::error::{ConvertError, StoreError};
use crate::output::{ConversionResult, ImageArtifacts, PdfArtifact};
use crate::store::artifact_key;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use http_body_util::LengthLimitError;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;
use std::error::Error as _;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Default upload cap: 16 MiB per request.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Multipart field carrying the uploaded files.
const FILE_FIELD: &str = "file";

/// Network-facing settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Clone)]
struct AppState {
    converter: Arc<Converter>,
}

#[derive(Debug, Deserialize)]
struct FormQuery {
    flash: Option<String>,
}

/// Build the router. Exposed separately from [`serve`] for tests.
pub fn router(converter: Arc<Converter>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index).post(upload))
        .route("/outputs/{namespace}/{name}", get(output))
        .with_state(AppState { converter })
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &ServerConfig, converter: Arc<Converter>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(converter, config.max_upload_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn index(Query(query): Query<FormQuery>) -> Html<String> {
    Html(render_page(query.flash.as_deref(), None))
}

async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            info!("Upload without a multipart body: {}", rejection);
            return flash_redirect(&ConvertError::EmptyBatch.user_message());
        }
    };

    let batch = match read_batch(multipart).await {
        Ok(batch) => batch,
        Err(e) if is_too_large(&e) => {
            return (StatusCode::PAYLOAD_TOO_LARGE, "Upload too large").into_response();
        }
        Err(e) => {
            warn!("Malformed multipart upload: {}", e);
            return flash_redirect(&ConvertError::EmptyBatch.user_message());
        }
    };

    match state.converter.run(batch).await {
        ConversionResult::ImageArtifacts(images) => Html(render_page(None, Some(&images))).into_response(),
        ConversionResult::PdfArtifact(pdf) => pdf_download(pdf),
        ConversionResult::Failure { message } => flash_redirect(&message),
    }
}

async fn output(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Response {
    let key = artifact_key(&namespace, &name);
    match state.converter.store().get(&key).await {
        Ok(bytes) => {
            let content_type = if name.to_ascii_lowercase().ends_with(".png") {
                "image/png"
            } else {
                "application/octet-stream"
            };
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(StoreError::NotFound(_)) | Err(StoreError::InvalidKey(_)) => {
            (StatusCode::NOT_FOUND, "Not found").into_response()
        }
        Err(e) => {
            error!(error = %e, "Artifact read failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Could not read artifact").into_response()
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// Collect every `file` field, in order. Other fields are ignored.
async fn read_batch(mut multipart: Multipart) -> Result<UploadBatch, MultipartError> {
    let mut batch = UploadBatch::default();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content = field.bytes().await?;
        batch.push(UploadedFile::new(filename, content));
    }
    Ok(batch)
}

/// `true` when reading the body stopped at the upload limit.
fn is_too_large(e: &MultipartError) -> bool {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return true;
    }
    let mut source = e.source();
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return true;
        }
        source = err.source();
    }
    false
}

fn flash_redirect(message: &str) -> Response {
    let location = format!("/?flash={}", utf8_percent_encode(message, NON_ALPHANUMERIC));
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

fn pdf_download(pdf: PdfArtifact) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", pdf.download_name),
            ),
        ],
        pdf.bytes,
    )
        .into_response()
}

fn render_page(flash: Option<&str>, images: Option<&ImageArtifacts>) -> String {
    let mut body = String::new();

    if let Some(message) = flash {
        body.push_str(&format!(
            "    <p class=\"flash\">{}</p>\n",
            escape_html(message)
        ));
    }

    body.push_str(
        "    <form method=\"post\" enctype=\"multipart/form-data\">\n\
         \x20     <input type=\"file\" name=\"file\" accept=\".pdf,.png,.jpg,.jpeg\" multiple>\n\
         \x20     <button type=\"submit\">Convert</button>\n\
         \x20   </form>\n",
    );

    if let Some(images) = images {
        body.push_str("    <ul class=\"pages\">\n");
        for name in &images.names {
            let href = format!("/outputs/{}/{}", images.namespace, name);
            body.push_str(&format!(
                "      <li><a href=\"{}\">{}</a></li>\n",
                escape_html(&href),
                escape_html(name)
            ));
        }
        body.push_str("    </ul>\n");
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n  <head>\n    <meta charset=\"utf-8\">\n    \
         <title>PDF ⇄ Image</title>\n  </head>\n  <body>\n    <h1>PDF ⇄ Image</h1>\n{body}  </body>\n</html>\n"
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
