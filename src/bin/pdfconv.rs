//! CLI binary for pdfconv.
//!
//! A thin shim over the library crate: `serve` runs the web surface,
//! `convert` pushes one batch of local files through the same converter.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pdfconv::server::{self, ServerConfig, DEFAULT_MAX_UPLOAD_BYTES};
use pdfconv::{
    ArtifactStore, ConversionConfig, ConversionOutput, Converter, DiskStore, MemoryStore,
    UploadBatch, UploadedFile,
};
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve the upload form on port 5000, keeping page images in memory
  pdfconv serve

  # Serve on all interfaces, page images written to a directory
  pdfconv serve --bind 0.0.0.0:8080 --storage disk --storage-dir /var/lib/pdfconv

  # Rasterise a PDF into ./out/report_page_N.png
  pdfconv convert report.pdf -o out

  # Combine photos into one PDF (named after the first file)
  pdfconv convert cover.jpg page2.png page3.png -o out

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to an existing libpdfium (file or directory)
  RUST_LOG          Override the log filter (e.g. pdfconv=debug,tower_http=debug)
"#;

/// Convert PDFs to page images and images to PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "pdfconv",
    version,
    about = "Convert PDFs to page images and images to PDFs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFCONV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFCONV_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the upload form and conversion endpoint.
    Serve(ServeArgs),
    /// Convert local files once and write the results to a directory.
    Convert(ConvertArgs),
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// Rendering DPI for PDF pages (72–600).
    #[arg(long, env = "PDFCONV_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Path to the pdfium shared library (file or directory).
    #[arg(long, env = "PDFCONV_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "PDFCONV_BIND", default_value = "127.0.0.1:5000")]
    bind: SocketAddr,

    /// Where rendered page images are kept between requests.
    ///
    /// `memory` keeps every rendered page until the process exits, so memory
    /// use grows with each converted PDF. Use `disk` for long-running servers.
    #[arg(long, env = "PDFCONV_STORAGE", value_enum, default_value = "memory")]
    storage: StorageArg,

    /// Directory for `--storage disk`. A temporary directory when omitted.
    #[arg(long, env = "PDFCONV_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    /// Largest accepted request body in bytes.
    #[arg(long, env = "PDFCONV_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Files to convert. A leading PDF is rasterised; otherwise all files are
    /// combined into one PDF.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output directory.
    #[arg(short, long, env = "PDFCONV_OUTPUT", default_value = ".")]
    output: PathBuf,

    /// Print a JSON summary instead of file names.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(ValueEnum, Clone, Debug)]
enum StorageArg {
    /// In process memory; pages are never evicted.
    Memory,
    /// Files under `--storage-dir` (or a temporary directory).
    Disk,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Convert(args) => convert(args, cli.quiet).await,
    }
}

fn build_config(engine: &EngineArgs) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder().dpi(engine.dpi);
    if let Some(ref path) = engine.pdfium_lib {
        builder = builder.pdfium_lib_path(path);
    }
    builder.build().context("Invalid configuration")
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = build_config(&args.engine)?;

    let store: Arc<dyn ArtifactStore> = match (args.storage, args.storage_dir) {
        (StorageArg::Memory, _) => Arc::new(MemoryStore::new()),
        (StorageArg::Disk, Some(dir)) => Arc::new(
            DiskStore::new(&dir)
                .await
                .with_context(|| format!("Failed to prepare storage directory {:?}", dir))?,
        ),
        (StorageArg::Disk, None) => {
            Arc::new(DiskStore::temporary().context("Failed to create temporary storage")?)
        }
    };

    let converter = tokio::task::block_in_place(|| Converter::with_pdfium(config, store))
        .context("Failed to load the PDF engine")?;

    let server_config = ServerConfig {
        bind: args.bind,
        max_upload_bytes: args.max_upload_bytes,
    };
    server::serve(&server_config, Arc::new(converter))
        .await
        .context("Server error")
}

async fn convert(args: ConvertArgs, quiet: bool) -> Result<()> {
    let config = build_config(&args.engine)?;

    let mut batch = UploadBatch::default();
    for path in &args.files {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?;
        batch.push(UploadedFile::new(display_name(path), content));
    }

    let store = Arc::new(MemoryStore::new());
    let converter = tokio::task::block_in_place(|| {
        Converter::with_pdfium(config, Arc::clone(&store) as Arc<dyn ArtifactStore>)
    })
    .context("Failed to load the PDF engine")?;

    let output = match converter.try_run(batch).await {
        Ok(output) => output,
        Err(e) => {
            if !quiet {
                eprintln!("{} {}", red("✘"), e);
            }
            return Err(e).context("Conversion failed");
        }
    };

    tokio::fs::create_dir_all(&args.output)
        .await
        .with_context(|| format!("Failed to create {:?}", args.output))?;

    let written = match &output {
        ConversionOutput::Images(images) => {
            let mut written = Vec::with_capacity(images.names.len());
            for (name, key) in images.names.iter().zip(images.keys()) {
                let bytes = store
                    .get(&key)
                    .await
                    .with_context(|| format!("Missing rendered page {name}"))?;
                written.push(write_output(&args.output, name, &bytes).await?);
            }
            written
        }
        ConversionOutput::Pdf(pdf) => {
            vec![write_output(&args.output, &pdf.download_name, &pdf.bytes).await?]
        }
    };

    if args.json {
        let summary = serde_json::json!({
            "kind": output.kind(),
            "files": written,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else {
        for path in &written {
            println!("{}", path.display());
        }
        if !quiet {
            eprintln!(
                "{} {} file(s) written to {}",
                green("✔"),
                written.len(),
                bold(&args.output.display().to_string())
            );
        }
    }

    Ok(())
}

/// The name a browser would have sent for this file.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn write_output(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = dir.join(name);
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(path)
}
