use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

mod rpc;

use rpc::{Service, ServiceOptions};

/// Spell document import/export sidecar. Speaks one JSON-RPC object per
/// line on stdin/stdout; logs go to stderr.
#[derive(Parser)]
#[command(name = "grimoire", about = "Spell document import/export sidecar", version)]
struct Cli {
    /// Override the pdftotext executable used for PDF text extraction
    #[arg(long, value_name = "PATH")]
    pdftotext: Option<PathBuf>,
    /// Override the pandoc executable used for DOCX text extraction and PDF conversion
    #[arg(long, value_name = "PATH")]
    pandoc: Option<PathBuf>,
    /// Disable PDF conversion; pdf exports fall back to HTML with a warning
    #[arg(long)]
    no_convert: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let service = Service::new(ServiceOptions {
        pdftotext: cli.pdftotext,
        pandoc: cli.pandoc,
        no_convert: cli.no_convert,
    });

    rpc::serve(&service).await
}
