use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("{0} is not installed")]
    Unavailable(&'static str),
    #[error("{tool} failed with exit code {code:?}: {stderr}")]
    Failed {
        tool: &'static str,
        code: Option<i32>,
        stderr: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Output from an external tool invocation.
#[derive(Debug)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run a tool to completion, capturing both streams. Success is decided by
/// the exit status; stderr is folded into the error so it reaches the
/// conflict/warning surface instead of being lost.
async fn run_tool<I, A>(tool: &'static str, program: &Path, args: I) -> CapabilityResult<ToolOutput>
where
    I: IntoIterator<Item = A>,
    A: AsRef<OsStr>,
{
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        return Err(CapabilityError::Failed {
            tool,
            code: output.status.code(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(ToolOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr,
    })
}

/// Extraction of running text from a binary document format. Implementations
/// wrap an external tool that may be absent at runtime; callers treat
/// `Unavailable` as a per-file failure, not a fatal one.
#[async_trait::async_trait]
pub trait TextExtraction: Send + Sync {
    async fn extract_text(&self, path: &Path) -> CapabilityResult<String>;
}

/// PDF text extraction through `pdftotext`.
pub struct PdfToText {
    tool: Option<PathBuf>,
}

impl PdfToText {
    /// Probe the environment once; per-file calls never re-resolve the tool.
    #[must_use]
    pub fn discover() -> Self {
        Self {
            tool: which::which("pdftotext").ok(),
        }
    }

    #[must_use]
    pub fn at(path: PathBuf) -> Self {
        Self { tool: Some(path) }
    }
}

#[async_trait::async_trait]
impl TextExtraction for PdfToText {
    async fn extract_text(&self, path: &Path) -> CapabilityResult<String> {
        let tool = self
            .tool
            .as_deref()
            .ok_or(CapabilityError::Unavailable("pdftotext"))?;

        let mut args: Vec<&OsStr> = vec![OsStr::new("-layout")];
        args.push(path.as_os_str());
        args.push(OsStr::new("-"));

        let output = run_tool("pdftotext", tool, args).await?;
        Ok(output.stdout)
    }
}

/// DOCX text extraction through `pandoc -f docx -t plain`.
pub struct DocxToText {
    tool: Option<PathBuf>,
}

impl DocxToText {
    #[must_use]
    pub fn discover() -> Self {
        Self {
            tool: which::which("pandoc").ok(),
        }
    }

    #[must_use]
    pub fn at(path: PathBuf) -> Self {
        Self { tool: Some(path) }
    }
}

#[async_trait::async_trait]
impl TextExtraction for DocxToText {
    async fn extract_text(&self, path: &Path) -> CapabilityResult<String> {
        let tool = self
            .tool
            .as_deref()
            .ok_or(CapabilityError::Unavailable("pandoc"))?;

        let mut args: Vec<&OsStr> = vec![
            OsStr::new("-f"),
            OsStr::new("docx"),
            OsStr::new("-t"),
            OsStr::new("plain"),
        ];
        args.push(path.as_os_str());

        let output = run_tool("pandoc", tool, args).await?;
        Ok(output.stdout)
    }
}

/// Conversion of a rendered HTML document into PDF. May be absent or return
/// a typed failure; the export orchestrator falls back to the HTML artifact
/// either way.
#[async_trait::async_trait]
pub trait PdfConversion: Send + Sync {
    async fn convert(&self, html: &Path, pdf: &Path) -> CapabilityResult<()>;
}

/// PDF conversion through `pandoc`.
pub struct PandocPdf {
    tool: Option<PathBuf>,
}

impl PandocPdf {
    #[must_use]
    pub fn discover() -> Self {
        Self {
            tool: which::which("pandoc").ok(),
        }
    }

    #[must_use]
    pub fn at(path: PathBuf) -> Self {
        Self { tool: Some(path) }
    }
}

#[async_trait::async_trait]
impl PdfConversion for PandocPdf {
    async fn convert(&self, html: &Path, pdf: &Path) -> CapabilityResult<()> {
        let tool = self
            .tool
            .as_deref()
            .ok_or(CapabilityError::Unavailable("pandoc"))?;

        let mut args: Vec<&OsStr> = vec![html.as_os_str(), OsStr::new("-o")];
        args.push(pdf.as_os_str());

        run_tool("pandoc", tool, args).await?;

        // pandoc exits zero without writing anything for some broken
        // intermediate engines; verify the artifact landed.
        if tokio::fs::metadata(pdf).await.is_err() {
            return Err(CapabilityError::Failed {
                tool: "pandoc",
                code: None,
                stderr: "conversion produced no output file".to_string(),
            });
        }
        Ok(())
    }
}

/// Conversion capability that is never available. Used by the sidecar's
/// `--no-convert` flag and by tests exercising the fallback path.
pub struct ConversionDisabled;

#[async_trait::async_trait]
impl PdfConversion for ConversionDisabled {
    async fn convert(&self, _html: &Path, _pdf: &Path) -> CapabilityResult<()> {
        Err(CapabilityError::Unavailable("pdf conversion"))
    }
}
