use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::capability::{PandocPdf, PdfConversion};
use crate::character::Character;
use crate::render::{self, RenderMode, RenderRequest, SpellLayout};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Html,
    Pdf,
}

impl ExportFormat {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Html => "html",
            Self::Pdf => "pdf",
        }
    }

    /// Unlike modes and layouts, an unknown format is a configuration error,
    /// fatal to the call.
    pub fn parse(format: &str) -> Result<Self, ExportError> {
        match format {
            "md" => Ok(Self::Markdown),
            "html" => Ok(Self::Html),
            "pdf" => Ok(Self::Pdf),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One export call as received from the client. Transient; nothing here
/// outlives the call except the file written under `output_dir`.
#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub spells: Vec<Value>,
    pub format: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub layout: Option<String>,
    #[serde(default)]
    pub character: Option<Character>,
    #[serde(default, alias = "className")]
    pub class_name: Option<String>,
    pub output_dir: PathBuf,
    /// Accepted for client compatibility; page geometry is not normative.
    #[serde(default)]
    pub page_size: Option<String>,
}

/// What the caller gets back. `format` reflects what was actually written,
/// which on a conversion fallback differs from what was requested.
#[derive(Debug, Clone, Serialize)]
pub struct ExportOutput {
    pub path: String,
    pub format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Selects format, mode, and layout, writes the artifact under a
/// collision-safe random filename, and degrades `pdf` to `html` when the
/// conversion capability is absent or failing.
pub struct ExportPipeline {
    converter: Arc<dyn PdfConversion>,
}

impl ExportPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::with_converter(Arc::new(PandocPdf::discover()))
    }

    #[must_use]
    pub fn with_converter(converter: Arc<dyn PdfConversion>) -> Self {
        Self { converter }
    }

    pub async fn export(&self, request: &ExportRequest) -> Result<ExportOutput, ExportError> {
        let format = ExportFormat::parse(&request.format)?;
        tokio::fs::create_dir_all(&request.output_dir).await?;

        let render_request = RenderRequest {
            records: &request.spells,
            mode: RenderMode::from_param(request.mode.as_deref().unwrap_or("list")),
            layout: SpellLayout::from_param(request.layout.as_deref().unwrap_or("full")),
            character: request.character.as_ref(),
            class_name: request.class_name.as_deref(),
        };

        match format {
            ExportFormat::Markdown => {
                let path = output_path(&request.output_dir, "md");
                tokio::fs::write(&path, render::markdown::render(&render_request)).await?;
                Ok(ExportOutput {
                    path: path.to_string_lossy().into_owned(),
                    format: "md",
                    warning: None,
                })
            }
            ExportFormat::Html => {
                let path = output_path(&request.output_dir, "html");
                tokio::fs::write(&path, render::html::render_document(&render_request)).await?;
                Ok(ExportOutput {
                    path: path.to_string_lossy().into_owned(),
                    format: "html",
                    warning: None,
                })
            }
            ExportFormat::Pdf => self.export_pdf(request, &render_request).await,
        }
    }

    /// The intermediate HTML always renders first; on conversion failure it
    /// becomes the artifact, and the caller learns the truth from `format`.
    async fn export_pdf(
        &self,
        request: &ExportRequest,
        render_request: &RenderRequest<'_>,
    ) -> Result<ExportOutput, ExportError> {
        let html_path = output_path(&request.output_dir, "html");
        tokio::fs::write(&html_path, render::html::render_document(render_request)).await?;

        let pdf_path = output_path(&request.output_dir, "pdf");
        match self.converter.convert(&html_path, &pdf_path).await {
            Ok(()) => {
                let _ = tokio::fs::remove_file(&html_path).await;
                Ok(ExportOutput {
                    path: pdf_path.to_string_lossy().into_owned(),
                    format: "pdf",
                    warning: None,
                })
            }
            Err(err) => {
                tracing::warn!("PDF conversion failed, returning HTML: {err}");
                Ok(ExportOutput {
                    path: html_path.to_string_lossy().into_owned(),
                    format: "html",
                    warning: Some(format!("PDF generation failed: {err}; returning HTML instead")),
                })
            }
        }
    }
}

impl Default for ExportPipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn output_path(dir: &Path, ext: &str) -> PathBuf {
    dir.join(format!("spellbook_export_{}.{ext}", Uuid::new_v4().simple()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapabilityError, CapabilityResult, ConversionDisabled};
    use serde_json::json;

    struct BrokenConverter;

    #[async_trait::async_trait]
    impl PdfConversion for BrokenConverter {
        async fn convert(&self, _html: &Path, _pdf: &Path) -> CapabilityResult<()> {
            Err(CapabilityError::Failed {
                tool: "pandoc",
                code: Some(1),
                stderr: "engine exploded".to_string(),
            })
        }
    }

    struct CopyConverter;

    #[async_trait::async_trait]
    impl PdfConversion for CopyConverter {
        async fn convert(&self, html: &Path, pdf: &Path) -> CapabilityResult<()> {
            tokio::fs::copy(html, pdf).await?;
            Ok(())
        }
    }

    fn md_request(dir: &Path, spells: Vec<Value>) -> ExportRequest {
        serde_json::from_value(json!({
            "spells": spells,
            "format": "md",
            "output_dir": dir,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_markdown_export_writes_headings() {
        let dir = tempfile::TempDir::new().unwrap();
        let request = md_request(
            dir.path(),
            vec![
                json!({"name": "Magic Missile", "description": "Darts of force."}),
                json!({"name": "Fireball", "description": "Explosion of fire."}),
            ],
        );

        let output = ExportPipeline::new().export(&request).await.unwrap();

        assert_eq!(output.format, "md");
        let content = tokio::fs::read_to_string(&output.path).await.unwrap();
        assert!(content.contains("# Magic Missile"));
        assert!(content.contains("Darts of force."));
        assert!(content.contains("# Fireball"));
    }

    #[tokio::test]
    async fn test_filename_shape_and_directory_creation() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("prints/out");
        let request = md_request(&nested, vec![json!({"name": "A", "description": "B."})]);

        let output = ExportPipeline::new().export(&request).await.unwrap();

        let path = PathBuf::from(&output.path);
        assert!(path.exists());
        let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(file_name.starts_with("spellbook_export_"));
        assert!(file_name.ends_with(".md"));
    }

    #[tokio::test]
    async fn test_pdf_falls_back_to_html_when_unavailable() {
        let dir = tempfile::TempDir::new().unwrap();
        let request: ExportRequest = serde_json::from_value(json!({
            "spells": [{"name": "Shield", "description": "Invisible barrier."}],
            "format": "pdf",
            "mode": "single",
            "layout": "stat-block",
            "page_size": "a4",
            "output_dir": dir.path(),
        }))
        .unwrap();

        let pipeline = ExportPipeline::with_converter(Arc::new(ConversionDisabled));
        let output = pipeline.export(&request).await.unwrap();

        assert_eq!(output.format, "html");
        let warning = output.warning.unwrap();
        assert!(warning.contains("PDF generation failed"));
        let path = PathBuf::from(&output.path);
        assert_eq!(path.extension().unwrap(), "html");
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.contains("Shield"));
        assert!(content.contains("Invisible barrier."));
        assert!(content.contains("Level"));
    }

    #[tokio::test]
    async fn test_pdf_fallback_on_converter_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let request: ExportRequest = serde_json::from_value(json!({
            "spells": [{"name": "Shield", "description": "Barrier."}],
            "format": "pdf",
            "output_dir": dir.path(),
        }))
        .unwrap();

        let pipeline = ExportPipeline::with_converter(Arc::new(BrokenConverter));
        let output = pipeline.export(&request).await.unwrap();

        assert_eq!(output.format, "html");
        assert!(output.warning.unwrap().contains("engine exploded"));
    }

    #[tokio::test]
    async fn test_pdf_success_removes_intermediate() {
        let dir = tempfile::TempDir::new().unwrap();
        let request: ExportRequest = serde_json::from_value(json!({
            "spells": [{"name": "Shield", "description": "Barrier."}],
            "format": "pdf",
            "output_dir": dir.path(),
        }))
        .unwrap();

        let pipeline = ExportPipeline::with_converter(Arc::new(CopyConverter));
        let output = pipeline.export(&request).await.unwrap();

        assert_eq!(output.format, "pdf");
        assert!(output.warning.is_none());
        assert!(PathBuf::from(&output.path).exists());

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".pdf"));
    }

    #[tokio::test]
    async fn test_unsupported_format_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let request: ExportRequest = serde_json::from_value(json!({
            "spells": [],
            "format": "exe",
            "output_dir": dir.path(),
        }))
        .unwrap();

        let result = ExportPipeline::new().export(&request).await;

        match result {
            Err(ExportError::UnsupportedFormat(format)) => assert_eq!(format, "exe"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }
}
