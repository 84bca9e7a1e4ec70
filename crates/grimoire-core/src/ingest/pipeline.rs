use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use super::extractor::{
    ExtractError, ProseExtractor, SpellExtractor, StructuredTextExtractor,
};
use crate::capability::{DocxToText, PdfToText, TextExtraction};
use crate::spell::{
    DocumentKind, FieldConfidence, ImportArtifact, ImportConflict, RawDocument, SpellRecord,
};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("missing")]
    Missing,
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A record on the wire: the canonical fields flattened, with confidence
/// attached under `_confidence`.
#[derive(Debug, Clone, Serialize)]
pub struct ImportedSpell {
    #[serde(flatten)]
    pub spell: SpellRecord,
    #[serde(rename = "_confidence")]
    pub confidence: FieldConfidence,
}

/// Result of one import batch. `spells` and `artifacts` run in parallel, in
/// the order of the successful input paths; positional correspondence is
/// observable to callers.
#[derive(Debug, Default, Serialize)]
pub struct ImportOutput {
    pub spells: Vec<ImportedSpell>,
    pub artifacts: Vec<ImportArtifact>,
    pub conflicts: Vec<ImportConflict>,
}

impl ImportOutput {
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.spells.len()
    }

    #[must_use]
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }
}

/// Dispatches files by extension to the matching extractor and downgrades
/// every per-file failure into a conflict. One bad file never aborts the
/// batch.
pub struct ImportPipeline {
    extractors: Vec<Box<dyn SpellExtractor>>,
}

impl ImportPipeline {
    /// Probes the external text-extraction tools once; batches of thousands
    /// of files never re-resolve them.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capabilities(
            Arc::new(PdfToText::discover()),
            Arc::new(DocxToText::discover()),
        )
    }

    #[must_use]
    pub fn with_capabilities(
        pdf_text: Arc<dyn TextExtraction>,
        docx_text: Arc<dyn TextExtraction>,
    ) -> Self {
        Self {
            extractors: vec![
                Box::new(StructuredTextExtractor::new()),
                Box::new(ProseExtractor::pdf(pdf_text)),
                Box::new(ProseExtractor::docx(docx_text)),
            ],
        }
    }

    fn find_extractor(&self, kind: DocumentKind) -> Option<&dyn SpellExtractor> {
        self.extractors
            .iter()
            .find(|e| e.kind() == kind)
            .map(|e| e.as_ref())
    }

    pub async fn import_files<P: AsRef<Path>>(&self, paths: &[P]) -> ImportOutput {
        let mut output = ImportOutput::default();

        for path in paths {
            let path = path.as_ref();
            match self.import_one(path).await {
                Ok((spell, artifact)) => {
                    tracing::debug!("Imported {} from {}", spell.spell.name, path.display());
                    output.spells.push(spell);
                    output.artifacts.push(artifact);
                }
                Err(ImportError::Missing) => {
                    tracing::warn!("Skipping missing file: {}", path.display());
                    output.conflicts.push(ImportConflict::missing(path));
                }
                Err(err) => {
                    tracing::warn!("Failed to parse {}: {}", path.display(), err);
                    output
                        .conflicts
                        .push(ImportConflict::parse(path, &err.to_string()));
                }
            }
        }

        output
    }

    async fn import_one(
        &self,
        path: &Path,
    ) -> Result<(ImportedSpell, ImportArtifact), ImportError> {
        if tokio::fs::metadata(path).await.is_err() {
            return Err(ImportError::Missing);
        }

        let ext = path
            .extension()
            .and_then(OsStr::to_str)
            .unwrap_or_default()
            .to_lowercase();
        let kind = DocumentKind::from_extension(&ext)
            .ok_or_else(|| ImportError::UnsupportedFormat(format!(".{ext}")))?;
        let extractor = self
            .find_extractor(kind)
            .ok_or_else(|| ImportError::UnsupportedFormat(format!(".{ext}")))?;

        let document = RawDocument::load(path, kind).await?;
        let extracted = extractor.extract(&document).await?;
        let artifact = ImportArtifact::new(&document);

        Ok((
            ImportedSpell {
                spell: extracted.record,
                confidence: extracted.confidence,
            },
            artifact,
        ))
    }
}

impl Default for ImportPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapabilityError, CapabilityResult};
    use std::path::PathBuf;

    struct FixedText(&'static str);

    #[async_trait::async_trait]
    impl TextExtraction for FixedText {
        async fn extract_text(&self, _path: &Path) -> CapabilityResult<String> {
            Ok(self.0.to_string())
        }
    }

    struct NoTool(&'static str);

    #[async_trait::async_trait]
    impl TextExtraction for NoTool {
        async fn extract_text(&self, _path: &Path) -> CapabilityResult<String> {
            Err(CapabilityError::Unavailable(self.0))
        }
    }

    fn stubbed_pipeline() -> ImportPipeline {
        ImportPipeline::with_capabilities(
            Arc::new(FixedText("Conjured Text\nLevel 2\nA body of prose.")),
            Arc::new(FixedText("Plain words without a level marker.")),
        )
    }

    async fn write_spell(dir: &Path, name: &str, index: usize) -> PathBuf {
        let path = dir.join(name);
        let content = format!(
            "---\nname: Test Spell {index}\nlevel: {}\nschool: Evocation\nsource: Test Source\ncomponents: V,S\nduration: Instant\n---\nDescription for spell number {index}.\n",
            index % 9 + 1
        );
        tokio::fs::write(&path, content).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_missing_file_becomes_conflict() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut paths = vec![dir.path().join("gone.md")];
        for i in 0..3 {
            paths.push(write_spell(dir.path(), &format!("spell_{i}.md"), i).await);
        }

        let output = stubbed_pipeline().import_files(&paths).await;

        assert_eq!(output.record_count(), 3);
        assert_eq!(output.artifacts.len(), 3);
        assert_eq!(output.conflict_count(), 1);
        assert_eq!(output.conflicts[0].reason, "missing");
    }

    #[tokio::test]
    async fn test_unsupported_extension_becomes_conflict() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("spell.txt");
        tokio::fs::write(&path, "not importable").await.unwrap();

        let output = stubbed_pipeline().import_files(&[path]).await;

        assert_eq!(output.record_count(), 0);
        assert_eq!(output.conflict_count(), 1);
        assert!(output.conflicts[0]
            .reason
            .starts_with("parsing_error: unsupported file type"));
    }

    #[tokio::test]
    async fn test_unavailable_capability_becomes_conflict() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tome.pdf");
        tokio::fs::write(&path, b"%PDF-1.4").await.unwrap();

        let pipeline = ImportPipeline::with_capabilities(
            Arc::new(NoTool("pdftotext")),
            Arc::new(NoTool("pandoc")),
        );
        let output = pipeline.import_files(&[path]).await;

        assert_eq!(output.record_count(), 0);
        assert_eq!(output.conflict_count(), 1);
        assert!(output.conflicts[0].reason.starts_with("parsing_error:"));
        assert!(output.conflicts[0].reason.contains("pdftotext"));
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut paths = Vec::new();
        for i in 0..5 {
            paths.push(write_spell(dir.path(), &format!("spell_{i}.md"), i).await);
        }

        let output = stubbed_pipeline().import_files(&paths).await;

        assert_eq!(output.record_count(), 5);
        for (i, spell) in output.spells.iter().enumerate() {
            assert_eq!(spell.spell.name, format!("Test Spell {i}"));
            assert_eq!(spell.spell.level, (i as i64) % 9 + 1);
            assert_eq!(spell.confidence.get("name"), Some(1.0));
            assert_eq!(spell.confidence.get("level"), Some(1.0));
        }
        for (spell, artifact) in output.spells.iter().zip(&output.artifacts) {
            assert_eq!(spell.spell.source_file, artifact.path);
            assert_eq!(artifact.hash.len(), 64);
        }
    }

    #[tokio::test]
    async fn test_large_mixed_batch() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut paths = Vec::new();
        for i in 0..800 {
            paths.push(write_spell(dir.path(), &format!("spell_{i:04}.md"), i).await);
        }
        for i in 0..100 {
            let path = dir.path().join(format!("tome_{i:03}.pdf"));
            tokio::fs::write(&path, b"%PDF-1.4").await.unwrap();
            paths.push(path);
        }
        for i in 0..100 {
            let path = dir.path().join(format!("scroll_{i:03}.docx"));
            tokio::fs::write(&path, b"PK\x03\x04").await.unwrap();
            paths.push(path);
        }

        let start = std::time::Instant::now();
        let output = stubbed_pipeline().import_files(&paths).await;

        assert_eq!(output.record_count(), 1000);
        assert_eq!(output.conflict_count(), 0);
        assert_eq!(output.artifacts.len(), 1000);

        let pdf_count = output
            .artifacts
            .iter()
            .filter(|a| a.kind == "pdf")
            .count();
        let docx_count = output
            .artifacts
            .iter()
            .filter(|a| a.kind == "docx")
            .count();
        assert_eq!(pdf_count, 100);
        assert_eq!(docx_count, 100);
        assert!(
            start.elapsed() < std::time::Duration::from_secs(30),
            "batch took {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn test_serialized_spell_carries_confidence() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_spell(dir.path(), "spell.md", 1).await;

        let output = stubbed_pipeline().import_files(&[path]).await;
        let value = serde_json::to_value(&output).unwrap();

        let spell = &value["spells"][0];
        assert_eq!(spell["name"], "Test Spell 1");
        assert_eq!(spell["_confidence"]["name"], 1.0);
        assert!(spell["_source_file"].as_str().is_some());
        assert_eq!(value["artifacts"][0]["type"], "markdown");
    }
}
