use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use grimoire_core::capability::{
    ConversionDisabled, DocxToText, PandocPdf, PdfConversion, PdfToText, TextExtraction,
};
use grimoire_core::{ExportPipeline, ExportRequest, ImportPipeline};

/// Width of the stub embedding vectors. The real model lives elsewhere;
/// callers only depend on the dimensionality.
const EMBED_DIM: usize = 384;

/// Tool overrides from the command line.
#[derive(Debug, Default)]
pub struct ServiceOptions {
    pub pdftotext: Option<PathBuf>,
    pub pandoc: Option<PathBuf>,
    pub no_convert: bool,
}

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Deserialize)]
struct EmbedParams {
    #[serde(default)]
    texts: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LlmParams {
    #[serde(default)]
    question: String,
    #[serde(default)]
    citations: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ImportParams {
    #[serde(default)]
    files: Vec<PathBuf>,
}

pub struct Service {
    import: ImportPipeline,
    export: ExportPipeline,
}

impl Service {
    #[must_use]
    pub fn new(options: ServiceOptions) -> Self {
        let pdf_text: Arc<dyn TextExtraction> = match options.pdftotext {
            Some(path) => Arc::new(PdfToText::at(path)),
            None => Arc::new(PdfToText::discover()),
        };
        let docx_text: Arc<dyn TextExtraction> = match options.pandoc.clone() {
            Some(path) => Arc::new(DocxToText::at(path)),
            None => Arc::new(DocxToText::discover()),
        };
        let converter: Arc<dyn PdfConversion> = if options.no_convert {
            Arc::new(ConversionDisabled)
        } else {
            match options.pandoc {
                Some(path) => Arc::new(PandocPdf::at(path)),
                None => Arc::new(PandocPdf::discover()),
            }
        };

        Self {
            import: ImportPipeline::with_capabilities(pdf_text, docx_text),
            export: ExportPipeline::with_converter(converter),
        }
    }

    /// One request line in, one response object out. Failures never escape
    /// the envelope; they are fatal to this call only.
    pub async fn dispatch_line(&self, line: &str) -> Value {
        match serde_json::from_str::<Request>(line) {
            Ok(request) => match self.call(&request.method, request.params).await {
                Ok(result) => json!({"jsonrpc": "2.0", "id": request.id, "result": result}),
                Err(err) => error_envelope(&err.to_string()),
            },
            Err(err) => error_envelope(&format!("Invalid request: {err}")),
        }
    }

    async fn call(&self, method: &str, params: Value) -> anyhow::Result<Value> {
        tracing::debug!("Handling {} call", method);
        match method {
            "embed" => handle_embed(params),
            "llm_answer" => handle_llm_answer(params),
            "import" => self.handle_import(params).await,
            "export" => self.handle_export(params).await,
            other => anyhow::bail!("Unknown method: {other}"),
        }
    }

    async fn handle_import(&self, params: Value) -> anyhow::Result<Value> {
        let params: ImportParams = serde_json::from_value(params)?;
        let output = self.import.import_files(&params.files).await;
        Ok(serde_json::to_value(output)?)
    }

    async fn handle_export(&self, params: Value) -> anyhow::Result<Value> {
        let request: ExportRequest = serde_json::from_value(params)?;
        let output = self.export.export(&request).await?;
        Ok(serde_json::to_value(output)?)
    }
}

fn handle_embed(params: Value) -> anyhow::Result<Value> {
    let params: EmbedParams = serde_json::from_value(params)?;
    let vectors: Vec<Vec<f64>> = params.texts.iter().map(|_| vec![0.0; EMBED_DIM]).collect();
    Ok(json!({"vectors": vectors}))
}

fn handle_llm_answer(params: Value) -> anyhow::Result<Value> {
    let params: LlmParams = serde_json::from_value(params)?;
    Ok(json!({
        "answer": format!("This is a placeholder answer to: {}", params.question),
        "citations": params.citations,
    }))
}

fn error_envelope(message: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": null, "error": {"message": message}})
}

/// Serve requests until stdin closes, flushing one response line per call.
pub async fn serve(service: &Service) -> anyhow::Result<()> {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        let response = service.dispatch_line(&line).await;
        let mut payload = serde_json::to_vec(&response)?;
        payload.push(b'\n');
        stdout.write_all(&payload).await?;
        stdout.flush().await?;
    }

    Ok(())
}
