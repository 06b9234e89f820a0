//! Orchestration: Renderer → Client, per document and per batch.
//!
//! Documents are processed strictly one after another, in input order. A
//! document's failure is recorded in its [`BatchEntry`] and the batch moves
//! on; only building the [`Extractor`] or writing output returns `Err`.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::output::{BatchEntry, BatchResult, ExtractionResult, RawText};
use crate::pipeline::input::{display_name, io_error, resolve_input, Document};
use crate::pipeline::llm::ExtractionClient;
use crate::pipeline::render::{OcrPageRenderer, PageRenderer};
use crate::schema::{select_template, DocumentType};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A configured Renderer + Client pair.
///
/// # Example
/// ```rust,no_run
/// use doc2json::{DocumentType, ExtractionConfig, Extractor};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let extractor = Extractor::new(ExtractionConfig::default())?;
/// let result = extractor
///     .extract_file("invoice.pdf", DocumentType::Invoice)
///     .await;
/// println!("{}", serde_json::to_string_pretty(&result.to_output_json())?);
/// # Ok(())
/// # }
/// ```
pub struct Extractor {
    config: ExtractionConfig,
    renderer: Arc<dyn PageRenderer>,
    client: ExtractionClient,
}

impl Extractor {
    /// Build the renderer and model client described by `config`.
    ///
    /// Fails only on configuration problems (e.g. an unknown hosted provider);
    /// nothing is contacted yet.
    pub fn new(config: ExtractionConfig) -> Result<Self, ExtractError> {
        let renderer: Arc<dyn PageRenderer> = match &config.renderer {
            Some(renderer) => Arc::clone(renderer),
            None => Arc::new(OcrPageRenderer::from_config(&config)),
        };
        let client = ExtractionClient::from_config(&config)?;
        debug!("Extractor ready: {:?}", config);
        Ok(Self {
            config,
            renderer,
            client,
        })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    // ── Renderer only ────────────────────────────────────────────────────

    /// OCR a local PDF without calling the model.
    pub async fn ocr_file(&self, path: impl AsRef<Path>) -> Result<RawText, ExtractError> {
        self.render(path.as_ref().to_path_buf()).await
    }

    /// OCR an in-memory PDF without calling the model.
    ///
    /// The bytes are staged to a temporary directory that is removed before
    /// this returns.
    pub async fn ocr_document(&self, document: &Document) -> Result<RawText, ExtractError> {
        let staged = document.stage()?;
        let result = self.render(staged.path().to_path_buf()).await;
        drop(staged);
        result
    }

    async fn render(&self, path: PathBuf) -> Result<RawText, ExtractError> {
        let renderer = Arc::clone(&self.renderer);
        let start = Instant::now();
        let raw = tokio::task::spawn_blocking(move || renderer.render_text(&path))
            .await
            .map_err(|e| ExtractError::Internal(format!("Render task panicked: {}", e)))??;
        info!(
            "OCR complete: {} pages in {:?}",
            raw.page_count(),
            start.elapsed()
        );
        Ok(raw)
    }

    // ── Single document ──────────────────────────────────────────────────

    /// Send already-extracted text to the model.
    ///
    /// Blank text short-circuits with a conversion failure.
    pub async fn extract_text(&self, text: &str, document_type: DocumentType) -> ExtractionResult {
        let raw = RawText::parse(text);
        if raw.is_blank() {
            return ExtractError::NoTextProduced {
                source_name: "<text>".to_string(),
                pages: raw.page_count(),
            }
            .into();
        }
        self.client.extract(text, select_template(document_type)).await
    }

    /// Renderer → Client for a local file.
    pub async fn extract_file(
        &self,
        path: impl AsRef<Path>,
        document_type: DocumentType,
    ) -> ExtractionResult {
        let rendered = self.ocr_file(path).await;
        self.finish(rendered, document_type).await
    }

    /// Renderer → Client for an in-memory document.
    pub async fn extract_document(
        &self,
        document: &Document,
        document_type: DocumentType,
    ) -> ExtractionResult {
        let rendered = self.ocr_document(document).await;
        self.finish(rendered, document_type).await
    }

    /// Renderer → Client for a path or HTTP(S) URL.
    ///
    /// Local paths are checked for the `%PDF` header first; URLs are
    /// downloaded to a temporary directory removed afterwards.
    pub async fn extract_input(&self, input: &str, document_type: DocumentType) -> ExtractionResult {
        let resolved = match resolve_input(input, self.config.download_timeout_secs).await {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("Could not resolve '{}': {}", input, e);
                return e.into();
            }
        };
        let rendered = self.render(resolved.path().to_path_buf()).await;
        drop(resolved);
        self.finish(rendered, document_type).await
    }

    /// Read a text file from an earlier OCR run and send it to the model.
    pub async fn extract_text_file(
        &self,
        path: impl AsRef<Path>,
        document_type: DocumentType,
    ) -> ExtractionResult {
        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(text) => self.extract_text(&text, document_type).await,
            Err(e) => {
                let err = io_error(path, e);
                warn!("Could not read '{}': {}", path.display(), err);
                err.into()
            }
        }
    }

    async fn finish(
        &self,
        rendered: Result<RawText, ExtractError>,
        document_type: DocumentType,
    ) -> ExtractionResult {
        match rendered {
            Ok(raw) => {
                self.client
                    .extract(&raw.render(), select_template(document_type))
                    .await
            }
            Err(e) => {
                warn!("Text extraction failed, skipping model call: {}", e);
                e.into()
            }
        }
    }

    // ── Batch ────────────────────────────────────────────────────────────

    /// Process every document in order, one at a time.
    ///
    /// The result has one entry per document, in input order.
    pub async fn extract_batch(
        &self,
        documents: &[Document],
        document_type: DocumentType,
    ) -> BatchResult {
        let total = documents.len();
        self.batch_started(total);
        let mut entries = Vec::with_capacity(total);
        for (i, document) in documents.iter().enumerate() {
            self.document_started(i + 1, total, &document.filename);
            let result = self.extract_document(document, document_type).await;
            entries.push(self.document_finished(i + 1, total, document.filename.clone(), result));
        }
        self.batch_finished(entries)
    }

    /// Like [`Self::extract_batch`] for paths and URLs. Entries are named
    /// by the last path segment of each input.
    pub async fn extract_inputs<S: AsRef<str>>(
        &self,
        inputs: &[S],
        document_type: DocumentType,
    ) -> BatchResult {
        let total = inputs.len();
        self.batch_started(total);
        let mut entries = Vec::with_capacity(total);
        for (i, input) in inputs.iter().enumerate() {
            let input = input.as_ref();
            let filename = display_name(input);
            self.document_started(i + 1, total, &filename);
            let result = self.extract_input(input, document_type).await;
            entries.push(self.document_finished(i + 1, total, filename, result));
        }
        self.batch_finished(entries)
    }

    /// Like [`Self::extract_batch`] for text files from earlier OCR runs.
    pub async fn extract_text_files<P: AsRef<Path>>(
        &self,
        paths: &[P],
        document_type: DocumentType,
    ) -> BatchResult {
        let total = paths.len();
        self.batch_started(total);
        let mut entries = Vec::with_capacity(total);
        for (i, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            let filename = display_name(&path.to_string_lossy());
            self.document_started(i + 1, total, &filename);
            let result = self.extract_text_file(path, document_type).await;
            entries.push(self.document_finished(i + 1, total, filename, result));
        }
        self.batch_finished(entries)
    }

    /// OCR several paths or URLs, one at a time, without calling the model.
    ///
    /// A failed input does not stop the ones after it.
    pub async fn ocr_inputs<S: AsRef<str>>(
        &self,
        inputs: &[S],
    ) -> Vec<(String, Result<RawText, ExtractError>)> {
        let mut out = Vec::with_capacity(inputs.len());
        for input in inputs {
            let input = input.as_ref();
            let rendered = match resolve_input(input, self.config.download_timeout_secs).await {
                Ok(resolved) => {
                    let rendered = self.render(resolved.path().to_path_buf()).await;
                    drop(resolved);
                    rendered
                }
                Err(e) => Err(e),
            };
            if let Err(ref e) = rendered {
                warn!("OCR failed for '{}': {}", input, e);
            }
            out.push((input.to_string(), rendered));
        }
        out
    }

    // ── Progress plumbing ────────────────────────────────────────────────

    pub(crate) fn batch_started(&self, total: usize) {
        info!("Starting batch of {} documents", total);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_start(total);
        }
    }

    pub(crate) fn document_started(&self, index: usize, total: usize, filename: &str) {
        info!("[{}/{}] {}", index, total, filename);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_document_start(index, total, filename);
        }
    }

    pub(crate) fn document_finished(
        &self,
        completed: usize,
        total: usize,
        filename: String,
        result: ExtractionResult,
    ) -> BatchEntry {
        if let Some(failure) = result.failure() {
            warn!("{}: {}", filename, failure);
        }
        let entry = BatchEntry { filename, result };
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_document_complete(completed, total, &entry);
        }
        entry
    }

    fn batch_finished(&self, entries: Vec<BatchEntry>) -> BatchResult {
        let batch = BatchResult { entries };
        info!(
            "Batch complete: {}/{} documents succeeded",
            batch.succeeded(),
            batch.len()
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_complete(batch.len(), batch.succeeded());
        }
        batch
    }
}

/// One-shot extraction of a path or URL.
///
/// `Err` only when the config cannot produce an [`Extractor`]; document
/// failures come back as [`ExtractionResult::Failure`].
pub async fn extract(
    input: impl AsRef<str>,
    document_type: DocumentType,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, ExtractError> {
    let extractor = Extractor::new(config.clone())?;
    Ok(extractor.extract_input(input.as_ref(), document_type).await)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input: impl AsRef<str>,
    document_type: DocumentType,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input, document_type, config))
}

/// Write a JSON value to `path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_json(
    path: impl AsRef<Path>,
    value: &serde_json::Value,
    pretty: bool,
) -> Result<(), ExtractError> {
    let path = path.as_ref();
    let write_err = |e: std::io::Error| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let mut body = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| ExtractError::Internal(format!("JSON serialisation: {e}")))?;
    body.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, body).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    debug!("Wrote {}", path.display());
    Ok(())
}
