//! Error types for the doc2json library.
//!
//! Two distinct types reflect two distinct audiences:
//!
//! * [`ExtractError`]: the concrete failure, with enough context for a log
//!   line or a CLI message (which file, which page, what the model said).
//!   Returned as `Err` only from construction and output-writing calls; for
//!   everything that happens *to a document* it is converted into a record.
//!
//! * [`ExtractionFailure`]: the serialisable per-document record stored in
//!   [`crate::output::ExtractionResult::Failure`]. It collapses every
//!   `ExtractError` into one of four [`FailureKind`]s so a batch report stays
//!   uniform no matter which stage failed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Every concrete failure the pipeline can run into.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}' (first bytes: {magic:?})")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Rendering errors ──────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password (--password)")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH (or --pdfium-lib) to the directory or file of an existing libpdfium."
    )]
    PdfiumBindingFailed(String),

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The OCR binary could not be started.
    #[error("OCR engine '{command}' could not be started: {detail}\nInstall tesseract or set TESSERACT_CMD.")]
    OcrUnavailable { command: String, detail: String },

    /// The OCR binary ran but reported a failure.
    #[error("OCR failed on page {page}: {detail}")]
    OcrFailed { page: usize, detail: String },

    /// Rendering finished but every page came back blank.
    #[error("No text produced from '{source_name}' ({pages} pages recognised)")]
    NoTextProduced { source_name: String, pages: usize },

    // ── Model service errors ──────────────────────────────────────────────
    /// Connection refused, DNS failure, timeout, …
    #[error("Model service at '{endpoint}' unreachable: {detail}")]
    ModelUnreachable { endpoint: String, detail: String },

    /// The model service answered with a non-success HTTP status.
    #[error("Model service returned HTTP {status}: {body}")]
    ModelHttpStatus { status: u16, body: String },

    /// The response envelope did not match the wire contract.
    #[error("Malformed response from model service: {detail}")]
    ModelProtocol { detail: String },

    /// A hosted provider could not be created (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured: {hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A hosted provider call failed.
    #[error("LLM provider '{provider}' call failed: {detail}")]
    ProviderCallFailed { provider: String, detail: String },

    /// The model answered, but the answer is not JSON.
    #[error("Model output is not valid JSON: {detail}")]
    InvalidJson { detail: String, raw_output: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// Collapse the concrete error into the per-document taxonomy.
    pub fn kind(&self) -> FailureKind {
        match self {
            ExtractError::FileNotFound { .. } => FailureKind::NotFound,
            ExtractError::PermissionDenied { .. }
            | ExtractError::NotAPdf { .. }
            | ExtractError::DownloadFailed { .. }
            | ExtractError::DownloadTimeout { .. }
            | ExtractError::CorruptPdf { .. }
            | ExtractError::PasswordRequired { .. }
            | ExtractError::WrongPassword { .. }
            | ExtractError::PdfiumBindingFailed(_)
            | ExtractError::RasterisationFailed { .. }
            | ExtractError::OcrUnavailable { .. }
            | ExtractError::OcrFailed { .. }
            | ExtractError::NoTextProduced { .. } => FailureKind::Conversion,
            ExtractError::ModelUnreachable { .. }
            | ExtractError::ModelHttpStatus { .. }
            | ExtractError::ModelProtocol { .. }
            | ExtractError::ProviderNotConfigured { .. }
            | ExtractError::ProviderCallFailed { .. } => FailureKind::Communication,
            ExtractError::InvalidJson { .. } => FailureKind::Decode,
            ExtractError::OutputWriteFailed { .. }
            | ExtractError::InvalidConfig(_)
            | ExtractError::Internal(_) => FailureKind::Conversion,
        }
    }
}

/// The four ways a single document can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The input PDF does not exist.
    NotFound,
    /// The PDF could not be turned into text.
    Conversion,
    /// The model service could not be reached or refused the request.
    Communication,
    /// The model answered with something that is not JSON.
    Decode,
}

impl FailureKind {
    /// Short human label used as the `error` field of the record.
    ///
    /// A missing input and an unreadable one share the same label; `kind`
    /// tells them apart.
    pub fn label(self) -> &'static str {
        match self {
            FailureKind::NotFound | FailureKind::Conversion => "no text produced",
            FailureKind::Communication => "communication failure",
            FailureKind::Decode => "invalid JSON from model",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Serialisable record of a failed document.
///
/// Serialises as `{"kind": "...", "error": "...", "detail": "...",
/// "raw_output": "..."}`; `detail` and `raw_output` are omitted when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    pub kind: FailureKind,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// What the model actually emitted, verbatim (decode failures only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl ExtractionFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            error: kind.label().to_string(),
            detail: Some(detail.into()),
            raw_output: None,
        }
    }
}

impl From<&ExtractError> for ExtractionFailure {
    fn from(err: &ExtractError) -> Self {
        let kind = err.kind();
        let raw_output = match err {
            ExtractError::InvalidJson { raw_output, .. } => Some(raw_output.clone()),
            _ => None,
        };
        Self {
            kind,
            error: kind.label().to_string(),
            detail: Some(err.to_string()),
            raw_output,
        }
    }
}

impl From<ExtractError> for ExtractionFailure {
    fn from(err: ExtractError) -> Self {
        Self::from(&err)
    }
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(d) => write!(f, "{}: {}", self.error, d),
            None => f.write_str(&self.error),
        }
    }
}
