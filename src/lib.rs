//! # doc2json
//!
//! Extract structured JSON (invoices, resumes) from PDF documents with OCR
//! and a language model.
//!
//! Scanned and digitally generated PDFs are treated the same way: every
//! page is rasterised and read by Tesseract, and the resulting text is
//! sent to a model together with a fixed schema directive for the chosen
//! document type. The model's JSON answer is returned as-is.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file, URL or uploaded bytes
//!  ├─ 2. Render    rasterise pages via pdfium (spawn_blocking)
//!  ├─ 3. OCR       tesseract per page → "--- Page N ---" text
//!  ├─ 4. Select    schema directive for invoice / resume
//!  ├─ 5. Model     Ollama /api/generate (JSON mode) or a hosted provider
//!  └─ 6. Output    JSON value, or a typed failure record
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2json::{extract, DocumentType, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Ollama at http://localhost:11434 with llama3, tesseract on PATH
//!     let config = ExtractionConfig::default();
//!     let result = extract("invoice.pdf", DocumentType::Invoice, &config).await?;
//!     println!("{}", serde_json::to_string_pretty(&result.to_output_json())?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2json` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! doc2json = { version = "0.1", default-features = false }
//! ```
//!
//! ## External Tools
//!
//! | Tool | Located via |
//! |------|-------------|
//! | libpdfium | `ExtractionConfig::pdfium_library_path`, else `./`, else system |
//! | tesseract | `ExtractionConfig::tesseract_cmd` (default `tesseract` on `PATH`) |
//! | Ollama    | `ExtractionConfig::endpoint` (default `http://localhost:11434`) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod schema;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, ModelBackend};
pub use error::{ExtractError, ExtractionFailure, FailureKind};
pub use extract::{extract, extract_sync, write_json, Extractor};
pub use output::{BatchEntry, BatchResult, ExtractionResult, RawText};
pub use pipeline::input::Document;
pub use pipeline::llm::{ExtractionClient, GenerateRequest, ModelService, OllamaClient};
pub use pipeline::ocr::{OcrEngine, TesseractEngine};
pub use pipeline::render::{OcrPageRenderer, PageRenderer};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use schema::{select_template, DocumentType, SchemaTemplate};
pub use stream::{extract_batch_stream, BatchStream};
