//! Pipeline stages for PDF-to-JSON extraction.
//!
//! Each submodule implements one step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ ocr ──▶ postprocess ──▶ llm
//! (path/URL) (pdfium)   (PNG)   (tesseract) (cleanup)   (model → JSON)
//! ```
//!
//! 1. [`input`]: resolve a path, URL or byte blob to a local file; staged
//!    copies are deleted on drop
//! 2. [`render`]: rasterise every page at the configured DPI; blocking,
//!    so it runs in `spawn_blocking`
//! 3. [`encode`]: PNG-encode each page for the OCR engine
//! 4. [`ocr`]: recognise the page text
//! 5. [`postprocess`]: normalise OCR text; unwrap fenced model output
//! 6. [`llm`]: the model call and JSON parse; the only stage that talks
//!    to a model service

pub mod encode;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod postprocess;
pub mod render;
