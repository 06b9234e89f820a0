//! End-to-end tests for doc2json against real tools.
//!
//! These tests need libpdfium, tesseract and a running Ollama server, plus
//! PDF files in `./test_cases/`. They are gated behind the `E2E_ENABLED`
//! environment variable so they do not run in CI unless explicitly
//! requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=. cargo test --test e2e -- --nocapture
//!
//! To restrict to a specific test:
//!   E2E_ENABLED=1 cargo test --test e2e test_invoice_extraction -- --nocapture

use doc2json::{
    extract, BatchResult, Document, DocumentType, ExtractionConfig, Extractor, FailureKind,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

async fn ollama_is_available() -> bool {
    let host =
        std::env::var("OLLAMA_HOST").unwrap_or_else(|_| "http://localhost:11434".to_string());
    reqwest::Client::new()
        .get(format!("{host}/api/tags"))
        .timeout(std::time::Duration::from_secs(3))
        .send()
        .await
        .is_ok()
}

fn live_config() -> ExtractionConfig {
    let mut builder = ExtractionConfig::builder();
    if let Ok(host) = std::env::var("OLLAMA_HOST") {
        builder = builder.endpoint(host);
    }
    if let Ok(model) = std::env::var("DOC2JSON_MODEL") {
        builder = builder.model(model);
    }
    if let Ok(lib) = std::env::var("PDFIUM_LIB_PATH") {
        builder = builder.pdfium_library_path(lib);
    }
    if let Ok(cmd) = std::env::var("TESSERACT_CMD") {
        builder = builder.tesseract_cmd(cmd);
    }
    builder.build().expect("valid config")
}

// ── Renderer only ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ocr_invoice_has_page_markers() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("invoice.pdf"));
    let extractor = Extractor::new(live_config()).unwrap();

    let raw = extractor.ocr_file(&pdf).await.expect("OCR should succeed");
    assert!(raw.page_count() >= 1);
    assert!(!raw.is_blank());
    assert!(raw.render().starts_with("--- Page 1 ---\n"));
    println!("{}", raw.render());
}

#[tokio::test]
async fn test_ocr_nonexistent_file() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
        return;
    }
    let extractor = Extractor::new(live_config()).unwrap();
    let err = extractor
        .ocr_file("/nonexistent/invoice.pdf")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::NotFound);
}

// ── Full pipeline ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_invoice_extraction() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("invoice.pdf"));
    if !ollama_is_available().await {
        println!("SKIP — Ollama not reachable (start with: ollama serve)");
        return;
    }

    let result = extract(pdf.to_string_lossy(), DocumentType::Invoice, &live_config())
        .await
        .unwrap();
    let data = result.data().unwrap_or_else(|| {
        panic!("extraction failed: {:?}", result.failure());
    });
    println!("{}", serde_json::to_string_pretty(data).unwrap());
    assert!(data.is_object(), "model output should be a JSON object");
}

#[tokio::test]
async fn test_resume_extraction() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("resume.pdf"));
    if !ollama_is_available().await {
        println!("SKIP — Ollama not reachable (start with: ollama serve)");
        return;
    }

    let extractor = Extractor::new(live_config()).unwrap();
    let result = extractor.extract_file(&pdf, DocumentType::Resume).await;
    let data = result.data().expect("resume extraction should succeed");
    println!("{}", serde_json::to_string_pretty(data).unwrap());
}

#[tokio::test]
async fn test_batch_with_one_bad_document() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("invoice.pdf"));
    if !ollama_is_available().await {
        println!("SKIP — Ollama not reachable (start with: ollama serve)");
        return;
    }

    let good = Document::from_path(&pdf).unwrap();
    let bad = Document::new("broken.pdf", b"%PDF-1.4 truncated".to_vec());
    let extractor = Extractor::new(live_config()).unwrap();

    let batch: BatchResult = extractor
        .extract_batch(&[good, bad], DocumentType::Invoice)
        .await;
    assert_eq!(batch.len(), 2);
    assert!(batch.entries[0].result.is_success());
    assert_eq!(
        batch.entries[1].result.failure().map(|f| f.kind),
        Some(FailureKind::Conversion)
    );
    println!("{}", serde_json::to_string_pretty(&batch).unwrap());
}
