//! Streaming batch API: emit each document's entry as soon as it is done.
//!
//! Unlike [`crate::extract::Extractor::extract_batch`], which returns after
//! the last document, [`extract_batch_stream`] yields [`BatchEntry`] items
//! through a `Stream`. Documents are still processed one at a time, so
//! entries arrive in input order.

use crate::extract::Extractor;
use crate::output::BatchEntry;
use crate::pipeline::input::Document;
use crate::schema::DocumentType;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;

/// A boxed stream of batch entries.
pub type BatchStream = Pin<Box<dyn Stream<Item = BatchEntry> + Send>>;

/// Extract a batch, streaming entries in input order.
///
/// Progress callbacks on the extractor's config fire per document, as in
/// the eager batch. Nothing runs until the stream is polled.
pub fn extract_batch_stream(
    extractor: Arc<Extractor>,
    documents: Vec<Document>,
    document_type: DocumentType,
) -> BatchStream {
    let total = documents.len();
    let stream = stream::iter(documents.into_iter().enumerate()).then(move |(i, document)| {
        let extractor = Arc::clone(&extractor);
        async move {
            extractor.document_started(i + 1, total, &document.filename);
            let result = extractor.extract_document(&document, document_type).await;
            extractor.document_finished(i + 1, total, document.filename, result)
        }
    });
    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;
    use crate::error::ExtractError;
    use crate::output::RawText;
    use crate::pipeline::llm::{GenerateRequest, ModelService};
    use crate::pipeline::render::PageRenderer;
    use async_trait::async_trait;
    use std::path::Path;

    struct EchoName;

    impl PageRenderer for EchoName {
        fn render_text(&self, pdf_path: &Path) -> Result<RawText, ExtractError> {
            let name = pdf_path.file_name().unwrap_or_default().to_string_lossy();
            Ok(RawText::from_pages(vec![name.into_owned()]))
        }
    }

    struct Echo;

    #[async_trait]
    impl ModelService for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, request: &GenerateRequest) -> Result<String, ExtractError> {
            Ok(serde_json::json!({ "prompt": request.prompt }).to_string())
        }
    }

    #[test]
    fn entries_arrive_in_input_order() {
        let config = ExtractionConfig::builder()
            .renderer(Arc::new(EchoName))
            .service(Arc::new(Echo))
            .build()
            .unwrap();
        let extractor = Arc::new(Extractor::new(config).unwrap());
        let docs: Vec<Document> = ["a.pdf", "b.pdf", "c.pdf"]
            .iter()
            .map(|n| Document::new(*n, b"%PDF-1.4".to_vec()))
            .collect();

        let entries: Vec<BatchEntry> = tokio_test::block_on(
            extract_batch_stream(extractor, docs, DocumentType::Invoice).collect(),
        );
        let names: Vec<&str> = entries.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names, ["a.pdf", "b.pdf", "c.pdf"]);
        for entry in &entries {
            let prompt = entry.result.data().unwrap()["prompt"].as_str().unwrap();
            assert!(prompt.contains(&entry.filename));
        }
    }
}
