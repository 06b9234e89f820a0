//! Result types produced by the pipeline.

use crate::error::ExtractionFailure;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

// ── RawText ──────────────────────────────────────────────────────────────

static RE_PAGE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^--- Page (\d+) ---\r?$").unwrap());

/// OCR output: one text block per page, in page order.
///
/// Rendered as `--- Page N ---\n{text}\n` per page (N is 1-indexed).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawText {
    pages: Vec<String>,
}

impl RawText {
    pub fn from_pages(pages: Vec<String>) -> Self {
        Self { pages }
    }

    /// Recover pages from previously rendered text.
    ///
    /// Text without any page marker becomes a single page. Non-blank text
    /// before the first marker is kept as its own leading page.
    pub fn parse(text: &str) -> Self {
        let markers: Vec<_> = RE_PAGE_MARKER.find_iter(text).collect();
        if markers.is_empty() {
            return Self {
                pages: vec![text.to_string()],
            };
        }

        let mut pages = Vec::with_capacity(markers.len() + 1);
        let preamble = &text[..markers[0].start()];
        if !preamble.trim().is_empty() {
            pages.push(preamble.trim_end_matches('\n').to_string());
        }

        for (i, m) in markers.iter().enumerate() {
            let body_start = (m.end() + 1).min(text.len());
            let body_end = markers.get(i + 1).map_or(text.len(), |next| next.start());
            let body = &text[body_start.min(body_end)..body_end];
            pages.push(body.strip_suffix('\n').unwrap_or(body).to_string());
        }

        Self { pages }
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// True when there are no pages or every page is whitespace.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.trim().is_empty())
    }

    /// Concatenate pages with their 1-indexed markers.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.pages.iter().map(|p| p.len() + 20).sum());
        for (i, page) in self.pages.iter().enumerate() {
            out.push_str(&format!("--- Page {} ---\n{}\n", i + 1, page));
        }
        out
    }
}

impl fmt::Display for RawText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

// ── ExtractionResult ─────────────────────────────────────────────────────

/// Outcome for one document.
///
/// A `Success` holds whatever JSON the model produced; its shape is not
/// checked against the requested schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExtractionResult {
    #[serde(rename = "data")]
    Success(serde_json::Value),
    #[serde(rename = "error")]
    Failure(ExtractionFailure),
}

impl ExtractionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionResult::Success(_))
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            ExtractionResult::Success(v) => Some(v),
            ExtractionResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ExtractionFailure> {
        match self {
            ExtractionResult::Success(_) => None,
            ExtractionResult::Failure(f) => Some(f),
        }
    }

    /// Single-document output: the value itself, or the failure object.
    pub fn to_output_json(&self) -> serde_json::Value {
        match self {
            ExtractionResult::Success(v) => v.clone(),
            ExtractionResult::Failure(f) => {
                serde_json::to_value(f).unwrap_or_else(|_| serde_json::json!({ "error": f.error }))
            }
        }
    }
}

impl From<crate::error::ExtractError> for ExtractionResult {
    fn from(err: crate::error::ExtractError) -> Self {
        ExtractionResult::Failure(err.into())
    }
}

// ── Batch ────────────────────────────────────────────────────────────────

/// One row of a batch: `{"filename": ..., "data": ...}` or
/// `{"filename": ..., "error": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub filename: String,
    #[serde(flatten)]
    pub result: ExtractionResult,
}

/// Ordered per-document outcomes; order = input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchResult {
    pub entries: Vec<BatchEntry>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.result.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BatchEntry> {
        self.entries.iter()
    }
}

impl FromIterator<BatchEntry> for BatchResult {
    fn from_iter<I: IntoIterator<Item = BatchEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use serde_json::json;

    #[test]
    fn render_uses_one_indexed_markers() {
        let raw = RawText::from_pages(vec!["Invoice #123".into(), "Total: $50.00".into()]);
        assert_eq!(
            raw.render(),
            "--- Page 1 ---\nInvoice #123\n--- Page 2 ---\nTotal: $50.00\n"
        );
        assert_eq!(raw.to_string(), raw.render());
    }

    #[test]
    fn parse_recovers_rendered_pages() {
        let raw = RawText::from_pages(vec!["a\nb".into(), String::new(), "c".into()]);
        assert_eq!(RawText::parse(&raw.render()), raw);
    }

    #[test]
    fn parse_without_markers_is_single_page() {
        let raw = RawText::parse("just some text");
        assert_eq!(raw.pages(), ["just some text".to_string()]);
    }

    #[test]
    fn parse_keeps_preamble() {
        let raw = RawText::parse("cover\n--- Page 1 ---\nbody\n");
        assert_eq!(raw.pages(), ["cover".to_string(), "body".to_string()]);
    }

    #[test]
    fn blank_detection() {
        assert!(RawText::default().is_blank());
        assert!(RawText::from_pages(vec![" \n".into(), "\t".into()]).is_blank());
        assert!(!RawText::from_pages(vec!["".into(), "x".into()]).is_blank());
    }

    #[test]
    fn success_value_survives_serialisation() {
        let value = json!({
            "invoice_metadata": {"invoice_number": "123", "invoice_date": null},
            "line_items": [{"description": "Widget", "quantity": 2, "amount": 50.0}],
        });
        let result = ExtractionResult::Success(value);
        let text = serde_json::to_string(&result).unwrap();
        let back: ExtractionResult = serde_json::from_str(&text).unwrap();
        assert_eq!(back, result);

        let out = serde_json::to_string(&result.to_output_json()).unwrap();
        let reparsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(Some(&reparsed), result.data());
    }

    #[test]
    fn batch_entry_shapes() {
        let ok = BatchEntry {
            filename: "a.pdf".into(),
            result: ExtractionResult::Success(json!({"name": "Ada"})),
        };
        let bad = BatchEntry {
            filename: "b.pdf".into(),
            result: ExtractionResult::Failure(ExtractionFailure::new(
                FailureKind::Conversion,
                "corrupt",
            )),
        };
        let batch: BatchResult = vec![ok, bad].into_iter().collect();
        let v = serde_json::to_value(&batch).unwrap();
        assert_eq!(v[0]["filename"], "a.pdf");
        assert_eq!(v[0]["data"]["name"], "Ada");
        assert!(v[0].get("error").is_none());
        assert_eq!(v[1]["filename"], "b.pdf");
        assert_eq!(v[1]["error"]["kind"], "conversion");
        assert!(v[1].get("data").is_none());
        assert_eq!(batch.succeeded(), 1);
        assert_eq!(batch.failed(), 1);
    }

    #[test]
    fn failure_output_json_is_the_record() {
        let r = ExtractionResult::Failure(ExtractionFailure::new(
            FailureKind::Communication,
            "refused",
        ));
        let v = r.to_output_json();
        assert_eq!(v["error"], "communication failure");
        assert_eq!(v["detail"], "refused");
    }
}
