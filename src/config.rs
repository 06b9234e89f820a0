//! Configuration types for document extraction.
//!
//! All pipeline behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Every external location (PDFium
//! library, Tesseract binary, model endpoint) lives here and is handed to
//! the renderer and client at construction; nothing reads a hardcoded path.

use crate::error::ExtractError;
use crate::pipeline::llm::ModelService;
use crate::pipeline::render::PageRenderer;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default Ollama address.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default model identifier served by Ollama.
pub const DEFAULT_MODEL: &str = "llama3";

/// Configuration for an extraction run.
///
/// # Example
/// ```rust
/// use doc2json::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .dpi(300)
///     .model("llama3")
///     .endpoint("http://localhost:11434")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    // ── Renderer ─────────────────────────────────────────────────────────
    /// Rasterisation resolution. Range: 72–600. Default: 300.
    ///
    /// 300 DPI keeps Tesseract's column alignment intact on tabular invoice
    /// data; below ~200 amounts start drifting between columns.
    pub dpi: u32,

    /// Longest-edge cap for a rendered page in pixels. Default: 8000.
    ///
    /// A letter page at 300 DPI is 2550 × 3300 px; the cap only bites on
    /// oversized pages (posters, engineering drawings).
    pub max_rendered_pixels: u32,

    /// Directory or file of the pdfium shared library.
    /// If None, tries the working directory then the system library path.
    pub pdfium_library_path: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Tesseract executable. Default: `tesseract` (resolved via `PATH`).
    pub tesseract_cmd: PathBuf,

    /// Tesseract language code(s), e.g. `eng` or `eng+deu`. Default: `eng`.
    pub ocr_language: String,

    /// Tesseract page segmentation mode (`--psm`). Default: engine default.
    pub page_segmentation_mode: Option<u8>,

    // ── Client ───────────────────────────────────────────────────────────
    /// Which model service to talk to. Default: [`ModelBackend::Ollama`].
    pub backend: ModelBackend,

    /// Base URL of the Ollama server. Default: `http://localhost:11434`.
    pub endpoint: String,

    /// Model identifier. Default: `llama3`.
    pub model: String,

    /// Sampling temperature. Default: None (the server's own default).
    pub temperature: Option<f32>,

    /// Timeout for one model call in seconds. Default: 300.
    ///
    /// Local models on CPU can take minutes on a multi-page invoice.
    pub request_timeout_secs: u64,

    /// Try the inside of a single ```json fenced block when the raw output
    /// is not JSON. Default: false.
    pub strip_code_fences: bool,

    /// Pre-constructed model service. Takes precedence over `backend`.
    pub service: Option<Arc<dyn ModelService>>,

    /// Pre-constructed renderer. Takes precedence over the PDFium/Tesseract settings.
    pub renderer: Option<Arc<dyn PageRenderer>>,

    // ── Orchestrator ─────────────────────────────────────────────────────
    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Batch progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_rendered_pixels: 8000,
            pdfium_library_path: None,
            password: None,
            tesseract_cmd: PathBuf::from("tesseract"),
            ocr_language: "eng".to_string(),
            page_segmentation_mode: None,
            backend: ModelBackend::default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            request_timeout_secs: 300,
            strip_code_fences: false,
            service: None,
            renderer: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("tesseract_cmd", &self.tesseract_cmd)
            .field("ocr_language", &self.ocr_language)
            .field("page_segmentation_mode", &self.page_segmentation_mode)
            .field("backend", &self.backend)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("strip_code_fences", &self.strip_code_fences)
            .field("service", &self.service.as_ref().map(|_| "<dyn ModelService>"))
            .field("renderer", &self.renderer.as_ref().map(|_| "<dyn PageRenderer>"))
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.clamp(100, 32_768);
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<PathBuf>) -> Self {
        self.config.tesseract_cmd = cmd.into();
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn page_segmentation_mode(mut self, psm: u8) -> Self {
        self.config.page_segmentation_mode = Some(psm);
        self
    }

    pub fn backend(mut self, backend: ModelBackend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn strip_code_fences(mut self, v: bool) -> Self {
        self.config.strip_code_fences = v;
        self
    }

    pub fn service(mut self, service: Arc<dyn ModelService>) -> Self {
        self.config.service = Some(service);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// Numeric settings are clamped by their setters and never rejected here.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(ExtractError::InvalidConfig("model must not be empty".into()));
        }
        if c.service.is_none()
            && c.backend == ModelBackend::Ollama
            && !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://"))
        {
            return Err(ExtractError::InvalidConfig(format!(
                "endpoint must be an http(s) URL, got '{}'",
                c.endpoint
            )));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Model service selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModelBackend {
    /// Local Ollama server, `POST {endpoint}/api/generate` with JSON mode. (default)
    #[default]
    Ollama,
    /// Hosted provider by name (`openai`, `anthropic`, `gemini`, …) through
    /// edgequake-llm; API keys come from the provider's usual env vars.
    Provider(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_local_setup() {
        let c = ExtractionConfig::default();
        assert_eq!(c.dpi, 300);
        assert_eq!(c.endpoint, "http://localhost:11434");
        assert_eq!(c.model, "llama3");
        assert_eq!(c.backend, ModelBackend::Ollama);
        assert!(!c.strip_code_fences);
        assert!(c.temperature.is_none());
    }

    #[test]
    fn builder_clamps_and_trims() {
        let c = ExtractionConfig::builder()
            .dpi(10_000)
            .temperature(9.0)
            .endpoint("http://gpu-box:11434/")
            .build()
            .unwrap();
        assert_eq!(c.dpi, 600);
        assert_eq!(c.temperature, Some(2.0));
        assert_eq!(c.endpoint, "http://gpu-box:11434");
    }

    #[test]
    fn builder_clamps_numeric_ranges() {
        let low = ExtractionConfig::builder()
            .dpi(10)
            .max_rendered_pixels(0)
            .request_timeout_secs(0)
            .download_timeout_secs(0)
            .build()
            .unwrap();
        assert_eq!(low.dpi, 72);
        assert_eq!(low.max_rendered_pixels, 100);
        assert_eq!(low.request_timeout_secs, 1);
        assert_eq!(low.download_timeout_secs, 1);

        let high = ExtractionConfig::builder()
            .max_rendered_pixels(u32::MAX)
            .build()
            .unwrap();
        assert_eq!(high.max_rendered_pixels, 32_768);
        assert!(i32::try_from(high.max_rendered_pixels).is_ok());
    }

    #[test]
    fn builder_rejects_bad_endpoint() {
        let err = ExtractionConfig::builder()
            .endpoint("localhost:11434")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("http(s) URL"));
    }

    #[test]
    fn provider_backend_skips_endpoint_check() {
        let c = ExtractionConfig::builder()
            .backend(ModelBackend::Provider("openai".into()))
            .endpoint("unused")
            .model("gpt-4.1-nano")
            .build();
        assert!(c.is_ok());
    }

    #[test]
    fn debug_redacts_password() {
        let c = ExtractionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
    }
}
