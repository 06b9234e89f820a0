//! PDF → text: rasterise every page via pdfium, then OCR it.
//!
//! Rendering is CPU-bound and calls into a C library, so callers run
//! [`PageRenderer::render_text`] inside `tokio::task::spawn_blocking`
//! (see [`crate::extract::Extractor`]).
//!
//! Pages are scaled by `dpi / 72` (PDF user space is 72 units per inch)
//! and capped at `max_rendered_pixels` on each edge so an oversized page
//! cannot exhaust memory.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::output::RawText;
use crate::pipeline::ocr::{OcrEngine, TesseractEngine};
use crate::pipeline::postprocess::clean_page_text;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Turns a PDF on disk into per-page text. Blocking.
pub trait PageRenderer: Send + Sync {
    fn render_text(&self, pdf_path: &Path) -> Result<RawText, ExtractError>;
}

/// The production renderer: pdfium rasterisation + an [`OcrEngine`].
pub struct OcrPageRenderer {
    dpi: u32,
    max_pixels: u32,
    pdfium_library_path: Option<PathBuf>,
    password: Option<String>,
    ocr: Arc<dyn OcrEngine>,
}

impl OcrPageRenderer {
    pub fn new(
        dpi: u32,
        max_pixels: u32,
        pdfium_library_path: Option<PathBuf>,
        password: Option<String>,
        ocr: Arc<dyn OcrEngine>,
    ) -> Self {
        Self {
            dpi,
            max_pixels,
            pdfium_library_path,
            password,
            ocr,
        }
    }

    /// Renderer with a [`TesseractEngine`] built from the config.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let engine = TesseractEngine::new(&config.tesseract_cmd, &config.ocr_language)
            .with_page_segmentation_mode(config.page_segmentation_mode);
        Self::new(
            config.dpi,
            config.max_rendered_pixels,
            config.pdfium_library_path.clone(),
            config.password.clone(),
            Arc::new(engine),
        )
    }

    fn scale_factor(&self) -> f32 {
        self.dpi as f32 / 72.0
    }

    fn bind(&self) -> Result<Pdfium, ExtractError> {
        let bindings = match &self.pdfium_library_path {
            Some(p) if p.is_dir() => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(p))
            }
            Some(p) => Pdfium::bind_to_library(p),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| ExtractError::PdfiumBindingFailed(e.to_string()))?;
        Ok(Pdfium::new(bindings))
    }
}

impl PageRenderer for OcrPageRenderer {
    fn render_text(&self, pdf_path: &Path) -> Result<RawText, ExtractError> {
        if !pdf_path.exists() {
            return Err(ExtractError::FileNotFound {
                path: pdf_path.to_path_buf(),
            });
        }

        let pdfium = self.bind()?;
        let password = self.password.as_deref();

        let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    ExtractError::WrongPassword {
                        path: pdf_path.to_path_buf(),
                    }
                } else {
                    ExtractError::PasswordRequired {
                        path: pdf_path.to_path_buf(),
                    }
                }
            } else {
                ExtractError::CorruptPdf {
                    path: pdf_path.to_path_buf(),
                    detail: err_str,
                }
            }
        })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!(
            "PDF loaded: {} pages, rendering at {} DPI",
            total_pages, self.dpi
        );

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(self.scale_factor())
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        let mut texts = Vec::with_capacity(total_pages);
        for (idx, page) in pages.iter().enumerate() {
            let page_num = idx + 1;
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                ExtractError::RasterisationFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                page_num,
                image.width(),
                image.height()
            );

            let text = self.ocr.recognize(&image, page_num)?;
            texts.push(clean_page_text(&text));
        }

        let raw = RawText::from_pages(texts);
        if raw.is_blank() {
            return Err(ExtractError::NoTextProduced {
                source_name: pdf_path.display().to_string(),
                pages: total_pages,
            });
        }
        Ok(raw)
    }
}
