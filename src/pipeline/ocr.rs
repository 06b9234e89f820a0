//! Text recognition for one rendered page.
//!
//! [`TesseractEngine`] shells out to the `tesseract` binary: the page is
//! written as a PNG into a named temp file and the recognised text is read
//! back from stdout (`tesseract <png> stdout`).

use crate::error::ExtractError;
use crate::pipeline::encode::encode_png;
use image::DynamicImage;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Recognises the text on one page image. Blocking.
pub trait OcrEngine: Send + Sync {
    /// `page_num` is 1-indexed and only used for error reporting.
    fn recognize(&self, image: &DynamicImage, page_num: usize) -> Result<String, ExtractError>;
}

/// The Tesseract command-line engine.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: PathBuf,
    language: String,
    psm: Option<u8>,
}

impl TesseractEngine {
    pub fn new(command: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
            psm: None,
        }
    }

    pub fn with_page_segmentation_mode(mut self, psm: Option<u8>) -> Self {
        self.psm = psm;
        self
    }

    /// Arguments after the program name for a given image path.
    fn args(&self, image_path: &std::path::Path) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> = vec![
            image_path.as_os_str().to_owned(),
            "stdout".into(),
            "-l".into(),
            self.language.clone().into(),
        ];
        if let Some(psm) = self.psm {
            args.push("--psm".into());
            args.push(psm.to_string().into());
        }
        args
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &DynamicImage, page_num: usize) -> Result<String, ExtractError> {
        let png = encode_png(image).map_err(|e| ExtractError::RasterisationFailed {
            page: page_num,
            detail: format!("PNG encoding failed: {e}"),
        })?;

        let mut tmp = tempfile::Builder::new()
            .prefix("doc2json-page-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| ExtractError::Internal(format!("tempfile: {e}")))?;
        tmp.write_all(&png)
            .and_then(|_| tmp.flush())
            .map_err(|e| ExtractError::Internal(format!("tempfile write: {e}")))?;

        let output = Command::new(&self.command)
            .args(self.args(tmp.path()))
            .output()
            .map_err(|e| ExtractError::OcrUnavailable {
                command: self.command.display().to_string(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::OcrFailed {
                page: page_num,
                detail: format!("{} ({})", stderr.trim(), output.status),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("Page {}: OCR produced {} chars", page_num, text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::path::Path;

    #[test]
    fn args_include_language_and_psm() {
        let engine = TesseractEngine::new("tesseract", "eng+deu").with_page_segmentation_mode(Some(6));
        let args = engine.args(Path::new("/tmp/p.png"));
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, ["/tmp/p.png", "stdout", "-l", "eng+deu", "--psm", "6"]);
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let engine = TesseractEngine::new("/definitely/not/tesseract", "eng");
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([255; 4])));
        let err = engine.recognize(&img, 1).unwrap_err();
        assert!(matches!(err, ExtractError::OcrUnavailable { .. }));
    }
}
