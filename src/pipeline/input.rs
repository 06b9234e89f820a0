//! Input resolution: turn a user-supplied path, URL or byte blob into a
//! file the renderer can open.
//!
//! pdfium needs a file-system path. In-memory documents and downloads are
//! staged into a `TempDir` owned by [`StagedDocument`]; the directory and
//! its file are deleted when the value is dropped, on every exit path.

use crate::error::ExtractError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// A PDF byte blob with the name it was uploaded under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a local file into memory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| io_error(path, e))?;
        Ok(Self {
            filename: display_name(&path.to_string_lossy()),
            bytes,
        })
    }

    /// Write the bytes to transient storage.
    pub fn stage(&self) -> Result<StagedDocument, ExtractError> {
        let dir = TempDir::new().map_err(|e| ExtractError::Internal(format!("tempdir: {e}")))?;
        let path = dir.path().join(safe_file_name(&self.filename));
        std::fs::write(&path, &self.bytes)
            .map_err(|e| ExtractError::Internal(format!("Failed to write temp file: {e}")))?;
        debug!("Staged '{}' at {}", self.filename, path.display());
        Ok(StagedDocument { path, _dir: dir })
    }
}

/// A document written to a temporary directory for the duration of one
/// render. Dropping it removes the file.
#[derive(Debug)]
pub struct StagedDocument {
    path: PathBuf,
    _dir: TempDir,
}

impl StagedDocument {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A local path, or a downloaded temp file.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; PDF downloaded to a temp directory.
    Downloaded(StagedDocument),
}

impl ResolvedInput {
    /// Get the path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded(staged) => staged.path(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Name shown in batch results for an input: the last path (or URL) segment.
pub fn display_name(input: &str) -> String {
    let trimmed = input.split(['?', '#']).next().unwrap_or(input);
    trimmed
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(input)
        .to_string()
}

/// Resolve the input string to a local PDF file path.
///
/// If the input is a URL, download it to a temporary directory.
/// If the input is a local file, validate it exists and is readable.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, ExtractError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Resolve a local file path, validating existence and PDF magic bytes.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, ExtractError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(ExtractError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(ExtractError::NotAPdf { path, magic });
            }
        }
        Err(e) => return Err(io_error(&path, e)),
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Download a URL into a staged document.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, ExtractError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ExtractError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ExtractError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(ExtractError::NotAPdf {
            path: PathBuf::from(url),
            magic,
        });
    }

    let mut name = display_name(url);
    if !name.contains('.') {
        name = "downloaded.pdf".to_string();
    }
    let staged = Document::new(name, bytes.to_vec()).stage()?;
    info!("Downloaded to: {}", staged.path().display());

    Ok(ResolvedInput::Downloaded(staged))
}

pub(crate) fn io_error(path: &Path, e: std::io::Error) -> ExtractError {
    match e.kind() {
        std::io::ErrorKind::NotFound => ExtractError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => ExtractError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ExtractError::Internal(format!("reading '{}': {e}", path.display())),
    }
}

/// Keep only the final component of an uploaded filename.
fn safe_file_name(filename: &str) -> String {
    let name = display_name(filename);
    if name.is_empty() || name == "." || name == ".." {
        "document.pdf".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("/tmp/in/invoice.pdf"), "invoice.pdf");
        assert_eq!(display_name("C:\\docs\\cv.pdf"), "cv.pdf");
        assert_eq!(display_name("https://x.org/a/b.pdf?dl=1"), "b.pdf");
        assert_eq!(display_name("plain.pdf"), "plain.pdf");
    }

    #[test]
    fn staged_file_is_removed_on_drop() {
        let doc = Document::new("../../etc/invoice.pdf", b"%PDF-1.4 test".to_vec());
        let staged = doc.stage().unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(path.file_name().unwrap(), "invoice.pdf");
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4 test");
        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn missing_local_file_is_not_found() {
        let err = resolve_local("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
    }

    #[test]
    fn non_pdf_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"hello world").unwrap();
        let err = resolve_local(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ExtractError::NotAPdf { magic, .. } if &magic == b"hell"));
    }

    #[test]
    fn document_from_missing_path() {
        let err = Document::from_path("/no/such/file.pdf").unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
    }
}
