//! Input resolution: turn a user-supplied path or URL into a local PDF file.
//!
//! pdfium opens files by path, so a URL is downloaded into a `TempDir` owned
//! by [`ResolvedInput`]; the directory is removed when the value is dropped.
//! The `%PDF` magic is checked here so a wrong file fails with
//! [`Pdf2VideoError::NotAPdf`] before pdfium is ever bound.

use crate::error::Pdf2VideoError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// The resolved input: either a local path or a downloaded temp file.
pub enum ResolvedInput {
    Local(PathBuf),
    /// The `TempDir` is kept alive until the conversion finishes.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }
}

/// Whether the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local PDF file path.
pub async fn resolve_input(
    input: &str,
    timeout_secs: u64,
) -> Result<ResolvedInput, Pdf2VideoError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, Pdf2VideoError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(Pdf2VideoError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            let read = f.read(&mut magic).map_err(|_| Pdf2VideoError::FileNotFound {
                path: path.clone(),
            })?;
            if read < 4 || &magic != PDF_MAGIC {
                return Err(Pdf2VideoError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2VideoError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Pdf2VideoError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, Pdf2VideoError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| Pdf2VideoError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Pdf2VideoError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let disposition = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let filename = extract_filename(url, disposition.as_deref());

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

    let temp_dir = TempDir::new().map_err(|e| Pdf2VideoError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    if bytes.len() < 4 || &bytes[..4] != PDF_MAGIC {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(Pdf2VideoError::NotAPdf {
            path: file_path,
            magic,
        });
    }

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| Pdf2VideoError::WriteFailed {
            path: file_path.clone(),
            source: e,
        })?;

    info!(
        "Downloaded {} bytes to: {}",
        bytes.len(),
        file_path.display()
    );

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Pick a file name from `Content-Disposition`, then the URL path, then a default.
fn extract_filename(url: &str, content_disposition: Option<&str>) -> String {
    if let Some(name) = content_disposition.and_then(disposition_filename) {
        return name;
    }

    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

fn disposition_filename(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|v| v.trim_matches('"'))
        // Only the final component; a header must not steer the write path.
        .and_then(|v| Path::new(v).file_name())
        .map(|v| v.to_string_lossy().into_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_missing_file() {
        let err = resolve_local("/no/such/file.pdf").err().unwrap();
        assert!(matches!(err, Pdf2VideoError::FileNotFound { .. }));
    }

    #[test]
    fn test_not_a_pdf() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04zip").unwrap();
        let err = resolve_local(f.path().to_str().unwrap()).err().unwrap();
        match err {
            Pdf2VideoError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn test_too_short_to_be_a_pdf() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%P").unwrap();
        let err = resolve_local(f.path().to_str().unwrap()).err().unwrap();
        assert!(matches!(err, Pdf2VideoError::NotAPdf { .. }));
    }

    #[test]
    fn test_local_pdf_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.pdf");
        std::fs::write(&path, b"%PDF-1.7\n%%EOF\n").unwrap();
        let resolved = resolve_local(path.to_str().unwrap()).ok().unwrap();
        assert_eq!(resolved.path(), path);
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_local(dir.path().to_str().unwrap()).err().unwrap();
        assert!(matches!(err, Pdf2VideoError::FileNotFound { .. }));
    }

    #[test]
    fn test_extract_filename() {
        assert_eq!(
            extract_filename("https://example.com/papers/deck.pdf", None),
            "deck.pdf"
        );
        assert_eq!(
            extract_filename("https://example.com/download", None),
            "downloaded.pdf"
        );
        assert_eq!(
            extract_filename(
                "https://example.com/download",
                Some("attachment; filename=\"slides.pdf\"")
            ),
            "slides.pdf"
        );
    }

    #[test]
    fn test_disposition_cannot_escape_temp_dir() {
        assert_eq!(
            disposition_filename("attachment; filename=\"../../etc/evil.pdf\"").as_deref(),
            Some("evil.pdf")
        );
        assert_eq!(disposition_filename("inline"), None);
    }
}
