//! Error types for the edgequake-pdf2video library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2VideoError`] is **fatal**: the video cannot be produced at all
//!   (bad input file, wrong password, pdfium or ffmpeg missing, final export
//!   failed). Returned as `Err(Pdf2VideoError)` from the top-level `convert*`
//!   functions.
//!
//! * [`PageError`] is **non-fatal**: a single page could not be rendered or
//!   encoded, but the remaining pages still make a video. Stored inside
//!   [`crate::output::PageClip`] so callers can see which pages were dropped.
//!
//! A failed narration is not an error at all from the pipeline's point of
//! view: the page simply becomes silent and the reason is kept in
//! [`crate::output::PageClip::narration_error`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2video library.
#[derive(Debug, Error)]
pub enum Pdf2VideoError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection matched no page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    // ── Media errors ──────────────────────────────────────────────────────
    /// `ffmpeg` or `ffprobe` could not be started at all.
    #[error("Failed to run '{program}': {source}\nInstall ffmpeg or pass --ffmpeg / --ffprobe.")]
    ToolMissing {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An ffmpeg invocation exited unsuccessfully.
    #[error("{tool} failed: {stderr}")]
    MediaToolFailed { tool: String, stderr: String },

    /// An ffmpeg invocation did not finish within the configured timeout.
    #[error("{tool} timed out after {secs}s")]
    MediaToolTimeout { tool: String, secs: u64 },

    /// No page produced a clip; there is nothing to put in the video.
    #[error("All {total} pages failed to produce a clip.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    /// The final concatenation step failed. No partial video is kept.
    #[error("Failed to export video '{path}': {detail}")]
    ExportFailed { path: PathBuf, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create the working directory or write a scratch file.
    #[error("Failed to write '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Install libpdfium system-wide.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// The page is left out of the final video; all other pages continue.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The page's video segment could not be encoded.
    #[error("Page {page}: clip encoding failed: {detail}")]
    ClipFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-indexed page number the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::RenderFailed { page, .. } | PageError::ClipFailed { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_pages_failed_display() {
        let e = Pdf2VideoError::AllPagesFailed {
            total: 3,
            first_error: "boom".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("All 3 pages"), "got: {msg}");
        assert!(msg.contains("boom"));
    }

    #[test]
    fn media_tool_timeout_display() {
        let e = Pdf2VideoError::MediaToolTimeout {
            tool: "ffmpeg".into(),
            secs: 600,
        };
        assert_eq!(e.to_string(), "ffmpeg timed out after 600s");
    }

    #[test]
    fn tool_missing_mentions_program() {
        let e = Pdf2VideoError::ToolMissing {
            program: "ffprobe".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(e.to_string().contains("ffprobe"));
    }

    #[test]
    fn page_error_reports_page() {
        let e = PageError::ClipFailed {
            page: 7,
            detail: "x".into(),
        };
        assert_eq!(e.page(), 7);
        assert!(e.to_string().starts_with("Page 7"));
    }
}
