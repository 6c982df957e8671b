//! PDF rasterisation and text extraction via pdfium.
//!
//! Each selected page is rendered once to a PNG in the working directory and
//! its raw text layer is pulled out in the same pass, so the document is only
//! opened once for both.
//!
//! `pdfium-render` wraps a C++ library with thread-local state, so all pdfium
//! work runs inside `tokio::task::spawn_blocking`.

use crate::config::VideoConfig;
use crate::error::{PageError, Pdf2VideoError};
use crate::output::DocumentMetadata;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A page that was rasterised successfully.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 0-indexed page number.
    pub index: usize,
    pub image_path: PathBuf,
    /// Rendered image size in pixels.
    pub width: u32,
    pub height: u32,
    /// Raw extracted text; empty when the page has no text layer.
    pub text: String,
}

impl RenderedPage {
    /// 1-indexed page number.
    pub fn page_num(&self) -> usize {
        self.index + 1
    }
}

/// Image file name for a page.
pub fn page_image_path(work_dir: &Path, page_num: usize) -> PathBuf {
    work_dir.join(format!("page_{page_num}.png"))
}

/// Bind to pdfium: explicit path, then `PDFIUM_LIB_PATH`, then the system library.
///
/// A directory path is resolved to the platform library file inside it.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, Pdf2VideoError> {
    let explicit = lib_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

    let bindings = match explicit {
        Some(path) => {
            let path = if path.is_dir() {
                path.join(platform_library_name())
            } else {
                path
            };
            debug!("Binding pdfium from {}", path.display());
            Pdfium::bind_to_library(&path).map_err(|e| {
                Pdf2VideoError::PdfiumBindingFailed(format!("{}: {:?}", path.display(), e))
            })?
        }
        None => Pdfium::bind_to_system_library()
            .map_err(|e| Pdf2VideoError::PdfiumBindingFailed(format!("{:?}", e)))?,
    };

    Ok(Pdfium::new(bindings))
}

fn platform_library_name() -> String {
    format!(
        "{}pdfium{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    )
}

/// Render selected pages to PNG and extract their text.
///
/// Returns one entry per index in `page_indices`, in the same order. A page
/// that fails to rasterise is reported as a [`PageError`] and does not stop
/// the others.
pub async fn render_pages(
    pdf_path: &Path,
    config: &VideoConfig,
    page_indices: &[usize],
) -> Result<Vec<Result<RenderedPage, PageError>>, Pdf2VideoError> {
    let path = pdf_path.to_path_buf();
    let work_dir = config.work_dir.clone();
    let width = config.video_width;
    let password = config.password.clone();
    let lib_path = config.pdfium_lib_path.clone();
    let indices = page_indices.to_vec();

    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium(lib_path.as_deref())?;
        render_pages_blocking(
            &pdfium,
            &path,
            &work_dir,
            width,
            password.as_deref(),
            &indices,
        )
    })
    .await
    .map_err(|e| Pdf2VideoError::Internal(format!("Render task panicked: {}", e)))?
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, Pdf2VideoError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                Pdf2VideoError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                Pdf2VideoError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            Pdf2VideoError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

fn render_pages_blocking(
    pdfium: &Pdfium,
    pdf_path: &Path,
    work_dir: &Path,
    width: u32,
    password: Option<&str>,
    page_indices: &[usize],
) -> Result<Vec<Result<RenderedPage, PageError>>, Pdf2VideoError> {
    std::fs::create_dir_all(work_dir).map_err(|e| Pdf2VideoError::WriteFailed {
        path: work_dir.to_path_buf(),
        source: e,
    })?;

    let document = open_document(pdfium, pdf_path, password)?;
    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    // Extremely tall pages are capped so a scroll-like page cannot exhaust memory.
    let render_config = PdfRenderConfig::new()
        .set_target_width(width as i32)
        .set_maximum_height((width * 4) as i32);

    let mut results = Vec::with_capacity(page_indices.len());

    for &idx in page_indices {
        let page_num = idx + 1;
        if idx >= total_pages {
            warn!(
                "Skipping page {} (out of range, total={})",
                page_num, total_pages
            );
            results.push(Err(PageError::RenderFailed {
                page: page_num,
                detail: format!("out of range (document has {total_pages} pages)"),
            }));
            continue;
        }

        let page = match pages.get(idx as u16) {
            Ok(page) => page,
            Err(e) => {
                results.push(Err(PageError::RenderFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                }));
                continue;
            }
        };

        let text = match page.text() {
            Ok(text) => text.all(),
            Err(e) => {
                warn!("Page {}: text extraction failed: {:?}", page_num, e);
                String::new()
            }
        };

        let bitmap = match page.render_with_config(&render_config) {
            Ok(bitmap) => bitmap,
            Err(e) => {
                warn!("Page {}: rasterisation failed: {:?}", page_num, e);
                results.push(Err(PageError::RenderFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                }));
                continue;
            }
        };

        let image = bitmap.as_image();
        let image_path = page_image_path(work_dir, page_num);
        if let Err(e) = image.save_with_format(&image_path, image::ImageFormat::Png) {
            results.push(Err(PageError::RenderFailed {
                page: page_num,
                detail: format!("could not save {}: {}", image_path.display(), e),
            }));
            continue;
        }

        debug!(
            "Rendered page {} → {}x{} px, {} chars of text",
            page_num,
            image.width(),
            image.height(),
            text.len()
        );

        results.push(Ok(RenderedPage {
            index: idx,
            image_path,
            width: image.width(),
            height: image.height(),
            text,
        }));
    }

    Ok(results)
}

/// Extract document metadata from a PDF without rendering pages.
pub async fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
    lib_path: Option<&Path>,
) -> Result<DocumentMetadata, Pdf2VideoError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());
    let lib = lib_path.map(Path::to_path_buf);

    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium(lib.as_deref())?;
        extract_metadata_blocking(&pdfium, &path, pwd.as_deref())
    })
    .await
    .map_err(|e| Pdf2VideoError::Internal(format!("Metadata task panicked: {}", e)))?
}

fn extract_metadata_blocking(
    pdfium: &Pdfium,
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, Pdf2VideoError> {
    let document = open_document(pdfium, pdf_path, password)?;
    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_image_naming() {
        assert_eq!(
            page_image_path(Path::new("output_pages"), 3),
            PathBuf::from("output_pages/page_3.png")
        );
    }

    #[test]
    fn platform_library_name_mentions_pdfium() {
        let name = platform_library_name();
        assert!(name.contains("pdfium"));
        assert!(name.ends_with(std::env::consts::DLL_SUFFIX));
    }

    #[test]
    fn binding_to_missing_library_fails_cleanly() {
        let result = bind_pdfium(Some(Path::new("/definitely/not/libpdfium.so")));
        assert!(matches!(
            result,
            Err(Pdf2VideoError::PdfiumBindingFailed(_))
        ));
    }
}
