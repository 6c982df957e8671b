//! Conversion entry points.
//!
//! Pages are processed strictly one after another in document order: render
//! all selected pages, then for each page clean its text, synthesize and
//! measure narration, size the clip and encode it. The finished clips are
//! joined into one video at the end.
//!
//! Per-page problems never abort the run. A failed narration makes the page
//! silent; a failed clip drops the page. Only input errors, a missing
//! toolchain, "no clip at all" and a failed final export are fatal.

use crate::config::VideoConfig;
use crate::error::{PageError, Pdf2VideoError};
use crate::output::{DocumentMetadata, PageClip, VideoOutput, VideoStats};
use crate::pipeline::input;
use crate::pipeline::media::{self, Canvas, ClipSpec};
use crate::pipeline::normalize::normalize_narration;
use crate::pipeline::render::{self, RenderedPage};
use crate::pipeline::speech::{self, OpenAiSpeech, SpeechSynthesizer};
use crate::pipeline::timing::{fade_duration, ClipTiming, NarrationPlacement};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// File name of the exported video when no output path is given.
pub const DEFAULT_VIDEO_NAME: &str = "book_presentation.mp4";

/// Convert a PDF file or URL into a narrated slideshow video.
///
/// The video is written to `work_dir/book_presentation.mp4`; use
/// [`convert_to_file`] to choose the destination.
///
/// # Returns
/// `Ok(VideoOutput)` once the video exists, even if some pages were dropped
/// (check `output.stats.failed_pages`).
///
/// # Errors
/// Returns `Err(Pdf2VideoError)` only for fatal errors:
/// - File not found, not a PDF, wrong password
/// - pdfium, `ffmpeg` or `ffprobe` unavailable
/// - No page produced a clip
/// - The final export failed
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &VideoConfig,
) -> Result<VideoOutput, Pdf2VideoError> {
    let output_path = config.work_dir.join(DEFAULT_VIDEO_NAME);
    convert_to_file(input_str, output_path, config).await
}

/// Convert a PDF and write the video to `output_path`.
///
/// The file appears atomically: it is exported under a temporary name and
/// renamed once complete.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &VideoConfig,
) -> Result<VideoOutput, Pdf2VideoError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    let output_path = output_path.as_ref();
    info!("Starting conversion: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_path = resolved.path().to_path_buf();

    // ── Step 2: Check the media toolchain ────────────────────────────────
    media::check_tools(config).await?;

    // ── Step 3: Extract metadata ─────────────────────────────────────────
    let metadata = render::extract_metadata(
        &pdf_path,
        config.password.as_deref(),
        config.pdfium_lib_path.as_deref(),
    )
    .await?;
    let total_pages = metadata.page_count;
    info!("PDF has {} pages", total_pages);

    // ── Step 4: Compute page indices ─────────────────────────────────────
    let page_indices = config.pages.to_indices(total_pages);
    if page_indices.is_empty() {
        return Err(Pdf2VideoError::PageOutOfRange {
            page: config.pages.first_requested(),
            total: total_pages,
        });
    }
    debug!("Selected {} pages for conversion", page_indices.len());

    // ── Step 5: Narration backend ────────────────────────────────────────
    let synthesizer = resolve_synthesizer(config)?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(page_indices.len());
    }

    // ── Step 6: Rasterise pages and extract text ─────────────────────────
    let render_start = Instant::now();
    let rendered = render::render_pages(&pdf_path, config, &page_indices).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!(
        "Rendered {} pages in {}ms",
        rendered.iter().filter(|r| r.is_ok()).count(),
        render_duration_ms
    );

    let sizes: Vec<(u32, u32)> = rendered
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|p| (p.width, p.height))
        .collect();
    let canvas = Canvas::fit(config.video_width, &sizes);
    debug!("Video canvas: {}x{}", canvas.width, canvas.height);

    // ── Step 7: Narrate and encode each page ─────────────────────────────
    let mut stats = VideoStats {
        total_pages,
        render_duration_ms,
        ..Default::default()
    };
    let selected = page_indices.len();
    let mut pages: Vec<PageClip> = Vec::with_capacity(selected);
    let mut clip_paths: Vec<PathBuf> = Vec::with_capacity(selected);
    let mut scratch: Vec<PathBuf> = Vec::new();

    for result in rendered {
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_error(e.page(), selected, &e.to_string());
                }
                pages.push(dropped_page(config, e));
                continue;
            }
        };

        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page.page_num(), selected);
        }

        let clip = process_page(
            &page,
            synthesizer.as_ref(),
            canvas,
            config,
            &mut stats,
            &mut scratch,
        )
        .await;

        match &clip.error {
            None => {
                clip_paths.push(clip_path(&config.work_dir, clip.page_num));
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_complete(clip.page_num, selected, clip.clip_secs);
                }
            }
            Some(e) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_error(clip.page_num, selected, &e.to_string());
                }
            }
        }
        pages.push(clip);
    }

    if clip_paths.is_empty() {
        let first_error = pages
            .iter()
            .find_map(|p| p.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        cleanup(&scratch, config).await;
        return Err(Pdf2VideoError::AllPagesFailed {
            total: selected,
            first_error,
        });
    }

    // ── Step 8: Join clips ───────────────────────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_export_start(clip_paths.len());
    }
    let export_start = Instant::now();
    let exported = media::concat_clips(&clip_paths, output_path, config).await;
    stats.encode_duration_ms += export_start.elapsed().as_millis() as u64;

    // ── Step 9: Cleanup ──────────────────────────────────────────────────
    cleanup(&scratch, config).await;
    exported?;

    // ── Step 10: Stats ───────────────────────────────────────────────────
    stats.tally(&pages);
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Conversion complete: {}/{} pages, {:.1}s of video, {}ms total",
        stats.processed_pages, selected, stats.video_secs, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(selected, stats.processed_pages);
    }

    Ok(VideoOutput {
        video_path: output_path.to_path_buf(),
        pages,
        metadata,
        stats,
    })
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &VideoConfig,
) -> Result<VideoOutput, Pdf2VideoError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2VideoError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Extract PDF metadata without rendering or encoding anything.
///
/// Needs pdfium but neither ffmpeg nor an API key.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &VideoConfig,
) -> Result<DocumentMetadata, Pdf2VideoError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    render::extract_metadata(
        resolved.path(),
        config.password.as_deref(),
        config.pdfium_lib_path.as_deref(),
    )
    .await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Pick the narration backend.
///
/// 1. Narration disabled → none.
/// 2. A synthesizer injected through the config.
/// 3. An OpenAI client, when an API key is configured or in `OPENAI_API_KEY`.
/// 4. Otherwise none, with a single warning: the video is produced silent.
fn resolve_synthesizer(
    config: &VideoConfig,
) -> Result<Option<Arc<dyn SpeechSynthesizer>>, Pdf2VideoError> {
    if !config.narration {
        info!("Narration disabled; all pages will be silent");
        return Ok(None);
    }

    if let Some(ref synth) = config.synthesizer {
        return Ok(Some(Arc::clone(synth)));
    }

    match config.resolve_api_key() {
        Some(key) => {
            let client = OpenAiSpeech::from_config(config, key)
                .map_err(|e| Pdf2VideoError::Internal(format!("speech client: {e}")))?;
            Ok(Some(Arc::new(client)))
        }
        None => {
            warn!("OPENAI_API_KEY is not set; producing a video without narration");
            Ok(None)
        }
    }
}

fn audio_path(work_dir: &Path, page_num: usize) -> PathBuf {
    work_dir.join(format!("page_{page_num}_audio.mp3"))
}

fn clip_path(work_dir: &Path, page_num: usize) -> PathBuf {
    work_dir.join(format!("page_{page_num}_clip.mp4"))
}

/// Narrate, time and encode one rendered page.
async fn process_page(
    page: &RenderedPage,
    synthesizer: Option<&Arc<dyn SpeechSynthesizer>>,
    canvas: Canvas,
    config: &VideoConfig,
    stats: &mut VideoStats,
    scratch: &mut Vec<PathBuf>,
) -> PageClip {
    let page_num = page.page_num();
    let text = normalize_narration(&page.text);

    let narration_start = Instant::now();
    let (narration, narration_error) = match synthesizer {
        Some(synth) if !text.is_empty() => {
            let path = audio_path(&config.work_dir, page_num);
            match narrate(synth, page_num, &text, &path, config).await {
                Ok(secs) => {
                    scratch.push(path.clone());
                    (Some((path, secs)), None)
                }
                Err(e) => {
                    warn!("Page {}: narration skipped: {}", page_num, e);
                    if path.exists() {
                        scratch.push(path);
                    }
                    (None, Some(e))
                }
            }
        }
        Some(_) => {
            debug!("Page {}: no text, silent clip", page_num);
            (None, None)
        }
        None => (None, None),
    };
    stats.narration_duration_ms += narration_start.elapsed().as_millis() as u64;

    let narration_secs = narration.as_ref().map_or(0.0, |(_, secs)| *secs);
    let timing = ClipTiming::reconcile(
        config.page_duration_secs,
        config.transition_secs,
        narration_secs,
    );
    let fade_secs = fade_duration(timing.target_secs, config.transition_secs);
    debug!(
        "Page {}: narration {:.2}s → clip {:.2}s ({:?})",
        page_num, narration_secs, timing.target_secs, timing.placement
    );

    let output = clip_path(&config.work_dir, page_num);
    let spec = ClipSpec {
        image: &page.image_path,
        image_size: (page.width, page.height),
        narration: narration.as_ref().map(|(path, _)| path.as_path()),
        timing,
        fade_secs,
        canvas,
        output: &output,
    };

    let encode_start = Instant::now();
    let encoded = media::build_clip(&spec, config).await;
    stats.encode_duration_ms += encode_start.elapsed().as_millis() as u64;
    scratch.push(output.clone());

    let error = encoded.err().map(|e| {
        warn!("Page {}: clip failed: {}", page_num, e);
        PageError::ClipFailed {
            page: page_num,
            detail: e.to_string(),
        }
    });

    PageClip {
        page_num,
        image_path: page.image_path.clone(),
        narration_text: text,
        narration_secs,
        clip_secs: timing.target_secs,
        placement: timing.placement,
        fade_secs,
        narration_error,
        error,
    }
}

/// Synthesize narration for a page and measure it.
async fn narrate(
    synth: &Arc<dyn SpeechSynthesizer>,
    page_num: usize,
    text: &str,
    path: &Path,
    config: &VideoConfig,
) -> Result<f64, String> {
    speech::narrate_page(synth, page_num, text, path, config)
        .await
        .map_err(|e| e.to_string())?;
    let secs = media::probe_duration(path, config)
        .await
        .map_err(|e| e.to_string())?;
    if secs <= 0.0 {
        return Err("narration audio has zero length".to_string());
    }
    Ok(secs)
}

/// Result entry for a page that never got rendered.
fn dropped_page(config: &VideoConfig, error: PageError) -> PageClip {
    let page_num = error.page();
    PageClip {
        page_num,
        image_path: render::page_image_path(&config.work_dir, page_num),
        narration_text: String::new(),
        narration_secs: 0.0,
        clip_secs: 0.0,
        placement: NarrationPlacement::Silent,
        fade_secs: None,
        narration_error: None,
        error: Some(error),
    }
}

/// Remove narration audio and clip segments unless asked to keep them.
async fn cleanup(scratch: &[PathBuf], config: &VideoConfig) {
    if config.keep_intermediates {
        debug!("Keeping {} intermediate files", scratch.len());
        return;
    }
    for path in scratch {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::speech::SpeechError;
    use async_trait::async_trait;

    struct SilentSynth;

    #[async_trait]
    impl SpeechSynthesizer for SilentSynth {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, SpeechError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn intermediate_names() {
        let dir = Path::new("output_pages");
        assert_eq!(
            audio_path(dir, 2),
            PathBuf::from("output_pages/page_2_audio.mp3")
        );
        assert_eq!(
            clip_path(dir, 2),
            PathBuf::from("output_pages/page_2_clip.mp4")
        );
    }

    #[test]
    fn narration_disabled_has_no_synthesizer() {
        let config = VideoConfig::builder()
            .narration(false)
            .api_key("sk-test")
            .build()
            .unwrap();
        assert!(resolve_synthesizer(&config).unwrap().is_none());
    }

    #[test]
    fn injected_synthesizer_wins() {
        let synth: Arc<dyn SpeechSynthesizer> = Arc::new(SilentSynth);
        let config = VideoConfig::builder()
            .synthesizer(Arc::clone(&synth))
            .build()
            .unwrap();
        let resolved = resolve_synthesizer(&config).unwrap().unwrap();
        assert!(Arc::ptr_eq(&resolved, &synth));
    }

    #[test]
    fn explicit_key_builds_openai_client() {
        let config = VideoConfig::builder().api_key("sk-test").build().unwrap();
        assert!(resolve_synthesizer(&config).unwrap().is_some());
    }

    #[test]
    fn dropped_page_is_silent_and_failed() {
        let config = VideoConfig::default();
        let clip = dropped_page(
            &config,
            PageError::RenderFailed {
                page: 4,
                detail: "bad".into(),
            },
        );
        assert_eq!(clip.page_num, 4);
        assert!(!clip.is_ok());
        assert!(!clip.is_narrated());
        assert_eq!(clip.placement, NarrationPlacement::Silent);
    }

    #[tokio::test]
    async fn cleanup_removes_scratch_unless_kept() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("page_1_audio.mp3");
        let b = dir.path().join("page_1_clip.mp4");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();
        let missing = dir.path().join("gone.mp4");
        let scratch = vec![a.clone(), b.clone(), missing];

        let keep = VideoConfig::builder().keep_intermediates(true).build().unwrap();
        cleanup(&scratch, &keep).await;
        assert!(a.exists() && b.exists());

        cleanup(&scratch, &VideoConfig::default()).await;
        assert!(!a.exists() && !b.exists());
    }

    #[tokio::test]
    async fn missing_input_is_fatal() {
        let err = convert("/no/such/book.pdf", &VideoConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2VideoError::FileNotFound { .. }));
    }

    struct CountingSynth {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl SpeechSynthesizer for CountingSynth {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, SpeechError> {
            self.calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(b"audio".to_vec())
        }
    }

    #[tokio::test]
    async fn missing_toolchain_is_fatal_before_narration() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("deck.pdf");
        std::fs::write(&pdf, b"%PDF-1.4\n").unwrap();

        let synth = Arc::new(CountingSynth {
            calls: Default::default(),
        });
        let config = VideoConfig::builder()
            .synthesizer(synth.clone())
            .ffmpeg_path("/definitely/not/ffmpeg")
            .ffprobe_path("/definitely/not/ffprobe")
            .work_dir(dir.path().join("work"))
            .build()
            .unwrap();

        let err = convert(pdf.to_str().unwrap(), &config).await.unwrap_err();
        assert!(matches!(err, Pdf2VideoError::ToolMissing { .. }));
        assert_eq!(synth.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
