//! # edgequake-pdf2video
//!
//! Turn a PDF into a narrated slideshow video: one slide per page, each page's
//! own text read aloud by a text-to-speech voice.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Render     rasterise pages + extract text via pdfium (spawn_blocking)
//!  ├─ 3. Normalize  clean the extracted text into a speakable script
//!  ├─ 4. Narrate    text-to-speech per page, with retry/backoff
//!  ├─ 5. Time       size each clip around its narration and fades
//!  ├─ 6. Encode     one ffmpeg segment per page
//!  └─ 7. Export     concatenate segments into the final MP4
//! ```
//!
//! Pages are processed in document order, one at a time. A page whose
//! narration fails is kept as a silent slide; a page whose clip cannot be
//! encoded is left out. See [`error`] for which failures are fatal.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2video::{convert, VideoConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Narration uses OPENAI_API_KEY; without it the video is silent.
//!     let config = VideoConfig::builder().voice("shimmer").build()?;
//!     let output = convert("book.pdf", &config).await?;
//!     println!("{}", output.video_path.display());
//!     eprintln!("{} pages, {:.1}s of video",
//!         output.stats.processed_pages,
//!         output.stats.video_secs);
//!     Ok(())
//! }
//! ```
//!
//! ## External Tools
//!
//! - **pdfium**: bound at runtime from `PDFIUM_LIB_PATH` or the system
//!   library path.
//! - **ffmpeg / ffprobe**: looked up on `PATH` unless set with
//!   [`VideoConfigBuilder::ffmpeg_path`] and [`VideoConfigBuilder::ffprobe_path`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2video` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2video = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageSelection, VideoConfig, VideoConfigBuilder};
pub use convert::{convert, convert_sync, convert_to_file, inspect, DEFAULT_VIDEO_NAME};
pub use error::{PageError, Pdf2VideoError};
pub use output::{DocumentMetadata, PageClip, VideoOutput, VideoStats};
pub use pipeline::normalize::normalize_narration;
pub use pipeline::speech::{OpenAiSpeech, SpeechError, SpeechSynthesizer};
pub use pipeline::timing::{fade_duration, ClipTiming, NarrationPlacement};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
