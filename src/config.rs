//! Configuration types for PDF-to-video conversion.
//!
//! All pipeline behaviour is controlled through [`VideoConfig`], built via its
//! [`VideoConfigBuilder`]. Setters clamp obviously out-of-range values;
//! [`VideoConfigBuilder::build`] rejects the ones that cannot be clamped
//! into something meaningful (a non-finite duration, for example).

use crate::error::Pdf2VideoError;
use crate::pipeline::speech::SpeechSynthesizer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default OpenAI speech endpoint.
pub const DEFAULT_TTS_ENDPOINT: &str = "https://api.openai.com/v1/audio/speech";

/// Configuration for a PDF-to-video conversion.
///
/// Built via [`VideoConfig::builder()`] or using [`VideoConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2video::VideoConfig;
///
/// let config = VideoConfig::builder()
///     .page_duration_secs(5.0)
///     .transition_secs(0.5)
///     .video_width(1920)
///     .voice("nova")
///     .build()
///     .unwrap();
/// assert_eq!(config.video_width, 1920);
/// ```
#[derive(Clone)]
pub struct VideoConfig {
    /// Minimum on-screen time per page in seconds. Default: 4.0.
    ///
    /// A page with long narration is held longer than this; a silent page is
    /// held exactly this long.
    pub page_duration_secs: f64,

    /// Length of the fade-in and of the fade-out in seconds. Default: 1.0.
    ///
    /// Narration never overlaps a fade: the clip is always at least
    /// `narration + 2 * transition` long.
    pub transition_secs: f64,

    /// Output frame width in pixels. Default: 1280.
    ///
    /// Height follows the page aspect ratio, rounded up to an even number
    /// because yuv420p cannot encode odd dimensions.
    pub video_width: u32,

    /// Output frame rate. Default: 24.
    pub fps: u32,

    /// ffmpeg video encoder. Default: `libx264`.
    pub video_codec: String,

    /// ffmpeg audio encoder. Default: `aac`.
    pub audio_codec: String,

    /// Audio sample rate shared by every segment. Default: 44100.
    pub audio_sample_rate: u32,

    /// Synthesise narration from page text. Default: true.
    pub narration: bool,

    /// Speech model identifier. Default: `gpt-4o-mini-tts`.
    pub tts_model: String,

    /// Speech voice. Default: `shimmer`.
    pub tts_voice: String,

    /// Speaking-style instructions. `None` uses
    /// [`crate::prompts::DEFAULT_NARRATION_INSTRUCTIONS`].
    pub tts_instructions: Option<String>,

    /// Speech endpoint URL. Default: [`DEFAULT_TTS_ENDPOINT`].
    pub tts_endpoint: String,

    /// API key for the speech endpoint. `None` falls back to `OPENAI_API_KEY`.
    pub api_key: Option<String>,

    /// Pre-constructed synthesizer. Takes precedence over the endpoint settings.
    pub synthesizer: Option<Arc<dyn SpeechSynthesizer>>,

    /// Maximum retry attempts on a transient speech API failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    pub retry_backoff_ms: u64,

    /// Per speech request timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Per ffmpeg/ffprobe invocation timeout in seconds. Default: 600.
    pub encode_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Directory for page images, narration audio and clip segments.
    /// Default: `output_pages`.
    pub work_dir: PathBuf,

    /// Keep narration audio and per-page clip segments after export. Default: false.
    pub keep_intermediates: bool,

    /// ffmpeg executable. Default: `ffmpeg`.
    pub ffmpeg_path: PathBuf,

    /// ffprobe executable. Default: `ffprobe`.
    pub ffprobe_path: PathBuf,

    /// Explicit pdfium library path. `None` falls back to `PDFIUM_LIB_PATH`,
    /// then to the system library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            page_duration_secs: 4.0,
            transition_secs: 1.0,
            video_width: 1280,
            fps: 24,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            audio_sample_rate: 44_100,
            narration: true,
            tts_model: "gpt-4o-mini-tts".to_string(),
            tts_voice: "shimmer".to_string(),
            tts_instructions: None,
            tts_endpoint: DEFAULT_TTS_ENDPOINT.to_string(),
            api_key: None,
            synthesizer: None,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            encode_timeout_secs: 600,
            password: None,
            pages: PageSelection::default(),
            work_dir: PathBuf::from("output_pages"),
            keep_intermediates: false,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            pdfium_lib_path: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for VideoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoConfig")
            .field("page_duration_secs", &self.page_duration_secs)
            .field("transition_secs", &self.transition_secs)
            .field("video_width", &self.video_width)
            .field("fps", &self.fps)
            .field("video_codec", &self.video_codec)
            .field("audio_codec", &self.audio_codec)
            .field("narration", &self.narration)
            .field("tts_model", &self.tts_model)
            .field("tts_voice", &self.tts_voice)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field(
                "synthesizer",
                &self.synthesizer.as_ref().map(|_| "<dyn SpeechSynthesizer>"),
            )
            .field("max_retries", &self.max_retries)
            .field("pages", &self.pages)
            .field("work_dir", &self.work_dir)
            .field("keep_intermediates", &self.keep_intermediates)
            .finish()
    }
}

impl VideoConfig {
    /// Create a new builder for `VideoConfig`.
    pub fn builder() -> VideoConfigBuilder {
        VideoConfigBuilder {
            config: Self::default(),
        }
    }

    /// API key from the config, else from `OPENAI_API_KEY`. Empty keys count as absent.
    pub fn resolve_api_key(&self) -> Option<String> {
        pick_api_key(self.api_key.as_deref(), std::env::var("OPENAI_API_KEY").ok())
    }
}

fn pick_api_key(explicit: Option<&str>, from_env: Option<String>) -> Option<String> {
    let usable = |k: &str| !k.trim().is_empty();
    explicit
        .filter(|k| usable(k))
        .map(str::to_string)
        .or_else(|| from_env.filter(|k| usable(k)))
}

/// Builder for [`VideoConfig`].
#[derive(Debug)]
pub struct VideoConfigBuilder {
    config: VideoConfig,
}

impl VideoConfigBuilder {
    pub fn page_duration_secs(mut self, secs: f64) -> Self {
        self.config.page_duration_secs = secs;
        self
    }

    pub fn transition_secs(mut self, secs: f64) -> Self {
        self.config.transition_secs = secs;
        self
    }

    pub fn video_width(mut self, width: u32) -> Self {
        self.config.video_width = width.clamp(64, 7680);
        self
    }

    pub fn fps(mut self, fps: u32) -> Self {
        self.config.fps = fps.clamp(1, 120);
        self
    }

    pub fn video_codec(mut self, codec: impl Into<String>) -> Self {
        self.config.video_codec = codec.into();
        self
    }

    pub fn audio_codec(mut self, codec: impl Into<String>) -> Self {
        self.config.audio_codec = codec.into();
        self
    }

    pub fn audio_sample_rate(mut self, hz: u32) -> Self {
        self.config.audio_sample_rate = hz;
        self
    }

    pub fn narration(mut self, enabled: bool) -> Self {
        self.config.narration = enabled;
        self
    }

    pub fn tts_model(mut self, model: impl Into<String>) -> Self {
        self.config.tts_model = model.into();
        self
    }

    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.config.tts_voice = voice.into();
        self
    }

    pub fn tts_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.config.tts_instructions = Some(instructions.into());
        self
    }

    pub fn tts_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.tts_endpoint = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.config.synthesizer = Some(synthesizer);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn encode_timeout_secs(mut self, secs: u64) -> Self {
        self.config.encode_timeout_secs = secs.max(1);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = dir.into();
        self
    }

    pub fn keep_intermediates(mut self, v: bool) -> Self {
        self.config.keep_intermediates = v;
        self
    }

    pub fn ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ffmpeg_path = path.into();
        self
    }

    pub fn ffprobe_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ffprobe_path = path.into();
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<VideoConfig, Pdf2VideoError> {
        let c = &self.config;
        if !c.page_duration_secs.is_finite() || c.page_duration_secs <= 0.0 {
            return Err(Pdf2VideoError::InvalidConfig(format!(
                "Page duration must be a positive number of seconds, got {}",
                c.page_duration_secs
            )));
        }
        if !c.transition_secs.is_finite() || c.transition_secs < 0.0 {
            return Err(Pdf2VideoError::InvalidConfig(format!(
                "Transition must be zero or more seconds, got {}",
                c.transition_secs
            )));
        }
        if c.audio_sample_rate < 8_000 {
            return Err(Pdf2VideoError::InvalidConfig(format!(
                "Audio sample rate must be ≥ 8000 Hz, got {}",
                c.audio_sample_rate
            )));
        }
        if c.tts_model.trim().is_empty() || c.tts_voice.trim().is_empty() {
            return Err(Pdf2VideoError::InvalidConfig(
                "Speech model and voice must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF become slides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Every page (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// The first requested page, for error reporting when nothing matched.
    pub fn first_requested(&self) -> usize {
        match self {
            PageSelection::All => 1,
            PageSelection::Single(p) => *p,
            PageSelection::Range(start, _) => *start,
            PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(0),
        }
    }
}
