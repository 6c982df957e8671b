//! CLI binary for edgequake-pdf2video.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `VideoConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2video::{
    convert, convert_to_file, inspect, ConversionProgressCallback, PageSelection, ProgressCallback,
    VideoConfig, VideoOutput,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose bar length is set by `on_conversion_start`.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(&page_num)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Building a video from {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert(page_num, Instant::now());
        self.bar.set_prefix("Narrating");
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, clip_secs: f64) {
        let elapsed = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{clip_secs:>5.1}s clip")),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let elapsed = self.elapsed_secs(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            let head: String = error.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_export_start(&self, clip_count: usize) {
        self.bar.set_prefix("Exporting");
        self.bar.set_message(format!("joining {clip_count} clips"));
    }

    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages in the video",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages in the video  ({} dropped)",
                cyan("⚠"),
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion (writes output_pages/book_presentation.mp4)
  pdf2video book.pdf

  # Choose the output file
  pdf2video book.pdf -o book.mp4

  # A few pages, longer slides, softer transitions
  pdf2video --pages 1-5 --page-duration 6 --transition 0.5 book.pdf

  # Another voice and narration style
  pdf2video --voice nova --instructions calm.txt book.pdf

  # Slideshow without narration (no API key needed)
  pdf2video --no-narration book.pdf

  # Convert from URL
  pdf2video https://arxiv.org/pdf/1706.03762 -o attention.mp4

  # Inspect PDF metadata
  pdf2video --inspect-only book.pdf

  # JSON report of every page
  pdf2video --json book.pdf > report.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key used for narration
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Override log filtering (e.g. edgequake_pdf2video=debug)

REQUIREMENTS:
  ffmpeg and ffprobe on PATH (or --ffmpeg / --ffprobe), and a pdfium library.
  Without OPENAI_API_KEY the video is produced without narration.
"#;

/// Turn a PDF into a narrated slideshow video.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2video",
    version,
    about = "Turn a PDF into a narrated slideshow video",
    long_about = "Render every page of a PDF as a slide, read the page's own text aloud with \
a text-to-speech voice, and join the slides into one MP4 with fade transitions.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the video here instead of <work-dir>/book_presentation.mp4.
    #[arg(short, long, env = "PDF2VIDEO_OUTPUT")]
    output: Option<PathBuf>,

    /// Directory for page images and intermediate files.
    #[arg(long, env = "PDF2VIDEO_WORK_DIR", default_value = "output_pages")]
    work_dir: PathBuf,

    /// Minimum seconds each page stays on screen.
    #[arg(long, env = "PDF2VIDEO_PAGE_DURATION", default_value_t = 4.0)]
    page_duration: f64,

    /// Fade-in/fade-out length in seconds.
    #[arg(long, env = "PDF2VIDEO_TRANSITION", default_value_t = 1.0)]
    transition: f64,

    /// Video width in pixels; height follows the page aspect ratio.
    #[arg(long, env = "PDF2VIDEO_WIDTH", default_value_t = 1280,
          value_parser = clap::value_parser!(u32).range(64..=7680))]
    width: u32,

    /// Frames per second.
    #[arg(long, env = "PDF2VIDEO_FPS", default_value_t = 24,
          value_parser = clap::value_parser!(u32).range(1..=120))]
    fps: u32,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2VIDEO_PAGES", default_value = "all")]
    pages: String,

    /// TTS voice (alloy, nova, shimmer, …).
    #[arg(long, env = "PDF2VIDEO_VOICE", default_value = "shimmer")]
    voice: String,

    /// TTS model.
    #[arg(long, env = "PDF2VIDEO_TTS_MODEL", default_value = "gpt-4o-mini-tts")]
    tts_model: String,

    /// Path to a text file with custom narration style instructions.
    #[arg(long, env = "PDF2VIDEO_INSTRUCTIONS")]
    instructions: Option<PathBuf>,

    /// Produce a silent slideshow.
    #[arg(long, env = "PDF2VIDEO_NO_NARRATION")]
    no_narration: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2VIDEO_PASSWORD")]
    password: Option<String>,

    /// Keep narration audio and per-page clips after export.
    #[arg(long, env = "PDF2VIDEO_KEEP_INTERMEDIATES")]
    keep_intermediates: bool,

    /// Retries per page on TTS failure.
    #[arg(long, env = "PDF2VIDEO_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-request TTS timeout in seconds.
    #[arg(long, env = "PDF2VIDEO_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Per-invocation ffmpeg/ffprobe timeout in seconds.
    #[arg(long, env = "PDF2VIDEO_ENCODE_TIMEOUT", default_value_t = 600)]
    encode_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2VIDEO_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// ffmpeg executable.
    #[arg(long, env = "PDF2VIDEO_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// ffprobe executable.
    #[arg(long, env = "PDF2VIDEO_FFPROBE", default_value = "ffprobe")]
    ffprobe: PathBuf,

    /// Output a structured JSON report (VideoOutput) on stdout.
    #[arg(long, env = "PDF2VIDEO_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2VIDEO_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2VIDEO_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2VIDEO_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs when it is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let output = match cli.output {
        Some(ref path) => convert_to_file(&cli.input, path, &config).await,
        None => convert(&cli.input, &config).await,
    }
    .context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&output, show_progress);
    }

    Ok(())
}

fn print_summary(output: &VideoOutput, show_progress: bool) {
    let stats = &output.stats;
    let selected = stats.processed_pages + stats.failed_pages;

    if !show_progress && stats.failed_pages > 0 {
        for page in output.pages.iter().filter(|p| !p.is_ok()) {
            if let Some(ref e) = page.error {
                eprintln!("  {} {}", red("✗"), e);
            }
        }
    }

    for page in output.pages.iter().filter(|p| p.narration_error.is_some()) {
        eprintln!(
            "  {} Page {} is silent: {}",
            cyan("⚠"),
            page.page_num,
            page.narration_error.as_deref().unwrap_or_default()
        );
    }

    eprintln!(
        "{}  {}/{} pages  {} narrated  {:.1}s video  {}ms  →  {}",
        if stats.failed_pages == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        stats.processed_pages,
        selected,
        stats.narrated_pages,
        stats.video_secs,
        stats.total_duration_ms,
        bold(&output.video_path.display().to_string()),
    );
    eprintln!(
        "   {}",
        dim(&format!(
            "render {}ms  /  narration {}ms  /  encode {}ms",
            stats.render_duration_ms, stats.narration_duration_ms, stats.encode_duration_ms
        ))
    );
}

/// Map CLI args to `VideoConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<VideoConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut builder = VideoConfig::builder()
        .page_duration_secs(cli.page_duration)
        .transition_secs(cli.transition)
        .video_width(cli.width)
        .fps(cli.fps)
        .pages(pages)
        .narration(!cli.no_narration)
        .voice(cli.voice.clone())
        .tts_model(cli.tts_model.clone())
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .encode_timeout_secs(cli.encode_timeout)
        .download_timeout_secs(cli.download_timeout)
        .work_dir(cli.work_dir.clone())
        .keep_intermediates(cli.keep_intermediates)
        .ffmpeg_path(cli.ffmpeg.clone())
        .ffprobe_path(cli.ffprobe.clone());

    if let Some(ref path) = cli.instructions {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read narration instructions from {:?}", path))?;
        builder = builder.tts_instructions(text);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}
