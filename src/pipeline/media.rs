//! Media encoding: page image + narration → clip segment → final video.
//!
//! All audio/video work is delegated to the `ffmpeg` and `ffprobe` command
//! line tools, run through `tokio::process` with a timeout.
//!
//! ## Segment uniformity
//!
//! Every page clip is encoded with the same canvas size, frame rate, pixel
//! format, codecs, sample rate and channel layout. That lets the final step
//! join segments with the concat demuxer in stream-copy mode instead of
//! re-encoding the whole video. Pages with a different aspect ratio are
//! scaled to the configured width and centred on a black canvas whose height
//! is the tallest page's height.

use crate::config::VideoConfig;
use crate::error::Pdf2VideoError;
use crate::pipeline::timing::{ClipTiming, NarrationPlacement};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Output frame size shared by every clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    /// Smallest canvas holding every page at `width`.
    pub fn fit(width: u32, page_sizes: &[(u32, u32)]) -> Self {
        let height = page_sizes
            .iter()
            .map(|&(w, h)| frame_height(width, w, h))
            .max()
            .unwrap_or_else(|| even(width * 3 / 4));
        Self { width, height }
    }
}

/// Everything needed to encode one page clip.
#[derive(Debug, Clone)]
pub struct ClipSpec<'a> {
    pub image: &'a Path,
    /// Rendered image size in pixels.
    pub image_size: (u32, u32),
    pub narration: Option<&'a Path>,
    pub timing: ClipTiming,
    pub fade_secs: Option<f64>,
    pub canvas: Canvas,
    pub output: &'a Path,
}

/// Frame height for a page scaled to `width`, rounded up to an even number.
pub fn frame_height(width: u32, image_width: u32, image_height: u32) -> u32 {
    if image_width == 0 {
        return even(width);
    }
    let height = (width as u64 * image_height as u64 / image_width as u64) as u32;
    even(height.max(2))
}

fn even(n: u32) -> u32 {
    n + (n % 2)
}

fn secs(value: f64) -> String {
    format!("{:.3}", value)
}

// ── Toolchain ────────────────────────────────────────────────────────────────

/// Confirm `ffmpeg` and `ffprobe` can be launched.
///
/// Runs `<tool> -version` for both; a tool that cannot be started yields
/// [`Pdf2VideoError::ToolMissing`].
pub async fn check_tools(config: &VideoConfig) -> Result<(), Pdf2VideoError> {
    let args = ["-version".to_string()];
    for program in [&config.ffmpeg_path, &config.ffprobe_path] {
        run_tool(program, &args, config.encode_timeout_secs).await?;
        debug!("Found {}", program.display());
    }
    Ok(())
}

// ── ffprobe ──────────────────────────────────────────────────────────────────

/// Measure the duration of an audio file in seconds.
pub async fn probe_duration(path: &Path, config: &VideoConfig) -> Result<f64, Pdf2VideoError> {
    let args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-show_entries".to_string(),
        "format=duration".to_string(),
        "-of".to_string(),
        "default=noprint_wrappers=1:nokey=1".to_string(),
        path.to_string_lossy().to_string(),
    ];
    let output = run_tool(&config.ffprobe_path, &args, config.encode_timeout_secs).await?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    parse_duration(&stdout).ok_or_else(|| Pdf2VideoError::MediaToolFailed {
        tool: "ffprobe".to_string(),
        stderr: format!(
            "could not read duration of '{}' (got {:?})",
            path.display(),
            stdout.trim()
        ),
    })
}

/// Parse ffprobe's `format=duration` output.
pub fn parse_duration(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .and_then(|l| l.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
}

// ── Clip encoding ────────────────────────────────────────────────────────────

/// Build the `-filter_complex` graph for one clip.
///
/// Input 0 is the looped page image, input 1 is either the narration file or
/// an `anullsrc` silence source.
pub fn clip_filter(spec: &ClipSpec<'_>, config: &VideoConfig) -> String {
    let target = spec.timing.target_secs;
    let (img_w, img_h) = spec.image_size;
    let scaled_h = frame_height(spec.canvas.width, img_w, img_h).min(spec.canvas.height);

    let mut video = format!(
        "[0:v]scale={w}:{h},pad={cw}:{ch}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1,format=yuv420p",
        w = spec.canvas.width,
        h = scaled_h,
        cw = spec.canvas.width,
        ch = spec.canvas.height,
    );
    if let Some(fade) = spec.fade_secs {
        video.push_str(&format!(
            ",fade=t=in:st=0:d={d},fade=t=out:st={out}:d={d}",
            d = secs(fade),
            out = secs(target - fade),
        ));
    }
    video.push_str("[v]");

    let base = format!(
        "[1:a]aresample={sr},aformat=sample_fmts=fltp:channel_layouts=stereo",
        sr = config.audio_sample_rate
    );
    let audio = match (spec.narration, spec.timing.placement) {
        (Some(_), NarrationPlacement::Centered { offset_secs }) => {
            let ms = (offset_secs * 1000.0).round() as u64;
            format!(
                "{base},adelay={ms}|{ms},apad,atrim=0:{t},asetpts=N/SR/TB[a]",
                t = secs(target)
            )
        }
        (Some(_), NarrationPlacement::FullSpan | NarrationPlacement::Truncated) => {
            format!("{base},apad,atrim=0:{t},asetpts=N/SR/TB[a]", t = secs(target))
        }
        _ => format!("{base},atrim=0:{t}[a]", t = secs(target)),
    };

    format!("{video};{audio}")
}

/// Full ffmpeg argument list for one clip.
pub fn clip_args(spec: &ClipSpec<'_>, config: &VideoConfig) -> Vec<String> {
    let target = secs(spec.timing.target_secs);
    let fps = config.fps.to_string();
    let mut args: Vec<String> = [
        "-y", "-hide_banner", "-loglevel", "error", "-loop", "1", "-framerate",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(fps.clone());
    args.extend(["-t".to_string(), target.clone(), "-i".to_string()]);
    args.push(spec.image.to_string_lossy().to_string());

    match (spec.narration, spec.timing.placement) {
        (Some(audio), placement) if placement != NarrationPlacement::Silent => {
            args.push("-i".to_string());
            args.push(audio.to_string_lossy().to_string());
        }
        _ => {
            args.extend(["-f", "lavfi", "-t"].iter().map(|s| s.to_string()));
            args.push(target.clone());
            args.push("-i".to_string());
            args.push(format!(
                "anullsrc=channel_layout=stereo:sample_rate={}",
                config.audio_sample_rate
            ));
        }
    }

    args.push("-filter_complex".to_string());
    args.push(clip_filter(spec, config));
    args.extend(
        ["-map", "[v]", "-map", "[a]", "-c:v"]
            .iter()
            .map(|s| s.to_string()),
    );
    args.push(config.video_codec.clone());
    args.extend(["-pix_fmt", "yuv420p", "-r"].iter().map(|s| s.to_string()));
    args.push(fps);
    args.push("-c:a".to_string());
    args.push(config.audio_codec.clone());
    args.push("-ar".to_string());
    args.push(config.audio_sample_rate.to_string());
    args.extend(["-ac", "2", "-t"].iter().map(|s| s.to_string()));
    args.push(target);
    args.push(spec.output.to_string_lossy().to_string());
    args
}

/// Encode one page clip.
pub async fn build_clip(spec: &ClipSpec<'_>, config: &VideoConfig) -> Result<(), Pdf2VideoError> {
    let args = clip_args(spec, config);
    debug!("ffmpeg {}", args.join(" "));
    run_tool(&config.ffmpeg_path, &args, config.encode_timeout_secs).await?;
    Ok(())
}

// ── Concatenation ────────────────────────────────────────────────────────────

/// Concat-demuxer list file contents for the given clips.
pub fn concat_list(clips: &[PathBuf]) -> String {
    clips
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', r"'\''")))
        .collect()
}

/// Join clip segments into `output`.
///
/// Writes to a sibling `.part` file and renames it into place, so a failed
/// export never leaves a truncated video behind.
pub async fn concat_clips(
    clips: &[PathBuf],
    output: &Path,
    config: &VideoConfig,
) -> Result<(), Pdf2VideoError> {
    let export_err = |detail: String| Pdf2VideoError::ExportFailed {
        path: output.to_path_buf(),
        detail,
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| export_err(e.to_string()))?;
    }

    // Absolute paths so the list does not depend on where it is written.
    let mut absolute = Vec::with_capacity(clips.len());
    for clip in clips {
        let abs = tokio::fs::canonicalize(clip)
            .await
            .map_err(|e| export_err(format!("{}: {e}", clip.display())))?;
        absolute.push(abs);
    }

    let list_path = config.work_dir.join("concat.txt");
    tokio::fs::write(&list_path, concat_list(&absolute))
        .await
        .map_err(|e| Pdf2VideoError::WriteFailed {
            path: list_path.clone(),
            source: e,
        })?;

    let part = part_path(output);
    let args: Vec<String> = vec![
        "-y".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        list_path.to_string_lossy().to_string(),
        "-c".into(),
        "copy".into(),
        "-movflags".into(),
        "+faststart".into(),
        "-f".into(),
        "mp4".into(),
        part.to_string_lossy().to_string(),
    ];

    let result = run_tool(&config.ffmpeg_path, &args, config.encode_timeout_secs).await;
    let _ = tokio::fs::remove_file(&list_path).await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(export_err(e.to_string()));
    }

    if let Err(e) = tokio::fs::rename(&part, output).await {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(export_err(e.to_string()));
    }

    info!("Video written to {}", output.display());
    Ok(())
}

fn part_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    output.with_file_name(name)
}

// ── Process plumbing ─────────────────────────────────────────────────────────

async fn run_tool(
    program: &Path,
    args: &[String],
    timeout_secs: u64,
) -> Result<Output, Pdf2VideoError> {
    let tool = program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.display().to_string());

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(Duration::from_secs(timeout_secs), child).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(Pdf2VideoError::ToolMissing {
                program: program.display().to_string(),
                source: e,
            })
        }
        Err(_) => {
            return Err(Pdf2VideoError::MediaToolTimeout {
                tool,
                secs: timeout_secs,
            })
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let filtered = filter_ffmpeg_stderr(&stderr);
        error!("{} failed: {}", tool, filtered);
        return Err(Pdf2VideoError::MediaToolFailed {
            tool,
            stderr: filtered,
        });
    }

    Ok(output)
}

/// Drop the banner and stream-description noise from ffmpeg stderr.
fn filter_ffmpeg_stderr(stderr: &str) -> String {
    const NOISE: [&str; 8] = [
        "ffmpeg version",
        "ffprobe version",
        "  built with",
        "  configuration:",
        "  lib",
        "Input #",
        "  Stream #",
        "  Metadata:",
    ];
    let kept: Vec<&str> = stderr
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter(|l| !NOISE.iter().any(|p| l.starts_with(p)))
        .collect();
    if kept.is_empty() {
        stderr.trim().to_string()
    } else {
        kept.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec<'a>(
        narration: Option<&'a Path>,
        timing: ClipTiming,
        fade_secs: Option<f64>,
        output: &'a Path,
    ) -> ClipSpec<'a> {
        ClipSpec {
            image: Path::new("page_1.png"),
            image_size: (1280, 720),
            narration,
            timing,
            fade_secs,
            canvas: Canvas {
                width: 1280,
                height: 720,
            },
            output,
        }
    }

    #[test]
    fn frame_height_rounds_up_to_even() {
        assert_eq!(frame_height(1280, 1000, 1414), 1810);
        assert_eq!(frame_height(1280, 612, 792), 1656);
        assert_eq!(frame_height(101, 100, 100), 102);
        assert_eq!(frame_height(1280, 0, 100), 1280);
    }

    #[test]
    fn canvas_uses_tallest_page() {
        let canvas = Canvas::fit(1280, &[(1280, 720), (1000, 1414)]);
        assert_eq!(canvas, Canvas { width: 1280, height: 1810 });
    }

    #[test]
    fn parse_ffprobe_duration() {
        assert_eq!(parse_duration("3.456000\n"), Some(3.456));
        assert_eq!(parse_duration("\n 12.5 \n"), Some(12.5));
        assert_eq!(parse_duration("N/A\n"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn centered_narration_filter() {
        let config = VideoConfig::default();
        let out = PathBuf::from("clip.mp4");
        let audio = PathBuf::from("page_1_audio.mp3");
        let timing = ClipTiming::reconcile(4.0, 1.0, 1.5);
        let s = spec(Some(&audio), timing, Some(1.0), &out);

        let filter = clip_filter(&s, &config);
        assert!(filter.contains("fade=t=in:st=0:d=1.000"));
        assert!(filter.contains("fade=t=out:st=3.000:d=1.000"));
        assert!(filter.contains("adelay=1250|1250"));
        assert!(filter.contains("atrim=0:4.000"));
    }

    #[test]
    fn silent_clip_uses_anullsrc() {
        let config = VideoConfig::default();
        let out = PathBuf::from("clip.mp4");
        let s = spec(None, ClipTiming::reconcile(4.0, 1.0, 0.0), None, &out);

        let args = clip_args(&s, &config);
        assert!(args.iter().any(|a| a.starts_with("anullsrc=")));
        let filter = clip_filter(&s, &config);
        assert!(!filter.contains("adelay"));
        assert!(!filter.contains("fade="));
        assert_eq!(args.last().map(String::as_str), Some("clip.mp4"));
    }

    #[test]
    fn truncated_narration_is_trimmed_not_delayed() {
        let config = VideoConfig::default();
        let out = PathBuf::from("clip.mp4");
        let audio = PathBuf::from("a.mp3");
        let s = spec(Some(&audio), ClipTiming::place(3.0, 5.0), None, &out);

        let filter = clip_filter(&s, &config);
        assert!(!filter.contains("adelay"));
        assert!(filter.contains("atrim=0:3.000"));
        assert!(clip_args(&s, &config).contains(&"a.mp3".to_string()));
    }

    #[test]
    fn clip_args_use_configured_codecs() {
        let config = VideoConfig::builder()
            .video_codec("libx265")
            .fps(30)
            .build()
            .unwrap();
        let out = PathBuf::from("clip.mp4");
        let s = spec(None, ClipTiming::reconcile(4.0, 1.0, 0.0), None, &out);
        let args = clip_args(&s, &config);
        let pos = args.iter().position(|a| a == "-c:v").unwrap();
        assert_eq!(args[pos + 1], "libx265");
        assert!(args.windows(2).any(|w| w[0] == "-r" && w[1] == "30"));
    }

    #[test]
    fn concat_list_escapes_quotes() {
        let list = concat_list(&[
            PathBuf::from("/tmp/a.mp4"),
            PathBuf::from("/tmp/it's.mp4"),
        ]);
        assert_eq!(list, "file '/tmp/a.mp4'\nfile '/tmp/it'\\''s.mp4'\n");
    }

    #[test]
    fn part_path_is_sibling() {
        assert_eq!(
            part_path(Path::new("out/video.mp4")),
            PathBuf::from("out/video.mp4.part")
        );
    }

    #[test]
    fn stderr_filter_drops_banner() {
        let stderr = "ffmpeg version 6.0\n  built with gcc\n  libavutil 58\n[png @ 0x1] Invalid PNG signature\n";
        assert_eq!(filter_ffmpeg_stderr(stderr), "[png @ 0x1] Invalid PNG signature");
    }

    #[tokio::test]
    async fn missing_tool_is_reported() {
        let err = run_tool(
            Path::new("/definitely/not/ffmpeg"),
            &["-version".to_string()],
            5,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Pdf2VideoError::ToolMissing { .. }));
    }

    #[tokio::test]
    async fn check_tools_reports_missing_tool() {
        let config = VideoConfig::builder()
            .ffmpeg_path("/definitely/not/ffmpeg")
            .ffprobe_path("/definitely/not/ffprobe")
            .build()
            .unwrap();
        match check_tools(&config).await {
            Err(Pdf2VideoError::ToolMissing { program, .. }) => {
                assert_eq!(program, "/definitely/not/ffmpeg")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
