//! Pipeline stages for PDF-to-video conversion.
//!
//! Each submodule implements one transformation step, so each can be tested
//! on its own and the two pure stages ([`normalize`], [`timing`]) never touch
//! the file system.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ normalize ──▶ speech ──▶ timing ──▶ media
//! (URL/path) (pdfium)  (text rules)  (TTS API)  (durations) (ffmpeg)
//! ```
//!
//! 1. [`input`]: resolve the user-supplied path or URL to a local file
//! 2. [`render`]: rasterise selected pages to PNG and pull their text;
//!    runs in `spawn_blocking` because pdfium is not async-safe
//! 3. [`normalize`]: turn raw page text into a speakable script
//! 4. [`speech`]: synthesize narration with retry/backoff; the only stage
//!    with network I/O besides a URL download
//! 5. [`timing`]: size each clip and place its narration
//! 6. [`media`]: probe audio, encode per-page clips and concatenate them

pub mod input;
pub mod media;
pub mod normalize;
pub mod render;
pub mod speech;
pub mod timing;
