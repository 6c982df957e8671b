//! Result types returned by the conversion entry points.

use crate::error::PageError;
use crate::pipeline::timing::NarrationPlacement;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a finished conversion produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoOutput {
    /// Path of the exported video.
    pub video_path: PathBuf,
    /// One entry per selected page, in document order.
    pub pages: Vec<PageClip>,
    /// Document metadata read before rendering.
    pub metadata: DocumentMetadata,
    /// Aggregate counters and timings.
    pub stats: VideoStats,
}

/// The outcome for a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageClip {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Rendered page image.
    pub image_path: PathBuf,
    /// Cleaned narration script; empty for a silent page.
    pub narration_text: String,
    /// Measured narration length in seconds; 0 when silent.
    pub narration_secs: f64,
    /// Reconciled clip length in seconds.
    pub clip_secs: f64,
    /// Where the narration sits inside the clip.
    pub placement: NarrationPlacement,
    /// Fade-in/fade-out length actually applied, if any.
    pub fade_secs: Option<f64>,
    /// Why narration was skipped, when synthesis was attempted and failed.
    pub narration_error: Option<String>,
    /// Set when the page was dropped from the video.
    pub error: Option<PageError>,
}

impl PageClip {
    /// True when the page made it into the video.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// True when the page carries narration audio.
    pub fn is_narrated(&self) -> bool {
        self.narration_secs > 0.0
    }
}

/// Document-level metadata read through pdfium.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Aggregate counters for a conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages that ended up in the video.
    pub processed_pages: usize,
    /// Selected pages that were dropped.
    pub failed_pages: usize,
    /// Included pages that carry narration.
    pub narrated_pages: usize,
    /// Length of the exported video in seconds (sum of clip durations).
    pub video_secs: f64,
    pub total_duration_ms: u64,
    pub render_duration_ms: u64,
    pub narration_duration_ms: u64,
    pub encode_duration_ms: u64,
}

impl VideoStats {
    /// Fill the page counters and video length from per-page results.
    pub fn tally(&mut self, pages: &[PageClip]) {
        self.processed_pages = pages.iter().filter(|p| p.is_ok()).count();
        self.failed_pages = pages.len() - self.processed_pages;
        self.narrated_pages = pages
            .iter()
            .filter(|p| p.is_ok() && p.is_narrated())
            .count();
        self.video_secs = pages
            .iter()
            .filter(|p| p.is_ok())
            .map(|p| p.clip_secs)
            .sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(page_num: usize, narration_secs: f64, clip_secs: f64, failed: bool) -> PageClip {
        PageClip {
            page_num,
            image_path: PathBuf::from(format!("page_{page_num}.png")),
            narration_text: String::new(),
            narration_secs,
            clip_secs,
            placement: NarrationPlacement::Silent,
            fade_secs: Some(1.0),
            narration_error: None,
            error: failed.then(|| PageError::ClipFailed {
                page: page_num,
                detail: "x".into(),
            }),
        }
    }

    #[test]
    fn tally_skips_failed_pages() {
        let pages = vec![
            clip(1, 0.0, 4.0, false),
            clip(2, 3.5, 5.5, false),
            clip(3, 2.0, 4.0, true),
        ];
        let mut stats = VideoStats::default();
        stats.tally(&pages);
        assert_eq!(stats.processed_pages, 2);
        assert_eq!(stats.failed_pages, 1);
        assert_eq!(stats.narrated_pages, 1);
        assert!((stats.video_secs - 9.5).abs() < 1e-9);
    }

    #[test]
    fn output_serialises_to_json() {
        let out = VideoOutput {
            video_path: PathBuf::from("out.mp4"),
            pages: vec![clip(1, 0.0, 4.0, false)],
            metadata: DocumentMetadata::default(),
            stats: VideoStats::default(),
        };
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains("\"video_path\":\"out.mp4\""));
        assert!(json.contains("\"Silent\""));
    }
}
