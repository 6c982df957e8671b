//! Clip timing: how long a page stays on screen and where its narration sits.
//!
//! A page clip must be long enough for three things: the configured minimum
//! page duration, the narration itself, and a fade at each end that never
//! overlaps the narration. Narration shorter than the clip is centred, so the
//! silence before and after it is equal.
//!
//! ```text
//!  0        offset                    offset+narration        target
//!  |─ fade ─|── narration ────────────|              |─ fade ─|
//! ```

use serde::{Deserialize, Serialize};

/// Where the narration audio goes inside a clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NarrationPlacement {
    /// No narration; the clip carries silence.
    Silent,
    /// Narration starts at `offset_secs`, padded with silence on both sides.
    Centered { offset_secs: f64 },
    /// Narration fills the whole clip from 0.
    FullSpan,
    /// Narration is longer than the clip and is cut at the clip end.
    Truncated,
}

impl NarrationPlacement {
    /// Start time of the narration inside the clip.
    pub fn offset_secs(&self) -> f64 {
        match self {
            NarrationPlacement::Centered { offset_secs } => *offset_secs,
            _ => 0.0,
        }
    }
}

/// Reconciled duration of one page clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipTiming {
    /// Final clip length in seconds.
    pub target_secs: f64,
    /// Measured narration length in seconds; 0 when silent.
    pub narration_secs: f64,
    pub placement: NarrationPlacement,
}

impl ClipTiming {
    /// Size a clip from the page duration floor, the transition length and
    /// the narration length.
    ///
    /// `target = max(floor, narration + 2 * transition)`. All inputs are
    /// expected to be non-negative; the configuration layer enforces that.
    pub fn reconcile(floor_secs: f64, transition_secs: f64, narration_secs: f64) -> Self {
        let target = floor_secs.max(narration_secs + 2.0 * transition_secs);
        Self::place(target, narration_secs)
    }

    /// Place narration inside a clip of a fixed length.
    pub fn place(target_secs: f64, narration_secs: f64) -> Self {
        let placement = if narration_secs <= 0.0 {
            NarrationPlacement::Silent
        } else if narration_secs < target_secs {
            NarrationPlacement::Centered {
                offset_secs: (target_secs - narration_secs) / 2.0,
            }
        } else if narration_secs > target_secs {
            NarrationPlacement::Truncated
        } else {
            NarrationPlacement::FullSpan
        };

        Self {
            target_secs,
            narration_secs,
            placement,
        }
    }

    /// Seconds of narration actually audible in the clip.
    pub fn audible_narration_secs(&self) -> f64 {
        self.narration_secs.min(self.target_secs)
    }
}

/// Length of the fade-in and fade-out for a clip, or `None` for no fade.
///
/// A full `transition_secs` fade needs room for two of them. A clip that is
/// too short for that but still longer than one transition gets shortened
/// fades of at most half the clip each, so the two never overlap.
pub fn fade_duration(target_secs: f64, transition_secs: f64) -> Option<f64> {
    let fade = if target_secs > 2.0 * transition_secs {
        transition_secs
    } else if target_secs > transition_secs {
        transition_secs.min(target_secs / 2.0)
    } else {
        return None;
    };

    (fade > 0.0).then_some(fade)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn silent_page_uses_floor() {
        let t = ClipTiming::reconcile(4.0, 1.0, 0.0);
        assert_eq!(t.target_secs, 4.0);
        assert_eq!(t.placement, NarrationPlacement::Silent);
        assert_eq!(t.placement.offset_secs(), 0.0);
    }

    #[test]
    fn short_narration_is_centered_in_floor() {
        let t = ClipTiming::reconcile(4.0, 1.0, 1.5);
        assert_eq!(t.target_secs, 4.0);
        assert_eq!(
            t.placement,
            NarrationPlacement::Centered { offset_secs: 1.25 }
        );
    }

    #[test]
    fn long_narration_extends_clip() {
        let t = ClipTiming::reconcile(4.0, 1.0, 10.0);
        assert_eq!(t.target_secs, 12.0);
        assert!(approx(t.placement.offset_secs(), 1.0));
    }

    #[test]
    fn zero_transition_narration_fills_clip() {
        let t = ClipTiming::reconcile(4.0, 0.0, 6.0);
        assert_eq!(t.target_secs, 6.0);
        assert_eq!(t.placement, NarrationPlacement::FullSpan);
    }

    #[test]
    fn forced_short_target_truncates() {
        let t = ClipTiming::place(3.0, 5.0);
        assert_eq!(t.placement, NarrationPlacement::Truncated);
        assert_eq!(t.placement.offset_secs(), 0.0);
        assert_eq!(t.audible_narration_secs(), 3.0);
    }

    #[test]
    fn target_respects_both_lower_bounds() {
        for &(floor, transition, narration) in &[
            (4.0, 1.0, 0.0),
            (4.0, 1.0, 2.0),
            (4.0, 1.0, 2.5),
            (2.0, 0.5, 7.25),
            (10.0, 3.0, 1.0),
        ] {
            let t = ClipTiming::reconcile(floor, transition, narration);
            assert!(t.target_secs >= floor);
            assert!(t.target_secs >= narration + 2.0 * transition);
        }
    }

    #[test]
    fn centered_padding_is_equal() {
        let t = ClipTiming::reconcile(6.0, 0.5, 2.0);
        let before = t.placement.offset_secs();
        let after = t.target_secs - before - t.narration_secs;
        assert!(approx(before, after));
    }

    #[test]
    fn target_is_monotonic_in_narration() {
        let mut previous = 0.0;
        for step in 0..200 {
            let narration = step as f64 * 0.05;
            let t = ClipTiming::reconcile(4.0, 1.0, narration);
            assert!(t.target_secs >= previous);
            previous = t.target_secs;
        }
    }

    #[test]
    fn full_fade_when_room_for_two() {
        assert_eq!(fade_duration(4.0, 1.0), Some(1.0));
    }

    #[test]
    fn reduced_fade_for_short_clip() {
        assert_eq!(fade_duration(1.5, 1.0), Some(0.75));
    }

    #[test]
    fn exactly_two_transitions_gets_half_clip_fade() {
        assert_eq!(fade_duration(2.0, 1.0), Some(1.0));
    }

    #[test]
    fn no_fade_when_clip_not_longer_than_transition() {
        assert_eq!(fade_duration(1.0, 1.0), None);
        assert_eq!(fade_duration(0.5, 1.0), None);
    }

    #[test]
    fn zero_transition_means_no_fade() {
        assert_eq!(fade_duration(4.0, 0.0), None);
    }

    #[test]
    fn fades_never_overlap() {
        for &(target, transition) in &[(1.2, 1.0), (1.9, 1.0), (3.0, 1.0), (0.3, 0.2)] {
            if let Some(fade) = fade_duration(target, transition) {
                assert!(2.0 * fade <= target + 1e-9, "{target} {transition}");
            }
        }
    }
}
