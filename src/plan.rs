//! Extraction planning: translate the requested range & sampling interval
//! into a validated time window, an ffmpeg sampling filter and the number of
//! frames the run is expected to produce.
use crate::{
    float::{TerseF64, ceil_dp},
    metadata::ResolvedMetadata,
};
use anyhow::ensure;
use std::fmt;

/// Requested extraction range & sampling interval.
///
/// All range fields are optional; a time always takes priority over the
/// matching frame number, and a seconds interval over a frame interval.
#[derive(Debug, Clone, Copy)]
pub struct RangeRequest {
    pub start_frame: Option<u64>,
    pub start_time: Option<f64>,
    pub end_frame: Option<u64>,
    pub end_time: Option<f64>,
    pub frame_interval: u64,
    pub seconds_interval: Option<f64>,
}

impl Default for RangeRequest {
    fn default() -> Self {
        Self {
            start_frame: None,
            start_time: None,
            end_frame: None,
            end_time: None,
            frame_interval: 1,
            seconds_interval: None,
        }
    }
}

impl RangeRequest {
    /// Same sampling interval with the start/end range dropped.
    /// Used when re-planning against an already trimmed file.
    pub fn without_range(self) -> Self {
        Self {
            start_frame: None,
            start_time: None,
            end_frame: None,
            end_time: None,
            ..self
        }
    }
}

/// Canonical sampling interval. Exactly one variant matches any request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interval {
    /// One frame every `n` seconds.
    EverySeconds(f64),
    /// Every `n`th frame, `n > 1`.
    EveryFrames(u64),
    /// Every frame, the degenerate default.
    PerFrame,
}

impl Interval {
    /// Interval magnitude used in expected-frame-count arithmetic.
    pub fn value(self) -> f64 {
        match self {
            Self::EverySeconds(s) => s,
            Self::EveryFrames(n) => n as f64,
            Self::PerFrame => 1.0,
        }
    }

    /// Folder-name friendly label.
    pub fn label(self) -> String {
        match self {
            Self::EverySeconds(s) => format!("{}s_interval", TerseF64(s)),
            Self::EveryFrames(n) => format!("{n}_frames_interval"),
            Self::PerFrame => "1_frame_interval".into(),
        }
    }

    /// ffmpeg temporal down-sampling filter.
    ///
    /// Seconds-based sampling never drops below 1 frame/second for sub-1s
    /// intervals; frame-based sampling divides the source rate.
    pub fn filter_expression(self, fps: f64) -> String {
        match self {
            Self::EverySeconds(s) if s > 1.0 => format!("fps=1/{}", TerseF64(s)),
            Self::EverySeconds(_) => "fps=1".into(),
            Self::EveryFrames(n) => format!("fps={}", TerseF64(fps / n as f64)),
            Self::PerFrame => format!("fps={}", TerseF64(fps)),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EverySeconds(s) => write!(f, "{}s interval", TerseF64(*s)),
            Self::EveryFrames(n) => write!(f, "{n} frames interval"),
            Self::PerFrame => "every frame".fmt(f),
        }
    }
}

/// One extraction run, fully determined.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionPlan {
    /// Window start in seconds. `0 ≤ start_time < end_time` after repair.
    pub start_time: f64,
    /// Window end in seconds, at most the video duration.
    pub end_time: f64,
    pub interval: Interval,
    /// ffmpeg `-vf` sampling expression.
    pub filter: String,
    /// Frames the run should produce, used to verify success afterwards.
    pub expected_frame_count: u64,
}

impl ExtractionPlan {
    /// Whether the window is a strict subset of the full video, requiring a
    /// trim step (and a re-plan against the trimmed file's metadata).
    pub fn needs_trim(&self, duration: f64) -> bool {
        self.start_time > 0.0 || self.end_time < duration
    }
}

/// Non-fatal conditions resolved by clamping to a safe default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlanWarning {
    StartTimeOutOfRange { given: f64, duration: f64 },
    StartFrameOutOfRange { given: u64, frame_count: u64 },
    EndTimeOutOfRange { given: f64, duration: f64 },
    EndFrameOutOfRange { given: u64, frame_count: u64 },
    StartEqualsEnd,
    StartAfterEnd,
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartTimeOutOfRange { given, duration } => write!(
                f,
                "start time {}s outside the video duration ({}s), defaulting to the start of the video",
                TerseF64(*given),
                TerseF64(*duration)
            ),
            Self::StartFrameOutOfRange { given, frame_count } => write!(
                f,
                "start frame {given} exceeds total frames ({frame_count}), defaulting to the first frame"
            ),
            Self::EndTimeOutOfRange { given, duration } => write!(
                f,
                "end time {}s outside the video duration ({}s), defaulting to the end of the video",
                TerseF64(*given),
                TerseF64(*duration)
            ),
            Self::EndFrameOutOfRange { given, frame_count } => write!(
                f,
                "end frame {given} exceeds total frames ({frame_count}), defaulting to the end of the video"
            ),
            Self::StartEqualsEnd => {
                "start equals end, defaulting to the start of the video".fmt(f)
            }
            Self::StartAfterEnd => "start is after end, swapping them".fmt(f),
        }
    }
}

/// Compute the extraction plan for `meta` & `range`.
///
/// Pure & deterministic: identical inputs yield identical plans. Out-of-range
/// bounds clamp to the full video and are reported as warnings; a
/// non-positive interval is an error.
pub fn plan(
    meta: ResolvedMetadata,
    range: &RangeRequest,
) -> anyhow::Result<(ExtractionPlan, Vec<PlanWarning>)> {
    if let Some(s) = range.seconds_interval {
        ensure!(s > 0.0, "seconds interval must be greater than 0");
    }
    ensure!(range.frame_interval > 0, "frame interval must be greater than 0");

    let interval = resolve_interval(range);
    let mut warnings = Vec::new();

    let mut start = 0.0;
    if let Some(t) = range.start_time {
        if (0.0..=meta.duration).contains(&t) {
            start = t;
        } else {
            warnings.push(PlanWarning::StartTimeOutOfRange { given: t, duration: meta.duration });
        }
    } else if let Some(n) = range.start_frame {
        if n <= meta.frame_count {
            start = n as f64 / meta.fps;
        } else {
            warnings.push(PlanWarning::StartFrameOutOfRange {
                given: n,
                frame_count: meta.frame_count,
            });
        }
    }

    let mut end = meta.duration;
    if let Some(t) = range.end_time {
        if (0.0..=meta.duration).contains(&t) {
            end = t;
        } else {
            warnings.push(PlanWarning::EndTimeOutOfRange { given: t, duration: meta.duration });
        }
    } else if let Some(n) = range.end_frame {
        if n <= meta.frame_count {
            end = n as f64 / meta.fps;
        } else {
            warnings.push(PlanWarning::EndFrameOutOfRange {
                given: n,
                frame_count: meta.frame_count,
            });
        }
    }

    // an empty window means "use the full video", not a zero-length clip
    if start == end {
        warnings.push(PlanWarning::StartEqualsEnd);
        start = 0.0;
    } else if start > end {
        warnings.push(PlanWarning::StartAfterEnd);
        std::mem::swap(&mut start, &mut end);
    }

    // fps rounded *up* to 2dp so fps truncation (29.97 vs 30000/1001) can
    // never under-count the expected frames
    let by_window = (((end - start) * ceil_dp(meta.fps, 2)) / interval.value()).ceil() as u64;
    let expected_frame_count = meta.frame_count.max(by_window);

    Ok((
        ExtractionPlan {
            start_time: start,
            end_time: end,
            interval,
            filter: interval.filter_expression(meta.fps),
            expected_frame_count,
        },
        warnings,
    ))
}

fn resolve_interval(range: &RangeRequest) -> Interval {
    match (range.seconds_interval, range.frame_interval) {
        (Some(s), _) => Interval::EverySeconds(s),
        (None, n) if n > 1 => Interval::EveryFrames(n),
        _ => Interval::PerFrame,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FrameCountSource;

    fn meta_10s_300f_30fps() -> ResolvedMetadata {
        ResolvedMetadata {
            duration: 10.0,
            frame_count: 300,
            fps: 30.0,
            frame_count_source: FrameCountSource::Container,
        }
    }

    #[test]
    fn per_frame_full_range() {
        let (plan, warnings) = plan(meta_10s_300f_30fps(), &RangeRequest::default()).unwrap();
        assert_eq!(plan.start_time, 0.0);
        assert_eq!(plan.end_time, 10.0);
        assert_eq!(plan.expected_frame_count, 300);
        assert_eq!(plan.filter, "fps=30");
        assert_eq!(plan.interval.label(), "1_frame_interval");
        assert!(warnings.is_empty());
        assert!(!plan.needs_trim(10.0));
    }

    #[test]
    fn seconds_interval() {
        let range = RangeRequest { seconds_interval: Some(2.0), ..<_>::default() };
        let (plan, _) = plan(meta_10s_300f_30fps(), &range).unwrap();
        assert_eq!(plan.interval.label(), "2s_interval");
        assert_eq!(plan.filter, "fps=1/2");
        // max(declared 300, ceil((10 × 30) / 2) = 150)
        assert_eq!(plan.expected_frame_count, 300);
    }

    #[test]
    fn sub_second_interval_keeps_one_fps() {
        let range = RangeRequest { seconds_interval: Some(0.5), ..<_>::default() };
        let (plan, _) = plan(meta_10s_300f_30fps(), &range).unwrap();
        assert_eq!(plan.filter, "fps=1");
        assert_eq!(plan.expected_frame_count, 600); // ceil((10 × 30) / 0.5)
    }

    #[test]
    fn frame_interval() {
        let range = RangeRequest { frame_interval: 3, ..<_>::default() };
        let (plan, _) = plan(meta_10s_300f_30fps(), &range).unwrap();
        assert_eq!(plan.interval.label(), "3_frames_interval");
        assert_eq!(plan.filter, "fps=10");
        assert_eq!(plan.expected_frame_count, 300);
    }

    #[test]
    fn seconds_interval_wins_over_frame_interval() {
        let range = RangeRequest {
            frame_interval: 5,
            seconds_interval: Some(2.0),
            ..<_>::default()
        };
        let (plan, _) = plan(meta_10s_300f_30fps(), &range).unwrap();
        assert_eq!(plan.interval, Interval::EverySeconds(2.0));
    }

    #[test]
    fn interval_resolution_is_total() {
        for (range, expected) in [
            (RangeRequest::default(), Interval::PerFrame),
            (RangeRequest { frame_interval: 4, ..<_>::default() }, Interval::EveryFrames(4)),
            (
                RangeRequest { seconds_interval: Some(1.5), ..<_>::default() },
                Interval::EverySeconds(1.5),
            ),
        ] {
            assert_eq!(resolve_interval(&range), expected);
        }
    }

    #[test]
    fn inverted_range_swaps() {
        let range = RangeRequest {
            start_time: Some(5.0),
            end_time: Some(2.0),
            ..<_>::default()
        };
        let (plan, warnings) = plan(meta_10s_300f_30fps(), &range).unwrap();
        assert_eq!(plan.start_time, 2.0);
        assert_eq!(plan.end_time, 5.0);
        assert_eq!(warnings, vec![PlanWarning::StartAfterEnd]);
        assert!(plan.needs_trim(10.0));
    }

    #[test]
    fn equal_start_end_resets_start() {
        let range = RangeRequest {
            start_time: Some(5.0),
            end_time: Some(5.0),
            ..<_>::default()
        };
        let (plan, warnings) = plan(meta_10s_300f_30fps(), &range).unwrap();
        assert_eq!(plan.start_time, 0.0);
        assert_eq!(plan.end_time, 5.0);
        assert_eq!(warnings, vec![PlanWarning::StartEqualsEnd]);
    }

    #[test]
    fn out_of_range_start_frame_clamps() {
        let range = RangeRequest { start_frame: Some(400), ..<_>::default() };
        let (plan, warnings) = plan(meta_10s_300f_30fps(), &range).unwrap();
        assert_eq!(plan.start_time, 0.0);
        assert_eq!(
            warnings,
            vec![PlanWarning::StartFrameOutOfRange { given: 400, frame_count: 300 }]
        );
    }

    #[test]
    fn out_of_range_end_time_clamps() {
        let range = RangeRequest { end_time: Some(99.0), ..<_>::default() };
        let (plan, warnings) = plan(meta_10s_300f_30fps(), &range).unwrap();
        assert_eq!(plan.end_time, 10.0);
        assert_eq!(
            warnings,
            vec![PlanWarning::EndTimeOutOfRange { given: 99.0, duration: 10.0 }]
        );
    }

    #[test]
    fn negative_start_time_clamps() {
        let range = RangeRequest { start_time: Some(-2.0), ..<_>::default() };
        let (plan, warnings) = plan(meta_10s_300f_30fps(), &range).unwrap();
        assert_eq!(plan.start_time, 0.0);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn start_frame_converts_via_fps() {
        let range = RangeRequest { start_frame: Some(150), ..<_>::default() };
        let (plan, _) = plan(meta_10s_300f_30fps(), &range).unwrap();
        assert_eq!(plan.start_time, 5.0);
        assert!(plan.needs_trim(10.0));
    }

    #[test]
    fn time_wins_over_frame() {
        let range = RangeRequest {
            start_time: Some(2.0),
            start_frame: Some(150),
            ..<_>::default()
        };
        let (plan, _) = plan(meta_10s_300f_30fps(), &range).unwrap();
        assert_eq!(plan.start_time, 2.0);
    }

    #[test]
    fn fps_rounds_up_in_expected_count() {
        let meta = ResolvedMetadata {
            duration: 100.0,
            frame_count: 1,
            fps: 30000.0 / 1001.0, // 29.97002997…, ceils to 29.98
            frame_count_source: FrameCountSource::DecodeScan,
        };
        let (plan, _) = plan(meta, &RangeRequest::default()).unwrap();
        assert_eq!(plan.expected_frame_count, 2998); // ceil(100 × 29.98)
    }

    #[test]
    fn zero_seconds_interval_is_fatal() {
        let range = RangeRequest { seconds_interval: Some(0.0), ..<_>::default() };
        assert!(plan(meta_10s_300f_30fps(), &range).is_err());
        let range = RangeRequest { seconds_interval: Some(-1.0), ..<_>::default() };
        assert!(plan(meta_10s_300f_30fps(), &range).is_err());
    }

    #[test]
    fn zero_frame_interval_is_fatal() {
        let range = RangeRequest { frame_interval: 0, ..<_>::default() };
        assert!(plan(meta_10s_300f_30fps(), &range).is_err());
    }

    #[test]
    fn planning_is_idempotent() {
        let range = RangeRequest {
            start_time: Some(1.5),
            end_frame: Some(240),
            seconds_interval: Some(0.25),
            ..<_>::default()
        };
        let a = plan(meta_10s_300f_30fps(), &range).unwrap();
        let b = plan(meta_10s_300f_30fps(), &range).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn without_range_keeps_interval() {
        let range = RangeRequest {
            start_time: Some(2.0),
            end_time: Some(8.0),
            seconds_interval: Some(3.0),
            ..<_>::default()
        };
        let cleared = range.without_range();
        assert_eq!(cleared.start_time, None);
        assert_eq!(cleared.end_time, None);
        assert_eq!(cleared.seconds_interval, Some(3.0));
    }
}
