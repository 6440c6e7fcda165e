//! Video metadata resolution.
//!
//! Container metadata cannot be trusted on its own: a container may omit
//! `nb_frames`, declare a bogus value, or report a duration that does not
//! match its playable content. [`resolve`] runs an ordered cascade of tiers,
//! each attempted only when the previous one failed to produce a definite
//! positive frame count:
//!
//! 1. container-declared metadata ([`crate::ffprobe::probe`])
//! 2. a frame-accurate decode scan reconciled against the declared fps
//! 3. a `duration × fps` arithmetic estimate
use crate::{
    ffprobe::{self, ProbeError},
    float::floor_dp,
};
use anyhow::Context;
use log::{debug, warn};
use serde::Serialize;
use std::path::Path;

/// Which tier produced the frame count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameCountSource {
    /// Declared by the container.
    Container,
    /// Counted by decoding every frame.
    DecodeScan,
    /// `floor(duration × fps)` last resort. Not frame-accurate, callers
    /// should not seek by frame index based on it.
    Estimated,
}

/// Resolved metadata for one video file. Fields degrade to a tagged error
/// rather than a sentinel number, so a failed probe can never leak into
/// arithmetic. A fresh instance is produced per [`resolve`] call.
#[derive(Debug, Clone)]
pub struct VideoMetadata {
    /// Playable duration in seconds.
    pub duration: Result<f64, ProbeError>,
    /// Total video stream frames.
    pub frame_count: Result<u64, ProbeError>,
    /// Video frame rate.
    pub fps: Result<f64, ProbeError>,
    pub frame_count_source: FrameCountSource,
    /// The input looks like a still image rather than a video.
    pub is_image: bool,
}

/// All-fields-valid view of [`VideoMetadata`] for planning arithmetic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedMetadata {
    pub duration: f64,
    pub frame_count: u64,
    pub fps: f64,
    pub frame_count_source: FrameCountSource,
}

impl VideoMetadata {
    /// All three fields, or the first failure. Callers treat an error here
    /// as fatal for the current video.
    pub fn require(&self) -> anyhow::Result<ResolvedMetadata> {
        Ok(ResolvedMetadata {
            duration: self.duration.clone().context("video duration")?,
            frame_count: self.frame_count.clone().context("video frame count")?,
            fps: self.fps.clone().context("video frame rate")?,
            frame_count_source: self.frame_count_source,
        })
    }
}

/// Resolve a video's duration, frame count & frame rate.
///
/// Never errors for a missing or corrupt file: failed fields carry their
/// probe error and the caller decides whether that is fatal.
pub fn resolve(input: &Path) -> VideoMetadata {
    let mut meta = from_container(ffprobe::probe(input));
    if meta.frame_count.is_ok() {
        return meta;
    }

    debug!("container frame count unusable, decode scanning {input:?}");
    decode_scan_tier(input, &mut meta);
    if meta.frame_count.is_ok() {
        return meta;
    }

    warn!("decode scan failed, estimating frame count for {input:?}");
    estimate_tier(&mut meta);
    meta
}

fn from_container(probe: ffprobe::ContainerProbe) -> VideoMetadata {
    VideoMetadata {
        duration: probe.duration,
        frame_count: probe.frame_count,
        fps: probe.fps,
        frame_count_source: FrameCountSource::Container,
        is_image: probe.is_image,
    }
}

/// Decode every frame & reconcile the count with the container-declared fps.
fn decode_scan_tier(input: &Path, meta: &mut VideoMetadata) {
    let fps = match &meta.fps {
        Ok(fps) => *fps,
        Err(err) => {
            meta.frame_count =
                Err(ProbeError::new(format!("decode scan needs a valid frame rate: {err}")));
            return;
        }
    };

    let decoded = match ffprobe::count_decoded_frames(input) {
        Ok(n) => n,
        Err(err) => {
            meta.frame_count = Err(err);
            return;
        }
    };
    if decoded == 0 {
        meta.frame_count = Err(ProbeError::new("decode scan read no frames"));
        return;
    }

    let timestamp = scan_timestamp(decoded, fps);
    let (duration, frame_count) = reconcile_decode_scan(decoded, timestamp, fps);
    if frame_count == 0 {
        meta.frame_count = Err(ProbeError::new("decode scan read no usable frames"));
        return;
    }

    meta.duration = Ok(duration);
    meta.frame_count = Ok(frame_count);
    meta.frame_count_source = FrameCountSource::DecodeScan;
}

/// Timestamp of the last decoded frame, rounded *down* to 3 decimal places
/// so floating noise cannot over-estimate the duration.
fn scan_timestamp(decoded: u64, fps: f64) -> f64 {
    floor_dp((decoded - 1) as f64 / fps, 3)
}

/// The decoded count and the declared fps can disagree by rounding; collapse
/// to the internally consistent pair.
fn reconcile_decode_scan(decoded: u64, timestamp: f64, fps: f64) -> (f64, u64) {
    let expected_by_time = (timestamp * fps).ceil() as u64;
    if decoded > expected_by_time {
        // trust the time estimate
        (timestamp, expected_by_time)
    } else if decoded < expected_by_time {
        // trust the decoded count
        (decoded as f64 / fps, decoded)
    } else {
        (timestamp, decoded)
    }
}

/// Last resort: estimate the frame count from duration × fps.
fn estimate_tier(meta: &mut VideoMetadata) {
    if let (Ok(duration), Ok(fps)) = (&meta.duration, &meta.fps) {
        if *duration > 0.0 && *fps > 0.0 {
            meta.frame_count = Ok((duration * fps).floor() as u64);
            meta.frame_count_source = FrameCountSource::Estimated;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(
        duration: Result<f64, ProbeError>,
        frame_count: Result<u64, ProbeError>,
        fps: Result<f64, ProbeError>,
    ) -> VideoMetadata {
        from_container(ffprobe::ContainerProbe {
            duration,
            frame_count,
            fps,
            is_image: false,
        })
    }

    #[test]
    fn container_tier_returned_unmodified() {
        let meta = container(Ok(10.0), Ok(300), Ok(30.0));
        assert_eq!(meta.duration, Ok(10.0));
        assert_eq!(meta.frame_count, Ok(300));
        assert_eq!(meta.fps, Ok(30.0));
        assert_eq!(meta.frame_count_source, FrameCountSource::Container);
    }

    #[test]
    fn scan_timestamp_rounds_down() {
        // 299 frames after the first at 30fps = 9.9666…s
        assert_eq!(scan_timestamp(300, 30.0), 9.966);
    }

    #[test]
    fn reconcile_trusts_time_when_more_frames_decoded() {
        // ceil(9.966 × 30) = 299 < 300 decoded
        assert_eq!(reconcile_decode_scan(300, 9.966, 30.0), (9.966, 299));
    }

    #[test]
    fn reconcile_trusts_count_when_fewer_frames_decoded() {
        // ceil(9.966 × 30) = 299 > 298 decoded
        let (duration, frames) = reconcile_decode_scan(298, 9.966, 30.0);
        assert_eq!(frames, 298);
        assert!((duration - 298.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn reconcile_consistent_when_equal() {
        let (duration, frames) = reconcile_decode_scan(299, 9.966, 30.0);
        assert_eq!((duration, frames), (9.966, 299));
        assert_eq!((duration * 30.0).ceil() as u64, frames);
    }

    #[test]
    fn estimate_tier_floors_duration_times_fps() {
        let mut meta = container(Ok(10.5), Err(ProbeError::new("nb_frames not declared")), Ok(29.97));
        estimate_tier(&mut meta);
        assert_eq!(meta.frame_count, Ok(314)); // floor(10.5 × 29.97)
        assert_eq!(meta.frame_count_source, FrameCountSource::Estimated);
    }

    #[test]
    fn estimate_tier_needs_duration_and_fps() {
        let missing = || ProbeError::new("ffprobe: boom");
        let mut meta = container(Err(missing()), Err(missing()), Ok(30.0));
        estimate_tier(&mut meta);
        assert!(meta.frame_count.is_err());

        let mut meta = container(Ok(0.0), Err(missing()), Ok(30.0));
        estimate_tier(&mut meta);
        assert!(meta.frame_count.is_err());
    }

    #[test]
    fn require_fails_when_any_field_failed() {
        let meta = container(Ok(10.0), Err(ProbeError::new("nb_frames not declared")), Ok(30.0));
        assert!(meta.require().is_err());
        assert!(container(Ok(10.0), Ok(300), Ok(30.0)).require().is_ok());
    }
}
