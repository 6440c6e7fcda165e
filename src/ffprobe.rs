//! ffprobe logic
use anyhow::{Context, anyhow, ensure};
use std::{fmt, io::Read, path::Path};

/// Container-declared metadata. Each field may fail independently as a
/// container can supply some fields reliably but not others.
pub struct ContainerProbe {
    /// Declared total duration in seconds.
    pub duration: Result<f64, ProbeError>,
    /// Declared video stream frame count (`nb_frames`).
    pub frame_count: Result<u64, ProbeError>,
    /// Declared video frame rate.
    pub fps: Result<f64, ProbeError>,
    /// The input looks like a still image rather than a video.
    pub is_image: bool,
}

/// Try to ffprobe the given input's container metadata.
pub fn probe(input: &Path) -> ContainerProbe {
    let is_image = has_image_extension(input) || sniff_image(input);

    let probe = match ffprobe::ffprobe(input) {
        Ok(p) => p,
        Err(err) => {
            let err = ProbeError(format!("ffprobe: {err}"));
            return ContainerProbe {
                duration: Err(err.clone()),
                frame_count: Err(err.clone()),
                fps: Err(err),
                is_image,
            };
        }
    };

    ContainerProbe {
        duration: read_duration(&probe).map_err(ProbeError::from),
        frame_count: read_frame_count(&probe).map_err(ProbeError::from),
        fps: read_fps(&probe).map_err(ProbeError::from),
        is_image,
    }
}

/// Decode every frame of the video stream & count them
/// (`ffprobe -count_frames` → `nb_read_frames`).
///
/// Slow: runtime is proportional to the full video length. Decoding stops at
/// the first frame that fails to materialize, so containers whose index lies
/// about true content report only the playable frames.
pub fn count_decoded_frames(input: &Path) -> Result<u64, ProbeError> {
    let conf = ffprobe::ConfigBuilder::new().count_frames(true).build();
    let probe = ffprobe::ffprobe_config(conf, input)
        .map_err(|err| ProbeError(format!("ffprobe -count_frames: {err}")))?;
    read_read_frames(&probe).map_err(ProbeError::from)
}

fn video_stream(probe: &ffprobe::FfProbe) -> anyhow::Result<&ffprobe::Stream> {
    probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .context("no video stream found")
}

fn read_duration(probe: &ffprobe::FfProbe) -> anyhow::Result<f64> {
    let duration_s = probe
        .format
        .duration
        .as_deref()
        .context("no container duration")?;
    let duration: f64 = duration_s
        .parse()
        .with_context(|| format!("invalid ffprobe video duration: {duration_s:?}"))?;
    ensure!(
        duration.is_finite() && duration >= 0.0,
        "invalid ffprobe video duration: {duration_s:?}"
    );
    Ok(duration)
}

fn read_frame_count(probe: &ffprobe::FfProbe) -> anyhow::Result<u64> {
    let nb = video_stream(probe)?
        .nb_frames
        .as_deref()
        .context("nb_frames not declared")?;
    let nb: i64 = nb
        .parse()
        .with_context(|| format!("invalid nb_frames: {nb:?}"))?;
    // a declared count of 0 or less is a lie, not an empty video
    ensure!(nb > 0, "invalid declared frame count: {nb}");
    Ok(nb as u64)
}

fn read_read_frames(probe: &ffprobe::FfProbe) -> anyhow::Result<u64> {
    let nb = video_stream(probe)?
        .nb_read_frames
        .as_deref()
        .context("nb_read_frames not reported")?;
    let nb: i64 = nb
        .parse()
        .with_context(|| format!("invalid nb_read_frames: {nb:?}"))?;
    u64::try_from(nb).map_err(|_| anyhow!("invalid nb_read_frames: {nb}"))
}

fn read_fps(probe: &ffprobe::FfProbe) -> anyhow::Result<f64> {
    let vstream = video_stream(probe)?;

    parse_frame_rate(&vstream.avg_frame_rate)
        .or_else(|| parse_frame_rate(&vstream.r_frame_rate))
        .context("invalid ffprobe video frame rate")
}

/// parse "x/y" or float strings.
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    if let Some((x, y)) = rate.split_once('/') {
        let x: f64 = x.parse().ok()?;
        let y: f64 = y.parse().ok()?;
        if x <= 0.0 || y <= 0.0 {
            return None;
        }
        Some(x / y)
    } else {
        rate.parse()
            .ok()
            .filter(|f: &f64| f.is_finite() && *f > 0.0)
    }
}

fn has_image_extension(input: &Path) -> bool {
    matches!(
        input.extension().and_then(|ext| ext.to_str()),
        Some("jpg" | "jpeg" | "png" | "bmp" | "webp" | "tiff" | "avif")
    )
}

fn sniff_image(input: &Path) -> bool {
    let mut buf = [0u8; 64];
    match std::fs::File::open(input).and_then(|mut f| f.read(&mut buf)) {
        Ok(n) => infer::is_image(&buf[..n]),
        Err(_) => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeError(String);

impl ProbeError {
    pub(crate) fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<anyhow::Error> for ProbeError {
    fn from(err: anyhow::Error) -> Self {
        Self(format!("{err}"))
    }
}

impl std::error::Error for ProbeError {}

#[test]
fn parse_rational_frame_rate() {
    assert_eq!(parse_frame_rate("30000/1001"), Some(30000.0 / 1001.0));
    assert_eq!(parse_frame_rate("25/1"), Some(25.0));
    assert_eq!(parse_frame_rate("0/0"), None);
    assert_eq!(parse_frame_rate("24/0"), None);
}

#[test]
fn parse_plain_frame_rate() {
    assert_eq!(parse_frame_rate("23.976"), Some(23.976));
    assert_eq!(parse_frame_rate(""), None);
    assert_eq!(parse_frame_rate("-30"), None);
}
