//! ffmpeg invocation logic
use crate::{
    command::args::ImageFormat,
    float::TerseF64,
    process::{CommandExt, FfmpegOut, ensure_success},
    temporary::{self, TempKind},
};
use anyhow::{Context, ensure};
use log::{debug, info};
use std::{
    path::{Path, PathBuf},
    process::Stdio,
};
use tokio::process::Command;
use tokio_stream::Stream;

/// Exposed ffmpeg frame-extraction args.
#[derive(Debug, Clone)]
pub struct FfmpegExtractArgs<'a> {
    pub input: &'a Path,
    /// Numbered output pattern, e.g. `frames/frame_%04d.jpg`.
    pub output_pattern: &'a Path,
    /// Temporal down-sampling `-vf` expression.
    pub vfilter: &'a str,
    pub image_format: ImageFormat,
    /// Refuse to overwrite frames already in the output folder.
    pub skip_existing: bool,
}

/// Spawn ffmpeg writing the numbered image sequence,
/// returning its progress stream.
pub fn extract_frames(
    FfmpegExtractArgs {
        input,
        output_pattern,
        vfilter,
        image_format,
        skip_existing,
    }: FfmpegExtractArgs,
) -> anyhow::Result<impl Stream<Item = anyhow::Result<FfmpegOut>>> {
    let mut cmd = Command::new("ffmpeg");
    cmd.kill_on_drop(true)
        .arg(match skip_existing {
            true => "-n",
            false => "-y",
        })
        .arg("-accurate_seek")
        .arg2("-i", input)
        .arg2("-vf", vfilter);
    match image_format {
        // png gets full compression; everything else top-quality jpeg-style
        // quantising in the jpeg color range
        ImageFormat::Png => cmd
            .arg2("-fps_mode", "passthrough")
            .arg2("-compression_level", "100"),
        _ => cmd
            .arg2("-fps_mode", "vfr")
            .arg2("-q:v", "1")
            .arg2("-pix_fmt", "yuvj420p"),
    };
    cmd.arg(output_pattern)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let cmd_str = cmd.to_cmd_str();
    debug!("cmd `{cmd_str}`");
    let child = cmd.spawn().context("ffmpeg extract")?;
    Ok(FfmpegOut::stream(child, "ffmpeg extract", cmd_str))
}

/// Cut `[start, end]` seconds into a new mkv beside the input.
///
/// Stream-copies, so the cut points snap to ffmpeg's seek accuracy; callers
/// re-probe the output for authoritative post-trim metadata.
pub async fn trim(input: &Path, start: f64, end: f64) -> anyhow::Result<PathBuf> {
    let dest = input.with_extension(format!(
        "trim{}+{}s.mkv",
        TerseF64(start),
        TerseF64(end - start)
    ));
    if dest.exists() {
        return Ok(dest);
    }
    temporary::add(&dest, TempKind::Keepable);

    let mut out = trim_cmd(input, start, end, &dest, false)
        .output()
        .await
        .context("ffmpeg trim")?;

    if !out.status.success()
        && String::from_utf8_lossy(&out.stderr)
            .contains("Can't write packet with unknown timestamp")
    {
        // try +genpts workaround
        out = trim_cmd(input, start, end, &dest, true)
            .output()
            .await
            .context("ffmpeg trim")?;
    }

    ensure_success("ffmpeg trim", &out)?;
    ensure!(
        dest.exists(),
        "ffmpeg trim produced no output: {}",
        dest.display()
    );
    Ok(dest)
}

fn trim_cmd(input: &Path, start: f64, end: f64, dest: &Path, genpts: bool) -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y");
    if genpts {
        cmd.arg2("-fflags", "+genpts");
    }
    // `-ss` before `-i` seeks on the input side
    cmd.arg2("-ss", start)
        .arg2("-i", input)
        .arg2("-t", end - start)
        .arg2("-c:v", "copy")
        .arg("-an")
        .arg("-sn")
        .arg(dest)
        .stdin(Stdio::null());
    debug!("cmd `{}`", cmd.to_cmd_str());
    cmd
}

/// Re-encode to a lossless ffv1/flac mkv beside the input, so frame-accurate
/// extraction is not at the mercy of the compressed source format.
///
/// An already existing intermediate is reused.
pub async fn to_lossless(input: &Path) -> anyhow::Result<PathBuf> {
    let dest = input.with_extension("lossless.mkv");
    if dest.exists() {
        info!("lossless intermediate already exists: {}", dest.display());
        return Ok(dest);
    }

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y")
        .arg2("-i", input)
        .arg2("-c:v", "ffv1")
        .arg2("-level", "3")
        .arg2("-context", "1")
        .arg2("-g", "1")
        .arg2("-slices", "4")
        .arg2("-c:a", "flac")
        .arg(&dest)
        .stdin(Stdio::null());
    debug!("cmd `{}`", cmd.to_cmd_str());

    let out = cmd.output().await.context("ffmpeg lossless")?;
    ensure_success("ffmpeg lossless", &out)?;
    ensure!(
        dest.exists(),
        "ffmpeg lossless produced no output: {}",
        dest.display()
    );
    Ok(dest)
}
