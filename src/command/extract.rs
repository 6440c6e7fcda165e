use crate::{
    command::{
        PROGRESS_CHARS,
        args::{ImageFormat, Sampling},
    },
    discover, ffmpeg,
    float::TerseF64,
    metadata::{self, FrameCountSource, ResolvedMetadata},
    outdir, plan,
    process::FfmpegOut,
    runlog::RunLog,
};
use anyhow::{Context, bail, ensure};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    fmt,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tokio::fs;
use tokio_stream::StreamExt;

const SUPPORTED_VIDEO_EXTS: &[&str] = &["mp4", "avi", "mov", "mkv", "flv", "wmv"];

/// Extract a numbered image sequence from a video.
///
/// Frames are sampled over the requested time/frame range at the requested
/// interval. The video's true duration & frame count are resolved up front
/// (falling back to a frame-accurate decode scan when the container lies)
/// and the produced file count is verified against the expectation.
#[derive(Parser)]
pub struct Args {
    /// Input video file. A path that does not exist is searched for by file
    /// name under the working directory and its subdirectories.
    pub video: PathBuf,

    /// Output folder. Defaults to a per-run folder under `extracted_frames/`.
    #[arg(long)]
    pub output_folder: Option<PathBuf>,

    #[clap(flatten)]
    pub sampling: Sampling,

    /// Re-encode to a lossless intermediate before extracting.
    #[arg(long)]
    pub lossless: bool,

    /// Overwrite frames already present in the output folder instead of
    /// refusing to touch them.
    #[arg(long)]
    pub overwrite_existing: bool,

    /// Add a timestamp suffix to the output folder name.
    #[arg(long)]
    pub timestamp_folder: bool,

    /// Output image format.
    #[arg(long, value_enum, default_value_t = ImageFormat::Jpg)]
    pub image_format: ImageFormat,
}

pub async fn extract(args: Args) -> anyhow::Result<()> {
    let mut log = RunLog::create(Path::new("logs"))?;
    let out = run(args, &mut log).await;
    if let Err(err) = &out {
        log.error(format_args!("{err:#}"));
    }
    eprintln!("{}", style(format!("Log file: {}", log.path().display())).dim());
    out
}

async fn run(args: Args, log: &mut RunLog) -> anyhow::Result<()> {
    let run_start = Instant::now();

    let input = locate_input(&args.video, log).await?;
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    ensure!(
        ext.as_deref().is_some_and(|e| SUPPORTED_VIDEO_EXTS.contains(&e)),
        "unsupported video format {:?}, expected one of {SUPPORTED_VIDEO_EXTS:?}",
        ext.unwrap_or_default(),
    );

    let meta = metadata::resolve(&input);
    ensure!(
        !meta.is_image,
        "input {} looks like a still image, not a video",
        input.display()
    );
    let mut resolved = meta
        .require()
        .with_context(|| format!("unresolvable video metadata for {}", input.display()))?;
    if resolved.frame_count_source == FrameCountSource::Estimated {
        warn_note(log, "frame count is a duration×fps estimate, not frame-accurate");
    }
    note(log, describe(&input, resolved));

    let range = args.sampling.to_range();
    let (mut plan, warnings) = plan::plan(resolved, &range)?;
    for warning in &warnings {
        warn_note(log, warning);
    }

    let mut video = input;
    if plan.needs_trim(resolved.duration) {
        note(
            log,
            format!(
                "Trimming {} to {}s..{}s",
                video.display(),
                TerseF64(plan.start_time),
                TerseF64(plan.end_time)
            ),
        );
        let trim_start = Instant::now();
        let trimmed = ffmpeg::trim(&video, plan.start_time, plan.end_time).await?;
        ensure!(
            fs::try_exists(&trimmed).await?,
            "trim produced no output: {}",
            trimmed.display()
        );
        note(
            log,
            format!(
                "Trimmed video saved: {} (took {})",
                trimmed.display(),
                humantime::format_duration(Duration::from_secs(trim_start.elapsed().as_secs()))
            ),
        );

        // the trimmed file is now the authoritative metadata source
        resolved = metadata::resolve(&trimmed)
            .require()
            .with_context(|| format!("unresolvable metadata for trimmed video {}", trimmed.display()))?;
        let (mut replan, _) = plan::plan(resolved, &range.without_range())?;
        replan.expected_frame_count = resolved.frame_count;
        plan = replan;
        note(log, describe(&trimmed, resolved));
        video = trimmed;
    }

    if args.lossless {
        match ffmpeg::to_lossless(&video).await {
            Ok(lossless) => {
                note(log, format!("Lossless intermediate: {}", lossless.display()));
                video = lossless;
            }
            Err(err) => warn_note(
                log,
                format!("lossless conversion failed, using the original video: {err:#}"),
            ),
        }
    }

    let stem = video
        .file_stem()
        .and_then(|s| s.to_str())
        .context("invalid video file name")?;
    let out_dir = outdir::resolve(
        args.output_folder.as_deref(),
        stem,
        &plan.interval.label(),
        args.timestamp_folder,
    )?;
    fs::create_dir_all(&out_dir).await?;
    let pattern = out_dir.join(format!("frame_%04d.{}", args.image_format.ext()));

    note(
        log,
        format!(
            "Extracting {} frames ({}) to {}",
            plan.expected_frame_count,
            plan.interval,
            out_dir.display()
        ),
    );

    let bar = ProgressBar::new(plan.expected_frame_count.max(1)).with_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan.bold} {elapsed_precise:.bold} {wide_bar:.cyan/blue} {pos}/{len} ({msg}eta {eta})")?
            .progress_chars(PROGRESS_CHARS),
    );
    bar.enable_steady_tick(Duration::from_millis(100));

    let ffmpeg_start = Instant::now();
    let mut extraction = ffmpeg::extract_frames(ffmpeg::FfmpegExtractArgs {
        input: &video,
        output_pattern: &pattern,
        vfilter: &plan.filter,
        image_format: args.image_format,
        skip_existing: !args.overwrite_existing,
    })?;
    while let Some(progress) = extraction.next().await {
        let FfmpegOut::Progress { frame, fps, .. } = progress?;
        if fps > 0.0 {
            bar.set_message(format!("{fps} fps, "));
        }
        bar.set_position(frame.min(plan.expected_frame_count));
    }
    bar.finish();

    let produced = outdir::count_files_with_ext(&out_dir, args.image_format.ext())? as u64;
    note(
        log,
        format!(
            "Saved {produced} frames in {} (total {}, ffmpeg {})",
            out_dir.display(),
            humantime::format_duration(Duration::from_secs(run_start.elapsed().as_secs())),
            humantime::format_duration(Duration::from_secs(ffmpeg_start.elapsed().as_secs())),
        ),
    );
    if produced == plan.expected_frame_count {
        note(log, "Extraction completed successfully");
    } else {
        // frames that were produced stay on disk, this is a discrepancy
        // report rather than a failure
        error_note(
            log,
            format!(
                "expected {} frames, found {produced} in {}",
                plan.expected_frame_count,
                out_dir.display()
            ),
        );
    }
    Ok(())
}

async fn locate_input(given: &Path, log: &mut RunLog) -> anyhow::Result<PathBuf> {
    if fs::try_exists(given).await? {
        return Ok(given.to_owned());
    }

    note(
        log,
        format!("{} not found, searching the working directory", given.display()),
    );
    let name = given
        .file_name()
        .and_then(|n| n.to_str())
        .context("invalid video file name")?;
    let cwd = std::env::current_dir()?;
    match discover::find_video(name, &cwd) {
        Some(found) => {
            note(log, format!("Found video: {}", found.display()));
            Ok(found)
        }
        None => bail!("no video file named {name:?} found under {}", cwd.display()),
    }
}

fn describe(video: &Path, meta: ResolvedMetadata) -> String {
    format!(
        "{}: {} ({}s), {} frames, {:.3} fps",
        video.display(),
        humantime::format_duration(Duration::from_secs(meta.duration as u64)),
        TerseF64(meta.duration),
        meta.frame_count,
        meta.fps,
    )
}

fn note(log: &mut RunLog, msg: impl fmt::Display) {
    eprintln!("{}", style(&msg).dim());
    log.info(msg);
}

fn warn_note(log: &mut RunLog, msg: impl fmt::Display) {
    eprintln!("{}", style(format!("Warning: {msg}")).yellow());
    log.warn(msg);
}

fn error_note(log: &mut RunLog, msg: impl fmt::Display) {
    eprintln!("{}", style(format!("Error: {msg}")).red());
    log.error(msg);
}
