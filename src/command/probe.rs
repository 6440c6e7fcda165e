use crate::{
    float::TerseF64,
    metadata::{self, FrameCountSource},
};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

/// Resolve a video's duration, frame count & frame rate and print them.
///
/// Container metadata is tried first, then a frame-accurate decode scan,
/// then a duration×fps estimate. The output names which tier produced the
/// frame count.
#[derive(Parser)]
pub struct Args {
    /// Input video file.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Print machine readable JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn probe(Args { input, json }: Args) -> anyhow::Result<()> {
    let meta = metadata::resolve(&input);

    if json {
        let errors: Vec<String> = [
            meta.duration.as_ref().err(),
            meta.frame_count.as_ref().err(),
            meta.fps.as_ref().err(),
        ]
        .into_iter()
        .flatten()
        .map(|e| e.to_string())
        .collect();

        let out = JsonOutput {
            duration_seconds: meta.duration.as_ref().ok().copied(),
            frame_count: meta.frame_count.as_ref().ok().copied(),
            fps: meta.fps.as_ref().ok().copied(),
            frame_count_source: meta.frame_count.is_ok().then_some(meta.frame_count_source),
            is_image: meta.is_image,
            errors,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    match &meta.duration {
        Ok(duration) => println!("Duration: {}s", TerseF64(*duration)),
        Err(err) => println!("Duration: unknown ({err})"),
    }
    match &meta.frame_count {
        Ok(frames) => {
            let source = match meta.frame_count_source {
                FrameCountSource::Container => "container metadata",
                FrameCountSource::DecodeScan => "decode scan",
                FrameCountSource::Estimated => "duration×fps estimate",
            };
            println!("Frames: {frames} ({source})");
        }
        Err(err) => println!("Frames: unknown ({err})"),
    }
    match &meta.fps {
        Ok(fps) => println!("FPS: {}", TerseF64(*fps)),
        Err(err) => println!("FPS: unknown ({err})"),
    }
    if meta.is_image {
        println!("Note: input looks like a still image, not a video");
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonOutput {
    duration_seconds: Option<f64>,
    frame_count: Option<u64>,
    fps: Option<f64>,
    frame_count_source: Option<FrameCountSource>,
    is_image: bool,
    errors: Vec<String>,
}
