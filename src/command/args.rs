//! Shared argument logic.
use crate::plan::RangeRequest;
use clap::Parser;

/// Range & sampling-interval args.
#[derive(Parser, Clone, Copy, Debug)]
pub struct Sampling {
    /// Start frame number. Ignored when --start-time is given.
    #[arg(long)]
    pub start_frame: Option<u64>,

    /// Start time in seconds. Takes priority over --start-frame.
    #[arg(long, allow_negative_numbers = true)]
    pub start_time: Option<f64>,

    /// End frame number. Ignored when --end-time is given.
    #[arg(long)]
    pub end_frame: Option<u64>,

    /// End time in seconds. Takes priority over --end-frame.
    #[arg(long, allow_negative_numbers = true)]
    pub end_time: Option<f64>,

    /// Extract every Nth frame.
    #[arg(long, default_value_t = 1)]
    pub frame_interval: u64,

    /// Extract one frame every N seconds. Takes priority over
    /// --frame-interval.
    #[arg(long)]
    pub seconds_interval: Option<f64>,
}

impl Sampling {
    pub fn to_range(self) -> RangeRequest {
        RangeRequest {
            start_frame: self.start_frame,
            start_time: self.start_time,
            end_frame: self.end_frame,
            end_time: self.end_time,
            frame_interval: self.frame_interval,
            seconds_interval: self.seconds_interval,
        }
    }
}

/// Output image format.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Jpg,
    Jpeg,
    Png,
    Webp,
    Bmp,
    Tiff,
}

impl ImageFormat {
    pub fn ext(self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        }
    }
}
