use anyhow::{anyhow, ensure};
use std::{
    borrow::Cow,
    ffi::OsStr,
    fmt, io,
    path::{Path, PathBuf},
    process::{ExitStatus, Output},
    time::Duration,
};
use time::macros::format_description;
use tokio::process::Child;
use tokio_process_stream::{Item, ProcessChunkStream};
use tokio_stream::{Stream, StreamExt};

pub fn ensure_success(name: &'static str, out: &Output) -> anyhow::Result<()> {
    ensure!(
        out.status.success(),
        "{name} exit code {:?}\n{}",
        out.status.code(),
        String::from_utf8_lossy(&out.stderr).trim(),
    );
    Ok(())
}

/// Convert exit code result into simple result, adding recent stderr on error.
fn exit_ok(
    name: &'static str,
    done: io::Result<ExitStatus>,
    cmd_str: &str,
    chunks: &Chunks,
) -> anyhow::Result<()> {
    let code = done?;
    if !code.success() {
        return Err(cmd_err(
            format!("{name} exit code {:?}", code.code()),
            cmd_str,
            chunks,
        ));
    }
    Ok(())
}

/// Ok -> None, err -> Some(err)
fn exit_ok_option<T>(
    name: &'static str,
    done: io::Result<ExitStatus>,
    cmd_str: &str,
    chunks: &Chunks,
) -> Option<anyhow::Result<T>> {
    match exit_ok(name, done, cmd_str, chunks) {
        Ok(_) => None,
        Err(err) => Some(Err(err)),
    }
}

/// Error including the spawned command & the tail of its stderr.
pub fn cmd_err(err: impl fmt::Display, cmd_str: &str, chunks: &Chunks) -> anyhow::Error {
    anyhow!("{err}\n----cmd----\n{cmd_str}\n---stderr---\n{}\n------------", chunks.tail())
}

/// Rolling buffer of recent process stderr output.
#[derive(Default)]
pub struct Chunks {
    out: String,
}

impl Chunks {
    pub fn push(&mut self, chunk: &[u8]) {
        self.out.push_str(&String::from_utf8_lossy(chunk));
        if self.out.len() > 8192 {
            let min_keep = self.out.len() - 4096;
            if let Some(cut) = (min_keep..self.out.len()).find(|&i| self.out.is_char_boundary(i)) {
                self.out.drain(..cut);
            }
        }
    }

    pub fn tail(&self) -> &str {
        self.out.trim()
    }
}

#[derive(Debug, PartialEq)]
pub enum FfmpegOut {
    Progress { frame: u64, fps: f32, time: Duration },
}

impl FfmpegOut {
    pub fn try_parse(out: &str) -> Option<Self> {
        if out.starts_with("frame=") {
            let frame: u64 = parse_label_substr("frame=", out)?.parse().ok()?;
            let fps: f32 = parse_label_substr("fps=", out)?.parse().ok()?;
            let (h, m, s, ns) = time::Time::parse(
                parse_label_substr("time=", out)?,
                &format_description!("[hour]:[minute]:[second].[subsecond]"),
            )
            .ok()?
            .as_hms_nano();
            return Some(Self::Progress {
                frame,
                fps,
                time: Duration::new(h as u64 * 60 * 60 + m as u64 * 60 + s as u64, ns),
            });
        }
        None
    }

    pub fn stream(
        child: Child,
        name: &'static str,
        cmd_str: String,
    ) -> impl Stream<Item = anyhow::Result<FfmpegOut>> {
        let mut chunks = Chunks::default();
        ProcessChunkStream::from(child).filter_map(move |item| match item {
            Item::Stderr(chunk) => {
                chunks.push(&chunk);
                FfmpegOut::try_parse(&String::from_utf8_lossy(&chunk)).map(Ok)
            }
            Item::Stdout(_) => None,
            Item::Done(code) => exit_ok_option(name, code, &cmd_str, &chunks),
        })
    }
}

/// Parse a ffmpeg `label=  value ` type substring.
fn parse_label_substr<'a>(label: &str, line: &'a str) -> Option<&'a str> {
    let line = &line[line.find(label)? + label.len()..];
    let val_start = line.char_indices().find(|(_, c)| !c.is_whitespace())?.0;
    let val_end = val_start
        + line[val_start..]
            .char_indices()
            .find(|(_, c)| c.is_whitespace())
            .map(|(idx, _)| idx)
            .unwrap_or_else(|| line[val_start..].len());

    Some(&line[val_start..val_end])
}

#[test]
fn parse_ffmpeg_out() {
    let out = "frame=  288 fps= 94 q=-0.0 size=N/A time=01:23:12.34 bitrate=N/A speed=3.94x    \r";
    assert_eq!(
        FfmpegOut::try_parse(out),
        Some(FfmpegOut::Progress {
            frame: 288,
            fps: 94.0,
            time: Duration::new(60 * 60 + 23 * 60 + 12, 340_000_000),
        })
    );
}

#[test]
fn parse_ffmpeg_na_time() {
    let out = "frame=   12 fps=0.0 q=-0.0 size=N/A time=N/A bitrate=N/A speed=N/A    \r";
    assert_eq!(FfmpegOut::try_parse(out), None);
}

pub trait CommandExt {
    /// Adds two arguments.
    fn arg2(&mut self, a: impl AsRef<OsStr>, b: impl ArgString) -> &mut Self;

    /// Full command as a shell-escaped string, for debug logging.
    fn to_cmd_str(&self) -> String;
}

impl CommandExt for tokio::process::Command {
    fn arg2(&mut self, a: impl AsRef<OsStr>, b: impl ArgString) -> &mut Self {
        self.arg(a).arg(b.arg_string())
    }

    fn to_cmd_str(&self) -> String {
        let std_cmd = self.as_std();
        std::iter::once(std_cmd.get_program())
            .chain(std_cmd.get_args())
            .map(|a| shell_escape::escape(a.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub trait ArgString {
    fn arg_string(&self) -> Cow<'_, OsStr>;
}

impl ArgString for &'_ str {
    fn arg_string(&self) -> Cow<'_, OsStr> {
        Cow::Borrowed(OsStr::new(*self))
    }
}
impl ArgString for String {
    fn arg_string(&self) -> Cow<'_, OsStr> {
        Cow::Borrowed(OsStr::new(self.as_str()))
    }
}
impl ArgString for &'_ String {
    fn arg_string(&self) -> Cow<'_, OsStr> {
        Cow::Borrowed(OsStr::new(self.as_str()))
    }
}
impl ArgString for &'_ Path {
    fn arg_string(&self) -> Cow<'_, OsStr> {
        Cow::Borrowed(self.as_os_str())
    }
}
impl ArgString for &'_ PathBuf {
    fn arg_string(&self) -> Cow<'_, OsStr> {
        Cow::Borrowed(self.as_os_str())
    }
}

macro_rules! impl_arg_string_display {
    ($t:ty) => {
        impl ArgString for $t {
            fn arg_string(&self) -> Cow<'_, OsStr> {
                Cow::Owned(self.to_string().into())
            }
        }
    };
}
impl_arg_string_display!(u16);
impl_arg_string_display!(u32);
impl_arg_string_display!(u64);
impl_arg_string_display!(usize);
impl_arg_string_display!(f32);
impl_arg_string_display!(f64);
