//! Per-run log file.
//!
//! Every run appends its conditions to its own timestamped file, so
//! concurrent or repeated runs never contend over one global log.
use anyhow::Context;
use std::{
    fmt, fs,
    io::Write,
    path::{Path, PathBuf},
};
use time::{OffsetDateTime, macros::format_description};

pub struct RunLog {
    path: PathBuf,
    file: fs::File,
}

impl RunLog {
    /// Create `{dir}/{timestamp}.log` for this run.
    pub fn create(dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("creating log folder {}", dir.display()))?;
        let stamp = OffsetDateTime::now_utc()
            .format(format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]"))?;
        let path = dir.join(format!("{stamp}.log"));
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("creating run log {}", path.display()))?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&mut self, msg: impl fmt::Display) {
        self.write("INFO", msg);
    }

    pub fn warn(&mut self, msg: impl fmt::Display) {
        self.write("WARNING", msg);
    }

    pub fn error(&mut self, msg: impl fmt::Display) {
        self.write("ERROR", msg);
    }

    fn write(&mut self, level: &str, msg: impl fmt::Display) {
        let now = OffsetDateTime::now_utc()
            .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
            .unwrap_or_default();
        // a run must not die because its log file did
        let _ = writeln!(self.file, "{now} - {level} - {msg}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_levelled_lines() {
        let dir = std::env::temp_dir().join(format!("runlog-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let mut log = RunLog::create(&dir).unwrap();
        log.info("starting up");
        log.warn("start is after end, swapping them");
        log.error("expected 300 frames, found 299");

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert!(content.contains(" - INFO - starting up"));
        assert!(content.contains(" - WARNING - start is after end"));
        assert!(content.contains(" - ERROR - expected 300 frames"));
        assert_eq!(content.lines().count(), 3);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
