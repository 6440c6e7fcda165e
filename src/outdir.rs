//! Output folder naming & produced-frame counting.
use anyhow::Context;
use std::path::{Path, PathBuf};
use time::{OffsetDateTime, macros::format_description};

/// Default parent folder for extracted frames, under the working directory.
pub const DEFAULT_PARENT: &str = "extracted_frames";

/// Folder the frames of one run land in.
///
/// With no explicit output folder, a `{stem}_frames_{label}` folder under
/// [`DEFAULT_PARENT`] is used. Existing folders are never reused: either a
/// `(2)`, `(3)`… suffix or a timestamp suffix keeps runs apart.
pub fn resolve(
    output: Option<&Path>,
    video_stem: &str,
    interval_label: &str,
    timestamped: bool,
) -> anyhow::Result<PathBuf> {
    let run_name = format!("{video_stem}_frames_{interval_label}");
    Ok(match (output, timestamped) {
        (None, false) => unique_folder(&Path::new(DEFAULT_PARENT).join(&run_name)),
        (None, true) => timestamp_folder(&Path::new(DEFAULT_PARENT).join(&run_name))?,
        (Some(dir), false) => unique_folder(dir),
        (Some(dir), true) => {
            let parent_name = dir.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            timestamp_folder(&dir.join(format!("{parent_name}_{run_name}")))?
        }
    })
}

/// `base` if it does not exist yet, else the first free `base(n)` sibling.
fn unique_folder(base: &Path) -> PathBuf {
    if !base.exists() {
        return base.to_owned();
    }
    let mut count = 2;
    loop {
        let candidate = PathBuf::from(format!("{}({count})", base.display()));
        if !candidate.exists() {
            return candidate;
        }
        count += 1;
    }
}

fn timestamp_folder(base: &Path) -> anyhow::Result<PathBuf> {
    let stamp = OffsetDateTime::now_utc()
        .format(format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]"))?;
    Ok(PathBuf::from(format!("{}_{stamp}", base.display())))
}

/// Count files in `dir` with the given extension (case-insensitive).
/// Used to verify a run produced the expected number of frames.
pub fn count_files_with_ext(dir: &Path, ext: &str) -> anyhow::Result<usize> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("reading output folder {}", dir.display()))?;
    Ok(entries
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case(ext))
        })
        .count())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("outdir-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn default_folder_name() {
        let folder = resolve(None, "clip", "2s_interval", false).unwrap();
        assert_eq!(
            folder,
            Path::new(DEFAULT_PARENT).join("clip_frames_2s_interval")
        );
    }

    #[test]
    fn unique_folder_suffixes() {
        let root = scratch_dir("unique");
        let base = root.join("frames");
        assert_eq!(unique_folder(&base), base);

        std::fs::create_dir_all(&base).unwrap();
        let second = unique_folder(&base);
        assert_eq!(second, PathBuf::from(format!("{}(2)", base.display())));

        std::fs::create_dir_all(&second).unwrap();
        let third = unique_folder(&base);
        assert_eq!(third, PathBuf::from(format!("{}(3)", base.display())));

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn timestamped_folder_extends_base() {
        let folder = resolve(None, "clip", "1_frame_interval", true).unwrap();
        let name = folder.file_name().unwrap().to_str().unwrap().to_owned();
        assert!(name.starts_with("clip_frames_1_frame_interval_"));
        assert!(name.len() > "clip_frames_1_frame_interval_".len());
    }

    #[test]
    fn counts_only_matching_extensions() {
        let dir = scratch_dir("count");
        for name in ["frame_0001.jpg", "frame_0002.jpg", "frame_0003.JPG", "notes.txt"] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }
        assert_eq!(count_files_with_ext(&dir, "jpg").unwrap(), 3);
        assert_eq!(count_files_with_ext(&dir, "png").unwrap(), 0);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
