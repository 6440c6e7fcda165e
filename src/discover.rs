//! Video file discovery.
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Case-insensitive search for a file named `name` under `root`,
/// subdirectories included. Returns the first match found.
pub fn find_video(name: &str, root: &Path) -> Option<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| {
            entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
        .map(|entry| entry.into_path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nested_file_case_insensitively() {
        let root = std::env::temp_dir().join(format!("discover-test-{}", std::process::id()));
        let nested = root.join("season1").join("episode2");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("MyClip.MP4"), b"not really a video").unwrap();

        let found = find_video("myclip.mp4", &root).expect("file should be found");
        assert!(found.ends_with(Path::new("season1/episode2/MyClip.MP4")));

        assert_eq!(find_video("other.mp4", &root), None);

        std::fs::remove_dir_all(&root).unwrap();
    }
}
