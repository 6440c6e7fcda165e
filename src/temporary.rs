//! temp file logic
use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{LazyLock, Mutex},
};

/// Whether a temp file may be kept when the user asks to keep temporary files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempKind {
    /// Kept when passing the `--keep` flag.
    Keepable,
    /// Always deleted on exit.
    NotKeepable,
}

static TEMPS: LazyLock<Mutex<HashMap<PathBuf, TempKind>>> = LazyLock::new(<_>::default);

/// Add a file as temporary so it can be deleted later.
pub fn add(file: impl Into<PathBuf>, kind: TempKind) {
    TEMPS.lock().unwrap().insert(file.into(), kind);
}

/// Delete all added temporary files.
/// `keep_keepables` leaves [`TempKind::Keepable`] files on disk.
pub async fn clean(keep_keepables: bool) {
    for (file, kind) in std::mem::take(&mut *TEMPS.lock().unwrap()) {
        if keep_keepables && kind == TempKind::Keepable {
            continue;
        }
        let _ = tokio::fs::remove_file(file).await;
    }
}
