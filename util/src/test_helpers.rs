use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Writes `json` to a `grading.json` inside a fresh temporary directory and
/// returns both. Keep the `TempDir` alive for as long as the file is needed.
pub fn write_grading_options(json: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let path = tmp.path().join("grading.json");
    fs::write(&path, json).expect("failed to write grading options");
    (tmp, path)
}
