//! Shared helpers of the integration tests.
//!
//! Time assertions allow an absolute error of one microsecond, use [`assert_time_close`].

#![allow(dead_code)]

use std::{fs, path::Path};

use tempfile::TempDir;

/// One microsecond in seconds.
pub const MICROSECOND_EPSILON: f64 = 1e-6;

/// Asserts that two times in seconds differ by less than a microsecond.
#[track_caller]
pub fn assert_time_close(expected: f64, actual: f64, msg: &str) {
    let diff = (expected - actual).abs();
    assert!(
        diff < MICROSECOND_EPSILON,
        "{msg}: expected {expected:.6}s, got {actual:.6}s, diff {diff:.9}s (allowed: {MICROSECOND_EPSILON}s)",
    );
}

/// A temporary chart folder named `name` holding `files`.
pub struct SongFolder {
    root: TempDir,
    name: String,
}

impl SongFolder {
    pub fn new(name: &str, files: &[(&str, &str)]) -> Self {
        let root = tempfile::tempdir().expect("temp dir must be created");
        let folder = Self {
            root,
            name: name.to_owned(),
        };
        fs::create_dir(folder.path()).expect("song folder must be created");
        for (file, contents) in files {
            folder.write(file, contents);
        }
        folder
    }

    pub fn write(&self, file: &str, contents: &str) {
        fs::write(self.path().join(file), contents).expect("chart file must be written");
    }

    /// The song folder.
    pub fn path(&self) -> std::path::PathBuf {
        self.root.path().join(&self.name)
    }

    /// The folder containing the song folder.
    pub fn songs_dir(&self) -> &Path {
        self.root.path()
    }
}
