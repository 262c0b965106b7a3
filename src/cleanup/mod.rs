//! Temporary file tracking with guaranteed teardown.
//!
//! A `CleanupManager` owns every path registered during one pipeline run and
//! deletes them exactly once. Teardown fires from `Drop` as well, so the
//! files disappear on normal return, early return, panic unwind, and future
//! cancellation alike. Deletion failures are counted and logged, never
//! escalated.

use regex::Regex;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
pub struct CleanupManager {
    files: Vec<PathBuf>,
}

impl CleanupManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file for deletion at teardown. Idempotent per path.
    pub fn register(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return;
        }
        if !self.files.contains(&path) {
            self.files.push(path);
        }
    }

    pub fn register_many<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for path in paths {
            self.register(path);
        }
    }

    /// Register every file in `dir` whose name matches a glob-style pattern
    /// (`*` and `?` wildcards). Register-only; nothing is deleted here.
    pub fn register_directory(&mut self, dir: &Path, pattern: &str) -> anyhow::Result<()> {
        if !dir.exists() {
            return Ok(());
        }

        let matcher = glob_to_regex(pattern)?;

        for entry in fs_err::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name();
            if matcher.is_match(&name.to_string_lossy()) {
                self.register(path);
            }
        }

        Ok(())
    }

    /// Number of paths currently tracked.
    pub fn tracked(&self) -> usize {
        self.files.len()
    }

    /// Delete all registered files. Missing files are skipped; failures are
    /// reported in the count only.
    pub fn run_cleanup(&mut self) -> CleanupReport {
        let mut report = CleanupReport::default();

        for path in self.files.drain(..) {
            if !path.exists() {
                tracing::debug!("Already gone: {}", path.display());
                continue;
            }
            match fs_err::remove_file(&path) {
                Ok(()) => {
                    tracing::info!("Cleaned up: {}", path.display());
                    report.deleted += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to delete {}: {}", path.display(), e);
                    report.failed += 1;
                }
            }
        }

        report
    }
}

impl Drop for CleanupManager {
    fn drop(&mut self) {
        if self.files.is_empty() {
            return;
        }
        let report = self.run_cleanup();
        tracing::debug!(
            "Cleanup on drop: {} deleted, {} failed",
            report.deleted,
            report.failed
        );
    }
}

fn glob_to_regex(pattern: &str) -> anyhow::Result<Regex> {
    let mut translated = String::with_capacity(pattern.len() + 4);
    translated.push('^');
    for c in pattern.chars() {
        match c {
            '*' => translated.push_str(".*"),
            '?' => translated.push('.'),
            other => translated.push_str(&regex::escape(&other.to_string())),
        }
    }
    translated.push('$');
    Ok(Regex::new(&translated)?)
}
