//! Scratch directory for a scan run
//!
//! The directory is a `TempDir`, so it is removed when the `Workspace` is
//! dropped, whether the run succeeded or failed.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use crate::error::{Error, Result};

/// Writable scratch location owned by one run
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Acquire the first writable location among `candidates`, falling back to
    /// the system temp directory
    ///
    /// Each location is probed by writing and removing a file inside a fresh
    /// `scan_<timestamp>` directory before it is accepted.
    pub fn acquire(candidates: &[PathBuf]) -> Result<Self> {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let prefix = format!("scan_{}_", timestamp);

        let mut tried = Vec::new();
        for base in candidates.iter().cloned().chain(std::iter::once(std::env::temp_dir())) {
            match Self::try_in(&base, &prefix) {
                Ok(dir) => return Ok(Self { dir }),
                Err(e) => tried.push(format!("{} ({})", base.display(), e)),
            }
        }

        Err(Error::Environment(format!(
            "no writable temporary location available; tried {}",
            tried.join(", ")
        )))
    }

    fn try_in(base: &Path, prefix: &str) -> std::io::Result<TempDir> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir_in(base)?;
        let probe = dir.path().join("write-test.txt");
        fs::write(&probe, b"ok")?;
        fs::remove_file(&probe)?;
        Ok(dir)
    }

    /// Root of the scratch directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory whose contents become the archive
    pub fn staging_dir(&self) -> Result<PathBuf> {
        let staging = self.dir.path().join("output");
        fs::create_dir_all(&staging)?;
        Ok(staging)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_prefers_first_candidate() {
        let base = TempDir::new().expect("Failed to create temp directory");
        let workspace = Workspace::acquire(&[base.path().to_path_buf()])
            .expect("Failed to acquire workspace");

        assert!(workspace.path().starts_with(base.path()));
        let name = workspace.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("scan_"));
        assert!(!workspace.path().join("write-test.txt").exists());
    }

    #[test]
    fn test_unwritable_candidate_falls_back() {
        let workspace = Workspace::acquire(&[PathBuf::from("/nonexistent/scan/location")])
            .expect("Should fall back to system temp dir");
        assert!(workspace.path().starts_with(std::env::temp_dir()));
    }

    #[test]
    fn test_drop_removes_directory() {
        let base = TempDir::new().expect("Failed to create temp directory");
        let root = {
            let workspace = Workspace::acquire(&[base.path().to_path_buf()])
                .expect("Failed to acquire workspace");
            let staging = workspace.staging_dir().expect("Failed to create staging dir");
            fs::write(staging.join("a.pdf"), b"%PDF").unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!root.exists());
    }
}
