//! Writing the output archive

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};
use crate::error::{Error, Result};

/// Pack `entries` (paths relative to `staging`, `/`-separated) into a ZIP at
/// `destination`
///
/// Entries are written in the given order with a fixed timestamp. The archive
/// is built in a temporary file beside `destination` and renamed into place
/// once complete, so a failed run never leaves a partial archive behind.
pub fn write_archive(staging: &Path, entries: &[String], destination: &Path) -> Result<()> {
    let packaging = |source: io::Error| Error::Packaging {
        path: destination.to_path_buf(),
        source,
    };

    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let staged = tempfile::Builder::new()
        .prefix(".exam-sorter-")
        .suffix(".zip.part")
        .tempfile_in(&parent)
        .map_err(packaging)?;

    {
        let mut zip = ZipWriter::new(staged.as_file());
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        for entry in entries {
            let mut file = File::open(staging.join(entry)).map_err(packaging)?;
            zip.start_file(entry.as_str(), options).map_err(|e| packaging(io::Error::other(e)))?;
            io::copy(&mut file, &mut zip).map_err(packaging)?;
        }

        zip.finish().map_err(|e| packaging(io::Error::other(e)))?;
    }

    staged.persist(destination).map_err(|e| packaging(e.error))?;
    Ok(())
}

/// Names of the files in an archive, in stored order
pub fn list_entries(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if !entry.is_dir() {
            names.push(entry.name().to_string());
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;

    fn staging_with(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().expect("Failed to create temp directory");
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    #[test]
    fn test_entries_keep_given_order() {
        let staging = staging_with(&[("b/b.pdf", "B"), ("a/a.pdf", "A"), ("summary.txt", "S")]);
        let out = TempDir::new().expect("Failed to create temp directory");
        let archive = out.path().join("result.zip");

        let entries = vec!["b/b.pdf".to_string(), "a/a.pdf".to_string(), "summary.txt".to_string()];
        write_archive(staging.path(), &entries, &archive).expect("Failed to write archive");

        assert_eq!(list_entries(&archive).unwrap(), entries);

        let mut zip = ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let mut content = String::new();
        zip.by_name("a/a.pdf").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "A");
    }

    #[test]
    fn test_identical_input_gives_identical_archive() {
        let staging = staging_with(&[("x/x.pdf", "same bytes")]);
        let out = TempDir::new().expect("Failed to create temp directory");
        let entries = vec!["x/x.pdf".to_string()];

        let first = out.path().join("first.zip");
        let second = out.path().join("second.zip");
        write_archive(staging.path(), &entries, &first).unwrap();
        write_archive(staging.path(), &entries, &second).unwrap();

        assert_eq!(fs::read(first).unwrap(), fs::read(second).unwrap());
    }

    #[test]
    fn test_missing_entry_leaves_no_archive() {
        let staging = staging_with(&[]);
        let out = TempDir::new().expect("Failed to create temp directory");
        let archive = out.path().join("result.zip");

        let result = write_archive(staging.path(), &["gone.pdf".to_string()], &archive);
        assert!(matches!(result, Err(Error::Packaging { .. })));
        assert!(!archive.exists());
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unwritable_destination_is_packaging_error() {
        let staging = staging_with(&[("a.txt", "A")]);
        let result = write_archive(
            staging.path(),
            &["a.txt".to_string()],
            Path::new("/nonexistent/dir/result.zip"),
        );
        assert!(matches!(result, Err(Error::Packaging { .. })));
    }

    #[test]
    fn test_rejected_entry_is_packaging_error() {
        let staging = staging_with(&[("a/a.pdf", "A")]);
        let out = TempDir::new().expect("Failed to create temp directory");
        let archive = out.path().join("result.zip");

        let entries = vec!["a/a.pdf".to_string(), "a/a.pdf".to_string()];
        let result = write_archive(staging.path(), &entries, &archive);
        match result {
            Err(Error::Packaging { path, .. }) => assert_eq!(path, archive),
            other => panic!("Expected packaging error, got {:?}", other),
        }
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }
}
