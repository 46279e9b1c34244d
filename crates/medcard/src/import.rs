//! Collecting import inputs from the file system.
//!
//! A path may name a JSON file, a directory (its `*.json` files are taken in
//! name order) or a `.zip` archive as written by [`crate::archive`]. Inputs
//! that cannot be read are reported as skipped, like unparsable files.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::catalogue::{ImportFile, SkippedFile};
use crate::error::Result;

/// Files gathered for an import batch.
#[derive(Debug, Default)]
pub struct Gathered {
    /// Readable inputs, in the order given.
    pub files: Vec<ImportFile>,
    /// Inputs that could not be read.
    pub skipped: Vec<SkippedFile>,
}

impl Gathered {
    fn skip(&mut self, path: &Path, reason: impl ToString) {
        let reason = reason.to_string();
        warn!("Skipping {}: {}", path.display(), reason);
        self.skipped.push(SkippedFile {
            name: path.display().to_string(),
            reason,
        });
    }
}

/// Gather import files from the given paths.
#[must_use]
pub fn gather(paths: &[PathBuf]) -> Gathered {
    let mut gathered = Gathered::default();
    for path in paths {
        if path.is_dir() {
            match json_files_in(path) {
                Ok(files) => {
                    for file in files {
                        read_file(&file, &mut gathered);
                    }
                }
                Err(err) => gathered.skip(path, err),
            }
        } else if has_extension(path, "zip") {
            if let Err(err) = read_archive(path, &mut gathered) {
                gathered.skip(path, err);
            }
        } else {
            read_file(path, &mut gathered);
        }
    }
    gathered
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
}

fn json_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, "json") {
            files.push(path);
        }
    }
    files.sort();
    debug!("Found {} JSON files in {}", files.len(), dir.display());
    Ok(files)
}

fn read_file(path: &Path, gathered: &mut Gathered) {
    match std::fs::read(path) {
        Ok(contents) => {
            let name = path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
            gathered.files.push(ImportFile::new(name, contents));
        }
        Err(err) => gathered.skip(path, err),
    }
}

fn read_archive(path: &Path, gathered: &mut Gathered) -> Result<()> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|name| has_extension(Path::new(name), "json"))
        .map(ToString::to_string)
        .collect();
    names.sort();

    for name in names {
        let mut entry = archive.by_name(&name)?;
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents)?;
        gathered.files.push(ImportFile::new(name, contents));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{build_archive, ArchiveOptions};
    use crate::record::Record;

    #[test]
    fn test_gather_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let cards = dir.path().join("cards");
        std::fs::create_dir(&cards).unwrap();
        std::fs::write(cards.join("b.json"), "{}").unwrap();
        std::fs::write(cards.join("a.json"), "{}").unwrap();
        std::fs::write(cards.join("notes.txt"), "ignored").unwrap();
        let single = dir.path().join("single.json");
        std::fs::write(&single, "{\"name\":\"S\"}").unwrap();

        let gathered = gather(&[single, cards]);

        let names: Vec<&str> = gathered.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["single.json", "a.json", "b.json"]);
        assert!(gathered.skipped.is_empty());
    }

    #[test]
    fn test_gather_missing_file_is_skipped() {
        let gathered = gather(&[PathBuf::from("/nonexistent/card.json")]);
        assert!(gathered.files.is_empty());
        assert_eq!(gathered.skipped.len(), 1);
    }

    #[test]
    fn test_gather_archive_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.zip");
        let bytes = build_archive(
            &[Record::new("one"), Record::new("two")],
            "https://x.org",
            &ArchiveOptions::default(),
        )
        .unwrap();
        std::fs::write(&path, bytes).unwrap();

        let gathered = gather(&[path]);

        let stems: Vec<String> = gathered.files.iter().map(ImportFile::stem).collect();
        assert_eq!(stems, vec!["one", "two"]);
    }

    #[test]
    fn test_gather_corrupt_archive_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.zip");
        std::fs::write(&path, b"not a zip").unwrap();

        let gathered = gather(&[path]);

        assert!(gathered.files.is_empty());
        assert_eq!(gathered.skipped.len(), 1);
    }
}
