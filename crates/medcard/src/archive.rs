//! ZIP archive export.
//!
//! The archive holds one directory with a `{id}.json` export document per
//! record and a plaintext `README.txt` manifest naming the base URL the
//! documents were produced for.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::codec::to_export_json;
use crate::error::{Error, Result};
use crate::record::{now_timestamp, Record};
use crate::url::{RECORD_PATH, TOKEN_PARAM};

/// Prefix of the archive file name.
pub const ARCHIVE_PREFIX: &str = "medical-cards";

/// Name of the manifest inside the archive folder.
pub const MANIFEST_NAME: &str = "README.txt";

/// Settings controlling archive layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Folder inside the archive holding every file.
    pub folder: String,
    /// Embed the public URL in each export document.
    pub embed_url: bool,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            folder: ARCHIVE_PREFIX.to_string(),
            embed_url: true,
        }
    }
}

/// One line of the manifest file list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Path inside the archive.
    pub path: String,
    /// BLAKE3 digest of the file contents, hex encoded.
    pub blake3: String,
}

/// Human-readable description of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Base URL the export documents refer to.
    pub base_url: String,
    /// When the archive was produced.
    pub created_at: String,
    /// Files in the archive, in write order.
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Render the manifest as plain text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("Medical cards export\n");
        out.push_str("====================\n\n");
        out.push_str(&format!("Base URL: {}\n", self.base_url));
        out.push_str(&format!("Generated: {}\n", self.created_at));
        out.push_str(&format!("Records: {}\n\n", self.entries.len()));
        out.push_str(&format!(
            "Each record is served at {}{RECORD_PATH}<id>, with ?{TOKEN_PARAM}=<token> when it has a token.\n\n",
            self.base_url.trim_end_matches('/')
        ));
        out.push_str("Files (BLAKE3):\n");
        for entry in &self.entries {
            out.push_str(&format!("{}  {}\n", entry.blake3, entry.path));
        }
        out
    }
}

/// File name of an archive produced on `date`.
#[must_use]
pub fn archive_file_name(date: NaiveDate) -> String {
    format!("{ARCHIVE_PREFIX}-{}.zip", date.format("%Y-%m-%d"))
}

/// File name for a record inside the archive folder.
///
/// Path separators are replaced so an id can never escape the folder.
#[must_use]
pub fn entry_file_name(id: &str) -> String {
    let safe: String = id
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let safe = match safe.as_str() {
        "" | "." | ".." => format!("_{safe}"),
        _ => safe,
    };
    format!("{safe}.json")
}

/// Build an archive in memory.
///
/// # Errors
///
/// Returns an error if serialization or compression fails.
pub fn build_archive(
    records: &[Record],
    base_url: &str,
    options: &ArchiveOptions,
) -> Result<Vec<u8>> {
    let folder = options.folder.trim_matches('/');
    if folder.is_empty() {
        return Err(Error::invalid_input("archive folder cannot be empty"));
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let file_options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.add_directory(format!("{folder}/"), file_options)?;

    let mut used = HashSet::new();
    let mut entries = Vec::with_capacity(records.len());
    for record in records {
        let mut name = entry_file_name(&record.id);
        let mut n = 2;
        while !used.insert(name.clone()) {
            name = entry_file_name(&format!("{}-{n}", record.id));
            n += 1;
        }

        let document = to_export_json(record, base_url, options.embed_url);
        let body = serde_json::to_vec_pretty(&document)?;
        let path = format!("{folder}/{name}");

        writer.start_file(path.as_str(), file_options)?;
        writer.write_all(&body)?;
        debug!("Added {} ({} bytes)", path, body.len());

        entries.push(ManifestEntry {
            path,
            blake3: blake3::hash(&body).to_hex().to_string(),
        });
    }

    let manifest = Manifest {
        base_url: base_url.to_string(),
        created_at: now_timestamp(),
        entries,
    };
    writer.start_file(format!("{folder}/{MANIFEST_NAME}"), file_options)?;
    writer.write_all(manifest.render().as_bytes())?;

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

/// Build an archive and write it into `out_dir`, named with today's date.
///
/// Compression runs on the blocking thread pool. Returns the written path.
///
/// # Errors
///
/// Returns an error if the archive cannot be built or written.
pub async fn write_archive(
    records: Vec<Record>,
    base_url: String,
    options: ArchiveOptions,
    out_dir: &Path,
) -> Result<PathBuf> {
    let count = records.len();
    let bytes = tokio::task::spawn_blocking(move || build_archive(&records, &base_url, &options))
        .await
        .map_err(|err| Error::internal(format!("archive task failed: {err}")))??;

    tokio::fs::create_dir_all(out_dir)
        .await
        .map_err(|source| Error::DirectoryCreate {
            path: out_dir.to_path_buf(),
            source,
        })?;
    let path = out_dir.join(archive_file_name(Utc::now().date_naive()));
    tokio::fs::write(&path, &bytes).await?;

    info!("Exported {} records to {}", count, path.display());
    Ok(path)
}
