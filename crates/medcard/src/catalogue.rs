//! The record catalogue and its synchronization with a key-value store.
//!
//! [`Catalogue`] owns the ordered record list. Every mutation rewrites the
//! whole serialized list under [`RECORDS_KEY`]; the viewer base URL lives
//! independently under [`BASE_URL_KEY`].

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::codec::{from_import_json, to_export_json, ExportedRecord};
use crate::error::{Error, Result};
use crate::id::{collision_suffix, new_record_id};
use crate::record::Record;
use crate::store::KeyValueStore;
use crate::url::{normalize_base_url, SharePayload};

/// Store key holding the JSON array of records.
pub const RECORDS_KEY: &str = "medcard.records";

/// Store key holding the viewer base URL.
pub const BASE_URL_KEY: &str = "medcard.baseUrl";

/// Base URL used until the operator configures one.
pub const DEFAULT_BASE_URL: &str = "https://example.org";

/// One file handed to [`Catalogue::import_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFile {
    /// File name; its stem is the fallback record id.
    pub name: String,
    /// Raw file contents.
    pub contents: Vec<u8>,
}

impl ImportFile {
    /// Create an import file from a name and contents.
    #[must_use]
    pub fn new(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// The file name without directory or extension.
    #[must_use]
    pub fn stem(&self) -> String {
        Path::new(&self.name)
            .file_stem()
            .map_or_else(|| self.name.clone(), |s| s.to_string_lossy().into_owned())
    }
}

/// A file that [`Catalogue::import_batch`] could not parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    /// File name as given.
    pub name: String,
    /// Why it was skipped.
    pub reason: String,
}

/// Outcome of an import batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Ids written to the catalogue, in batch order (repeats included).
    pub imported: Vec<String>,
    /// Files that were skipped.
    pub skipped: Vec<SkippedFile>,
}

/// The record catalogue, backed by a key-value store.
#[derive(Debug)]
pub struct Catalogue<S> {
    store: S,
    records: Vec<Record>,
    base_url: String,
    default_base_url: String,
}

impl<S: KeyValueStore> Catalogue<S> {
    /// Load the catalogue from `store` with the built-in default base URL.
    ///
    /// Never fails: unreadable or malformed stored data yields an empty
    /// catalogue.
    #[must_use]
    pub fn load(store: S) -> Self {
        Self::load_with_default(store, DEFAULT_BASE_URL)
    }

    /// Load the catalogue, using `default_base_url` when none is stored.
    #[must_use]
    pub fn load_with_default(store: S, default_base_url: &str) -> Self {
        let (records, repaired) = read_records(&store);
        let base_url = match store.get(BASE_URL_KEY) {
            Ok(Some(url)) if !url.trim().is_empty() => url,
            Ok(_) => default_base_url.to_string(),
            Err(err) => {
                warn!("Failed to read base URL, using default: {}", err);
                default_base_url.to_string()
            }
        };

        debug!("Loaded {} records", records.len());
        let mut catalogue = Self {
            store,
            records,
            base_url,
            default_base_url: default_base_url.to_string(),
        };

        // Write back minted ids and dropped duplicates so they stay stable
        if repaired {
            match catalogue.persist() {
                Ok(()) => info!("Repaired stored catalogue"),
                Err(err) => warn!("Failed to write repaired catalogue: {}", err),
            }
        }
        catalogue
    }

    /// All records, most recently created first.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the catalogue has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Whether a record with `id` exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// The active viewer base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the catalogue, returning its store.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Normalize and persist a new base URL. Returns the stored value.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is blank or cannot be persisted.
    pub fn set_base_url(&mut self, raw: &str) -> Result<String> {
        let url = normalize_base_url(raw);
        if url.is_empty() {
            return Err(Error::invalid_input("base URL cannot be empty"));
        }
        self.store.set(BASE_URL_KEY, &url)?;
        info!("Base URL set to {}", url);
        self.base_url.clone_from(&url);
        Ok(url)
    }

    /// Forget the stored base URL and fall back to the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn reset_base_url(&mut self) -> Result<()> {
        self.store.remove(BASE_URL_KEY)?;
        self.base_url.clone_from(&self.default_base_url);
        Ok(())
    }

    /// Create an empty record with a fresh id and prepend it.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalogue cannot be persisted.
    pub fn create(&mut self) -> Result<String> {
        let mut id = new_record_id();
        while self.contains(&id) {
            id = new_record_id();
        }

        self.records.insert(0, Record::new(id.clone()));
        self.persist()?;
        info!("Created record {}", id);
        Ok(id)
    }

    /// Replace the record currently stored under `original_id`.
    ///
    /// The record's own id may differ from `original_id` (the id was
    /// edited). A blank id reverts to the stored one; an id already used by
    /// another record gets a random 4-character suffix. `last_update` is
    /// refreshed. Returns the id the record was committed under.
    /// Surrounding whitespace is stripped from the id before it is checked.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] if neither `original_id` nor the
    /// record's id matches an entry, or an error if persisting fails.
    pub fn save(&mut self, original_id: &str, mut record: Record) -> Result<String> {
        let index = self
            .position(original_id)
            .or_else(|| self.position(&record.id))
            .ok_or_else(|| Error::record_not_found(original_id))?;

        // Must match the trimming applied when loading
        let trimmed = record.id.trim();
        if trimmed.is_empty() {
            record.id.clone_from(&self.records[index].id);
        } else if trimmed.len() != record.id.len() {
            record.id = trimmed.to_string();
        }

        let requested = record.id.clone();
        while self.id_taken_by_other(&record.id, index) {
            record.id = format!("{requested}{}", collision_suffix());
        }
        if record.id != requested {
            warn!("Id {} already in use, saved as {}", requested, record.id);
        }

        record.touch();
        let id = record.id.clone();
        self.records[index] = record;
        self.persist()?;
        info!("Saved record {}", id);
        Ok(id)
    }

    /// Remove the record with `id`. Returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalogue cannot be persisted.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let Some(index) = self.position(id) else {
            debug!("Delete of unknown record {} ignored", id);
            return Ok(false);
        };

        self.records.remove(index);
        self.persist()?;
        info!("Deleted record {}", id);
        Ok(true)
    }

    /// Merge a batch of JSON files into the catalogue.
    ///
    /// Each file is parsed on its own; unparsable files are logged and
    /// reported as skipped. Records replace any existing entry with the same
    /// id in place (later files win); new ids are prepended in batch order.
    /// The catalogue is persisted once, at the end.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalogue cannot be persisted.
    pub fn import_batch(
        &mut self,
        files: impl IntoIterator<Item = ImportFile>,
    ) -> Result<ImportReport> {
        let mut report = ImportReport::default();
        let mut added: Vec<Record> = Vec::new();

        for file in files {
            let value: Value = match serde_json::from_slice(&file.contents) {
                Ok(value) => value,
                Err(err) => {
                    warn!("Skipping {}: {}", file.name, err);
                    report.skipped.push(SkippedFile {
                        name: file.name,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let decoded = from_import_json(&value, &file.stem());
            if decoded.is_defaulted() {
                warn!("{} is not a JSON object, importing defaults", file.name);
            }
            let record = decoded.into_record();
            let id = record.id.clone();

            if let Some(index) = self.position(&id) {
                self.records[index] = record;
            } else if let Some(slot) = added.iter_mut().find(|r| r.id == id) {
                *slot = record;
            } else {
                added.push(record);
            }
            debug!("Imported {} as {}", file.name, id);
            report.imported.push(id);
        }

        if !report.imported.is_empty() {
            added.append(&mut self.records);
            self.records = added;
            self.persist()?;
        }
        info!(
            "Import finished: {} imported, {} skipped",
            report.imported.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Export document for one record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] if there is no such record.
    pub fn export_json(&self, id: &str, embed_url: bool) -> Result<ExportedRecord> {
        let record = self.get(id).ok_or_else(|| Error::record_not_found(id))?;
        Ok(to_export_json(record, &self.base_url, embed_url))
    }

    /// Public URL, QR payload and NFC command for one record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] if there is no such record.
    pub fn share(&self, id: &str, nfc_template: &str) -> Result<SharePayload> {
        let record = self.get(id).ok_or_else(|| Error::record_not_found(id))?;
        Ok(SharePayload::new(
            &self.base_url,
            &record.id,
            &record.token,
            nfc_template,
        ))
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    fn id_taken_by_other(&self, id: &str, index: usize) -> bool {
        self.records
            .iter()
            .enumerate()
            .any(|(i, r)| i != index && r.id == id)
    }

    fn persist(&mut self) -> Result<()> {
        let serialized = serde_json::to_string(&self.records)?;
        self.store.set(RECORDS_KEY, &serialized)
    }
}

/// Read the stored record list, degrading to empty on any problem.
///
/// The flag is set when the list had to be repaired (an element got a
/// fresh id, or a duplicate was dropped) and should be written back.
fn read_records<S: KeyValueStore>(store: &S) -> (Vec<Record>, bool) {
    let raw = match store.get(RECORDS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return (Vec::new(), false),
        Err(err) => {
            warn!("Failed to read catalogue, starting empty: {}", err);
            return (Vec::new(), false);
        }
    };

    let items = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            warn!("Stored catalogue is not an array, starting empty");
            return (Vec::new(), false);
        }
        Err(err) => {
            warn!("Stored catalogue is malformed, starting empty: {}", err);
            return (Vec::new(), false);
        }
    };

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(items.len());
    let mut repaired = false;
    for item in &items {
        let fallback = new_record_id();
        let record = from_import_json(item, &fallback).into_record();
        if record.id == fallback {
            warn!("Stored record without id assigned {}", record.id);
            repaired = true;
        }
        if seen.insert(record.id.clone()) {
            records.push(record);
        } else {
            warn!("Dropping duplicate stored record {}", record.id);
            repaired = true;
        }
    }
    (records, repaired)
}
