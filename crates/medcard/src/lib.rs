//! `medcard` - catalogue manager for NFC-linked medical cards
//!
//! This library keeps a catalogue of medical cards in a key-value store,
//! converts cards to and from the JSON documents read by the public viewer,
//! builds the public URL encoded on each card's QR code and NFC tag, and
//! bundles the catalogue into ZIP archives.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod archive;
pub mod catalogue;
pub mod cli;
pub mod clipboard;
pub mod codec;
pub mod config;
pub mod error;
pub mod id;
pub mod import;
pub mod logging;
pub mod record;
pub mod store;
pub mod url;

pub use catalogue::{Catalogue, ImportFile, ImportReport, SkippedFile};
pub use codec::{from_import_json, to_export_json, Decoded, ExportedRecord};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::{EmergencyContact, Record};
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
pub use url::{build_public_url, SharePayload};
