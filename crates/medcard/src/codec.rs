//! JSON export and import of records.
//!
//! Export produces the flat JSON document consumed by the public viewer.
//! Import is deliberately forgiving: any JSON value decodes to a record,
//! with each field type-checked on its own and falling back to its default.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::record::{now_timestamp, EmergencyContact, Record};
use crate::url::build_public_url;

/// The JSON document written for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedRecord {
    /// Full name.
    pub name: String,
    /// Postal address.
    pub address: String,
    /// Phone number.
    pub phone: String,
    /// Blood group.
    pub blood_type: String,
    /// Allergies.
    pub allergies: Vec<String>,
    /// Ongoing treatments.
    pub treatments: String,
    /// Medications.
    pub medications: Vec<String>,
    /// Emergency contact, always present.
    pub emergency_contact: EmergencyContact,
    /// Last save time.
    pub last_update: String,
    /// Access token, only when non-empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Public URL, only when embedding is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Outcome of decoding an imported JSON value.
///
/// Decoding never fails; the variant records whether the input had the
/// expected shape at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// The input was a JSON object; fields were read from it.
    Complete(Record),
    /// The input was not an object; every field holds its default.
    Defaulted(Record),
}

impl Decoded {
    /// The decoded record, whichever way it was produced.
    #[must_use]
    pub fn into_record(self) -> Record {
        match self {
            Self::Complete(record) | Self::Defaulted(record) => record,
        }
    }

    /// True when the input was not a JSON object.
    #[must_use]
    pub fn is_defaulted(&self) -> bool {
        matches!(self, Self::Defaulted(_))
    }
}

/// Build the export document for a record.
///
/// `base_url` is used only when `embed_url` is set.
#[must_use]
pub fn to_export_json(record: &Record, base_url: &str, embed_url: bool) -> ExportedRecord {
    let last_update = if record.last_update.is_empty() {
        now_timestamp()
    } else {
        record.last_update.clone()
    };

    ExportedRecord {
        name: record.name.clone(),
        address: record.address.clone(),
        phone: record.phone.clone(),
        blood_type: record.blood_type.clone(),
        allergies: record.allergies.clone(),
        treatments: record.treatments.clone(),
        medications: record.medications.clone(),
        emergency_contact: record.emergency_contact.clone(),
        last_update,
        token: record.has_token().then(|| record.token.clone()),
        url: embed_url.then(|| build_public_url(base_url, &record.id, &record.token)),
    }
}

// Accepted keys per field, preferred spelling first.
const ID_KEYS: &[&str] = &["id"];
const TOKEN_KEYS: &[&str] = &["token"];
const NAME_KEYS: &[&str] = &["name", "nom"];
const ADDRESS_KEYS: &[&str] = &["address", "adresse"];
const PHONE_KEYS: &[&str] = &["phone", "telephone", "tel"];
const BLOOD_TYPE_KEYS: &[&str] = &["bloodType", "groupeSanguin", "groupe_sanguin"];
const ALLERGIES_KEYS: &[&str] = &["allergies"];
const TREATMENTS_KEYS: &[&str] = &["treatments", "traitements"];
const MEDICATIONS_KEYS: &[&str] = &["medications", "medicaments"];
const CONTACT_KEYS: &[&str] = &["emergencyContact", "contactUrgence", "contact_urgence"];
const LAST_UPDATE_KEYS: &[&str] = &["lastUpdate", "derniereMiseAJour"];

/// Decode an arbitrary JSON value into a record.
///
/// The id comes from a non-blank `id` string in the value, else
/// `fallback_id`. Unknown keys are ignored.
#[must_use]
pub fn from_import_json(value: &Value, fallback_id: &str) -> Decoded {
    let Value::Object(obj) = value else {
        return Decoded::Defaulted(Record::new(fallback_id));
    };

    let id = lookup(obj, ID_KEYS)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(fallback_id)
        .to_string();

    let last_update = lookup(obj, LAST_UPDATE_KEYS)
        .and_then(Value::as_str)
        .map_or_else(now_timestamp, ToString::to_string);

    Decoded::Complete(Record {
        id,
        token: string_field(obj, TOKEN_KEYS),
        name: string_field(obj, NAME_KEYS),
        address: string_field(obj, ADDRESS_KEYS),
        phone: string_field(obj, PHONE_KEYS),
        blood_type: string_field(obj, BLOOD_TYPE_KEYS),
        allergies: list_field(obj, ALLERGIES_KEYS),
        treatments: string_field(obj, TREATMENTS_KEYS),
        medications: list_field(obj, MEDICATIONS_KEYS),
        emergency_contact: contact_field(obj),
        last_update,
    })
}

/// First present key wins, so English spellings shadow the aliases.
fn lookup<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| obj.get(*key))
}

fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> String {
    lookup(obj, keys)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn list_field(obj: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    match lookup(obj, keys) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(ToString::to_string)
            .collect(),
        Some(Value::String(text)) => split_list(text),
        _ => Vec::new(),
    }
}

fn contact_field(obj: &Map<String, Value>) -> EmergencyContact {
    match lookup(obj, CONTACT_KEYS) {
        Some(Value::Object(contact)) => EmergencyContact {
            name: string_field(contact, NAME_KEYS),
            phone: string_field(contact, PHONE_KEYS),
        },
        _ => EmergencyContact::default(),
    }
}

fn list_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"[,\r\n]+").expect("separator pattern is valid"))
}

/// Split comma- or newline-delimited text into trimmed, non-empty entries.
#[must_use]
pub fn split_list(text: &str) -> Vec<String> {
    list_separator()
        .split(text)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}
