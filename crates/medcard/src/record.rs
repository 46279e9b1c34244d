//! Core record types for medcard.
//!
//! A [`Record`] is one medical card: the free-text fields shown on the
//! public viewer page, plus the opaque id and optional access token used to
//! build its public URL.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Who to call in an emergency.
///
/// Always present on a [`Record`]; an unknown contact is represented by
/// empty fields rather than by absence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyContact {
    /// Contact name.
    pub name: String,
    /// Contact phone number.
    pub phone: String,
}

impl EmergencyContact {
    /// Create a contact from a name and a phone number.
    #[must_use]
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
        }
    }

    /// True when neither field carries any text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty() && self.phone.trim().is_empty()
    }
}

/// A single medical card in the catalogue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Record {
    /// Opaque identifier, unique within the catalogue.
    pub id: String,

    /// Access token appended to the public URL. Empty means none.
    pub token: String,

    /// Full name of the card holder.
    pub name: String,

    /// Postal address.
    pub address: String,

    /// Phone number.
    pub phone: String,

    /// Blood group, free text (e.g. `O+`).
    pub blood_type: String,

    /// Known allergies, one entry per item.
    pub allergies: Vec<String>,

    /// Ongoing treatments.
    pub treatments: String,

    /// Current medications, one entry per item.
    pub medications: Vec<String>,

    /// Emergency contact.
    pub emergency_contact: EmergencyContact,

    /// RFC 3339 timestamp of the last save.
    pub last_update: String,
}

impl Record {
    /// Create an empty record with the given id, stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            last_update: now_timestamp(),
            ..Self::default()
        }
    }

    /// Refresh `last_update` to the current time.
    pub fn touch(&mut self) {
        self.last_update = now_timestamp();
    }

    /// Whether this record carries a non-empty access token.
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    /// Replace the allergies from newline-delimited text, as typed in a form.
    pub fn set_allergies_text(&mut self, text: &str) {
        self.allergies = parse_lines(text);
    }

    /// Replace the medications from newline-delimited text, as typed in a form.
    pub fn set_medications_text(&mut self, text: &str) {
        self.medications = parse_lines(text);
    }
}

/// Current UTC time in the format stored in `lastUpdate`.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Split newline-delimited text into trimmed, non-empty entries.
#[must_use]
pub fn parse_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Join entries back into the newline-delimited form used for editing.
#[must_use]
pub fn join_lines(items: &[String]) -> String {
    items.join("\n")
}
