//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::record::{EmergencyContact, Record};

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Record id
    pub id: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Field edits shared by `create` and `edit`.
///
/// Only the flags given are applied; everything else is left as is.
#[derive(Debug, Default, Args)]
pub struct RecordFields {
    /// New record id
    #[arg(long = "new-id", value_name = "ID")]
    pub new_id: Option<String>,

    /// Access token appended to the public URL
    #[arg(long, conflicts_with = "clear_token")]
    pub token: Option<String>,

    /// Remove the access token
    #[arg(long)]
    pub clear_token: bool,

    /// Full name
    #[arg(long)]
    pub name: Option<String>,

    /// Postal address
    #[arg(long)]
    pub address: Option<String>,

    /// Phone number
    #[arg(long)]
    pub phone: Option<String>,

    /// Blood group
    #[arg(long)]
    pub blood_type: Option<String>,

    /// Ongoing treatments
    #[arg(long)]
    pub treatments: Option<String>,

    /// Allergies, one per line
    #[arg(long, value_name = "LINES")]
    pub allergies: Option<String>,

    /// Medications, one per line
    #[arg(long, value_name = "LINES")]
    pub medications: Option<String>,

    /// Emergency contact name
    #[arg(long)]
    pub contact_name: Option<String>,

    /// Emergency contact phone
    #[arg(long)]
    pub contact_phone: Option<String>,
}

impl RecordFields {
    /// Whether any field flag was given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.new_id.is_none()
            && self.token.is_none()
            && !self.clear_token
            && self.name.is_none()
            && self.address.is_none()
            && self.phone.is_none()
            && self.blood_type.is_none()
            && self.treatments.is_none()
            && self.allergies.is_none()
            && self.medications.is_none()
            && self.contact_name.is_none()
            && self.contact_phone.is_none()
    }

    /// Apply the given flags to a record.
    pub fn apply(&self, record: &mut Record) {
        fn set(target: &mut String, value: Option<&String>) {
            if let Some(value) = value {
                target.clone_from(value);
            }
        }

        set(&mut record.id, self.new_id.as_ref());
        set(&mut record.token, self.token.as_ref());
        if self.clear_token {
            record.token.clear();
        }
        set(&mut record.name, self.name.as_ref());
        set(&mut record.address, self.address.as_ref());
        set(&mut record.phone, self.phone.as_ref());
        set(&mut record.blood_type, self.blood_type.as_ref());
        set(&mut record.treatments, self.treatments.as_ref());
        if let Some(text) = &self.allergies {
            record.set_allergies_text(text);
        }
        if let Some(text) = &self.medications {
            record.set_medications_text(text);
        }
        if self.contact_name.is_some() || self.contact_phone.is_some() {
            let current = &record.emergency_contact;
            record.emergency_contact = EmergencyContact::new(
                self.contact_name.clone().unwrap_or_else(|| current.name.clone()),
                self.contact_phone
                    .clone()
                    .unwrap_or_else(|| current.phone.clone()),
            );
        }
    }
}

/// Create command arguments.
#[derive(Debug, Args)]
pub struct CreateCommand {
    /// Initial field values
    #[command(flatten)]
    pub fields: RecordFields,
}

/// Edit command arguments.
#[derive(Debug, Args)]
pub struct EditCommand {
    /// Id of the record to edit
    pub id: String,

    /// Field values to change
    #[command(flatten)]
    pub fields: RecordFields,
}

/// Delete command arguments.
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Id of the record to delete
    pub id: String,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Import command arguments.
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// JSON files, directories of JSON files, or exported archives
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,
}

/// Archive export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Directory to write the archive to (defaults to `export.output_dir`)
    #[arg(short, long, value_name = "DIR")]
    pub out: Option<PathBuf>,
}

/// Single-record JSON export arguments.
#[derive(Debug, Args)]
pub struct ExportRecordCommand {
    /// Record id
    pub id: String,

    /// Directory to write `{id}.json` to; prints to stdout when omitted
    #[arg(short, long, value_name = "DIR")]
    pub out: Option<PathBuf>,
}

/// Share command arguments.
#[derive(Debug, Args)]
pub struct ShareCommand {
    /// Record id
    pub id: String,

    /// Copy the public URL to the clipboard
    #[arg(long)]
    pub copy: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Base URL commands.
#[derive(Debug, Subcommand)]
pub enum BaseUrlCommand {
    /// Print the active base URL
    Get,

    /// Set the base URL of the public viewer
    Set {
        /// Base URL; `https://` is added when no scheme is given
        url: String,
    },

    /// Revert to the configured default base URL
    Reset,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One id per line
    Plain,
    /// Formatted table
    #[default]
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }

    #[test]
    fn test_record_fields_empty() {
        assert!(RecordFields::default().is_empty());
        let fields = RecordFields {
            clear_token: true,
            ..RecordFields::default()
        };
        assert!(!fields.is_empty());
    }

    #[test]
    fn test_apply_only_given_fields() {
        let mut record = Record::new("abc");
        record.phone = "0600".to_string();
        record.token = "old".to_string();

        let fields = RecordFields {
            name: Some("Jeanne".to_string()),
            allergies: Some("pollen\n\nnoix\n".to_string()),
            medications: Some("  metformin \n".to_string()),
            clear_token: true,
            ..RecordFields::default()
        };
        fields.apply(&mut record);

        assert_eq!(record.id, "abc");
        assert_eq!(record.name, "Jeanne");
        assert_eq!(record.phone, "0600");
        assert!(record.token.is_empty());
        assert_eq!(record.allergies, vec!["pollen", "noix"]);
        assert_eq!(record.medications, vec!["metformin"]);
    }

    #[test]
    fn test_apply_partial_contact_keeps_other_half() {
        let mut record = Record::new("abc");
        record.emergency_contact = EmergencyContact::new("Paul", "06");

        let fields = RecordFields {
            contact_phone: Some("07".to_string()),
            ..RecordFields::default()
        };
        fields.apply(&mut record);

        assert_eq!(record.emergency_contact, EmergencyContact::new("Paul", "07"));
    }

    #[test]
    fn test_apply_new_id() {
        let mut record = Record::new("abc");
        let fields = RecordFields {
            new_id: Some("jeanne".to_string()),
            ..RecordFields::default()
        };
        fields.apply(&mut record);
        assert_eq!(record.id, "jeanne");
    }
}
