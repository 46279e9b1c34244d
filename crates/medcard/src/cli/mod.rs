//! Command-line interface for medcard.
//!
//! This module provides the CLI structure for the `medcard` binary. Each
//! subcommand stands in for one view of the card editor: the table, the
//! edit form, the share view, the import/export toolbar.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    BaseUrlCommand, ConfigCommand, CreateCommand, DeleteCommand, EditCommand, ExportCommand,
    ExportRecordCommand, ImportCommand, ListCommand, OutputFormat, RecordFields, ShareCommand,
    ShowCommand,
};

use crate::logging::Verbosity;

/// medcard - Manage NFC-linked medical cards
///
/// Keeps a local catalogue of medical cards, exports them as JSON for the
/// public viewer, and prints the URL to encode on each card's QR code or
/// NFC tag.
#[derive(Debug, Parser)]
#[command(name = "medcard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the catalogue database (overrides configuration)
    #[arg(long, global = true, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List all cards
    List(ListCommand),

    /// Show one card
    Show(ShowCommand),

    /// Create a new card and print its id
    Create(CreateCommand),

    /// Edit a card
    Edit(EditCommand),

    /// Delete a card
    Delete(DeleteCommand),

    /// Import cards from JSON files
    Import(ImportCommand),

    /// Export all cards as a ZIP archive
    Export(ExportCommand),

    /// Export one card as JSON
    ExportRecord(ExportRecordCommand),

    /// Show the public URL, QR payload and NFC command for a card
    Share(ShareCommand),

    /// View or change the public viewer base URL
    #[command(subcommand)]
    BaseUrl(BaseUrlCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args.iter().copied()).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "medcard");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["medcard", "-q", "list"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["medcard", "list"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["medcard", "-vv", "list"]).verbosity(), Verbosity::Debug);
    }

    #[test]
    fn test_parse_list_default_format() {
        let cli = parse(&["medcard", "list"]);
        match cli.command {
            Command::List(cmd) => assert_eq!(cmd.format, OutputFormat::Table),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_edit_fields() {
        let cli = parse(&[
            "medcard",
            "edit",
            "abc123",
            "--name",
            "Jeanne",
            "--new-id",
            "jeanne",
            "--allergies",
            "pollen\nnoix",
        ]);
        let Command::Edit(cmd) = cli.command else {
            panic!("expected edit");
        };
        assert_eq!(cmd.id, "abc123");
        assert_eq!(cmd.fields.name.as_deref(), Some("Jeanne"));
        assert_eq!(cmd.fields.new_id.as_deref(), Some("jeanne"));
        assert_eq!(cmd.fields.allergies.as_deref(), Some("pollen\nnoix"));
    }

    #[test]
    fn test_token_conflicts_with_clear_token() {
        let result = Cli::try_parse_from([
            "medcard",
            "edit",
            "abc",
            "--token",
            "t",
            "--clear-token",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_import_requires_paths() {
        assert!(Cli::try_parse_from(["medcard", "import"]).is_err());
        let cli = parse(&["medcard", "import", "a.json", "dir"]);
        let Command::Import(cmd) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(cmd.paths, vec![PathBuf::from("a.json"), PathBuf::from("dir")]);
    }

    #[test]
    fn test_parse_base_url_set() {
        let cli = parse(&["medcard", "base-url", "set", "cards.example.org"]);
        assert!(matches!(
            cli.command,
            Command::BaseUrl(BaseUrlCommand::Set { ref url }) if url == "cards.example.org"
        ));
    }

    #[test]
    fn test_parse_export_record() {
        let cli = parse(&["medcard", "export-record", "abc", "-o", "/tmp/out"]);
        let Command::ExportRecord(cmd) = cli.command else {
            panic!("expected export-record");
        };
        assert_eq!(cmd.out, Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn test_parse_global_options() {
        let cli = parse(&[
            "medcard",
            "-c",
            "/custom/config.toml",
            "--database",
            "/tmp/cards.db",
            "share",
            "abc",
            "--copy",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert_eq!(cli.database, Some(PathBuf::from("/tmp/cards.db")));
        assert!(matches!(cli.command, Command::Share(ShareCommand { copy: true, .. })));
    }
}
