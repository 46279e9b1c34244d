//! `medcard` - CLI for the medical card catalogue
//!
//! This binary provides the command-line interface for creating, editing,
//! sharing, importing and exporting medical cards.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;

use medcard::archive::write_archive;
use medcard::cli::{
    BaseUrlCommand, Cli, Command, ConfigCommand, CreateCommand, DeleteCommand, EditCommand,
    ExportCommand, ExportRecordCommand, ImportCommand, ListCommand, OutputFormat, ShareCommand,
    ShowCommand,
};
use medcard::record::join_lines;
use medcard::{clipboard, import, init_logging, Catalogue, Config, Record, SqliteStore};

type Cards = Catalogue<SqliteStore>;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let mut config = Config::load_from(cli.config.clone())?;
    if let Some(path) = cli.database.clone() {
        config.storage.database_path = Some(path);
    }

    // Config commands never touch the catalogue
    if let Command::Config(config_cmd) = cli.command {
        return handle_config(&config, config_cmd);
    }

    // Open the catalogue
    let store = SqliteStore::open(config.database_path())?;
    let mut cards = Catalogue::load_with_default(store, &config.site.default_base_url);

    // Execute the command
    match cli.command {
        Command::List(cmd) => handle_list(&cards, &cmd),
        Command::Show(cmd) => handle_show(&cards, &cmd),
        Command::Create(cmd) => handle_create(&mut cards, &cmd),
        Command::Edit(cmd) => handle_edit(&mut cards, &cmd),
        Command::Delete(cmd) => handle_delete(&mut cards, &cmd),
        Command::Import(cmd) => handle_import(&mut cards, &cmd),
        Command::Export(cmd) => handle_export(&cards, &config, &cmd),
        Command::ExportRecord(cmd) => handle_export_record(&cards, &config, &cmd),
        Command::Share(cmd) => handle_share(&cards, &config, &cmd),
        Command::BaseUrl(cmd) => handle_base_url(&mut cards, cmd),
        Command::Config(_) => unreachable!("handled before the store is opened"),
    }
}

fn handle_list(cards: &Cards, cmd: &ListCommand) -> anyhow::Result<()> {
    match cmd.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(cards.records())?);
        }
        OutputFormat::Plain => {
            for record in cards.records() {
                println!("{}", record.id);
            }
        }
        OutputFormat::Table => {
            println!("{:<16} {:<28} {:<16} {:<6} UPDATED", "ID", "NAME", "PHONE", "BLOOD");
            for record in cards.records() {
                println!(
                    "{:<16} {:<28} {:<16} {:<6} {}",
                    record.id,
                    truncate(&record.name, 28),
                    truncate(&record.phone, 16),
                    record.blood_type,
                    record.last_update
                );
            }
            println!();
            println!("{} card(s), base URL {}", cards.len(), cards.base_url());
        }
    }
    Ok(())
}

fn handle_show(cards: &Cards, cmd: &ShowCommand) -> anyhow::Result<()> {
    let record = cards
        .get(&cmd.id)
        .ok_or_else(|| medcard::Error::record_not_found(&cmd.id))?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }

    println!("Card {}", record.id);
    println!("=====");
    println!("Name:          {}", record.name);
    println!("Address:       {}", record.address);
    println!("Phone:         {}", record.phone);
    println!("Blood type:    {}", record.blood_type);
    println!("Treatments:    {}", record.treatments);
    print_list("Allergies:", &record.allergies);
    print_list("Medications:", &record.medications);
    println!(
        "Emergency:     {} {}",
        record.emergency_contact.name, record.emergency_contact.phone
    );
    println!(
        "Token:         {}",
        if record.has_token() { "set" } else { "none" }
    );
    println!("Last update:   {}", record.last_update);
    Ok(())
}

fn handle_create(cards: &mut Cards, cmd: &CreateCommand) -> anyhow::Result<()> {
    let mut id = cards.create()?;
    if !cmd.fields.is_empty() {
        id = apply_and_save(cards, &id, &cmd.fields)?;
    }
    println!("{id}");
    Ok(())
}

fn handle_edit(cards: &mut Cards, cmd: &EditCommand) -> anyhow::Result<()> {
    if cmd.fields.is_empty() {
        bail!("nothing to change; pass at least one field flag (see --help)");
    }
    let id = apply_and_save(cards, &cmd.id, &cmd.fields)?;
    if id == cmd.id {
        println!("Saved {id}");
    } else {
        println!("Saved {} as {id}", cmd.id);
    }
    Ok(())
}

fn apply_and_save(
    cards: &mut Cards,
    id: &str,
    fields: &medcard::cli::RecordFields,
) -> anyhow::Result<String> {
    let mut record: Record = cards
        .get(id)
        .cloned()
        .ok_or_else(|| medcard::Error::record_not_found(id))?;
    fields.apply(&mut record);
    Ok(cards.save(id, record)?)
}

fn handle_delete(cards: &mut Cards, cmd: &DeleteCommand) -> anyhow::Result<()> {
    if !cmd.yes {
        println!("This will permanently delete card {}.", cmd.id);
        println!("Use --yes to confirm.");
        return Ok(());
    }
    if cards.delete(&cmd.id)? {
        println!("Deleted {}", cmd.id);
    } else {
        println!("No card with id {}", cmd.id);
    }
    Ok(())
}

fn handle_import(cards: &mut Cards, cmd: &ImportCommand) -> anyhow::Result<()> {
    // Unreadable inputs are reported alongside unparsable ones
    let gathered = import::gather(&cmd.paths);
    let report = cards.import_batch(gathered.files)?;

    println!("Imported {} card(s)", report.imported.len());
    for skipped in gathered.skipped.iter().chain(&report.skipped) {
        println!("  skipped {}: {}", skipped.name, skipped.reason);
    }
    Ok(())
}

fn handle_export(cards: &Cards, config: &Config, cmd: &ExportCommand) -> anyhow::Result<()> {
    let out_dir = cmd
        .out
        .clone()
        .unwrap_or_else(|| config.export.output_dir.clone());

    // Archive writing is the only async step
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let path = runtime.block_on(write_archive(
        cards.records().to_vec(),
        cards.base_url().to_string(),
        config.archive_options(),
        &out_dir,
    ))?;

    println!("Exported {} card(s) to {}", cards.len(), path.display());
    Ok(())
}

fn handle_export_record(
    cards: &Cards,
    config: &Config,
    cmd: &ExportRecordCommand,
) -> anyhow::Result<()> {
    let document = cards.export_json(&cmd.id, config.site.embed_url)?;
    let body = serde_json::to_string_pretty(&document)?;

    match &cmd.out {
        None => println!("{body}"),
        Some(dir) => {
            let path = dir.join(medcard::archive::entry_file_name(&cmd.id));
            write_file(&path, &body)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

fn handle_share(cards: &Cards, config: &Config, cmd: &ShareCommand) -> anyhow::Result<()> {
    let share = cards.share(&cmd.id, &config.site.nfc_command)?;

    if cmd.copy {
        clipboard::copy_text(&share.public_url)?;
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&share)?);
    } else {
        println!("Public URL:  {}", share.public_url);
        println!("QR payload:  {}", share.qr_payload);
        println!("NFC command: {}", share.nfc_command);
        if cmd.copy {
            println!();
            println!("URL copied to clipboard.");
        }
    }
    Ok(())
}

fn handle_base_url(cards: &mut Cards, cmd: BaseUrlCommand) -> anyhow::Result<()> {
    match cmd {
        BaseUrlCommand::Get => println!("{}", cards.base_url()),
        BaseUrlCommand::Set { url } => {
            let url = cards.set_base_url(&url)?;
            println!("Base URL set to {url}");
        }
        BaseUrlCommand::Reset => {
            cards.reset_base_url()?;
            println!("Base URL reset to {}", cards.base_url());
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Site]");
                println!("  Default base URL:   {}", config.site.default_base_url);
                println!("  Embed URL:          {}", config.site.embed_url);
                println!("  NFC command:        {}", config.site.nfc_command);
                println!();
                println!("[Export]");
                println!("  Archive folder:     {}", config.export.folder);
                println!(
                    "  Output directory:   {}",
                    config.export.output_dir.display()
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn print_list(label: &str, items: &[String]) {
    if items.is_empty() {
        println!("{label:<15}");
        return;
    }
    for (i, line) in join_lines(items).lines().enumerate() {
        let label = if i == 0 { label } else { "" };
        println!("{label:<15}{line}");
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn write_file(path: &Path, body: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
}
