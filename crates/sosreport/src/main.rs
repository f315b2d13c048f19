//! `sosrep` - CLI for sosreport
//!
//! Sends SOS reports and lists the ones already sent.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Local, Utc};
use clap::Parser;

use sosreport::backend::Backends;
use sosreport::cli::{Cli, Command, ConfigCommand, ListCommand, OutputFormat, SubmitCommand};
use sosreport::config::BackendKind;
use sosreport::form::{FormInput, MediaFile};
use sosreport::geolocation::FixedGeolocator;
use sosreport::listing::fetch_reports;
use sosreport::microphone::FileMicrophone;
use sosreport::recorder::{NoVoiceNote, Recorder, VoiceNoteSource};
use sosreport::render::{cards, render_html, render_json, render_text};
use sosreport::report::Location;
use sosreport::ui::{ConsoleNotifier, ConsoleTimer, Notifier};
use sosreport::{init_logging, Config, Submitter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let quiet = cli.quiet;
    let config_path = cli.config;
    match cli.command {
        Command::Submit(cmd) => handle_submit(&Config::load_from(config_path)?, cmd, quiet).await,
        Command::List(cmd) => handle_list(&Config::load_from(config_path)?, &cmd).await,
        Command::Config(cmd) => handle_config(config_path, cmd),
    }
}

async fn record_voice_note(
    config: &Config,
    backends: &Backends,
    notifier: Arc<dyn Notifier>,
    path: PathBuf,
    quiet: bool,
) -> Arc<dyn VoiceNoteSource> {
    let recorder = Recorder::new(
        Arc::new(FileMicrophone::new(
            Some(path),
            config.recording.chunk_size,
            config.recording.bytes_per_sec,
        )),
        backends.blobs.clone(),
        notifier,
        Arc::new(ConsoleTimer::new(quiet)),
        config.countdown(),
    );

    // A microphone failure has already been reported; the report still goes
    // out, just without a voice note.
    if recorder.start().await.is_ok() {
        recorder.wait_idle().await;
    }
    if !quiet {
        eprintln!();
    }
    Arc::new(recorder)
}

async fn handle_submit(config: &Config, cmd: SubmitCommand, quiet: bool) -> anyhow::Result<()> {
    let dry_run = cmd.dry_run || config.backend.kind == BackendKind::Memory;
    let backends = if dry_run {
        Backends::in_memory()
    } else {
        Backends::from_config(config)?
    };
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);

    let mut images = Vec::with_capacity(cmd.images.len());
    for path in &cmd.images {
        let file = MediaFile::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        images.push(file);
    }

    let voice_note: Arc<dyn VoiceNoteSource> = match cmd.voice {
        Some(path) => record_voice_note(config, &backends, notifier.clone(), path, quiet).await,
        None => Arc::new(NoVoiceNote),
    };

    let position = match (cmd.latitude, cmd.longitude) {
        (Some(latitude), Some(longitude)) => Some(Location::new(latitude, longitude)),
        _ => config.geolocation.location(),
    };

    let form = FormInput {
        caller_name: cmd.name,
        caller_number: cmd.phone,
        distress_type: cmd.distress_type.into(),
        images,
    };

    let submitter = Submitter::new(
        Arc::new(form),
        Arc::new(FixedGeolocator::from_option(position)),
        voice_note,
        backends.blobs.clone(),
        backends.documents.clone(),
        notifier,
    )
    .with_settings(config.report.clone());

    let submission = submitter.submit().await?;
    if dry_run {
        println!(
            "{}",
            render_json(std::slice::from_ref(&submission.report))?
        );
    } else {
        println!("{}", submission.id);
    }
    Ok(())
}

async fn handle_list(config: &Config, cmd: &ListCommand) -> anyhow::Result<()> {
    let backends = Backends::from_config(config)?;
    let reports = fetch_reports(backends.documents.as_ref(), &config.report.collection).await;

    let output = match cmd.format {
        OutputFormat::Json => render_json(&reports)?,
        OutputFormat::Plain | OutputFormat::Html => {
            let cards = if cmd.utc {
                cards(&reports, &Utc)
            } else {
                cards(&reports, &Local)
            };
            if cmd.format == OutputFormat::Html {
                render_html(&cards)
            } else {
                render_text(&cards)
            }
        }
    };
    print!("{output}");
    Ok(())
}

fn mask(secret: &str) -> &str {
    if secret.is_empty() {
        "(unset)"
    } else {
        "********"
    }
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path)?;
            if json {
                let mut shown = config.clone();
                if !shown.backend.firebase.api_key.is_empty() {
                    shown.backend.firebase.api_key = mask("set").to_string();
                }
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                let firebase = &config.backend.firebase;
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Backend]");
                println!("  Kind:               {}", config.backend.kind);
                println!("  Data directory:     {}", config.data_dir().display());
                println!("  Database path:      {}", config.database_path().display());
                println!("  Firebase project:   {}", firebase.project_id);
                println!("  Firebase API key:   {}", mask(&firebase.api_key));
                println!("  Storage bucket:     {}", firebase.storage_bucket);
                println!();
                println!("[Report]");
                println!("  Collection:         {}", config.report.collection);
                println!("  Message:            {}", config.report.message);
                println!();
                println!("[Recording]");
                println!("  Countdown (secs):   {}", config.recording.countdown_secs);
                println!("  Chunk size:         {}", config.recording.chunk_size);
                println!("  Raw byte rate:      {}", config.recording.bytes_per_sec);
                println!();
                println!("[Geolocation]");
                match config.geolocation.location() {
                    Some(location) => println!(
                        "  Position:           {}, {}",
                        location.latitude, location.longitude
                    ),
                    None => println!("  Position:           (unset)"),
                }
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            validate_config(path)?;
        }
    }
    Ok(())
}

fn validate_config(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating configuration: {}", path.display());
    Config::load_from(Some(path)).context("configuration is invalid")?;
    println!("Configuration is valid.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[recording]\ncountdown_secs = 15\n").unwrap();

        assert!(validate_config(path).is_ok());
    }

    #[test]
    fn test_validate_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[recording]\ncountdown_secs = 0\n").unwrap();

        let err = validate_config(path).unwrap_err();
        assert!(err.to_string().contains("configuration is invalid"));
        assert!(format!("{err:#}").contains("countdown_secs"));
    }

    #[test]
    fn test_validate_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[recording\n").unwrap();

        assert!(validate_config(path).is_err());
    }
}
