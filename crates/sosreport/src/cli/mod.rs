//! Command-line interface for the `sosrep` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, DistressTypeArg, ListCommand, OutputFormat, SubmitCommand};

/// sosrep - Send and review emergency SOS reports
///
/// Submits a report with the caller's details, position, an optional voice
/// note and images, and lists submitted reports newest first.
#[derive(Debug, Parser)]
#[command(name = "sosrep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
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
    /// Send an SOS report
    Submit(SubmitCommand),

    /// List submitted reports, newest first
    List(ListCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
        assert_eq!(Cli::command().get_name(), "sosrep");
    }

    #[test]
    fn test_verbosity() {
        use crate::logging::Verbosity;

        assert_eq!(parse(&["sosrep", "list"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["sosrep", "-v", "list"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["sosrep", "-vv", "list"]).verbosity(), Verbosity::Trace);
        assert_eq!(parse(&["sosrep", "-q", "-v", "list"]).verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_parse_submit() {
        let cli = parse(&[
            "sosrep",
            "submit",
            "--name",
            "John Doe",
            "--phone",
            "1234567890",
            "-t",
            "security",
            "-i",
            "a.png",
            "--image",
            "b.jpg",
            "--latitude",
            "-33.9",
            "--longitude",
            "18.4",
        ]);
        let Command::Submit(cmd) = cli.command else {
            panic!("expected submit");
        };
        assert_eq!(cmd.name, "John Doe");
        assert_eq!(cmd.phone, "1234567890");
        assert_eq!(cmd.distress_type, DistressTypeArg::Security);
        assert_eq!(cmd.images, [PathBuf::from("a.png"), PathBuf::from("b.jpg")]);
        assert_eq!(cmd.latitude, Some(-33.9));
        assert_eq!(cmd.longitude, Some(18.4));
        assert!(!cmd.dry_run);
        assert!(cmd.voice.is_none());
    }

    #[test]
    fn test_submit_defaults() {
        let Command::Submit(cmd) = parse(&["sosrep", "submit"]).command else {
            panic!("expected submit");
        };
        assert_eq!(cmd.distress_type, DistressTypeArg::Medical);
        assert!(cmd.name.is_empty());
        assert!(cmd.images.is_empty());
    }

    #[test]
    fn test_latitude_requires_longitude() {
        assert!(Cli::try_parse_from(["sosrep", "submit", "--latitude", "1"]).is_err());
    }

    #[test]
    fn test_parse_list() {
        let Command::List(cmd) = parse(&["sosrep", "list", "-f", "html", "--utc"]).command else {
            panic!("expected list");
        };
        assert_eq!(cmd.format, OutputFormat::Html);
        assert!(cmd.utc);
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["sosrep", "-c", "/custom/config.toml", "list"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_config_validate() {
        let cli = parse(&["sosrep", "config", "validate", "--file", "x.toml"]);
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }
}
