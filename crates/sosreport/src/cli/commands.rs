//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::report::DistressType;

/// Submit command arguments.
#[derive(Debug, Args)]
pub struct SubmitCommand {
    /// Caller name
    #[arg(short, long, default_value = "")]
    pub name: String,

    /// Caller phone number
    #[arg(short, long, default_value = "")]
    pub phone: String,

    /// Kind of emergency
    #[arg(short = 't', long, value_enum, default_value = "medical")]
    pub distress_type: DistressTypeArg,

    /// Image to attach (repeatable)
    #[arg(short, long = "image", value_name = "FILE")]
    pub images: Vec<PathBuf>,

    /// Audio file to record as the voice note
    #[arg(long, value_name = "FILE")]
    pub voice: Option<PathBuf>,

    /// Latitude of the caller (overrides config)
    #[arg(long, allow_hyphen_values = true, requires = "longitude")]
    pub latitude: Option<f64>,

    /// Longitude of the caller (overrides config)
    #[arg(long, allow_hyphen_values = true, requires = "latitude")]
    pub longitude: Option<f64>,

    /// Use in-memory stores and print the document instead of sending it
    #[arg(long)]
    pub dry_run: bool,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,

    /// Show call times in UTC instead of local time
    #[arg(long)]
    pub utc: bool,
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

/// Distress type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DistressTypeArg {
    /// Medical emergency
    Medical,
    /// Threat to personal safety
    Security,
    /// Fire
    Fire,
    /// Anything else
    Other,
}

impl From<DistressTypeArg> for DistressType {
    fn from(arg: DistressTypeArg) -> Self {
        match arg {
            DistressTypeArg::Medical => Self::Medical,
            DistressTypeArg::Security => Self::Security,
            DistressTypeArg::Fire => Self::Fire,
            DistressTypeArg::Other => Self::Other,
        }
    }
}

/// Output format for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text cards
    #[default]
    Plain,
    /// Standalone HTML page
    Html,
    /// JSON array
    Json,
}
