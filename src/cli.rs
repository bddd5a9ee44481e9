use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use ocr_string_validator::config::DEFAULT_CONFIG_FILE;

#[derive(Parser, Debug)]
#[command(
    name = "ocr-validate",
    version,
    about = "Checks localized UI strings in screenshots against a test protocol"
)]
pub struct Cli {
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE, help = "Config file (JSON)")]
    pub config: PathBuf,
    #[arg(long, global = true, help = "Overrides data_dir from the config")]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run validation against the existing annotations
    Validate {
        #[arg(long, help = "Locale to validate, e.g. de-DE")]
        locale: Option<String>,
        #[arg(long, help = "Report file; its extension selects the format")]
        output: Option<PathBuf>,
        #[arg(long = "format", value_enum, help = "Report format (repeatable)")]
        formats: Vec<ReportFormat>,
        #[arg(long, help = "Also render a per-screen status chart")]
        chart: bool,
        #[arg(long, help = "Exit with status 2 unless every record passed")]
        strict: bool,
    },
    /// Record string bounding boxes for the screenshots
    Annotate {
        #[arg(long, help = "Only ask for protocol rows without coordinates")]
        missing: bool,
    },
    /// List the available matcher strategies
    Matchers,
    /// Compare two strings with one strategy
    Check {
        #[arg(long, help = "Strategy name (default: the configured one)")]
        strategy: Option<String>,
        #[arg(long, help = "Fuzzy threshold override")]
        threshold: Option<f64>,
        expected: String,
        actual: String,
    },
    /// Write a config file with every default filled in
    Init {
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Csv,
    Json,
    Html,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Html => "html",
        }
    }
}
