use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use formscan::UnderscorePolicy;

use crate::page_range::PageSelection;

/// Detect fillable regions on flat PDF pages and turn them into form fields.
#[derive(Debug, Parser)]
#[command(name = "formscan", about, version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log filter used when RUST_LOG is unset (e.g. 'debug', 'formscan=trace')
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Detect form fields from a page manifest and print the blueprint
    Detect {
        /// Path to the page manifest (JSON)
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,

        /// Page range (e.g. '1,3-5'). Default: all pages
        #[arg(long)]
        pages: Option<PageSelection>,

        /// Write the blueprint to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Create empty text widgets in a PDF from a blueprint
    Apply {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Path to the blueprint (JSON)
        #[arg(value_name = "BLUEPRINT")]
        blueprint: PathBuf,

        /// Where to write the PDF with widgets
        #[arg(long, short)]
        output: PathBuf,
    },

    /// Set values on existing text fields
    Fill {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// JSON object mapping field names to values
        #[arg(value_name = "VALUES")]
        values: PathBuf,

        /// Where to write the filled PDF
        #[arg(long, short)]
        output: PathBuf,
    },

    /// List interactive field names in a PDF
    Fields {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// Heuristic settings: an optional JSON file plus per-field overrides.
#[derive(Debug, Clone, Default, Args)]
pub struct SettingsArgs {
    /// JSON settings file; missing keys keep their defaults
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Resolution pages are rendered at for line detection
    #[arg(long)]
    pub dpi: Option<f64>,

    /// Candidates closer than this many points are merged (default: 5.0)
    #[arg(long)]
    pub merge_tolerance: Option<f64>,

    /// Which tokens count as blanks: any, run[:N] or strict[:N] (default: run:3)
    #[arg(long)]
    pub underscore_policy: Option<UnderscorePolicy>,

    /// Width in points of the label window left of each field (default: 200)
    #[arg(long)]
    pub label_width: Option<f64>,

    /// Also propose a field to the right of every 'Label:' token
    #[arg(long)]
    pub colon_fields: bool,

    /// Analyse pages concurrently
    #[arg(long)]
    pub parallel: bool,
}

/// Output format for listing commands.
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
