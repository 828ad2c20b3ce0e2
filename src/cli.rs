use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::parsers::browser::BrowserKind;

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum MetadataBackend {
    Jsonl,
    Csv,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    /// Chrome, Edge, Brave and other Chromium `History` files
    Chromium,
    /// Safari `History.db`
    Safari,
}

impl From<Browser> for BrowserKind {
    fn from(browser: Browser) -> Self {
        match browser {
            Browser::Chromium => BrowserKind::Chromium,
            Browser::Safari => BrowserKind::Safari,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliOptions {
    /// Browser history database (SQLite)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Schema of the history database
    #[arg(short, long, value_enum, default_value_t = Browser::Chromium)]
    pub browser: Browser,

    /// Output directory for session reports
    #[arg(short, long, default_value = "./output")]
    pub output: PathBuf,

    /// Optional path to config file (YAML)
    #[arg(long)]
    pub config_path: Option<PathBuf>,

    /// Number of worker threads used for per-domain segmentation
    #[arg(long, default_value_t = num_cpus::get())]
    pub workers: usize,

    /// Session gap in minutes (overrides config when set)
    #[arg(long)]
    pub gap_minutes: Option<u32>,

    /// Rare-domain threshold (overrides config when set)
    #[arg(long)]
    pub visit_threshold: Option<u64>,

    /// Visits listed after each search (overrides config when set)
    #[arg(long)]
    pub lookahead: Option<usize>,

    /// Report backend
    #[arg(long, value_enum, default_value_t = MetadataBackend::Jsonl)]
    pub metadata_backend: MetadataBackend,

    /// Also write the decoded visit list
    #[arg(long)]
    pub write_visits: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

pub fn parse() -> CliOptions {
    CliOptions::parse()
}
