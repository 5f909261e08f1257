use std::path::PathBuf;

use batch_downloader::Concurrency;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "batch-dl", version)]
pub struct Args {
    /// Optional downloader config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Spreadsheet URL or local CSV path; prompted for when omitted
    #[arg(long)]
    pub source: Option<String>,

    /// Simultaneous downloads per group (1-10)
    #[arg(long)]
    pub concurrency: Option<Concurrency>,

    /// Download only this group (case-insensitive)
    #[arg(long, conflicts_with = "all")]
    pub group: Option<String>,

    /// Download every group in the manifest
    #[arg(long)]
    pub all: bool,

    /// Root download directory; each group gets a sub-folder
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Also write the final tally as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}
