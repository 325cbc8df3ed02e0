use std::path::PathBuf;

use clap::Parser;
use sequester_types::SizeCutoff;

#[derive(Parser, Debug)]
#[command(
    name = "git-sequester",
    about = "Move old, large blobs into a protected archival pack",
    version
)]
pub struct Cli {
    /// Commits at or after this date count as recent (any date git understands)
    #[arg(long, value_name = "DATE")]
    pub since: String,

    /// Blobs larger than this are candidates, e.g. 500k, 1M, 2G [default: 1M]
    #[arg(long, value_name = "SIZE")]
    pub size_cutoff: Option<SizeCutoff>,

    /// Redirect sequestered blobs to a placeholder, including blobs still at ref tips
    #[arg(long)]
    pub replace_objects: bool,

    /// Report what would be sequestered without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the final `git gc --aggressive --prune=now`
    #[arg(long)]
    pub no_gc: bool,

    /// Run as if started in DIR
    #[arg(short = 'C', value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Config file [default: <git-dir>/sequester.toml if present]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    #[arg(short, long)]
    pub quiet: bool,

    /// References to keep, passed to git verbatim [default: --all]
    #[arg(value_name = "REFS", allow_hyphen_values = true)]
    pub refs: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
