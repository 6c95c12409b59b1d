use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "objcache",
    about = "Inspect and maintain object cache checkpoint records",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Record directory; overrides the configuration file
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// TOML configuration file with an [object_cache] section
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// List every record with its entry count
    List,
    /// Print the entries of one record
    Inspect(RecordArgs),
    /// Delete one record
    Purge(RecordArgs),
    /// Decode every record and report corrupt ones
    Check(CheckArgs),
}

#[derive(Args)]
pub struct RecordArgs {
    /// Agent UUID
    #[arg(long)]
    pub agent: String,
    /// Region name
    #[arg(long)]
    pub region: String,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Delete corrupt records
    #[arg(long)]
    pub fix: bool,
}
