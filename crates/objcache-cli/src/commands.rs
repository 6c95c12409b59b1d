use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use objcache_lifecycle::CacheConfig;
use objcache_persist::{
    FsRecordStore, LoadedRecord, PersistError, PersistenceManager, RecordKey, RecordStore,
};
use objcache_types::{AgentChecksumTable, AgentId};
use serde_json::{json, Value};
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let dir = record_dir(cli.dir.as_deref(), cli.config.as_deref())?;
    debug!(dir = %dir.display(), "using record directory");
    match cli.command {
        Command::List => cmd_list(&dir, cli.format),
        Command::Inspect(args) => cmd_inspect(&dir, args, cli.format),
        Command::Purge(args) => cmd_purge(&dir, args, cli.format),
        Command::Check(args) => cmd_check(&dir, args, cli.format),
    }
}

/// `--dir` wins, then the configuration file, then the built-in default.
fn record_dir(dir: Option<&Path>, config: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(dir) = dir {
        return Ok(dir.to_path_buf());
    }
    let config = match config {
        Some(path) => CacheConfig::load(path)?,
        None => CacheConfig::default(),
    };
    Ok(config.path_to_save_files)
}

fn open(dir: &Path) -> anyhow::Result<PersistenceManager> {
    if !dir.is_dir() {
        bail!("record directory {} does not exist", dir.display());
    }
    let records = FsRecordStore::open(dir)
        .with_context(|| format!("cannot open record directory {}", dir.display()))?;
    Ok(PersistenceManager::new(Arc::new(records)))
}

/// State of one record on disk.
#[derive(Debug, PartialEq, Eq)]
enum RecordStatus {
    Entries(usize),
    Corrupt(String),
}

#[derive(Debug)]
struct RecordSummary {
    key: RecordKey,
    status: RecordStatus,
}

fn survey(manager: &PersistenceManager) -> anyhow::Result<Vec<RecordSummary>> {
    let keys = manager.records().list()?;
    let mut out = Vec::with_capacity(keys.len());
    for key in keys {
        let status = match manager.load(key.agent(), key.region()) {
            Ok(LoadedRecord::Found(table)) => RecordStatus::Entries(table.len()),
            Ok(LoadedRecord::Missing) => RecordStatus::Entries(0),
            Err(PersistError::Corrupt { source, .. }) => RecordStatus::Corrupt(source.to_string()),
            Err(e) => return Err(e).with_context(|| format!("cannot read record {key}")),
        };
        out.push(RecordSummary { key, status });
    }
    Ok(out)
}

fn summary_json(summary: &RecordSummary) -> Value {
    let mut v = json!({
        "agent": summary.key.agent().to_string(),
        "region": summary.key.region(),
        "file": summary.key.file_name(),
    });
    match &summary.status {
        RecordStatus::Entries(n) => v["entries"] = json!(n),
        RecordStatus::Corrupt(reason) => v["corrupt"] = json!(reason),
    }
    v
}

fn cmd_list(dir: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let summaries = survey(&open(dir)?)?;
    match format {
        OutputFormat::Json => {
            let list: Vec<Value> = summaries.iter().map(summary_json).collect();
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        OutputFormat::Text => {
            if summaries.is_empty() {
                println!("No records in {}", dir.display());
            }
            for s in &summaries {
                let status = match &s.status {
                    RecordStatus::Entries(n) => format!("{n} entries").normal(),
                    RecordStatus::Corrupt(_) => "corrupt".red().bold(),
                };
                println!("{}  {}  {}", s.key.agent().to_string().cyan(), s.key.region().yellow(), status);
            }
        }
    }
    Ok(())
}

fn parse_record(args: &RecordArgs) -> anyhow::Result<(AgentId, &str)> {
    let agent = AgentId::parse(&args.agent)?;
    // Validates the region the same way the store does.
    RecordKey::new(agent, &args.region)?;
    Ok((agent, &args.region))
}

fn sorted_entries(table: &AgentChecksumTable) -> Vec<(String, u32)> {
    let mut entries: Vec<_> = table
        .iter()
        .map(|(object, checksum)| (object.to_string(), checksum.get()))
        .collect();
    entries.sort();
    entries
}

fn cmd_inspect(dir: &Path, args: RecordArgs, format: OutputFormat) -> anyhow::Result<()> {
    let manager = open(dir)?;
    let (agent, region) = parse_record(&args)?;
    let table = match manager.load(agent, region)? {
        LoadedRecord::Found(table) => table,
        LoadedRecord::Missing => bail!("no record for agent {agent} in region {region}"),
    };

    let entries = sorted_entries(&table);
    match format {
        OutputFormat::Json => {
            let objects: serde_json::Map<String, Value> =
                entries.into_iter().map(|(o, c)| (o, json!(c))).collect();
            let v = json!({
                "agent": agent.to_string(),
                "region": region,
                "entries": table.len(),
                "objects": objects,
            });
            println!("{}", serde_json::to_string_pretty(&v)?);
        }
        OutputFormat::Text => {
            println!(
                "Agent {} in {}: {} entries",
                agent.to_string().cyan().bold(),
                region.yellow(),
                table.len()
            );
            for (object, checksum) in entries {
                println!("  {object}  {checksum}");
            }
        }
    }
    Ok(())
}

fn cmd_purge(dir: &Path, args: RecordArgs, format: OutputFormat) -> anyhow::Result<()> {
    let manager = open(dir)?;
    let (agent, region) = parse_record(&args)?;
    let existed = manager.purge(agent, region)?;
    match format {
        OutputFormat::Json => {
            println!("{}", json!({ "agent": agent.to_string(), "region": region, "deleted": existed }));
        }
        OutputFormat::Text if existed => {
            println!("{} Deleted record for {} in {}", "✓".green().bold(), agent.short_id(), region.yellow());
        }
        OutputFormat::Text => println!("No record for {} in {}", agent.short_id(), region.yellow()),
    }
    Ok(())
}

/// Outcome of a `check` pass.
#[derive(Debug, Default, PartialEq, Eq)]
struct CheckReport {
    healthy: usize,
    corrupt: Vec<String>,
    deleted: usize,
}

fn check(manager: &PersistenceManager, fix: bool) -> anyhow::Result<CheckReport> {
    let mut report = CheckReport::default();
    for s in survey(manager)? {
        match s.status {
            RecordStatus::Entries(_) => report.healthy += 1,
            RecordStatus::Corrupt(_) => {
                if fix && manager.purge(s.key.agent(), s.key.region())? {
                    report.deleted += 1;
                }
                report.corrupt.push(s.key.file_name());
            }
        }
    }
    Ok(report)
}

fn cmd_check(dir: &Path, args: CheckArgs, format: OutputFormat) -> anyhow::Result<()> {
    let report = check(&open(dir)?, args.fix)?;
    match format {
        OutputFormat::Json => {
            let v = json!({
                "healthy": report.healthy,
                "corrupt": report.corrupt,
                "deleted": report.deleted,
            });
            println!("{}", serde_json::to_string_pretty(&v)?);
        }
        OutputFormat::Text => {
            for name in &report.corrupt {
                println!("  {} {}", "corrupt:".red(), name);
            }
            if report.corrupt.is_empty() {
                println!("{} {} records, no issues.", "✓".green().bold(), report.healthy);
            } else {
                println!(
                    "{} healthy, {} corrupt, {} deleted",
                    report.healthy,
                    report.corrupt.len().to_string().red().bold(),
                    report.deleted
                );
            }
        }
    }
    if !report.corrupt.is_empty() && !args.fix {
        bail!("{} corrupt record(s); rerun with --fix to delete them", report.corrupt.len());
    }
    Ok(())
}
