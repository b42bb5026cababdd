use crate::config::EngineConfig;
use crate::error::PaceError;
use crate::model::{CommitRecord, DateRange, MetricsOutput, SCHEMA_VERSION};
use crate::pipeline::{self, MetricsSnapshot};
use crate::util::parse_date;
use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "devpace")]
#[command(about = "Per-developer productivity and timing metrics from mined commit records")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a TOML file overriding engine constants")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute metrics from NDJSON commit files; each file is one shard.
    Analyze {
        #[arg(required = true, num_args = 1.., help = "NDJSON files of commit records")]
        inputs: Vec<PathBuf>,

        #[arg(long, help = "Only commits at or after this date (RFC3339 or YYYY-MM-DD)")]
        since: Option<String>,

        #[arg(long, help = "Only commits at or before this date (RFC3339 or YYYY-MM-DD)")]
        until: Option<String>,

        #[arg(long, help = "Output one line per author instead of a JSON document")]
        ndjson: bool,

        #[arg(long, short, help = "Write output to this file instead of stdout")]
        output: Option<PathBuf>,
    },
    /// Merge snapshots previously written by `analyze`.
    Merge {
        #[arg(required = true, num_args = 1.., help = "Snapshot JSON files")]
        snapshots: Vec<PathBuf>,

        #[arg(long, short, help = "Write output to this file instead of stdout")]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        crate::logging::init(self.verbose);
        let config = load_config(self.config.as_deref())?;

        match self.command {
            Commands::Analyze { inputs, since, until, ndjson, output } => {
                let range = resolve_range(since.as_deref(), until.as_deref())?;
                exec_analyze(&config, &inputs, &range, ndjson, output.as_deref())
            }
            Commands::Merge { snapshots, output } => exec_merge(&snapshots, output.as_deref()),
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    config.validate().context("Invalid engine configuration")?;
    Ok(config)
}

fn resolve_range(since: Option<&str>, until: Option<&str>) -> Result<DateRange> {
    let mut range = DateRange::new();
    if let Some(since) = since {
        range = range.with_since(parse_date(since).context("Failed to parse --since")?);
    }
    if let Some(until) = until {
        range = range.with_until(parse_date(until).context("Failed to parse --until")?);
    }
    Ok(range)
}

fn exec_analyze(
    config: &EngineConfig,
    inputs: &[PathBuf],
    range: &DateRange,
    ndjson: bool,
    output: Option<&Path>,
) -> Result<()> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    let mut shards = Vec::with_capacity(inputs.len());
    for input in inputs {
        pb.set_message(format!("Reading {}", input.display()));
        let commits = read_commits(input, range)
            .with_context(|| format!("Failed to read commits from {}", input.display()))?;
        debug!(path = %input.display(), commits = commits.len(), "Loaded shard");
        shards.push(commits);
        pb.tick();
    }
    pb.set_message("Computing metrics...");
    let metrics = pipeline::analyze_shards(&shards, config).context("Failed to compute metrics")?;
    pb.finish_and_clear();

    let sources = inputs.iter().map(|p| p.display().to_string()).collect();
    if ndjson {
        write_ndjson(&metrics, output)
    } else {
        write_json(&wrap(metrics, sources), output)
    }
}

fn exec_merge(snapshots: &[PathBuf], output: Option<&Path>) -> Result<()> {
    let mut parts = Vec::with_capacity(snapshots.len());
    let mut sources = Vec::new();
    for path in snapshots {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let stored: MetricsOutput = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
        if stored.version != SCHEMA_VERSION {
            warn!(
                path = %path.display(),
                version = stored.version,
                expected = SCHEMA_VERSION,
                "Snapshot schema version differs"
            );
        }
        sources.extend(stored.sources);
        parts.push(stored.metrics);
    }

    let merged = pipeline::merge(&parts).context("Failed to merge snapshots")?;
    write_json(&wrap(merged, sources), output)
}

/// Read one NDJSON file, dropping blank and malformed lines and commits
/// outside `range`.
fn read_commits(path: &Path, range: &DateRange) -> crate::error::Result<Vec<CommitRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut commits = Vec::new();
    let mut malformed = 0u64;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<CommitRecord>(&line) {
            Ok(commit) if range.contains(&commit.timestamp) => commits.push(commit),
            Ok(_) => {}
            Err(e) => {
                malformed += 1;
                warn!(path = %path.display(), line = index + 1, error = %e, "Skipping malformed commit record");
            }
        }
    }

    if commits.is_empty() && malformed > 0 {
        return Err(PaceError::Parse(format!(
            "no readable commit records in {} ({malformed} malformed lines)",
            path.display()
        )));
    }
    Ok(commits)
}

fn wrap(metrics: MetricsSnapshot, sources: Vec<String>) -> MetricsOutput {
    MetricsOutput {
        version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        sources,
        metrics,
    }
}

fn open_output(output: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

fn write_json(document: &MetricsOutput, output: Option<&Path>) -> Result<()> {
    let mut out = open_output(output)?;
    serde_json::to_writer_pretty(&mut out, document)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn write_ndjson(metrics: &MetricsSnapshot, output: Option<&Path>) -> Result<()> {
    let mut out = open_output(output)?;
    for author in metrics.authors() {
        writeln!(out, "{}", serde_json::to_string(&author)?)?;
    }
    out.flush()?;
    Ok(())
}
