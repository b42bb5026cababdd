use crate::config::EngineConfig;
use crate::error::Result;
use crate::merge::{merge_snapshots, Merge};
use crate::metrics::diff_delta::DeveloperVelocity;
use crate::metrics::domain::DeveloperDomains;
use crate::metrics::hours::DeveloperHours;
use crate::metrics::lines::FileLineCounts;
use crate::metrics::timing::TimingProfile;
use crate::metrics::{
    process_batch, DiffDeltaAccumulator, DiffDeltaSnapshot, DomainAccumulator, DomainSnapshot,
    HoursAccumulator, HoursSnapshot, LineCountAccumulator, LineCountSnapshot, TimingAccumulator,
    TimingSnapshot,
};
use crate::classify::should_skip_file;
use crate::model::CommitRecord;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Input conditions that did not abort processing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub commits: u64,
    pub files_seen: u64,
    pub skipped_files: u64,
    /// Files whose parsed line contents were missing; they scored zero.
    pub unparsed_files: u64,
    /// Files with neither an old nor a new path.
    pub pathless_files: u64,
}

impl Diagnostics {
    fn observe(&mut self, commit: &CommitRecord) {
        self.commits += 1;
        for file in &commit.files {
            self.files_seen += 1;
            match file.path() {
                None => self.pathless_files += 1,
                Some(path) if should_skip_file(path) => self.skipped_files += 1,
                Some(_) if file.diff.is_none() => self.unparsed_files += 1,
                Some(_) => {}
            }
        }
    }
}

impl Merge for Diagnostics {
    fn absorb(&mut self, other: &Self) {
        self.commits += other.commits;
        self.files_seen += other.files_seen;
        self.skipped_files += other.skipped_files;
        self.unparsed_files += other.unparsed_files;
        self.pathless_files += other.pathless_files;
    }
}

/// Results of every accumulator over one batch (or a merge of batches).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub diff_delta: DiffDeltaSnapshot,
    pub hours: HoursSnapshot,
    pub timing: TimingSnapshot,
    pub lines: LineCountSnapshot,
    #[serde(default)]
    pub domains: DomainSnapshot,
    pub diagnostics: Diagnostics,
}

/// One author's slice of a snapshot, as written by NDJSON output.
#[derive(Debug, Serialize)]
pub struct AuthorMetrics<'a> {
    pub author: &'a str,
    pub diff_delta: Option<&'a DeveloperVelocity>,
    pub hours: Option<&'a DeveloperHours>,
    pub timing: Option<&'a TimingProfile>,
    pub domains: Option<&'a DeveloperDomains>,
}

impl MetricsSnapshot {
    /// Every author seen by any accumulator, in name order.
    pub fn authors(&self) -> Vec<AuthorMetrics<'_>> {
        let names: BTreeSet<&str> = self
            .diff_delta
            .developers
            .keys()
            .chain(self.hours.developers.keys())
            .chain(self.timing.developers.keys())
            .chain(self.domains.developers.keys())
            .map(String::as_str)
            .collect();

        names
            .into_iter()
            .map(|author| AuthorMetrics {
                author,
                diff_delta: self.diff_delta.developers.get(author),
                hours: self.hours.developers.get(author),
                timing: self.timing.developers.get(author),
                domains: self.domains.developers.get(author),
            })
            .collect()
    }

    pub fn file(&self, path: &str) -> Option<&FileLineCounts> {
        self.lines.files.get(&self.lines.canonical_path(path))
    }
}

impl Merge for MetricsSnapshot {
    fn absorb(&mut self, other: &Self) {
        self.diff_delta.absorb(&other.diff_delta);
        self.hours.absorb(&other.hours);
        self.timing.absorb(&other.timing);
        self.lines.absorb(&other.lines);
        self.domains.absorb(&other.domains);
        self.diagnostics.absorb(&other.diagnostics);
    }

    fn refresh(&mut self) {
        self.diff_delta.refresh();
        self.hours.refresh();
        self.timing.refresh();
        self.lines.refresh();
        self.domains.refresh();
    }
}

/// Run every accumulator over one batch of commits.
pub fn analyze(commits: &[CommitRecord], config: &EngineConfig) -> MetricsSnapshot {
    let mut diagnostics = Diagnostics::default();
    for commit in commits {
        diagnostics.observe(commit);
    }

    let snapshot = MetricsSnapshot {
        diff_delta: process_batch(DiffDeltaAccumulator::new(config), commits),
        hours: process_batch(HoursAccumulator::new(config), commits),
        timing: process_batch(TimingAccumulator::new(config), commits),
        lines: process_batch(LineCountAccumulator::new(), commits),
        domains: process_batch(DomainAccumulator::new(), commits),
        diagnostics,
    };
    debug!(
        commits = snapshot.diagnostics.commits,
        unparsed = snapshot.diagnostics.unparsed_files,
        "Analyzed batch"
    );
    snapshot
}

/// Analyze disjoint shards in parallel and merge the results.
///
/// Shards must partition the commit history; a commit present in two shards
/// is counted twice.
pub fn analyze_shards(shards: &[Vec<CommitRecord>], config: &EngineConfig) -> Result<MetricsSnapshot> {
    let partials: Vec<MetricsSnapshot> = shards
        .par_iter()
        .map(|shard| analyze(shard, config))
        .collect();
    let merged = merge(&partials)?;
    info!(
        shards = shards.len(),
        authors = merged.diff_delta.developers.len(),
        "Merged shard results"
    );
    Ok(merged)
}

/// Merge previously produced snapshots. Fails on an empty list.
pub fn merge(parts: &[MetricsSnapshot]) -> Result<MetricsSnapshot> {
    merge_snapshots(parts)
}
