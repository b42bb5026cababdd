//! Per-path line counts and process metrics, independent of the weighted
//! diff-delta score.
//!
//! No-op lines here are whitespace-only, a cheaper test than the comment-aware
//! classifier. Snapshots keep every per-commit sample under the path it was
//! recorded at, plus timestamped rename events; per-path counts are derived on
//! refresh. A rename folds only samples recorded before it, so a rename seen in
//! one batch folds history from another, and a path re-created after being
//! renamed away keeps its own history.

use super::Accumulator;
use crate::classify::{is_noop, should_skip_file};
use crate::merge::Merge;
use crate::model::{ChangeKind, CommitRecord, ModifiedFileRecord};
use crate::util::ratio;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Contributors below this share of a path's churn count as minor.
pub const MINOR_CONTRIBUTOR_SHARE: f64 = 0.05;

/// Summary of one per-commit sequence of values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub total: u64,
    pub max: u64,
    pub count: u64,
    /// Derived from `total / count`; ignored when merging.
    #[serde(default)]
    pub mean: f64,
}

impl SeriesStats {
    pub fn record(&mut self, value: u64) {
        self.total += value;
        self.max = self.max.max(value);
        self.count += 1;
        self.refresh();
    }
}

impl Merge for SeriesStats {
    fn absorb(&mut self, other: &Self) {
        self.total += other.total;
        self.max = self.max.max(other.max);
        self.count += other.count;
    }

    fn refresh(&mut self) {
        self.mean = ratio(self.total as f64, self.count as f64);
    }
}

/// Position of an event in history. Commit ids break timestamp ties so every
/// batch orders events the same way.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventKey {
    pub timestamp: DateTime<FixedOffset>,
    pub commit: String,
}

impl EventKey {
    pub fn of(commit: &CommitRecord) -> Self {
        Self {
            timestamp: commit.timestamp,
            commit: commit.id.clone(),
        }
    }
}

/// One file record's contribution, under the path it was recorded at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSample {
    pub at: EventKey,
    pub author: String,
    pub added: u64,
    pub removed: u64,
    pub noop_added: u64,
    pub noop_removed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RenameEvent {
    pub at: EventKey,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileLineCounts {
    pub added: SeriesStats,
    pub removed: SeriesStats,
    pub noop_added: SeriesStats,
    pub noop_removed: SeriesStats,
    /// Distinct commits touching the path.
    pub commits: u64,
    /// Lines added plus removed, per author.
    pub contributors: BTreeMap<String, u64>,
    pub contributor_count: usize,
    pub minor_contributors: usize,
    pub total_churn: u64,
    pub net_churn: i64,
}

impl FileLineCounts {
    fn from_samples(samples: &[&LineSample]) -> Self {
        let mut counts = Self::default();
        let mut commits: HashSet<&EventKey> = HashSet::new();
        for sample in samples {
            counts.added.record(sample.added);
            counts.removed.record(sample.removed);
            counts.noop_added.record(sample.noop_added);
            counts.noop_removed.record(sample.noop_removed);
            commits.insert(&sample.at);
            *counts.contributors.entry(sample.author.clone()).or_insert(0) += sample.added + sample.removed;
        }

        counts.commits = commits.len() as u64;
        counts.total_churn = counts.added.total + counts.removed.total;
        counts.net_churn = counts.added.total as i64 - counts.removed.total as i64;
        counts.contributor_count = counts.contributors.len();
        if counts.total_churn > 0 {
            let total = counts.total_churn as f64;
            counts.minor_contributors = counts
                .contributors
                .values()
                .filter(|&&lines| (lines as f64 / total) < MINOR_CONTRIBUTOR_SHARE)
                .count();
        }
        counts
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineCountSnapshot {
    /// Raw samples keyed by the path they were recorded at.
    pub samples: BTreeMap<String, Vec<LineSample>>,
    pub renames: Vec<RenameEvent>,
    /// Distinct non-skipped paths per commit.
    pub change_sets: SeriesStats,
    /// Derived: counts per path after folding renames.
    #[serde(default)]
    pub files: BTreeMap<String, FileLineCounts>,
    /// Derived: paths whose latest event is a rename away, and where to.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

type RenameIndex<'a> = BTreeMap<&'a str, Vec<&'a RenameEvent>>;

fn rename_index(renames: &[RenameEvent]) -> RenameIndex<'_> {
    let mut index: RenameIndex<'_> = BTreeMap::new();
    for rename in renames {
        index.entry(rename.from.as_str()).or_default().push(rename);
    }
    for events in index.values_mut() {
        events.sort_by(|a, b| a.at.cmp(&b.at));
    }
    index
}

/// Follow every rename that happened after `at`, starting from `path`.
/// Each hop moves strictly forward in time, so the walk ends.
fn owner_of<'a>(index: &RenameIndex<'a>, path: &'a str, at: &'a EventKey) -> &'a str {
    let mut current = path;
    let mut since = at;
    while let Some(next) = index
        .get(current)
        .and_then(|events| events.iter().find(|e| e.at > *since))
    {
        current = next.to.as_str();
        since = &next.at;
    }
    current
}

impl LineCountSnapshot {
    /// Follow recorded aliases from `path` to its latest name.
    pub fn canonical_path(&self, path: &str) -> String {
        let mut current = path;
        let mut seen: HashSet<&str> = HashSet::from([path]);
        while let Some(next) = self.aliases.get(current) {
            if !seen.insert(next.as_str()) {
                break;
            }
            current = next.as_str();
        }
        current.to_string()
    }

    fn record(&mut self, at: &EventKey, author: &str, file: &ModifiedFileRecord) {
        let Some(path) = file.path() else { return };
        if should_skip_file(path) {
            return;
        }

        if let (ChangeKind::Rename, Some(old)) = (file.change_kind, file.old_path.as_deref()) {
            if old != path {
                self.renames.push(RenameEvent {
                    at: at.clone(),
                    from: old.to_string(),
                    to: path.to_string(),
                });
            }
        }

        let (noop_added, noop_removed) = match &file.diff {
            Some(diff) => (
                diff.added.iter().filter(|l| is_noop(l)).count() as u64,
                diff.deleted.iter().filter(|l| is_noop(l)).count() as u64,
            ),
            None => (0, 0),
        };
        self.samples.entry(path.to_string()).or_default().push(LineSample {
            at: at.clone(),
            author: author.to_string(),
            added: file.raw_added(),
            removed: file.raw_deleted(),
            noop_added,
            noop_removed,
        });
    }

    fn derive_files(&self) -> BTreeMap<String, FileLineCounts> {
        let index = rename_index(&self.renames);
        let mut grouped: BTreeMap<&str, Vec<&LineSample>> = BTreeMap::new();
        for (path, samples) in &self.samples {
            for sample in samples {
                let owner = owner_of(&index, path.as_str(), &sample.at);
                if owner != path {
                    debug!(from = %path, into = owner, "Folding renamed file history");
                }
                grouped.entry(owner).or_default().push(sample);
            }
        }
        grouped
            .into_iter()
            .map(|(path, samples)| (path.to_string(), FileLineCounts::from_samples(&samples)))
            .collect()
    }

    fn derive_aliases(&self) -> BTreeMap<String, String> {
        let mut aliases = BTreeMap::new();
        for (from, events) in rename_index(&self.renames) {
            let Some(latest) = events.last() else { continue };
            let recreated = self
                .samples
                .get(from)
                .is_some_and(|samples| samples.iter().any(|s| s.at > latest.at));
            if !recreated {
                aliases.insert(from.to_string(), latest.to.clone());
            }
        }
        aliases
    }
}

impl Merge for LineCountSnapshot {
    fn absorb(&mut self, other: &Self) {
        for (path, samples) in &other.samples {
            self.samples
                .entry(path.clone())
                .or_default()
                .extend(samples.iter().cloned());
        }
        self.renames.extend(other.renames.iter().cloned());
        self.change_sets.absorb(&other.change_sets);
    }

    fn refresh(&mut self) {
        // Stable sort: samples of one commit keep their recorded order.
        for samples in self.samples.values_mut() {
            samples.sort_by(|a, b| a.at.cmp(&b.at));
        }
        self.renames.sort();
        self.renames.dedup();
        self.change_sets.refresh();
        self.files = self.derive_files();
        self.aliases = self.derive_aliases();
    }
}

#[derive(Debug, Default)]
pub struct LineCountAccumulator {
    state: LineCountSnapshot,
}

impl LineCountAccumulator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Accumulator for LineCountAccumulator {
    type Snapshot = LineCountSnapshot;

    fn process_commit(&mut self, commit: &CommitRecord) {
        let at = EventKey::of(commit);
        let mut touched: HashSet<&str> = HashSet::new();
        for file in &commit.files {
            if let Some(path) = file.path().filter(|p| !should_skip_file(p)) {
                touched.insert(path);
            }
            self.state.record(&at, commit.author_key(), file);
        }
        self.state.change_sets.record(touched.len() as u64);
    }

    fn snapshot(&self) -> LineCountSnapshot {
        let mut snapshot = self.state.clone();
        snapshot.refresh();
        snapshot
    }
}
