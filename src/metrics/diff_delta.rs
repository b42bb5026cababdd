//! Diff delta: a weighted score approximating the cognitive load of a change.
//!
//! Only meaningful lines count. Lines that reappear on the other side of the
//! same file's diff are moves; the symmetric part of what is left is treated
//! as updates, scaled by `update_factor`.

use super::Accumulator;
use crate::classify::{should_skip_file, LineRules};
use crate::config::{DiffDeltaWeights, EngineConfig};
use crate::merge::{absorb_map, Merge};
use crate::model::{CommitRecord, ModifiedFileRecord};
use crate::moves::detect_moves;
use crate::util::{monday_week_key, ratio};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::warn;

/// Classified line counts and score for one file in one commit.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FileDelta {
    pub pure_added: u64,
    pub updated: u64,
    pub pure_deleted: u64,
    pub moved: u64,
    pub score: f64,
}

impl FileDelta {
    fn from_counts(added: usize, deleted: usize, moved: usize, weights: &DiffDeltaWeights) -> Self {
        let updates = added.min(deleted);
        let updated = (updates as f64 * weights.update_factor).trunc() as u64;
        let pure_added = (added as u64).saturating_sub(updated);
        let pure_deleted = (deleted as u64).saturating_sub(updated);
        let moved = moved as u64;

        let score = weights.add_weight * pure_added as f64
            + weights.update_weight * updated as f64
            + weights.delete_weight * pure_deleted as f64
            + weights.move_weight * moved as f64;

        Self {
            pure_added,
            updated,
            pure_deleted,
            moved,
            score,
        }
    }
}

/// Score one file record.
///
/// Skipped paths and records without parsed line contents contribute nothing.
pub fn score_file(file: &ModifiedFileRecord, config: &EngineConfig) -> FileDelta {
    let Some(path) = file.path() else {
        return FileDelta::default();
    };
    if should_skip_file(path) {
        return FileDelta::default();
    }
    let Some(diff) = &file.diff else {
        warn!(path, "No parsed diff for file; counting zero meaningful lines");
        return FileDelta::default();
    };

    let rules = LineRules::for_path(path);
    let min_length = config.classifier.min_line_length;
    let added = diff
        .added
        .iter()
        .map(String::as_str)
        .filter(|line| rules.is_meaningful(line, min_length));
    let deleted = diff
        .deleted
        .iter()
        .map(String::as_str)
        .filter(|line| rules.is_meaningful(line, min_length));

    let split = detect_moves(added, deleted);
    FileDelta::from_counts(
        split.remaining_added.len(),
        split.remaining_deleted.len(),
        split.moved,
        &config.diff_delta,
    )
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityStats {
    pub diff_delta: f64,
    pub lines_added: u64,
    pub lines_updated: u64,
    pub lines_deleted: u64,
    pub lines_moved: u64,
    pub commits: u64,
    /// Distinct non-skipped paths per commit, summed over commits.
    pub files_changed: u64,
    pub active_days: BTreeSet<NaiveDate>,
    pub velocity_per_day: f64,
}

impl VelocityStats {
    fn add_file(&mut self, delta: &FileDelta) {
        self.diff_delta += delta.score;
        self.lines_added += delta.pure_added;
        self.lines_updated += delta.updated;
        self.lines_deleted += delta.pure_deleted;
        self.lines_moved += delta.moved;
    }

    fn add_commit(&mut self, day: NaiveDate, files_changed: u64) {
        self.commits += 1;
        self.files_changed += files_changed;
        self.active_days.insert(day);
    }

    pub fn active_day_count(&self) -> usize {
        self.active_days.len()
    }
}

impl Merge for VelocityStats {
    fn absorb(&mut self, other: &Self) {
        self.diff_delta += other.diff_delta;
        self.lines_added += other.lines_added;
        self.lines_updated += other.lines_updated;
        self.lines_deleted += other.lines_deleted;
        self.lines_moved += other.lines_moved;
        self.commits += other.commits;
        self.files_changed += other.files_changed;
        self.active_days.extend(other.active_days.iter().copied());
    }

    fn refresh(&mut self) {
        self.velocity_per_day = ratio(self.diff_delta, self.active_days.len() as f64);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeveloperVelocity {
    pub totals: VelocityStats,
    /// Keyed by the Monday starting each week (`YYYY-MM-DD`).
    pub weekly: BTreeMap<String, VelocityStats>,
}

impl Merge for DeveloperVelocity {
    fn absorb(&mut self, other: &Self) {
        self.totals.absorb(&other.totals);
        absorb_map(&mut self.weekly, &other.weekly);
    }

    fn refresh(&mut self) {
        self.totals.refresh();
        self.weekly.values_mut().for_each(Merge::refresh);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffDeltaSnapshot {
    pub developers: BTreeMap<String, DeveloperVelocity>,
}

impl Merge for DiffDeltaSnapshot {
    fn absorb(&mut self, other: &Self) {
        absorb_map(&mut self.developers, &other.developers);
    }

    fn refresh(&mut self) {
        self.developers.values_mut().for_each(Merge::refresh);
    }
}

pub struct DiffDeltaAccumulator<'c> {
    config: &'c EngineConfig,
    state: DiffDeltaSnapshot,
}

impl<'c> DiffDeltaAccumulator<'c> {
    pub fn new(config: &'c EngineConfig) -> Self {
        Self {
            config,
            state: DiffDeltaSnapshot::default(),
        }
    }
}

impl Accumulator for DiffDeltaAccumulator<'_> {
    type Snapshot = DiffDeltaSnapshot;

    fn process_commit(&mut self, commit: &CommitRecord) {
        let week = monday_week_key(&commit.timestamp);
        let day = commit.local_date();
        let developer = self
            .state
            .developers
            .entry(commit.author_key().to_string())
            .or_default();
        let weekly = developer.weekly.entry(week).or_default();

        let mut touched: HashSet<&str> = HashSet::new();
        for file in &commit.files {
            let Some(path) = file.path() else { continue };
            if should_skip_file(path) {
                continue;
            }
            touched.insert(path);

            let delta = score_file(file, self.config);
            developer.totals.add_file(&delta);
            weekly.add_file(&delta);
        }

        let files_changed = touched.len() as u64;
        developer.totals.add_commit(day, files_changed);
        weekly.add_commit(day, files_changed);
    }

    fn snapshot(&self) -> DiffDeltaSnapshot {
        let mut snapshot = self.state.clone();
        snapshot.refresh();
        snapshot
    }
}
