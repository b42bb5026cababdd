//! Temporal patterns of each author's activity.
//!
//! Only `basic_stats`, `daily_patterns`, `weekly_patterns` and the commit rate
//! in `rhythm_analysis` recombine exactly when profiles for the same author are
//! merged. The remaining sections summarise medians, maxima and streaks that
//! cannot be rebuilt from per-shard summaries; merging them is a coarse
//! sum / max-of-maxes / weighted mean and flips their `provenance` to
//! approximate.

use super::Accumulator;
use crate::classify::should_skip_file;
use crate::config::{EngineConfig, TimingConfig};
use crate::merge::{absorb_map, Merge, Provenance};
use crate::model::CommitRecord;
use crate::util::{iso_week_key_for_date, ratio};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const SECONDS_PER_HOUR: f64 = 3600.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub lines_changed: u64,
    pub files_changed: u64,
    pub repository: Option<String>,
}

impl ActivityRecord {
    pub fn from_commit(commit: &CommitRecord) -> Self {
        let mut lines_changed = 0;
        let mut files_changed = 0;
        for file in &commit.files {
            if file.path().is_some_and(|p| !should_skip_file(p)) {
                lines_changed += file.raw_added() + file.raw_deleted();
                files_changed += 1;
            }
        }
        Self {
            timestamp: commit.timestamp,
            lines_changed,
            files_changed,
            repository: commit.repository.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicStats {
    pub total_commits: u64,
    pub repositories: BTreeSet<String>,
    pub total_repos: usize,
    pub first_commit_date: DateTime<FixedOffset>,
    pub last_commit_date: DateTime<FixedOffset>,
    /// Fractional days between the first and last activity.
    pub total_span_days: f64,
    pub commits_per_day: f64,
    pub total_lines_changed: u64,
    pub total_files_changed: u64,
}

impl BasicStats {
    fn refresh(&mut self) {
        self.total_repos = self.repositories.len();
        let span_seconds = (self.last_commit_date - self.first_commit_date).num_seconds();
        self.total_span_days = span_seconds.max(0) as f64 / SECONDS_PER_DAY;
        self.commits_per_day = self.total_commits as f64 / self.total_span_days.max(1.0);
    }

    /// Calendar days from first to last activity, both inclusive, at least 1.
    pub fn inclusive_span_days(&self) -> i64 {
        let days = (self.last_commit_date.date_naive() - self.first_commit_date.date_naive()).num_days();
        (days + 1).max(1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingPatterns {
    pub interval_count: u64,
    pub mean_interval_hours: f64,
    pub median_interval_hours: f64,
    pub min_interval_minutes: f64,
    pub max_interval_days: f64,
    pub provenance: Provenance,
}

impl TimingPatterns {
    fn from_intervals(intervals: &[f64]) -> Self {
        if intervals.is_empty() {
            return Self::default();
        }
        let mut sorted = intervals.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };
        let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;

        Self {
            interval_count: sorted.len() as u64,
            mean_interval_hours: mean / SECONDS_PER_HOUR,
            median_interval_hours: median / SECONDS_PER_HOUR,
            min_interval_minutes: sorted[0] / 60.0,
            max_interval_days: sorted[sorted.len() - 1] / SECONDS_PER_DAY,
            provenance: Provenance::Exact,
        }
    }

    fn absorb(&mut self, other: &Self) {
        if other.interval_count > 0 {
            if self.interval_count == 0 {
                self.min_interval_minutes = other.min_interval_minutes;
            } else {
                self.min_interval_minutes = self.min_interval_minutes.min(other.min_interval_minutes);
            }
            self.max_interval_days = self.max_interval_days.max(other.max_interval_days);
            self.mean_interval_hours = weighted_mean(
                self.mean_interval_hours,
                self.interval_count,
                other.mean_interval_hours,
                other.interval_count,
            );
            // Medians do not combine; keep the last merged input's value.
            self.median_interval_hours = other.median_interval_hours;
            self.interval_count += other.interval_count;
        }
        self.provenance = Provenance::Approximate;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSessionSummary {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub length_hours: f64,
    pub commits: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkSessions {
    pub session_count: u64,
    pub avg_session_length_hours: f64,
    pub max_session_length_hours: f64,
    pub avg_commits_per_session: f64,
    pub max_commits_per_session: u64,
    /// Most recent sessions, oldest first.
    pub recent: Vec<WorkSessionSummary>,
    pub provenance: Provenance,
}

impl WorkSessions {
    fn from_activities(activities: &[ActivityRecord], config: &TimingConfig) -> Self {
        let gap_seconds = (config.session_gap_hours * SECONDS_PER_HOUR) as i64;
        let mut sessions: Vec<WorkSessionSummary> = Vec::new();

        for activity in activities {
            match sessions.last_mut() {
                Some(current) if (activity.timestamp - current.end).num_seconds() <= gap_seconds => {
                    current.end = activity.timestamp;
                    current.commits += 1;
                }
                _ => sessions.push(WorkSessionSummary {
                    start: activity.timestamp,
                    end: activity.timestamp,
                    length_hours: 0.0,
                    commits: 1,
                }),
            }
        }
        for session in &mut sessions {
            session.length_hours = (session.end - session.start).num_seconds() as f64 / SECONDS_PER_HOUR;
        }

        if sessions.is_empty() {
            return Self::default();
        }
        let count = sessions.len() as f64;
        let keep_from = sessions.len().saturating_sub(config.recent_sessions);
        Self {
            session_count: sessions.len() as u64,
            avg_session_length_hours: sessions.iter().map(|s| s.length_hours).sum::<f64>() / count,
            max_session_length_hours: sessions.iter().map(|s| s.length_hours).fold(0.0, f64::max),
            avg_commits_per_session: sessions.iter().map(|s| s.commits).sum::<u64>() as f64 / count,
            max_commits_per_session: sessions.iter().map(|s| s.commits).max().unwrap_or(0),
            recent: sessions.split_off(keep_from),
            provenance: Provenance::Exact,
        }
    }

    fn absorb(&mut self, other: &Self) {
        self.avg_session_length_hours = weighted_mean(
            self.avg_session_length_hours,
            self.session_count,
            other.avg_session_length_hours,
            other.session_count,
        );
        self.avg_commits_per_session = weighted_mean(
            self.avg_commits_per_session,
            self.session_count,
            other.avg_commits_per_session,
            other.session_count,
        );
        self.session_count += other.session_count;
        self.max_session_length_hours = self.max_session_length_hours.max(other.max_session_length_hours);
        self.max_commits_per_session = self.max_commits_per_session.max(other.max_commits_per_session);

        let keep = self.recent.len().max(other.recent.len());
        self.recent.extend(other.recent.iter().cloned());
        self.recent.sort_by_key(|s| s.start);
        let drop = self.recent.len().saturating_sub(keep);
        self.recent.drain(..drop);

        self.provenance = Provenance::Approximate;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyPatterns {
    /// Commit counts indexed by weekday, 0 = Monday.
    pub day_distribution: [u64; 7],
    pub peak_day: usize,
    pub peak_day_count: u64,
}

impl DailyPatterns {
    fn refresh(&mut self) {
        // Strict comparison keeps the lowest weekday on ties.
        let (mut peak_day, mut peak_count) = (0, 0);
        for (day, &count) in self.day_distribution.iter().enumerate() {
            if count > peak_count {
                peak_day = day;
                peak_count = count;
            }
        }
        self.peak_day = peak_day;
        self.peak_day_count = peak_count;
    }
}

/// Activity counts per ISO week. The histogram is kept, so merges are exact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPatterns {
    /// Activities per ISO week (`YYYY-Www`).
    pub week_distribution: BTreeMap<String, u64>,
    pub total_weeks: u64,
    pub avg_activities_per_week: f64,
    pub max_activities_per_week: u64,
    pub min_activities_per_week: u64,
}

impl WeeklyPatterns {
    fn from_activities(activities: &[ActivityRecord]) -> Self {
        let mut patterns = Self::default();
        for activity in activities {
            *patterns
                .week_distribution
                .entry(iso_week_key_for_date(activity.timestamp.date_naive()))
                .or_insert(0) += 1;
        }
        patterns.refresh();
        patterns
    }

    fn absorb(&mut self, other: &Self) {
        for (week, count) in &other.week_distribution {
            *self.week_distribution.entry(week.clone()).or_insert(0) += count;
        }
    }

    fn refresh(&mut self) {
        let weeks = &self.week_distribution;
        let total: u64 = weeks.values().sum();
        self.total_weeks = weeks.len() as u64;
        self.avg_activities_per_week = ratio(total as f64, weeks.len() as f64);
        self.max_activities_per_week = weeks.values().copied().max().unwrap_or(0);
        self.min_activities_per_week = weeks.values().copied().min().unwrap_or(0);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DowntimeAnalysis {
    pub interval_count: u64,
    pub short_breaks_count: u64,
    pub long_breaks_count: u64,
    pub avg_break_hours: f64,
    pub provenance: Provenance,
}

impl DowntimeAnalysis {
    fn from_intervals(intervals: &[f64], config: &TimingConfig) -> Self {
        let hours: Vec<f64> = intervals.iter().map(|s| s / SECONDS_PER_HOUR).collect();
        Self {
            interval_count: hours.len() as u64,
            short_breaks_count: hours.iter().filter(|&&h| h <= config.short_break_hours).count() as u64,
            long_breaks_count: hours.iter().filter(|&&h| h > config.long_break_hours).count() as u64,
            avg_break_hours: ratio(hours.iter().sum(), hours.len() as f64),
            provenance: Provenance::Exact,
        }
    }

    fn absorb(&mut self, other: &Self) {
        self.avg_break_hours = weighted_mean(
            self.avg_break_hours,
            self.interval_count,
            other.avg_break_hours,
            other.interval_count,
        );
        self.interval_count += other.interval_count;
        self.short_breaks_count += other.short_breaks_count;
        self.long_breaks_count += other.long_breaks_count;
        self.provenance = Provenance::Approximate;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RhythmAnalysis {
    pub span_days: i64,
    pub activities_per_day: f64,
    pub consistency_score: f64,
    /// Follows `work_sessions`, since the consistency score divides its count.
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SustainedActivity {
    pub total_active_days: u64,
    pub max_consecutive_days: u64,
    pub avg_activities_per_active_day: f64,
    pub provenance: Provenance,
}

impl SustainedActivity {
    fn from_activities(activities: &[ActivityRecord]) -> Self {
        let days: BTreeSet<NaiveDate> = activities.iter().map(|a| a.timestamp.date_naive()).collect();
        if days.is_empty() {
            return Self::default();
        }

        let mut longest = 1u64;
        let mut current = 1u64;
        let mut previous: Option<NaiveDate> = None;
        for &day in &days {
            if let Some(prev) = previous {
                if (day - prev).num_days() == 1 {
                    current += 1;
                    longest = longest.max(current);
                } else {
                    current = 1;
                }
            }
            previous = Some(day);
        }

        Self {
            total_active_days: days.len() as u64,
            max_consecutive_days: longest,
            avg_activities_per_active_day: activities.len() as f64 / days.len() as f64,
            provenance: Provenance::Exact,
        }
    }

    fn absorb(&mut self, other: &Self) {
        self.total_active_days += other.total_active_days;
        self.max_consecutive_days = self.max_consecutive_days.max(other.max_consecutive_days);
        self.provenance = Provenance::Approximate;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingProfile {
    pub basic_stats: BasicStats,
    pub timing_patterns: TimingPatterns,
    pub work_sessions: WorkSessions,
    pub daily_patterns: DailyPatterns,
    pub weekly_patterns: WeeklyPatterns,
    pub downtime_analysis: DowntimeAnalysis,
    pub rhythm_analysis: RhythmAnalysis,
    pub sustained_activity: SustainedActivity,
}

impl TimingProfile {
    /// Build a profile from one author's activities. Returns `None` when
    /// there are none.
    pub fn from_activities(activities: &[ActivityRecord], config: &TimingConfig) -> Option<Self> {
        let mut ordered = activities.to_vec();
        ordered.sort_by_key(|a| a.timestamp);
        let first = ordered.first()?.timestamp;
        let last = ordered.last()?.timestamp;

        let intervals: Vec<f64> = ordered
            .windows(2)
            .map(|pair| (pair[1].timestamp - pair[0].timestamp).num_seconds() as f64)
            .collect();

        let mut day_distribution = [0u64; 7];
        for activity in &ordered {
            day_distribution[activity.timestamp.weekday().num_days_from_monday() as usize] += 1;
        }

        let mut profile = Self {
            basic_stats: BasicStats {
                total_commits: ordered.len() as u64,
                repositories: ordered.iter().filter_map(|a| a.repository.clone()).collect(),
                total_repos: 0,
                first_commit_date: first,
                last_commit_date: last,
                total_span_days: 0.0,
                commits_per_day: 0.0,
                total_lines_changed: ordered.iter().map(|a| a.lines_changed).sum(),
                total_files_changed: ordered.iter().map(|a| a.files_changed).sum(),
            },
            timing_patterns: TimingPatterns::from_intervals(&intervals),
            work_sessions: WorkSessions::from_activities(&ordered, config),
            daily_patterns: DailyPatterns {
                day_distribution,
                ..DailyPatterns::default()
            },
            weekly_patterns: WeeklyPatterns::from_activities(&ordered),
            downtime_analysis: DowntimeAnalysis::from_intervals(&intervals, config),
            rhythm_analysis: RhythmAnalysis::default(),
            sustained_activity: SustainedActivity::from_activities(&ordered),
        };
        profile.refresh();
        Some(profile)
    }

    /// Whether every section of this profile is exact.
    pub fn is_exact(&self) -> bool {
        [
            self.timing_patterns.provenance,
            self.work_sessions.provenance,
            self.downtime_analysis.provenance,
            self.rhythm_analysis.provenance,
            self.sustained_activity.provenance,
        ]
        .into_iter()
        .all(Provenance::is_exact)
    }
}

impl Merge for TimingProfile {
    fn absorb(&mut self, other: &Self) {
        let basic = &mut self.basic_stats;
        let incoming = &other.basic_stats;
        basic.total_commits += incoming.total_commits;
        basic.total_lines_changed += incoming.total_lines_changed;
        basic.total_files_changed += incoming.total_files_changed;
        basic.repositories.extend(incoming.repositories.iter().cloned());
        basic.first_commit_date = basic.first_commit_date.min(incoming.first_commit_date);
        basic.last_commit_date = basic.last_commit_date.max(incoming.last_commit_date);

        for (count, extra) in self
            .daily_patterns
            .day_distribution
            .iter_mut()
            .zip(other.daily_patterns.day_distribution)
        {
            *count += extra;
        }

        self.timing_patterns.absorb(&other.timing_patterns);
        self.work_sessions.absorb(&other.work_sessions);
        self.weekly_patterns.absorb(&other.weekly_patterns);
        self.downtime_analysis.absorb(&other.downtime_analysis);
        self.sustained_activity.absorb(&other.sustained_activity);
    }

    fn refresh(&mut self) {
        self.basic_stats.refresh();
        self.daily_patterns.refresh();
        self.weekly_patterns.refresh();

        let span_days = self.basic_stats.inclusive_span_days();
        self.rhythm_analysis = RhythmAnalysis {
            span_days,
            activities_per_day: self.basic_stats.total_commits as f64 / span_days as f64,
            consistency_score: self.work_sessions.session_count as f64 / span_days as f64,
            provenance: self.work_sessions.provenance,
        };

        self.sustained_activity.avg_activities_per_active_day = ratio(
            self.basic_stats.total_commits as f64,
            self.sustained_activity.total_active_days as f64,
        );
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingSnapshot {
    pub developers: BTreeMap<String, TimingProfile>,
}

impl Merge for TimingSnapshot {
    fn absorb(&mut self, other: &Self) {
        absorb_map(&mut self.developers, &other.developers);
    }

    fn refresh(&mut self) {
        self.developers.values_mut().for_each(Merge::refresh);
    }
}

pub struct TimingAccumulator<'c> {
    config: &'c EngineConfig,
    activities: BTreeMap<String, Vec<ActivityRecord>>,
}

impl<'c> TimingAccumulator<'c> {
    pub fn new(config: &'c EngineConfig) -> Self {
        Self {
            config,
            activities: BTreeMap::new(),
        }
    }
}

impl Accumulator for TimingAccumulator<'_> {
    type Snapshot = TimingSnapshot;

    fn process_commit(&mut self, commit: &CommitRecord) {
        self.activities
            .entry(commit.author_key().to_string())
            .or_default()
            .push(ActivityRecord::from_commit(commit));
    }

    fn snapshot(&self) -> TimingSnapshot {
        let developers = self
            .activities
            .iter()
            .filter_map(|(author, activities)| {
                TimingProfile::from_activities(activities, &self.config.timing)
                    .map(|profile| (author.clone(), profile))
            })
            .collect();
        TimingSnapshot { developers }
    }
}

fn weighted_mean(a: f64, a_weight: u64, b: f64, b_weight: u64) -> f64 {
    ratio(
        a * a_weight as f64 + b * b_weight as f64,
        (a_weight + b_weight) as f64,
    )
}
