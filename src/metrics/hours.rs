//! Developer hours reconstructed from commit timestamps.
//!
//! Commits closer together than `max_gap_minutes` form one session. Each
//! session is padded before the first and after the last commit, then scaled
//! by heuristics on commit count and change rate.

use super::Accumulator;
use crate::classify::should_skip_file;
use crate::config::{EngineConfig, SessionConfig};
use crate::merge::{absorb_map, Merge};
use crate::model::CommitRecord;
use crate::util::{iso_week_key, ratio};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// One commit as seen by session reconstruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineEntry {
    pub timestamp: DateTime<FixedOffset>,
    /// Raw insertions plus deletions over non-skipped files.
    pub lines_changed: u64,
}

impl TimelineEntry {
    pub fn from_commit(commit: &CommitRecord) -> Self {
        let lines_changed = commit
            .files
            .iter()
            .filter(|f| f.path().is_some_and(|p| !should_skip_file(p)))
            .map(|f| f.raw_added() + f.raw_deleted())
            .sum();
        Self {
            timestamp: commit.timestamp,
            lines_changed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// First commit minus the lead padding.
    pub start: DateTime<FixedOffset>,
    /// Last commit plus the trail padding.
    pub end: DateTime<FixedOffset>,
    pub commits: usize,
    pub lines_changed: u64,
}

impl Session {
    pub fn raw_hours(&self) -> f64 {
        (self.end - self.start).num_seconds() as f64 / 3600.0
    }

    /// Duration after the commit-count and change-rate adjustments, clamped
    /// to `[0, max_session_hours]`.
    pub fn estimated_hours(&self, config: &SessionConfig) -> f64 {
        let mut hours = self.raw_hours().max(0.0);

        if self.commits == 1 {
            hours *= config.single_commit_factor;
        } else if self.commits > config.busy_session_commits {
            hours *= config.busy_session_factor;
        }

        let changes_per_hour = self.lines_changed as f64 / hours.max(config.min_rate_hours);
        if changes_per_hour > config.high_rate_threshold {
            hours *= config.high_rate_factor;
        } else if changes_per_hour < config.low_rate_threshold {
            hours *= config.low_rate_factor;
        }

        hours.clamp(0.0, config.max_session_hours)
    }
}

struct OpenSession {
    first: DateTime<FixedOffset>,
    last: DateTime<FixedOffset>,
    commits: usize,
    lines_changed: u64,
}

impl OpenSession {
    fn start(entry: &TimelineEntry) -> Self {
        Self {
            first: entry.timestamp,
            last: entry.timestamp,
            commits: 1,
            lines_changed: entry.lines_changed,
        }
    }

    fn close(self, config: &SessionConfig) -> Session {
        Session {
            start: self.first - Duration::minutes(config.lead_minutes),
            end: self.last + Duration::minutes(config.trail_minutes),
            commits: self.commits,
            lines_changed: self.lines_changed,
        }
    }
}

enum SessionState {
    NoSession,
    InSession(OpenSession),
}

/// Group one author's commits into sessions. Entries need not be sorted.
pub fn reconstruct_sessions(entries: &[TimelineEntry], config: &SessionConfig) -> Vec<Session> {
    let mut ordered = entries.to_vec();
    ordered.sort_by_key(|e| e.timestamp);

    let max_gap = Duration::minutes(config.max_gap_minutes);
    let mut sessions = Vec::new();
    let mut state = SessionState::NoSession;

    for entry in &ordered {
        state = match state {
            SessionState::NoSession => SessionState::InSession(OpenSession::start(entry)),
            SessionState::InSession(mut open) => {
                if entry.timestamp - open.last > max_gap {
                    sessions.push(open.close(config));
                    SessionState::InSession(OpenSession::start(entry))
                } else {
                    open.last = entry.timestamp;
                    open.commits += 1;
                    open.lines_changed += entry.lines_changed;
                    SessionState::InSession(open)
                }
            }
        };
    }

    if let SessionState::InSession(open) = state {
        sessions.push(open.close(config));
    }
    sessions
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourStats {
    pub estimated_hours: f64,
    pub sessions: u64,
    pub commits: u64,
    /// Days on which a retained session started; unioned on merge.
    pub productive_days: BTreeSet<NaiveDate>,
    pub hours_per_day: f64,
}

impl HourStats {
    fn add_session(&mut self, session: &Session, hours: f64) {
        self.estimated_hours += hours;
        self.sessions += 1;
        self.commits += session.commits as u64;
        self.productive_days.insert(session.start.date_naive());
    }
}

impl Merge for HourStats {
    fn absorb(&mut self, other: &Self) {
        self.estimated_hours += other.estimated_hours;
        self.sessions += other.sessions;
        self.commits += other.commits;
        self.productive_days
            .extend(other.productive_days.iter().copied());
    }

    fn refresh(&mut self) {
        self.hours_per_day = ratio(self.estimated_hours, self.productive_days.len() as f64);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeveloperHours {
    pub totals: HourStats,
    /// Keyed by the ISO week (`YYYY-Www`) of each session's start.
    pub weekly: BTreeMap<String, HourStats>,
}

impl Merge for DeveloperHours {
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
pub struct HoursSnapshot {
    pub developers: BTreeMap<String, DeveloperHours>,
}

impl Merge for HoursSnapshot {
    fn absorb(&mut self, other: &Self) {
        absorb_map(&mut self.developers, &other.developers);
    }

    fn refresh(&mut self) {
        self.developers.values_mut().for_each(Merge::refresh);
    }
}

pub struct HoursAccumulator<'c> {
    config: &'c EngineConfig,
    timelines: BTreeMap<String, Vec<TimelineEntry>>,
}

impl<'c> HoursAccumulator<'c> {
    pub fn new(config: &'c EngineConfig) -> Self {
        Self {
            config,
            timelines: BTreeMap::new(),
        }
    }

    fn developer_hours(&self, timeline: &[TimelineEntry]) -> DeveloperHours {
        let config = &self.config.sessions;
        let min_hours = config.min_session_minutes as f64 / 60.0;
        let mut developer = DeveloperHours::default();

        for session in reconstruct_sessions(timeline, config) {
            let hours = session.estimated_hours(config);
            if hours < min_hours {
                debug!(start = %session.start, hours, "Discarding short session");
                continue;
            }
            developer.totals.add_session(&session, hours);
            developer
                .weekly
                .entry(iso_week_key(&session.start))
                .or_default()
                .add_session(&session, hours);
        }

        developer.refresh();
        developer
    }
}

impl Accumulator for HoursAccumulator<'_> {
    type Snapshot = HoursSnapshot;

    fn process_commit(&mut self, commit: &CommitRecord) {
        self.timelines
            .entry(commit.author_key().to_string())
            .or_default()
            .push(TimelineEntry::from_commit(commit));
    }

    fn snapshot(&self) -> HoursSnapshot {
        let developers = self
            .timelines
            .iter()
            .map(|(author, timeline)| (author.clone(), self.developer_hours(timeline)))
            .collect();
        HoursSnapshot { developers }
    }
}
