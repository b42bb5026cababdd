use crate::pipeline::MetricsSnapshot;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Add,
    Delete,
    Modify,
    Rename,
}

/// Line contents of one file's diff, already split by the miner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineDiff {
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub deleted: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifiedFileRecord {
    #[serde(default)]
    pub old_path: Option<String>,
    #[serde(default)]
    pub new_path: Option<String>,
    pub change_kind: ChangeKind,
    /// Raw insertion count as reported by the miner. Falls back to the
    /// parsed diff when absent.
    #[serde(default)]
    pub added_lines: Option<u32>,
    #[serde(default)]
    pub deleted_lines: Option<u32>,
    /// `None` when the miner could not supply parsed hunks for this file.
    #[serde(default)]
    pub diff: Option<LineDiff>,
}

impl ModifiedFileRecord {
    pub fn new(path: &str, change_kind: ChangeKind) -> Self {
        let (old_path, new_path) = match change_kind {
            ChangeKind::Add => (None, Some(path.to_string())),
            ChangeKind::Delete => (Some(path.to_string()), None),
            ChangeKind::Modify | ChangeKind::Rename => (Some(path.to_string()), Some(path.to_string())),
        };
        Self {
            old_path,
            new_path,
            change_kind,
            added_lines: None,
            deleted_lines: None,
            diff: None,
        }
    }

    pub fn renamed(old_path: &str, new_path: &str) -> Self {
        Self {
            old_path: Some(old_path.to_string()),
            new_path: Some(new_path.to_string()),
            ..Self::new(new_path, ChangeKind::Rename)
        }
    }

    pub fn with_diff<A, D>(mut self, added: A, deleted: D) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        self.diff = Some(LineDiff {
            added: added.into_iter().map(Into::into).collect(),
            deleted: deleted.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn with_counts(mut self, added: u32, deleted: u32) -> Self {
        self.added_lines = Some(added);
        self.deleted_lines = Some(deleted);
        self
    }

    /// The path this change is attributed to: the new path, or the old one
    /// for deletions.
    pub fn path(&self) -> Option<&str> {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .filter(|p| !p.is_empty())
    }

    pub fn raw_added(&self) -> u64 {
        match (self.added_lines, &self.diff) {
            (Some(n), _) => n as u64,
            (None, Some(diff)) => diff.added.len() as u64,
            (None, None) => 0,
        }
    }

    pub fn raw_deleted(&self) -> u64 {
        match (self.deleted_lines, &self.diff) {
            (Some(n), _) => n as u64,
            (None, Some(diff)) => diff.deleted.len() as u64,
            (None, None) => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub id: String,
    pub author: String,
    #[serde(default)]
    pub author_email: Option<String>,
    pub timestamp: DateTime<FixedOffset>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub files: Vec<ModifiedFileRecord>,
}

impl CommitRecord {
    pub fn new(id: &str, author: &str, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            id: id.to_string(),
            author: author.to_string(),
            author_email: None,
            timestamp,
            repository: None,
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, file: ModifiedFileRecord) -> Self {
        self.files.push(file);
        self
    }

    pub fn with_repository(mut self, repository: &str) -> Self {
        self.repository = Some(repository.to_string());
        self
    }

    /// Metrics are keyed by display name only; same-name authors collapse.
    pub fn author_key(&self) -> &str {
        self.author.trim()
    }

    /// Calendar day in the commit's own offset.
    pub fn local_date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Envelope written by `devpace analyze` and read back by `devpace merge`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub sources: Vec<String>,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug, Clone)]
pub struct DateRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new() -> Self {
        Self { since: None, until: None }
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn contains(&self, timestamp: &DateTime<FixedOffset>) -> bool {
        let timestamp = timestamp.with_timezone(&Utc);
        if let Some(since) = self.since {
            if timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if timestamp > until {
                return false;
            }
        }
        true
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::new()
    }
}
