pub mod diff_delta;
pub mod domain;
pub mod hours;
pub mod lines;
pub mod timing;

pub use diff_delta::{DiffDeltaAccumulator, DiffDeltaSnapshot};
pub use domain::{DomainAccumulator, DomainSnapshot};
pub use hours::{HoursAccumulator, HoursSnapshot};
pub use lines::{LineCountAccumulator, LineCountSnapshot};
pub use timing::{TimingAccumulator, TimingSnapshot};

use crate::merge::Merge;
use crate::model::CommitRecord;

/// A single-owner consumer of one ordered batch of commits.
///
/// `snapshot` may be called at any point; the partial state it returns is
/// complete and mergeable, so a caller can stop feeding commits early.
pub trait Accumulator {
    type Snapshot: Merge;

    fn process_commit(&mut self, commit: &CommitRecord);

    fn snapshot(&self) -> Self::Snapshot;
}

/// Feed a whole batch through a fresh accumulator.
pub fn process_batch<'a, A, I>(mut accumulator: A, commits: I) -> A::Snapshot
where
    A: Accumulator,
    I: IntoIterator<Item = &'a CommitRecord>,
{
    for commit in commits {
        accumulator.process_commit(commit);
    }
    accumulator.snapshot()
}
