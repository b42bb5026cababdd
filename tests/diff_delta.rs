mod common;

use common::{approx_eq, commit, modify, sample_history};
use devpace::config::EngineConfig;
use devpace::merge::Merge;
use devpace::metrics::diff_delta::{score_file, VelocityStats};
use devpace::metrics::{process_batch, Accumulator, DiffDeltaAccumulator};
use devpace::model::{ChangeKind, ModifiedFileRecord};
use pretty_assertions::assert_eq;

#[test]
fn symmetric_changes_count_as_scaled_updates() {
    let config = EngineConfig::default();
    let file = modify(
        "src/lib.rs",
        &["let a = 1;", "let b = 2;", "let c = 3;", "let d = 4;", "let e = 5;"],
        &["let a = 0;", "let b = 0;", "let c = 0;", "let d = 0;", "let e = 0;"],
    );
    let delta = score_file(&file, &config);
    assert_eq!(delta.updated, 4);
    assert_eq!(delta.pure_added, 1);
    assert_eq!(delta.pure_deleted, 1);
    assert_eq!(delta.moved, 0);
    assert!(approx_eq(delta.score, 4.25));
}

#[test]
fn trivial_lines_and_moves_are_weighted_separately() {
    let config = EngineConfig::default();
    let file = modify(
        "src/app.py",
        &["x = compute(y, z)", "total = x + 1", "# note", "import os", "print(total)"],
        &["print(total)", "y = 2"],
    );
    let delta = score_file(&file, &config);
    assert_eq!(delta.moved, 1);
    assert_eq!(delta.pure_added, 2);
    assert_eq!(delta.pure_deleted, 1);
    assert_eq!(delta.updated, 0);
    assert!(approx_eq(delta.score, 2.35));
}

#[test]
fn skipped_and_unparsed_files_score_zero() {
    let config = EngineConfig::default();
    let lock = modify("package-lock.json", &["\"version\": \"2.0.0\""], &[]);
    assert_eq!(score_file(&lock, &config).score, 0.0);

    let unparsed = ModifiedFileRecord::new("src/main.rs", ChangeKind::Modify).with_counts(40, 2);
    let delta = score_file(&unparsed, &config);
    assert_eq!(delta.pure_added, 0);
    assert_eq!(delta.score, 0.0);
}

#[test]
fn weights_come_from_config() {
    let mut config = EngineConfig::default();
    config.diff_delta.add_weight = 2.0;
    let file = modify("src/lib.rs", &["let a = 1;"], &[]);
    assert!(approx_eq(score_file(&file, &config).score, 2.0));
}

#[test]
fn totals_and_weekly_buckets_per_author() {
    let config = EngineConfig::default();
    let history = sample_history();
    let snapshot = process_batch(DiffDeltaAccumulator::new(&config), &history);

    let alice = &snapshot.developers["Alice"];
    assert!(approx_eq(alice.totals.diff_delta, 9.0));
    assert_eq!(alice.totals.commits, 6);
    assert_eq!(alice.totals.files_changed, 6);
    assert_eq!(alice.totals.active_day_count(), 5);
    assert!(approx_eq(alice.totals.velocity_per_day, 1.8));

    let first_week = &alice.weekly["2024-03-04"];
    assert!(approx_eq(first_week.diff_delta, 5.5));
    assert_eq!(first_week.commits, 3);
    assert!(approx_eq(first_week.velocity_per_day, 2.75));

    let bob = &snapshot.developers["Bob"];
    assert!(approx_eq(bob.totals.diff_delta, 4.25));
    assert_eq!(bob.totals.commits, 4);
    // The lock file in the first commit is not counted.
    assert_eq!(bob.totals.files_changed, 4);
    assert_eq!(bob.totals.active_day_count(), 3);
    assert_eq!(
        bob.weekly.keys().cloned().collect::<Vec<_>>(),
        vec!["2024-03-04", "2024-03-11", "2024-03-18"]
    );
}

#[test]
fn weekly_buckets_partition_the_totals() {
    let config = EngineConfig::default();
    let snapshot = process_batch(DiffDeltaAccumulator::new(&config), &sample_history());

    for (author, developer) in &snapshot.developers {
        let weekly = developer.weekly.values();
        let score: f64 = weekly.clone().map(|w| w.diff_delta).sum();
        assert!(approx_eq(score, developer.totals.diff_delta), "{author}");
        assert_eq!(weekly.clone().map(|w| w.lines_added).sum::<u64>(), developer.totals.lines_added);
        assert_eq!(weekly.clone().map(|w| w.lines_updated).sum::<u64>(), developer.totals.lines_updated);
        assert_eq!(weekly.clone().map(|w| w.lines_deleted).sum::<u64>(), developer.totals.lines_deleted);
        assert_eq!(weekly.clone().map(|w| w.lines_moved).sum::<u64>(), developer.totals.lines_moved);
        assert_eq!(weekly.clone().map(|w| w.commits).sum::<u64>(), developer.totals.commits);
    }
}

#[test]
fn files_are_counted_once_per_commit() {
    let config = EngineConfig::default();
    let history = vec![commit("c1", "Alice", "2024-03-04T09:00:00+00:00")
        .with_file(modify("src/lib.rs", &["let a = 1;"], &[]))
        .with_file(modify("src/lib.rs", &["let b = 2;"], &[]))
        .with_file(modify("src/main.rs", &["run();"], &[]))];
    let snapshot = process_batch(DiffDeltaAccumulator::new(&config), &history);
    assert_eq!(snapshot.developers["Alice"].totals.files_changed, 2);
}

#[test]
fn author_names_are_trimmed() {
    let config = EngineConfig::default();
    let history = vec![
        commit("c1", " Alice ", "2024-03-04T09:00:00+00:00"),
        commit("c2", "Alice", "2024-03-05T09:00:00+00:00"),
    ];
    let snapshot = process_batch(DiffDeltaAccumulator::new(&config), &history);
    assert_eq!(snapshot.developers.len(), 1);
    assert_eq!(snapshot.developers["Alice"].totals.commits, 2);
}

#[test]
fn zero_active_days_gives_zero_velocity() {
    let mut stats = VelocityStats::default();
    stats.refresh();
    assert_eq!(stats.velocity_per_day, 0.0);
}

#[test]
fn partial_snapshots_are_complete() {
    let config = EngineConfig::default();
    let history = sample_history();
    let mut accumulator = DiffDeltaAccumulator::new(&config);
    for commit in &history[..3] {
        accumulator.process_commit(commit);
    }
    let early = accumulator.snapshot();
    assert_eq!(early.developers["Alice"].totals.commits, 2);

    for commit in &history[3..] {
        accumulator.process_commit(commit);
    }
    assert_eq!(accumulator.snapshot().developers["Alice"].totals.commits, 6);
}
