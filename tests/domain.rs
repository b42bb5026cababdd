mod common;

use common::{approx_eq, commit, modify, sample_history};
use devpace::merge::merge_snapshots;
use devpace::metrics::domain::{classify_domain, CodeDomain};
use devpace::metrics::{process_batch, DomainAccumulator};
use devpace::model::{ChangeKind, CommitRecord, ModifiedFileRecord};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

fn counted(path: &str, added: u32, deleted: u32) -> ModifiedFileRecord {
    ModifiedFileRecord::new(path, ChangeKind::Modify).with_counts(added, deleted)
}

#[test]
fn paths_map_to_domains() {
    for (path, domain) in [
        ("web/src/App.tsx", CodeDomain::Frontend),
        ("src/components/Button.vue", CodeDomain::Frontend),
        ("webpack.config.js", CodeDomain::Frontend),
        ("src/server/handler.go", CodeDomain::Backend),
        ("crates/core/src/lib.rs", CodeDomain::Backend),
        ("migrations/0001_init.sql", CodeDomain::Database),
        ("db/seeds.prisma", CodeDomain::Database),
        ("README.md", CodeDomain::Docs),
        ("LICENSE", CodeDomain::Docs),
        ("docs/guide/intro.rst", CodeDomain::Docs),
        ("config/app.yaml", CodeDomain::Config),
        ("Dockerfile", CodeDomain::Config),
        (".env", CodeDomain::Config),
        ("ios/App/AppDelegate.swift", CodeDomain::Mobile),
        ("android/app/Main.kt", CodeDomain::Mobile),
        ("scripts/release.sh", CodeDomain::Devops),
        ("Jenkinsfile", CodeDomain::Devops),
        ("src/main.c", CodeDomain::Other),
        ("assets/logo.bin", CodeDomain::Other),
    ] {
        assert_eq!(classify_domain(path), domain, "{path}");
    }
}

#[test]
fn test_files_win_over_their_extension() {
    for path in [
        "tests/test_parser.py",
        "pkg/parser_test.go",
        "web/src/App.test.tsx",
        "web/src/api.spec.js",
        "src/__tests__/helpers.ts",
        "crates/core/tests/merge.rs",
        "C:\\repo\\tests\\fixtures.json",
    ] {
        assert_eq!(classify_domain(path), CodeDomain::Test, "{path}");
    }
    // Only whole directory names count.
    assert_eq!(classify_domain("src/contest/score.py"), CodeDomain::Backend);
    assert_eq!(classify_domain("src/latest.py"), CodeDomain::Backend);
}

#[test]
fn totals_and_weekly_breakdowns_per_author() {
    let history = vec![
        commit("c1", "Alice", "2024-03-04T09:00:00+00:00")
            .with_file(counted("src/app.py", 6, 2))
            .with_file(counted("web/index.html", 2, 0)),
        commit("c2", "Alice", "2024-03-12T09:00:00+00:00")
            .with_file(counted("tests/test_app.py", 10, 0))
            .with_file(counted("package-lock.json", 900, 0))
            .with_file(ModifiedFileRecord::renamed("docs/a.md", "docs/b.md").with_counts(0, 0)),
    ];
    let snapshot = process_batch(DomainAccumulator::new(), &history);
    let alice = &snapshot.developers["Alice"];

    assert_eq!(
        alice.totals.changes,
        BTreeMap::from([
            (CodeDomain::Frontend, 2),
            (CodeDomain::Backend, 8),
            (CodeDomain::Test, 10),
        ])
    );
    assert_eq!(alice.totals.total_changes, 20);
    assert!(approx_eq(alice.totals.percentages[&CodeDomain::Test], 50.0));
    assert!(approx_eq(alice.totals.percentages[&CodeDomain::Frontend], 10.0));
    assert_eq!(alice.totals.primary(), Some(CodeDomain::Test));

    assert_eq!(alice.weekly.keys().collect::<Vec<_>>(), vec!["2024-03-04", "2024-03-11"]);
    let first_week = &alice.weekly["2024-03-04"];
    assert_eq!(first_week.total_changes, 10);
    assert!(approx_eq(first_week.percentages[&CodeDomain::Backend], 80.0));
    assert_eq!(alice.weekly["2024-03-11"].changes.len(), 1);
}

#[test]
fn authors_without_changed_lines_are_absent() {
    let history = vec![
        commit("c1", "Alice", "2024-03-04T09:00:00+00:00"),
        commit("c2", "Bob", "2024-03-04T10:00:00+00:00").with_file(counted("yarn.lock", 40, 3)),
        commit("c3", "Carol", "2024-03-04T11:00:00+00:00").with_file(modify("src/a.rs", &["x();"], &[])),
    ];
    let snapshot = process_batch(DomainAccumulator::new(), &history);
    assert_eq!(snapshot.developers.keys().collect::<Vec<_>>(), vec!["Carol"]);
}

#[test]
fn primary_domain_ties_go_to_the_earlier_domain() {
    let history = vec![commit("c1", "Alice", "2024-03-04T09:00:00+00:00")
        .with_file(counted("docs/intro.md", 5, 0))
        .with_file(counted("src/lib.rs", 5, 0))];
    let snapshot = process_batch(DomainAccumulator::new(), &history);
    assert_eq!(snapshot.developers["Alice"].totals.primary(), Some(CodeDomain::Backend));
}

#[test]
fn merged_percentages_come_from_summed_counts() {
    let history = sample_history();
    let (first, second): (Vec<CommitRecord>, Vec<CommitRecord>) =
        history.iter().cloned().partition(|c| c.author == "Alice");

    let unsharded = process_batch(DomainAccumulator::new(), &history);
    let merged = merge_snapshots(&[
        process_batch(DomainAccumulator::new(), &first),
        process_batch(DomainAccumulator::new(), &second),
        process_batch(DomainAccumulator::new(), &first[..2]),
    ])
    .unwrap();

    assert_eq!(merged.developers["Bob"], unsharded.developers["Bob"]);
    let alice = &merged.developers["Alice"].totals;
    // The third input repeats Alice's first two commits: 26 + 7 lines.
    assert_eq!(alice.total_changes, 33);
    assert_eq!(alice.changes[&CodeDomain::Backend], 33);
    assert!(approx_eq(alice.percentages[&CodeDomain::Backend], 100.0));
}
