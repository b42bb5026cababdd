#![allow(dead_code)]

use chrono::{DateTime, FixedOffset};
use devpace::model::{ChangeKind, CommitRecord, ModifiedFileRecord};

pub fn at(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

pub fn commit(id: &str, author: &str, timestamp: &str) -> CommitRecord {
    CommitRecord::new(id, author, at(timestamp))
}

pub fn modify(path: &str, added: &[&str], deleted: &[&str]) -> ModifiedFileRecord {
    ModifiedFileRecord::new(path, ChangeKind::Modify)
        .with_diff(added.iter().copied(), deleted.iter().copied())
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Two authors over three ISO weeks, with every gap between weeks far
/// larger than any session threshold.
pub fn sample_history() -> Vec<CommitRecord> {
    vec![
        commit("c01", "Alice", "2024-03-04T09:00:00+00:00").with_file(modify(
            "src/app.py",
            &["x = compute(y, z)", "total = x + 1", "# note", "import os"],
            &[],
        )),
        commit("c02", "Alice", "2024-03-04T10:30:00+00:00").with_file(modify(
            "src/app.py",
            &["total = x + 2", "print(total)"],
            &["total = x + 1"],
        )),
        commit("c03", "Bob", "2024-03-05T14:00:00+01:00")
            .with_file(modify("lib/utils.ts", &["export const a = 1;", "}"], &[]))
            .with_file(modify("package-lock.json", &["\"lockfileVersion\": 3"], &[])),
        commit("c04", "Alice", "2024-03-06T16:00:00+00:00")
            .with_file(modify("src/app.py", &["return total"], &["print(total)"]))
            .with_repository("svc"),
        commit("c05", "Bob", "2024-03-12T09:00:00+01:00").with_file(modify(
            "lib/utils.ts",
            &["export const b = 2;"],
            &["export const a = 1;"],
        )),
        commit("c06", "Bob", "2024-03-12T09:40:00+01:00")
            .with_file(ModifiedFileRecord::renamed("lib/utils.ts", "lib/helpers.ts").with_counts(0, 0)),
        commit("c07", "Alice", "2024-03-13T11:00:00+00:00").with_file(modify(
            "src/app.py",
            &["def main():", "    run()"],
            &["return total"],
        )),
        commit("c08", "Alice", "2024-03-20T08:00:00+00:00")
            .with_file(ModifiedFileRecord::new("src/new.py", ChangeKind::Add).with_counts(12, 0)),
        commit("c09", "Bob", "2024-03-21T17:00:00+01:00").with_file(modify(
            "lib/helpers.ts",
            &["export const c = 3;", "export const d = 4;"],
            &[],
        )),
        commit("c10", "Alice", "2024-03-21T09:00:00+00:00")
            .with_file(modify("src/app.py", &["    log(run())"], &["    run()"]))
            .with_repository("web"),
    ]
}
