//! Where each author's changes land: frontend, backend, tests, docs and so on.
//!
//! A path belongs to the first domain whose rules match. Test files are
//! checked before anything else, so `app.test.ts` is a test and not frontend.

use super::Accumulator;
use crate::classify::should_skip_file;
use crate::merge::{absorb_map, Merge};
use crate::model::CommitRecord;
use crate::util::monday_week_key;
use regex::RegexSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeDomain {
    Frontend,
    Backend,
    Database,
    Test,
    Docs,
    Config,
    Mobile,
    Devops,
    Other,
}

struct DomainRules {
    domain: CodeDomain,
    /// Lowercase, without the dot.
    extensions: &'static [&'static str],
    /// Exact file names.
    files: &'static [&'static str],
    /// Directory sequences, matched on whole path components.
    dirs: &'static [&'static str],
}

impl DomainRules {
    fn matches(&self, rooted: &str, file_name: &str, extension: Option<&str>) -> bool {
        extension.is_some_and(|ext| self.extensions.contains(&ext))
            || self.files.contains(&file_name)
            || self.dirs.iter().any(|dir| rooted.contains(dir))
    }
}

static TEST_FILES: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(^|/)test_[^/]*\.py$",
        r"_test\.(py|go)$",
        r"\.(test|spec)\.[jt]sx?$",
    ])
    .unwrap_or_else(|_| RegexSet::empty())
});

const TEST_DIRS: &[&str] = &["/test/", "/tests/", "/__tests__/", "/spec/"];

const RULES: &[DomainRules] = &[
    DomainRules {
        domain: CodeDomain::Frontend,
        extensions: &["js", "jsx", "ts", "tsx", "vue", "svelte", "html", "css", "scss", "sass", "less"],
        files: &["webpack.config.js", "vite.config.js", "vite.config.ts", "rollup.config.js"],
        dirs: &["/frontend/", "/client/", "/src/components/", "/src/views/", "/public/", "/static/"],
    },
    DomainRules {
        domain: CodeDomain::Backend,
        extensions: &["py", "java", "go", "rb", "php", "cs", "rs", "scala"],
        files: &["app.py", "main.py", "server.py", "api.py"],
        dirs: &["/backend/", "/server/", "/api/", "/src/controllers/", "/src/models/", "/src/services/"],
    },
    DomainRules {
        domain: CodeDomain::Database,
        extensions: &["sql", "prisma"],
        files: &[],
        dirs: &["/migrations/", "/db/", "/database/", "/schema/"],
    },
    DomainRules {
        domain: CodeDomain::Docs,
        extensions: &["md", "rst", "txt", "adoc"],
        files: &["README", "CHANGELOG", "CONTRIBUTING", "LICENSE"],
        dirs: &["/docs/", "/documentation/"],
    },
    DomainRules {
        domain: CodeDomain::Config,
        extensions: &["json", "yaml", "yml", "toml", "ini", "cfg", "conf", "env"],
        files: &["Dockerfile", "docker-compose.yml", ".gitignore", ".dockerignore", ".env", "Makefile"],
        dirs: &["/config/", "/.github/", "/.circleci/"],
    },
    DomainRules {
        domain: CodeDomain::Mobile,
        extensions: &["swift", "kt", "dart", "m", "mm"],
        files: &[],
        dirs: &["/ios/", "/android/", "/mobile/"],
    },
    DomainRules {
        domain: CodeDomain::Devops,
        extensions: &["sh", "bash", "ps1", "tf"],
        files: &["Jenkinsfile", "Vagrantfile", "Procfile", ".gitlab-ci.yml", ".travis.yml"],
        dirs: &["/scripts/", "/bin/", "/deploy/", "/terraform/", "/ansible/"],
    },
];

/// Domain of one path. Backslashes are treated as separators.
pub fn classify_domain(path: &str) -> CodeDomain {
    let normalized = path.replace('\\', "/");
    if TEST_FILES.is_match(&normalized) {
        return CodeDomain::Test;
    }

    let rooted = format!("/{normalized}");
    if TEST_DIRS.iter().any(|dir| rooted.contains(dir)) {
        return CodeDomain::Test;
    }

    let file_name = normalized.rsplit('/').next().unwrap_or(&normalized);
    let extension = file_name
        .rsplit_once('.')
        .filter(|(stem, _)| !stem.is_empty())
        .map(|(_, ext)| ext.to_ascii_lowercase());

    RULES
        .iter()
        .find(|rules| rules.matches(&rooted, file_name, extension.as_deref()))
        .map_or(CodeDomain::Other, |rules| rules.domain)
}

/// Changed lines per domain. Percentages are derived on refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainBreakdown {
    pub changes: BTreeMap<CodeDomain, u64>,
    pub total_changes: u64,
    #[serde(default)]
    pub percentages: BTreeMap<CodeDomain, f64>,
}

impl DomainBreakdown {
    fn add(&mut self, domain: CodeDomain, lines: u64) {
        *self.changes.entry(domain).or_insert(0) += lines;
        self.total_changes += lines;
    }

    /// Domain with the most changed lines; ties go to the earlier domain.
    pub fn primary(&self) -> Option<CodeDomain> {
        self.changes
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(domain, _)| *domain)
    }
}

impl Merge for DomainBreakdown {
    fn absorb(&mut self, other: &Self) {
        for (domain, lines) in &other.changes {
            *self.changes.entry(*domain).or_insert(0) += lines;
        }
        self.total_changes += other.total_changes;
    }

    fn refresh(&mut self) {
        let total = self.total_changes as f64;
        self.percentages = self
            .changes
            .iter()
            .map(|(domain, lines)| (*domain, if total > 0.0 { *lines as f64 / total * 100.0 } else { 0.0 }))
            .collect();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeveloperDomains {
    pub totals: DomainBreakdown,
    /// Keyed by the Monday starting each week (`YYYY-MM-DD`).
    pub weekly: BTreeMap<String, DomainBreakdown>,
}

impl Merge for DeveloperDomains {
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
pub struct DomainSnapshot {
    pub developers: BTreeMap<String, DeveloperDomains>,
}

impl Merge for DomainSnapshot {
    fn absorb(&mut self, other: &Self) {
        absorb_map(&mut self.developers, &other.developers);
    }

    fn refresh(&mut self) {
        self.developers.values_mut().for_each(Merge::refresh);
    }
}

#[derive(Debug, Default)]
pub struct DomainAccumulator {
    state: DomainSnapshot,
}

impl DomainAccumulator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Accumulator for DomainAccumulator {
    type Snapshot = DomainSnapshot;

    fn process_commit(&mut self, commit: &CommitRecord) {
        let week = monday_week_key(&commit.timestamp);
        for file in &commit.files {
            let Some(path) = file.path() else { continue };
            if should_skip_file(path) {
                continue;
            }
            let lines = file.raw_added() + file.raw_deleted();
            if lines == 0 {
                continue;
            }

            let domain = classify_domain(path);
            let developer = self
                .state
                .developers
                .entry(commit.author_key().to_string())
                .or_default();
            developer.totals.add(domain, lines);
            developer.weekly.entry(week.clone()).or_default().add(domain, lines);
        }
    }

    fn snapshot(&self) -> DomainSnapshot {
        let mut snapshot = self.state.clone();
        snapshot.refresh();
        snapshot
    }
}
