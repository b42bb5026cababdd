//! Line and file classification.
//!
//! Comment and import detection is line-local: block comments are only
//! recognised by their opening or continuation marker, never by tracking state
//! across lines.

use regex::RegexSet;
use std::collections::HashMap;
use std::sync::LazyLock;

const HASH_COMMENT: &str = r"^\s*#";
const SLASH_COMMENT: &str = r"^\s*//";
const BLOCK_COMMENT_OPEN: &str = r"^\s*/\*";
const BLOCK_COMMENT_CONT: &str = r"^\s*\*(\s|/|$)";
const MARKUP_COMMENT: &str = r"^\s*<!--";
const DASH_COMMENT: &str = r"^\s*--";
const DOCSTRING_DOUBLE: &str = r#"^\s*""""#;
const DOCSTRING_SINGLE: &str = r"^\s*'''";

const IMPORT: &str = r"^\s*import\s+";
const FROM_IMPORT: &str = r"^\s*from\s+.*\s+import";
const C_INCLUDE: &str = r#"^\s*#include\s*[<"]"#;
const USING: &str = r"^\s*using\s+.*;";
const REQUIRE_CALL: &str = r"^\s*require\s*\(";
const REQUIRE_STMT: &str = r#"^\s*require(_relative)?\s+['"]"#;
const INCLUDE: &str = r"^\s*include\s+";
const USE: &str = r"^\s*use\s+";
const PACKAGE: &str = r"^\s*package\s+";
const EXTERN_CRATE: &str = r"^\s*extern crate\s+";

const C_STYLE_COMMENTS: [&str; 3] = [SLASH_COMMENT, BLOCK_COMMENT_OPEN, BLOCK_COMMENT_CONT];

/// Language families that share comment and import syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    /// Shell, Ruby, Perl, YAML, TOML and other `#`-comment formats.
    Script,
    Rust,
    C,
    /// Java, Kotlin, Scala, Groovy.
    JavaLike,
    Go,
    JavaScript,
    CSharp,
    Php,
    /// SQL, Lua, Haskell, Elm.
    DashComment,
    Markup,
    /// Unknown extension: every known pattern applies.
    Generic,
}

impl Language {
    const ALL: [Language; 12] = [
        Language::Python,
        Language::Script,
        Language::Rust,
        Language::C,
        Language::JavaLike,
        Language::Go,
        Language::JavaScript,
        Language::CSharp,
        Language::Php,
        Language::DashComment,
        Language::Markup,
        Language::Generic,
    ];

    pub fn from_path(path: &str) -> Self {
        let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
        let ext = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
            _ => return Language::Generic,
        };

        match ext.as_str() {
            "py" | "pyi" | "pyx" => Language::Python,
            "sh" | "bash" | "zsh" | "fish" | "rb" | "pl" | "pm" | "r" | "yaml" | "yml" | "toml"
            | "cfg" | "ini" | "ex" | "exs" | "nim" | "cmake" => Language::Script,
            "rs" => Language::Rust,
            "c" | "h" | "cc" | "cpp" | "cxx" | "hpp" | "hh" | "hxx" | "m" | "mm" => Language::C,
            "java" | "kt" | "kts" | "scala" | "groovy" | "gradle" => Language::JavaLike,
            "go" => Language::Go,
            "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" | "mts" | "cts" | "swift" | "dart" => {
                Language::JavaScript
            }
            "cs" => Language::CSharp,
            "php" => Language::Php,
            "sql" | "lua" | "hs" | "elm" => Language::DashComment,
            "html" | "htm" | "xml" | "xhtml" | "vue" | "svelte" | "md" | "markdown" => {
                Language::Markup
            }
            _ => Language::Generic,
        }
    }

    fn patterns(self) -> Vec<&'static str> {
        match self {
            Language::Python => vec![HASH_COMMENT, DOCSTRING_DOUBLE, DOCSTRING_SINGLE, IMPORT, FROM_IMPORT],
            Language::Script => vec![HASH_COMMENT, REQUIRE_CALL, REQUIRE_STMT, INCLUDE],
            Language::Rust => [&C_STYLE_COMMENTS[..], &[USE, EXTERN_CRATE][..]].concat(),
            Language::C => [&C_STYLE_COMMENTS[..], &[C_INCLUDE, USING][..]].concat(),
            Language::JavaLike | Language::Go => [&C_STYLE_COMMENTS[..], &[IMPORT, PACKAGE][..]].concat(),
            Language::JavaScript => [&C_STYLE_COMMENTS[..], &[IMPORT, REQUIRE_CALL][..]].concat(),
            Language::CSharp => [&C_STYLE_COMMENTS[..], &[USING][..]].concat(),
            Language::Php => [
                &C_STYLE_COMMENTS[..],
                &[HASH_COMMENT, USE, INCLUDE, REQUIRE_CALL, REQUIRE_STMT][..],
            ]
            .concat(),
            Language::DashComment => vec![DASH_COMMENT],
            Language::Markup => vec![MARKUP_COMMENT],
            Language::Generic => vec![
                HASH_COMMENT,
                SLASH_COMMENT,
                BLOCK_COMMENT_OPEN,
                BLOCK_COMMENT_CONT,
                MARKUP_COMMENT,
                DASH_COMMENT,
                DOCSTRING_DOUBLE,
                DOCSTRING_SINGLE,
                IMPORT,
                FROM_IMPORT,
                C_INCLUDE,
                USING,
                REQUIRE_CALL,
                INCLUDE,
                USE,
                PACKAGE,
                EXTERN_CRATE,
            ],
        }
    }
}

/// Compiled comment/import patterns for one language family.
#[derive(Debug)]
pub struct LineRules {
    language: Language,
    trivial: RegexSet,
}

static RULES: LazyLock<HashMap<Language, LineRules>> = LazyLock::new(|| {
    Language::ALL
        .into_iter()
        .map(|language| {
            let trivial = RegexSet::new(language.patterns())
                .unwrap_or_else(|_| RegexSet::empty());
            (language, LineRules { language, trivial })
        })
        .collect()
});

impl LineRules {
    /// Resolve the rule table for a file once, then test each of its lines.
    pub fn for_path(path: &str) -> &'static LineRules {
        Self::for_language(Language::from_path(path))
    }

    pub fn for_language(language: Language) -> &'static LineRules {
        &RULES[&language]
    }

    pub fn generic() -> &'static LineRules {
        Self::for_language(Language::Generic)
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// True when the line carries semantic content: not blank, longer than
    /// `min_length` once trimmed, and not a comment or import for this language.
    pub fn is_meaningful(&self, line: &str, min_length: usize) -> bool {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.chars().count() <= min_length {
            return false;
        }
        !self.trivial.is_match(line)
    }
}

/// Language-agnostic check using every known comment and import pattern.
pub fn is_meaningful(line: &str) -> bool {
    LineRules::generic().is_meaningful(line, 1)
}

/// Cheap whitespace-only test used by line counting.
pub fn is_noop(line: &str) -> bool {
    line.trim().is_empty()
}

static SKIP_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        // Lock files
        r"(^|/)(package-lock\.json|yarn\.lock|Gemfile\.lock|poetry\.lock|Pipfile\.lock|Cargo\.lock|composer\.lock|pnpm-lock\.yaml)$",
        // Minified files and source maps
        r"\.min\.",
        r"\.map$",
        // Generated code
        r"\.generated\.",
        r"\.auto\.",
        r"(^|/)generated/",
        // Build artifacts
        r"(^|/)(dist|build|target|out)/",
        // Vendored dependencies
        r"(^|/)(vendor|node_modules)/",
        r"(^|/)__pycache__(/|$)",
        // Editor metadata
        r"(^|/)\.(vscode|idea)/",
        r"\.iml$",
        r"(^|/)\.DS_Store$",
        // Version control
        r"(^|/)\.(git|hg|svn)/",
        // Binary and media
        r"(?i)\.(svg|png|jpe?g|gif|ico|bmp|webp|woff2?|ttf|otf|eot|pdf|zip|gz|tar|7z|rar|wasm|mp[34]|wav|avi|mov|flv|swf|docx?|xlsx?|pptx?|bin|dat|o|so|dylib|dll|exe|class|jar|pyc)$",
    ])
    .unwrap_or_else(|_| RegexSet::empty())
});

/// True for paths that must contribute nothing to any metric.
pub fn should_skip_file(path: &str) -> bool {
    let normalized = path.replace('\\', "/");
    SKIP_PATTERNS.is_match(&normalized)
}
