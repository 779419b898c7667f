//! Ordered rule tables for commit type classification.
//!
//! Order is precedence: the first path rule a file matches decides its vote,
//! and the first keyword list that matches decides the type.

use regex_lite::Regex;

use crate::classify::CommitType;
use crate::error::PatternError;
use crate::pattern::PathMatcher;

/// Path patterns per type. Patterns without `/` match any path component.
pub const DEFAULT_PATH_RULES: &[(CommitType, &[&str])] = &[
    (
        CommitType::Test,
        &[
            "tests", "test", "__tests__", "spec", "testdata", "fixtures", "*_test.*",
            "*_tests.*", "test_*.*", "*.test.*", "*.spec.*", "*_spec.*",
        ],
    ),
    (
        CommitType::Docs,
        &[
            "docs", "doc", "*.md", "*.rst", "*.adoc", "README*", "LICENSE*", "CHANGELOG*",
            "CONTRIBUTING*",
        ],
    ),
    (
        CommitType::Style,
        &[
            ".prettierrc*", ".eslintrc*", ".stylelintrc*", "rustfmt.toml", ".rustfmt.toml",
            ".clang-format", ".editorconfig",
        ],
    ),
    (
        CommitType::Chore,
        &[
            ".github", ".gitlab-ci.yml", ".circleci", "ci", ".gitignore", ".dockerignore",
            "Dockerfile", "docker-compose*.yml", "Makefile", ".pre-commit-config.yaml",
            "renovate.json", "*.lock", "package-lock.json", "pnpm-lock.yaml",
        ],
    ),
];

/// Keyword lists per type, checked in this order.
pub const DEFAULT_KEYWORD_RULES: &[(CommitType, &[&str])] = &[
    (
        CommitType::Feat,
        &[
            "add", "new", "feature", "introduce", "implement", "create", "support", "enhance",
            "improve", "update",
        ],
    ),
    (
        CommitType::Fix,
        &["fix", "bug", "patch", "issue", "error", "crash", "problem", "resolve"],
    ),
    (
        CommitType::Docs,
        &["docs", "documentation", "readme", "license", "comment", "typo"],
    ),
    (
        CommitType::Refactor,
        &["refactor", "restructure", "cleanup", "clean up", "reorganize", "simplify", "rename"],
    ),
    (CommitType::Test, &["test", "coverage", "spec", "mock"]),
    (
        CommitType::Style,
        &["style", "format", "whitespace", "lint", "prettier", "eslint", "rustfmt"],
    ),
    (CommitType::Revert, &["revert", "rollback", "roll back", "undo"]),
];

/// Compiled rule tables.
#[derive(Debug, Clone)]
pub struct ClassifierRules {
    path_rules: Vec<(CommitType, PathMatcher)>,
    keyword_rules: Vec<(CommitType, Regex)>,
}

impl ClassifierRules {
    pub fn new(
        path_rules: &[(CommitType, &[&str])],
        keyword_rules: &[(CommitType, &[&str])],
    ) -> Result<Self, PatternError> {
        let path_rules = path_rules
            .iter()
            .map(|(ty, patterns)| -> Result<_, PatternError> {
                Ok((*ty, PathMatcher::new(*patterns)?))
            })
            .collect::<Result<Vec<_>, PatternError>>()?;

        let keyword_rules = keyword_rules
            .iter()
            .filter(|(_, keywords)| !keywords.is_empty())
            .map(|(ty, keywords)| -> Result<_, PatternError> {
                Ok((*ty, keyword_regex(*ty, keywords)?))
            })
            .collect::<Result<Vec<_>, PatternError>>()?;

        Ok(Self {
            path_rules,
            keyword_rules,
        })
    }

    pub fn defaults() -> Result<Self, PatternError> {
        Self::new(DEFAULT_PATH_RULES, DEFAULT_KEYWORD_RULES)
    }

    /// The type voted for by a single path, if any rule matches it.
    pub fn path_type(&self, path: &str) -> Option<CommitType> {
        self.path_rules
            .iter()
            .find(|(_, matcher)| matcher.is_match(path))
            .map(|(ty, _)| *ty)
    }

    /// The first type whose keywords appear in `text`.
    pub fn keyword_type(&self, text: &str) -> Option<CommitType> {
        self.keyword_rules
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(ty, _)| *ty)
    }
}

/// Keywords match at the start of a word, so "fix" matches "fixes" and
/// "fixed" but "add" does not match "padding".
fn keyword_regex(ty: CommitType, keywords: &[&str]) -> Result<Regex, PatternError> {
    let alternatives: Vec<String> = keywords.iter().map(|k| regex_lite::escape(k)).collect();
    Regex::new(&format!(r"(?i)\b(?:{})", alternatives.join("|"))).map_err(|source| {
        PatternError::InvalidKeywords {
            commit_type: ty.to_string(),
            source,
        }
    })
}
