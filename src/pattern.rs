//! Path matching shared by the exclusion list and the classifier's path rules.
//!
//! A pattern without a `/` is matched against each path component, so
//! `node_modules` excludes `web/node_modules/x.js` and `*.md` matches any
//! markdown file. A pattern with a `/` is matched against the whole path.
//! Matching is always exact or glob based: `.env` matches `.env` and
//! `app/.env`, but not `.env.example` or `my.environment`.

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::PatternError;

/// Compiled set of component and full-path glob patterns.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    patterns: Vec<String>,
    components: GlobSet,
    paths: GlobSet,
}

impl PathMatcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PatternError> {
        let mut components = GlobSetBuilder::new();
        let mut paths = GlobSetBuilder::new();
        let mut kept = Vec::with_capacity(patterns.len());

        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }
            let trimmed = pattern.trim_end_matches('/');
            if trimmed.contains('/') {
                paths.add(compile(trimmed, true)?);
            } else {
                components.add(compile(trimmed, false)?);
            }
            kept.push(pattern.to_string());
        }

        let components = components.build().map_err(|source| PatternError::InvalidGlob {
            pattern: kept.join(","),
            source,
        })?;
        let paths = paths.build().map_err(|source| PatternError::InvalidGlob {
            pattern: kept.join(","),
            source,
        })?;

        Ok(Self {
            patterns: kept,
            components,
            paths,
        })
    }

    /// A matcher that matches nothing.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            components: GlobSet::empty(),
            paths: GlobSet::empty(),
        }
    }

    pub fn is_match(&self, path: &str) -> bool {
        if self.is_empty() {
            return false;
        }
        let path = path.trim_start_matches("./");
        if self.paths.is_match(path) {
            return true;
        }
        if self.components.is_empty() {
            return false;
        }
        path.split('/')
            .filter(|c| !c.is_empty())
            .any(|component| self.components.is_match(component))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn compile(pattern: &str, literal_separator: bool) -> Result<Glob, PatternError> {
    // A directory pattern such as `docs/` or `.github/` covers everything below it.
    let expanded = if literal_separator && !has_glob_meta(pattern) {
        format!("{{{pattern},{pattern}/**}}")
    } else {
        pattern.to_string()
    };
    GlobBuilder::new(&expanded)
        .literal_separator(literal_separator)
        .build()
        .map_err(|source| PatternError::InvalidGlob {
            pattern: pattern.to_string(),
            source,
        })
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}
