//! Conventional commit header parsing.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::classify::CommitType;

/// `type[ emoji][(scope)][!]: description`
///
/// The emoji slot only accepts non-ASCII text, so `fix stuff: x` is not
/// mistaken for a `fix` header.
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z]+)(?:\s+[^\x00-\x7F]+)?(?:\(([^)]*)\))?(!)?:\s*(.*)$")
        .expect("header regex is valid")
});

/// A parsed commit header. `kind` is lowercased but not validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub kind: String,
    pub scope: Option<String>,
    pub breaking: bool,
    pub description: String,
}

impl Header {
    /// The header's type, when it is one we know.
    pub fn commit_type(&self) -> Option<CommitType> {
        self.kind.parse().ok()
    }
}

/// Parse the first line of `message` as a conventional commit header.
pub fn parse_header(message: &str) -> Option<Header> {
    let first_line = message.lines().next()?;
    let caps = HEADER_RE.captures(first_line)?;

    let kind = caps.get(1)?.as_str().to_lowercase();
    let scope = caps
        .get(2)
        .map(|m| m.as_str().trim().to_lowercase())
        .filter(|s| !s.is_empty());

    Some(Header {
        kind,
        scope,
        breaking: caps.get(3).is_some(),
        description: caps.get(4).map(|m| m.as_str().trim().to_string()).unwrap_or_default(),
    })
}

/// The commit type named by a message's header, if any.
pub fn parse_prefix(message: &str) -> Option<CommitType> {
    parse_header(message)?.commit_type()
}
