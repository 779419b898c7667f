//! Final commit message formatting.

use crate::classify::{CommitType, parse_header};

/// Prefix `message` with the label of `commit_type`.
///
/// A conventional prefix already on the message is replaced, keeping its
/// scope and breaking marker, so `fix(api): x` typed as feat becomes
/// `feat ✨(api): x`. The body, if any, follows a single blank line.
pub fn format_commit_message(commit_type: CommitType, message: &str) -> String {
    let message = message.trim();
    let (first_line, body) = match message.split_once('\n') {
        Some((first, rest)) => (first.trim(), rest.trim()),
        None => (message, ""),
    };

    let (scope, breaking, title) = match parse_header(first_line) {
        Some(header) if header.commit_type().is_some() && !header.description.is_empty() => {
            (header.scope, header.breaking, header.description)
        }
        _ => (None, false, first_line.to_string()),
    };

    let mut header = commit_type.label();
    if let Some(scope) = scope {
        header.push_str(&format!("({scope})"));
    }
    if breaking {
        header.push('!');
    }

    if body.is_empty() {
        format!("{header}: {title}")
    } else {
        format!("{header}: {title}\n\n{body}")
    }
}
