// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Revision reply formatting.
//!
//! The reply comment shows what the revision changed as a context-less
//! unified diff. Long lines are wrapped to a readable width with their
//! `+`/`-`/` ` prefix repeated on continuations; hunk headers never wrap.

use kiln_core::RESPONSE_MARKER;
use similar::TextDiff;

/// Context-less unified diff between the original and revised content.
pub fn unified_diff(original: &str, revised: &str) -> String {
    let diff = TextDiff::from_lines(original, revised);
    diff.unified_diff().context_radius(0).to_string()
}

/// Wrap one diff line. Hunk headers pass through untouched.
pub fn wrap_diff_line(line: &str, width: usize) -> Vec<String> {
    if line.starts_with("@@") || line.len() <= width {
        return vec![line.to_string()];
    }

    let (prefix, content) = match line.chars().next() {
        Some(c @ ('+' | '-' | ' ')) => (c, &line[1..]),
        _ => (' ', line),
    };

    let budget = width.saturating_sub(1).max(1);
    let mut out = Vec::new();
    let mut current = String::new();
    for word in split_words(content, budget) {
        if !current.is_empty() && current.len() + 1 + word.len() > budget {
            out.push(format!("{prefix}{current}"));
            current = word;
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
    }
    if !current.is_empty() || out.is_empty() {
        out.push(format!("{prefix}{current}"));
    }
    out
}

/// Words of at most `budget` chars; longer words are hard-split.
fn split_words(content: &str, budget: usize) -> Vec<String> {
    let mut words = Vec::new();
    for word in content.split(' ') {
        if word.len() <= budget {
            words.push(word.to_string());
        } else {
            let chars: Vec<char> = word.chars().collect();
            for chunk in chars.chunks(budget) {
                words.push(chunk.iter().collect());
            }
        }
    }
    words
}

/// Wrap every line of a diff.
pub fn wrap_diff(diff: &str, width: usize) -> String {
    diff.lines()
        .flat_map(|line| wrap_diff_line(line, width))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full reply comment body: response marker plus fenced, wrapped diff.
pub fn revision_reply(original: &str, revised: &str, width: usize) -> String {
    let diff = unified_diff(original, revised);
    if diff.is_empty() {
        return format!("{RESPONSE_MARKER}\n\nNo content changes were needed.");
    }
    format!("{RESPONSE_MARKER}\n\n```diff\n{}\n```", wrap_diff(&diff, width))
}

#[cfg(test)]
#[path = "diff_fmt_tests.rs"]
mod tests;
