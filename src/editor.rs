//! Editing helpers for conversation scripts.
//!
//! These only produce new script text. The parser never sees any of this state;
//! alternation is a typing convenience, not a parsing rule.

use crate::script::{Role, ScriptLine};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub text: String,
    /// Cursor position in chars.
    pub cursor: usize,
}

/// The role a new line should start with, given the line the cursor sits on.
pub fn next_marker(text_before_cursor: &str) -> Role {
    let last_line = text_before_cursor.rsplit('\n').next().unwrap_or_default();
    match last_line.chars().next() {
        Some(ch) if ch == Role::Sender.marker() => Role::Receiver,
        _ => Role::Sender,
    }
}

/// Breaks the line at `cursor` (in chars) and opens the next line with the
/// alternated marker. Cursors past the end are clamped.
pub fn insert_line_break(text: &str, cursor: usize) -> Edit {
    let split_at = text
        .char_indices()
        .nth(cursor)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let cursor = text[..split_at].chars().count();
    let (before, after) = text.split_at(split_at);

    let prefix = format!("{} ", next_marker(before).marker());
    let mut next = String::with_capacity(text.len() + prefix.len() + 1);
    next.push_str(before);
    next.push('\n');
    next.push_str(&prefix);
    next.push_str(after);

    Edit {
        text: next,
        cursor: cursor + 1 + prefix.chars().count(),
    }
}

/// Appends `body` as a new message whose role alternates from the last
/// recognized line of `text`.
pub fn append_message(text: &str, body: &str) -> String {
    let last_role = text
        .lines()
        .rev()
        .filter_map(ScriptLine::classify)
        .find_map(|line| line.direction.role());
    let role = match last_role {
        Some(Role::Sender) => Role::Receiver,
        Some(Role::Receiver) | None => Role::Sender,
    };

    let mut next = text.trim_end_matches(['\n', '\r']).to_owned();
    if !next.is_empty() {
        next.push('\n');
    }
    next.push(role.marker());
    next.push(' ');
    next.push_str(body.trim());
    next.push('\n');
    next
}
